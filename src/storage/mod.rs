pub mod chain_table;
pub mod conflict;
pub mod vacuum;
pub mod version;

pub use chain_table::ChainTable;
pub use conflict::has_conflict;
pub use vacuum::{run_vacuum, VacuumReport, VacuumWorker};
pub use version::Version;
