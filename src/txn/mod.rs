pub mod registry;
pub mod snapshot;
pub mod transaction;

pub use registry::{TxnHandle, TxnRegistry};
pub use snapshot::Snapshot;

/// Transaction ids and commit timestamps are drawn from the same logical clock,
/// so a transaction's id doubles as its start timestamp.
pub type TxnId = u64;
pub type Timestamp = u64;

/// Clock value before the first `begin`; never handed out.
pub const TS_NONE: Timestamp = 0;
