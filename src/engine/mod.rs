mod store;
mod transaction;

pub use store::{Store, StoreConfig, StoreStats};
pub use transaction::StoreTxn;
