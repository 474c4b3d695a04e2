use thiserror::Error;

use crate::txn::TxnId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapKvError {
    #[error("unknown transaction: {0} is not active")]
    UnknownTransaction(TxnId),

    #[error("write conflict: transaction {txn_id} lost first-committer-wins on key {}", display_key(.key))]
    WriteConflict { txn_id: TxnId, key: Vec<u8> },
}

impl SnapKvError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, SnapKvError::WriteConflict { .. })
    }

    pub fn is_unknown_transaction(&self) -> bool {
        matches!(self, SnapKvError::UnknownTransaction(_))
    }
}

fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
