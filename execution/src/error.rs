use thiserror::Error;
use unspent_types::{Address, Amount, LockId};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Zero, negative or malformed amount.
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },
    #[error("insufficient balance: required {required}, spendable {available}")]
    InsufficientBalance { required: Amount, available: Amount },
    #[error("lock not found: {0}")]
    LockNotFound(LockId),
    #[error("lock already exists: {0}")]
    DuplicateLock(LockId),
    #[error("corrupt record at {key}")]
    CorruptRecord {
        key: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("amount overflow")]
    Overflow,
    #[error("{caller} is not authorized to {operation}")]
    Unauthorized {
        caller: Address,
        operation: &'static str,
    },
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("state error: {0:#}")]
    State(#[from] anyhow::Error),
}

impl LedgerError {
    pub(crate) fn invalid_amount(amount: &str, reason: impl ToString) -> Self {
        Self::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }
}
