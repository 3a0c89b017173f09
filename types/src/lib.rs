//! Types shared by the unspent ledger: records, storage keys, instructions and
//! query shapes, with canonical binary encodings.

pub mod api;
pub mod codec;
pub mod execution;
pub mod ledger;

pub use api::{Balance, Query, QueryResponse};
pub use execution::{
    Instruction, Key, KeyPrefix, LockReceipt, Receipt, TransferReceipt, Value,
    MAX_BATCH_TRANSFERS, NAMESPACE,
};
pub use ledger::{
    Address, Amount, AmountError, BalanceId, BalanceOperation, IdentifierError, Lock,
    LockAllOperation, LockId, Output, OutputId, Symbol, TransferOperation, TxId,
};
