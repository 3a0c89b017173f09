//! Unspent-output token ledger.
//!
//! Balances are never stored. Every unit of value lives in an immutable
//! output or lock record keyed under `namespace || tag || symbol || address`,
//! and balances are derived by summing a prefix scan. Spending selects outputs
//! in ascending key order, deletes them, and writes fresh outputs for the
//! recipient and the change.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time or randomness inside execution.
//! - Every new key derives from the invocation's [`Invocation`] context.
//! - Iterate only ordered collections and ordered scans.
//!
//! The primary entrypoint is [`state_transition::execute_invocation`]; [`Layer`]
//! exposes the individual operations against a per-invocation overlay and
//! [`Store`] the read side.
//!
//! ```rust,ignore
//! use unspent_execution::{state_transition::execute_invocation, Caller, Memory};
//! use unspent_types::{Address, BalanceOperation, Instruction, Symbol, TxId, NAMESPACE};
//!
//! # async fn example() -> Result<(), unspent_execution::LedgerError> {
//! let mut state = Memory::default();
//! let admin = Caller::admin(Address::new("treasury").unwrap());
//! let mint = Instruction::Mint(BalanceOperation::new(
//!     Address::new("alice").unwrap(),
//!     Symbol::new("USD").unwrap(),
//!     "1000",
//! ));
//! execute_invocation(&mut state, NAMESPACE, 128, TxId::new(1, 0), &admin, &[mint]).await?;
//! # Ok(())
//! # }
//! ```

pub mod state_transition;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


mod error;
mod invocation;
mod layer;
mod query;
mod selector;
mod state;
mod store;

pub use error::LedgerError;
pub use invocation::{AdminScope, Caller, Invocation};
pub use layer::Layer;
pub use selector::{select, Selection};
pub use state::{Memory, State, Status, MAX_VALUE_SIZE};
pub use state_transition::{execute_invocation, InvocationResult};
pub use store::Store;
