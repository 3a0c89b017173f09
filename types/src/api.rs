//! Read-side request and response shapes.

use crate::ledger::{Address, Amount, BalanceId, Lock, Output, Symbol};
use serde::{Deserialize, Serialize};

/// Read against the ledger. Queries never mutate state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    /// Spendable plus locked.
    Balance(BalanceId),
    Spendable(BalanceId),
    Locked(BalanceId),
    Outputs(BalanceId),
    Locks(BalanceId),
}

impl Query {
    pub fn balance_id(&self) -> &BalanceId {
        match self {
            Self::Balance(id)
            | Self::Spendable(id)
            | Self::Locked(id)
            | Self::Outputs(id)
            | Self::Locks(id) => id,
        }
    }
}

/// Aggregate amount of one account, as returned by balance queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: Address,
    pub symbol: Symbol,
    pub amount: Amount,
}

impl Balance {
    pub fn new(id: &BalanceId, amount: Amount) -> Self {
        Self {
            address: id.address.clone(),
            symbol: id.symbol.clone(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QueryResponse {
    Balance(Balance),
    Outputs { outputs: Vec<Output> },
    Locks { locks: Vec<Lock> },
}
