//! Aggregate reads. Nothing here mutates state, and an account with no
//! history reads as zero rather than as an error.

use crate::{LedgerError, State, Store};
use unspent_types::{Amount, Balance, BalanceId, Lock, Output, Query, QueryResponse, Symbol};

impl<'a, S: State> Store<'a, S> {
    /// Spendable plus locked.
    pub async fn get_balance(&self, id: &BalanceId) -> Result<Amount, LedgerError> {
        let spendable = self.get_spendable(id).await?;
        let locked = self.get_locked(id).await?;
        spendable.checked_add(locked).ok_or(LedgerError::Overflow)
    }

    pub async fn get_spendable(&self, id: &BalanceId) -> Result<Amount, LedgerError> {
        let outputs = self.outputs_of(id).await?;
        Amount::checked_sum(outputs.iter().map(|output| output.amount)).ok_or(LedgerError::Overflow)
    }

    pub async fn get_locked(&self, id: &BalanceId) -> Result<Amount, LedgerError> {
        let locks = self.locks_of(id).await?;
        Amount::checked_sum(locks.iter().map(|lock| lock.amount)).ok_or(LedgerError::Overflow)
    }

    /// Spendable plus locked value of `symbol` across every holder.
    pub async fn get_supply(&self, symbol: &Symbol) -> Result<Amount, LedgerError> {
        let outputs = self.outputs_of_symbol(symbol).await?;
        let locks = self.locks_of_symbol(symbol).await?;
        let amounts = outputs
            .iter()
            .map(|output| output.amount)
            .chain(locks.iter().map(|lock| lock.amount));
        Amount::checked_sum(amounts).ok_or(LedgerError::Overflow)
    }

    /// Spendable outputs only, in key order.
    pub async fn list_outputs(&self, id: &BalanceId) -> Result<Vec<Output>, LedgerError> {
        self.outputs_of(id).await
    }

    pub async fn list_locks(&self, id: &BalanceId) -> Result<Vec<Lock>, LedgerError> {
        self.locks_of(id).await
    }

    pub async fn query(&self, query: &Query) -> Result<QueryResponse, LedgerError> {
        let id = query.balance_id();
        Ok(match query {
            Query::Balance(_) => QueryResponse::Balance(Balance::new(id, self.get_balance(id).await?)),
            Query::Spendable(_) => {
                QueryResponse::Balance(Balance::new(id, self.get_spendable(id).await?))
            }
            Query::Locked(_) => QueryResponse::Balance(Balance::new(id, self.get_locked(id).await?)),
            Query::Outputs(_) => QueryResponse::Outputs {
                outputs: self.list_outputs(id).await?,
            },
            Query::Locks(_) => QueryResponse::Locks {
                locks: self.list_locks(id).await?,
            },
        })
    }
}
