//! Deterministic output selection.
//!
//! Outputs are taken in ascending key order, which is creation order, until the
//! accumulated total covers the requested amount. Selection only reads; the
//! caller deletes what was consumed and creates any change.

use crate::{LedgerError, State, Store};
use unspent_types::{Amount, BalanceId, Output};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub consumed: Vec<Output>,
    pub total: Amount,
}

impl Selection {
    /// Amount to return to the spender, if any.
    pub fn change(&self, required: Amount) -> Option<Amount> {
        self.total
            .checked_sub(required)
            .filter(|change| !change.is_zero())
    }
}

pub async fn select<S: State>(
    store: &Store<'_, S>,
    id: &BalanceId,
    required: Amount,
) -> Result<Selection, LedgerError> {
    let mut consumed = Vec::new();
    let mut total = Amount::ZERO;
    for output in store.outputs_of(id).await? {
        if total >= required {
            break;
        }
        total = total.checked_add(output.amount).ok_or(LedgerError::Overflow)?;
        consumed.push(output);
    }

    if total < required {
        return Err(LedgerError::InsufficientBalance {
            required,
            available: total,
        });
    }

    Ok(Selection { consumed, total })
}
