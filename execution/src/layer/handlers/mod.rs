use super::*;
use unspent_types::{Address, Amount, BalanceId, Output, OutputId, Symbol};

mod balance;
mod lock;
mod transfer;

/// Parses an operation amount, rejecting zero.
fn positive_amount(raw: &str) -> Result<Amount, LedgerError> {
    let amount: Amount = raw
        .parse()
        .map_err(|err| LedgerError::invalid_amount(raw, err))?;
    if amount.is_zero() {
        return Err(LedgerError::invalid_amount(raw, "amount must be positive"));
    }
    Ok(amount)
}

impl<'a, S: State> Layer<'a, S> {
    /// Writes a fresh output keyed by the next id of this invocation.
    fn create_output(
        &mut self,
        owner: &Address,
        symbol: &Symbol,
        amount: Amount,
    ) -> Result<OutputId, LedgerError> {
        let output = Output {
            owner: owner.clone(),
            symbol: symbol.clone(),
            id: self.invocation.next_output_id()?,
            amount,
        };
        self.put(&Key::output(&output), Value::Output(output.clone()));
        Ok(output.id)
    }

    /// Consumes outputs of `id` covering `amount` and returns the change output, if any.
    ///
    /// Every consumed key lands in the write set, so two invocations spending
    /// the same output always conflict at commit.
    async fn spend(
        &mut self,
        id: &BalanceId,
        amount: Amount,
    ) -> Result<Option<OutputId>, LedgerError> {
        let selection = crate::selector::select(&self.store(), id, amount).await?;
        for output in &selection.consumed {
            self.remove(&Key::output(output));
        }
        let change = match selection.change(amount) {
            Some(change) => Some(self.create_output(&id.address, &id.symbol, change)?),
            None => None,
        };
        debug!(
            address = %id.address,
            symbol = %id.symbol,
            %amount,
            consumed = selection.consumed.len(),
            change = change.is_some(),
            "spent outputs"
        );
        Ok(change)
    }
}
