use super::*;
use unspent_types::BalanceOperation;

impl<'a, S: State> Layer<'a, S> {
    /// Creates exactly one new output. Never merges with existing outputs.
    ///
    /// The symbol's supply must stay representable, which bounds every balance
    /// read of that symbol.
    pub async fn mint(&mut self, op: &BalanceOperation) -> Result<Receipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_mint(op).await;
        self.settle(checkpoint, result)
    }

    /// Destroys `amount` of the owner's spendable value.
    pub async fn burn(&mut self, op: &BalanceOperation) -> Result<Receipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_burn(op).await;
        self.settle(checkpoint, result)
    }

    async fn handle_mint(&mut self, op: &BalanceOperation) -> Result<Receipt, LedgerError> {
        let amount = positive_amount(&op.amount)?;
        let supply = self.store().get_supply(&op.symbol).await?;
        if supply.checked_add(amount).is_none() {
            debug!(symbol = %op.symbol, %supply, %amount, "mint would overflow supply");
            return Err(LedgerError::Overflow);
        }
        let output = self.create_output(&op.address, &op.symbol, amount)?;
        debug!(address = %op.address, symbol = %op.symbol, %amount, %output, "minted");
        Ok(Receipt::Minted { output, amount })
    }

    async fn handle_burn(&mut self, op: &BalanceOperation) -> Result<Receipt, LedgerError> {
        let amount = positive_amount(&op.amount)?;
        let change = self.spend(&op.balance_id(), amount).await?;
        debug!(address = %op.address, symbol = %op.symbol, %amount, "burned");
        Ok(Receipt::Burned { amount, change })
    }
}
