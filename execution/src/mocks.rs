//! Test fixtures for driving the ledger without a surrounding runtime.

use crate::{state_transition::execute_invocation, Caller, LedgerError, Memory, Store};
use unspent_types::{
    Address, BalanceId, BalanceOperation, Instruction, LockAllOperation, LockId, Receipt, Symbol,
    TransferOperation, TxId, MAX_BATCH_TRANSFERS, NAMESPACE,
};

/// Address of the administrative caller used by [Harness].
pub const ADMIN: &str = "admin";

pub fn address(value: &str) -> Address {
    Address::new(value).expect("valid test address")
}

pub fn symbol(value: &str) -> Symbol {
    Symbol::new(value).expect("valid test symbol")
}

pub fn balance_id(owner: &str, sym: &str) -> BalanceId {
    BalanceId::new(address(owner), symbol(sym))
}

/// In-memory ledger that runs every call as its own invocation at the next height.
#[derive(Default)]
pub struct Harness {
    state: Memory,
    height: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Memory {
        &self.state
    }

    pub fn store(&self) -> Store<'_, Memory> {
        Store::new(&self.state, NAMESPACE)
    }

    pub async fn execute(
        &mut self,
        caller: &Caller,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Receipt>, LedgerError> {
        self.height += 1;
        let result = execute_invocation(
            &mut self.state,
            NAMESPACE,
            MAX_BATCH_TRANSFERS,
            TxId::new(self.height, 0),
            caller,
            &instructions,
        )
        .await?;
        Ok(result.receipts)
    }

    pub async fn execute_as(
        &mut self,
        owner: &str,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Receipt>, LedgerError> {
        self.execute(&Caller::user(address(owner)), instructions)
            .await
    }

    pub async fn execute_as_admin(
        &mut self,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Receipt>, LedgerError> {
        self.execute(&Caller::admin(address(ADMIN)), instructions)
            .await
    }

    pub async fn mint(
        &mut self,
        owner: &str,
        sym: &str,
        amount: &str,
    ) -> Result<Vec<Receipt>, LedgerError> {
        let op = BalanceOperation::new(address(owner), symbol(sym), amount);
        self.execute_as_admin(vec![Instruction::Mint(op)]).await
    }

    pub async fn burn(
        &mut self,
        owner: &str,
        sym: &str,
        amount: &str,
    ) -> Result<Vec<Receipt>, LedgerError> {
        let op = BalanceOperation::new(address(owner), symbol(sym), amount);
        self.execute_as(owner, vec![Instruction::Burn(op)]).await
    }

    pub async fn transfer(
        &mut self,
        from: &str,
        to: &str,
        sym: &str,
        amount: &str,
    ) -> Result<Vec<Receipt>, LedgerError> {
        let op = TransferOperation::new(address(from), address(to), symbol(sym), amount);
        self.execute_as(from, vec![Instruction::Transfer(op)]).await
    }

    /// Locks `amount` for `owner` and returns the new lock id.
    pub async fn lock(
        &mut self,
        owner: &str,
        sym: &str,
        amount: &str,
    ) -> Result<LockId, LedgerError> {
        let op = BalanceOperation::new(address(owner), symbol(sym), amount);
        let receipts = self.execute_as(owner, vec![Instruction::Lock(op)]).await?;
        match receipts.into_iter().next() {
            Some(Receipt::Locked(receipt)) => Ok(receipt.lock_id),
            other => panic!("unexpected lock receipt: {other:?}"),
        }
    }

    pub async fn lock_all(&mut self, owner: &str, sym: &str) -> Result<Vec<Receipt>, LedgerError> {
        let op = LockAllOperation {
            symbol: symbol(sym),
            address: Some(address(owner)),
        };
        self.execute_as(owner, vec![Instruction::LockAll(op)]).await
    }

    pub async fn lock_all_holders(&mut self, sym: &str) -> Result<Vec<Receipt>, LedgerError> {
        let op = LockAllOperation {
            symbol: symbol(sym),
            address: None,
        };
        self.execute_as_admin(vec![Instruction::LockAll(op)]).await
    }

    pub async fn unlock(&mut self, caller: &str, id: &LockId) -> Result<Vec<Receipt>, LedgerError> {
        self.execute_as(caller, vec![Instruction::Unlock(id.clone())])
            .await
    }

    pub async fn burn_lock(
        &mut self,
        caller: &str,
        id: &LockId,
    ) -> Result<Vec<Receipt>, LedgerError> {
        self.execute_as(caller, vec![Instruction::BurnLock(id.clone())])
            .await
    }

    pub async fn burn_all_lock(&mut self, sym: &str) -> Result<Vec<Receipt>, LedgerError> {
        self.execute_as_admin(vec![Instruction::BurnAllLock {
            symbol: symbol(sym),
        }])
        .await
    }
}
