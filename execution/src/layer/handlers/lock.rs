use super::*;
use unspent_types::{BalanceOperation, Lock, LockId, LockReceipt};

impl<'a, S: State> Layer<'a, S> {
    /// Moves `amount` of spendable value into a lock keyed by the current transaction.
    pub async fn lock(&mut self, op: &BalanceOperation) -> Result<LockReceipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = match positive_amount(&op.amount) {
            Ok(amount) => self.handle_lock(&op.balance_id(), amount).await,
            Err(err) => Err(err),
        };
        self.settle(checkpoint, result)
    }

    /// Locks the entire spendable balance of `id`. Nothing to lock is not an error.
    pub async fn lock_all(
        &mut self,
        id: &BalanceId,
    ) -> Result<Option<LockReceipt>, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_lock_all(id).await;
        self.settle(checkpoint, result)
    }

    /// Locks the entire spendable balance of every holder of `symbol`, one lock
    /// per holder, holders visited in key order.
    pub async fn lock_all_holders(
        &mut self,
        _scope: &AdminScope,
        symbol: &Symbol,
    ) -> Result<Vec<LockReceipt>, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_lock_all_holders(symbol).await;
        self.settle(checkpoint, result)
    }

    /// Releases a lock back into one spendable output of the same amount.
    pub async fn unlock(&mut self, id: &LockId) -> Result<Receipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_unlock(id).await;
        self.settle(checkpoint, result)
    }

    /// Deletes a lock without replacement.
    pub async fn burn_lock(&mut self, id: &LockId) -> Result<Receipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_burn_lock(id).await;
        self.settle(checkpoint, result)
    }

    /// Deletes every lock of `symbol` across all owners.
    pub async fn burn_all_lock(
        &mut self,
        _scope: &AdminScope,
        symbol: &Symbol,
    ) -> Result<Receipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_burn_all_lock(symbol).await;
        self.settle(checkpoint, result)
    }

    async fn handle_lock(
        &mut self,
        id: &BalanceId,
        amount: Amount,
    ) -> Result<LockReceipt, LedgerError> {
        let lock_id = LockId {
            address: id.address.clone(),
            symbol: id.symbol.clone(),
            tx_id: self.invocation.tx_id(),
        };
        // A lock key released earlier in this invocation is still taken.
        if self.touched(&Key::lock(&lock_id)) || self.store().lock(&lock_id).await?.is_some() {
            return Err(LedgerError::DuplicateLock(lock_id));
        }

        self.spend(id, amount).await?;
        let lock = Lock {
            id: lock_id.clone(),
            amount,
        };
        self.put(&Key::lock(&lock_id), Value::Lock(lock));
        debug!(lock = %lock_id, %amount, "locked");
        Ok(LockReceipt { lock_id, amount })
    }

    async fn handle_lock_all(
        &mut self,
        id: &BalanceId,
    ) -> Result<Option<LockReceipt>, LedgerError> {
        let spendable = self.store().get_spendable(id).await?;
        if spendable.is_zero() {
            debug!(address = %id.address, symbol = %id.symbol, "nothing to lock");
            return Ok(None);
        }
        self.handle_lock(id, spendable).await.map(Some)
    }

    async fn handle_lock_all_holders(
        &mut self,
        symbol: &Symbol,
    ) -> Result<Vec<LockReceipt>, LedgerError> {
        let outputs = self.store().outputs_of_symbol(symbol).await?;
        let mut holders: Vec<Address> = outputs.into_iter().map(|output| output.owner).collect();
        holders.dedup();

        let mut receipts = Vec::with_capacity(holders.len());
        for holder in holders {
            let id = BalanceId::new(holder, symbol.clone());
            if let Some(receipt) = self.handle_lock_all(&id).await? {
                receipts.push(receipt);
            }
        }
        Ok(receipts)
    }

    async fn take_lock(&mut self, id: &LockId) -> Result<Lock, LedgerError> {
        let lock = self
            .store()
            .lock(id)
            .await?
            .ok_or_else(|| LedgerError::LockNotFound(id.clone()))?;
        self.remove(&Key::lock(id));
        Ok(lock)
    }

    async fn handle_unlock(&mut self, id: &LockId) -> Result<Receipt, LedgerError> {
        let lock = self.take_lock(id).await?;
        let output = self.create_output(lock.owner(), lock.symbol(), lock.amount)?;
        debug!(lock = %id, amount = %lock.amount, %output, "unlocked");
        Ok(Receipt::Unlocked {
            output,
            amount: lock.amount,
        })
    }

    async fn handle_burn_lock(&mut self, id: &LockId) -> Result<Receipt, LedgerError> {
        let lock = self.take_lock(id).await?;
        debug!(lock = %id, amount = %lock.amount, "burned lock");
        Ok(Receipt::LockBurned {
            lock_id: lock.id,
            amount: lock.amount,
        })
    }

    async fn handle_burn_all_lock(&mut self, symbol: &Symbol) -> Result<Receipt, LedgerError> {
        let locks = self.store().locks_of_symbol(symbol).await?;
        let amount = Amount::checked_sum(locks.iter().map(|lock| lock.amount))
            .ok_or(LedgerError::Overflow)?;
        let count = u32::try_from(locks.len()).map_err(|_| LedgerError::Overflow)?;
        for lock in &locks {
            self.remove(&Key::lock(&lock.id));
        }
        debug!(%symbol, count, %amount, "burned all locks");
        Ok(Receipt::LocksBurned { count, amount })
    }
}

#[cfg(test)]
mod tests {
    use crate::mocks::{address, balance_id, symbol, Harness};
    use crate::LedgerError;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use unspent_types::{Amount, BalanceOperation, Instruction, LockId, Receipt, TxId};

    #[test]
    fn locked_value_is_not_spendable() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            harness.lock("U", "AA", "50").await.unwrap();

            {
                let store = harness.store();
                let u = balance_id("U", "AA");
                assert_eq!(store.get_balance(&u).await.unwrap(), Amount::from(100));
                assert_eq!(store.get_locked(&u).await.unwrap(), Amount::from(50));
            }

            let err = harness.transfer("U", "X", "AA", "100").await.unwrap_err();
            match err {
                LedgerError::InsufficientBalance { available, .. } => {
                    assert_eq!(available, Amount::from(50))
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn unlock_restores_spendable_balance() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            let lock_id = harness.lock("U", "AA", "40").await.unwrap();
            harness.unlock("U", &lock_id).await.unwrap();

            let store = harness.store();
            let u = balance_id("U", "AA");
            assert_eq!(store.get_spendable(&u).await.unwrap(), Amount::from(100));
            assert_eq!(store.get_locked(&u).await.unwrap(), Amount::ZERO);
            assert!(store.list_locks(&u).await.unwrap().is_empty());
        });
    }

    #[test]
    fn unknown_or_consumed_lock_is_not_found() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            let lock_id = harness.lock("U", "AA", "40").await.unwrap();
            harness.burn_lock("U", &lock_id).await.unwrap();

            assert!(matches!(
                harness.unlock("U", &lock_id).await,
                Err(LedgerError::LockNotFound(_))
            ));
            assert!(matches!(
                harness.burn_lock("U", &lock_id).await,
                Err(LedgerError::LockNotFound(_))
            ));
            let missing = LockId {
                address: address("U"),
                symbol: symbol("AA"),
                tx_id: TxId::new(999, 0),
            };
            assert!(matches!(
                harness.unlock("U", &missing).await,
                Err(LedgerError::LockNotFound(_))
            ));

            let store = harness.store();
            let u = balance_id("U", "AA");
            assert_eq!(store.get_balance(&u).await.unwrap(), Amount::from(60));
            assert_eq!(store.get_locked(&u).await.unwrap(), Amount::ZERO);
        });
    }

    #[test]
    fn second_lock_in_one_invocation_is_duplicate() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            let lock =
                || Instruction::Lock(BalanceOperation::new(address("U"), symbol("AA"), "10"));

            let err = harness
                .execute_as("U", vec![lock(), lock()])
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::DuplicateLock(_)));

            // Separate invocations get separate transaction ids.
            harness.lock("U", "AA", "10").await.unwrap();
            harness.lock("U", "AA", "10").await.unwrap();
            let store = harness.store();
            let u = balance_id("U", "AA");
            assert_eq!(store.list_locks(&u).await.unwrap().len(), 2);
            assert_eq!(store.get_locked(&u).await.unwrap(), Amount::from(20));
        });
    }

    #[test]
    fn released_lock_key_is_not_reused_in_the_same_invocation() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            let snapshot = harness.state().clone();

            let lock =
                || Instruction::Lock(BalanceOperation::new(address("U"), symbol("AA"), "10"));
            // Mint ran at height 1; each attempt below runs at the next height.
            for height in [2, 3] {
                let id = LockId {
                    address: address("U"),
                    symbol: symbol("AA"),
                    tx_id: TxId::new(height, 0),
                };
                let release = if height == 2 {
                    Instruction::BurnLock(id)
                } else {
                    Instruction::Unlock(id)
                };
                let err = harness
                    .execute_as("U", vec![lock(), release, lock()])
                    .await
                    .unwrap_err();
                assert!(matches!(err, LedgerError::DuplicateLock(_)));
                assert_eq!(harness.state(), &snapshot);
            }
        });
    }

    #[test]
    fn lock_beyond_spendable_changes_nothing() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "60").await.unwrap();
            harness.lock("U", "AA", "20").await.unwrap();
            let snapshot = harness.state().clone();
            let u = balance_id("U", "AA");
            let outputs = harness.store().list_outputs(&u).await.unwrap();

            match harness.lock("U", "AA", "41").await {
                Err(LedgerError::InsufficientBalance {
                    required,
                    available,
                }) => {
                    assert_eq!(required, Amount::from(41));
                    assert_eq!(available, Amount::from(40));
                }
                other => panic!("unexpected result: {other:?}"),
            }

            assert_eq!(harness.state(), &snapshot);
            let store = harness.store();
            assert_eq!(store.get_balance(&u).await.unwrap(), Amount::from(60));
            assert_eq!(store.get_locked(&u).await.unwrap(), Amount::from(20));
            assert_eq!(store.list_outputs(&u).await.unwrap(), outputs);
        });
    }

    #[test]
    fn lock_all_locks_everything_and_tolerates_empty() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            let receipts = harness.lock_all("U", "AA").await.unwrap();
            assert_eq!(receipts, vec![Receipt::LockedAll { locks: vec![] }]);

            harness.mint("U", "AA", "30").await.unwrap();
            harness.mint("U", "AA", "12").await.unwrap();
            harness.lock_all("U", "AA").await.unwrap();

            let store = harness.store();
            let u = balance_id("U", "AA");
            assert_eq!(store.get_spendable(&u).await.unwrap(), Amount::ZERO);
            assert_eq!(store.get_locked(&u).await.unwrap(), Amount::from(42));
        });
    }

    #[test]
    fn symbol_wide_lock_all_locks_every_holder() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("user1", "AA", "50").await.unwrap();
            harness.mint("user2", "AA", "100").await.unwrap();
            harness.mint("user2", "BB", "7").await.unwrap();

            let receipts = harness.lock_all_holders("AA").await.unwrap();
            match &receipts[..] {
                [Receipt::LockedAll { locks }] => {
                    let owners: Vec<&str> =
                        locks.iter().map(|lock| lock.lock_id.address.as_str()).collect();
                    assert_eq!(owners, vec!["user1", "user2"]);
                }
                other => panic!("unexpected receipts: {other:?}"),
            }

            let store = harness.store();
            assert_eq!(
                store.get_locked(&balance_id("user1", "AA")).await.unwrap(),
                Amount::from(50)
            );
            assert_eq!(
                store.get_locked(&balance_id("user2", "AA")).await.unwrap(),
                Amount::from(100)
            );
            assert_eq!(
                store.get_spendable(&balance_id("user2", "BB")).await.unwrap(),
                Amount::from(7)
            );
        });
    }

    #[test]
    fn burn_all_lock_sweeps_every_owner_of_the_symbol() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("user1", "AA", "50").await.unwrap();
            harness.mint("user2", "AA", "100").await.unwrap();
            harness.mint("user2", "BB", "100").await.unwrap();
            harness.lock("user1", "AA", "20").await.unwrap();
            harness.lock("user2", "AA", "30").await.unwrap();
            harness.lock("user2", "BB", "30").await.unwrap();

            let receipts = harness.burn_all_lock("AA").await.unwrap();
            assert_eq!(
                receipts,
                vec![Receipt::LocksBurned {
                    count: 2,
                    amount: Amount::from(50)
                }]
            );

            let store = harness.store();
            for owner in ["user1", "user2"] {
                assert_eq!(
                    store.get_locked(&balance_id(owner, "AA")).await.unwrap(),
                    Amount::ZERO
                );
            }
            assert_eq!(
                store.get_balance(&balance_id("user1", "AA")).await.unwrap(),
                Amount::from(30)
            );
            assert_eq!(
                store.get_balance(&balance_id("user2", "AA")).await.unwrap(),
                Amount::from(70)
            );
            assert_eq!(
                store.get_locked(&balance_id("user2", "BB")).await.unwrap(),
                Amount::from(30)
            );
        });
    }

    #[test]
    fn lock_owner_may_not_touch_other_locks() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("U", "AA", "100").await.unwrap();
            let lock_id = harness.lock("U", "AA", "40").await.unwrap();

            assert!(matches!(
                harness.unlock("V", &lock_id).await,
                Err(LedgerError::Unauthorized { .. })
            ));
            assert!(matches!(
                harness.burn_lock("V", &lock_id).await,
                Err(LedgerError::Unauthorized { .. })
            ));
            let sweep = Instruction::BurnAllLock {
                symbol: symbol("AA"),
            };
            assert!(matches!(
                harness.execute_as("U", vec![sweep]).await,
                Err(LedgerError::Unauthorized { .. })
            ));
        });
    }
}
