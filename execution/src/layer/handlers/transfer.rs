use super::*;
use unspent_types::{TransferOperation, TransferReceipt};

impl<'a, S: State> Layer<'a, S> {
    /// Moves `amount` from the sender's spendable outputs to one new recipient output.
    pub async fn transfer(
        &mut self,
        op: &TransferOperation,
    ) -> Result<TransferReceipt, LedgerError> {
        let checkpoint = self.checkpoint();
        let result = self.handle_transfer(op).await;
        self.settle(checkpoint, result)
    }

    /// Applies each transfer in order. The first failure discards the whole batch.
    ///
    /// Transfers never share inputs: each one selects from the sender outputs
    /// left behind by the transfers before it.
    pub async fn transfer_batch(
        &mut self,
        ops: &[TransferOperation],
    ) -> Result<Vec<TransferReceipt>, LedgerError> {
        if ops.is_empty() || ops.len() > self.max_batch_transfers {
            return Err(LedgerError::InvalidInstruction(format!(
                "batch of {} transfers (allowed 1..={})",
                ops.len(),
                self.max_batch_transfers
            )));
        }

        let checkpoint = self.checkpoint();
        let mut receipts = Vec::with_capacity(ops.len());
        let mut result = Ok(());
        for (index, op) in ops.iter().enumerate() {
            match self.handle_transfer(op).await {
                Ok(receipt) => receipts.push(receipt),
                Err(err) => {
                    debug!(index, sender = %op.sender, error = %err, "batch transfer failed");
                    result = Err(err);
                    break;
                }
            }
        }
        let result = result.map(|()| receipts);
        self.settle(checkpoint, result)
    }

    async fn handle_transfer(
        &mut self,
        op: &TransferOperation,
    ) -> Result<TransferReceipt, LedgerError> {
        let amount = positive_amount(&op.amount)?;
        let sender = BalanceId::new(op.sender.clone(), op.symbol.clone());
        let change = self.spend(&sender, amount).await?;
        let recipient_output = self.create_output(&op.recipient, &op.symbol, amount)?;
        debug!(
            sender = %op.sender,
            recipient = %op.recipient,
            symbol = %op.symbol,
            %amount,
            "transferred"
        );
        Ok(TransferReceipt {
            recipient_output,
            change,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::mocks::{address, balance_id, symbol, Harness};
    use crate::LedgerError;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use unspent_types::{Amount, Instruction, Receipt, TransferOperation, MAX_BATCH_TRANSFERS};

    fn op(from: &str, to: &str, amount: &str) -> TransferOperation {
        TransferOperation::new(address(from), address(to), symbol("AA"), amount)
    }

    #[test]
    fn transfer_round_trip_matches_reference_scenario() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            let a = balance_id("A", "AA");
            let b = balance_id("B", "AA");

            harness.mint("A", "AA", "1000").await.unwrap();
            harness.mint("A", "AA", "1000").await.unwrap();
            {
                let store = harness.store();
                assert_eq!(store.get_balance(&a).await.unwrap(), Amount::from(2000));
                assert_eq!(store.list_outputs(&a).await.unwrap().len(), 2);
            }

            harness.transfer("A", "B", "AA", "100").await.unwrap();
            {
                let store = harness.store();
                assert_eq!(store.get_balance(&a).await.unwrap(), Amount::from(1900));
                assert_eq!(store.list_outputs(&a).await.unwrap().len(), 2);
                assert_eq!(store.get_balance(&b).await.unwrap(), Amount::from(100));
                assert_eq!(store.list_outputs(&b).await.unwrap().len(), 1);
            }

            harness.transfer("B", "A", "AA", "100").await.unwrap();
            let store = harness.store();
            assert_eq!(store.get_balance(&a).await.unwrap(), Amount::from(2000));
            assert_eq!(store.list_outputs(&a).await.unwrap().len(), 3);
            assert_eq!(store.get_balance(&b).await.unwrap(), Amount::ZERO);
            assert!(store.list_outputs(&b).await.unwrap().is_empty());
        });
    }

    #[test]
    fn exact_transfer_creates_no_change() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("A", "AA", "40").await.unwrap();
            harness.mint("A", "AA", "70").await.unwrap();

            let receipts = harness.transfer("A", "B", "AA", "40").await.unwrap();
            match &receipts[..] {
                [Receipt::Transferred(receipt)] => assert_eq!(receipt.change, None),
                other => panic!("unexpected receipts: {other:?}"),
            }

            let receipts = harness.transfer("A", "B", "AA", "30").await.unwrap();
            match &receipts[..] {
                [Receipt::Transferred(receipt)] => assert!(receipt.change.is_some()),
                other => panic!("unexpected receipts: {other:?}"),
            }
            let store = harness.store();
            let remaining = store.list_outputs(&balance_id("A", "AA")).await.unwrap();
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].amount, Amount::from(40));
        });
    }

    #[test]
    fn self_transfer_keeps_total() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("A", "AA", "100").await.unwrap();
            harness.transfer("A", "A", "AA", "30").await.unwrap();

            let store = harness.store();
            let a = balance_id("A", "AA");
            assert_eq!(store.get_balance(&a).await.unwrap(), Amount::from(100));
            assert_eq!(store.list_outputs(&a).await.unwrap().len(), 2);
        });
    }

    #[test]
    fn failed_transfer_is_idempotent() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("A", "AA", "100").await.unwrap();
            let before = harness.state().clone();

            assert!(matches!(
                harness.transfer("A", "B", "AA", "101").await,
                Err(LedgerError::InsufficientBalance { .. })
            ));
            assert!(matches!(
                harness.transfer("A", "B", "AA", "0").await,
                Err(LedgerError::InvalidAmount { .. })
            ));
            assert_eq!(harness.state(), &before);
        });
    }

    #[test]
    fn batch_applies_in_order_or_not_at_all() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("A", "AA", "100").await.unwrap();

            let receipts = harness
                .execute_as(
                    "A",
                    vec![Instruction::TransferBatch {
                        transfers: vec![op("A", "B", "30"), op("A", "C", "20")],
                    }],
                )
                .await
                .unwrap();
            match &receipts[..] {
                [Receipt::BatchTransferred { transfers }] => assert_eq!(transfers.len(), 2),
                other => panic!("unexpected receipts: {other:?}"),
            }

            let before = harness.state().clone();
            let err = harness
                .execute_as(
                    "A",
                    vec![Instruction::TransferBatch {
                        transfers: vec![op("A", "B", "40"), op("A", "C", "40")],
                    }],
                )
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
            assert_eq!(harness.state(), &before);

            let store = harness.store();
            assert_eq!(
                store.get_balance(&balance_id("A", "AA")).await.unwrap(),
                Amount::from(50)
            );
            assert_eq!(
                store.get_balance(&balance_id("B", "AA")).await.unwrap(),
                Amount::from(30)
            );
            assert_eq!(
                store.get_balance(&balance_id("C", "AA")).await.unwrap(),
                Amount::from(20)
            );
        });
    }

    #[test]
    fn batch_size_is_bounded() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut harness = Harness::new();
            harness.mint("A", "AA", "1000").await.unwrap();

            let empty = Instruction::TransferBatch { transfers: vec![] };
            assert!(matches!(
                harness.execute_as("A", vec![empty]).await,
                Err(LedgerError::InvalidInstruction(_))
            ));

            let oversized = Instruction::TransferBatch {
                transfers: vec![op("A", "B", "1"); MAX_BATCH_TRANSFERS + 1],
            };
            assert!(matches!(
                harness.execute_as("A", vec![oversized]).await,
                Err(LedgerError::InvalidInstruction(_))
            ));
        });
    }
}
