use crate::{
    invocation::{AdminScope, Caller, Invocation},
    store::raw_key,
    LedgerError, State, Status, Store,
};
use anyhow::Result;
use commonware_codec::Encode;
use std::collections::BTreeMap;
use tracing::debug;
use unspent_types::{BalanceId, Instruction, Key, Receipt, Value, MAX_BATCH_TRANSFERS};

mod handlers;

/// Pending writes and invocation counter captured before an operation runs.
struct Checkpoint {
    pending: BTreeMap<Vec<u8>, Status>,
    invocation: Invocation,
}

/// Write overlay for one invocation.
///
/// Reads fall through to the underlying [State] unless the key has a pending
/// write. Nothing reaches the underlying state until [Layer::commit] hands the
/// change set back to the caller.
pub struct Layer<'a, S: State> {
    state: &'a S,
    namespace: &'a [u8],
    invocation: Invocation,
    max_batch_transfers: usize,
    pending: BTreeMap<Vec<u8>, Status>,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, namespace: &'a [u8], invocation: Invocation) -> Self {
        Self {
            state,
            namespace,
            invocation,
            max_batch_transfers: MAX_BATCH_TRANSFERS,
            pending: BTreeMap::new(),
        }
    }

    pub fn with_max_batch_transfers(mut self, max: usize) -> Self {
        self.max_batch_transfers = max;
        self
    }

    pub fn invocation(&self) -> Invocation {
        self.invocation
    }

    /// Typed reads that observe this invocation's pending writes.
    pub fn store(&self) -> Store<'_, Self> {
        Store::new(self, self.namespace)
    }

    fn put(&mut self, key: &Key, value: Value) {
        self.pending.insert(
            raw_key(self.namespace, key),
            Status::Update(value.encode().to_vec()),
        );
    }

    fn remove(&mut self, key: &Key) {
        self.pending.insert(raw_key(self.namespace, key), Status::Delete);
    }

    /// Whether this invocation has already written or deleted `key`.
    fn touched(&self, key: &Key) -> bool {
        self.pending.contains_key(&raw_key(self.namespace, key))
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pending: self.pending.clone(),
            invocation: self.invocation,
        }
    }

    /// Restores the checkpoint if `result` is an error.
    fn settle<T>(
        &mut self,
        checkpoint: Checkpoint,
        result: Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        if result.is_err() {
            self.pending = checkpoint.pending;
            self.invocation = checkpoint.invocation;
        }
        result
    }

    /// Authorizes `caller` for `instruction` and applies it.
    ///
    /// A rejected instruction leaves the pending write set untouched.
    pub async fn apply(
        &mut self,
        caller: &Caller,
        instruction: &Instruction,
    ) -> Result<Receipt, LedgerError> {
        let operation = instruction.name();
        debug!(caller = %caller.address, admin = caller.admin, operation, "applying instruction");
        match instruction {
            Instruction::Mint(op) => {
                caller.authorize_admin(operation)?;
                self.mint(op).await
            }
            Instruction::Burn(op) => {
                caller.authorize_owner(&op.address, operation)?;
                self.burn(op).await
            }
            Instruction::Transfer(op) => {
                caller.authorize_owner(&op.sender, operation)?;
                self.transfer(op).await.map(Receipt::Transferred)
            }
            Instruction::TransferBatch { transfers } => {
                for op in transfers {
                    caller.authorize_owner(&op.sender, operation)?;
                }
                let transfers = self.transfer_batch(transfers).await?;
                Ok(Receipt::BatchTransferred { transfers })
            }
            Instruction::Lock(op) => {
                caller.authorize_owner(&op.address, operation)?;
                self.lock(op).await.map(Receipt::Locked)
            }
            Instruction::LockAll(op) => {
                let locks = match &op.address {
                    Some(address) => {
                        caller.authorize_owner(address, operation)?;
                        let id = BalanceId::new(address.clone(), op.symbol.clone());
                        self.lock_all(&id).await?.into_iter().collect()
                    }
                    None => {
                        let scope = caller.authorize_admin(operation)?;
                        self.lock_all_holders(&scope, &op.symbol).await?
                    }
                };
                Ok(Receipt::LockedAll { locks })
            }
            Instruction::Unlock(id) => {
                caller.authorize_owner(&id.address, operation)?;
                self.unlock(id).await
            }
            Instruction::BurnLock(id) => {
                caller.authorize_owner(&id.address, operation)?;
                self.burn_lock(id).await
            }
            Instruction::BurnAllLock { symbol } => {
                let scope = caller.authorize_admin(operation)?;
                self.burn_all_lock(&scope, symbol).await
            }
        }
    }

    /// Ordered change set accumulated by this invocation.
    pub fn commit(self) -> Vec<(Vec<u8>, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.pending.insert(key.to_vec(), Status::Delete);
        Ok(())
    }

    async fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.state.scan(prefix).await?.into_iter().collect();
        let pending = self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, status) in pending {
            match status {
                Status::Update(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                Status::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
