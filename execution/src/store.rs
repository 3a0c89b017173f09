//! Typed, read-only view of ledger records over a raw [State].

use crate::{LedgerError, State};
use commonware_codec::{DecodeExt, Encode, Error};
use commonware_utils::{hex, union};
use unspent_types::{BalanceId, Key, KeyPrefix, Lock, LockId, Output, Symbol, Value};

pub struct Store<'a, S: State> {
    state: &'a S,
    namespace: &'a [u8],
}

impl<'a, S: State> Store<'a, S> {
    pub fn new(state: &'a S, namespace: &'a [u8]) -> Self {
        Self { state, namespace }
    }

    fn raw_prefix(&self, prefix: &KeyPrefix) -> Vec<u8> {
        union(self.namespace, &prefix.encode())
    }

    pub async fn lock(&self, id: &LockId) -> Result<Option<Lock>, LedgerError> {
        let raw = raw_key(self.namespace, &Key::lock(id));
        let Some(bytes) = self.state.get(&raw).await? else {
            return Ok(None);
        };
        let lock = decode_lock(&raw, &bytes)?;
        if &lock.id != id {
            return Err(corrupt(&raw, Error::Invalid("Lock", "key mismatch")));
        }
        Ok(Some(lock))
    }

    /// Spendable outputs under `prefix`, in key order.
    pub async fn outputs(&self, prefix: &KeyPrefix) -> Result<Vec<Output>, LedgerError> {
        let entries = self.state.scan(&self.raw_prefix(prefix)).await?;
        let mut outputs = Vec::with_capacity(entries.len());
        for (raw, bytes) in entries {
            let output = match Value::decode(bytes.as_slice()) {
                Ok(Value::Output(output)) => output,
                Ok(_) => return Err(corrupt(&raw, Error::Invalid("Value", "expected output"))),
                Err(source) => return Err(corrupt(&raw, source)),
            };
            if raw_key(self.namespace, &Key::output(&output)) != raw {
                return Err(corrupt(&raw, Error::Invalid("Output", "key mismatch")));
            }
            outputs.push(output);
        }
        Ok(outputs)
    }

    /// Locks under `prefix`, in key order.
    pub async fn locks(&self, prefix: &KeyPrefix) -> Result<Vec<Lock>, LedgerError> {
        let entries = self.state.scan(&self.raw_prefix(prefix)).await?;
        let mut locks = Vec::with_capacity(entries.len());
        for (raw, bytes) in entries {
            let lock = decode_lock(&raw, &bytes)?;
            if raw_key(self.namespace, &Key::lock(&lock.id)) != raw {
                return Err(corrupt(&raw, Error::Invalid("Lock", "key mismatch")));
            }
            locks.push(lock);
        }
        Ok(locks)
    }

    pub async fn outputs_of(&self, id: &BalanceId) -> Result<Vec<Output>, LedgerError> {
        self.outputs(&KeyPrefix::OutputsOf(id.clone())).await
    }

    pub async fn outputs_of_symbol(&self, symbol: &Symbol) -> Result<Vec<Output>, LedgerError> {
        self.outputs(&KeyPrefix::Outputs(symbol.clone())).await
    }

    pub async fn locks_of(&self, id: &BalanceId) -> Result<Vec<Lock>, LedgerError> {
        self.locks(&KeyPrefix::LocksOf(id.clone())).await
    }

    pub async fn locks_of_symbol(&self, symbol: &Symbol) -> Result<Vec<Lock>, LedgerError> {
        self.locks(&KeyPrefix::Locks(symbol.clone())).await
    }
}

/// Namespaced storage key of a record.
pub(crate) fn raw_key(namespace: &[u8], key: &Key) -> Vec<u8> {
    union(namespace, &key.encode())
}

fn decode_lock(raw: &[u8], bytes: &[u8]) -> Result<Lock, LedgerError> {
    match Value::decode(bytes) {
        Ok(Value::Lock(lock)) => Ok(lock),
        Ok(_) => Err(corrupt(raw, Error::Invalid("Value", "expected lock"))),
        Err(source) => Err(corrupt(raw, source)),
    }
}

fn corrupt(raw: &[u8], source: Error) -> LedgerError {
    LedgerError::CorruptRecord {
        key: hex(raw),
        source,
    }
}
