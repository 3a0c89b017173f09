use anyhow::Result;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use std::{collections::BTreeMap, future::Future};

/// Largest encoded record the ledger ever writes.
pub const MAX_VALUE_SIZE: usize = 4096;

/// Ordered key-value context of one invocation, supplied by the surrounding runtime.
///
/// Keys compare lexicographically and [State::scan] must yield entries in that order.
pub trait State {
    fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Vec<u8>>>>;
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &[u8]) -> impl Future<Output = Result<()>>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan(&self, prefix: &[u8]) -> impl Future<Output = Result<Vec<(Vec<u8>, Vec<u8>)>>>;

    fn apply(&mut self, changes: Vec<(Vec<u8>, Status)>) -> impl Future<Output = Result<()>> {
        async move {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

/// In-memory ordered store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Memory {
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl State for Memory {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }

    async fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .state
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Pending change to one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Update(Vec<u8>),
    Delete,
}

impl Write for Status {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Status::Update(value) => {
                0u8.write(writer);
                value.write(writer);
            }
            Status::Delete => 1u8.write(writer),
        }
    }
}

impl Read for Status {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Status::Update(Vec::<u8>::read_range(
                reader,
                0..=MAX_VALUE_SIZE,
            )?)),
            1 => Ok(Status::Delete),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Status {
    fn encode_size(&self) -> usize {
        1 + match self {
            Status::Update(value) => value.encode_size(),
            Status::Delete => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn scan_is_ordered_and_bounded_by_prefix() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let inserted: [&[u8]; 5] = [b"ab\x02", b"ab\x01", b"ac", b"a", b"ab"];
            for key in inserted {
                state.insert(key.to_vec(), key.to_vec()).await.unwrap();
            }

            let keys: Vec<Vec<u8>> = state
                .scan(b"ab")
                .await
                .unwrap()
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            assert_eq!(
                keys,
                vec![b"ab".to_vec(), b"ab\x01".to_vec(), b"ab\x02".to_vec()]
            );
            assert!(state.scan(b"zz").await.unwrap().is_empty());
        });
    }

    #[test]
    fn apply_writes_updates_and_deletes() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            state.insert(b"gone".to_vec(), vec![1]).await.unwrap();
            state
                .apply(vec![
                    (b"gone".to_vec(), Status::Delete),
                    (b"kept".to_vec(), Status::Update(vec![2])),
                ])
                .await
                .unwrap();
            assert_eq!(state.get(b"gone").await.unwrap(), None);
            assert_eq!(state.get(b"kept").await.unwrap(), Some(vec![2]));
            assert_eq!(state.len(), 1);
        });
    }

    #[test]
    fn status_roundtrip() {
        for status in [Status::Update(vec![1, 2, 3]), Status::Delete] {
            let encoded = status.encode();
            assert_eq!(encoded.len(), status.encode_size());
            assert_eq!(Status::decode(encoded).unwrap(), status);
        }
    }
}
