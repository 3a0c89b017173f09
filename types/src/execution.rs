use crate::ledger::{
    Address, Amount, BalanceId, BalanceOperation, Lock, LockAllOperation, LockId, Output,
    OutputId, Symbol, TransferOperation, TxId,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use serde::{Deserialize, Serialize};

/// Default namespace prefixed to every key the ledger writes.
pub const NAMESPACE: &[u8] = b"_UTXO";

/// Maximum number of transfers accepted in one [Instruction::TransferBatch].
pub const MAX_BATCH_TRANSFERS: usize = 128;

const OUTPUT_TAG: u8 = 1;
const LOCK_TAG: u8 = 2;

/// Storage key of a ledger record.
///
/// Encoded as `tag || symbol || address || suffix`. Strings carry a fixed-width
/// length prefix and integers are big-endian, so records of one
/// `(symbol, address)` pair are contiguous and ordered by creation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Output {
        symbol: Symbol,
        owner: Address,
        id: OutputId,
    },
    Lock(LockId),
}

impl Key {
    pub fn output(output: &Output) -> Self {
        Self::Output {
            symbol: output.symbol.clone(),
            owner: output.owner.clone(),
            id: output.id,
        }
    }

    pub fn lock(id: &LockId) -> Self {
        Self::Lock(id.clone())
    }
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Output { symbol, owner, id } => {
                OUTPUT_TAG.write(writer);
                symbol.write(writer);
                owner.write(writer);
                id.write(writer);
            }
            Self::Lock(id) => {
                LOCK_TAG.write(writer);
                id.symbol.write(writer);
                id.address.write(writer);
                id.tx_id.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            OUTPUT_TAG => Self::Output {
                symbol: Symbol::read(reader)?,
                owner: Address::read(reader)?,
                id: OutputId::read(reader)?,
            },
            LOCK_TAG => {
                let symbol = Symbol::read(reader)?;
                let address = Address::read(reader)?;
                let tx_id = TxId::read(reader)?;
                Self::Lock(LockId {
                    address,
                    symbol,
                    tx_id,
                })
            }
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Output { symbol, owner, .. } => {
                    symbol.encode_size() + owner.encode_size() + OutputId::SIZE
                }
                Self::Lock(id) => id.symbol.encode_size() + id.address.encode_size() + TxId::SIZE,
            }
    }
}

/// Leading bytes shared by a family of [Key]s, used for ordered range scans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Every output of a symbol, across all owners.
    Outputs(Symbol),
    /// Outputs of one account.
    OutputsOf(BalanceId),
    /// Every lock of a symbol, across all owners.
    Locks(Symbol),
    /// Locks of one account.
    LocksOf(BalanceId),
}

impl Write for KeyPrefix {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Outputs(symbol) => {
                OUTPUT_TAG.write(writer);
                symbol.write(writer);
            }
            Self::OutputsOf(id) => {
                OUTPUT_TAG.write(writer);
                id.symbol.write(writer);
                id.address.write(writer);
            }
            Self::Locks(symbol) => {
                LOCK_TAG.write(writer);
                symbol.write(writer);
            }
            Self::LocksOf(id) => {
                LOCK_TAG.write(writer);
                id.symbol.write(writer);
                id.address.write(writer);
            }
        }
    }
}

impl EncodeSize for KeyPrefix {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Outputs(symbol) | Self::Locks(symbol) => symbol.encode_size(),
                Self::OutputsOf(id) | Self::LocksOf(id) => {
                    id.symbol.encode_size() + id.address.encode_size()
                }
            }
    }
}

/// Stored ledger record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Output(Output),
    Lock(Lock),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Output(output) => {
                OUTPUT_TAG.write(writer);
                output.write(writer);
            }
            Self::Lock(lock) => {
                LOCK_TAG.write(writer);
                lock.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            OUTPUT_TAG => Ok(Self::Output(Output::read(reader)?)),
            LOCK_TAG => Ok(Self::Lock(Lock::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Output(output) => output.encode_size(),
                Self::Lock(lock) => lock.encode_size(),
            }
    }
}

/// Statically-typed operation set accepted by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Create one new output. Binary: [0] [BalanceOperation]
    Mint(BalanceOperation),

    /// Destroy spendable value of the owner. Binary: [1] [BalanceOperation]
    Burn(BalanceOperation),

    /// Binary: [2] [TransferOperation]
    Transfer(TransferOperation),

    /// Independent transfers applied in order, all or nothing.
    /// Binary: [3] [len:varint] [TransferOperation...]
    TransferBatch { transfers: Vec<TransferOperation> },

    /// Move spendable value into a lock. Binary: [4] [BalanceOperation]
    Lock(BalanceOperation),

    /// Binary: [5] [LockAllOperation]
    LockAll(LockAllOperation),

    /// Binary: [6] [LockId]
    Unlock(LockId),

    /// Binary: [7] [LockId]
    BurnLock(LockId),

    /// Destroy every lock of a symbol, across all owners (administrative).
    /// Binary: [8] [Symbol]
    BurnAllLock { symbol: Symbol },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint(_) => "mint",
            Self::Burn(_) => "burn",
            Self::Transfer(_) => "transfer",
            Self::TransferBatch { .. } => "transfer_batch",
            Self::Lock(_) => "lock",
            Self::LockAll(_) => "lock_all",
            Self::Unlock(_) => "unlock",
            Self::BurnLock(_) => "burn_lock",
            Self::BurnAllLock { .. } => "burn_all_lock",
        }
    }
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Mint(op) => {
                0u8.write(writer);
                op.write(writer);
            }
            Self::Burn(op) => {
                1u8.write(writer);
                op.write(writer);
            }
            Self::Transfer(op) => {
                2u8.write(writer);
                op.write(writer);
            }
            Self::TransferBatch { transfers } => {
                3u8.write(writer);
                transfers.write(writer);
            }
            Self::Lock(op) => {
                4u8.write(writer);
                op.write(writer);
            }
            Self::LockAll(op) => {
                5u8.write(writer);
                op.write(writer);
            }
            Self::Unlock(id) => {
                6u8.write(writer);
                id.write(writer);
            }
            Self::BurnLock(id) => {
                7u8.write(writer);
                id.write(writer);
            }
            Self::BurnAllLock { symbol } => {
                8u8.write(writer);
                symbol.write(writer);
            }
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            0 => Self::Mint(BalanceOperation::read(reader)?),
            1 => Self::Burn(BalanceOperation::read(reader)?),
            2 => Self::Transfer(TransferOperation::read(reader)?),
            3 => Self::TransferBatch {
                transfers: Vec::<TransferOperation>::read_range(
                    reader,
                    1..=MAX_BATCH_TRANSFERS,
                )?,
            },
            4 => Self::Lock(BalanceOperation::read(reader)?),
            5 => Self::LockAll(LockAllOperation::read(reader)?),
            6 => Self::Unlock(LockId::read(reader)?),
            7 => Self::BurnLock(LockId::read(reader)?),
            8 => Self::BurnAllLock {
                symbol: Symbol::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Mint(op) | Self::Burn(op) | Self::Lock(op) => op.encode_size(),
                Self::Transfer(op) => op.encode_size(),
                Self::TransferBatch { transfers } => transfers.encode_size(),
                Self::LockAll(op) => op.encode_size(),
                Self::Unlock(id) | Self::BurnLock(id) => id.encode_size(),
                Self::BurnAllLock { symbol } => symbol.encode_size(),
            }
    }
}

/// Result of one transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub recipient_output: OutputId,
    pub change: Option<OutputId>,
}

/// Lock created by a lock or lock-all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReceipt {
    pub lock_id: LockId,
    pub amount: Amount,
}

/// Typed result of a successfully applied [Instruction].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Receipt {
    Minted {
        output: OutputId,
        amount: Amount,
    },
    Burned {
        amount: Amount,
        change: Option<OutputId>,
    },
    Transferred(TransferReceipt),
    BatchTransferred {
        transfers: Vec<TransferReceipt>,
    },
    Locked(LockReceipt),
    LockedAll {
        locks: Vec<LockReceipt>,
    },
    Unlocked {
        output: OutputId,
        amount: Amount,
    },
    LockBurned {
        lock_id: LockId,
        amount: Amount,
    },
    LocksBurned {
        count: u32,
        amount: Amount,
    },
}
