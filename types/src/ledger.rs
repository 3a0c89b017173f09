//! Ledger records: identities, amounts, outputs and locks.
//!
//! An [Output] is a discrete unit of spendable value and a [Lock] is value
//! removed from the spendable set without being destroyed. Neither is ever
//! mutated in place: spends delete outputs and create fresh ones.

use crate::codec::{read_bounded, read_identifier, string_encode_size, write_string};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

/// Maximum length (in bytes) of an [Address] or [Symbol].
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Number of decimal digits in `2^256 - 1`.
pub const MAX_AMOUNT_DIGITS: usize = 78;

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} exceeds {MAX_IDENTIFIER_LENGTH} bytes (got {len})")]
    TooLong { kind: &'static str, len: usize },
}

fn validate_identifier(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty { kind });
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(IdentifierError::TooLong {
            kind,
            len: value.len(),
        });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
                let value = value.into();
                validate_identifier($kind, &value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdentifierError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                write_string(&self.0, writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                read_identifier(reader, $kind, MAX_IDENTIFIER_LENGTH).map(Self)
            }
        }

        impl EncodeSize for $name {
            fn encode_size(&self) -> usize {
                string_encode_size(&self.0)
            }
        }
    };
}

identifier!(
    /// Opaque identity of an account holder, supplied by the identity subsystem.
    Address,
    "Address"
);

identifier!(
    /// Identifier distinguishing independent token types sharing one store.
    Symbol,
    "Symbol"
);

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a non-negative decimal integer: {0}")]
    Malformed(String),
    #[error("amount exceeds 2^256 - 1: {0}")]
    TooLarge(String),
}

/// Non-negative token amount.
///
/// Rendered and parsed as a decimal string at every external boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256([0; 4]));
    pub const MAX: Amount = Amount(U256::MAX);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Sum of `amounts`, or `None` if it exceeds `2^256 - 1`.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, next| acc.checked_add(next))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        // `from_dec_str` accepts the empty string, so digits are checked up front.
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed(s.to_string()));
        }
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|_| AmountError::TooLarge(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// Stored as a decimal string so a damaged record is detected on read rather
// than silently reinterpreted.
impl Write for Amount {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.to_string(), writer);
    }
}

impl Read for Amount {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let digits = read_bounded(reader, "Amount", MAX_AMOUNT_DIGITS)?;
        digits
            .parse()
            .map_err(|_| Error::Invalid("Amount", "malformed decimal"))
    }
}

impl EncodeSize for Amount {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.to_string())
    }
}

/// Identifier of the invocation that produced a record.
///
/// Assigned by the runtime in execution order, so ascending [TxId]s are
/// ascending creation order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId {
    pub height: u64,
    pub index: u32,
}

impl TxId {
    pub fn new(height: u64, index: u32) -> Self {
        Self { height, index }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.height, self.index)
    }
}

impl Write for TxId {
    fn write(&self, writer: &mut impl BufMut) {
        self.height.write(writer);
        self.index.write(writer);
    }
}

impl Read for TxId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            height: u64::read(reader)?,
            index: u32::read(reader)?,
        })
    }
}

impl FixedSize for TxId {
    const SIZE: usize = u64::SIZE + u32::SIZE;
}

/// Key suffix of an [Output]: the creating invocation plus its per-invocation sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId {
    pub tx: TxId,
    pub seq: u32,
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tx, self.seq)
    }
}

impl Write for OutputId {
    fn write(&self, writer: &mut impl BufMut) {
        self.tx.write(writer);
        self.seq.write(writer);
    }
}

impl Read for OutputId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            tx: TxId::read(reader)?,
            seq: u32::read(reader)?,
        })
    }
}

impl FixedSize for OutputId {
    const SIZE: usize = TxId::SIZE + u32::SIZE;
}

/// Query key for the aggregate balance of one account under one symbol.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceId {
    pub address: Address,
    pub symbol: Symbol,
}

impl BalanceId {
    pub fn new(address: Address, symbol: Symbol) -> Self {
        Self { address, symbol }
    }
}

/// Handle returned by a lock and consumed by unlock or burn-lock.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockId {
    pub address: Address,
    pub symbol: Symbol,
    pub tx_id: TxId,
}

impl LockId {
    pub fn balance_id(&self) -> BalanceId {
        BalanceId::new(self.address.clone(), self.symbol.clone())
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.symbol, self.address, self.tx_id)
    }
}

impl Write for LockId {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        self.symbol.write(writer);
        self.tx_id.write(writer);
    }
}

impl Read for LockId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            address: Address::read(reader)?,
            symbol: Symbol::read(reader)?,
            tx_id: TxId::read(reader)?,
        })
    }
}

impl EncodeSize for LockId {
    fn encode_size(&self) -> usize {
        self.address.encode_size() + self.symbol.encode_size() + TxId::SIZE
    }
}

/// A spendable unit of value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub owner: Address,
    pub symbol: Symbol,
    pub id: OutputId,
    pub amount: Amount,
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.symbol.write(writer);
        self.id.write(writer);
        self.amount.write(writer);
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            owner: Address::read(reader)?,
            symbol: Symbol::read(reader)?,
            id: OutputId::read(reader)?,
            amount: Amount::read(reader)?,
        })
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        self.owner.encode_size()
            + self.symbol.encode_size()
            + OutputId::SIZE
            + self.amount.encode_size()
    }
}

/// Value held out of the spendable set until it is unlocked or burnt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub amount: Amount,
}

impl Lock {
    pub fn owner(&self) -> &Address {
        &self.id.address
    }

    pub fn symbol(&self) -> &Symbol {
        &self.id.symbol
    }
}

impl Write for Lock {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.amount.write(writer);
    }
}

impl Read for Lock {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: LockId::read(reader)?,
            amount: Amount::read(reader)?,
        })
    }
}

impl EncodeSize for Lock {
    fn encode_size(&self) -> usize {
        self.id.encode_size() + self.amount.encode_size()
    }
}

/// Input of mint, burn and lock. `amount` is a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOperation {
    pub address: Address,
    pub symbol: Symbol,
    pub amount: String,
}

impl BalanceOperation {
    pub fn new(address: Address, symbol: Symbol, amount: impl Into<String>) -> Self {
        Self {
            address,
            symbol,
            amount: amount.into(),
        }
    }

    pub fn balance_id(&self) -> BalanceId {
        BalanceId::new(self.address.clone(), self.symbol.clone())
    }

    pub fn amount(&self) -> Result<Amount, AmountError> {
        self.amount.parse()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub sender: Address,
    pub recipient: Address,
    pub symbol: Symbol,
    pub amount: String,
}

impl TransferOperation {
    pub fn new(
        sender: Address,
        recipient: Address,
        symbol: Symbol,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipient,
            symbol,
            amount: amount.into(),
        }
    }

    pub fn amount(&self) -> Result<Amount, AmountError> {
        self.amount.parse()
    }
}

/// Lock the whole spendable balance of one address, or of every holder of
/// `symbol` when `address` is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockAllOperation {
    pub symbol: Symbol,
    #[serde(default)]
    pub address: Option<Address>,
}

fn write_raw_amount(value: &str, writer: &mut impl BufMut) {
    write_string(value, writer);
}

// Operation amounts are validated by the handler, so only the length bound applies here.
fn read_raw_amount(reader: &mut impl Buf) -> Result<String, Error> {
    read_bounded(reader, "Amount", MAX_AMOUNT_DIGITS)
}

impl Write for BalanceOperation {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        self.symbol.write(writer);
        write_raw_amount(&self.amount, writer);
    }
}

impl Read for BalanceOperation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            address: Address::read(reader)?,
            symbol: Symbol::read(reader)?,
            amount: read_raw_amount(reader)?,
        })
    }
}

impl EncodeSize for BalanceOperation {
    fn encode_size(&self) -> usize {
        self.address.encode_size() + self.symbol.encode_size() + string_encode_size(&self.amount)
    }
}

impl Write for TransferOperation {
    fn write(&self, writer: &mut impl BufMut) {
        self.sender.write(writer);
        self.recipient.write(writer);
        self.symbol.write(writer);
        write_raw_amount(&self.amount, writer);
    }
}

impl Read for TransferOperation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            sender: Address::read(reader)?,
            recipient: Address::read(reader)?,
            symbol: Symbol::read(reader)?,
            amount: read_raw_amount(reader)?,
        })
    }
}

impl EncodeSize for TransferOperation {
    fn encode_size(&self) -> usize {
        self.sender.encode_size()
            + self.recipient.encode_size()
            + self.symbol.encode_size()
            + string_encode_size(&self.amount)
    }
}

impl Write for LockAllOperation {
    fn write(&self, writer: &mut impl BufMut) {
        self.symbol.write(writer);
        self.address.write(writer);
    }
}

impl Read for LockAllOperation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            symbol: Symbol::read(reader)?,
            address: Option::<Address>::read(reader)?,
        })
    }
}

impl EncodeSize for LockAllOperation {
    fn encode_size(&self) -> usize {
        self.symbol.encode_size() + self.address.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};
    use proptest::prelude::*;

    fn address(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn identifiers_reject_empty_and_oversized_values() {
        assert!(matches!(
            Address::new(""),
            Err(IdentifierError::Empty { kind: "Address" })
        ));
        assert!(matches!(
            Symbol::new("x".repeat(MAX_IDENTIFIER_LENGTH + 1)),
            Err(IdentifierError::TooLong { kind: "Symbol", .. })
        ));
        assert!(Symbol::new("x".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }

    #[test]
    fn amount_parses_decimal_strings() {
        assert_eq!("1000".parse::<Amount>().unwrap(), Amount::from(1000));
        assert_eq!("0".parse::<Amount>().unwrap(), Amount::ZERO);
        assert_eq!(Amount::from(42).to_string(), "42");
    }

    #[test]
    fn amount_rejects_signs_garbage_and_overflow() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Empty));
        assert!(matches!("-5".parse::<Amount>(), Err(AmountError::Malformed(_))));
        assert!(matches!("+5".parse::<Amount>(), Err(AmountError::Malformed(_))));
        assert!(matches!("1e3".parse::<Amount>(), Err(AmountError::Malformed(_))));
        let too_large = format!("{}0", U256::MAX);
        assert!(matches!(
            too_large.parse::<Amount>(),
            Err(AmountError::TooLarge(_))
        ));
        assert!(U256::MAX.to_string().parse::<Amount>().is_ok());
    }

    #[test]
    fn amount_sum_reports_overflow() {
        let max = Amount::new(U256::MAX);
        assert_eq!(Amount::checked_sum([max, Amount::from(1)]), None);
        assert_eq!(
            Amount::checked_sum([1u64, 2, 3].map(Amount::from)),
            Some(Amount::from(6))
        );
        assert_eq!(Amount::checked_sum(std::iter::empty()), Some(Amount::ZERO));
    }

    #[test]
    fn amount_serde_uses_decimal_strings() {
        let json = serde_json::to_string(&Amount::from(1500)).unwrap();
        assert_eq!(json, "\"1500\"");
        let parsed: Amount = serde_json::from_str("\"77\"").unwrap();
        assert_eq!(parsed, Amount::from(77));
        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
    }

    #[test]
    fn stored_amount_with_garbage_digits_fails_to_decode() {
        let mut buf = Vec::new();
        write_string("12x", &mut buf);
        assert!(matches!(
            Amount::decode(buf.as_slice()),
            Err(Error::Invalid("Amount", "malformed decimal"))
        ));
    }

    #[test]
    fn output_id_order_follows_creation_order() {
        let first = OutputId {
            tx: TxId::new(1, 9),
            seq: 3,
        };
        let second = OutputId {
            tx: TxId::new(2, 0),
            seq: 0,
        };
        assert!(first < second);
        assert!(first.encode().as_ref() < second.encode().as_ref());
    }

    #[test]
    fn lock_record_roundtrip() {
        let lock = Lock {
            id: LockId {
                address: address("user1"),
                symbol: symbol("AA"),
                tx_id: TxId::new(4, 1),
            },
            amount: Amount::from(50),
        };
        let encoded = lock.encode();
        assert_eq!(encoded.len(), lock.encode_size());
        assert_eq!(Lock::decode(encoded).unwrap(), lock);
    }

    #[test]
    fn operation_keeps_raw_amount_until_validated() {
        let op = BalanceOperation::new(address("owner"), symbol("AA"), "abc");
        let decoded = BalanceOperation::decode(op.encode()).unwrap();
        assert_eq!(decoded.amount, "abc");
        assert!(decoded.amount().is_err());
    }

    #[test]
    fn lock_all_operation_defaults_to_symbol_wide() {
        let op: LockAllOperation = serde_yaml::from_str("symbol: AA").unwrap();
        assert_eq!(op.address, None);
        let decoded = LockAllOperation::decode(op.encode()).unwrap();
        assert_eq!(decoded, op);
    }

    proptest! {
        #[test]
        fn prop_amount_matches_u128_arithmetic(a in any::<u128>(), b in any::<u128>()) {
            let parsed: Amount = a.to_string().parse().unwrap();
            prop_assert_eq!(parsed.to_string(), a.to_string());

            let (x, y) = (Amount::new(U256::from(a)), Amount::new(U256::from(b)));
            let sum = x.checked_add(y).unwrap();
            prop_assert_eq!(sum.as_u256(), U256::from(a) + U256::from(b));
            prop_assert_eq!(x.checked_sub(y).is_some(), a >= b);
        }
    }
}
