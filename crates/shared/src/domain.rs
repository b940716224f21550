use std::{fmt, str::FromStr};

use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Returns `None` for empty or whitespace-only input.
            pub fn new(raw: impl Into<String>) -> Option<Self> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| concat!(stringify!($name), " must not be empty").to_string())
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
    };
}

string_newtype!(Address);
string_newtype!(TxHash);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid chain id quantity '{0}'")]
pub struct ParseChainIdError(pub String);

impl ChainId {
    /// Hex quantity form used on the provider wire, e.g. `0xae3f2`.
    pub fn to_hex_quantity(self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn from_hex_quantity(raw: &str) -> Result<Self, ParseChainIdError> {
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| ParseChainIdError(raw.to_string()))?;
        u64::from_str_radix(digits, 16)
            .map(ChainId)
            .map_err(|_| ParseChainIdError(raw.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The contract's value type: an unsigned 256-bit integer written in decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uint256(U256);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUintError {
    #[error("value is empty")]
    Empty,
    #[error("invalid digit '{0}'")]
    InvalidDigit(char),
    #[error("value does not fit in 256 bits")]
    Overflow,
}

impl Uint256 {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Reads one big-endian ABI word.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_be_bytes(bytes))
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<U256> for Uint256 {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<Uint256> for U256 {
    fn from(value: Uint256) -> Self {
        value.0
    }
}

impl From<u64> for Uint256 {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Uint256 {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for Uint256 {
    type Err = ParseUintError;

    /// Parses plain decimal digits only; signs, whitespace and separators are rejected.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Err(ParseUintError::Empty);
        }
        if let Some(ch) = raw.chars().find(|ch| !ch.is_ascii_digit()) {
            return Err(ParseUintError::InvalidDigit(ch));
        }
        U256::from_str_radix(raw, 10)
            .map(Self)
            .map_err(|_| ParseUintError::Overflow)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to register a network it does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_decimal_values() {
        let value: Uint256 = "42".parse().expect("parse");
        assert_eq!(value, Uint256::from(42u64));
        assert_eq!(value.to_string(), "42");
        assert_eq!(Uint256::ZERO.to_string(), "0");
        assert_eq!("007".parse::<Uint256>(), Ok(Uint256::from(7u64)));
    }

    #[test]
    fn accepts_the_largest_256_bit_value_and_rejects_one_more() {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let parsed: Uint256 = max.parse().expect("max parses");
        assert_eq!(parsed.to_be_bytes(), [0xff; 32]);
        assert_eq!(parsed.to_string(), max);

        let too_big = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert_eq!(too_big.parse::<Uint256>(), Err(ParseUintError::Overflow));
    }

    #[test]
    fn rejects_signs_and_non_digits() {
        assert_eq!("".parse::<Uint256>(), Err(ParseUintError::Empty));
        assert_eq!("-5".parse::<Uint256>(), Err(ParseUintError::InvalidDigit('-')));
        assert_eq!("1.5".parse::<Uint256>(), Err(ParseUintError::InvalidDigit('.')));
        assert_eq!("abc".parse::<Uint256>(), Err(ParseUintError::InvalidDigit('a')));
        assert_eq!("1_000".parse::<Uint256>(), Err(ParseUintError::InvalidDigit('_')));
    }

    #[test]
    fn chain_id_hex_quantity_matches_wallet_format() {
        let chain = ChainId(713714);
        assert_eq!(chain.to_hex_quantity(), "0xae3f2");
        assert_eq!(ChainId::from_hex_quantity("0xae3f2"), Ok(chain));
        assert!(ChainId::from_hex_quantity("713714").is_err());
    }

    #[test]
    fn addresses_reject_blank_input() {
        assert!(Address::new("   ").is_none());
        assert_eq!(
            Address::new(" 0xabc ").map(|a| a.to_string()),
            Some("0xabc".to_string())
        );
        assert!(serde_json::from_str::<Address>("\"\"").is_err());
    }
}
