mod account;
mod big;
mod currency;
mod error;
mod keys;

use std::{fmt::Display, str::FromStr};

use crate::*;

pub use account::{Account, ContractAccountStatus};
pub use big::{Big, BigError};
pub use currency::{CurrencyDesign, CurrencyError, CurrencyPolicy, Feeer};
pub use error::{HeightRetry, ProcessError, Rejection};
pub use keys::{AccountKey, AccountKeys, Address, AddressKind, KeysError, Weight};

/// Hash of the fact of an operation; used as provenance on state entries.
pub type OperationHash = Sha256Hash;

/// Height of a block
#[derive(
    serde::Serialize,
    serde::Deserialize,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Hash,
    Debug,
    Default,
)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub fn start() -> BlockHeight {
        BlockHeight(0)
    }

    pub fn next(self) -> BlockHeight {
        BlockHeight(self.0 + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(BlockHeight)
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CurrencyIdError {
    #[error("Currency id {id:?} has invalid length {len}, expected 3 through 10")]
    InvalidLength { id: String, len: usize },
    #[error("Currency id {id:?} contains invalid character {ch:?}")]
    InvalidCharacter { id: String, ch: char },
    #[error("Currency id {id:?} must start with an uppercase letter")]
    InvalidLeadingCharacter { id: String },
}

/// Short uppercase identifier for a currency.
///
/// Currencies are independent accounting domains: balances, fee policies and
/// supply aggregates never mix across ids.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyId(String);

impl CurrencyId {
    pub fn new(id: impl Into<String>) -> Result<Self, CurrencyIdError> {
        let id = id.into();
        let len = id.len();
        if !(3..=10).contains(&len) {
            return Err(CurrencyIdError::InvalidLength { id, len });
        }
        if let Some(ch) = id
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit()))
        {
            return Err(CurrencyIdError::InvalidCharacter { id, ch });
        }
        if !id
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
        {
            return Err(CurrencyIdError::InvalidLeadingCharacter { id });
        }
        Ok(CurrencyId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyId {
    type Err = CurrencyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyId::new(s)
    }
}

impl Display for CurrencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for CurrencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl serde::Serialize for CurrencyId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for CurrencyId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CurrencyId::new(s).map_err(serde::de::Error::custom)
    }
}

/// A value of some currency: a [Big] paired with the [CurrencyId] it counts.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Amount {
    pub big: Big,
    pub currency: CurrencyId,
}

impl Amount {
    pub fn new(big: Big, currency: CurrencyId) -> Self {
        Amount { big, currency }
    }

    pub fn zero(currency: CurrencyId) -> Self {
        Amount {
            big: Big::ZERO,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.big.is_zero()
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.big, self.currency)
    }
}
