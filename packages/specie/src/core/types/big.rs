use std::{fmt::Display, str::FromStr};

use primitive_types::U256;
use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug)]
pub enum BigError {
    #[error("Arithmetic overflow computing {lhs} {op} {rhs}")]
    Overflow {
        lhs: Big,
        op: &'static str,
        rhs: Big,
    },
    #[error("Arithmetic underflow computing {lhs} - {rhs}")]
    Underflow { lhs: Big, rhs: Big },
    #[error("Ratio {ratio} is out of range, expected 0 through 1")]
    RatioOutOfRange { ratio: Decimal },
    #[error("Could not parse {input:?} as a decimal integer")]
    InvalidDecimal { input: String },
}

/// Unsigned wide integer used for balances, fees and supply aggregates.
///
/// Balances are never allowed to go negative: subtraction is checked before
/// any mutation is produced, so the type itself has no sign.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Big(U256);

impl Big {
    pub const ZERO: Big = Big(U256([0; 4]));

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Big) -> Option<Big> {
        self.0.checked_add(rhs.0).map(Big)
    }

    pub fn checked_sub(self, rhs: Big) -> Option<Big> {
        self.0.checked_sub(rhs.0).map(Big)
    }

    pub fn add(self, rhs: Big) -> Result<Big, BigError> {
        self.checked_add(rhs).ok_or(BigError::Overflow {
            lhs: self,
            op: "+",
            rhs,
        })
    }

    pub fn sub(self, rhs: Big) -> Result<Big, BigError> {
        self.checked_sub(rhs)
            .ok_or(BigError::Underflow { lhs: self, rhs })
    }

    /// Multiply by a ratio in [0, 1], truncating toward zero.
    ///
    /// The computation is exact integer arithmetic over the ratio's decimal
    /// mantissa and scale, so results are deterministic across platforms.
    pub fn mul_ratio(self, ratio: Decimal) -> Result<Big, BigError> {
        if ratio.is_sign_negative() || ratio > Decimal::ONE {
            return Err(BigError::RatioOutOfRange { ratio });
        }
        if ratio.is_zero() {
            return Ok(Big::ZERO);
        }
        if ratio == Decimal::ONE {
            return Ok(self);
        }
        let mantissa = U256::from(ratio.mantissa().unsigned_abs());
        let divisor = U256::from(10u64).pow(U256::from(ratio.scale()));
        let scaled = self.0.checked_mul(mantissa).ok_or(BigError::Overflow {
            lhs: self,
            op: "*",
            rhs: Big(mantissa),
        })?;
        Ok(Big(scaled / divisor))
    }

    pub fn from_dec_str(input: &str) -> Result<Self, BigError> {
        U256::from_dec_str(input)
            .map(Big)
            .map_err(|_| BigError::InvalidDecimal {
                input: input.to_owned(),
            })
    }
}

impl From<u64> for Big {
    fn from(value: u64) -> Self {
        Big(U256::from(value))
    }
}

impl From<u128> for Big {
    fn from(value: u128) -> Self {
        Big(U256::from(value))
    }
}

impl FromStr for Big {
    type Err = BigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Big::from_dec_str(s)
    }
}

impl Display for Big {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for Big {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl serde::Serialize for Big {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Big {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Big::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}
