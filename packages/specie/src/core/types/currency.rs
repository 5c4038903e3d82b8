use rust_decimal::Decimal;

use crate::*;

#[derive(thiserror::Error, Debug)]
pub enum CurrencyError {
    #[error("Fee ratio {ratio} is out of range, expected 0 through 1")]
    RatioOutOfRange { ratio: Decimal },
    #[error("Fee minimum {min} exceeds maximum {max}")]
    MinExceedsMax { min: Big, max: Big },
    #[error("Initial supply of {currency} must be greater than zero")]
    ZeroInitialSupply { currency: CurrencyId },
}

/// How fees are computed for a currency.
///
/// The fee is always computed from the transferred amount, never from the
/// payer's total balance.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Feeer {
    Nil,
    Fixed {
        amount: Big,
        receiver: Address,
    },
    Ratio {
        ratio: Decimal,
        min: Big,
        /// `None` means uncapped.
        max: Option<Big>,
        receiver: Address,
    },
}

impl Feeer {
    pub fn validate(&self) -> Result<(), CurrencyError> {
        match self {
            Feeer::Nil | Feeer::Fixed { .. } => Ok(()),
            Feeer::Ratio {
                ratio, min, max, ..
            } => {
                if ratio.is_sign_negative() || *ratio > Decimal::ONE {
                    return Err(CurrencyError::RatioOutOfRange { ratio: *ratio });
                }
                if let Some(max) = max {
                    if min > max {
                        return Err(CurrencyError::MinExceedsMax {
                            min: *min,
                            max: *max,
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Compute the fee owed for transferring `transferred` of this currency.
    pub fn fee(&self, transferred: Big) -> Result<Big, BigError> {
        match self {
            Feeer::Nil => Ok(Big::ZERO),
            Feeer::Fixed { amount, .. } => Ok(*amount),
            Feeer::Ratio {
                ratio, min, max, ..
            } => {
                if ratio.is_zero() {
                    return Ok(Big::ZERO);
                }
                if transferred.is_zero() {
                    return Ok(*min);
                }
                if *ratio == Decimal::ONE {
                    return Ok(transferred);
                }
                let mut fee = transferred.mul_ratio(*ratio)?;
                if fee < *min {
                    fee = *min;
                }
                if let Some(max) = max {
                    if fee > *max {
                        fee = *max;
                    }
                }
                Ok(fee)
            }
        }
    }

    pub fn receiver(&self) -> Option<&Address> {
        match self {
            Feeer::Nil => None,
            Feeer::Fixed { receiver, .. } | Feeer::Ratio { receiver, .. } => Some(receiver),
        }
    }
}

/// Per-currency rules: the minimum balance a newly created account must be
/// funded with, and how fees are computed.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CurrencyPolicy {
    pub new_account_min_balance: Big,
    pub feeer: Feeer,
}

impl CurrencyPolicy {
    pub fn new(new_account_min_balance: Big, feeer: Feeer) -> Result<Self, CurrencyError> {
        feeer.validate()?;
        Ok(CurrencyPolicy {
            new_account_min_balance,
            feeer,
        })
    }

    pub fn validate(&self) -> Result<(), CurrencyError> {
        self.feeer.validate()
    }
}

/// The registered design of a currency.
///
/// `aggregate` is the audit trail of total issued supply: it starts at the
/// registration amount and only ever grows through mint and inflation.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CurrencyDesign {
    initial_supply: Amount,
    genesis_account: Address,
    policy: CurrencyPolicy,
    aggregate: Big,
}

impl CurrencyDesign {
    pub fn new(
        initial_supply: Amount,
        genesis_account: Address,
        policy: CurrencyPolicy,
    ) -> Result<Self, CurrencyError> {
        if initial_supply.is_zero() {
            return Err(CurrencyError::ZeroInitialSupply {
                currency: initial_supply.currency.clone(),
            });
        }
        policy.validate()?;
        Ok(CurrencyDesign {
            aggregate: initial_supply.big,
            initial_supply,
            genesis_account,
            policy,
        })
    }

    pub fn currency(&self) -> &CurrencyId {
        &self.initial_supply.currency
    }

    pub fn initial_supply(&self) -> &Amount {
        &self.initial_supply
    }

    pub fn genesis_account(&self) -> &Address {
        &self.genesis_account
    }

    pub fn policy(&self) -> &CurrencyPolicy {
        &self.policy
    }

    pub fn aggregate(&self) -> Big {
        self.aggregate
    }

    pub fn add_aggregate(mut self, amount: Big) -> Result<Self, BigError> {
        self.aggregate = self.aggregate.add(amount)?;
        Ok(self)
    }

    pub fn set_policy(mut self, policy: CurrencyPolicy) -> Result<Self, CurrencyError> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    fn currency() -> CurrencyId {
        CurrencyId::new("FOO").unwrap()
    }

    fn receiver() -> Address {
        Address::zero(&currency())
    }

    #[test]
    fn nil_feeer_is_free() {
        assert_eq!(Feeer::Nil.fee(Big::from(1000u64)).unwrap(), Big::ZERO);
        assert_eq!(Feeer::Nil.receiver(), None);
    }

    #[test]
    fn fixed_feeer_is_flat() {
        let feeer = Feeer::Fixed {
            amount: Big::from(10u64),
            receiver: receiver(),
        };
        assert_eq!(feeer.fee(Big::from(1u64)).unwrap(), Big::from(10u64));
        assert_eq!(feeer.fee(Big::from(100_000u64)).unwrap(), Big::from(10u64));
    }

    #[test]
    fn ratio_feeer_scales_and_clamps() {
        let feeer = Feeer::Ratio {
            ratio: dec!(0.1),
            min: Big::from(2u64),
            max: Some(Big::from(50u64)),
            receiver: receiver(),
        };
        // 0.1 * 300 = 30
        assert_eq!(feeer.fee(Big::from(300u64)).unwrap(), Big::from(30u64));
        // clamped up to min
        assert_eq!(feeer.fee(Big::from(10u64)).unwrap(), Big::from(2u64));
        // clamped down to max
        assert_eq!(feeer.fee(Big::from(10_000u64)).unwrap(), Big::from(50u64));
    }

    #[test]
    fn ratio_feeer_edge_cases() {
        let uncapped = Feeer::Ratio {
            ratio: dec!(0.5),
            min: Big::from(1u64),
            max: None,
            receiver: receiver(),
        };
        assert_eq!(
            uncapped.fee(Big::from(1_000_000u64)).unwrap(),
            Big::from(500_000u64)
        );

        let zero_ratio = Feeer::Ratio {
            ratio: Decimal::ZERO,
            min: Big::from(5u64),
            max: None,
            receiver: receiver(),
        };
        assert_eq!(zero_ratio.fee(Big::from(100u64)).unwrap(), Big::ZERO);

        let full_ratio = Feeer::Ratio {
            ratio: Decimal::ONE,
            min: Big::ZERO,
            max: None,
            receiver: receiver(),
        };
        assert_eq!(full_ratio.fee(Big::from(77u64)).unwrap(), Big::from(77u64));

        // zero transferred returns the configured minimum
        assert_eq!(uncapped.fee(Big::ZERO).unwrap(), Big::from(1u64));
    }

    #[test]
    fn feeer_validation() {
        Feeer::Ratio {
            ratio: dec!(1.5),
            min: Big::ZERO,
            max: None,
            receiver: receiver(),
        }
        .validate()
        .unwrap_err();

        Feeer::Ratio {
            ratio: dec!(0.5),
            min: Big::from(10u64),
            max: Some(Big::from(5u64)),
            receiver: receiver(),
        }
        .validate()
        .unwrap_err();

        // unlimited max never conflicts with min
        Feeer::Ratio {
            ratio: dec!(0.5),
            min: Big::from(10u64),
            max: None,
            receiver: receiver(),
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn design_tracks_aggregate() {
        let design = CurrencyDesign::new(
            Amount::new(Big::from(1000u64), currency()),
            receiver(),
            CurrencyPolicy::new(Big::ZERO, Feeer::Nil).unwrap(),
        )
        .unwrap();
        assert_eq!(design.aggregate(), Big::from(1000u64));
        let design = design.add_aggregate(Big::from(500u64)).unwrap();
        assert_eq!(design.aggregate(), Big::from(1500u64));
        // initial supply is untouched by later issuance
        assert_eq!(design.initial_supply().big, Big::from(1000u64));
    }

    #[test]
    fn design_rejects_zero_supply() {
        CurrencyDesign::new(
            Amount::zero(currency()),
            receiver(),
            CurrencyPolicy::new(Big::ZERO, Feeer::Nil).unwrap(),
        )
        .unwrap_err();
    }
}
