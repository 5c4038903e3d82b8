use crate::*;

/// A business-rule failure: the operation is well-formed but not acceptable
/// against current state. Surfaced to the submitter; the operation is
/// dropped, never retried.
#[derive(thiserror::Error, Debug)]
pub enum Rejection {
    #[error("Operation has no items")]
    EmptyItems,
    #[error("Operation has {actual} items, maximum {max}")]
    TooManyItems { actual: usize, max: usize },
    #[error("Key set has {actual} keys, maximum {max}")]
    TooManyKeys { actual: usize, max: usize },
    #[error("Item has no amounts")]
    EmptyAmounts,
    #[error("Amount of {currency} must be greater than zero")]
    ZeroAmount { currency: CurrencyId },
    #[error("Currency {currency} appears more than once within one item")]
    DuplicateCurrencyInItem { currency: CurrencyId },
    #[error("Duplicate target {address} within one operation")]
    DuplicateTarget { address: Address },
    #[error("Duplicate issuance target {address} for currency {currency}")]
    DuplicateIssuanceTarget {
        address: Address,
        currency: CurrencyId,
    },
    #[error("Target address {address} is the same as the sender")]
    TargetSameAsSender { address: Address },
    #[error("Currency {currency} is not registered")]
    UnknownCurrency { currency: CurrencyId },
    #[error("Currency {currency} is already registered")]
    CurrencyAlreadyRegistered { currency: CurrencyId },
    #[error("Account {address} does not exist")]
    UnknownAccount { address: Address },
    #[error("Account {address} already exists")]
    AccountAlreadyExists { address: Address },
    #[error("Balance of {currency} for account {address} does not exist")]
    UnknownBalance {
        address: Address,
        currency: CurrencyId,
    },
    #[error("Insufficient balance for account {address}, currency {currency}. Requested: {requested}. Available: {available}.")]
    InsufficientBalance {
        address: Address,
        currency: CurrencyId,
        requested: Big,
        available: Big,
    },
    #[error("Contract account {address} may not originate this operation")]
    ContractAccountForbidden { address: Address },
    #[error("Account {address} is not a contract account")]
    NotContractAccount { address: Address },
    #[error("Contract account {address} is deactivated")]
    InactiveContractAccount { address: Address },
    #[error("Sender {sender} is not the owner of contract account {address}")]
    NotContractOwner { sender: Address, address: Address },
    #[error("Operation carries no signatures")]
    NoSignatures,
    #[error("Account {address} has no usable keys")]
    NoUsableKeys { address: Address },
    #[error("Signer {signer} is not a key of account {address}")]
    UnknownSigner {
        signer: Box<PublicKey>,
        address: Address,
    },
    #[error("Signature weight {total} does not meet threshold {threshold} for account {address}")]
    InsufficientWeight {
        address: Address,
        total: u32,
        threshold: Weight,
    },
    #[error("Signer {signer} is not a suffrage node")]
    NotSuffrageNode { signer: Box<PublicKey> },
    #[error("Suffrage weight {total} does not meet threshold {threshold}")]
    InsufficientSuffrage { total: u32, threshold: Weight },
    #[error("Fee receiver {address} has no balance of {currency}")]
    UnknownFeeReceiver {
        address: Address,
        currency: CurrencyId,
    },
    #[error("Fee receiver {address} does not have an account")]
    UnknownFeeReceiverAccount { address: Address },
    #[error("Deposit of {amount} is below the minimum new-account balance {min} for {currency}")]
    BelowMinimumBalance {
        currency: CurrencyId,
        amount: Big,
        min: Big,
    },
    #[error(transparent)]
    Arithmetic(#[from] BigError),
    #[error(transparent)]
    InvalidPolicy(#[from] CurrencyError),
}

/// A transient conflict: the whole height's computation must be redone.
/// This is not the submitter's fault and is never surfaced as a rejection.
#[derive(thiserror::Error, Debug)]
pub enum HeightRetry {
    #[error("State key {key} became occupied at height {height}, stop and retry")]
    StateOccupied { key: String, height: BlockHeight },
    #[error("Suffrage state is missing at height {height}, stop and retry")]
    MissingSuffrage { height: BlockHeight },
}

/// The three failure kinds of operation processing, never conflated.
///
/// Lower-level helpers return the most specific kind immediately; processors
/// wrap but do not swallow, so the host can apply the correct recovery
/// (drop vs. retry vs. halt).
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Reject(#[from] Rejection),
    #[error(transparent)]
    Retry(#[from] HeightRetry),
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ProcessError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProcessError::Reject(_))
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, ProcessError::Retry(_))
    }

    pub fn as_rejection(&self) -> Option<&Rejection> {
        match self {
            ProcessError::Reject(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl From<BigError> for ProcessError {
    fn from(value: BigError) -> Self {
        ProcessError::Reject(Rejection::Arithmetic(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguished() {
        let reject = ProcessError::from(Rejection::EmptyItems);
        assert!(reject.is_rejection());
        assert!(!reject.is_retry());

        let retry = ProcessError::from(HeightRetry::MissingSuffrage {
            height: BlockHeight(3),
        });
        assert!(retry.is_retry());
        assert!(!retry.is_rejection());

        let fatal = ProcessError::from(anyhow::anyhow!("unexpected concrete type"));
        assert!(!fatal.is_rejection());
        assert!(!fatal.is_retry());
    }
}
