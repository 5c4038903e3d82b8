use jiff::Timestamp;
use smallvec::SmallVec;

use crate::*;

/// One authorizing signature over an operation's fact.
///
/// Signatures are cryptographically verified by the host before processing;
/// the engine itself only checks weight sufficiency.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct FactSignature {
    pub signer: PublicKey,
    pub signature: Signature,
}

/// A fact plus one or more authorizing signatures.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Operation {
    fact: TaggedJson<OperationFact>,
    signatures: Vec<FactSignature>,
}

impl Operation {
    pub fn new(fact: OperationFact) -> Result<Self, serde_json::Error> {
        Ok(Operation {
            fact: TaggedJson::new(fact)?,
            signatures: Vec::new(),
        })
    }

    /// Append a signature over the fact bytes.
    pub fn sign(mut self, secret: &SecretKey) -> Result<Self, SecretKeyError> {
        let signature = secret.sign(self.fact.as_bytes())?;
        self.signatures.push(FactSignature {
            signer: secret.public_key(),
            signature,
        });
        Ok(self)
    }

    /// The immutable, hash-addressed payload.
    pub fn fact(&self) -> &OperationFact {
        self.fact.as_inner()
    }

    pub fn hash(&self) -> OperationHash {
        self.fact.hash()
    }

    pub fn kind(&self) -> OperationKind {
        self.fact().kind()
    }

    pub fn signatures(&self) -> &[FactSignature] {
        &self.signatures
    }

    /// The deduplicated set of signer keys.
    pub fn signers(&self) -> BTreeSet<PublicKey> {
        self.signatures.iter().map(|sig| sig.signer).collect()
    }

    /// Host-side helper: check every signature cryptographically.
    ///
    /// Processors never call this; they assume it has already passed.
    pub fn verify_signatures(&self) -> Result<()> {
        anyhow::ensure!(!self.signatures.is_empty(), "Operation carries no signatures");
        for FactSignature { signer, signature } in &self.signatures {
            signer
                .verify(self.fact.as_bytes(), signature)
                .with_context(|| format!("Bad signature on operation {}", self.hash()))?;
        }
        Ok(())
    }
}

/// Kind tag for an operation, used for processor dispatch and display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    CreateAccount,
    Transfer,
    CreateContractAccount,
    Withdraw,
    Mint,
    SuffrageInflation,
    CurrencyRegister,
    CurrencyPolicyUpdate,
}

/// The closed set of facts this engine processes.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum OperationFact {
    CreateAccount(CreateAccountFact),
    Transfer(TransferFact),
    CreateContractAccount(CreateContractAccountFact),
    Withdraw(WithdrawFact),
    Mint(MintFact),
    SuffrageInflation(SuffrageInflationFact),
    CurrencyRegister(CurrencyRegisterFact),
    CurrencyPolicyUpdate(CurrencyPolicyUpdateFact),
}

impl OperationFact {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationFact::CreateAccount(_) => OperationKind::CreateAccount,
            OperationFact::Transfer(_) => OperationKind::Transfer,
            OperationFact::CreateContractAccount(_) => OperationKind::CreateContractAccount,
            OperationFact::Withdraw(_) => OperationKind::Withdraw,
            OperationFact::Mint(_) => OperationKind::Mint,
            OperationFact::SuffrageInflation(_) => OperationKind::SuffrageInflation,
            OperationFact::CurrencyRegister(_) => OperationKind::CurrencyRegister,
            OperationFact::CurrencyPolicyUpdate(_) => OperationKind::CurrencyPolicyUpdate,
        }
    }

    /// Stateless structural validation.
    pub fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        match self {
            OperationFact::CreateAccount(fact) => fact.is_valid(config),
            OperationFact::Transfer(fact) => fact.is_valid(config),
            OperationFact::CreateContractAccount(fact) => fact.is_valid(config),
            OperationFact::Withdraw(fact) => fact.is_valid(config),
            OperationFact::Mint(fact) => fact.is_valid(config),
            OperationFact::SuffrageInflation(fact) => fact.is_valid(config),
            OperationFact::CurrencyRegister(fact) => fact.is_valid(),
            OperationFact::CurrencyPolicyUpdate(fact) => fact.is_valid(),
        }
    }
}

/// Short vector of per-currency amounts carried by one item.
pub type ItemAmounts = SmallVec<[Amount; 2]>;

/// Every amount must be positive and each currency may appear at most once
/// within one item.
fn validate_amounts(amounts: &[Amount]) -> Result<(), Rejection> {
    if amounts.is_empty() {
        return Err(Rejection::EmptyAmounts);
    }
    let mut seen = BTreeSet::new();
    for amount in amounts {
        if amount.is_zero() {
            return Err(Rejection::ZeroAmount {
                currency: amount.currency.clone(),
            });
        }
        if !seen.insert(&amount.currency) {
            return Err(Rejection::DuplicateCurrencyInItem {
                currency: amount.currency.clone(),
            });
        }
    }
    Ok(())
}

fn validate_item_count(len: usize, config: &ProcessorConfig) -> Result<(), Rejection> {
    if len == 0 {
        return Err(Rejection::EmptyItems);
    }
    if len > config.max_operation_items {
        return Err(Rejection::TooManyItems {
            actual: len,
            max: config.max_operation_items,
        });
    }
    Ok(())
}

fn validate_unique_targets<'a>(
    targets: impl Iterator<Item = &'a Address>,
) -> Result<(), Rejection> {
    let mut seen = BTreeSet::new();
    for target in targets {
        if !seen.insert(target) {
            return Err(Rejection::DuplicateTarget {
                address: target.clone(),
            });
        }
    }
    Ok(())
}

/// One new account requested by a create-account operation.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CreateAccountItem {
    pub keys: AccountKeys,
    #[serde(default)]
    pub kind: AddressKind,
    pub amounts: ItemAmounts,
}

impl CreateAccountItem {
    /// The address the new account will live at, derived from its key set.
    pub fn address(&self) -> Address {
        Address::from_keys(&self.keys, self.kind)
    }

    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        if self.keys.keys().len() > config.max_account_keys {
            return Err(Rejection::TooManyKeys {
                actual: self.keys.keys().len(),
                max: config.max_account_keys,
            });
        }
        validate_amounts(&self.amounts)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CreateAccountFact {
    pub token: Timestamp,
    pub sender: Address,
    pub items: Vec<CreateAccountItem>,
}

impl CreateAccountFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_item_count(self.items.len(), config)?;
        for item in &self.items {
            item.is_valid(config)?;
            if item.address() == self.sender {
                return Err(Rejection::TargetSameAsSender {
                    address: item.address(),
                });
            }
        }
        let targets: Vec<Address> = self.items.iter().map(CreateAccountItem::address).collect();
        validate_unique_targets(targets.iter())
    }
}

/// One receiver credited by a transfer operation.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct TransferItem {
    pub receiver: Address,
    pub amounts: ItemAmounts,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct TransferFact {
    pub token: Timestamp,
    pub sender: Address,
    pub items: Vec<TransferItem>,
}

impl TransferFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_item_count(self.items.len(), config)?;
        for item in &self.items {
            validate_amounts(&item.amounts)?;
        }
        validate_unique_targets(self.items.iter().map(|item| &item.receiver))
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CreateContractAccountFact {
    pub token: Timestamp,
    pub sender: Address,
    pub items: Vec<CreateAccountItem>,
}

impl CreateContractAccountFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_item_count(self.items.len(), config)?;
        for item in &self.items {
            item.is_valid(config)?;
            if item.address() == self.sender {
                return Err(Rejection::TargetSameAsSender {
                    address: item.address(),
                });
            }
        }
        let targets: Vec<Address> = self.items.iter().map(CreateAccountItem::address).collect();
        validate_unique_targets(targets.iter())
    }
}

/// One contract account drawn from by a withdraw operation.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct WithdrawItem {
    pub target: Address,
    pub amounts: ItemAmounts,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct WithdrawFact {
    pub token: Timestamp,
    pub sender: Address,
    pub items: Vec<WithdrawItem>,
}

impl WithdrawFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_item_count(self.items.len(), config)?;
        for item in &self.items {
            validate_amounts(&item.amounts)?;
            if item.target == self.sender {
                return Err(Rejection::TargetSameAsSender {
                    address: item.target.clone(),
                });
            }
        }
        validate_unique_targets(self.items.iter().map(|item| &item.target))
    }
}

/// One receiver credited by a mint or inflation operation.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct IssueItem {
    pub receiver: Address,
    pub amount: Amount,
}

fn validate_issue_items(items: &[IssueItem], config: &ProcessorConfig) -> Result<(), Rejection> {
    validate_item_count(items.len(), config)?;
    let mut seen = BTreeSet::new();
    for item in items {
        if item.amount.is_zero() {
            return Err(Rejection::ZeroAmount {
                currency: item.amount.currency.clone(),
            });
        }
        if !seen.insert((&item.receiver, &item.amount.currency)) {
            return Err(Rejection::DuplicateIssuanceTarget {
                address: item.receiver.clone(),
                currency: item.amount.currency.clone(),
            });
        }
    }
    Ok(())
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct MintFact {
    pub token: Timestamp,
    pub items: Vec<IssueItem>,
}

impl MintFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_issue_items(&self.items, config)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SuffrageInflationFact {
    pub token: Timestamp,
    pub items: Vec<IssueItem>,
}

impl SuffrageInflationFact {
    fn is_valid(&self, config: &ProcessorConfig) -> Result<(), Rejection> {
        validate_issue_items(&self.items, config)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CurrencyRegisterFact {
    pub token: Timestamp,
    pub design: CurrencyDesign,
}

impl CurrencyRegisterFact {
    fn is_valid(&self) -> Result<(), Rejection> {
        if self.design.initial_supply().is_zero() {
            return Err(Rejection::ZeroAmount {
                currency: self.design.currency().clone(),
            });
        }
        self.design.policy().validate()?;
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CurrencyPolicyUpdateFact {
    pub token: Timestamp,
    pub currency: CurrencyId,
    pub policy: CurrencyPolicy,
}

impl CurrencyPolicyUpdateFact {
    fn is_valid(&self) -> Result<(), Rejection> {
        self.policy.validate()?;
        Ok(())
    }
}
