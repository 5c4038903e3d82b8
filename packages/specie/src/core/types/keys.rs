use std::fmt::Display;

use sha3::{Digest, Keccak256};

use crate::*;

#[derive(thiserror::Error, Debug)]
pub enum KeysError {
    #[error("Weight {weight} is out of range, expected 1 through 100")]
    WeightOutOfRange { weight: u8 },
    #[error("Threshold {threshold} is out of range, expected 1 through 100")]
    ThresholdOutOfRange { threshold: u8 },
    #[error("Key set must contain at least one key")]
    EmptyKeys,
    #[error("Duplicate public key {key} in key set")]
    DuplicateKey { key: Box<PublicKey> },
    #[error("Sum of weights {total} cannot satisfy threshold {threshold}")]
    UnreachableThreshold { total: u32, threshold: u8 },
}

/// Signing weight of a single key, or a key set threshold. Always 1..=100.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weight(u8);

impl Weight {
    pub fn new(weight: u8) -> Result<Self, KeysError> {
        if (1..=100).contains(&weight) {
            Ok(Weight(weight))
        } else {
            Err(KeysError::WeightOutOfRange { weight })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Weight {
    type Error = KeysError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Weight::new(value)
    }
}

impl From<Weight> for u8 {
    fn from(value: Weight) -> Self {
        value.0
    }
}

impl Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A single weighted key within an account's key set.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct AccountKey {
    pub key: PublicKey,
    pub weight: Weight,
}

impl AccountKey {
    pub fn new(key: PublicKey, weight: Weight) -> Self {
        AccountKey { key, weight }
    }
}

/// Ordered set of weighted keys plus a threshold.
///
/// Content-addressed: two key sets with the same keys, weights and threshold
/// hash identically, which is what account addresses are derived from. The
/// key-less threshold-100 form marks contract accounts; no signature set can
/// ever satisfy it.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(try_from = "RawAccountKeys", into = "RawAccountKeys")]
pub struct AccountKeys {
    keys: Vec<AccountKey>,
    threshold: Weight,
}

#[derive(serde::Serialize, serde::Deserialize, Clone)]
struct RawAccountKeys {
    keys: Vec<AccountKey>,
    threshold: Weight,
}

impl From<AccountKeys> for RawAccountKeys {
    fn from(value: AccountKeys) -> Self {
        RawAccountKeys {
            keys: value.keys,
            threshold: value.threshold,
        }
    }
}

impl TryFrom<RawAccountKeys> for AccountKeys {
    type Error = KeysError;

    fn try_from(value: RawAccountKeys) -> Result<Self, Self::Error> {
        if value.keys.is_empty() {
            // Round-tripping the contract key set lands here.
            if value.threshold == Weight(100) {
                return Ok(AccountKeys::contract());
            }
            return Err(KeysError::EmptyKeys);
        }
        AccountKeys::new(value.keys, value.threshold)
    }
}

impl AccountKeys {
    pub fn new(mut keys: Vec<AccountKey>, threshold: Weight) -> Result<Self, KeysError> {
        if keys.is_empty() {
            return Err(KeysError::EmptyKeys);
        }
        keys.sort_by(|a, b| a.key.cmp(&b.key));
        for pair in keys.windows(2) {
            if pair[0].key == pair[1].key {
                return Err(KeysError::DuplicateKey {
                    key: Box::new(pair[0].key),
                });
            }
        }
        let total = keys.iter().map(|k| u32::from(k.weight.get())).sum::<u32>();
        if total < u32::from(threshold.get()) {
            return Err(KeysError::UnreachableThreshold {
                total,
                threshold: threshold.get(),
            });
        }
        Ok(AccountKeys { keys, threshold })
    }

    /// The fixed, unsatisfiable key set stamped onto contract accounts.
    pub fn contract() -> Self {
        AccountKeys {
            keys: Vec::new(),
            threshold: Weight(100),
        }
    }

    pub fn is_contract(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[AccountKey] {
        &self.keys
    }

    pub fn threshold(&self) -> Weight {
        self.threshold
    }

    pub fn weight_of(&self, key: &PublicKey) -> Option<Weight> {
        self.keys.iter().find(|k| &k.key == key).map(|k| k.weight)
    }

    /// Canonical bytes the key set hash and derived addresses are computed over.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for key in &self.keys {
            bytes.extend_from_slice(key.key.to_string().as_bytes());
            bytes.push(b':');
            bytes.extend_from_slice(key.weight.to_string().as_bytes());
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(b"threshold:");
        bytes.extend_from_slice(self.threshold.to_string().as_bytes());
        bytes
    }

    pub fn keys_hash(&self) -> Sha256Hash {
        Sha256Hash::hash(self.canonical_bytes())
    }
}

/// Which address derivation a new account uses.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    Default,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum AddressKind {
    /// Hex SHA-256 over the canonical key set bytes.
    #[default]
    Standard,
    /// `0x`-prefixed last 20 bytes of Keccak-256, for eth-compatible tooling.
    Eth,
}

/// Ledger address of an account.
///
/// Derived deterministically from a key set, or reserved per-currency for
/// the zero account. Represented as its rendered string form.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
pub struct Address(String);

const ZERO_ADDRESS_SUFFIX: &str = "-zero";

impl Address {
    pub fn from_keys(keys: &AccountKeys, kind: AddressKind) -> Self {
        match kind {
            AddressKind::Standard => Address(keys.keys_hash().to_string()),
            AddressKind::Eth => {
                let digest = Keccak256::digest(keys.canonical_bytes());
                Address(format!("0x{}", hex::encode(&digest[12..])))
            }
        }
    }

    /// The reserved sink address for a currency. It has no key set and
    /// participates in no signature checks.
    pub fn zero(currency: &CurrencyId) -> Self {
        Address(format!("{currency}{ZERO_ADDRESS_SUFFIX}"))
    }

    pub fn is_zero(&self) -> bool {
        self.0.ends_with(ZERO_ADDRESS_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubkey(n: u8) -> PublicKey {
        let mut bytes = [0u8; 32];
        bytes[31] = n.saturating_add(1);
        SecretKey::from_hex(&hex::encode(bytes))
            .unwrap()
            .public_key()
    }

    fn keys(weights: &[u8], threshold: u8) -> Result<AccountKeys, KeysError> {
        let keys = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Ok(AccountKey::new(pubkey(i as u8), Weight::new(*w)?)))
            .collect::<Result<Vec<_>, _>>()?;
        AccountKeys::new(keys, Weight::new(threshold)?)
    }

    #[test]
    fn weight_bounds() {
        Weight::new(0).unwrap_err();
        Weight::new(1).unwrap();
        Weight::new(100).unwrap();
        Weight::new(101).unwrap_err();
    }

    #[test]
    fn rejects_unreachable_threshold() {
        keys(&[30, 30], 100).unwrap_err();
        keys(&[50, 50], 100).unwrap();
    }

    #[test]
    fn rejects_duplicate_keys() {
        let key = pubkey(1);
        let dup = vec![
            AccountKey::new(key, Weight::new(50).unwrap()),
            AccountKey::new(key, Weight::new(50).unwrap()),
        ];
        AccountKeys::new(dup, Weight::new(50).unwrap()).unwrap_err();
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = AccountKeys::new(
            vec![
                AccountKey::new(pubkey(0), Weight::new(40).unwrap()),
                AccountKey::new(pubkey(1), Weight::new(60).unwrap()),
            ],
            Weight::new(50).unwrap(),
        )
        .unwrap();
        let b = AccountKeys::new(
            vec![
                AccountKey::new(pubkey(1), Weight::new(60).unwrap()),
                AccountKey::new(pubkey(0), Weight::new(40).unwrap()),
            ],
            Weight::new(50).unwrap(),
        )
        .unwrap();
        assert_eq!(a.keys_hash(), b.keys_hash());
        assert_eq!(
            Address::from_keys(&a, AddressKind::Standard),
            Address::from_keys(&b, AddressKind::Standard)
        );
    }

    #[test]
    fn address_kinds_differ() {
        let set = keys(&[100], 100).unwrap();
        let standard = Address::from_keys(&set, AddressKind::Standard);
        let eth = Address::from_keys(&set, AddressKind::Eth);
        assert_ne!(standard, eth);
        assert!(eth.as_str().starts_with("0x"));
        assert_eq!(eth.as_str().len(), 42);
    }

    #[test]
    fn contract_keys_are_unsatisfiable() {
        let contract = AccountKeys::contract();
        assert!(contract.is_contract());
        assert_eq!(contract.weight_of(&pubkey(0)), None);
        assert_eq!(contract.threshold(), Weight::new(100).unwrap());
    }

    #[test]
    fn contract_keys_serde_roundtrip() {
        let contract = AccountKeys::contract();
        let json = serde_json::to_string(&contract).unwrap();
        let back: AccountKeys = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contract);
    }

    #[test]
    fn zero_address_is_per_currency() {
        let foo = Address::zero(&CurrencyId::new("FOO").unwrap());
        let bar = Address::zero(&CurrencyId::new("BAR").unwrap());
        assert_ne!(foo, bar);
        assert!(foo.is_zero());
    }
}
