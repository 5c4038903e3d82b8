use crate::*;

/// The active validator set and its voting weights.
///
/// Used only for currency-administration operations; ordinary user
/// operations authorize against the account's own key set.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Suffrage {
    nodes: BTreeMap<PublicKey, Weight>,
    threshold: Weight,
}

impl Suffrage {
    pub fn new(nodes: BTreeMap<PublicKey, Weight>, threshold: Weight) -> Self {
        Suffrage { nodes, threshold }
    }

    pub fn nodes(&self) -> &BTreeMap<PublicKey, Weight> {
        &self.nodes
    }

    pub fn threshold(&self) -> Weight {
        self.threshold
    }
}

/// Account-level authorization: sum the weights of the account keys that
/// signed and require the account threshold.
///
/// An unknown signer is a hard failure, not silently ignored.
pub fn check_threshold(
    address: &Address,
    keys: &AccountKeys,
    signers: &BTreeSet<PublicKey>,
) -> Result<(), Rejection> {
    if signers.is_empty() {
        return Err(Rejection::NoSignatures);
    }
    let mut total = 0u32;
    for signer in signers {
        match keys.weight_of(signer) {
            Some(weight) => total += u32::from(weight.get()),
            None => {
                return Err(Rejection::UnknownSigner {
                    signer: Box::new(*signer),
                    address: address.clone(),
                })
            }
        }
    }
    if total < u32::from(keys.threshold().get()) {
        return Err(Rejection::InsufficientWeight {
            address: address.clone(),
            total,
            threshold: keys.threshold(),
        });
    }
    Ok(())
}

/// Node-level authorization: the same weighted-threshold algorithm over the
/// active suffrage.
pub fn check_suffrage(suffrage: &Suffrage, signers: &BTreeSet<PublicKey>) -> Result<(), Rejection> {
    if signers.is_empty() {
        return Err(Rejection::NoSignatures);
    }
    let mut total = 0u32;
    for signer in signers {
        match suffrage.nodes().get(signer) {
            Some(weight) => total += u32::from(weight.get()),
            None => {
                return Err(Rejection::NotSuffrageNode {
                    signer: Box::new(*signer),
                })
            }
        }
    }
    if total < u32::from(suffrage.threshold().get()) {
        return Err(Rejection::InsufficientSuffrage {
            total,
            threshold: suffrage.threshold(),
        });
    }
    Ok(())
}

/// Load the suffrage from its well-known state key.
///
/// Absence at the requested height means this height cannot be processed at
/// all right now; that is a retry signal, not a rejection.
pub fn load_suffrage(
    reader: &dyn StateReader,
    height: BlockHeight,
) -> Result<Suffrage, ProcessError> {
    let state = reader
        .get_state(SUFFRAGE_STATE_KEY)?
        .ok_or(HeightRetry::MissingSuffrage { height })?;
    Ok(state.as_suffrage()?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(index: u8) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = index.saturating_add(1);
        SecretKey::from_hex(&hex::encode(bytes)).unwrap()
    }

    fn keyset(weights: &[u8], threshold: u8) -> (Address, AccountKeys) {
        let keys = weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                AccountKey::new(secret(i as u8).public_key(), Weight::new(*w).unwrap())
            })
            .collect();
        let keys = AccountKeys::new(keys, Weight::new(threshold).unwrap()).unwrap();
        (Address::from_keys(&keys, AddressKind::Standard), keys)
    }

    fn signers(indexes: &[u8]) -> BTreeSet<PublicKey> {
        indexes.iter().map(|i| secret(*i).public_key()).collect()
    }

    #[test]
    fn single_key_meets_threshold() {
        let (address, keys) = keyset(&[100], 100);
        check_threshold(&address, &keys, &signers(&[0])).unwrap();
    }

    #[test]
    fn weight_sum_below_threshold_rejects() {
        let (address, keys) = keyset(&[40, 40, 40], 100);
        assert!(matches!(
            check_threshold(&address, &keys, &signers(&[0, 1])).unwrap_err(),
            Rejection::InsufficientWeight { total: 80, .. }
        ));
        check_threshold(&address, &keys, &signers(&[0, 1, 2])).unwrap();
    }

    #[test]
    fn unknown_signer_rejects_regardless_of_others() {
        let (address, keys) = keyset(&[60, 60], 100);
        // signers 0 and 1 alone would authorize, but 9 is not in the set
        assert!(matches!(
            check_threshold(&address, &keys, &signers(&[0, 1, 9])).unwrap_err(),
            Rejection::UnknownSigner { .. }
        ));
    }

    #[test]
    fn empty_signers_reject() {
        let (address, keys) = keyset(&[100], 100);
        assert!(matches!(
            check_threshold(&address, &keys, &BTreeSet::new()).unwrap_err(),
            Rejection::NoSignatures
        ));
    }

    #[test]
    fn contract_keys_reject_every_signer() {
        let (address, _) = keyset(&[100], 100);
        let contract = AccountKeys::contract();
        assert!(matches!(
            check_threshold(&address, &contract, &signers(&[0])).unwrap_err(),
            Rejection::UnknownSigner { .. }
        ));
    }

    #[test]
    fn suffrage_threshold() {
        let nodes = [
            (secret(0).public_key(), Weight::new(50).unwrap()),
            (secret(1).public_key(), Weight::new(50).unwrap()),
        ]
        .into_iter()
        .collect();
        let suffrage = Suffrage::new(nodes, Weight::new(100).unwrap());
        assert!(matches!(
            check_suffrage(&suffrage, &signers(&[0])).unwrap_err(),
            Rejection::InsufficientSuffrage { total: 50, .. }
        ));
        check_suffrage(&suffrage, &signers(&[0, 1])).unwrap();
        assert!(matches!(
            check_suffrage(&suffrage, &signers(&[0, 5])).unwrap_err(),
            Rejection::NotSuffrageNode { .. }
        ));
    }

    #[test]
    fn missing_suffrage_is_retry() {
        let reader = StateLookup(|_: &str| -> Result<Option<State>> { Ok(None) });
        let err = load_suffrage(&reader, BlockHeight(7)).unwrap_err();
        assert!(err.is_retry());
    }
}
