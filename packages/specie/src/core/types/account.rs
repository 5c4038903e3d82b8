use crate::*;

/// Information on a specific account.
///
/// An address with no key set is a zero account: the per-currency sink that
/// anchors balance bookkeeping. It participates in no signature checks.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Account {
    address: Address,
    keys: Option<AccountKeys>,
}

impl Account {
    pub fn new(keys: AccountKeys, kind: AddressKind) -> Self {
        Account {
            address: Address::from_keys(&keys, kind),
            keys: Some(keys),
        }
    }

    /// A contract account derived from the creator-provided key set, but
    /// stamped with the unsatisfiable contract key set.
    pub fn contract(keys: &AccountKeys, kind: AddressKind) -> Self {
        Account {
            address: Address::from_keys(keys, kind),
            keys: Some(AccountKeys::contract()),
        }
    }

    pub fn zero(currency: &CurrencyId) -> Self {
        Account {
            address: Address::zero(currency),
            keys: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn keys(&self) -> Option<&AccountKeys> {
        self.keys.as_ref()
    }

    pub fn is_zero(&self) -> bool {
        self.keys.is_none()
    }
}

/// Ownership record of a contract account.
///
/// A contract account's balance can only be reduced through a withdraw
/// operation signed by the recorded owner, never through the contract
/// account's own key set.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct ContractAccountStatus {
    owner: Address,
    is_active: bool,
}

impl ContractAccountStatus {
    pub fn new(owner: Address) -> Self {
        ContractAccountStatus {
            owner,
            is_active: true,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn deactivate(self) -> Self {
        ContractAccountStatus {
            is_active: false,
            ..self
        }
    }
}
