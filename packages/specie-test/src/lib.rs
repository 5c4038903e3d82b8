use anyhow::Result;
use jiff::Timestamp;
use specie::*;
use std::collections::BTreeMap;

/// Deterministic secret key for test fixtures.
///
/// Seeds 0..=254 all produce valid scalars, so fixtures can mint as many
/// distinct identities as they need.
pub fn secret(seed: u8) -> SecretKey {
    let mut bytes = [0u8; 32];
    bytes[31] = seed.saturating_add(1);
    SecretKey::from_hex(&hex::encode(bytes)).unwrap()
}

/// Deterministic fact token so operation hashes are stable across runs.
pub fn token() -> Timestamp {
    Timestamp::UNIX_EPOCH
}

/// A token distinct from [token], for building two operations whose facts
/// would otherwise collide.
pub fn token_at(seconds: i64) -> Timestamp {
    Timestamp::from_second(seconds).unwrap()
}

/// A test identity: a secret key, its single-key weight-100 key set, and
/// the standard address derived from it.
#[derive(Clone, Debug)]
pub struct Actor {
    pub secret: SecretKey,
    pub keys: AccountKeys,
    pub address: Address,
}

impl Actor {
    pub fn new(seed: u8) -> Self {
        let secret = secret(seed);
        let keys = AccountKeys::new(
            vec![AccountKey::new(
                secret.public_key(),
                Weight::new(100).unwrap(),
            )],
            Weight::new(100).unwrap(),
        )
        .unwrap();
        let address = Address::from_keys(&keys, AddressKind::Standard);
        Actor {
            secret,
            keys,
            address,
        }
    }

    pub fn account(&self) -> Account {
        Account::new(self.keys.clone(), AddressKind::Standard)
    }
}

/// Build a multi-key weighted key set from (seed, weight) pairs.
pub fn multikey(pairs: &[(u8, u8)], threshold: u8) -> AccountKeys {
    let keys = pairs
        .iter()
        .map(|(seed, weight)| {
            AccountKey::new(secret(*seed).public_key(), Weight::new(*weight).unwrap())
        })
        .collect();
    AccountKeys::new(keys, Weight::new(threshold).unwrap()).unwrap()
}

/// Build the short amount vector carried by one operation item.
pub fn amounts(pairs: &[(u64, &CurrencyId)]) -> ItemAmounts {
    pairs
        .iter()
        .map(|(big, currency)| Amount::new(Big::from(*big), (*currency).clone()))
        .collect()
}

/// A [BTreeMap]-backed ledger standing in for the host runtime in tests:
/// an immutable snapshot reader plus a commit path that folds merge values
/// through their mergers, exactly one sealed entry per touched key.
#[derive(Default, Clone, Debug)]
pub struct MemoryLedger {
    states: BTreeMap<String, State>,
}

impl StateReader for MemoryLedger {
    fn get_state(&self, key: &str) -> Result<Option<State>> {
        Ok(self.states.get(key).cloned())
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    /// Seed a raw state entry, bypassing the merge path.
    pub fn put(&mut self, state: State) {
        self.states.insert(state.key().to_owned(), state);
    }

    pub fn get(&self, key: &str) -> Option<&State> {
        self.states.get(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn balance(&self, address: &Address, currency: &CurrencyId) -> Option<Big> {
        let state = self.states.get(&balance_state_key(address, currency))?;
        Some(state.as_balance().unwrap().big)
    }

    pub fn currency_design(&self, currency: &CurrencyId) -> Option<CurrencyDesign> {
        let state = self.states.get(&currency_design_state_key(currency))?;
        Some(state.as_currency_design().unwrap().clone())
    }

    /// Apply one operation's mutations atomically: group contributions by
    /// key in first-seen order, fold each group through one merger, and
    /// store the sealed entries.
    pub fn commit(
        &mut self,
        height: BlockHeight,
        mutations: &[MergeValue],
        op: OperationHash,
    ) -> Result<()> {
        let mut order: Vec<String> = Vec::new();
        let mut mergers: BTreeMap<String, StateMerger> = BTreeMap::new();
        for mutation in mutations {
            if !mergers.contains_key(mutation.key()) {
                let prior = self.states.get(mutation.key()).cloned();
                order.push(mutation.key().to_owned());
                mergers.insert(mutation.key().to_owned(), mutation.merger(height, prior));
            }
            mergers
                .get_mut(mutation.key())
                .expect("merger just inserted")
                .contribute(mutation.op(), &[op])?;
        }
        for key in order {
            let state = mergers.remove(&key).expect("merger present").seal()?;
            self.states.insert(key, state);
        }
        Ok(())
    }

    /// Full driver: pre-process, process, commit.
    pub fn apply(
        &mut self,
        registry: &ProcessorRegistry,
        height: BlockHeight,
        op: &Operation,
    ) -> Result<(), ProcessError> {
        let mutations = registry.execute(height, op, &*self)?;
        self.commit(height, &mutations, op.hash())
            .map_err(ProcessError::Fatal)?;
        Ok(())
    }
}

/// Seed an account with its key set and the given balances.
pub fn seed_account(
    ledger: &mut MemoryLedger,
    actor: &Actor,
    height: BlockHeight,
    balances: &[(u64, &CurrencyId)],
) {
    ledger.put(State::new(
        account_state_key(&actor.address),
        StateValue::Account(actor.account()),
        height,
    ));
    for (big, currency) in balances {
        ledger.put(State::new(
            balance_state_key(&actor.address, currency),
            StateValue::Balance(Amount::new(Big::from(*big), (*currency).clone())),
            height,
        ));
    }
}

/// Seed a contract account owned by `owner`, with the given balances.
pub fn seed_contract_account(
    ledger: &mut MemoryLedger,
    contract: &Actor,
    owner: &Actor,
    height: BlockHeight,
    balances: &[(u64, &CurrencyId)],
) {
    ledger.put(State::new(
        account_state_key(&contract.address),
        StateValue::Account(Account::contract(&contract.keys, AddressKind::Standard)),
        height,
    ));
    ledger.put(State::new(
        contract_account_state_key(&contract.address),
        StateValue::ContractAccountStatus(ContractAccountStatus::new(owner.address.clone())),
        height,
    ));
    for (big, currency) in balances {
        ledger.put(State::new(
            balance_state_key(&contract.address, currency),
            StateValue::Balance(Amount::new(Big::from(*big), (*currency).clone())),
            height,
        ));
    }
}

/// Seed a registered currency: its design (aggregate = supply), the genesis
/// account holding the whole initial supply, and the currency's zero
/// account with a zero balance.
pub fn seed_currency(
    ledger: &mut MemoryLedger,
    currency: &CurrencyId,
    genesis: &Actor,
    supply: u64,
    min_balance: u64,
    feeer: Feeer,
    height: BlockHeight,
) {
    let design = CurrencyDesign::new(
        Amount::new(Big::from(supply), currency.clone()),
        genesis.address.clone(),
        CurrencyPolicy::new(Big::from(min_balance), feeer).unwrap(),
    )
    .unwrap();
    ledger.put(State::new(
        currency_design_state_key(currency),
        StateValue::CurrencyDesign(design),
        height,
    ));
    seed_account(ledger, genesis, height, &[(supply, currency)]);
    let zero = Address::zero(currency);
    ledger.put(State::new(
        account_state_key(&zero),
        StateValue::Account(Account::zero(currency)),
        height,
    ));
    ledger.put(State::new(
        balance_state_key(&zero, currency),
        StateValue::Balance(Amount::zero(currency.clone())),
        height,
    ));
}

/// Seed the suffrage state with equal-weight nodes.
pub fn seed_suffrage(
    ledger: &mut MemoryLedger,
    nodes: &[&Actor],
    threshold: u8,
    height: BlockHeight,
) {
    let nodes = nodes
        .iter()
        .map(|actor| (actor.secret.public_key(), Weight::new(100).unwrap()))
        .collect();
    ledger.put(State::new(
        SUFFRAGE_STATE_KEY,
        StateValue::Suffrage(Suffrage::new(nodes, Weight::new(threshold).unwrap())),
        height,
    ));
}
