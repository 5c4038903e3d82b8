use crate::*;

/// Key of the account record for an address.
pub fn account_state_key(address: &Address) -> String {
    format!("{address}:account")
}

/// Key of the balance of one currency held by an address.
pub fn balance_state_key(address: &Address, currency: &CurrencyId) -> String {
    format!("{address}:{currency}:balance")
}

/// Key of the contract-account ownership record for an address.
pub fn contract_account_state_key(address: &Address) -> String {
    format!("{address}:contract")
}

/// Key of the registered design of a currency.
pub fn currency_design_state_key(currency: &CurrencyId) -> String {
    format!("currency:{currency}:design")
}

/// Well-known key resolving to the active validator set and its weights.
pub const SUFFRAGE_STATE_KEY: &str = "suffrage";

/// The value held by one ledger state entry.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum StateValue {
    Account(Account),
    Balance(Amount),
    ContractAccountStatus(ContractAccountStatus),
    CurrencyDesign(CurrencyDesign),
    Suffrage(Suffrage),
}

/// One versioned ledger state entry.
///
/// Entries for a key form an append-only hash chain: a new entry links to
/// the hash of the entry it supersedes and records the operations that
/// contributed to it. Entries are never mutated in place.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct State {
    key: String,
    value: StateValue,
    height: BlockHeight,
    previous: Option<Sha256Hash>,
    operations: Vec<OperationHash>,
}

impl State {
    pub fn new(key: impl Into<String>, value: StateValue, height: BlockHeight) -> Self {
        State {
            key: key.into(),
            value,
            height,
            previous: None,
            operations: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &StateValue {
        &self.value
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn previous(&self) -> Option<Sha256Hash> {
        self.previous
    }

    pub fn operations(&self) -> &[OperationHash] {
        &self.operations
    }

    pub fn hash(&self) -> Sha256Hash {
        Sha256Hash::hash(serde_json::to_string(self).expect("state is serializable"))
    }

    pub fn as_account(&self) -> Result<&Account> {
        match &self.value {
            StateValue::Account(account) => Ok(account),
            other => Err(anyhow::anyhow!(
                "State {} holds {other:?}, expected an account",
                self.key
            )),
        }
    }

    pub fn as_balance(&self) -> Result<&Amount> {
        match &self.value {
            StateValue::Balance(amount) => Ok(amount),
            other => Err(anyhow::anyhow!(
                "State {} holds {other:?}, expected a balance",
                self.key
            )),
        }
    }

    pub fn as_contract_account_status(&self) -> Result<&ContractAccountStatus> {
        match &self.value {
            StateValue::ContractAccountStatus(status) => Ok(status),
            other => Err(anyhow::anyhow!(
                "State {} holds {other:?}, expected a contract account status",
                self.key
            )),
        }
    }

    pub fn as_currency_design(&self) -> Result<&CurrencyDesign> {
        match &self.value {
            StateValue::CurrencyDesign(design) => Ok(design),
            other => Err(anyhow::anyhow!(
                "State {} holds {other:?}, expected a currency design",
                self.key
            )),
        }
    }

    pub fn as_suffrage(&self) -> Result<&Suffrage> {
        match &self.value {
            StateValue::Suffrage(suffrage) => Ok(suffrage),
            other => Err(anyhow::anyhow!(
                "State {} holds {other:?}, expected a suffrage",
                self.key
            )),
        }
    }
}

/// Read access to an immutable snapshot of ledger state.
///
/// Lookups are synchronous; the engine performs no locking over state and
/// never writes through this interface.
pub trait StateReader {
    fn get_state(&self, key: &str) -> Result<Option<State>>;
}

/// Adapter turning a point-lookup closure into a [StateReader].
pub struct StateLookup<F>(pub F);

impl<F> StateReader for StateLookup<F>
where
    F: Fn(&str) -> Result<Option<State>>,
{
    fn get_state(&self, key: &str) -> Result<Option<State>> {
        (self.0)(key)
    }
}

/// Load the account record for an address, rejecting if absent.
pub fn require_account(
    reader: &dyn StateReader,
    address: &Address,
) -> Result<Account, ProcessError> {
    let state = reader
        .get_state(&account_state_key(address))?
        .ok_or_else(|| Rejection::UnknownAccount {
            address: address.clone(),
        })?;
    Ok(state.as_account()?.clone())
}

/// Load the registered design of a currency, rejecting if absent.
pub fn require_currency_design(
    reader: &dyn StateReader,
    currency: &CurrencyId,
) -> Result<CurrencyDesign, ProcessError> {
    let state = reader
        .get_state(&currency_design_state_key(currency))?
        .ok_or_else(|| Rejection::UnknownCurrency {
            currency: currency.clone(),
        })?;
    Ok(state.as_currency_design()?.clone())
}

/// Load the balance entry of one currency for an address, rejecting if
/// absent. A missing balance state is an error, not an implicit zero.
pub fn require_balance(
    reader: &dyn StateReader,
    address: &Address,
    currency: &CurrencyId,
) -> Result<State, ProcessError> {
    let state = reader
        .get_state(&balance_state_key(address, currency))?
        .ok_or_else(|| Rejection::UnknownBalance {
            address: address.clone(),
            currency: currency.clone(),
        })?;
    state.as_balance()?;
    Ok(state)
}

/// Load the contract-account ownership record for an address, if any.
pub fn contract_account_status(
    reader: &dyn StateReader,
    address: &Address,
) -> Result<Option<ContractAccountStatus>, ProcessError> {
    match reader.get_state(&contract_account_state_key(address))? {
        Some(state) => Ok(Some(state.as_contract_account_status()?.clone())),
        None => Ok(None),
    }
}

/// How contributions to one key compose into a final entry.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MergeOp {
    /// Supply the replacement value outright.
    Replace(StateValue),
    /// Add to the prior balance (starting from zero when absent).
    Credit(Amount),
    /// Subtract from the prior balance.
    Debit(Amount),
}

/// A deferred, composable state mutation.
///
/// Several merge values may target the same key within one operation (or
/// across operations at one height); the driver folds them through a
/// [StateMerger] into a single final entry with full provenance.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MergeValue {
    key: String,
    op: MergeOp,
}

impl MergeValue {
    pub fn replace(key: impl Into<String>, value: StateValue) -> Self {
        MergeValue {
            key: key.into(),
            op: MergeOp::Replace(value),
        }
    }

    pub fn credit(address: &Address, amount: Amount) -> Self {
        MergeValue {
            key: balance_state_key(address, &amount.currency),
            op: MergeOp::Credit(amount),
        }
    }

    pub fn debit(address: &Address, amount: Amount) -> Self {
        MergeValue {
            key: balance_state_key(address, &amount.currency),
            op: MergeOp::Debit(amount),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn op(&self) -> &MergeOp {
        &self.op
    }

    /// The contributed value, for inspection. Credits and debits contribute
    /// balance deltas rather than final balances.
    pub fn value(&self) -> StateValue {
        match &self.op {
            MergeOp::Replace(value) => value.clone(),
            MergeOp::Credit(amount) | MergeOp::Debit(amount) => {
                StateValue::Balance(amount.clone())
            }
        }
    }

    pub fn merger(&self, height: BlockHeight, prior: Option<State>) -> StateMerger {
        StateMerger::new(self.key.clone(), height, prior)
    }
}

enum MergerAcc {
    Empty,
    Replaced(StateValue),
    Balance(Amount),
}

/// Accumulator folding all contributions to one (key, height) pair into a
/// single final [State]. Constructed once per key per height, never reused
/// across heights.
pub struct StateMerger {
    key: String,
    height: BlockHeight,
    prior: Option<State>,
    acc: MergerAcc,
    operations: Vec<OperationHash>,
}

impl StateMerger {
    pub fn new(key: impl Into<String>, height: BlockHeight, prior: Option<State>) -> Self {
        StateMerger {
            key: key.into(),
            height,
            prior,
            acc: MergerAcc::Empty,
            operations: Vec::new(),
        }
    }

    fn prior_balance(&self, currency: &CurrencyId) -> Result<Amount> {
        match &self.prior {
            Some(state) => {
                let amount = state.as_balance()?;
                anyhow::ensure!(
                    &amount.currency == currency,
                    "Balance state {} holds {}, contribution is {currency}",
                    self.key,
                    amount.currency
                );
                Ok(amount.clone())
            }
            None => Ok(Amount::zero(currency.clone())),
        }
    }

    /// Fold one contribution into the accumulator. Replacements and balance
    /// deltas never mix on one key, and two different replacement values for
    /// the same key are a wiring error.
    pub fn contribute(&mut self, op: &MergeOp, operations: &[OperationHash]) -> Result<()> {
        let acc = std::mem::replace(&mut self.acc, MergerAcc::Empty);
        self.acc = match (acc, op) {
            (MergerAcc::Empty, MergeOp::Replace(value)) => MergerAcc::Replaced(value.clone()),
            (MergerAcc::Replaced(prev), MergeOp::Replace(value)) => {
                anyhow::ensure!(
                    &prev == value,
                    "Conflicting replacement values for state {}",
                    self.key
                );
                MergerAcc::Replaced(prev)
            }
            (MergerAcc::Empty, MergeOp::Credit(amount)) => {
                let base = self.prior_balance(&amount.currency)?;
                MergerAcc::Balance(Amount::new(
                    base.big.add(amount.big)?,
                    amount.currency.clone(),
                ))
            }
            (MergerAcc::Empty, MergeOp::Debit(amount)) => {
                let base = self.prior_balance(&amount.currency)?;
                MergerAcc::Balance(Amount::new(
                    base.big.sub(amount.big)?,
                    amount.currency.clone(),
                ))
            }
            (MergerAcc::Balance(acc), MergeOp::Credit(amount)) => {
                anyhow::ensure!(
                    acc.currency == amount.currency,
                    "Balance state {} holds {}, contribution is {}",
                    self.key,
                    acc.currency,
                    amount.currency
                );
                MergerAcc::Balance(Amount::new(
                    acc.big.add(amount.big)?,
                    amount.currency.clone(),
                ))
            }
            (MergerAcc::Balance(acc), MergeOp::Debit(amount)) => {
                anyhow::ensure!(
                    acc.currency == amount.currency,
                    "Balance state {} holds {}, contribution is {}",
                    self.key,
                    acc.currency,
                    amount.currency
                );
                MergerAcc::Balance(Amount::new(
                    acc.big.sub(amount.big)?,
                    amount.currency.clone(),
                ))
            }
            (MergerAcc::Replaced(_), MergeOp::Credit(_) | MergeOp::Debit(_))
            | (MergerAcc::Balance(_), MergeOp::Replace(_)) => {
                anyhow::bail!(
                    "Mixed replacement and balance contributions for state {}",
                    self.key
                );
            }
        };
        for op_hash in operations {
            if !self.operations.contains(op_hash) {
                self.operations.push(*op_hash);
            }
        }
        Ok(())
    }

    /// Seal the accumulated contributions into the final entry.
    pub fn seal(self) -> Result<State> {
        let value = match self.acc {
            MergerAcc::Empty => anyhow::bail!("State {} sealed without contributions", self.key),
            MergerAcc::Replaced(value) => value,
            MergerAcc::Balance(amount) => StateValue::Balance(amount),
        };
        Ok(State {
            key: self.key,
            value,
            height: self.height,
            previous: self.prior.as_ref().map(State::hash),
            operations: self.operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> CurrencyId {
        CurrencyId::new("FOO").unwrap()
    }

    fn addr() -> Address {
        Address::zero(&foo())
    }

    fn op_hash(n: u8) -> OperationHash {
        Sha256Hash::hash([n])
    }

    fn balance_state(big: u64) -> State {
        State::new(
            balance_state_key(&addr(), &foo()),
            StateValue::Balance(Amount::new(Big::from(big), foo())),
            BlockHeight(1),
        )
    }

    #[test]
    fn credits_sum_over_prior() {
        let prior = balance_state(100);
        let mv = MergeValue::credit(&addr(), Amount::new(Big::from(30u64), foo()));
        let mut merger = mv.merger(BlockHeight(2), Some(prior.clone()));
        merger.contribute(mv.op(), &[op_hash(1)]).unwrap();
        merger
            .contribute(
                MergeValue::credit(&addr(), Amount::new(Big::from(12u64), foo())).op(),
                &[op_hash(2)],
            )
            .unwrap();
        let sealed = merger.seal().unwrap();
        assert_eq!(
            sealed.as_balance().unwrap(),
            &Amount::new(Big::from(142u64), foo())
        );
        assert_eq!(sealed.previous(), Some(prior.hash()));
        assert_eq!(sealed.operations(), &[op_hash(1), op_hash(2)]);
        assert_eq!(sealed.height(), BlockHeight(2));
    }

    #[test]
    fn credit_starts_from_zero_without_prior() {
        let mv = MergeValue::credit(&addr(), Amount::new(Big::from(7u64), foo()));
        let mut merger = mv.merger(BlockHeight(2), None);
        merger.contribute(mv.op(), &[op_hash(1)]).unwrap();
        let sealed = merger.seal().unwrap();
        assert_eq!(
            sealed.as_balance().unwrap(),
            &Amount::new(Big::from(7u64), foo())
        );
        assert_eq!(sealed.previous(), None);
    }

    #[test]
    fn debit_below_zero_fails() {
        let prior = balance_state(10);
        let mv = MergeValue::debit(&addr(), Amount::new(Big::from(11u64), foo()));
        let mut merger = mv.merger(BlockHeight(2), Some(prior));
        merger.contribute(mv.op(), &[]).unwrap_err();
    }

    #[test]
    fn mixed_contributions_fail() {
        let mv = MergeValue::credit(&addr(), Amount::new(Big::from(1u64), foo()));
        let mut merger = mv.merger(BlockHeight(2), None);
        merger.contribute(mv.op(), &[]).unwrap();
        merger
            .contribute(
                &MergeOp::Replace(StateValue::Account(Account::zero(&foo()))),
                &[],
            )
            .unwrap_err();
    }

    #[test]
    fn conflicting_replacements_fail() {
        let key = account_state_key(&addr());
        let mut merger = StateMerger::new(key, BlockHeight(2), None);
        merger
            .contribute(&MergeOp::Replace(StateValue::Account(Account::zero(&foo()))), &[])
            .unwrap();
        merger
            .contribute(
                &MergeOp::Replace(StateValue::Account(Account::zero(
                    &CurrencyId::new("BAR").unwrap(),
                ))),
                &[],
            )
            .unwrap_err();
    }

    #[test]
    fn seal_without_contributions_fails() {
        StateMerger::new("k", BlockHeight(2), None).seal().unwrap_err();
    }

    #[test]
    fn currency_mismatch_fails() {
        let prior = balance_state(10);
        let bar = CurrencyId::new("BAR").unwrap();
        let mut merger = StateMerger::new(prior.key().to_owned(), BlockHeight(2), Some(prior));
        merger
            .contribute(&MergeOp::Credit(Amount::new(Big::from(1u64), bar)), &[])
            .unwrap_err();
    }

    #[test]
    fn provenance_deduplicates() {
        let mv = MergeValue::credit(&addr(), Amount::new(Big::from(1u64), foo()));
        let mut merger = mv.merger(BlockHeight(2), None);
        merger.contribute(mv.op(), &[op_hash(1)]).unwrap();
        merger.contribute(mv.op(), &[op_hash(1)]).unwrap();
        assert_eq!(merger.seal().unwrap().operations(), &[op_hash(1)]);
    }

    #[test]
    fn state_keys_are_namespaced() {
        let address = addr();
        assert_ne!(
            account_state_key(&address),
            contract_account_state_key(&address)
        );
        assert_ne!(
            balance_state_key(&address, &foo()),
            balance_state_key(&address, &CurrencyId::new("BAR").unwrap())
        );
    }
}
