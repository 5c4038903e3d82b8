use specie::*;
use specie_test::*;

pub fn foo() -> CurrencyId {
    CurrencyId::new("FOO").unwrap()
}

pub fn bar() -> CurrencyId {
    CurrencyId::new("BAR").unwrap()
}

/// Sign a fact with each actor in turn.
pub fn signed(fact: OperationFact, signers: &[&Actor]) -> Operation {
    let mut op = Operation::new(fact).unwrap();
    for signer in signers {
        op = op.sign(&signer.secret).unwrap();
    }
    op
}

/// A seeded test world: ledger snapshot, processor registry, and the
/// genesis actor every currency fixture credits its supply to.
pub struct World {
    pub ledger: MemoryLedger,
    pub registry: ProcessorRegistry,
    pub height: BlockHeight,
    pub genesis: Actor,
}

impl World {
    /// Seed height is below [Self::height] so fixture entries read as prior
    /// state for the operations under test.
    pub fn new() -> Self {
        World {
            ledger: MemoryLedger::new(),
            registry: ProcessorRegistry::default(),
            height: BlockHeight(5),
            genesis: Actor::new(0),
        }
    }

    pub fn seed_currency(&mut self, currency: &CurrencyId, feeer: Feeer, min_balance: u64) {
        seed_currency(
            &mut self.ledger,
            currency,
            &self.genesis,
            1_000_000,
            min_balance,
            feeer,
            BlockHeight(1),
        );
    }

    pub fn seed_account(&mut self, actor: &Actor, balances: &[(u64, &CurrencyId)]) {
        seed_account(&mut self.ledger, actor, BlockHeight(1), balances);
    }

    pub fn seed_contract_account(
        &mut self,
        contract: &Actor,
        owner: &Actor,
        balances: &[(u64, &CurrencyId)],
    ) {
        seed_contract_account(&mut self.ledger, contract, owner, BlockHeight(1), balances);
    }

    pub fn seed_suffrage(&mut self, nodes: &[&Actor], threshold: u8) {
        seed_suffrage(&mut self.ledger, nodes, threshold, BlockHeight(1));
    }

    /// Pre-process, process, and commit one operation.
    pub fn apply(&mut self, op: &Operation) -> Result<(), ProcessError> {
        self.ledger.apply(&self.registry, self.height, op)
    }

    /// Compute an operation's mutations without committing them.
    pub fn execute(&self, op: &Operation) -> Result<Vec<MergeValue>, ProcessError> {
        self.registry.execute(self.height, op, &self.ledger)
    }

    pub fn balance(&self, address: &Address, currency: &CurrencyId) -> Big {
        self.ledger.balance(address, currency).unwrap_or(Big::ZERO)
    }

    /// Sum of one currency over every balance entry in the ledger; the
    /// conservation checks compare this before and after applying.
    pub fn total_supply(&self, currency: &CurrencyId) -> Big {
        let suffix = format!(":{currency}:balance");
        let mut total = Big::ZERO;
        for state in self.ledger.states() {
            if state.key().ends_with(&suffix) {
                total = total.add(state.as_balance().unwrap().big).unwrap();
            }
        }
        total
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}
