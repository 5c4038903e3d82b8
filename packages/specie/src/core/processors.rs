mod create_account;
mod create_contract_account;
mod currency;
mod issue;
mod transfer;
mod withdraw;

use crate::*;

pub use create_account::CreateAccountProcessor;
pub use create_contract_account::CreateContractAccountProcessor;
pub use currency::{CurrencyPolicyUpdateProcessor, CurrencyRegisterProcessor};
pub use issue::{MintProcessor, SuffrageInflationProcessor};
pub use transfer::TransferProcessor;
pub use withdraw::WithdrawProcessor;

/// Limits threaded into every processor.
///
/// Explicit configuration values, not module globals; hosts construct a
/// registry with whatever limits they enforce.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProcessorConfig {
    pub max_operation_items: usize,
    pub max_account_keys: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            max_operation_items: 100,
            max_account_keys: 10,
        }
    }
}

/// Lifecycle of one pooled processor use.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
enum Phase {
    #[default]
    Constructed,
    PreProcessed,
    Processed,
}

/// Per-use bookkeeping shared by all operation processors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    height: BlockHeight,
    config: ProcessorConfig,
    phase: Phase,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            height: BlockHeight::default(),
            config: ProcessorConfig::default(),
            phase: Phase::default(),
        }
    }
}

impl Frame {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        *self = Frame {
            height,
            config,
            phase: Phase::Constructed,
        };
    }

    fn begin_pre_process(&mut self) -> Result<()> {
        anyhow::ensure!(
            self.phase == Phase::Constructed,
            "Processor pre-processed twice without reset"
        );
        self.phase = Phase::PreProcessed;
        Ok(())
    }

    fn begin_process(&mut self) -> Result<()> {
        anyhow::ensure!(
            self.phase == Phase::PreProcessed,
            "Processor must pre-process before processing"
        );
        self.phase = Phase::Processed;
        Ok(())
    }

    pub(crate) fn height(&self) -> BlockHeight {
        self.height
    }

    pub(crate) fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

/// One processor per operation kind, driven by the host as
/// pre-process, then (once the operation is selected) process, then close.
///
/// Processors never mutate state themselves; they return the ordered list
/// of merge values for the caller to apply atomically at commit time.
pub trait OperationProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig);

    /// Validate preconditions against current state. Read-only.
    fn pre_process(&mut self, op: &Operation, reader: &dyn StateReader)
        -> Result<(), ProcessError>;

    /// Compute the deterministic list of state mutations. Fees and balance
    /// sufficiency are recomputed here; nothing is trusted from
    /// pre-processing, since state may have advanced between phases.
    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError>;
}

/// Common pre-process obligations for operations originated by an ordinary
/// account: the sender exists, is not a contract account, and its key set
/// authorizes the signer set.
pub(crate) fn check_operation_sender(
    reader: &dyn StateReader,
    sender: &Address,
    signers: &BTreeSet<PublicKey>,
) -> Result<(), ProcessError> {
    let account = require_account(reader, sender)?;
    if contract_account_status(reader, sender)?.is_some() {
        return Err(Rejection::ContractAccountForbidden {
            address: sender.clone(),
        }
        .into());
    }
    let keys = account.keys().ok_or_else(|| Rejection::NoUsableKeys {
        address: sender.clone(),
    })?;
    check_threshold(sender, keys, signers)?;
    Ok(())
}

/// Suffrage-threshold authorization shared by the currency-administration
/// operations.
pub(crate) fn check_suffrage_operation(
    reader: &dyn StateReader,
    height: BlockHeight,
    signers: &BTreeSet<PublicKey>,
) -> Result<(), ProcessError> {
    let suffrage = load_suffrage(reader, height)?;
    check_suffrage(&suffrage, signers)?;
    Ok(())
}

/// Pools of every processor type, plus the configuration they run under.
///
/// The host asks for a processor per operation via [Self::processor_for];
/// the returned handle scrubs and returns the processor to its pool when
/// dropped, on every exit path.
pub struct ProcessorRegistry {
    config: ProcessorConfig,
    create_account: Pool<CreateAccountProcessor>,
    transfer: Pool<TransferProcessor>,
    create_contract_account: Pool<CreateContractAccountProcessor>,
    withdraw: Pool<WithdrawProcessor>,
    mint: Pool<MintProcessor>,
    suffrage_inflation: Pool<SuffrageInflationProcessor>,
    currency_register: Pool<CurrencyRegisterProcessor>,
    currency_policy_update: Pool<CurrencyPolicyUpdateProcessor>,
}

impl ProcessorRegistry {
    pub fn new(config: ProcessorConfig) -> Self {
        ProcessorRegistry {
            config,
            create_account: Pool::default(),
            transfer: Pool::default(),
            create_contract_account: Pool::default(),
            withdraw: Pool::default(),
            mint: Pool::default(),
            suffrage_inflation: Pool::default(),
            currency_register: Pool::default(),
            currency_policy_update: Pool::default(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// The constructor the host invokes per (operation kind, height).
    pub fn processor_for(&self, kind: OperationKind, height: BlockHeight) -> ProcessorHandle<'_> {
        fn prepared<T: OperationProcessor + Reusable>(
            pool: &Pool<T>,
            height: BlockHeight,
            config: ProcessorConfig,
        ) -> Pooled<'_, T> {
            let mut guard = pool.acquire();
            guard.prepare(height, config);
            guard
        }

        match kind {
            OperationKind::CreateAccount => ProcessorHandle::CreateAccount(prepared(
                &self.create_account,
                height,
                self.config,
            )),
            OperationKind::Transfer => {
                ProcessorHandle::Transfer(prepared(&self.transfer, height, self.config))
            }
            OperationKind::CreateContractAccount => ProcessorHandle::CreateContractAccount(
                prepared(&self.create_contract_account, height, self.config),
            ),
            OperationKind::Withdraw => {
                ProcessorHandle::Withdraw(prepared(&self.withdraw, height, self.config))
            }
            OperationKind::Mint => ProcessorHandle::Mint(prepared(&self.mint, height, self.config)),
            OperationKind::SuffrageInflation => ProcessorHandle::SuffrageInflation(prepared(
                &self.suffrage_inflation,
                height,
                self.config,
            )),
            OperationKind::CurrencyRegister => ProcessorHandle::CurrencyRegister(prepared(
                &self.currency_register,
                height,
                self.config,
            )),
            OperationKind::CurrencyPolicyUpdate => ProcessorHandle::CurrencyPolicyUpdate(
                prepared(&self.currency_policy_update, height, self.config),
            ),
        }
    }

    /// Convenience driver: pre-process then process with one pooled
    /// processor.
    pub fn execute(
        &self,
        height: BlockHeight,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        let mut handle = self.processor_for(op.kind(), height);
        handle.pre_process(op, reader)?;
        handle.process(op, reader)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        ProcessorRegistry::new(ProcessorConfig::default())
    }
}

/// A pooled processor checked out for one operation.
pub enum ProcessorHandle<'a> {
    CreateAccount(Pooled<'a, CreateAccountProcessor>),
    Transfer(Pooled<'a, TransferProcessor>),
    CreateContractAccount(Pooled<'a, CreateContractAccountProcessor>),
    Withdraw(Pooled<'a, WithdrawProcessor>),
    Mint(Pooled<'a, MintProcessor>),
    SuffrageInflation(Pooled<'a, SuffrageInflationProcessor>),
    CurrencyRegister(Pooled<'a, CurrencyRegisterProcessor>),
    CurrencyPolicyUpdate(Pooled<'a, CurrencyPolicyUpdateProcessor>),
}

impl ProcessorHandle<'_> {
    fn inner(&mut self) -> &mut dyn OperationProcessor {
        match self {
            ProcessorHandle::CreateAccount(p) => &mut **p,
            ProcessorHandle::Transfer(p) => &mut **p,
            ProcessorHandle::CreateContractAccount(p) => &mut **p,
            ProcessorHandle::Withdraw(p) => &mut **p,
            ProcessorHandle::Mint(p) => &mut **p,
            ProcessorHandle::SuffrageInflation(p) => &mut **p,
            ProcessorHandle::CurrencyRegister(p) => &mut **p,
            ProcessorHandle::CurrencyPolicyUpdate(p) => &mut **p,
        }
    }

    pub fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        let result = self.inner().pre_process(op, reader);
        if let Err(error) = &result {
            tracing::debug!(hash = %op.hash(), kind = %op.kind(), "pre-process failed: {error}");
        }
        result
    }

    pub fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        let result = self.inner().process(op, reader);
        if let Err(error) = &result {
            tracing::debug!(hash = %op.hash(), kind = %op.kind(), "process failed: {error}");
        }
        result
    }
}
