use crate::*;

use super::{check_suffrage_operation, Frame, OperationProcessor};

/// Two-phase processor for one mint/inflation item.
#[derive(Default)]
pub(crate) struct IssueItemProcessor {
    item: Option<IssueItem>,
}

impl Reusable for IssueItemProcessor {
    fn reset(&mut self) {
        self.item = None;
    }
}

impl IssueItemProcessor {
    pub(crate) fn init(&mut self, item: &IssueItem) {
        self.item = Some(item.clone());
    }

    fn staged(&self) -> Result<&IssueItem> {
        self.item
            .as_ref()
            .context("Item processor used before init")
    }

    pub(crate) fn pre_process(&mut self, reader: &dyn StateReader) -> Result<(), ProcessError> {
        let item = self.staged()?;
        require_account(reader, &item.receiver)?;
        require_currency_design(reader, &item.amount.currency)?;
        Ok(())
    }

    /// Credit the receiver, creating a zero balance first when absent.
    pub(crate) fn process(&mut self) -> Result<Vec<MergeValue>, ProcessError> {
        let item = self.staged()?;
        Ok(vec![MergeValue::credit(
            &item.receiver,
            item.amount.clone(),
        )])
    }
}

/// Shared core of mint and suffrage inflation: no sender and no fees, each
/// (receiver, amount) credited directly and the currency's running
/// aggregate grown by the per-currency sum.
fn pre_process_issue(
    frame: &Frame,
    items_pool: &Pool<IssueItemProcessor>,
    items: &[IssueItem],
    op: &Operation,
    reader: &dyn StateReader,
) -> Result<(), ProcessError> {
    op.fact().is_valid(frame.config())?;
    check_suffrage_operation(reader, frame.height(), &op.signers())?;
    for item in items {
        let mut item_processor = items_pool.acquire();
        item_processor.init(item);
        item_processor.pre_process(reader)?;
    }
    Ok(())
}

fn process_issue(
    items_pool: &Pool<IssueItemProcessor>,
    items: &[IssueItem],
    reader: &dyn StateReader,
) -> Result<Vec<MergeValue>, ProcessError> {
    let mut mutations = Vec::new();
    let mut issued: BTreeMap<CurrencyId, Big> = BTreeMap::new();
    for item in items {
        let mut item_processor = items_pool.acquire();
        item_processor.init(item);
        item_processor.pre_process(reader)?;
        mutations.extend(item_processor.process()?);
        let entry = issued.entry(item.amount.currency.clone()).or_default();
        *entry = entry.add(item.amount.big)?;
    }
    for (currency, sum) in issued {
        let design = require_currency_design(reader, &currency)?;
        let design = design.add_aggregate(sum)?;
        mutations.push(MergeValue::replace(
            currency_design_state_key(&currency),
            StateValue::CurrencyDesign(design),
        ));
    }
    Ok(mutations)
}

fn expect_mint_fact(op: &Operation) -> Result<&MintFact> {
    match op.fact() {
        OperationFact::Mint(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Mint processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for operator-driven minting, authorized by suffrage threshold.
#[derive(Default)]
pub struct MintProcessor {
    frame: Frame,
    items: Pool<IssueItemProcessor>,
}

impl Reusable for MintProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for MintProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        self.frame.prepare(height, config);
    }

    fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        self.frame.begin_pre_process()?;
        let fact = expect_mint_fact(op)?;
        pre_process_issue(&self.frame, &self.items, &fact.items, op, reader)
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_mint_fact(op)?;
        process_issue(&self.items, &fact.items, reader)
    }
}

fn expect_inflation_fact(op: &Operation) -> Result<&SuffrageInflationFact> {
    match op.fact() {
        OperationFact::SuffrageInflation(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Suffrage-inflation processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for validator-set-driven supply inflation. Identical effect to
/// minting; it exists as its own operation for its distinct operator intent.
#[derive(Default)]
pub struct SuffrageInflationProcessor {
    frame: Frame,
    items: Pool<IssueItemProcessor>,
}

impl Reusable for SuffrageInflationProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for SuffrageInflationProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        self.frame.prepare(height, config);
    }

    fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        self.frame.begin_pre_process()?;
        let fact = expect_inflation_fact(op)?;
        pre_process_issue(&self.frame, &self.items, &fact.items, op, reader)
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_inflation_fact(op)?;
        process_issue(&self.items, &fact.items, reader)
    }
}
