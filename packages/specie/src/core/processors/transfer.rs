use crate::*;

use super::{check_operation_sender, Frame, OperationProcessor};

/// Two-phase processor for one transfer item.
#[derive(Default)]
pub(crate) struct TransferItemProcessor {
    item: Option<TransferItem>,
}

impl Reusable for TransferItemProcessor {
    fn reset(&mut self) {
        self.item = None;
    }
}

impl TransferItemProcessor {
    pub(crate) fn init(&mut self, item: &TransferItem) {
        self.item = Some(item.clone());
    }

    fn staged(&self) -> Result<&TransferItem> {
        self.item
            .as_ref()
            .context("Item processor used before init")
    }

    /// The destination must already exist; transfers never create accounts.
    pub(crate) fn pre_process(&mut self, reader: &dyn StateReader) -> Result<(), ProcessError> {
        let item = self.staged()?;
        require_account(reader, &item.receiver)?;
        for amount in &item.amounts {
            require_currency_design(reader, &amount.currency)?;
        }
        Ok(())
    }

    /// One credit per currency; a balance the receiver never held starts
    /// from zero through the merge mechanism.
    pub(crate) fn process(&mut self) -> Result<Vec<MergeValue>, ProcessError> {
        let item = self.staged()?;
        Ok(item
            .amounts
            .iter()
            .map(|amount| MergeValue::credit(&item.receiver, amount.clone()))
            .collect())
    }
}

fn expect_fact(op: &Operation) -> Result<&TransferFact> {
    match op.fact() {
        OperationFact::Transfer(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Transfer processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for ordinary transfers from one sender to one or more
/// receivers, with fees computed and redistributed per currency policy.
#[derive(Default)]
pub struct TransferProcessor {
    frame: Frame,
    items: Pool<TransferItemProcessor>,
}

impl Reusable for TransferProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for TransferProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        self.frame.prepare(height, config);
    }

    fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        self.frame.begin_pre_process()?;
        let fact = expect_fact(op)?;
        op.fact().is_valid(self.frame.config())?;
        check_operation_sender(reader, &fact.sender, &op.signers())?;
        for item in &fact.items {
            let mut item_processor = self.items.acquire();
            item_processor.init(item);
            item_processor.pre_process(reader)?;
        }
        let required = required_amounts(
            reader,
            fact.items.iter().flat_map(|item| item.amounts.iter()),
        )?;
        check_enough_balance(reader, &fact.sender, &required)?;
        Ok(())
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_fact(op)?;
        let required = required_amounts(
            reader,
            fact.items.iter().flat_map(|item| item.amounts.iter()),
        )?;
        check_enough_balance(reader, &fact.sender, &required)?;
        let mut mutations = Vec::new();
        for item in &fact.items {
            let mut item_processor = self.items.acquire();
            item_processor.init(item);
            mutations.extend(item_processor.process()?);
        }
        mutations.extend(settle_required(reader, &fact.sender, &required)?);
        Ok(mutations)
    }
}
