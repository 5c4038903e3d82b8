use crate::*;

use super::{check_operation_sender, Frame, OperationProcessor};

/// Two-phase processor for one withdraw item.
///
/// The source of funds is a contract account; authorization is "the sender
/// is the recorded owner", never the contract account's own key set.
#[derive(Default)]
pub(crate) struct WithdrawItemProcessor {
    item: Option<WithdrawItem>,
    sender: Option<Address>,
}

impl Reusable for WithdrawItemProcessor {
    fn reset(&mut self) {
        self.item = None;
        self.sender = None;
    }
}

impl WithdrawItemProcessor {
    pub(crate) fn init(&mut self, item: &WithdrawItem, sender: &Address) {
        self.item = Some(item.clone());
        self.sender = Some(sender.clone());
    }

    fn staged(&self) -> Result<(&WithdrawItem, &Address)> {
        match (&self.item, &self.sender) {
            (Some(item), Some(sender)) => Ok((item, sender)),
            _ => Err(anyhow::anyhow!("Item processor used before init")),
        }
    }

    pub(crate) fn pre_process(&mut self, reader: &dyn StateReader) -> Result<(), ProcessError> {
        let (item, sender) = self.staged()?;
        require_account(reader, &item.target)?;
        let status = contract_account_status(reader, &item.target)?.ok_or_else(|| {
            Rejection::NotContractAccount {
                address: item.target.clone(),
            }
        })?;
        if !status.is_active() {
            return Err(Rejection::InactiveContractAccount {
                address: item.target.clone(),
            }
            .into());
        }
        if status.owner() != sender {
            return Err(Rejection::NotContractOwner {
                sender: sender.clone(),
                address: item.target.clone(),
            }
            .into());
        }
        let required = required_amounts(reader, item.amounts.iter())?;
        check_enough_balance(reader, &item.target, &required)?;
        Ok(())
    }

    /// Debit the contract account (principal plus fee, with the self-fee
    /// branch folding into one mutation exactly as for transfers), credit
    /// the owner with the principal.
    pub(crate) fn process(
        &mut self,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        let (item, sender) = self.staged()?;
        let required = required_amounts(reader, item.amounts.iter())?;
        check_enough_balance(reader, &item.target, &required)?;
        let mut mutations = settle_required(reader, &item.target, &required)?;
        for amount in &item.amounts {
            mutations.push(MergeValue::credit(sender, amount.clone()));
        }
        Ok(mutations)
    }
}

fn expect_fact(op: &Operation) -> Result<&WithdrawFact> {
    match op.fact() {
        OperationFact::Withdraw(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Withdraw processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for withdrawing funds out of contract accounts back to their
/// recorded owner.
#[derive(Default)]
pub struct WithdrawProcessor {
    frame: Frame,
    items: Pool<WithdrawItemProcessor>,
}

impl Reusable for WithdrawProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for WithdrawProcessor {
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
            item_processor.init(item, &fact.sender);
            item_processor.pre_process(reader)?;
        }
        Ok(())
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_fact(op)?;
        let mut mutations = Vec::new();
        for item in &fact.items {
            let mut item_processor = self.items.acquire();
            item_processor.init(item, &fact.sender);
            item_processor.pre_process(reader)?;
            mutations.extend(item_processor.process(reader)?);
        }
        Ok(mutations)
    }
}
