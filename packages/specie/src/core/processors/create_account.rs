use crate::*;

use super::{check_operation_sender, Frame, OperationProcessor};

/// Two-phase processor for one create-account item.
#[derive(Default)]
pub(crate) struct CreateAccountItemProcessor {
    item: Option<CreateAccountItem>,
    target: Option<Address>,
}

impl Reusable for CreateAccountItemProcessor {
    fn reset(&mut self) {
        self.item = None;
        self.target = None;
    }
}

impl CreateAccountItemProcessor {
    pub(crate) fn init(&mut self, item: &CreateAccountItem) {
        self.target = Some(item.address());
        self.item = Some(item.clone());
    }

    fn staged(&self) -> Result<(&CreateAccountItem, &Address)> {
        let item = self
            .item
            .as_ref()
            .context("Item processor used before init")?;
        let target = self
            .target
            .as_ref()
            .context("Item processor used before init")?;
        Ok((item, target))
    }

    /// Item-level preconditions: the target must not exist yet, and every
    /// credited amount must meet its currency's minimum new-account balance.
    pub(crate) fn pre_process(&mut self, reader: &dyn StateReader) -> Result<(), ProcessError> {
        let (item, target) = self.staged()?;
        if reader.get_state(&account_state_key(target))?.is_some() {
            return Err(Rejection::AccountAlreadyExists {
                address: target.clone(),
            }
            .into());
        }
        for amount in &item.amounts {
            let design = require_currency_design(reader, &amount.currency)?;
            if amount.big < design.policy().new_account_min_balance {
                return Err(Rejection::BelowMinimumBalance {
                    currency: amount.currency.clone(),
                    amount: amount.big,
                    min: design.policy().new_account_min_balance,
                }
                .into());
            }
        }
        Ok(())
    }

    /// The new account record plus one credited balance per currency.
    ///
    /// A target key that became occupied since pre-processing means another
    /// in-flight computation staged it at this height: stop and retry.
    pub(crate) fn process(
        &mut self,
        height: BlockHeight,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        let (item, target) = self.staged()?;
        let account_key = account_state_key(target);
        if reader.get_state(&account_key)?.is_some() {
            return Err(HeightRetry::StateOccupied {
                key: account_key,
                height,
            }
            .into());
        }
        let mut mutations = vec![MergeValue::replace(
            account_key,
            StateValue::Account(Account::new(item.keys.clone(), item.kind)),
        )];
        for amount in &item.amounts {
            let balance_key = balance_state_key(target, &amount.currency);
            if reader.get_state(&balance_key)?.is_some() {
                return Err(HeightRetry::StateOccupied {
                    key: balance_key,
                    height,
                }
                .into());
            }
            mutations.push(MergeValue::credit(target, amount.clone()));
        }
        Ok(mutations)
    }
}

fn expect_fact(op: &Operation) -> Result<&CreateAccountFact> {
    match op.fact() {
        OperationFact::CreateAccount(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Create-account processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for operations creating one or more new accounts, each funded
/// with at least the per-currency minimum balance.
#[derive(Default)]
pub struct CreateAccountProcessor {
    frame: Frame,
    items: Pool<CreateAccountItemProcessor>,
}

impl Reusable for CreateAccountProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for CreateAccountProcessor {
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
            mutations.extend(item_processor.process(self.frame.height(), reader)?);
        }
        mutations.extend(settle_required(reader, &fact.sender, &required)?);
        Ok(mutations)
    }
}
