use crate::*;

use super::{check_operation_sender, Frame, OperationProcessor};

/// Two-phase processor for one contract-account creation item.
///
/// The address derives from the creator-provided key set, but the stored
/// account is stamped with the unsatisfiable contract key set, and a
/// companion status entry records the creator as owner.
#[derive(Default)]
pub(crate) struct CreateContractAccountItemProcessor {
    item: Option<CreateAccountItem>,
    target: Option<Address>,
    owner: Option<Address>,
}

impl Reusable for CreateContractAccountItemProcessor {
    fn reset(&mut self) {
        self.item = None;
        self.target = None;
        self.owner = None;
    }
}

impl CreateContractAccountItemProcessor {
    pub(crate) fn init(&mut self, item: &CreateAccountItem, owner: &Address) {
        self.target = Some(item.address());
        self.item = Some(item.clone());
        self.owner = Some(owner.clone());
    }

    fn staged(&self) -> Result<(&CreateAccountItem, &Address, &Address)> {
        match (&self.item, &self.target, &self.owner) {
            (Some(item), Some(target), Some(owner)) => Ok((item, target, owner)),
            _ => Err(anyhow::anyhow!("Item processor used before init")),
        }
    }

    pub(crate) fn pre_process(&mut self, reader: &dyn StateReader) -> Result<(), ProcessError> {
        let (item, target, _) = self.staged()?;
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

    pub(crate) fn process(
        &mut self,
        height: BlockHeight,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        let (item, target, owner) = self.staged()?;
        let account_key = account_state_key(target);
        if reader.get_state(&account_key)?.is_some() {
            return Err(HeightRetry::StateOccupied {
                key: account_key,
                height,
            }
            .into());
        }
        let mut mutations = vec![
            MergeValue::replace(
                account_key,
                StateValue::Account(Account::contract(&item.keys, item.kind)),
            ),
            MergeValue::replace(
                contract_account_state_key(target),
                StateValue::ContractAccountStatus(ContractAccountStatus::new(owner.clone())),
            ),
        ];
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

fn expect_fact(op: &Operation) -> Result<&CreateContractAccountFact> {
    match op.fact() {
        OperationFact::CreateContractAccount(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Contract-account processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor for operations creating contract accounts on behalf of their
/// future owner.
#[derive(Default)]
pub struct CreateContractAccountProcessor {
    frame: Frame,
    items: Pool<CreateContractAccountItemProcessor>,
}

impl Reusable for CreateContractAccountProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for CreateContractAccountProcessor {
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
            item_processor.init(item, &fact.sender);
            mutations.extend(item_processor.process(self.frame.height(), reader)?);
        }
        mutations.extend(settle_required(reader, &fact.sender, &required)?);
        Ok(mutations)
    }
}
