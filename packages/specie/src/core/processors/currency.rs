use crate::*;

use super::{check_suffrage_operation, Frame, OperationProcessor};

fn expect_register_fact(op: &Operation) -> Result<&CurrencyRegisterFact> {
    match op.fact() {
        OperationFact::CurrencyRegister(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Currency-register processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor registering a new currency: the design itself, the credited
/// genesis account, and the currency's zero account with a zero balance so
/// every currency always has a neutral sink.
#[derive(Default)]
pub struct CurrencyRegisterProcessor {
    frame: Frame,
}

impl Reusable for CurrencyRegisterProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for CurrencyRegisterProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        self.frame.prepare(height, config);
    }

    fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        self.frame.begin_pre_process()?;
        let fact = expect_register_fact(op)?;
        op.fact().is_valid(self.frame.config())?;
        check_suffrage_operation(reader, self.frame.height(), &op.signers())?;
        let currency = fact.design.currency();
        if reader
            .get_state(&currency_design_state_key(currency))?
            .is_some()
        {
            return Err(Rejection::CurrencyAlreadyRegistered {
                currency: currency.clone(),
            }
            .into());
        }
        require_account(reader, fact.design.genesis_account())?;
        Ok(())
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_register_fact(op)?;
        let currency = fact.design.currency().clone();
        let design_key = currency_design_state_key(&currency);
        if reader.get_state(&design_key)?.is_some() {
            return Err(HeightRetry::StateOccupied {
                key: design_key,
                height: self.frame.height(),
            }
            .into());
        }
        let zero = Address::zero(&currency);
        Ok(vec![
            MergeValue::replace(
                design_key,
                StateValue::CurrencyDesign(fact.design.clone()),
            ),
            MergeValue::credit(
                fact.design.genesis_account(),
                fact.design.initial_supply().clone(),
            ),
            MergeValue::replace(
                account_state_key(&zero),
                StateValue::Account(Account::zero(&currency)),
            ),
            MergeValue::credit(&zero, Amount::zero(currency)),
        ])
    }
}

fn expect_update_fact(op: &Operation) -> Result<&CurrencyPolicyUpdateFact> {
    match op.fact() {
        OperationFact::CurrencyPolicyUpdate(fact) => Ok(fact),
        other => Err(anyhow::anyhow!(
            "Currency-policy-update processor given a {} operation",
            other.kind()
        )),
    }
}

/// Processor rewriting the policy of an already-registered currency.
#[derive(Default)]
pub struct CurrencyPolicyUpdateProcessor {
    frame: Frame,
}

impl Reusable for CurrencyPolicyUpdateProcessor {
    fn reset(&mut self) {
        self.frame = Frame::default();
    }
}

impl OperationProcessor for CurrencyPolicyUpdateProcessor {
    fn prepare(&mut self, height: BlockHeight, config: ProcessorConfig) {
        self.frame.prepare(height, config);
    }

    fn pre_process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<(), ProcessError> {
        self.frame.begin_pre_process()?;
        let fact = expect_update_fact(op)?;
        op.fact().is_valid(self.frame.config())?;
        check_suffrage_operation(reader, self.frame.height(), &op.signers())?;
        require_currency_design(reader, &fact.currency)?;
        // a changed fee receiver must already have an account
        if let Some(receiver) = fact.policy.feeer.receiver() {
            if reader.get_state(&account_state_key(receiver))?.is_none() {
                return Err(Rejection::UnknownFeeReceiverAccount {
                    address: receiver.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        op: &Operation,
        reader: &dyn StateReader,
    ) -> Result<Vec<MergeValue>, ProcessError> {
        self.frame.begin_process()?;
        let fact = expect_update_fact(op)?;
        let design = require_currency_design(reader, &fact.currency)?;
        let design = design
            .set_policy(fact.policy.clone())
            .map_err(Rejection::from)?;
        Ok(vec![MergeValue::replace(
            currency_design_state_key(&fact.currency),
            StateValue::CurrencyDesign(design),
        )])
    }
}
