use crate::*;

/// What an operation costs in one currency: the full reserved amount
/// (principal plus fee) and the fee share of it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Required {
    pub total: Big,
    pub fee: Big,
}

/// Compute, per currency, what a set of line-item amounts costs.
///
/// This is the single point of truth for "what does this operation cost";
/// create-account, transfer, contract-account creation and withdraw all
/// share it. When a policy evaluates to a zero fee the whole transferred
/// amount is still reserved, but none of it is tagged as fee, so the
/// receiver-credit step is skipped downstream.
pub fn required_amounts<'a>(
    reader: &dyn StateReader,
    amounts: impl Iterator<Item = &'a Amount>,
) -> Result<BTreeMap<CurrencyId, Required>, ProcessError> {
    let mut designs: BTreeMap<CurrencyId, CurrencyDesign> = BTreeMap::new();
    let mut required: BTreeMap<CurrencyId, Required> = BTreeMap::new();
    for amount in amounts {
        if !designs.contains_key(&amount.currency) {
            let design = require_currency_design(reader, &amount.currency)?;
            designs.insert(amount.currency.clone(), design);
        }
        let design = &designs[&amount.currency];
        let fee = design.policy().feeer.fee(amount.big)?;
        let entry = required.entry(amount.currency.clone()).or_default();
        entry.total = entry.total.add(amount.big)?.add(fee)?;
        entry.fee = entry.fee.add(fee)?;
    }
    Ok(required)
}

/// Check the holder can cover every required amount, returning the loaded
/// balance states keyed by currency for later mutation.
///
/// A missing balance state is a rejection, never an implicit zero.
pub fn check_enough_balance(
    reader: &dyn StateReader,
    holder: &Address,
    required: &BTreeMap<CurrencyId, Required>,
) -> Result<BTreeMap<CurrencyId, State>, ProcessError> {
    let mut balances = BTreeMap::new();
    for (currency, req) in required {
        let state = require_balance(reader, holder, currency)?;
        let available = state.as_balance()?.big;
        if available < req.total {
            return Err(Rejection::InsufficientBalance {
                address: holder.clone(),
                currency: currency.clone(),
                requested: req.total,
                available,
            }
            .into());
        }
        balances.insert(currency.clone(), state);
    }
    Ok(balances)
}

/// Debit the payer and credit each currency's fee receiver.
///
/// When the fee receiver's balance key is the payer's own key, the fee is
/// folded back into the payer's single mutation instead of emitting two
/// conflicting mutations for one key.
pub fn settle_required(
    reader: &dyn StateReader,
    payer: &Address,
    required: &BTreeMap<CurrencyId, Required>,
) -> Result<Vec<MergeValue>, ProcessError> {
    let mut mutations = Vec::new();
    for (currency, req) in required {
        let design = require_currency_design(reader, currency)?;
        let receiver = match design.policy().feeer.receiver() {
            Some(receiver) if !req.fee.is_zero() => Some(receiver.clone()),
            _ => None,
        };
        match receiver {
            None => {
                mutations.push(MergeValue::debit(
                    payer,
                    Amount::new(req.total, currency.clone()),
                ));
            }
            Some(receiver) if &receiver == payer => {
                mutations.push(MergeValue::debit(
                    payer,
                    Amount::new(req.total.sub(req.fee)?, currency.clone()),
                ));
            }
            Some(receiver) => {
                if reader
                    .get_state(&balance_state_key(&receiver, currency))?
                    .is_none()
                {
                    return Err(Rejection::UnknownFeeReceiver {
                        address: receiver,
                        currency: currency.clone(),
                    }
                    .into());
                }
                mutations.push(MergeValue::debit(
                    payer,
                    Amount::new(req.total, currency.clone()),
                ));
                mutations.push(MergeValue::credit(
                    &receiver,
                    Amount::new(req.fee, currency.clone()),
                ));
            }
        }
    }
    Ok(mutations)
}
