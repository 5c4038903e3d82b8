use integration_tests::{bar, foo, signed, World};
use pretty_assertions::assert_eq;
use specie::*;
use specie_test::*;

fn register_fact(currency: &CurrencyId, genesis: &Actor, supply: u64, feeer: Feeer) -> OperationFact {
    let design = CurrencyDesign::new(
        Amount::new(Big::from(supply), currency.clone()),
        genesis.address.clone(),
        CurrencyPolicy::new(Big::ZERO, feeer).unwrap(),
    )
    .unwrap();
    OperationFact::CurrencyRegister(CurrencyRegisterFact {
        token: token(),
        design,
    })
}

fn mint_fact(items: &[(&Actor, u64, &CurrencyId)]) -> OperationFact {
    OperationFact::Mint(MintFact {
        token: token(),
        items: items
            .iter()
            .map(|(actor, big, currency)| IssueItem {
                receiver: actor.address.clone(),
                amount: Amount::new(Big::from(*big), (*currency).clone()),
            })
            .collect(),
    })
}

#[test]
fn register_currency_flow() {
    let mut world = World::new();
    let node = Actor::new(1);
    let genesis = Actor::new(10);
    world.seed_suffrage(&[&node], 100);
    world.seed_account(&genesis, &[]);

    let op = signed(register_fact(&bar(), &genesis, 5000, Feeer::Nil), &[&node]);
    world.apply(&op).unwrap();

    let design = world.ledger.currency_design(&bar()).unwrap();
    assert_eq!(design.aggregate(), Big::from(5000u64));
    assert_eq!(design.genesis_account(), &genesis.address);

    // the genesis account holds the whole initial supply
    assert_eq!(world.balance(&genesis.address, &bar()), Big::from(5000u64));

    // every currency gets its neutral sink: a zero account anchored at a
    // zero balance
    let zero = Address::zero(&bar());
    let zero_account = world.ledger.get(&account_state_key(&zero)).unwrap();
    assert!(zero_account.as_account().unwrap().is_zero());
    assert_eq!(world.balance(&zero, &bar()), Big::ZERO);
    assert!(world
        .ledger
        .get(&balance_state_key(&zero, &bar()))
        .is_some());
}

#[test]
fn register_existing_currency_rejects() {
    let mut world = World::new();
    let node = Actor::new(1);
    let genesis = Actor::new(10);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);

    let op = signed(register_fact(&foo(), &genesis, 5000, Feeer::Nil), &[&node]);
    // the genesis account for FOO already exists via the fixture
    world.seed_account(&genesis, &[]);
    let err = world.apply(&op).unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::CurrencyAlreadyRegistered { .. })
    ));
}

#[test]
fn currency_admin_requires_suffrage_threshold() {
    let mut world = World::new();
    let node_a = Actor::new(1);
    let node_b = Actor::new(2);
    let outsider = Actor::new(9);
    let genesis = Actor::new(10);
    // two nodes of weight 100 with threshold 100: either node suffices,
    // but an account-level signature never does
    world.seed_suffrage(&[&node_a, &node_b], 100);
    world.seed_account(&genesis, &[]);

    let fact = register_fact(&bar(), &genesis, 5000, Feeer::Nil);

    let err = world
        .apply(&signed(fact.clone(), &[&outsider]))
        .unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::NotSuffrageNode { .. })
    ));

    world.apply(&signed(fact, &[&node_b])).unwrap();
}

#[test]
fn missing_suffrage_state_is_retry() {
    let mut world = World::new();
    let node = Actor::new(1);
    let genesis = Actor::new(10);
    world.seed_account(&genesis, &[]);
    // no suffrage state seeded at all

    let op = signed(register_fact(&bar(), &genesis, 5000, Feeer::Nil), &[&node]);
    let err = world.apply(&op).unwrap_err();
    assert!(err.is_retry());
    assert!(!err.is_rejection());
}

#[test]
fn policy_update_flow() {
    let mut world = World::new();
    let node = Actor::new(1);
    let fee_receiver = Actor::new(12);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);
    world.seed_account(&fee_receiver, &[(0, &foo())]);

    let aggregate_before = world.ledger.currency_design(&foo()).unwrap().aggregate();
    let policy = CurrencyPolicy::new(
        Big::from(25u64),
        Feeer::Fixed {
            amount: Big::from(3u64),
            receiver: fee_receiver.address.clone(),
        },
    )
    .unwrap();
    let op = signed(
        OperationFact::CurrencyPolicyUpdate(CurrencyPolicyUpdateFact {
            token: token(),
            currency: foo(),
            policy: policy.clone(),
        }),
        &[&node],
    );
    world.apply(&op).unwrap();

    let design = world.ledger.currency_design(&foo()).unwrap();
    assert_eq!(design.policy(), &policy);
    // only the policy changes; issuance bookkeeping is untouched
    assert_eq!(design.aggregate(), aggregate_before);
}

#[test]
fn policy_update_with_unknown_receiver_rejects() {
    let mut world = World::new();
    let node = Actor::new(1);
    let ghost = Actor::new(99);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);

    let op = signed(
        OperationFact::CurrencyPolicyUpdate(CurrencyPolicyUpdateFact {
            token: token(),
            currency: foo(),
            policy: CurrencyPolicy::new(
                Big::ZERO,
                Feeer::Fixed {
                    amount: Big::from(3u64),
                    receiver: ghost.address.clone(),
                },
            )
            .unwrap(),
        }),
        &[&node],
    );
    let err = world.apply(&op).unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::UnknownFeeReceiverAccount { .. })
    ));
}

#[test]
fn policy_update_unknown_currency_rejects() {
    let mut world = World::new();
    let node = Actor::new(1);
    world.seed_suffrage(&[&node], 100);

    let op = signed(
        OperationFact::CurrencyPolicyUpdate(CurrencyPolicyUpdateFact {
            token: token(),
            currency: bar(),
            policy: CurrencyPolicy::new(Big::ZERO, Feeer::Nil).unwrap(),
        }),
        &[&node],
    );
    let err = world.apply(&op).unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::UnknownCurrency { .. })
    ));
}

#[test]
fn mint_credits_receivers_and_grows_aggregate() {
    let mut world = World::new();
    let node = Actor::new(1);
    let alice = Actor::new(10);
    let bob = Actor::new(11);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);
    world.seed_account(&alice, &[(7, &foo())]);
    // bob has an account but has never held FOO
    world.seed_account(&bob, &[]);

    let aggregate_before = world.ledger.currency_design(&foo()).unwrap().aggregate();
    let op = signed(
        mint_fact(&[(&alice, 100, &foo()), (&bob, 50, &foo())]),
        &[&node],
    );
    world.apply(&op).unwrap();

    assert_eq!(world.balance(&alice.address, &foo()), Big::from(107u64));
    assert_eq!(world.balance(&bob.address, &foo()), Big::from(50u64));
    assert_eq!(
        world.ledger.currency_design(&foo()).unwrap().aggregate(),
        aggregate_before.add(Big::from(150u64)).unwrap()
    );
}

#[test]
fn mint_to_missing_account_rejects() {
    let mut world = World::new();
    let node = Actor::new(1);
    let ghost = Actor::new(99);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);

    let op = signed(mint_fact(&[(&ghost, 100, &foo())]), &[&node]);
    let err = world.apply(&op).unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::UnknownAccount { .. })
    ));
}

#[test]
fn repeated_inflation_sums_into_aggregate() {
    let mut world = World::new();
    let node = Actor::new(1);
    let alice = Actor::new(10);
    let bob = Actor::new(11);
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);
    world.seed_account(&alice, &[(0, &foo())]);
    world.seed_account(&bob, &[(0, &foo())]);

    let aggregate_before = world.ledger.currency_design(&foo()).unwrap().aggregate();
    let credits = [(&alice, 11u64), (&bob, 22u64), (&alice, 33u64)];
    for (i, (actor, big)) in credits.iter().enumerate() {
        let op = signed(
            OperationFact::SuffrageInflation(SuffrageInflationFact {
                token: token_at(i as i64),
                items: vec![IssueItem {
                    receiver: actor.address.clone(),
                    amount: Amount::new(Big::from(*big), foo()),
                }],
            }),
            &[&node],
        );
        world.apply(&op).unwrap();
    }

    // regardless of how many distinct receivers were involved
    assert_eq!(
        world.ledger.currency_design(&foo()).unwrap().aggregate(),
        aggregate_before.add(Big::from(66u64)).unwrap()
    );
    assert_eq!(world.balance(&alice.address, &foo()), Big::from(44u64));
    assert_eq!(world.balance(&bob.address, &foo()), Big::from(22u64));
}

#[test]
fn account_signature_cannot_mint() {
    let mut world = World::new();
    let node = Actor::new(1);
    let alice = Actor::new(10);
    // alice is wealthy but not a node
    world.seed_suffrage(&[&node], 100);
    world.seed_currency(&foo(), Feeer::Nil, 0);
    world.seed_account(&alice, &[(1_000_000, &foo())]);

    let op = signed(mint_fact(&[(&alice, 100, &foo())]), &[&alice]);
    let err = world.apply(&op).unwrap_err();
    assert!(matches!(
        err.as_rejection(),
        Some(Rejection::NotSuffrageNode { .. })
    ));
}
