//! Existential-deposit policy: the one-time top-up a substrate account
//! may need before it can receive funds.

mod common;

use common::*;
use payout_core::engine::PayoutEngine;
use payout_core::record::Treasury;
use payout_core::types::StatusCode;

fn ed_treasury(id: i64) -> Treasury {
    let mut t = substrate_treasury(id);
    t.send_existential_deposit = true;
    t
}

#[test]
fn tops_up_a_dusted_receiver_before_the_main_transfer() {
    let store = store();
    store.insert_treasury(&ed_treasury(1)).unwrap();
    store.insert_user(10, None, Some("5AAA")).unwrap();
    let a1 = store.insert_award(10, 1, &dec("5"), None, 100).unwrap();

    let chains = MockChains::new();
    chains.state.borrow_mut().existential_deposit = big(1_000_000_000);
    chains.set_free_balance("WALLET", 1_000_000_000_000);
    // Receiver holds nothing, below the deposit constant.
    let decryptor = MockDecryptor::new("k");
    let engine = PayoutEngine::new(&store, &chains, &decryptor);

    let summary = engine.run(&mut RecordingSink::default(), "k", 1).unwrap();
    assert_eq!(summary.submitted, 1);

    // First the top-up of exactly the deposit, then the payout.
    let submissions = chains.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].amount, big(1_000_000_000));
    assert_eq!(submissions[0].receiver, "5AAA");
    assert_eq!(submissions[1].amount, big(50_000_000_000));

    let state = store.award(a1).unwrap();
    assert!(state.sent_existential_deposit);
    assert_eq!(store.existential_deposit_count(10).unwrap(), 1);
}

#[test]
fn top_up_happens_at_most_once_per_user_and_chain() {
    let store = store();
    store.insert_treasury(&ed_treasury(1)).unwrap();
    store.insert_user(10, None, Some("5AAA")).unwrap();
    store.insert_award(10, 1, &dec("5"), None, 100).unwrap();

    let chains = MockChains::new();
    chains.state.borrow_mut().existential_deposit = big(1_000_000_000);
    chains.set_free_balance("WALLET", 1_000_000_000_000);
    let decryptor = MockDecryptor::new("k");
    let engine = PayoutEngine::new(&store, &chains, &decryptor);

    engine.run(&mut RecordingSink::default(), "k", 1).unwrap();
    assert_eq!(chains.submissions().len(), 2);

    // A later run pays a new award to the same user. The durable
    // existential-deposit record suppresses a second top-up even
    // though the receiver's balance is checked afresh.
    let a2 = store.insert_award(10, 1, &dec("3"), None, 200).unwrap();
    engine.run(&mut RecordingSink::default(), "k", 1).unwrap();

    let submissions = chains.submissions();
    assert_eq!(submissions.len(), 3);
    assert_eq!(submissions[2].amount, big(30_000_000_000));
    assert_eq!(store.existential_deposit_count(10).unwrap(), 1);
    assert!(!store.award(a2).unwrap().sent_existential_deposit);
}

#[test]
fn receiver_already_funded_needs_no_top_up() {
    let store = store();
    store.insert_treasury(&ed_treasury(1)).unwrap();
    store.insert_user(10, None, Some("5AAA")).unwrap();
    let a1 = store.insert_award(10, 1, &dec("5"), None, 100).unwrap();

    let chains = MockChains::new();
    chains.state.borrow_mut().existential_deposit = big(1_000_000_000);
    chains.set_free_balance("WALLET", 1_000_000_000_000);
    chains.set_free_balance("5AAA", 2_000_000_000);
    let decryptor = MockDecryptor::new("k");
    let engine = PayoutEngine::new(&store, &chains, &decryptor);

    engine.run(&mut RecordingSink::default(), "k", 1).unwrap();

    assert_eq!(chains.submissions().len(), 1);
    assert!(!store.award(a1).unwrap().sent_existential_deposit);
    assert_eq!(store.existential_deposit_count(10).unwrap(), 0);
}

#[test]
fn wallet_too_poor_for_the_deposit_fails_with_insufficient_balance() {
    let store = store();
    store.insert_treasury(&ed_treasury(1)).unwrap();
    store.insert_user(10, None, Some("5AAA")).unwrap();
    let a1 = store.insert_award(10, 1, &dec("5"), None, 100).unwrap();

    let chains = MockChains::new();
    chains.state.borrow_mut().existential_deposit = big(1_000_000_000);
    chains.set_free_balance("WALLET", 500_000_000);
    let decryptor = MockDecryptor::new("k");
    let engine = PayoutEngine::new(&store, &chains, &decryptor);

    engine.run(&mut RecordingSink::default(), "k", 1).unwrap();

    assert!(chains.submissions().is_empty());
    assert_eq!(
        store.award(a1).unwrap().status,
        StatusCode::InsufficientBalance
    );
    // Nothing was sent, so no durable record either.
    assert_eq!(store.existential_deposit_count(10).unwrap(), 0);
}
