//! End-to-end issuer scenarios.
//!
//! Each test drives the locked facade through a short history and checks
//! pool accumulators, reward debt, issued rewards, and custody balances.

use stax_core::error::{CollaboratorError, IssuerError};
use stax_core::types::Position;
use stax_tests::helpers::*;

// ---------------------------------------------------------------------------
// Multiplier vectors
// ---------------------------------------------------------------------------

#[test]
fn multiplier_vectors_through_clock() {
    let world = World::new(vector_config());

    world.clock.advance_to(35);
    assert_eq!(world.issuer.multiplier(10, 25).unwrap(), 120);
    assert_eq!(world.issuer.multiplier(21, 29).unwrap(), 48);
    assert_eq!(world.issuer.multiplier(0, 23).unwrap(), 104);

    world.clock.advance_to(50);
    assert_eq!(world.issuer.multiplier(12, 50).unwrap(), 149);
}

#[test]
fn multiplier_clamps_to_current_height() {
    let world = World::new(vector_config());
    world.clock.advance_to(33);
    assert_eq!(world.issuer.multiplier(16, 54).unwrap(), 98);
    assert_eq!(world.issuer.multiplier(16, 33).unwrap(), 98);
}

#[test]
fn emission_does_not_stop_at_end_height() {
    let world = World::new(vector_config());
    world.clock.advance_to(100);
    // end_of_emission_height is 35; the floor rate of 1 continues.
    assert_eq!(world.issuer.multiplier(35, 100).unwrap(), 65);
}

// ---------------------------------------------------------------------------
// Accrual
// ---------------------------------------------------------------------------

#[test]
fn accumulator_and_partial_withdraw() {
    let world = World::with_pools(scenario_config(), &[10, 20]);
    let alice = account(0xa1);
    world.fund(alice, 250_000);

    world.clock.advance_to(110);
    world.issuer.deposit(&alice, 0, 250_000).unwrap();

    world.clock.advance_to(134);
    world.issuer.settle(0).unwrap();
    let pool = world.issuer.pool_info(0).unwrap();
    assert_eq!(pool.acc_reward_per_share, 336_000_000);
    assert_eq!(pool.last_settled_height, 134);

    let receipt = world.issuer.withdraw(&alice, 0, 100_000).unwrap();
    assert_eq!(receipt.reward_issued, 84);
    assert_eq!(
        world.issuer.position_info(0, &alice).unwrap(),
        Position { deposited: 150_000, reward_debt: 50 }
    );
    assert_eq!(world.rewards_of(&alice), 84);
    assert_eq!(world.custody.balance_of(&lp(0), &alice), 100_000);
}

#[test]
fn round_trip_at_same_height_returns_principal_only() {
    let world = World::with_pools(scenario_config(), &[10, 20]);
    let bob = account(0xb0);
    world.fund(bob, 77_777);

    world.clock.advance_to(118);
    world.issuer.deposit(&bob, 1, 77_777).unwrap();
    let receipt = world.issuer.withdraw(&bob, 1, 77_777).unwrap();

    assert_eq!(receipt.reward_issued, 0);
    assert_eq!(world.rewards_of(&bob), 0);
    assert_eq!(world.custody.balance_of(&lp(1), &bob), 77_777);
    assert_eq!(world.custody.held(&lp(1)), 0);
}

#[test]
fn settle_all_twice_is_noop() {
    let world = World::with_pools(scenario_config(), &[10, 20, 5]);
    let alice = account(0xa1);
    world.fund(alice, 10_000);

    world.clock.advance_to(101);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.issuer.deposit(&alice, 2, 2_000).unwrap();

    world.clock.advance_to(140);
    world.issuer.settle_all().unwrap();
    let once = world.issuer.pools();
    world.issuer.settle_all().unwrap();
    assert_eq!(world.issuer.pools(), once);
    assert!(once.iter().all(|p| p.last_settled_height == 140));
}

#[test]
fn rewards_split_by_pool_weight() {
    let world = World::with_pools(scenario_config(), &[10, 20]);
    let alice = account(0xa1);
    let bob = account(0xb0);
    world.fund(alice, 1_000);
    world.fund(bob, 1_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.issuer.deposit(&bob, 1, 1_000).unwrap();

    world.clock.advance_to(115);
    // multiplier(100, 115) = 120; 120*2*10/30 = 80 and 120*2*20/30 = 160
    assert_eq!(world.issuer.pending_reward(0, &alice).unwrap(), 80);
    assert_eq!(world.issuer.pending_reward(1, &bob).unwrap(), 160);
}

#[test]
fn late_joiner_earns_only_from_entry() {
    let world = World::with_pools(scenario_config(), &[30]);
    let alice = account(0xa1);
    let bob = account(0xb0);
    world.fund(alice, 1_000);
    world.fund(bob, 1_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.clock.advance_to(110);
    world.issuer.deposit(&bob, 0, 1_000).unwrap();
    world.clock.advance_to(120);

    // 100..110: 80*2 = 160 to alice alone; 110..120: 160 split evenly
    assert_eq!(world.issuer.pending_reward(0, &alice).unwrap(), 240);
    assert_eq!(world.issuer.pending_reward(0, &bob).unwrap(), 80);
}

#[test]
fn weight_change_settles_first() {
    let world = World::with_pools(scenario_config(), &[10, 20]);
    let alice = account(0xa1);
    world.fund(alice, 1_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.clock.advance_to(110);
    assert_eq!(world.issuer.set_weight(&AUTHORITY, 0, 20).unwrap(), 10);
    world.clock.advance_to(120);
    assert_eq!(world.issuer.pending_reward(0, &alice).unwrap(), 133);
}

#[test]
fn new_pool_with_update_protects_existing_rewards() {
    let world = World::with_pools(scenario_config(), &[10]);
    let alice = account(0xa1);
    world.fund(alice, 1_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.clock.advance_to(110);
    world
        .issuer
        .register_with_update(&AUTHORITY, 30, lp(1))
        .unwrap();
    world.clock.advance_to(120);
    assert_eq!(world.issuer.pending_reward(0, &alice).unwrap(), 200);
    assert_eq!(world.issuer.total_weight(), 40);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn error_taxonomy() {
    let world = World::with_pools(scenario_config(), &[10]);
    let alice = account(0xa1);
    world.fund(alice, 100);

    assert_eq!(
        world.issuer.register(&alice, 1, lp(3)),
        Err(IssuerError::Unauthorized(alice))
    );
    assert_eq!(world.issuer.deposit(&alice, 7, 1).unwrap_err(), IssuerError::InvalidPool(7));
    assert_eq!(
        world.issuer.withdraw(&alice, 0, 1).unwrap_err(),
        IssuerError::InsufficientBalance { have: 0, need: 1 }
    );
    assert!(matches!(
        world.issuer.deposit(&alice, 0, 101).unwrap_err(),
        IssuerError::CollaboratorFailure(CollaboratorError::Custody(_))
    ));
    assert_eq!(world.issuer.position_info(0, &alice).unwrap(), Position::default());
}

#[test]
fn failed_withdraw_does_not_double_pay() {
    let world = World::with_pools(scenario_config(), &[10]);
    let alice = account(0xa1);
    world.fund(alice, 1_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 1_000).unwrap();
    world.clock.advance_to(110);

    world.custody.freeze(alice);
    assert!(world.issuer.withdraw(&alice, 0, 500).is_err());
    assert_eq!(world.rewards_of(&alice), 0);
    world.custody.thaw(&alice);

    let receipt = world.issuer.withdraw(&alice, 0, 500).unwrap();
    // multiplier(100, 110) = 80; 80*2*10/10 = 160
    assert_eq!(receipt.reward_issued, 160);
    assert_eq!(world.rewards_of(&alice), 160);
}

#[test]
fn emergency_withdraw_returns_principal() {
    let world = World::with_pools(scenario_config(), &[10]);
    let alice = account(0xa1);
    world.fund(alice, 5_000);

    world.clock.advance_to(100);
    world.issuer.deposit(&alice, 0, 5_000).unwrap();
    world.clock.advance_to(130);
    assert_eq!(world.issuer.emergency_withdraw(&alice, 0).unwrap(), 5_000);
    assert_eq!(world.rewards_of(&alice), 0);
    assert_eq!(world.custody.balance_of(&lp(0), &alice), 5_000);
    assert_eq!(world.issuer.pending_reward(0, &alice).unwrap(), 0);
}

#[test]
fn snapshot_resumes_accrual() {
    let world = World::with_pools(scenario_config(), &[10, 20]);
    let alice = account(0xa1);
    world.fund(alice, 250_000);
    world.clock.advance_to(110);
    world.issuer.deposit(&alice, 0, 250_000).unwrap();
    let bytes = world.issuer.snapshot().unwrap();

    let restored = stax_issuer::Issuer::restore(
        scenario_config(),
        world.clock.clone(),
        world.custody.clone(),
        world.issuance.clone(),
        &bytes,
    )
    .unwrap();
    world.clock.advance_to(134);
    restored.settle(0).unwrap();
    assert_eq!(restored.pool_info(0).unwrap().acc_reward_per_share, 336_000_000);
}
