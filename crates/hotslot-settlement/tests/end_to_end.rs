//! Settlement passes against an in-memory ledger.

use chrono::{DateTime, TimeDelta, Utc};
use hotslot_ledger::MemoryLedger;
use hotslot_settlement::{EntityOutcome, SettlementOrchestrator, TransferKind};
use hotslot_types::{Address, ClaimPhase, Entity, ErrorCategory, RawAmount, SettlementConfig};
use rust_decimal::Decimal;

fn orchestrator(ledger: &MemoryLedger) -> SettlementOrchestrator<&MemoryLedger> {
    SettlementOrchestrator::new(ledger, SettlementConfig::default()).unwrap()
}

fn units(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn after_window(t: DateTime<Utc>) -> DateTime<Utc> {
    t + TimeDelta::seconds(121)
}

#[test]
fn balanced_address_pays_owner_and_refunds() {
    let ledger = MemoryLedger::unscaled();
    let addr = Address::from("addr_x");
    ledger.receive(&addr, "bob", 50_000);
    ledger.receive(&addr, "carol", 20_000);
    let mut entities = vec![Entity::dummy_owned("addr_x", units(50_000), "alice", units(25_000))];
    let now = Utc::now();

    let report = orchestrator(&ledger).run_pass_at(&mut entities, now);

    let Some(EntityOutcome::Settled(s)) = report.outcome(entities[0].id()) else {
        panic!("expected Settled, got {:?}", report.outcomes);
    };
    assert!(s.gate.is_balanced());
    assert_eq!(s.gate.settled, RawAmount(70_000));
    assert_eq!(s.claimed_by, Some((Address::from("bob"), units(50_000))));
    assert_eq!(s.refunds_sent, 1);

    let transfers = ledger.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!(
        (&transfers[0].source, &transfers[0].destination, transfers[0].amount),
        (&addr, &Address::from("alice"), RawAmount(50_000))
    );
    assert_eq!(
        (&transfers[1].source, &transfers[1].destination, transfers[1].amount),
        (&addr, &Address::from("carol"), RawAmount(20_000))
    );
    assert_eq!(ledger.settled_of(&addr), RawAmount::ZERO);
    assert_eq!(report.transfers_of(TransferKind::Payout), 1);
    assert_eq!(report.transfers_of(TransferKind::Refund), 1);
    assert_eq!(report.transfers[0].block, transfers[0].block);

    let e = &entities[0];
    assert_eq!(e.owner_address(), Some(&Address::from("bob")));
    assert_eq!(e.current_price(), units(50_000));
    assert_eq!(e.target_price(), Some(units(100_000)));
    assert_ne!(e.target_address(), Some(&addr));
    assert!(e.checkpoint().is_none(), "fresh address starts unscanned");
    assert_eq!(e.target_time(), Some(now + TimeDelta::seconds(120)));
    assert_eq!(e.phase(now), ClaimPhase::Claimed);
    assert!(report.mutated);
}

#[test]
fn one_raw_unit_off_moves_nothing() {
    let ledger = MemoryLedger::unscaled();
    let addr = Address::from("addr_y");
    ledger.receive(&addr, "bob", 50_000);
    let c = ledger.receive(&addr, "carol", 20_000);
    ledger.credit_unexplained(&addr, 1);
    let mut entities = vec![Entity::dummy_owned("addr_y", units(50_000), "alice", units(25_000))];

    let report = orchestrator(&ledger).run_pass(&mut entities);

    assert!(ledger.transfers().is_empty());
    assert!(report.transfers.is_empty());
    assert_eq!(ledger.settled_of(&addr), RawAmount(70_001));
    let e = &entities[0];
    assert_eq!(e.checkpoint(), Some(&c), "checkpoint advances anyway");
    assert_eq!(e.owner_address(), Some(&Address::from("alice")));
    assert_eq!(e.target_address(), Some(&addr));
    assert_eq!(report.rendered, vec![e.id()]);
}

#[test]
fn only_first_exact_payment_wins() {
    let ledger = MemoryLedger::unscaled();
    let addr = Address::from("addr_d");
    ledger.receive(&addr, "a", 50_000);
    ledger.receive(&addr, "b", 50_000);
    ledger.receive(&addr, "c", 20_000);
    let mut entities = vec![Entity::dummy_claimable("addr_d", units(50_000))];

    orchestrator(&ledger).run_pass(&mut entities);

    // No previous owner: the winning payment stays on the retired address.
    let transfers = ledger.transfers();
    let refunded: Vec<_> = transfers
        .iter()
        .map(|t| (t.destination.as_str(), t.amount.0))
        .collect();
    assert_eq!(refunded, [("b", 50_000), ("c", 20_000)]);
    assert_eq!(ledger.settled_of(&addr), RawAmount(50_000));
    assert_eq!(entities[0].owner_address(), Some(&Address::from("a")));
}

#[test]
fn full_claim_cycle_doubles_price_and_refunds_self_payment() {
    let ledger = MemoryLedger::unscaled();
    let orch = orchestrator(&ledger);
    let mut slot = Entity::new("slot");
    slot.set_active(true);
    let mut entities = vec![slot];
    let id = entities[0].id();

    // Activation: price and first address, window still closed.
    let t0 = Utc::now();
    let report = orch.run_pass_at(&mut entities, t0);
    assert_eq!(report.outcome(id), Some(&EntityOutcome::NotClaimable));
    let first = entities[0].target_address().cloned().unwrap();
    assert_eq!(entities[0].target_price(), Some(units(50_000)));

    // First buyer; nobody to pay out.
    ledger.receive(&first, "alice", 50_000);
    let t1 = after_window(t0);
    orch.run_pass_at(&mut entities, t1);
    assert_eq!(entities[0].owner_address(), Some(&Address::from("alice")));
    let second = entities[0].target_address().cloned().unwrap();
    assert_ne!(second, first);
    assert_eq!(entities[0].target_price(), Some(units(100_000)));
    assert!(ledger.transfers().is_empty());

    // Payments before the window opens are picked up once it does.
    ledger.receive(&second, "alice", 100_000);
    ledger.receive(&second, "bob", 100_000);
    let report = orch.run_pass_at(&mut entities, t1 + TimeDelta::seconds(1));
    assert_eq!(report.outcome(id), Some(&EntityOutcome::NotClaimable));
    assert!(entities[0].checkpoint().is_none());

    let t2 = after_window(t1);
    let report = orch.run_pass_at(&mut entities, t2);
    assert_eq!(report.claims(), 1);
    assert_eq!(entities[0].owner_address(), Some(&Address::from("bob")));
    assert_eq!(entities[0].owned_since(), Some(t2));
    assert_eq!(entities[0].current_price(), units(100_000));
    assert_eq!(entities[0].target_price(), Some(units(200_000)));

    let transfers = ledger.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!(report.transfers[0].kind, TransferKind::Payout);
    assert_eq!(transfers[0].destination, Address::from("alice"));
    assert_eq!(transfers[0].amount, RawAmount(100_000));
    assert_eq!(report.transfers[1].kind, TransferKind::Refund);
    assert_eq!(transfers[1].destination, Address::from("alice"));
    assert_eq!(ledger.settled_of(&second), RawAmount::ZERO);
}

#[test]
fn scaled_ledger_compares_exact_decimals() {
    let ledger = MemoryLedger::new(6);
    let addr = Address::from("addr_s");
    ledger.receive(&addr, "near", 50_001);
    ledger.receive(&addr, "exact", 50_000);
    let mut entities = vec![Entity::dummy_claimable("addr_s", Decimal::new(5, 2))];

    orchestrator(&ledger).run_pass(&mut entities);

    assert_eq!(entities[0].owner_address(), Some(&Address::from("exact")));
    assert_eq!(entities[0].current_price(), Decimal::new(5, 2));
    assert_eq!(entities[0].target_price(), Some(Decimal::new(10, 2)));
    let transfers = ledger.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].destination, Address::from("near"));
    assert_eq!(transfers[0].amount, RawAmount(50_001));
}

#[test]
fn failing_entity_does_not_abort_pass() {
    let ledger = MemoryLedger::unscaled();
    ledger.receive(&Address::from("addr_1"), "p1", 7);
    ledger.receive(&Address::from("addr_3"), "p3", 9);
    ledger.break_address(&Address::from("addr_2"));
    let mut entities = vec![
        Entity::dummy_claimable("addr_1", units(10)),
        Entity::dummy_claimable("addr_2", units(10)),
        Entity::dummy_claimable("addr_3", units(10)),
    ];

    let report = orchestrator(&ledger).run_pass(&mut entities);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.rendered, vec![entities[0].id(), entities[2].id()]);
    assert_eq!(
        entities[1].error_category(),
        Some(ErrorCategory::Transport)
    );
    assert!(entities[0].error_message().is_none());
    let refunded: Vec<_> = ledger
        .transfers()
        .iter()
        .map(|t| t.destination.as_str().to_owned())
        .collect();
    assert_eq!(refunded, ["p1", "p3"]);
}

#[test]
fn repeated_passes_are_idempotent() {
    let ledger = MemoryLedger::unscaled();
    let addr = Address::from("addr_i");
    ledger.receive(&addr, "x", 3);
    ledger.receive(&addr, "y", 4);
    let mut entities = vec![Entity::dummy_claimable("addr_i", units(10))];
    let orch = orchestrator(&ledger);

    let first = orch.run_pass(&mut entities);
    assert_eq!(first.transfers.len(), 2);
    let snapshot = entities.clone();

    let second = orch.run_pass(&mut entities);
    assert!(second.transfers.is_empty());
    assert!(!second.mutated);
    assert_eq!(entities, snapshot);
    assert_eq!(ledger.transfers().len(), 2);
}

#[test]
fn pending_funds_hold_the_entity() {
    let ledger = MemoryLedger::unscaled();
    let addr = Address::from("addr_p");
    ledger.receive(&addr, "early", 10);
    ledger.receive_pending(&addr, 5);
    let mut entities = vec![Entity::dummy_claimable("addr_p", units(10))];
    let orch = orchestrator(&ledger);

    let report = orch.run_pass(&mut entities);
    assert!(matches!(
        report.outcome(entities[0].id()),
        Some(EntityOutcome::Deferred { .. })
    ));
    assert_eq!(entities[0].phase(Utc::now()), ClaimPhase::Pending);
    assert!(entities[0].owner_address().is_none());
    assert!(ledger.transfers().is_empty());
}
