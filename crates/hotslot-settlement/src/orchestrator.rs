//! The settlement pass.
//!
//! Entities are processed one at a time, in order. Per entity:
//! 1. Initialize price and deposit address if missing
//! 2. Stop unless the claim window is open
//! 3. Read the balance; defer if any funds are pending
//! 4. Resolve new payments and store the advanced checkpoint right away
//! 5. Gate: settled balance must equal winner + refunds
//! 6. Winner: reserve the next address, pay the previous owner, claim
//! 7. Refund every other payment from the scanned address
//!
//! Nothing is rolled back on error. The checkpoint only ever moves forward,
//! so keeping it after a failed payout or refund is safe; the cost is that
//! those payments are not retried automatically.

use chrono::{DateTime, Utc};
use hotslot_ledger::LedgerGateway;
use hotslot_resolver::{OwnershipResolver, ResolveRequest, ScanLimits};
use hotslot_types::{Address, Entity, HotslotError, RawAmount, Result, SettlementConfig};

use crate::gate::GateCheck;
use crate::lifecycle;
use crate::outcome::{EntityOutcome, PassReport, Settlement, TransferKind, TransferRecord};

/// Runs settlement passes against one ledger.
pub struct SettlementOrchestrator<G> {
    gateway: G,
    config: SettlementConfig,
}

impl<G: LedgerGateway> SettlementOrchestrator<G> {
    /// # Errors
    /// Returns [`HotslotError::Configuration`] if `config` is invalid.
    pub fn new(gateway: G, config: SettlementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { gateway, config })
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// One pass over `entities` at the current time.
    pub fn run_pass(&self, entities: &mut [Entity]) -> PassReport {
        self.run_pass_at(entities, Utc::now())
    }

    /// One pass over `entities` as of `now`.
    ///
    /// Never fails as a whole: per-entity errors are stored on the entity
    /// and reported as [`EntityOutcome::Failed`].
    pub fn run_pass_at(&self, entities: &mut [Entity], now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();

        for entity in entities.iter_mut() {
            let id = entity.id();
            if !entity.is_active() {
                tracing::debug!(entity = %id, "Inactive; skipped");
                report.outcomes.push((id, EntityOutcome::Skipped));
                continue;
            }

            let before = entity.clone();
            let outcome = match self.settle_entity(entity, now, &mut report.transfers) {
                Ok(outcome) => {
                    entity.clear_error();
                    report.rendered.push(id);
                    outcome
                }
                Err(err) => {
                    tracing::warn!(entity = %id, category = %err.category(), error = %err, "Settlement failed");
                    entity.set_error(&err);
                    EntityOutcome::Failed {
                        category: err.category(),
                        message: err.to_string(),
                    }
                }
            };

            report.mutated |= *entity != before;
            report.outcomes.push((id, outcome));
        }

        tracing::info!(
            entities = entities.len(),
            rendered = report.rendered.len(),
            failed = report.failed(),
            claims = report.claims(),
            transfers = report.transfers.len(),
            mutated = report.mutated,
            "Settlement pass complete"
        );
        report
    }

    /// Process one active entity. Transfers are appended to `journal` as
    /// soon as the ledger accepts them.
    pub fn settle_entity(
        &self,
        entity: &mut Entity,
        now: DateTime<Utc>,
        journal: &mut Vec<TransferRecord>,
    ) -> Result<EntityOutcome> {
        lifecycle::ensure_initialized(entity, &self.gateway, &self.config, now)?;

        if !entity.can_be_claimed(now) {
            tracing::debug!(entity = %entity.id(), opens = ?entity.target_time(), "Claim window closed");
            return Ok(EntityOutcome::NotClaimable);
        }

        let (address, target_price) = match (entity.target_address(), entity.target_price()) {
            (Some(address), Some(price)) => (address.clone(), price),
            _ => {
                return Err(HotslotError::InvalidEntity {
                    id: entity.id(),
                    reason: "claimable without target address and price".into(),
                });
            }
        };

        let balance = self.gateway.balance(&address)?;
        if balance.has_pending() {
            tracing::warn!(entity = %entity.id(), %address, pending = %balance.pending, "Unsettled funds; deferred");
            entity.set_has_pending(true);
            return Ok(EntityOutcome::Deferred {
                pending: balance.pending,
            });
        }
        entity.set_has_pending(false);

        let resolver = OwnershipResolver::new(&self.gateway, ScanLimits::from(&self.config));
        let resolution = resolver.resolve(&ResolveRequest {
            address: &address,
            checkpoint: entity.checkpoint(),
            target_price,
            previous_owner: entity.owner_address(),
        })?;
        entity.advance_checkpoint(resolution.checkpoint.clone());

        let gate = GateCheck::evaluate(&balance, &resolution)?;
        let mut settlement = Settlement {
            examined: resolution.examined,
            claimed_by: None,
            refunds_sent: 0,
            held: 0,
            gate,
        };

        if !gate.is_balanced() {
            settlement.held = resolution.refunds.len() + usize::from(resolution.winner.is_some());
            tracing::warn!(entity = %entity.id(), %address, %gate, held = settlement.held, "Balance not fully explained; no funds moved");
            return Ok(EntityOutcome::Settled(settlement));
        }

        if let Some(winner) = &resolution.winner {
            // Everything fallible that needs no funds goes first.
            lifecycle::next_price(winner.amount)?;
            let next_address = self.gateway.create_address()?;

            if let Some(previous_owner) = entity.owner_address().cloned() {
                self.transfer(
                    journal,
                    entity,
                    TransferKind::Payout,
                    &address,
                    previous_owner,
                    winner.raw(),
                )?;
            }

            lifecycle::apply_claim(
                entity,
                winner.sender().clone(),
                winner.amount,
                next_address,
                &self.config,
                now,
            )?;
            settlement.claimed_by = Some((winner.sender().clone(), winner.amount));
        }

        for refund in &resolution.refunds {
            self.transfer(
                journal,
                entity,
                TransferKind::Refund,
                &address,
                refund.sender().clone(),
                refund.raw(),
            )?;
            settlement.refunds_sent += 1;
        }

        Ok(EntityOutcome::Settled(settlement))
    }

    fn transfer(
        &self,
        journal: &mut Vec<TransferRecord>,
        entity: &Entity,
        kind: TransferKind,
        source: &Address,
        destination: Address,
        amount: RawAmount,
    ) -> Result<()> {
        let block = self.gateway.send(source, &destination, amount)?;
        tracing::info!(
            entity = %entity.id(),
            %kind,
            %source,
            %destination,
            %amount,
            block = %block,
            "Funds sent"
        );
        journal.push(TransferRecord {
            entity: entity.id(),
            kind,
            source: source.clone(),
            destination,
            amount,
            block,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hotslot_ledger::MemoryLedger;
    use hotslot_types::{BlockHash, ErrorCategory, LedgerOp};
    use rust_decimal::Decimal;

    use super::*;

    fn orchestrator(ledger: &MemoryLedger) -> SettlementOrchestrator<&MemoryLedger> {
        SettlementOrchestrator::new(ledger, SettlementConfig::default()).unwrap()
    }

    fn price(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn invalid_config_rejected() {
        let ledger = MemoryLedger::unscaled();
        let cfg = SettlementConfig {
            max_history_pages: 0,
            ..SettlementConfig::default()
        };
        assert!(SettlementOrchestrator::new(&ledger, cfg).is_err());
    }

    #[test]
    fn pending_funds_defer_without_scanning() {
        let ledger = MemoryLedger::unscaled();
        let addr = Address::from("addr_p");
        ledger.receive(&addr, "alice", 50_000);
        ledger.receive_pending(&addr, 10);
        let mut entities = vec![Entity::dummy_claimable("addr_p", price(50_000))];

        let report = orchestrator(&ledger).run_pass(&mut entities);
        assert_eq!(
            report.outcome(entities[0].id()),
            Some(&EntityOutcome::Deferred {
                pending: RawAmount(10)
            })
        );
        assert!(entities[0].has_pending());
        assert!(entities[0].checkpoint().is_none());
        assert_eq!(ledger.history_calls(), 0);
        assert!(ledger.transfers().is_empty());
        assert!(report.mutated);
    }

    #[test]
    fn pending_flag_clears_once_settled() {
        let ledger = MemoryLedger::unscaled();
        let mut entity = Entity::dummy_claimable("addr_p", price(50_000));
        entity.set_has_pending(true);
        let mut entities = vec![entity];

        orchestrator(&ledger).run_pass(&mut entities);
        assert!(!entities[0].has_pending());
    }

    #[test]
    fn gate_failure_moves_nothing_but_keeps_checkpoint() {
        let ledger = MemoryLedger::unscaled();
        let addr = Address::from("addr_g");
        ledger.receive(&addr, "alice", 50_000);
        let c = ledger.receive(&addr, "carol", 20_000);
        ledger.credit_unexplained(&addr, 1);
        let mut entities = vec![Entity::dummy_claimable("addr_g", price(50_000))];

        let report = orchestrator(&ledger).run_pass(&mut entities);
        let Some(EntityOutcome::Settled(s)) = report.outcome(entities[0].id()) else {
            panic!("expected Settled, got {:?}", report.outcomes);
        };
        assert!(!s.gate.is_balanced());
        assert_eq!(s.held, 2);
        assert!(s.claimed_by.is_none());
        assert!(ledger.transfers().is_empty());
        assert_eq!(entities[0].checkpoint(), Some(&c));
        assert_eq!(entities[0].target_address(), Some(&addr));
        assert!(entities[0].owner_address().is_none());
    }

    #[test]
    fn closed_window_is_not_claimable() {
        let ledger = MemoryLedger::unscaled();
        let now = Utc::now();
        let mut entity = Entity::dummy_claimable("addr_w", price(5));
        entity.set_target_time(Some(now + chrono::TimeDelta::seconds(30)));
        let mut entities = vec![entity];

        let report = orchestrator(&ledger).run_pass_at(&mut entities, now);
        assert_eq!(
            report.outcome(entities[0].id()),
            Some(&EntityOutcome::NotClaimable)
        );
        assert_eq!(report.rendered, vec![entities[0].id()]);
        assert!(!report.mutated);
    }

    #[test]
    fn inactive_entities_are_untouched() {
        let ledger = MemoryLedger::unscaled();
        let mut entities = vec![Entity::new("off")];
        let report = orchestrator(&ledger).run_pass(&mut entities);
        assert_eq!(report.outcome(entities[0].id()), Some(&EntityOutcome::Skipped));
        assert!(report.rendered.is_empty());
        assert!(!report.mutated);
        assert!(entities[0].target_address().is_none());
    }

    #[test]
    fn payout_failure_records_error_and_keeps_checkpoint() {
        let ledger = MemoryLedger::unscaled();
        let addr = Address::from("addr_f");
        let a = ledger.receive(&addr, "bob", 50_000);
        ledger.fail_on(LedgerOp::Send, ErrorCategory::Protocol);
        let mut entities = vec![Entity::dummy_owned("addr_f", price(50_000), "alice", price(25_000))];

        let report = orchestrator(&ledger).run_pass(&mut entities);
        assert_eq!(report.failed(), 1);
        assert!(report.rendered.is_empty());
        let e = &entities[0];
        assert_eq!(e.checkpoint(), Some(&a));
        assert_eq!(e.error_category(), Some(ErrorCategory::Protocol));
        assert_eq!(e.owner_address(), Some(&Address::from("alice")));
        assert_eq!(e.target_address(), Some(&addr));
    }

    #[test]
    fn error_cleared_after_successful_pass() {
        let ledger = MemoryLedger::unscaled();
        let addr = Address::from("addr_e");
        ledger.break_address(&addr);
        let mut entities = vec![Entity::dummy_claimable("addr_e", price(5))];
        let orch = orchestrator(&ledger);

        orch.run_pass(&mut entities);
        assert_eq!(entities[0].error_category(), Some(ErrorCategory::Transport));

        ledger.clear_faults();
        let report = orch.run_pass(&mut entities);
        assert!(entities[0].error_message().is_none());
        assert_eq!(report.rendered.len(), 1);
    }

    #[test]
    fn refunds_only_when_no_winner() {
        let ledger = MemoryLedger::unscaled();
        let addr = Address::from("addr_r");
        ledger.receive(&addr, "alice", 49_999);
        ledger.receive(&addr, "bob", 10);
        let mut entities = vec![Entity::dummy_claimable("addr_r", price(50_000))];

        let report = orchestrator(&ledger).run_pass(&mut entities);
        let transfers = ledger.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].destination, Address::from("alice"));
        assert_eq!(transfers[0].amount, RawAmount(49_999));
        assert_eq!(transfers[1].destination, Address::from("bob"));
        assert_eq!(report.transfers_of(TransferKind::Refund), 2);
        assert_eq!(ledger.settled_of(&addr), RawAmount::ZERO);
        assert_eq!(entities[0].target_address(), Some(&addr), "no rotation without a winner");
        assert_eq!(entities[0].target_price(), Some(price(50_000)));
        assert!(entities[0].checkpoint().is_some_and(|c: &BlockHash| !c.as_str().is_empty()));
    }
}
