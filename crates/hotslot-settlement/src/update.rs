//! One full update: load, settle, save, render.

use hotslot_ledger::LedgerGateway;
use hotslot_types::{Entity, Result};

use crate::orchestrator::SettlementOrchestrator;
use crate::outcome::PassReport;

/// Durable storage for the entity set.
pub trait EntityStore {
    fn load(&mut self) -> Result<Vec<Entity>>;
    fn save(&mut self, entities: &[Entity]) -> Result<()>;
}

/// Presentation of entities that settled cleanly.
pub trait ReportSink {
    fn render(&mut self, entities: &[Entity]) -> Result<()>;
}

/// Load every entity, run one pass, save if anything changed, then render
/// the entities the pass processed without error.
///
/// Per-entity failures live in the returned report; only store and sink
/// errors fail the update.
pub fn run_update<G, S, R>(
    store: &mut S,
    orchestrator: &SettlementOrchestrator<G>,
    sink: &mut R,
) -> Result<PassReport>
where
    G: LedgerGateway,
    S: EntityStore + ?Sized,
    R: ReportSink + ?Sized,
{
    let mut entities = store.load()?;
    let report = orchestrator.run_pass(&mut entities);

    if report.mutated {
        store.save(&entities)?;
    } else {
        tracing::debug!("No entity changed; store left untouched");
    }

    let rendered: Vec<Entity> = entities
        .into_iter()
        .filter(|e| report.rendered.contains(&e.id()))
        .collect();
    sink.render(&rendered)?;

    Ok(report)
}
