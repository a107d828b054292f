//! # hotslot-settlement
//!
//! **Settlement passes** over claimable entities.
//!
//! ## Architecture
//!
//! For every active entity a pass:
//! 1. Initializes price and deposit address ([`lifecycle`])
//! 2. Skips entities whose claim window is still closed
//! 3. Defers entities whose address holds unsettled funds
//! 4. Resolves the new payments since the checkpoint (`hotslot-resolver`)
//!    and stores the advanced checkpoint immediately
//! 5. Checks that winner + refunds explain the settled balance exactly
//!    ([`gate`]); only then pays the previous owner, rotates the entity to
//!    its next round, and refunds everything else
//!
//! Failures are contained per entity: the error is recorded on the entity
//! and the pass moves on.
//!
//! The [`run_update`] driver wraps a pass with loading, saving (only when
//! the pass changed something) and report rendering.

pub mod gate;
pub mod lifecycle;
pub mod orchestrator;
pub mod outcome;
pub mod update;

pub use gate::GateCheck;
pub use orchestrator::SettlementOrchestrator;
pub use outcome::{EntityOutcome, PassReport, Settlement, TransferKind, TransferRecord};
pub use update::{EntityStore, ReportSink, run_update};
