//! What a settlement pass did.
//!
//! A [`PassReport`] replaces any implicit "something changed" flag: the
//! caller decides whether to persist from [`PassReport::mutated`] and what
//! to render from [`PassReport::rendered`].

use std::fmt;

use hotslot_types::{Address, BlockHash, EntityId, ErrorCategory, RawAmount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::gate::GateCheck;

/// Why funds left a deposit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// Sale proceeds to the dethroned owner.
    Payout,
    /// A payment that did not win, returned to its sender.
    Refund,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payout => write!(f, "PAYOUT"),
            Self::Refund => write!(f, "REFUND"),
        }
    }
}

/// One funds movement issued during the pass. Recorded as soon as the
/// ledger accepts it, so the journal stays complete even if a later step
/// of the same entity fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub entity: EntityId,
    pub kind: TransferKind,
    pub source: Address,
    pub destination: Address,
    pub amount: RawAmount,
    pub block: BlockHash,
}

/// Result of resolving and (maybe) settling one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Receive rows examined since the previous checkpoint.
    pub examined: usize,
    /// New owner and the price they paid, if the claim went through.
    pub claimed_by: Option<(Address, Decimal)>,
    /// Refunds issued this pass.
    pub refunds_sent: usize,
    /// Refunds (and a winner, if any) held back by the gate.
    pub held: usize,
    pub gate: GateCheck,
}

/// Per-entity outcome of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityOutcome {
    /// Inactive; untouched and not rendered.
    Skipped,
    /// Claim window still closed.
    NotClaimable,
    /// Unsettled funds on the deposit address.
    Deferred { pending: RawAmount },
    Settled(Settlement),
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

impl EntityOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Summary of one pass over all entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub outcomes: Vec<(EntityId, EntityOutcome)>,
    /// Entities processed without error, in pass order.
    pub rendered: Vec<EntityId>,
    /// Every transfer issued, in order.
    pub transfers: Vec<TransferRecord>,
    /// Whether any entity changed and the store should be saved.
    pub mutated: bool,
}

impl PassReport {
    #[must_use]
    pub fn outcome(&self, id: EntityId) -> Option<&EntityOutcome> {
        self.outcomes
            .iter()
            .find_map(|(eid, outcome)| (*eid == id).then_some(outcome))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }

    #[must_use]
    pub fn claims(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, EntityOutcome::Settled(s) if s.claimed_by.is_some()))
            .count()
    }

    #[must_use]
    pub fn transfers_of(&self, kind: TransferKind) -> usize {
        self.transfers.iter().filter(|t| t.kind == kind).count()
    }
}
