//! Gateway-backed resolver.

use hotslot_ledger::LedgerGateway;
use hotslot_types::{Address, BlockHash, Result};
use rust_decimal::Decimal;

use crate::evaluate::{Resolution, evaluate};
use crate::scan::{ScanLimits, collect_receives};

/// What to resolve: one deposit address at one asking price.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub address: &'a Address,
    pub checkpoint: Option<&'a BlockHash>,
    pub target_price: Decimal,
    pub previous_owner: Option<&'a Address>,
}

/// Reads an address's history through a [`LedgerGateway`] and classifies
/// the payments received since the checkpoint.
pub struct OwnershipResolver<G> {
    gateway: G,
    limits: ScanLimits,
}

impl<G: LedgerGateway> OwnershipResolver<G> {
    #[must_use]
    pub fn new(gateway: G, limits: ScanLimits) -> Self {
        Self { gateway, limits }
    }

    /// Scan and classify. Moves no funds.
    pub fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution> {
        let receives = collect_receives(&self.gateway, request.address, self.limits)?;
        let resolution = evaluate(
            &receives,
            request.checkpoint,
            request.target_price,
            request.previous_owner,
            |raw| self.gateway.raw_to_display(raw),
        )?;

        tracing::info!(
            address = %request.address,
            examined = resolution.examined,
            winner = ?resolution.winner.as_ref().map(|w| w.entry.hash.short()),
            refunds = resolution.refunds.len(),
            refund_total = %resolution.refund_total,
            "Ownership resolved"
        );
        Ok(resolution)
    }

    #[must_use]
    pub fn limits(&self) -> ScanLimits {
        self.limits
    }
}
