//! Claim lifecycle transitions.
//!
//! ```text
//! UNINITIALIZED ──ensure_initialized──▶ AWAITING_CLAIM ◀──▶ PENDING
//!                                        │          ▲
//!                                 apply_claim       │ now >= target_time
//!                                        ▼          │
//!                          CLAIMED (new address, doubled price)
//! ```
//!
//! Queries (`can_be_claimed`, `phase`) live on [`Entity`]; this module owns
//! the transitions that need configuration or the ledger.

use chrono::{DateTime, Utc};
use hotslot_ledger::LedgerGateway;
use hotslot_types::{
    Address, Entity, HotslotError, Result, SettlementConfig, constants,
};
use rust_decimal::Decimal;

/// When a claim window opened at `now` closes.
pub fn window_end(now: DateTime<Utc>, config: &SettlementConfig) -> Result<DateTime<Utc>> {
    now.checked_add_signed(config.claim_ttl())
        .ok_or_else(|| HotslotError::Internal(format!("claim window past {now} overflows")))
}

/// Give an active entity its starting price and first deposit address.
///
/// Returns `true` if anything was assigned.
pub fn ensure_initialized<G>(
    entity: &mut Entity,
    gateway: &G,
    config: &SettlementConfig,
    now: DateTime<Utc>,
) -> Result<bool>
where
    G: LedgerGateway + ?Sized,
{
    let mut changed = false;

    if entity.target_price().is_none() {
        entity.set_target_price(config.starting_price);
        changed = true;
    }

    if entity.target_address().is_none() {
        let address = gateway.create_address()?;
        tracing::info!(entity = %entity.id(), %address, "Deposit address assigned");
        entity.rotate_target_address(address, window_end(now, config)?);
        changed = true;
    }

    Ok(changed)
}

/// Asking price after a claim at `paid`.
pub fn next_price(paid: Decimal) -> Result<Decimal> {
    paid.checked_mul(Decimal::from(constants::PRICE_MULTIPLIER))
        .ok_or(HotslotError::PriceOverflow { price: paid })
}

/// Move the entity to its next round: `winner` owns it at `paid`, the price
/// doubles, and payments are now taken on `new_address` once the next
/// window opens.
pub fn apply_claim(
    entity: &mut Entity,
    winner: Address,
    paid: Decimal,
    new_address: Address,
    config: &SettlementConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    let next = next_price(paid)?;
    let opens = window_end(now, config)?;

    tracing::info!(
        entity = %entity.id(),
        owner = %winner,
        %paid,
        next_price = %next,
        %new_address,
        "Entity claimed"
    );
    entity.record_claim(winner, paid, next, now);
    entity.rotate_target_address(new_address, opens);
    Ok(())
}
