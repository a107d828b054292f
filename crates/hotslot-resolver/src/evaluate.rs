//! Pure classification of receive rows into one winner and refunds.

use hotslot_ledger::HistoryEntry;
use hotslot_types::{Address, BlockHash, HotslotError, RawAmount, Result};
use rust_decimal::Decimal;

/// A receive row together with its display-unit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub entry: HistoryEntry,
    pub amount: Decimal,
}

impl Payment {
    #[must_use]
    pub fn sender(&self) -> &Address {
        &self.entry.account
    }

    #[must_use]
    pub fn raw(&self) -> RawAmount {
        self.entry.amount
    }
}

/// Outcome of one resolver call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Earliest exact-price payment from someone other than the previous owner.
    pub winner: Option<Payment>,
    /// Every other newly examined payment, oldest first.
    pub refunds: Vec<Payment>,
    /// Sum of `refunds` in display units.
    pub refund_total: Decimal,
    /// Hash of the newest examined row, or the incoming checkpoint if
    /// nothing new was examined.
    pub checkpoint: Option<BlockHash>,
    /// Rows examined in this call.
    pub examined: usize,
}

impl Resolution {
    /// Display amount of the winning payment; zero without a winner.
    #[must_use]
    pub fn winner_amount(&self) -> Decimal {
        self.winner.as_ref().map_or(Decimal::ZERO, |w| w.amount)
    }

    #[must_use]
    pub fn winner_raw(&self) -> RawAmount {
        self.winner.as_ref().map_or(RawAmount::ZERO, Payment::raw)
    }

    pub fn refund_raw_total(&self) -> Result<RawAmount> {
        RawAmount::checked_sum(self.refunds.iter().map(Payment::raw))
    }

    /// Raw units this resolution accounts for: winner plus refunds.
    pub fn explained_raw(&self) -> Result<RawAmount> {
        self.winner_raw().checked_add(self.refund_raw_total()?)
    }

    /// Nothing new was examined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examined == 0
    }
}

/// Classify `receives` (oldest first) that come after `checkpoint`.
///
/// `convert` maps a raw amount to display units; comparison against
/// `target_price` is exact decimal equality.
///
/// If `checkpoint` is set but absent from `receives`, nothing is examined
/// and the checkpoint is returned unchanged.
pub fn evaluate<F>(
    receives: &[HistoryEntry],
    checkpoint: Option<&BlockHash>,
    target_price: Decimal,
    previous_owner: Option<&Address>,
    mut convert: F,
) -> Result<Resolution>
where
    F: FnMut(RawAmount) -> Result<Decimal>,
{
    let start = match checkpoint {
        None => 0,
        Some(cp) => match receives.iter().position(|e| &e.hash == cp) {
            Some(idx) => idx + 1,
            None => {
                tracing::warn!(
                    checkpoint = %cp,
                    receives = receives.len(),
                    "Checkpoint not found in history; nothing evaluated"
                );
                receives.len()
            }
        },
    };

    let mut resolution = Resolution {
        checkpoint: checkpoint.cloned(),
        ..Resolution::default()
    };

    for entry in &receives[start..] {
        resolution.checkpoint = Some(entry.hash.clone());
        resolution.examined += 1;

        let amount = convert(entry.amount)?;
        let from_previous_owner = previous_owner == Some(&entry.account);

        if resolution.winner.is_none() && amount == target_price && !from_previous_owner {
            tracing::debug!(hash = %entry.hash, sender = %entry.account, %amount, "Exact payment wins");
            resolution.winner = Some(Payment {
                entry: entry.clone(),
                amount,
            });
        } else {
            tracing::debug!(
                hash = %entry.hash,
                sender = %entry.account,
                %amount,
                self_payment = from_previous_owner,
                "Payment marked for refund"
            );
            resolution.refund_total =
                resolution
                    .refund_total
                    .checked_add(amount)
                    .ok_or_else(|| HotslotError::InvalidAmount {
                        reason: format!("refund total overflows adding {amount}"),
                    })?;
            resolution.refunds.push(Payment {
                entry: entry.clone(),
                amount,
            });
        }
    }

    Ok(resolution)
}
