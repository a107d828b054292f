//! Conservation gate.
//!
//! Funds leave a deposit address only when every settled raw unit on it is
//! accounted for by this pass's resolution:
//! ```text
//! settled == winner + Σ(refunds)
//! ```
//!
//! History pages and the balance are separate reads, so the ledger may show
//! funds the scan never saw (a receive that landed between the two reads, a
//! row kind we do not model). Any difference in either direction holds all
//! payouts and refunds for the pass.

use std::fmt;

use hotslot_ledger::AccountBalance;
use hotslot_resolver::Resolution;
use hotslot_types::{RawAmount, Result, SignedRaw};
use serde::{Deserialize, Serialize};

/// The two sides of the gate for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCheck {
    /// Settled balance reported by the ledger.
    pub settled: RawAmount,
    /// Winner amount plus refund total from the resolution.
    pub explained: RawAmount,
}

impl GateCheck {
    #[must_use]
    pub fn new(settled: RawAmount, explained: RawAmount) -> Self {
        Self { settled, explained }
    }

    /// Build the check from a balance read and a resolution.
    pub fn evaluate(balance: &AccountBalance, resolution: &Resolution) -> Result<Self> {
        Ok(Self::new(balance.settled, resolution.explained_raw()?))
    }

    /// `settled - explained`.
    #[must_use]
    pub fn diff(&self) -> SignedRaw {
        self.settled.signed_diff(self.explained)
    }

    /// Whether funds may move.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.settled == self.explained
    }
}

impl fmt::Display for GateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "settled={} explained={} diff={}",
            self.settled,
            self.explained,
            self.diff()
        )
    }
}

#[cfg(test)]
mod tests {
    use hotslot_ledger::{EntryKind, HistoryEntry};
    use hotslot_resolver::Payment;
    use hotslot_types::{Address, BlockHash};
    use rust_decimal::Decimal;

    use super::*;

    fn payment(hash: &str, amount: u128) -> Payment {
        Payment {
            entry: HistoryEntry {
                hash: BlockHash::from(hash),
                kind: EntryKind::Receive,
                account: Address::from("payer"),
                amount: RawAmount(amount),
            },
            amount: Decimal::from(u64::try_from(amount).unwrap()),
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            winner: Some(payment("A", 50_000)),
            refunds: vec![payment("C", 20_000)],
            refund_total: Decimal::new(20_000, 0),
            checkpoint: Some(BlockHash::from("C")),
            examined: 2,
        }
    }

    fn balance(settled: u128) -> AccountBalance {
        AccountBalance {
            settled: RawAmount(settled),
            pending: RawAmount::ZERO,
        }
    }

    #[test]
    fn exact_balance_passes() {
        let gate = GateCheck::evaluate(&balance(70_000), &resolution()).unwrap();
        assert!(gate.is_balanced());
        assert!(gate.diff().is_zero());
    }

    #[test]
    fn one_unit_surplus_blocks() {
        let gate = GateCheck::evaluate(&balance(70_001), &resolution()).unwrap();
        assert!(!gate.is_balanced());
        assert_eq!(gate.diff(), SignedRaw::Surplus(RawAmount(1)));
        assert!(gate.to_string().contains("diff=1"));
    }

    #[test]
    fn deficit_blocks() {
        let gate = GateCheck::evaluate(&balance(69_999), &resolution()).unwrap();
        assert!(!gate.is_balanced());
        assert_eq!(gate.diff(), SignedRaw::Deficit(RawAmount(1)));
    }

    #[test]
    fn empty_resolution_on_empty_address_is_balanced() {
        let gate = GateCheck::evaluate(&balance(0), &Resolution::default()).unwrap();
        assert!(gate.is_balanced());
    }

    #[test]
    fn leftover_funds_without_new_rows_block() {
        let gate = GateCheck::evaluate(&balance(20_000), &Resolution::default()).unwrap();
        assert!(!gate.is_balanced());
    }
}
