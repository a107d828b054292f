//! Ledger amounts.
//!
//! Raw amounts are integers in the ledger's smallest unit and are the only
//! representation that ever moves funds. Display amounts (what a price is
//! quoted in) are [`Decimal`]s produced by the ledger's exact conversion.
//! Neither side touches binary floating point.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{HotslotError, Result};

/// An amount in raw ledger units.
///
/// Serialized as a decimal string because raw amounts exceed the integer
/// range JSON readers reliably support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RawAmount(pub u128);

impl RawAmount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    /// Returns [`HotslotError::InvalidAmount`] on overflow.
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| HotslotError::InvalidAmount {
                reason: format!("{self} + {other} overflows"),
            })
    }

    /// Checked sum over any number of amounts.
    pub fn checked_sum<I>(amounts: I) -> Result<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// `self - other` as a signed difference, so callers can report both
    /// surplus and deficit.
    #[must_use]
    pub fn signed_diff(self, other: Self) -> SignedRaw {
        if self.0 >= other.0 {
            SignedRaw::Surplus(Self(self.0 - other.0))
        } else {
            SignedRaw::Deficit(Self(other.0 - self.0))
        }
    }
}

/// Result of subtracting two raw amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedRaw {
    Surplus(RawAmount),
    Deficit(RawAmount),
}

impl SignedRaw {
    #[must_use]
    pub fn is_zero(self) -> bool {
        matches!(self, Self::Surplus(r) if r.is_zero())
    }
}

impl fmt::Display for SignedRaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surplus(r) => write!(f, "{r}"),
            Self::Deficit(r) => write!(f, "-{r}"),
        }
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RawAmount {
    type Err = HotslotError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|e| HotslotError::InvalidAmount {
                reason: format!("raw amount {s:?}: {e}"),
            })
    }
}

impl From<RawAmount> for String {
    fn from(amount: RawAmount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for RawAmount {
    type Error = HotslotError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<u128> for RawAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

/// Parse a display amount exactly (no float detour).
///
/// # Errors
/// Returns [`HotslotError::InvalidAmount`] if `s` is not a decimal number.
pub fn parse_display(s: &str) -> Result<Decimal> {
    let trimmed = s.trim();
    Decimal::from_str_exact(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| HotslotError::InvalidAmount {
            reason: format!("display amount {s:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let raw: RawAmount = "50000000000000000000000000000".parse().unwrap();
        assert_eq!(raw.to_string(), "50000000000000000000000000000");
        assert!("12.5".parse::<RawAmount>().is_err());
        assert!("-1".parse::<RawAmount>().is_err());
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let total = RawAmount::checked_sum([RawAmount(1), RawAmount(2), RawAmount(3)]).unwrap();
        assert_eq!(total, RawAmount(6));

        let err = RawAmount::checked_sum([RawAmount(u128::MAX), RawAmount(1)]).unwrap_err();
        assert!(matches!(err, HotslotError::InvalidAmount { .. }));
    }

    #[test]
    fn signed_diff_both_directions() {
        assert!(RawAmount(70_000).signed_diff(RawAmount(70_000)).is_zero());
        assert_eq!(
            RawAmount(70_001).signed_diff(RawAmount(70_000)),
            SignedRaw::Surplus(RawAmount(1))
        );
        let deficit = RawAmount(5).signed_diff(RawAmount(8));
        assert_eq!(deficit, SignedRaw::Deficit(RawAmount(3)));
        assert_eq!(deficit.to_string(), "-3");
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&RawAmount(u128::MAX)).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let back: RawAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RawAmount(u128::MAX));
    }

    #[test]
    fn parse_display_is_exact() {
        assert_eq!(parse_display("0.01").unwrap(), Decimal::new(1, 2));
        assert_eq!(parse_display("50000").unwrap(), Decimal::new(50_000, 0));
        assert_eq!(parse_display("1e3").unwrap(), Decimal::new(1000, 0));
        assert!(parse_display("fifty").is_err());
    }
}
