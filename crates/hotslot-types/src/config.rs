//! Configuration types for settlement passes and the ledger RPC adapter.

use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{HotslotError, Result, constants};

/// Knobs for one settlement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Asking price (display units) of an entity that was never claimed.
    pub starting_price: Decimal,
    /// Claim window opened after activation and after every claim.
    pub claim_ttl_secs: u64,
    /// History rows requested per ledger page.
    pub history_page_size: usize,
    /// Ceiling on pages read per address in one pass.
    pub max_history_pages: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            starting_price: Decimal::from(constants::DEFAULT_STARTING_PRICE),
            claim_ttl_secs: constants::DEFAULT_CLAIM_TTL_SECS,
            history_page_size: constants::DEFAULT_HISTORY_PAGE_SIZE,
            max_history_pages: constants::MAX_HISTORY_PAGES,
        }
    }
}

impl SettlementConfig {
    /// Parse a JSON config document; absent keys take their defaults.
    ///
    /// # Errors
    /// Returns [`HotslotError::Configuration`] if the document is malformed
    /// or fails [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| HotslotError::Configuration(format!("settlement config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.starting_price <= Decimal::ZERO {
            return Err(HotslotError::Configuration(format!(
                "starting_price must be positive, got {}",
                self.starting_price
            )));
        }
        if self.claim_ttl_secs > constants::MAX_CLAIM_TTL_SECS {
            return Err(HotslotError::Configuration(format!(
                "claim_ttl_secs {} exceeds {}",
                self.claim_ttl_secs,
                constants::MAX_CLAIM_TTL_SECS
            )));
        }
        if self.history_page_size == 0 {
            return Err(HotslotError::Configuration(
                "history_page_size must be > 0".into(),
            ));
        }
        if self.max_history_pages == 0 {
            return Err(HotslotError::Configuration(
                "max_history_pages must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// The claim window as a duration.
    #[must_use]
    pub fn claim_ttl(&self) -> TimeDelta {
        let secs = i64::try_from(self.claim_ttl_secs.min(constants::MAX_CLAIM_TTL_SECS))
            .unwrap_or(i64::MAX);
        TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX)
    }
}

/// Settings for the JSON-RPC ledger adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Wallet that owns every deposit address.
    pub wallet_id: String,
}

impl RpcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.wallet_id.trim().is_empty() {
            return Err(HotslotError::Configuration("wallet_id is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SettlementConfig::default();
        assert_eq!(cfg.starting_price, Decimal::new(50_000, 0));
        assert_eq!(cfg.claim_ttl_secs, 120);
        assert_eq!(cfg.history_page_size, 100);
        assert_eq!(cfg.max_history_pages, 10_000);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.claim_ttl(), TimeDelta::seconds(120));
    }

    #[test]
    fn from_json_fills_defaults() {
        let cfg = SettlementConfig::from_json(r#"{"starting_price": "0.05", "claim_ttl_secs": 60}"#)
            .unwrap();
        assert_eq!(cfg.starting_price, Decimal::new(5, 2));
        assert_eq!(cfg.claim_ttl_secs, 60);
        assert_eq!(cfg.history_page_size, 100);
    }

    #[test]
    fn rejects_bad_values() {
        let err = SettlementConfig::from_json(r#"{"starting_price": "0"}"#).unwrap_err();
        assert!(matches!(err, HotslotError::Configuration(_)));

        let cfg = SettlementConfig {
            history_page_size: 0,
            ..SettlementConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SettlementConfig {
            claim_ttl_secs: u64::MAX,
            ..SettlementConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rpc_config_requires_wallet() {
        assert!(RpcConfig { wallet_id: " ".into() }.validate().is_err());
        assert!(RpcConfig { wallet_id: "W1".into() }.validate().is_ok());
    }
}
