//! Error types for the HotSlot settlement engine.
//!
//! All errors use the `HS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Ledger errors
//! - 2xx: Entity / amount errors
//! - 3xx: Storage errors
//! - 9xx: General / internal errors

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::EntityId;

/// The gateway operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerOp {
    CreateAddress,
    History,
    Balance,
    Send,
    Convert,
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateAddress => write!(f, "create_address"),
            Self::History => write!(f, "history"),
            Self::Balance => write!(f, "balance"),
            Self::Send => write!(f, "send"),
            Self::Convert => write!(f, "convert"),
        }
    }
}

/// Coarse classification used by callers to decide whether a failure is
/// worth retrying as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request never got a well-formed answer (connection, timeout).
    Transport,
    /// The ledger answered with an explicit rejection.
    Protocol,
    /// The ledger answered, but without a field we require.
    ResponseShape,
    /// Entity or amount state the engine refuses to act on.
    Domain,
    Storage,
    Configuration,
    Internal,
}

impl ErrorCategory {
    /// Only transport failures can succeed on a plain retry.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Protocol => write!(f, "PROTOCOL"),
            Self::ResponseShape => write!(f, "RESPONSE_SHAPE"),
            Self::Domain => write!(f, "DOMAIN"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all HotSlot operations.
#[derive(Debug, Error)]
pub enum HotslotError {
    // =================================================================
    // Ledger Errors (1xx)
    // =================================================================
    /// The request to the ledger node failed before a response arrived.
    #[error("HS_ERR_100: Ledger transport failure during {op}: {reason}")]
    LedgerTransport { op: LedgerOp, reason: String },

    /// The ledger returned an explicit `error` field.
    #[error("HS_ERR_101: Ledger rejected {op}: {reason}")]
    LedgerProtocol { op: LedgerOp, reason: String },

    /// The ledger response lacks a field the operation requires, or the
    /// field (or the whole body) has the wrong JSON type.
    #[error("HS_ERR_102: Ledger response to {op} has no valid \"{field}\"")]
    LedgerResponseShape { op: LedgerOp, field: String },

    // =================================================================
    // Entity / Amount Errors (2xx)
    // =================================================================
    /// An amount could not be parsed or converted exactly.
    #[error("HS_ERR_200: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Price escalation overflowed the decimal range.
    #[error("HS_ERR_201: Price overflow doubling {price}")]
    PriceOverflow { price: rust_decimal::Decimal },

    /// The entity is missing state the requested step depends on.
    #[error("HS_ERR_202: Invalid entity {id}: {reason}")]
    InvalidEntity { id: EntityId, reason: String },

    // =================================================================
    // Storage Errors (3xx)
    // =================================================================
    /// Reading or writing the entity store failed.
    #[error("HS_ERR_300: Storage error: {0}")]
    Storage(String),

    /// A stored document could not be migrated to the current version.
    #[error("HS_ERR_301: Migration from version {from} failed: {reason}")]
    Migration { from: u32, reason: String },

    /// The stored entities do not hash to the recorded checksum.
    #[error("HS_ERR_302: Store checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("HS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("HS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid values, unreadable config).
    #[error("HS_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl HotslotError {
    /// Category used for operator annotations and retry decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LedgerTransport { .. } => ErrorCategory::Transport,
            Self::LedgerProtocol { .. } => ErrorCategory::Protocol,
            Self::LedgerResponseShape { .. } => ErrorCategory::ResponseShape,
            Self::InvalidAmount { .. } | Self::PriceOverflow { .. } | Self::InvalidEntity { .. } => {
                ErrorCategory::Domain
            }
            Self::Storage(_)
            | Self::Migration { .. }
            | Self::ChecksumMismatch { .. }
            | Self::Serialization(_) => ErrorCategory::Storage,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Shorthand for a missing or mistyped response field.
    pub fn missing_field(op: LedgerOp, field: impl Into<String>) -> Self {
        Self::LedgerResponseShape {
            op,
            field: field.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, HotslotError>;

impl From<std::io::Error> for HotslotError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for HotslotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
