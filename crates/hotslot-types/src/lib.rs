//! # hotslot-types
//!
//! Shared types, errors, and configuration for the **HotSlot** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EntityId`], [`Address`], [`BlockHash`]
//! - **Amounts**: [`RawAmount`] (integer ledger units); display amounts are
//!   [`rust_decimal::Decimal`]
//! - **Entity model**: [`Entity`], [`ClaimPhase`]
//! - **Configuration**: [`SettlementConfig`], [`RpcConfig`]
//! - **Errors**: [`HotslotError`] with `HS_ERR_` prefix codes, [`ErrorCategory`]
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod ids;

pub use amount::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use ids::*;

// Constants are accessed via `hotslot_types::constants::FOO`
// (not re-exported to avoid name collisions).
