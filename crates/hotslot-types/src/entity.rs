//! # Entity: a claimable slot
//!
//! An entity is sold by exact payment: whoever sends precisely
//! `target_price` to `target_address` becomes the owner, the price doubles,
//! and a fresh deposit address is issued for the next round.
//!
//! ## Claim lifecycle
//!
//! ```text
//!   ┌───────────────┐ price+address ┌────────────────┐ unsettled ┌─────────┐
//!   │ UNINITIALIZED ├──────────────▶│ AWAITING_CLAIM │──────────▶│ PENDING │
//!   └───────────────┘               │                │◀──────────┤         │
//!                                   └──┬──────────▲──┘  settled  └─────────┘
//!                        winner settled│          │window opens
//!                                      ▼          │
//!                                   ┌─────────────┴──┐
//!                                   │    CLAIMED     │
//!                                   └────────────────┘
//! ```
//!
//! A slot that has never been claimed stays `AWAITING_CLAIM` while its
//! first window is still closed; only an owner makes it `CLAIMED`.
//!
//! Every setter that changes a value bumps `updated_at`; setting a field to
//! the value it already holds is not a mutation.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, BlockHash, EntityId, ErrorCategory, HotslotError};

/// Where an entity stands in its claim lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimPhase {
    /// Deactivated externally; settlement skips it.
    Inactive,
    /// Active, but price or deposit address not assigned yet.
    Uninitialized,
    /// Owned, and the window opened by the last claim has not elapsed yet.
    Claimed,
    /// The deposit address holds unsettled funds.
    Pending,
    /// Open for claims, or never owned and waiting for its first window.
    AwaitingClaim,
}

impl fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Uninitialized => write!(f, "UNINITIALIZED"),
            Self::Claimed => write!(f, "CLAIMED"),
            Self::Pending => write!(f, "PENDING"),
            Self::AwaitingClaim => write!(f, "AWAITING_CLAIM"),
        }
    }
}

/// Every field of an [`Entity`], public, for persistence adapters that
/// build entities from older document formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityParts {
    pub id: EntityId,
    pub name: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub owner_address: Option<Address>,
    pub owned_since: Option<DateTime<Utc>>,
    pub current_price: Decimal,
    pub target_price: Option<Decimal>,
    pub target_address: Option<Address>,
    pub target_time: Option<DateTime<Utc>>,
    pub has_pending: bool,
    pub checkpoint: Option<BlockHash>,
    pub error_message: Option<String>,
    pub error_category: Option<ErrorCategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A claimable slot and its settlement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityParts", into = "EntityParts")]
pub struct Entity {
    parts: EntityParts,
}

impl From<EntityParts> for Entity {
    fn from(parts: EntityParts) -> Self {
        Self { parts }
    }
}

impl From<Entity> for EntityParts {
    fn from(entity: Entity) -> Self {
        entity.parts
    }
}

impl Entity {
    /// A new, inactive entity with nothing assigned.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: EntityParts {
                id: EntityId::new(),
                name: name.into(),
                image: None,
                is_active: false,
                owner_address: None,
                owned_since: None,
                current_price: Decimal::ZERO,
                target_price: None,
                target_address: None,
                target_time: None,
                has_pending: false,
                checkpoint: None,
                error_message: None,
                error_category: None,
                created_at: Utc::now(),
                updated_at: None,
            },
        }
    }

    /// Read-only view of every field.
    #[must_use]
    pub fn parts(&self) -> &EntityParts {
        &self.parts
    }

    // -----------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.parts.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.parts.name
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.parts.image.as_deref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.parts.is_active
    }

    #[must_use]
    pub fn owner_address(&self) -> Option<&Address> {
        self.parts.owner_address.as_ref()
    }

    #[must_use]
    pub fn owned_since(&self) -> Option<DateTime<Utc>> {
        self.parts.owned_since
    }

    /// Price the current owner paid; zero before the first claim.
    #[must_use]
    pub fn current_price(&self) -> Decimal {
        self.parts.current_price
    }

    #[must_use]
    pub fn target_price(&self) -> Option<Decimal> {
        self.parts.target_price
    }

    #[must_use]
    pub fn target_address(&self) -> Option<&Address> {
        self.parts.target_address.as_ref()
    }

    #[must_use]
    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        self.parts.target_time
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.parts.has_pending
    }

    /// Hash of the last receive already evaluated for `target_address`.
    #[must_use]
    pub fn checkpoint(&self) -> Option<&BlockHash> {
        self.parts.checkpoint.as_ref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.parts.error_message.as_deref()
    }

    #[must_use]
    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.parts.error_category
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.parts.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.parts.updated_at
    }

    // -----------------------------------------------------------------
    // Lifecycle queries
    // -----------------------------------------------------------------

    /// Whether a settlement pass should try to resolve a new owner now.
    #[must_use]
    pub fn can_be_claimed(&self, now: DateTime<Utc>) -> bool {
        self.parts.is_active
            && self.parts.target_address.is_some()
            && self.parts.target_price.is_some()
            && self.parts.target_time.is_none_or(|t| now >= t)
    }

    /// The lifecycle phase at `now`.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> ClaimPhase {
        if !self.parts.is_active {
            ClaimPhase::Inactive
        } else if self.parts.target_address.is_none() || self.parts.target_price.is_none() {
            ClaimPhase::Uninitialized
        } else if !self.can_be_claimed(now) {
            if self.parts.owner_address.is_some() {
                ClaimPhase::Claimed
            } else {
                ClaimPhase::AwaitingClaim
            }
        } else if self.parts.has_pending {
            ClaimPhase::Pending
        } else {
            ClaimPhase::AwaitingClaim
        }
    }

    // -----------------------------------------------------------------
    // Setters
    // -----------------------------------------------------------------

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.parts.name != name {
            self.parts.name = name;
            self.touch();
        }
    }

    pub fn set_image(&mut self, image: Option<String>) {
        if self.parts.image != image {
            self.parts.image = image;
            self.touch();
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if self.parts.is_active != active {
            self.parts.is_active = active;
            self.touch();
        }
    }

    pub fn set_target_price(&mut self, price: Decimal) {
        if self.parts.target_price != Some(price) {
            self.parts.target_price = Some(price);
            self.touch();
        }
    }

    pub fn set_target_time(&mut self, time: Option<DateTime<Utc>>) {
        if self.parts.target_time != time {
            self.parts.target_time = time;
            self.touch();
        }
    }

    pub fn set_has_pending(&mut self, pending: bool) {
        if self.parts.has_pending != pending {
            self.parts.has_pending = pending;
            self.touch();
        }
    }

    /// Replace the deposit address. The checkpoint belongs to the old
    /// address and is dropped with it.
    pub fn rotate_target_address(&mut self, address: Address, window_opens: DateTime<Utc>) {
        self.parts.target_address = Some(address);
        self.parts.checkpoint = None;
        self.parts.target_time = Some(window_opens);
        self.touch();
    }

    /// Record the resolver's checkpoint. `None` means nothing new was
    /// examined and never clears an existing checkpoint.
    pub fn advance_checkpoint(&mut self, checkpoint: Option<BlockHash>) {
        if let Some(hash) = checkpoint {
            if self.parts.checkpoint.as_ref() != Some(&hash) {
                self.parts.checkpoint = Some(hash);
                self.touch();
            }
        }
    }

    /// Hand the entity to `owner`, who paid `paid`; the next asking price
    /// is `next_price`.
    pub fn record_claim(
        &mut self,
        owner: Address,
        paid: Decimal,
        next_price: Decimal,
        now: DateTime<Utc>,
    ) {
        self.parts.owner_address = Some(owner);
        self.parts.owned_since = Some(now);
        self.parts.current_price = paid;
        self.parts.target_price = Some(next_price);
        self.touch();
    }

    pub fn set_error(&mut self, err: &HotslotError) {
        let message = err.to_string();
        let category = err.category();
        if self.parts.error_message.as_deref() != Some(message.as_str())
            || self.parts.error_category != Some(category)
        {
            self.parts.error_message = Some(message);
            self.parts.error_category = Some(category);
            self.touch();
        }
    }

    pub fn clear_error(&mut self) {
        if self.parts.error_message.is_some() || self.parts.error_category.is_some() {
            self.parts.error_message = None;
            self.parts.error_category = None;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.parts.updated_at = Some(Utc::now());
    }
}

/// Ready-made entities for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Entity {
    /// An active entity listening on `address` for exactly `price`, with
    /// its claim window already open.
    pub fn dummy_claimable(address: &str, price: Decimal) -> Self {
        let mut entity = Self::new("dummy");
        entity.parts.is_active = true;
        entity.parts.target_address = Some(Address::from(address));
        entity.parts.target_price = Some(price);
        entity
    }

    /// Same as [`Self::dummy_claimable`] with an existing owner.
    pub fn dummy_owned(address: &str, price: Decimal, owner: &str, paid: Decimal) -> Self {
        let mut entity = Self::dummy_claimable(address, price);
        entity.parts.owner_address = Some(Address::from(owner));
        entity.parts.owned_since = Some(Utc::now());
        entity.parts.current_price = paid;
        entity
    }
}
