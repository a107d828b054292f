//! System-wide constants for the HotSlot settlement engine.

/// Number of history rows requested per ledger page.
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 100;

/// Hard ceiling on the number of history pages read for one address.
pub const MAX_HISTORY_PAGES: usize = 10_000;

/// Default price (display units) of an entity that was never claimed.
pub const DEFAULT_STARTING_PRICE: u64 = 50_000;

/// Default claim window in seconds after activation or a successful claim.
pub const DEFAULT_CLAIM_TTL_SECS: u64 = 120;

/// Upper bound accepted for the claim window (ten years).
pub const MAX_CLAIM_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Factor applied to the paid price to get the next asking price.
pub const PRICE_MULTIPLIER: u64 = 2;

/// Current version of the persisted entity store document.
pub const STORE_FORMAT_VERSION: u32 = 2;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const APP_NAME: &str = "HotSlot";
