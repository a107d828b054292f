//! # hotslot-resolver
//!
//! **Ownership resolution** for one deposit address.
//!
//! The resolver reads the address's receive history, resumes right after
//! the stored checkpoint, and classifies every new payment exactly once:
//!
//! - the earliest payment of exactly the target price, from anyone but the
//!   previous owner, wins;
//! - every other new payment is a refund.
//!
//! It never moves funds. Reading ([`collect_receives`]) is separated from
//! classifying ([`evaluate`]) so the rules can be exercised without a ledger.

pub mod evaluate;
pub mod resolver;
pub mod scan;

pub use evaluate::{Payment, Resolution, evaluate};
pub use resolver::{OwnershipResolver, ResolveRequest};
pub use scan::{ScanLimits, collect_receives};
