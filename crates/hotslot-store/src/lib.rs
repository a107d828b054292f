//! # hotslot-store
//!
//! File-backed adapters for the settlement driver:
//!
//! - [`JsonFileStore`]: the versioned entity document, migrated at load
//!   ([`migrate`]) and sealed with a SHA-256 checksum
//! - [`JsonReportSink`]: the `index.json` the frontend reads

pub mod migrate;
pub mod report;
pub mod store;

pub use report::{EntityView, INDEX_FILE, IndexDocument, JsonReportSink};
pub use store::{JsonFileStore, StoreDocument, entities_checksum};
