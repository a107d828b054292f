//! # hotslot-ledger
//!
//! The boundary between the settlement engine and the external ledger.
//!
//! - [`LedgerGateway`]: the capability the resolver and orchestrator consume.
//!   Every call is a self-contained request/response; implementations hold
//!   no per-call session state, so one gateway value can be shared freely.
//! - [`RpcLedger`]: maps gateway calls onto the node's JSON-RPC actions over
//!   an injected [`RpcTransport`], classifying failures into transport,
//!   protocol and response-shape errors.
//! - `MemoryLedger` (feature `test-helpers`): an in-memory ledger with exact
//!   fixed-scale conversion and fault injection.

pub mod gateway;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod rpc;

pub use gateway::{AccountBalance, EntryKind, HistoryEntry, LedgerGateway};
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::{MemoryLedger, Transfer};
pub use rpc::{RpcLedger, RpcTransport, TransportFailure};
