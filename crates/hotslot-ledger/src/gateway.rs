//! The ledger capability consumed by the settlement engine.

use std::fmt;

use hotslot_types::{Address, BlockHash, RawAmount, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a history row. Only [`EntryKind::Receive`] rows are payments
/// into the scanned address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Receive,
    Send,
    Other(String),
}

impl From<&str> for EntryKind {
    fn from(s: &str) -> Self {
        match s {
            "receive" => Self::Receive,
            "send" => Self::Send,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EntryKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => f.write_str("receive"),
            Self::Send => f.write_str("send"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// One row of an address's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub hash: BlockHash,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Counterparty: the sender for receives, the recipient for sends.
    pub account: Address,
    pub amount: RawAmount,
}

impl HistoryEntry {
    #[must_use]
    pub fn is_receive(&self) -> bool {
        self.kind == EntryKind::Receive
    }
}

/// Settled and unsettled funds on an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountBalance {
    pub settled: RawAmount,
    pub pending: RawAmount,
}

impl AccountBalance {
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_zero()
    }
}

/// Everything the settlement engine needs from the ledger.
///
/// All calls are blocking and carry no timeout; wrap the gateway if a pass
/// must not stall on a slow node.
pub trait LedgerGateway {
    /// Create a fresh deposit address in the controlling wallet.
    fn create_address(&self) -> Result<Address>;

    /// One page of history, newest first, skipping `offset` rows.
    /// An empty page means the history is exhausted.
    fn history(&self, address: &Address, offset: usize, count: usize) -> Result<Vec<HistoryEntry>>;

    fn balance(&self, address: &Address) -> Result<AccountBalance>;

    /// Transfer `amount` raw units; returns the hash of the send block.
    fn send(&self, source: &Address, destination: &Address, amount: RawAmount)
    -> Result<BlockHash>;

    /// Exact raw → display conversion.
    fn raw_to_display(&self, amount: RawAmount) -> Result<Decimal>;

    /// Exact display → raw conversion.
    fn display_to_raw(&self, amount: Decimal) -> Result<RawAmount>;
}

impl<G: LedgerGateway + ?Sized> LedgerGateway for &G {
    fn create_address(&self) -> Result<Address> {
        (**self).create_address()
    }

    fn history(&self, address: &Address, offset: usize, count: usize) -> Result<Vec<HistoryEntry>> {
        (**self).history(address, offset, count)
    }

    fn balance(&self, address: &Address) -> Result<AccountBalance> {
        (**self).balance(address)
    }

    fn send(
        &self,
        source: &Address,
        destination: &Address,
        amount: RawAmount,
    ) -> Result<BlockHash> {
        (**self).send(source, destination, amount)
    }

    fn raw_to_display(&self, amount: RawAmount) -> Result<Decimal> {
        (**self).raw_to_display(amount)
    }

    fn display_to_raw(&self, amount: Decimal) -> Result<RawAmount> {
        (**self).display_to_raw(amount)
    }
}
