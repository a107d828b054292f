//! History paging.

use hotslot_ledger::{HistoryEntry, LedgerGateway};
use hotslot_types::{Address, Result, SettlementConfig, constants};

/// Paging bounds for one address scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub page_size: usize,
    /// Safety ceiling against a ledger that never returns an empty page.
    pub max_pages: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            page_size: constants::DEFAULT_HISTORY_PAGE_SIZE,
            max_pages: constants::MAX_HISTORY_PAGES,
        }
    }
}

impl From<&SettlementConfig> for ScanLimits {
    fn from(cfg: &SettlementConfig) -> Self {
        Self {
            page_size: cfg.history_page_size,
            max_pages: cfg.max_history_pages,
        }
    }
}

/// Every receive row of `address`, oldest first.
///
/// Pages are requested newest-first until the ledger returns an empty page
/// or `limits.max_pages` pages have been read. The offset advances over all
/// rows, receives or not.
pub fn collect_receives<G>(gateway: &G, address: &Address, limits: ScanLimits) -> Result<Vec<HistoryEntry>>
where
    G: LedgerGateway + ?Sized,
{
    let mut receives = Vec::new();
    let mut offset = 0usize;
    let mut pages = 0usize;

    loop {
        if pages >= limits.max_pages {
            tracing::warn!(
                %address,
                pages,
                offset,
                "History page ceiling reached; oldest rows not read"
            );
            break;
        }
        let page = gateway.history(address, offset, limits.page_size)?;
        pages += 1;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        receives.extend(page.into_iter().filter(HistoryEntry::is_receive));
    }

    receives.reverse();
    tracing::debug!(%address, pages, rows = offset, receives = receives.len(), "History collected");
    Ok(receives)
}
