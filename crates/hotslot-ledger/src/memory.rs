//! In-memory ledger for tests. **Never use in production.**
//!
//! Display units are raw units shifted by a fixed decimal scale, so
//! conversions are exact in both directions. Receives settle immediately
//! unless injected as pending; sends debit the source and credit the
//! destination as a settled receive.

use std::collections::{HashMap, HashSet};

use hotslot_types::{Address, BlockHash, ErrorCategory, HotslotError, LedgerOp, RawAmount, Result};
use parking_lot::Mutex;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::gateway::{AccountBalance, EntryKind, HistoryEntry, LedgerGateway};

/// A funds transfer issued through [`LedgerGateway::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub source: Address,
    pub destination: Address,
    pub amount: RawAmount,
    pub block: BlockHash,
}

#[derive(Debug, Default)]
struct Account {
    /// Oldest first.
    history: Vec<HistoryEntry>,
    settled: RawAmount,
    pending: RawAmount,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Address, Account>,
    transfers: Vec<Transfer>,
    faults: HashMap<LedgerOp, ErrorCategory>,
    broken: HashSet<Address>,
    next_block: u64,
    next_address: u64,
    history_calls: usize,
}

impl State {
    fn block(&mut self) -> BlockHash {
        self.next_block += 1;
        BlockHash::new(format!("BLK{:016X}", self.next_block))
    }

    fn credit(&mut self, to: &Address, from: &Address, amount: RawAmount) -> BlockHash {
        let hash = self.block();
        let account = self.accounts.entry(to.clone()).or_default();
        account.history.push(HistoryEntry {
            hash: hash.clone(),
            kind: EntryKind::Receive,
            account: from.clone(),
            amount,
        });
        account.settled = RawAmount(account.settled.0 + amount.0);
        hash
    }

    fn check(&self, op: LedgerOp, address: Option<&Address>) -> Result<()> {
        if let Some(category) = self.faults.get(&op) {
            return Err(injected(op, *category));
        }
        if let Some(addr) = address {
            if self.broken.contains(addr) {
                return Err(HotslotError::LedgerTransport {
                    op,
                    reason: format!("address {addr} unreachable"),
                });
            }
        }
        Ok(())
    }
}

fn injected(op: LedgerOp, category: ErrorCategory) -> HotslotError {
    match category {
        ErrorCategory::Transport => HotslotError::LedgerTransport {
            op,
            reason: "injected transport fault".into(),
        },
        ErrorCategory::ResponseShape => HotslotError::missing_field(op, "injected"),
        _ => HotslotError::LedgerProtocol {
            op,
            reason: "injected protocol fault".into(),
        },
    }
}

/// Thread-safe in-memory [`LedgerGateway`].
#[derive(Debug)]
pub struct MemoryLedger {
    scale: u32,
    state: Mutex<State>,
}

impl MemoryLedger {
    /// A ledger where one display unit is `10^scale` raw units.
    ///
    /// # Panics
    /// Panics if `scale > 18`.
    pub fn new(scale: u32) -> Self {
        assert!(scale <= 18, "MemoryLedger scale must be <= 18");
        Self {
            scale,
            state: Mutex::new(State::default()),
        }
    }

    /// One display unit per raw unit; keeps test arithmetic readable.
    pub fn unscaled() -> Self {
        Self::new(0)
    }

    /// Settled payment of `amount` raw from `from` into `to`.
    pub fn receive(&self, to: &Address, from: &str, amount: u128) -> BlockHash {
        self.state
            .lock()
            .credit(to, &Address::from(from), RawAmount(amount))
    }

    /// Unsettled incoming funds; invisible in history until settled.
    pub fn receive_pending(&self, to: &Address, amount: u128) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(to.clone()).or_default();
        account.pending = RawAmount(account.pending.0 + amount);
    }

    /// Settled funds that never show up as a receive row.
    pub fn credit_unexplained(&self, to: &Address, amount: u128) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(to.clone()).or_default();
        account.settled = RawAmount(account.settled.0 + amount);
    }

    /// A history row of an arbitrary kind with no balance effect.
    pub fn record_other(&self, on: &Address, kind: &str, amount: u128) -> BlockHash {
        let mut state = self.state.lock();
        let hash = state.block();
        state
            .accounts
            .entry(on.clone())
            .or_default()
            .history
            .push(HistoryEntry {
                hash: hash.clone(),
                kind: EntryKind::from(kind),
                account: Address::from("other"),
                amount: RawAmount(amount),
            });
        hash
    }

    /// Make every call of `op` fail with an error of `category`.
    pub fn fail_on(&self, op: LedgerOp, category: ErrorCategory) {
        self.state.lock().faults.insert(op, category);
    }

    /// Make history and balance calls for `address` fail.
    pub fn break_address(&self, address: &Address) {
        self.state.lock().broken.insert(address.clone());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.faults.clear();
        state.broken.clear();
    }

    /// Every transfer issued so far, in order.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.lock().transfers.clone()
    }

    pub fn settled_of(&self, address: &Address) -> RawAmount {
        self.state
            .lock()
            .accounts
            .get(address)
            .map_or(RawAmount::ZERO, |a| a.settled)
    }

    /// Number of `history` calls served.
    pub fn history_calls(&self) -> usize {
        self.state.lock().history_calls
    }

    fn unit(&self) -> u64 {
        10u64.pow(self.scale)
    }
}

impl LedgerGateway for MemoryLedger {
    fn create_address(&self) -> Result<Address> {
        let mut state = self.state.lock();
        state.check(LedgerOp::CreateAddress, None)?;
        state.next_address += 1;
        let address = Address::new(format!("addr_{:04}", state.next_address));
        state.accounts.entry(address.clone()).or_default();
        Ok(address)
    }

    fn history(&self, address: &Address, offset: usize, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut state = self.state.lock();
        state.check(LedgerOp::History, Some(address))?;
        state.history_calls += 1;
        Ok(state
            .accounts
            .get(address)
            .map(|a| {
                a.history
                    .iter()
                    .rev()
                    .skip(offset)
                    .take(count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn balance(&self, address: &Address) -> Result<AccountBalance> {
        let state = self.state.lock();
        state.check(LedgerOp::Balance, Some(address))?;
        Ok(state
            .accounts
            .get(address)
            .map(|a| AccountBalance {
                settled: a.settled,
                pending: a.pending,
            })
            .unwrap_or_default())
    }

    fn send(
        &self,
        source: &Address,
        destination: &Address,
        amount: RawAmount,
    ) -> Result<BlockHash> {
        let mut state = self.state.lock();
        state.check(LedgerOp::Send, None)?;

        let available = state.accounts.get(source).map_or(RawAmount::ZERO, |a| a.settled);
        if available < amount {
            return Err(HotslotError::LedgerProtocol {
                op: LedgerOp::Send,
                reason: format!("Insufficient balance: {available} < {amount}"),
            });
        }

        let block = state.block();
        let account = state.accounts.entry(source.clone()).or_default();
        account.settled = RawAmount(account.settled.0 - amount.0);
        account.history.push(HistoryEntry {
            hash: block.clone(),
            kind: EntryKind::Send,
            account: destination.clone(),
            amount,
        });
        state.credit(destination, source, amount);
        state.transfers.push(Transfer {
            source: source.clone(),
            destination: destination.clone(),
            amount,
            block: block.clone(),
        });
        Ok(block)
    }

    fn raw_to_display(&self, amount: RawAmount) -> Result<Decimal> {
        self.state.lock().check(LedgerOp::Convert, None)?;
        let raw = i128::try_from(amount.0).map_err(|_| HotslotError::InvalidAmount {
            reason: format!("{amount} exceeds i128"),
        })?;
        Decimal::try_from_i128_with_scale(raw, self.scale).map_err(|e| {
            HotslotError::InvalidAmount {
                reason: format!("{amount} not representable: {e}"),
            }
        })
    }

    fn display_to_raw(&self, amount: Decimal) -> Result<RawAmount> {
        self.state.lock().check(LedgerOp::Convert, None)?;
        let scaled = amount
            .checked_mul(Decimal::from(self.unit()))
            .ok_or_else(|| HotslotError::InvalidAmount {
                reason: format!("{amount} overflows raw units"),
            })?;
        if !scaled.fract().is_zero() || scaled.is_sign_negative() {
            return Err(HotslotError::InvalidAmount {
                reason: format!("{amount} is not a whole number of raw units"),
            });
        }
        scaled
            .to_u128()
            .map(RawAmount)
            .ok_or_else(|| HotslotError::InvalidAmount {
                reason: format!("{amount} out of raw range"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_newest_first_and_paged() {
        let ledger = MemoryLedger::unscaled();
        let addr = ledger.create_address().unwrap();
        let h1 = ledger.receive(&addr, "a", 1);
        let h2 = ledger.receive(&addr, "b", 2);
        let h3 = ledger.receive(&addr, "c", 3);

        let page = ledger.history(&addr, 0, 2).unwrap();
        assert_eq!(page.iter().map(|e| &e.hash).collect::<Vec<_>>(), [&h3, &h2]);
        let page = ledger.history(&addr, 2, 2).unwrap();
        assert_eq!(page.iter().map(|e| &e.hash).collect::<Vec<_>>(), [&h1]);
        assert!(ledger.history(&addr, 3, 2).unwrap().is_empty());
    }

    #[test]
    fn send_moves_funds_and_logs() {
        let ledger = MemoryLedger::unscaled();
        let addr = ledger.create_address().unwrap();
        ledger.receive(&addr, "payer", 100);

        ledger.send(&addr, &Address::from("payer"), RawAmount(40)).unwrap();
        assert_eq!(ledger.settled_of(&addr), RawAmount(60));
        assert_eq!(ledger.settled_of(&Address::from("payer")), RawAmount(40));
        assert_eq!(ledger.transfers().len(), 1);

        let err = ledger
            .send(&addr, &Address::from("payer"), RawAmount(61))
            .unwrap_err();
        assert!(matches!(err, HotslotError::LedgerProtocol { .. }));
    }

    #[test]
    fn conversions_respect_scale() {
        let ledger = MemoryLedger::new(6);
        assert_eq!(
            ledger.raw_to_display(RawAmount(1_500_000)).unwrap(),
            Decimal::new(15, 1)
        );
        assert_eq!(
            ledger.display_to_raw(Decimal::new(15, 1)).unwrap(),
            RawAmount(1_500_000)
        );
        assert!(ledger.display_to_raw(Decimal::new(1, 7)).is_err());
    }

    #[test]
    fn faults_are_injected() {
        let ledger = MemoryLedger::unscaled();
        ledger.fail_on(LedgerOp::CreateAddress, ErrorCategory::Transport);
        let err = ledger.create_address().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
        ledger.clear_faults();
        assert!(ledger.create_address().is_ok());

        let addr = Address::from("addr_x");
        ledger.break_address(&addr);
        assert!(ledger.balance(&addr).is_err());
        assert!(ledger.history(&addr, 0, 10).is_err());
    }

    #[test]
    fn pending_is_not_settled() {
        let ledger = MemoryLedger::unscaled();
        let addr = ledger.create_address().unwrap();
        ledger.receive_pending(&addr, 10);
        let bal = ledger.balance(&addr).unwrap();
        assert!(bal.has_pending());
        assert_eq!(bal.settled, RawAmount::ZERO);
        assert!(ledger.history(&addr, 0, 10).unwrap().is_empty());
    }
}
