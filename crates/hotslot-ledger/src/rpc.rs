//! JSON-RPC ledger adapter.
//!
//! Each gateway call becomes exactly one request object sent through an
//! [`RpcTransport`]. The transport only moves bytes; this module owns the
//! action names, argument encoding and response classification:
//!
//! | response                                   | error                 |
//! |--------------------------------------------|-----------------------|
//! | transport failed                           | `LedgerTransport`     |
//! | has an `"error"` field                     | `LedgerProtocol`      |
//! | not an object; field missing or mistyped   | `LedgerResponseShape` |

use hotslot_types::{
    Address, BlockHash, HotslotError, LedgerOp, RawAmount, Result, RpcConfig, parse_display,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::gateway::{AccountBalance, EntryKind, HistoryEntry, LedgerGateway};

/// The transport could not deliver a request or read its response.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Request/response channel to a ledger node.
pub trait RpcTransport {
    fn call(&self, request: &Value) -> std::result::Result<Value, TransportFailure>;
}

/// [`LedgerGateway`] backed by the node's JSON-RPC interface.
pub struct RpcLedger<T> {
    transport: T,
    config: RpcConfig,
}

impl<T: RpcTransport> RpcLedger<T> {
    /// # Errors
    /// Returns [`HotslotError::Configuration`] if `config` is invalid.
    pub fn new(transport: T, config: RpcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// Send one request and strip transport and protocol failures.
    fn request(&self, op: LedgerOp, request: &Value) -> Result<Map<String, Value>> {
        let response = self
            .transport
            .call(request)
            .map_err(|e| HotslotError::LedgerTransport {
                op,
                reason: e.to_string(),
            })?;

        let Value::Object(body) = response else {
            tracing::warn!(%op, %response, "Ledger response is not a JSON object");
            return Err(HotslotError::missing_field(op, "<object body>"));
        };

        if let Some(err) = body.get("error") {
            let reason = err.as_str().map_or_else(|| err.to_string(), str::to_string);
            return Err(HotslotError::LedgerProtocol { op, reason });
        }
        Ok(body)
    }

    fn convert(&self, action: &str, amount: String) -> Result<String> {
        let body = self.request(
            LedgerOp::Convert,
            &json!({ "action": action, "amount": amount }),
        )?;
        required_str(&body, LedgerOp::Convert, "amount").map(str::to_string)
    }
}

impl<T: RpcTransport> LedgerGateway for RpcLedger<T> {
    fn create_address(&self) -> Result<Address> {
        let body = self.request(
            LedgerOp::CreateAddress,
            &json!({ "action": "account_create", "wallet": self.config.wallet_id }),
        )?;
        let account = required_str(&body, LedgerOp::CreateAddress, "account")?;
        tracing::info!(address = account, "Deposit address created");
        Ok(Address::from(account))
    }

    fn history(&self, address: &Address, offset: usize, count: usize) -> Result<Vec<HistoryEntry>> {
        let op = LedgerOp::History;
        let body = self.request(
            op,
            &json!({
                "action": "account_history",
                "account": address.as_str(),
                "count": count.to_string(),
                "offset": offset.to_string(),
            }),
        )?;

        // Nodes report an empty history as "" rather than [].
        let rows = match body.get("history") {
            None => return Err(HotslotError::missing_field(op, "history")),
            Some(Value::Array(rows)) => rows,
            Some(_) => return Ok(Vec::new()),
        };

        rows.iter().map(parse_history_row).collect()
    }

    fn balance(&self, address: &Address) -> Result<AccountBalance> {
        let op = LedgerOp::Balance;
        let body = self.request(
            op,
            &json!({ "action": "account_balance", "account": address.as_str() }),
        )?;
        // An unopened account has neither field; both mean zero.
        let settled = optional_raw(&body, op, "balance")?;
        let pending = optional_raw(&body, op, "pending")?;
        Ok(AccountBalance { settled, pending })
    }

    fn send(
        &self,
        source: &Address,
        destination: &Address,
        amount: RawAmount,
    ) -> Result<BlockHash> {
        let op = LedgerOp::Send;
        let body = self.request(
            op,
            &json!({
                "action": "send",
                "wallet": self.config.wallet_id,
                "source": source.as_str(),
                "destination": destination.as_str(),
                "amount": amount.to_string(),
            }),
        )?;
        let block = required_str(&body, op, "block")?;
        Ok(BlockHash::from(block))
    }

    fn raw_to_display(&self, amount: RawAmount) -> Result<Decimal> {
        let out = self.convert("rai_from_raw", amount.to_string())?;
        parse_display(&out)
    }

    fn display_to_raw(&self, amount: Decimal) -> Result<RawAmount> {
        let out = self.convert("rai_to_raw", amount.normalize().to_string())?;
        out.parse()
    }
}

fn required_str<'a>(body: &'a Map<String, Value>, op: LedgerOp, field: &str) -> Result<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HotslotError::missing_field(op, field))
}

fn optional_raw(body: &Map<String, Value>, op: LedgerOp, field: &str) -> Result<RawAmount> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(RawAmount::ZERO),
        Some(Value::String(s)) => s.parse(),
        Some(_) => Err(HotslotError::missing_field(op, field)),
    }
}

fn parse_history_row(row: &Value) -> Result<HistoryEntry> {
    let op = LedgerOp::History;
    let Value::Object(row) = row else {
        return Err(HotslotError::missing_field(op, "history[]"));
    };
    let field = |name: &str| {
        row.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| HotslotError::missing_field(op, format!("history[].{name}")))
    };
    Ok(HistoryEntry {
        hash: BlockHash::from(field("hash")?),
        kind: EntryKind::from(field("type")?),
        account: Address::from(field("account")?),
        amount: field("amount")?.parse()?,
    })
}
