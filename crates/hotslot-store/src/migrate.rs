//! Document format upgrades.
//!
//! | Version | Shape |
//! |---------|-------|
//! | 1 | `{version, created_at, updated_at, data: {entities}}`; float prices, `owner_since`, `frontier`/`history_offset` scan state, no checksum |
//! | 2 | [`StoreDocument`]: typed entities, exact decimal prices, `checkpoint`, SHA-256 checksum |
//!
//! Older documents are converted once, at load, by an explicit step per
//! version. Nothing reads legacy field names after that.

use chrono::{DateTime, Utc};
use hotslot_types::{
    Address, BlockHash, Entity, EntityId, EntityParts, HotslotError, Result, constants,
    parse_display,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::store::StoreDocument;

/// Bring a parsed document of any supported version to the current format.
///
/// Returns the document and whether it had to be migrated. The checksum of
/// a current-version document is verified; a migrated one gets a fresh
/// checksum.
pub fn upgrade(raw: Value, now: DateTime<Utc>) -> Result<(StoreDocument, bool)> {
    let version = raw
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| HotslotError::Migration {
            from: 0,
            reason: "document has no numeric version".into(),
        })?;

    match u32::try_from(version) {
        Ok(1) => Ok((from_v1(raw, now)?, true)),
        Ok(constants::STORE_FORMAT_VERSION) => {
            let doc: StoreDocument = serde_json::from_value(raw)?;
            doc.verify()?;
            Ok((doc, false))
        }
        _ => Err(HotslotError::Migration {
            from: u32::try_from(version).unwrap_or(u32::MAX),
            reason: format!(
                "unsupported document version (current is {})",
                constants::STORE_FORMAT_VERSION
            ),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct V1Document {
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    data: V1Data,
}

#[derive(Debug, Default, Deserialize)]
struct V1Data {
    #[serde(default)]
    entities: Vec<V1Entity>,
}

#[derive(Debug, Deserialize)]
struct V1Entity {
    id: Option<EntityId>,
    name: Option<String>,
    image: Option<String>,
    #[serde(default = "active_by_default")]
    is_active: bool,
    owner_address: Option<String>,
    owner_since: Option<DateTime<Utc>>,
    current_price: Option<Value>,
    target_price: Option<Value>,
    target_address: Option<String>,
    target_time: Option<DateTime<Utc>>,
    frontier: Option<String>,
    #[serde(default)]
    history_offset: u64,
    error_message: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

fn active_by_default() -> bool {
    true
}

fn from_v1(raw: Value, now: DateTime<Utc>) -> Result<StoreDocument> {
    let doc: V1Document = serde_json::from_value(raw).map_err(|e| HotslotError::Migration {
        from: 1,
        reason: e.to_string(),
    })?;
    let created_at = doc.created_at.unwrap_or(now);

    let entities = doc
        .data
        .entities
        .into_iter()
        .enumerate()
        .map(|(index, legacy)| migrate_entity(index, legacy, created_at))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(entities = entities.len(), from = 1, to = constants::STORE_FORMAT_VERSION, "Store document migrated");

    let mut upgraded = StoreDocument::empty(created_at);
    upgraded.replace_entities(entities, now)?;
    Ok(upgraded)
}

fn migrate_entity(index: usize, legacy: V1Entity, created_at: DateTime<Utc>) -> Result<Entity> {
    let name = non_empty(legacy.name).unwrap_or_else(|| format!("entity-{index}"));
    let fail = |reason: String| HotslotError::Migration {
        from: 1,
        reason: format!("entity {index} ({name}): {reason}"),
    };

    // The offset counted rows of one address's history; without the block
    // it pointed at there is no way to know which rows were already handled.
    let frontier = non_empty(legacy.frontier);
    if frontier.is_none() && legacy.history_offset > 0 {
        return Err(fail(format!(
            "history_offset {} without frontier cannot be mapped to a checkpoint",
            legacy.history_offset
        )));
    }

    let current_price = legacy_price(legacy.current_price.as_ref()).map_err(&fail)?;
    let target_price = legacy_price(legacy.target_price.as_ref()).map_err(&fail)?;

    let parts = EntityParts {
        id: legacy.id.unwrap_or_default(),
        name: name.clone(),
        image: non_empty(legacy.image),
        is_active: legacy.is_active,
        owner_address: non_empty(legacy.owner_address).map(Address::new),
        owned_since: legacy.owner_since,
        current_price: current_price.unwrap_or(Decimal::ZERO),
        target_price,
        target_address: non_empty(legacy.target_address).map(Address::new),
        target_time: legacy.target_time,
        has_pending: false,
        checkpoint: frontier.map(BlockHash::new),
        error_message: non_empty(legacy.error_message),
        error_category: None,
        created_at,
        updated_at: legacy.updated_at,
    };
    Ok(Entity::from(parts))
}

/// Legacy prices were floats. Their decimal text is taken as the exact
/// value; zero meant "unset".
fn legacy_price(value: Option<&Value>) -> std::result::Result<Option<Decimal>, String> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(other) => return Err(format!("price is not a number: {other}")),
    };
    let price = parse_display(&text).map_err(|e| e.to_string())?;
    if price.is_sign_negative() {
        return Err(format!("negative price {price}"));
    }
    Ok((!price.is_zero()).then_some(price))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
