//! `index.json` for the frontend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hotslot_settlement::ReportSink;
use hotslot_types::{Address, ClaimPhase, Entity, EntityId, Result, constants};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::write_json_atomic;

pub const INDEX_FILE: &str = "index.json";

/// Public view of one entity. Settlement internals (checkpoint, errors)
/// stay out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub image: Option<String>,
    pub phase: ClaimPhase,
    pub owner_address: Option<Address>,
    pub owned_since: Option<DateTime<Utc>>,
    pub current_price: Decimal,
    pub target_price: Option<Decimal>,
    pub target_address: Option<Address>,
    pub claimable_from: Option<DateTime<Utc>>,
}

impl EntityView {
    #[must_use]
    pub fn new(entity: &Entity, now: DateTime<Utc>) -> Self {
        Self {
            id: entity.id(),
            name: entity.name().to_owned(),
            image: entity.image().map(str::to_owned),
            phase: entity.phase(now),
            owner_address: entity.owner_address().cloned(),
            owned_since: entity.owned_since(),
            current_price: entity.current_price(),
            target_price: entity.target_price(),
            target_address: entity.target_address().cloned(),
            claimable_from: entity.target_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub app_name: String,
    pub app_version: String,
    pub generated_at: DateTime<Utc>,
    pub entities: Vec<EntityView>,
}

/// Writes `index.json` into a web directory.
#[derive(Debug)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn render_at(&self, entities: &[Entity], now: DateTime<Utc>) -> Result<IndexDocument> {
        let index = IndexDocument {
            app_name: constants::APP_NAME.to_owned(),
            app_version: constants::VERSION.to_owned(),
            generated_at: now,
            entities: entities.iter().map(|e| EntityView::new(e, now)).collect(),
        };
        let path = self.index_path();
        write_json_atomic(&path, &index)?;
        tracing::info!(path = %path.display(), entities = index.entities.len(), "Index rendered");
        Ok(index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for JsonReportSink {
    fn render(&mut self, entities: &[Entity]) -> Result<()> {
        self.render_at(entities, Utc::now()).map(|_| ())
    }
}
