//! JSON file entity store.
//!
//! The whole entity set lives in one document:
//! ```text
//! { "version": 2, "created_at": ..., "updated_at": ...,
//!   "checksum": "<sha256 hex of the serialized entities>",
//!   "entities": [ ... ] }
//! ```
//! Writes go to a sibling temp file that is then renamed over the
//! document, so a crash mid-save leaves the previous version intact.
//!
//! Version 1 documents may still be YAML (`db.yml`). They are read as
//! YAML when the text is not JSON, migrated, and written back as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hotslot_settlement::EntityStore;
use hotslot_types::{Entity, HotslotError, Result, constants};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::migrate;

/// The persisted document, current format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub checksum: String,
    pub entities: Vec<Entity>,
}

impl StoreDocument {
    /// A document with no entities.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: constants::STORE_FORMAT_VERSION,
            created_at: now,
            updated_at: now,
            checksum: EMPTY_CHECKSUM.to_owned(),
            entities: Vec::new(),
        }
    }

    /// Swap in a new entity set and reseal the document.
    pub fn replace_entities(&mut self, entities: Vec<Entity>, now: DateTime<Utc>) -> Result<()> {
        self.checksum = entities_checksum(&entities)?;
        self.entities = entities;
        self.updated_at = now;
        Ok(())
    }

    /// Check the stored checksum against the entities.
    pub fn verify(&self) -> Result<()> {
        let actual = entities_checksum(&self.entities)?;
        if actual != self.checksum {
            return Err(HotslotError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }
}

/// SHA-256 of `[]`.
const EMPTY_CHECKSUM: &str = "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

/// SHA-256 (hex) of the JSON serialization of `entities`.
pub fn entities_checksum(entities: &[Entity]) -> Result<String> {
    let bytes = serde_json::to_vec(entities)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// [`EntityStore`] backed by one JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: Option<StoreDocument>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document as of the last load or save.
    pub fn document(&self) -> Option<&StoreDocument> {
        self.document.as_ref()
    }

    fn read(&self) -> Result<StoreDocument> {
        let now = Utc::now();
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No store document; creating an empty one");
            let doc = StoreDocument::empty(now);
            write_json_atomic(&self.path, &doc)?;
            return Ok(doc);
        }

        let text = fs::read_to_string(&self.path).map_err(|e| io_error(&self.path, &e))?;
        let raw = parse_document(&self.path, &text)?;
        let (doc, migrated) = migrate::upgrade(raw, now)?;
        if migrated {
            write_json_atomic(&self.path, &doc)?;
        }
        Ok(doc)
    }
}

impl EntityStore for JsonFileStore {
    fn load(&mut self) -> Result<Vec<Entity>> {
        let doc = self.read()?;
        tracing::debug!(path = %self.path.display(), entities = doc.entities.len(), "Store loaded");
        let entities = doc.entities.clone();
        self.document = Some(doc);
        Ok(entities)
    }

    fn save(&mut self, entities: &[Entity]) -> Result<()> {
        let now = Utc::now();
        let mut doc = match self.document.take() {
            Some(doc) => doc,
            None if self.path.exists() => self.read()?,
            None => StoreDocument::empty(now),
        };
        doc.replace_entities(entities.to_vec(), now)?;
        write_json_atomic(&self.path, &doc)?;
        tracing::info!(
            path = %self.path.display(),
            entities = doc.entities.len(),
            checksum = &doc.checksum[..12],
            "Store saved"
        );
        self.document = Some(doc);
        Ok(())
    }
}

/// JSON first; anything else is tried as legacy YAML.
fn parse_document(path: &Path, text: &str) -> Result<serde_json::Value> {
    let json_err = match serde_json::from_str(text) {
        Ok(raw) => return Ok(raw),
        Err(err) => err,
    };
    match serde_yaml::from_str::<serde_json::Value>(text) {
        Ok(raw) => {
            tracing::info!(path = %path.display(), "Store document is YAML; reading as legacy format");
            Ok(raw)
        }
        Err(yaml_err) => Err(HotslotError::Serialization(format!(
            "{}: not JSON ({json_err}) nor YAML ({yaml_err})",
            path.display()
        ))),
    }
}

/// Serialize `value` to `path` through a temp file and rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| HotslotError::Storage(format!("{} has no file name", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, json).map_err(|e| io_error(&tmp, &e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, &e))
}

fn io_error(path: &Path, err: &std::io::Error) -> HotslotError {
    HotslotError::Storage(format!("{}: {err}", path.display()))
}
