//! Damage ledger <-> save document, plus the one-time legacy cleanup.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{LEGACY_SAVE_KEY, SAVE_KEY};
use crate::error::WearError;
use crate::ledger::{DamageLedger, JunctionKey};

/// The host's save-game data object.
pub type SaveDocument = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum DamageRecord {
    Entry { key: String, damage: f32 },
    Pair(String, f32),
}

/// Serialize the ledger as an array of `{key, damage}` records ordered by key.
///
/// # Errors
///
/// Returns an error if the records cannot be represented as JSON.
pub fn encode(ledger: &DamageLedger) -> Result<Value, WearError> {
    let records: Vec<DamageRecord> = ledger
        .all()
        .into_iter()
        .map(|(key, damage)| DamageRecord::Entry {
            key: key.to_string(),
            damage,
        })
        .collect();
    Ok(serde_json::to_value(records)?)
}

/// Rebuild a ledger from an encoded array. Individual malformed records are
/// skipped; values are clamped on insert.
///
/// # Errors
///
/// Returns an error if `value` is not an array.
pub fn decode(value: &Value) -> Result<DamageLedger, WearError> {
    let Value::Array(items) = value else {
        return Err(WearError::Decode(format!(
            "expected an array of damage records, found {}",
            kind_of(value)
        )));
    };
    let mut ledger = DamageLedger::new();
    for (index, item) in items.iter().enumerate() {
        match DamageRecord::deserialize(item) {
            Ok(DamageRecord::Entry { key, damage } | DamageRecord::Pair(key, damage)) => {
                if key.is_empty() {
                    warn!("Skipping damage record {index}: empty junction key");
                    continue;
                }
                ledger.set(&JunctionKey::new(key), damage);
            }
            Err(err) => warn!("Skipping malformed damage record {index}: {err}"),
        }
    }
    Ok(ledger)
}

/// Read the ledger stored in `document`. A missing entry or any decode error
/// yields an empty ledger.
#[must_use]
pub fn read_ledger(document: &SaveDocument) -> DamageLedger {
    let Some(value) = document.get(SAVE_KEY) else {
        return DamageLedger::new();
    };
    decode(value).unwrap_or_else(|err| {
        warn!("{err}; starting with an empty damage ledger");
        DamageLedger::new()
    })
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-load persistence state: the pending legacy cleanup and the one-shot ledger load.
#[derive(Debug, Clone, Default)]
pub struct SaveSession {
    pending_legacy_cleanup: bool,
    ledger_loaded: bool,
}

impl SaveSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A save was chosen but its data is not available yet.
    pub fn schedule_load(&mut self) {
        self.pending_legacy_cleanup = true;
        self.ledger_loaded = false;
    }

    /// A new session or career starts from scratch.
    pub fn reset(&mut self) {
        self.pending_legacy_cleanup = false;
        self.ledger_loaded = false;
    }

    #[must_use]
    pub const fn legacy_cleanup_pending(&self) -> bool {
        self.pending_legacy_cleanup
    }

    /// The ledger stored in `document`, the first time this is called since
    /// the last load or reset; `None` afterwards.
    pub fn load_once(&mut self, document: &SaveDocument) -> Option<DamageLedger> {
        if self.ledger_loaded {
            return None;
        }
        self.ledger_loaded = true;
        Some(read_ledger(document))
    }

    /// Write `ledger` into `document`, removing the legacy entry on the first
    /// write after a load. Legacy contents are discarded, not merged.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be encoded; the document keeps
    /// its previous ledger entry in that case.
    pub fn write(
        &mut self,
        document: &mut SaveDocument,
        ledger: &DamageLedger,
        verbose: bool,
    ) -> Result<(), WearError> {
        if self.pending_legacy_cleanup {
            self.pending_legacy_cleanup = false;
            if document.remove(LEGACY_SAVE_KEY).is_some() {
                info!("Removed legacy save entry '{LEGACY_SAVE_KEY}' (cleanup on save).");
            }
        }
        let encoded = encode(ledger)?;
        document.insert(SAVE_KEY.to_string(), encoded);
        if verbose {
            info!("Saved {} damage entries into savegame.", ledger.len());
        }
        Ok(())
    }
}
