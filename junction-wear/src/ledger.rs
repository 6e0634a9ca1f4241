//! Damage ledger: the persisted source of truth for junction wear.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::numbers::clamp01;

/// Save-stable name of a junction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionKey(String);

impl JunctionKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JunctionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JunctionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Damage per junction in `[0, 1]`; absent keys read as pristine.
///
/// Writes never fail: out-of-range input is clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DamageLedger {
    entries: BTreeMap<JunctionKey, f32>,
}

impl DamageLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> f32 {
        self.entries.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &JunctionKey, value: f32) {
        let clamped = clamp01(value);
        if let Some(slot) = self.entries.get_mut(key.as_str()) {
            *slot = clamped;
        } else {
            self.entries.insert(key.clone(), clamped);
        }
    }

    /// Add a fraction to the junction's damage and return the new level.
    pub fn add_percent(&mut self, key: &JunctionKey, delta01: f32) -> f32 {
        let next = clamp01(self.get(key.as_str()) + delta01);
        self.set(key, next);
        next
    }

    /// Reduce damage by up to `step01` and return how much was repaired.
    pub fn repair(&mut self, key: &JunctionKey, step01: f32) -> f32 {
        let before = self.get(key.as_str());
        if before <= 0.0 {
            return 0.0;
        }
        let repaired = clamp01(step01).min(before);
        self.set(key, before - repaired);
        repaired
    }

    /// Snapshot of every entry, ordered by key.
    #[must_use]
    pub fn all(&self) -> Vec<(JunctionKey, f32)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect()
    }

    /// Entries with non-zero damage, ordered by key.
    pub fn damaged(&self) -> impl Iterator<Item = (&JunctionKey, f32)> + '_ {
        self.entries
            .iter()
            .filter(|(_, value)| **value > 0.0)
            .map(|(key, value)| (key, *value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(JunctionKey, f32)> for DamageLedger {
    fn from_iter<I: IntoIterator<Item = (JunctionKey, f32)>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for (key, value) in iter {
            ledger.set(&key, value);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_read_as_zero() {
        let ledger = DamageLedger::new();
        assert!(ledger.get("J404").abs() < f32::EPSILON);
        assert!(ledger.is_empty());
    }

    #[test]
    fn writes_are_clamped() {
        let mut ledger = DamageLedger::new();
        let key = JunctionKey::from("J1");
        for raw in [-5.0, -0.01, 0.0, 0.5, 1.0, 1.01, 250.0, f32::NAN] {
            ledger.set(&key, raw);
            let stored = ledger.get("J1");
            assert!((0.0..=1.0).contains(&stored), "{raw} stored as {stored}");
        }
        ledger.set(&key, 7.0);
        assert!((ledger.get("J1") - 1.0).abs() < f32::EPSILON);
        ledger.set(&key, -7.0);
        assert!(ledger.get("J1").abs() < f32::EPSILON);
    }

    #[test]
    fn sequential_additions_saturate() {
        let mut ledger = DamageLedger::new();
        let key = JunctionKey::from("J1");
        ledger.add_percent(&key, 0.3);
        ledger.add_percent(&key, 0.4);
        let last = ledger.add_percent(&key, 0.5);
        assert!((last - 1.0).abs() < f32::EPSILON);
        assert!((ledger.get("J1") - 1.0).abs() < f32::EPSILON);

        let floor = ledger.add_percent(&key, -3.0);
        assert!(floor.abs() < f32::EPSILON);
    }

    #[test]
    fn repair_never_goes_below_zero() {
        let mut ledger = DamageLedger::new();
        let key = JunctionKey::from("J7");
        assert!(ledger.repair(&key, 0.5).abs() < f32::EPSILON);
        ledger.set(&key, 0.3);
        let repaired = ledger.repair(&key, 0.5);
        assert!((repaired - 0.3).abs() < 1e-6);
        assert!(ledger.get("J7").abs() < 1e-6);
    }

    #[test]
    fn listing_is_ordered_and_skips_pristine() {
        let ledger: DamageLedger = [
            (JunctionKey::from("J2"), 0.2),
            (JunctionKey::from("J0"), 0.0),
            (JunctionKey::from("J1"), 0.1),
        ]
        .into_iter()
        .collect();
        let keys: Vec<String> = ledger
            .all()
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, ["J0", "J1", "J2"]);
        let damaged: Vec<_> = ledger.damaged().map(|(k, _)| k.as_str()).collect();
        assert_eq!(damaged, vec!["J1", "J2"]);
    }
}
