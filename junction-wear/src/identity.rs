//! Stable junction keys, derived once per live junction object.

use std::rc::Rc;

use log::warn;

use crate::constants::FALLBACK_JUNCTION_KEY;
use crate::host::Junction;
use crate::ledger::JunctionKey;
use crate::weak_table::WeakTable;

/// Memoizes `Junction::stable_key` per object without owning the object.
#[derive(Debug, Default)]
pub struct IdentityCache {
    keys: WeakTable<dyn Junction, JunctionKey>,
    derivations: u64,
}

impl IdentityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for `junction`, derived on first sight and cached afterwards.
    ///
    /// Derivation failures fall back to the junction's display name, then to
    /// a generic label; the fallback is cached like any other key.
    pub fn key_for(&mut self, junction: &Rc<dyn Junction>) -> JunctionKey {
        if let Some(key) = self.keys.get(junction) {
            return key.clone();
        }
        self.derivations += 1;
        let key = match junction.stable_key() {
            Ok(key) if !key.is_empty() => JunctionKey::new(key),
            Ok(_) => fallback_key(junction.as_ref()),
            Err(err) => {
                warn!("Junction key derivation failed, using fallback: {err}");
                fallback_key(junction.as_ref())
            }
        };
        self.keys.insert(junction, key.clone());
        key
    }

    /// Number of times a key was actually derived rather than served from cache.
    #[must_use]
    pub const fn derivations(&self) -> u64 {
        self.derivations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.derivations = 0;
    }
}

fn fallback_key(junction: &dyn Junction) -> JunctionKey {
    junction
        .display_name()
        .filter(|name| !name.is_empty())
        .map_or_else(|| JunctionKey::from(FALLBACK_JUNCTION_KEY), JunctionKey::new)
}
