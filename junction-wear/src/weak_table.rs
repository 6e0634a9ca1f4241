//! Per-object side tables that never keep the object alive.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::constants::WEAK_SWEEP_INTERVAL;

/// Values attached to host objects by identity.
///
/// Entries hold only a `Weak`, so dropping the object is never blocked; dead
/// entries are swept periodically as new objects are inserted.
pub struct WeakTable<T: ?Sized, V> {
    entries: HashMap<usize, (Weak<T>, V)>,
    inserts_since_sweep: usize,
}

impl<T: ?Sized, V> Default for WeakTable<T, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            inserts_since_sweep: 0,
        }
    }
}

impl<T: ?Sized, V: fmt::Debug> fmt::Debug for WeakTable<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(address, (_, value))| (address, value)))
            .finish()
    }
}

impl<T: ?Sized, V> WeakTable<T, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn address(object: &Rc<T>) -> usize {
        Rc::as_ptr(object).cast::<()>().addr()
    }

    #[must_use]
    pub fn get(&self, object: &Rc<T>) -> Option<&V> {
        self.entries
            .get(&Self::address(object))
            .filter(|(weak, _)| weak.strong_count() > 0)
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, object: &Rc<T>, value: V) {
        let previous = self
            .entries
            .insert(Self::address(object), (Rc::downgrade(object), value));
        if previous.is_none() {
            self.inserts_since_sweep += 1;
            if self.inserts_since_sweep >= WEAK_SWEEP_INTERVAL {
                self.sweep();
            }
        }
    }

    /// Drop entries whose object no longer exists.
    pub fn sweep(&mut self) {
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        self.inserts_since_sweep = 0;
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
        self.inserts_since_sweep = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_do_not_extend_lifetime() {
        let mut table: WeakTable<str, u32> = WeakTable::new();
        let object: Rc<str> = Rc::from("junction");
        table.insert(&object, 7);
        assert_eq!(table.get(&object), Some(&7));

        let probe = Rc::downgrade(&object);
        drop(object);
        assert!(probe.upgrade().is_none());

        table.sweep();
        assert!(table.is_empty());
    }

    #[test]
    fn distinct_objects_get_distinct_slots() {
        let mut table: WeakTable<str, u32> = WeakTable::new();
        let a: Rc<str> = Rc::from("a");
        let b: Rc<str> = Rc::from("a");
        table.insert(&a, 1);
        table.insert(&b, 2);
        assert_eq!(table.get(&a), Some(&1));
        assert_eq!(table.get(&b), Some(&2));
        assert_eq!(table.len(), 2);
    }
}
