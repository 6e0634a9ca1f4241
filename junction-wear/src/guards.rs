//! Session-scoped lockouts and rate limits consulted by the flip engine.

use std::collections::HashMap;
use std::rc::Rc;

use crate::constants::FLIP_THROTTLE_INTERVAL_SEC;
use crate::host::Junction;
use crate::ledger::JunctionKey;
use crate::weak_table::WeakTable;

/// Per-junction windows during which random flips are suppressed.
#[derive(Debug, Default)]
pub struct FlipGuard {
    blocked_until: HashMap<JunctionKey, f64>,
}

impl FlipGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress flips at `key` for `seconds` from `now`. Extends, never shortens, an active window.
    pub fn block(&mut self, key: &JunctionKey, seconds: f32, now: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        let until = now + f64::from(seconds);
        let slot = self.blocked_until.entry(key.clone()).or_insert(until);
        if *slot < until {
            *slot = until;
        }
    }

    /// True while the window for `key` is open; lapsed windows are dropped.
    pub fn is_blocked(&mut self, key: &JunctionKey, now: f64) -> bool {
        match self.blocked_until.get(key) {
            Some(until) if now < *until => true,
            Some(_) => {
                self.blocked_until.remove(key);
                false
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.blocked_until.clear();
    }
}

/// Bounds how often the flip evaluation runs for one junction.
#[derive(Debug)]
pub struct FlipThrottle {
    last_evaluated: HashMap<JunctionKey, f64>,
    min_interval: f64,
}

impl Default for FlipThrottle {
    fn default() -> Self {
        Self::with_interval(FLIP_THROTTLE_INTERVAL_SEC)
    }
}

impl FlipThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_interval(min_interval: f64) -> Self {
        Self {
            last_evaluated: HashMap::new(),
            min_interval: min_interval.max(0.0),
        }
    }

    /// True when `key` was evaluated less than the interval ago. Otherwise
    /// records `now` as the latest evaluation and returns false.
    pub fn should_skip(&mut self, key: &JunctionKey, now: f64) -> bool {
        if let Some(last) = self.last_evaluated.get(key) {
            if now - *last < self.min_interval {
                return true;
            }
        }
        self.last_evaluated.insert(key.clone(), now);
        false
    }

    pub fn clear(&mut self) {
        self.last_evaluated.clear();
    }
}

/// Remembers the tick at which each junction object was last processed.
#[derive(Debug, Default)]
pub struct FrameGuard {
    last_frame: WeakTable<dyn Junction, u64>,
}

impl FrameGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `junction` was already seen during `frame`; marks it seen otherwise.
    pub fn already_processed(&mut self, junction: &Rc<dyn Junction>, frame: u64) -> bool {
        if self.last_frame.get(junction) == Some(&frame) {
            return true;
        }
        self.last_frame.insert(junction, frame);
        false
    }

    pub fn clear(&mut self) {
        self.last_frame.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WearError;
    use crate::host::{Branch, OutBranches, Vec3};

    struct Bare;

    impl Junction for Bare {
        fn stable_key(&self) -> Result<String, WearError> {
            Ok("bare".into())
        }

        fn position(&self) -> Option<Vec3> {
            None
        }

        fn in_branch(&self) -> Option<Branch> {
            None
        }

        fn out_branches(&self) -> OutBranches {
            OutBranches::new()
        }

        fn selected_branch(&self) -> u8 {
            0
        }
    }

    #[test]
    fn guard_window_opens_and_lapses() {
        let mut guard = FlipGuard::new();
        let key = JunctionKey::from("J1");
        guard.block(&key, 2.0, 10.0);
        assert!(guard.is_blocked(&key, 10.0));
        assert!(guard.is_blocked(&key, 11.99));
        assert!(!guard.is_blocked(&key, 12.0));
        assert!(!guard.is_blocked(&key, 11.0));
    }

    #[test]
    fn guard_ignores_empty_windows_and_never_shortens() {
        let mut guard = FlipGuard::new();
        let key = JunctionKey::from("J1");
        guard.block(&key, 0.0, 5.0);
        assert!(!guard.is_blocked(&key, 5.0));
        guard.block(&key, 10.0, 0.0);
        guard.block(&key, 1.0, 1.0);
        assert!(guard.is_blocked(&key, 9.0));
    }

    #[test]
    fn throttle_allows_once_per_interval() {
        let mut throttle = FlipThrottle::new();
        let key = JunctionKey::from("J1");
        assert!(!throttle.should_skip(&key, 1.0));
        assert!(throttle.should_skip(&key, 1.05));
        assert!(throttle.should_skip(&key, 1.119));
        assert!(!throttle.should_skip(&key, 1.2));
        assert!(!throttle.should_skip(&JunctionKey::from("J2"), 1.2));
    }

    #[test]
    fn frame_guard_dedups_within_a_frame() {
        let mut guard = FrameGuard::new();
        let a: Rc<dyn Junction> = Rc::new(Bare);
        let b: Rc<dyn Junction> = Rc::new(Bare);
        assert!(!guard.already_processed(&a, 1));
        assert!(guard.already_processed(&a, 1));
        assert!(!guard.already_processed(&b, 1));
        assert!(!guard.already_processed(&a, 2));
        assert!(guard.already_processed(&a, 2));
    }
}
