//! Short-lived snapshot of the host's live vehicles.

use std::rc::{Rc, Weak};

use crate::constants::VEHICLE_SNAPSHOT_TTL_SEC;
use crate::host::{Vehicle, VehicleSource};

pub type VehicleSnapshot = Rc<[Weak<dyn Vehicle>]>;

/// Caches the filtered live-vehicle list for a fixed TTL of unscaled time.
///
/// Entries are weak: a vehicle destroyed after the refresh simply fails to
/// upgrade and callers skip it.
#[derive(Debug)]
pub struct VehicleSnapshotCache {
    snapshot: VehicleSnapshot,
    refreshed_at: Option<f64>,
    ttl: f64,
    rebuilds: u64,
}

impl Default for VehicleSnapshotCache {
    fn default() -> Self {
        Self::with_ttl(VEHICLE_SNAPSHOT_TTL_SEC)
    }
}

impl VehicleSnapshotCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(ttl: f64) -> Self {
        Self {
            snapshot: empty_snapshot(),
            refreshed_at: None,
            ttl: ttl.max(0.0),
            rebuilds: 0,
        }
    }

    /// Current snapshot, rebuilt from `source` once it is older than the TTL.
    pub fn snapshot(&mut self, source: &dyn VehicleSource, now: f64) -> VehicleSnapshot {
        let stale = self
            .refreshed_at
            .is_none_or(|refreshed| now - refreshed > self.ttl);
        if stale {
            self.snapshot = source
                .live_vehicles()
                .map_or_else(empty_snapshot, |vehicles| {
                    vehicles
                        .into_iter()
                        .filter(|weak| weak.upgrade().is_some_and(|vehicle| !vehicle.is_destroyed()))
                        .collect()
                });
            self.refreshed_at = Some(now);
            self.rebuilds += 1;
        }
        Rc::clone(&self.snapshot)
    }

    /// Number of rebuilds since creation or the last reset.
    #[must_use]
    pub const fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn clear(&mut self) {
        self.snapshot = empty_snapshot();
        self.refreshed_at = None;
        self.rebuilds = 0;
    }
}

fn empty_snapshot() -> VehicleSnapshot {
    Rc::from(Vec::<Weak<dyn Vehicle>>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Vec3;
    use std::cell::{Cell, RefCell};

    struct Car {
        destroyed: bool,
    }

    impl Vehicle for Car {
        fn position(&self) -> Vec3 {
            Vec3::default()
        }

        fn velocity_mps(&self) -> Option<f32> {
            Some(0.0)
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed
        }
    }

    #[derive(Default)]
    struct Spawner {
        cars: RefCell<Vec<Rc<Car>>>,
        dangling: RefCell<Vec<Weak<dyn Vehicle>>>,
        queries: Cell<u32>,
        offline: bool,
    }

    impl VehicleSource for Spawner {
        fn live_vehicles(&self) -> Option<Vec<Weak<dyn Vehicle>>> {
            self.queries.set(self.queries.get() + 1);
            if self.offline {
                return None;
            }
            let mut all: Vec<Weak<dyn Vehicle>> = self
                .cars
                .borrow()
                .iter()
                .map(|car| {
                    let car: Rc<dyn Vehicle> = car.clone();
                    Rc::downgrade(&car)
                })
                .collect();
            all.extend(self.dangling.borrow().iter().cloned());
            Some(all)
        }
    }

    #[test]
    fn same_instance_within_ttl_and_rebuilt_after() {
        let spawner = Spawner::default();
        spawner.cars.borrow_mut().push(Rc::new(Car { destroyed: false }));
        let mut cache = VehicleSnapshotCache::new();

        let first = cache.snapshot(&spawner, 1.0);
        let second = cache.snapshot(&spawner, 1.15);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(spawner.queries.get(), 1);

        let third = cache.snapshot(&spawner, 1.25);
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(spawner.queries.get(), 2);
        assert_eq!(cache.rebuilds(), 2);
    }

    #[test]
    fn rebuild_filters_dead_and_destroyed_entries() {
        let spawner = Spawner::default();
        spawner.cars.borrow_mut().push(Rc::new(Car { destroyed: false }));
        spawner.cars.borrow_mut().push(Rc::new(Car { destroyed: true }));
        {
            let gone: Rc<dyn Vehicle> = Rc::new(Car { destroyed: false });
            spawner.dangling.borrow_mut().push(Rc::downgrade(&gone));
        }
        let mut cache = VehicleSnapshotCache::new();
        let snapshot = cache.snapshot(&spawner, 0.0);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.iter().all(|weak| weak.upgrade().is_some()));
    }

    #[test]
    fn later_destruction_is_tolerated() {
        let spawner = Spawner::default();
        spawner.cars.borrow_mut().push(Rc::new(Car { destroyed: false }));
        let mut cache = VehicleSnapshotCache::new();
        let snapshot = cache.snapshot(&spawner, 0.0);
        spawner.cars.borrow_mut().clear();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].upgrade().is_none());
    }

    #[test]
    fn missing_registry_yields_empty_snapshot() {
        let spawner = Spawner {
            offline: true,
            ..Spawner::default()
        };
        let mut cache = VehicleSnapshotCache::new();
        assert!(cache.snapshot(&spawner, 0.0).is_empty());
    }
}
