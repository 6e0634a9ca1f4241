//! Impact-speed estimate near a junction, computed at most once per tick.

use crate::constants::SPEED_SEARCH_RADIUS_M;
use crate::host::{Junction, VehicleSource};
use crate::numbers::mps_to_kmh;
use crate::snapshot::{VehicleSnapshot, VehicleSnapshotCache};

/// Impact speed lookup used by damage accrual and the flip engine.
pub trait SpeedProbe {
    fn impact_speed_kmh(&mut self, junction: &dyn Junction) -> f32;
}

/// A constant speed, for hosts that already know it and for tests.
impl SpeedProbe for f32 {
    fn impact_speed_kmh(&mut self, _junction: &dyn Junction) -> f32 {
        *self
    }
}

/// The estimator wired to the vehicle snapshot for the current tick.
pub struct TickSpeedProbe<'a> {
    pub estimator: &'a mut SpeedEstimator,
    pub snapshots: &'a mut VehicleSnapshotCache,
    pub source: &'a dyn VehicleSource,
    pub flip_enabled: bool,
    pub frame: u64,
    pub now: f64,
}

impl SpeedProbe for TickSpeedProbe<'_> {
    fn impact_speed_kmh(&mut self, junction: &dyn Junction) -> f32 {
        let snapshots = &mut *self.snapshots;
        let source = self.source;
        let now = self.now;
        self.estimator
            .estimate_speed_kmh(junction, self.flip_enabled, self.frame, || {
                snapshots.snapshot(source, now)
            })
    }
}

/// Per-tick memo of the nearest vehicle's speed.
///
/// The first junction asking in a tick decides the value for every other
/// junction asking in that same tick. Two junctions far apart can therefore
/// share a speed; this keeps the cost at one vehicle scan per tick.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    cached_kmh: f32,
    last_frame: Option<u64>,
    radius_m: f32,
    scans: u64,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::with_radius(SPEED_SEARCH_RADIUS_M)
    }
}

impl SpeedEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_radius(radius_m: f32) -> Self {
        Self {
            cached_kmh: 0.0,
            last_frame: None,
            radius_m: radius_m.max(0.0),
            scans: 0,
        }
    }

    /// Speed in km/h of the nearest vehicle within the search radius of
    /// `junction`, or 0 when none qualifies or `flip_enabled` is off.
    ///
    /// `vehicles` is only invoked when the tick has no cached value yet.
    pub fn estimate_speed_kmh<F>(
        &mut self,
        junction: &dyn Junction,
        flip_enabled: bool,
        frame: u64,
        vehicles: F,
    ) -> f32
    where
        F: FnOnce() -> VehicleSnapshot,
    {
        if !flip_enabled {
            return 0.0;
        }
        // A torn-down junction must not claim the tick's memo slot.
        let Some(origin) = junction.position() else {
            return 0.0;
        };
        if self.last_frame == Some(frame) {
            return self.cached_kmh;
        }
        self.last_frame = Some(frame);
        self.cached_kmh = 0.0;
        self.scans += 1;

        let mut best_d2 = self.radius_m * self.radius_m;
        for weak in vehicles().iter() {
            let Some(vehicle) = weak.upgrade() else {
                continue;
            };
            if vehicle.is_destroyed() {
                continue;
            }
            let Some(mps) = vehicle.velocity_mps() else {
                continue;
            };
            let d2 = vehicle.position().distance_squared(origin);
            if d2 < best_d2 {
                best_d2 = d2;
                self.cached_kmh = mps_to_kmh(mps);
            }
        }
        self.cached_kmh
    }

    /// Number of vehicle scans performed; at most one per tick.
    #[must_use]
    pub const fn scans(&self) -> u64 {
        self.scans
    }

    pub fn clear(&mut self) {
        self.cached_kmh = 0.0;
        self.last_frame = None;
        self.scans = 0;
    }
}
