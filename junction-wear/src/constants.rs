//! Tunables shared across the wear engine.

/// Save-document entry holding the damage ledger.
pub const SAVE_KEY: &str = "JunctionMaintenance_Map";
/// Misspelled entry written by older releases; removed on the first save after a load.
pub const LEGACY_SAVE_KEY: &str = "JunctionMaintanence_Map";
/// Key used when a junction cannot name itself.
pub const FALLBACK_JUNCTION_KEY: &str = "Switch";

/// Validity window of the live-vehicle snapshot, in unscaled seconds.
pub const VEHICLE_SNAPSHOT_TTL_SEC: f64 = 0.20;
/// Minimum spacing between flip evaluations of one junction, in unscaled seconds.
pub const FLIP_THROTTLE_INTERVAL_SEC: f64 = 0.12;
/// Vehicles farther than this from a junction do not count toward impact speed.
pub const SPEED_SEARCH_RADIUS_M: f32 = 30.0;
pub const MPS_TO_KMH: f32 = 3.6;

/// Damage at or above this level marks a junction as ruined.
pub const RUINED_DAMAGE: f32 = 0.999;
/// Damage at or below this level is treated as pristine by the flip engine.
pub const DAMAGE_EPSILON: f32 = 0.0001;
/// Speed bucket width for run-through damage: one percent per full bucket.
pub const DAMAGE_TIER_KMH: f32 = 10.0;
/// Random draws attempted when choosing a different outgoing branch.
pub const FLIP_SELECTION_ATTEMPTS: usize = 8;

pub const SAFE_SPEED_MIN_KMH: f32 = 1.0;
pub const SAFE_SPEED_MAX_KMH: f32 = 30.0;
pub const FLIP_MULTIPLIER_MIN: f32 = 0.01;
pub const FLIP_MULTIPLIER_MAX: f32 = 0.50;

/// Stale weak entries are swept from identity-keyed caches every this many inserts.
pub const WEAK_SWEEP_INTERVAL: usize = 256;
