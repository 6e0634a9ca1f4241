//! Junction Wear Engine
//!
//! Tracks cumulative wear on track-switch junctions, lets worn junctions
//! occasionally mis-route trains, and refuses manual switching once a
//! junction is ruined. The host simulation owns every junction and vehicle
//! and drives the engine through the event handlers on [`WearEngine`].

pub mod accrual;
pub mod constants;
pub mod engine;
pub mod error;
pub mod flip;
pub mod guards;
pub mod host;
pub mod identity;
pub mod ledger;
pub mod numbers;
pub mod persistence;
pub mod policy;
pub mod rng;
pub mod settings;
pub mod snapshot;
pub mod speed;
pub mod weak_table;

// Re-export commonly used types
pub use accrual::{DamageAccrual, RunThroughOutcome};
pub use engine::{TickClock, WearEngine};
pub use error::WearError;
pub use flip::{BranchQuery, FlipDecision, FlipEngine};
pub use guards::{FlipGuard, FlipThrottle, FrameGuard};
pub use host::{
    Branch, Junction, OutBranches, SwitchMode, TrackId, Vec3, Vehicle, VehicleSource,
};
pub use identity::IdentityCache;
pub use ledger::{DamageLedger, JunctionKey};
pub use persistence::{SaveDocument, SaveSession, decode, encode, read_ledger};
pub use policy::SwitchBlockPolicy;
pub use rng::{CountingRng, RandomSource, ScriptedRandom, SessionRng};
pub use settings::WearSettings;
pub use snapshot::{VehicleSnapshot, VehicleSnapshotCache};
pub use speed::{SpeedEstimator, SpeedProbe, TickSpeedProbe};
