//! Host-side collaborators.
//!
//! The simulation owns every junction and vehicle. The engine sees them only
//! through these traits and never holds a strong reference past a call.

use std::fmt;
use std::rc::Weak;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::WearError;

/// Opaque identifier of a piece of track, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A directed connection at a junction: the track plus which end of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    pub track: TrackId,
    pub first: bool,
}

impl Branch {
    #[must_use]
    pub const fn new(track: TrackId, first: bool) -> Self {
        Self { track, first }
    }
}

/// How a switch request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchMode {
    /// Operator throwing the lever.
    Manual,
    /// A train running through a switch set against it.
    Forced,
    /// Scripted switching without feedback.
    Silent,
}

impl SwitchMode {
    #[must_use]
    pub const fn is_forced(self) -> bool {
        matches!(self, Self::Forced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy))
    }
}

pub type OutBranches = SmallVec<[Branch; 4]>;

/// A track switch owned by the host simulation.
pub trait Junction {
    /// Save-stable name of this junction.
    ///
    /// # Errors
    ///
    /// Returns an error when the junction is malformed or being torn down.
    fn stable_key(&self) -> Result<String, WearError>;

    /// Scene name, used as the first fallback when `stable_key` fails.
    fn display_name(&self) -> Option<String> {
        None
    }

    /// World position; `None` once the junction is being torn down.
    fn position(&self) -> Option<Vec3>;

    fn in_branch(&self) -> Option<Branch>;

    fn out_branches(&self) -> OutBranches;

    fn selected_branch(&self) -> u8;
}

/// A rail vehicle owned by the host simulation.
pub trait Vehicle {
    fn position(&self) -> Vec3;

    /// Speed in metres per second; `None` when the vehicle has no physics body.
    fn velocity_mps(&self) -> Option<f32>;

    fn is_destroyed(&self) -> bool {
        false
    }
}

/// The host's list of live vehicles.
pub trait VehicleSource {
    /// Handles to every tracked vehicle, possibly including dead ones.
    /// `None` while the host has no vehicle registry yet.
    fn live_vehicles(&self) -> Option<Vec<Weak<dyn Vehicle>>>;
}
