//! Worn-switch mis-routing: may override which outgoing branch a train takes.

use std::rc::Rc;

use log::info;

use crate::constants::{DAMAGE_EPSILON, FLIP_SELECTION_ATTEMPTS};
use crate::error::WearError;
use crate::guards::{FlipGuard, FlipThrottle, FrameGuard};
use crate::host::{Branch, Junction, TrackId};
use crate::identity::IdentityCache;
use crate::ledger::{DamageLedger, JunctionKey};
use crate::numbers::branch_slot;
use crate::rng::RandomSource;
use crate::settings::WearSettings;
use crate::speed::SpeedProbe;

/// The host asking which branch follows `current_track` at a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchQuery {
    pub current_track: TrackId,
    pub first: bool,
}

impl BranchQuery {
    #[must_use]
    pub const fn probe(self) -> Branch {
        Branch::new(self.current_track, self.first)
    }
}

/// Why an evaluation did or did not override the branch.
#[derive(Debug, Clone, PartialEq)]
pub enum FlipDecision {
    /// The engine is switched off.
    Disabled,
    /// Evaluation hit an error; the original branch stands.
    Failed { reason: String },
    /// This junction was already evaluated during the current tick.
    Duplicate,
    /// Facing-point entry: the train does not come from the in-branch.
    NotFromInBranch,
    /// The probe already is one of the outgoing branches or the result itself.
    AlreadyConsistent,
    Throttled,
    Guarded,
    Pristine,
    BelowSafeSpeed { speed_kmh: f32 },
    RollFailed { chance: f32 },
    TooFewBranches,
    /// Every draw hit the current selection; the selection stands.
    RetriesExhausted { chance: f32 },
    Flipped {
        key: JunctionKey,
        from: u8,
        to: u8,
        chance: f32,
        branch: Branch,
    },
}

impl FlipDecision {
    #[must_use]
    pub const fn override_branch(&self) -> Option<Branch> {
        match self {
            Self::Flipped { branch, .. } => Some(*branch),
            _ => None,
        }
    }
}

/// Session caches and inputs the flip decision depends on.
pub struct FlipEngine<'a, R: RandomSource + ?Sized> {
    pub settings: &'a WearSettings,
    pub identity: &'a mut IdentityCache,
    pub ledger: &'a DamageLedger,
    pub flip_guard: &'a mut FlipGuard,
    pub throttle: &'a mut FlipThrottle,
    pub frames: &'a mut FrameGuard,
    pub rng: &'a mut R,
    pub frame: u64,
    pub now: f64,
}

impl<R: RandomSource + ?Sized> FlipEngine<'_, R> {
    /// Run one evaluation. The checks run cheapest first and each one can
    /// end the evaluation without an override.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen branch index does not exist on the
    /// junction; callers keep the original result.
    pub fn evaluate<S: SpeedProbe + ?Sized>(
        &mut self,
        junction: &Rc<dyn Junction>,
        query: BranchQuery,
        result: Option<Branch>,
        speed: &mut S,
    ) -> Result<FlipDecision, WearError> {
        if self.frames.already_processed(junction, self.frame) {
            return Ok(FlipDecision::Duplicate);
        }

        let probe = query.probe();
        if junction.in_branch() != Some(probe) {
            return Ok(FlipDecision::NotFromInBranch);
        }
        let outs = junction.out_branches();
        if result == Some(probe) || outs.contains(&probe) {
            return Ok(FlipDecision::AlreadyConsistent);
        }

        let key = self.identity.key_for(junction);
        if self.throttle.should_skip(&key, self.now) {
            return Ok(FlipDecision::Throttled);
        }
        if self.flip_guard.is_blocked(&key, self.now) {
            return Ok(FlipDecision::Guarded);
        }

        let damage = self.ledger.get(key.as_str());
        if damage <= DAMAGE_EPSILON {
            return Ok(FlipDecision::Pristine);
        }

        let speed_kmh = speed.impact_speed_kmh(junction.as_ref());
        if speed_kmh <= self.settings.safe_no_flip_speed_kmh {
            return Ok(FlipDecision::BelowSafeSpeed { speed_kmh });
        }

        let multiplier = self.settings.effective_flip_multiplier();
        let chance = damage * multiplier;
        if self.rng.value() > chance {
            return Ok(FlipDecision::RollFailed { chance });
        }

        let count = outs.len();
        if count < 2 {
            return Ok(FlipDecision::TooFewBranches);
        }

        let current = junction.selected_branch();
        let Some(to) = self.pick_other(count, current) else {
            return Ok(FlipDecision::RetriesExhausted { chance });
        };
        let branch = *outs.get(usize::from(to)).ok_or(WearError::BranchOutOfRange {
            index: usize::from(to),
            count,
        })?;

        if self.settings.logging {
            info!(
                "Random flip at {key}: chance {:.1}% (damage {:.1}%, mult {:.1}%), {current} -> {to}",
                chance * 100.0,
                damage * 100.0,
                multiplier * 100.0
            );
        }
        Ok(FlipDecision::Flipped {
            key,
            from: current,
            to,
            chance,
            branch,
        })
    }

    /// Up to a fixed number of uniform draws; the first one that differs from
    /// `current` wins. `None` when every draw collides.
    fn pick_other(&mut self, count: usize, current: u8) -> Option<u8> {
        (0..FLIP_SELECTION_ATTEMPTS)
            .map(|_| branch_slot(self.rng.index(count)))
            .find(|candidate| *candidate != current)
    }
}
