//! Event-driven facade the host calls into.

use std::rc::Rc;

use log::{info, warn};

use crate::accrual::{DamageAccrual, RunThroughOutcome};
use crate::flip::{BranchQuery, FlipDecision, FlipEngine};
use crate::guards::{FlipGuard, FlipThrottle, FrameGuard};
use crate::host::{Branch, Junction, SwitchMode, TrackId, VehicleSource};
use crate::identity::IdentityCache;
use crate::ledger::DamageLedger;
use crate::persistence::{SaveDocument, SaveSession};
use crate::policy::SwitchBlockPolicy;
use crate::rng::{RandomSource, SessionRng};
use crate::settings::WearSettings;
use crate::snapshot::VehicleSnapshotCache;
use crate::speed::{SpeedEstimator, TickSpeedProbe};

/// Tick index and unscaled time, advanced by the host's tick event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickClock {
    pub frame: u64,
    pub unscaled: f64,
}

impl TickClock {
    pub fn advance(&mut self, dt_unscaled: f32) {
        self.frame = self.frame.wrapping_add(1);
        if dt_unscaled.is_finite() && dt_unscaled > 0.0 {
            self.unscaled += f64::from(dt_unscaled);
        }
    }
}

/// All wear state for one game session plus the handlers for host events.
///
/// The host must call handlers from a single thread, one at a time. None of
/// them fail: errors are logged and the host's own operation proceeds.
pub struct WearEngine<R: RandomSource = SessionRng> {
    settings: WearSettings,
    enabled: bool,
    clock: TickClock,
    ledger: DamageLedger,
    identity: IdentityCache,
    snapshots: VehicleSnapshotCache,
    speed: SpeedEstimator,
    flip_guard: FlipGuard,
    throttle: FlipThrottle,
    frames: FrameGuard,
    save: SaveSession,
    vehicles: Box<dyn VehicleSource>,
    rng: R,
}

impl WearEngine<SessionRng> {
    #[must_use]
    pub fn new(settings: WearSettings, vehicles: Box<dyn VehicleSource>, seed: u64) -> Self {
        Self::with_rng(settings, vehicles, SessionRng::from_seed(seed))
    }
}

impl<R: RandomSource> WearEngine<R> {
    #[must_use]
    pub fn with_rng(mut settings: WearSettings, vehicles: Box<dyn VehicleSource>, rng: R) -> Self {
        settings.sanitize();
        Self {
            settings,
            enabled: true,
            clock: TickClock::default(),
            ledger: DamageLedger::new(),
            identity: IdentityCache::new(),
            snapshots: VehicleSnapshotCache::new(),
            speed: SpeedEstimator::new(),
            flip_guard: FlipGuard::new(),
            throttle: FlipThrottle::new(),
            frames: FrameGuard::new(),
            save: SaveSession::new(),
            vehicles,
            rng,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &WearSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, mut settings: WearSettings) {
        settings.sanitize();
        self.settings = settings;
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!("Toggled: {}", if enabled { "ON" } else { "OFF" });
    }

    #[must_use]
    pub const fn clock(&self) -> TickClock {
        self.clock
    }

    #[must_use]
    pub const fn ledger(&self) -> &DamageLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DamageLedger {
        &mut self.ledger
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }

    #[must_use]
    pub const fn snapshots(&self) -> &VehicleSnapshotCache {
        &self.snapshots
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    #[must_use]
    pub const fn legacy_cleanup_pending(&self) -> bool {
        self.save.legacy_cleanup_pending()
    }

    /// Host tick. Advances the tick index and the unscaled clock.
    pub fn on_tick(&mut self, dt_unscaled: f32) {
        self.clock.advance(dt_unscaled);
    }

    /// Whether the host may carry out a switch request.
    pub fn on_switch_requested(
        &mut self,
        junction: &Rc<dyn Junction>,
        mode: SwitchMode,
        _branch: Option<u8>,
    ) -> bool {
        SwitchBlockPolicy {
            enabled: self.enabled,
            settings: &self.settings,
            identity: &mut self.identity,
            ledger: &self.ledger,
        }
        .allow_manual_switch(junction, mode)
    }

    /// A switch was traversed. Only forced run-throughs accrue damage.
    pub fn on_forced_run_through(
        &mut self,
        junction: &Rc<dyn Junction>,
        mode: SwitchMode,
        _branch: u8,
    ) -> Option<RunThroughOutcome> {
        if !self.enabled || !mode.is_forced() {
            return None;
        }
        let mut speed = TickSpeedProbe {
            estimator: &mut self.speed,
            snapshots: &mut self.snapshots,
            source: self.vehicles.as_ref(),
            flip_enabled: self.settings.enable_random_flip,
            frame: self.clock.frame,
            now: self.clock.unscaled,
        };
        DamageAccrual {
            settings: &self.settings,
            identity: &mut self.identity,
            ledger: &mut self.ledger,
            flip_guard: &mut self.flip_guard,
            now: self.clock.unscaled,
        }
        .apply(junction, &mut speed)
    }

    /// Which branch follows `current_track`. Returns `result`, possibly
    /// replaced by a random other outgoing branch at a worn junction.
    pub fn on_branch_query(
        &mut self,
        junction: &Rc<dyn Junction>,
        current_track: TrackId,
        first: bool,
        result: Option<Branch>,
    ) -> Option<Branch> {
        self.evaluate_branch_query(junction, current_track, first, result)
            .override_branch()
            .or(result)
    }

    /// Same as [`Self::on_branch_query`] but reports the full decision.
    pub fn evaluate_branch_query(
        &mut self,
        junction: &Rc<dyn Junction>,
        current_track: TrackId,
        first: bool,
        result: Option<Branch>,
    ) -> FlipDecision {
        if !self.enabled {
            return FlipDecision::Disabled;
        }
        let mut speed = TickSpeedProbe {
            estimator: &mut self.speed,
            snapshots: &mut self.snapshots,
            source: self.vehicles.as_ref(),
            flip_enabled: self.settings.enable_random_flip,
            frame: self.clock.frame,
            now: self.clock.unscaled,
        };
        let mut engine = FlipEngine {
            settings: &self.settings,
            identity: &mut self.identity,
            ledger: &self.ledger,
            flip_guard: &mut self.flip_guard,
            throttle: &mut self.throttle,
            frames: &mut self.frames,
            rng: &mut self.rng,
            frame: self.clock.frame,
            now: self.clock.unscaled,
        };
        let query = BranchQuery {
            current_track,
            first,
        };
        engine
            .evaluate(junction, query, result, &mut speed)
            .unwrap_or_else(|err| {
                warn!("Branch query evaluation failed, keeping original branch: {err}");
                FlipDecision::Failed {
                    reason: err.to_string(),
                }
            })
    }

    /// Write the ledger into the save document. Returns false when the write was skipped.
    pub fn on_save(&mut self, document: &mut SaveDocument) -> bool {
        match self
            .save
            .write(document, &self.ledger, self.settings.logging)
        {
            Ok(()) => true,
            Err(err) => {
                warn!("Save skipped: {err}");
                false
            }
        }
    }

    /// A save game was chosen; its data arrives later.
    pub fn on_load_from_save_selected(&mut self) {
        self.save.schedule_load();
        if self.settings.logging {
            info!("LoadFromSave: legacy save cleanup scheduled.");
        }
    }

    /// Save data became readable. Replaces the ledger once per load.
    pub fn on_save_data_available(&mut self, document: &SaveDocument) -> bool {
        let Some(ledger) = self.save.load_once(document) else {
            return false;
        };
        self.ledger = ledger;
        if self.settings.logging {
            info!("Loaded {} damage entries from savegame.", self.ledger.len());
        }
        true
    }

    /// Fresh session or career: forget all wear and every session cache.
    pub fn on_new_session(&mut self) {
        self.save.reset();
        self.ledger.clear();
        self.identity.clear();
        self.snapshots.clear();
        self.speed.clear();
        self.flip_guard.clear();
        self.throttle.clear();
        self.frames.clear();
        if self.settings.logging {
            info!("New career: junction damage map reset.");
        }
    }

    #[must_use]
    pub fn damage_of(&mut self, junction: &Rc<dyn Junction>) -> f32 {
        let key = self.identity.key_for(junction);
        self.ledger.get(key.as_str())
    }

    /// Repair up to `step01` of a junction's damage; returns the amount repaired.
    pub fn repair(&mut self, junction: &Rc<dyn Junction>, step01: f32) -> f32 {
        let key = self.identity.key_for(junction);
        let repaired = self.ledger.repair(&key, step01);
        if repaired > 0.0 && self.settings.logging {
            info!(
                "Repaired junction {key} by {:.1}% -> {:.3}% remaining.",
                repaired * 100.0,
                self.ledger.get(key.as_str()) * 100.0
            );
        }
        repaired
    }

    /// Log every damaged junction; returns how many were listed.
    pub fn log_damaged(&self) -> usize {
        let mut listed = 0;
        for (key, damage) in self.ledger.damaged() {
            info!("Damaged: {key} -> {:.3}%", damage * 100.0);
            listed += 1;
        }
        listed
    }
}
