//! Damage from trains running through switches set against them.

use std::rc::Rc;

use log::info;

use crate::guards::FlipGuard;
use crate::host::Junction;
use crate::identity::IdentityCache;
use crate::ledger::{DamageLedger, JunctionKey};
use crate::numbers::{damage_tier, tier_to_damage};
use crate::settings::WearSettings;
use crate::speed::SpeedProbe;

/// What one forced run-through did to a junction.
#[derive(Debug, Clone, PartialEq)]
pub struct RunThroughOutcome {
    pub key: JunctionKey,
    pub speed_kmh: f32,
    pub added: f32,
    pub total: f32,
}

pub struct DamageAccrual<'a> {
    pub settings: &'a WearSettings,
    pub identity: &'a mut IdentityCache,
    pub ledger: &'a mut DamageLedger,
    pub flip_guard: &'a mut FlipGuard,
    pub now: f64,
}

impl DamageAccrual<'_> {
    /// Add one percent of damage per full 10 km/h of impact speed and arm the
    /// flip cooldown. Returns `None` when the train was too slow to hurt.
    pub fn apply<S: SpeedProbe + ?Sized>(
        &mut self,
        junction: &Rc<dyn Junction>,
        speed: &mut S,
    ) -> Option<RunThroughOutcome> {
        let speed_kmh = speed.impact_speed_kmh(junction.as_ref());
        let added = tier_to_damage(damage_tier(speed_kmh));
        if added <= 0.0 {
            return None;
        }

        let key = self.identity.key_for(junction);
        let total = self.ledger.add_percent(&key, added);
        self.flip_guard.block(
            &key,
            self.settings.flip_cooldown_after_forced_sec,
            self.now,
        );

        if self.settings.logging {
            info!(
                "FORCED at {key} v={speed_kmh:.1} km/h -> +{:.1}% damage, total {:.3}%",
                added * 100.0,
                total * 100.0
            );
        }
        Some(RunThroughOutcome {
            key,
            speed_kmh,
            added,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WearError;
    use crate::host::{Branch, OutBranches, Vec3};

    struct Named(&'static str);

    impl Junction for Named {
        fn stable_key(&self) -> Result<String, WearError> {
            Ok(self.0.to_string())
        }

        fn position(&self) -> Option<Vec3> {
            Some(Vec3::default())
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

    struct Fixture {
        settings: WearSettings,
        identity: IdentityCache,
        ledger: DamageLedger,
        guard: FlipGuard,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                settings: WearSettings::default(),
                identity: IdentityCache::new(),
                ledger: DamageLedger::new(),
                guard: FlipGuard::new(),
            }
        }

        fn run(&mut self, junction: &Rc<dyn Junction>, kmh: f32) -> Option<RunThroughOutcome> {
            let mut speed = kmh;
            DamageAccrual {
                settings: &self.settings,
                identity: &mut self.identity,
                ledger: &mut self.ledger,
                flip_guard: &mut self.guard,
                now: 100.0,
            }
            .apply(junction, &mut speed)
        }
    }

    #[test]
    fn one_percent_per_full_ten_kmh() {
        let mut fx = Fixture::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));
        let outcome = fx.run(&junction, 47.0).expect("damage applied");
        assert!((outcome.added - 0.04).abs() < 1e-6);
        assert!((fx.ledger.get("J1") - 0.04).abs() < 1e-6);
        fx.run(&junction, 10.0);
        assert!((fx.ledger.get("J1") - 0.05).abs() < 1e-6);
    }

    #[test]
    fn slow_run_through_is_harmless_and_leaves_guard_open() {
        let mut fx = Fixture::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));
        assert!(fx.run(&junction, 9.9).is_none());
        assert!(fx.ledger.is_empty());
        assert!(!fx.guard.is_blocked(&JunctionKey::from("J1"), 100.0));
    }

    #[test]
    fn damage_arms_flip_cooldown() {
        let mut fx = Fixture::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));
        fx.run(&junction, 25.0);
        let key = JunctionKey::from("J1");
        assert!(fx.guard.is_blocked(&key, 102.9));
        assert!(!fx.guard.is_blocked(&key, 103.0));
    }
}
