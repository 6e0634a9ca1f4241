//! Manual switching gate for fully worn junctions.

use std::rc::Rc;

use log::info;

use crate::constants::RUINED_DAMAGE;
use crate::host::{Junction, SwitchMode};
use crate::identity::IdentityCache;
use crate::ledger::DamageLedger;
use crate::settings::WearSettings;

/// Decides whether a switch request may proceed.
pub struct SwitchBlockPolicy<'a> {
    pub enabled: bool,
    pub settings: &'a WearSettings,
    pub identity: &'a mut IdentityCache,
    pub ledger: &'a DamageLedger,
}

impl SwitchBlockPolicy<'_> {
    /// Denies only non-forced requests at a ruined junction while blocking is
    /// on. Forced run-throughs always pass so their damage still accrues.
    pub fn allow_manual_switch(&mut self, junction: &Rc<dyn Junction>, mode: SwitchMode) -> bool {
        if !self.enabled || !self.settings.block_manual_switch_at_full_damage {
            return true;
        }
        if mode.is_forced() {
            return true;
        }
        let key = self.identity.key_for(junction);
        let damage = self.ledger.get(key.as_str());
        if damage >= RUINED_DAMAGE {
            if self.settings.logging {
                info!("Blocked manual switch at fully damaged junction {key} (mode={mode:?}).");
            }
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WearError;
    use crate::host::{Branch, OutBranches, Vec3};
    use crate::ledger::JunctionKey;

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

    fn ledger_with(key: &str, damage: f32) -> DamageLedger {
        [(JunctionKey::from(key), damage)].into_iter().collect()
    }

    #[test]
    fn ruined_junction_blocks_manual_but_not_forced() {
        let settings = WearSettings::default();
        let ledger = ledger_with("J1", 1.0);
        let mut identity = IdentityCache::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));
        let mut policy = SwitchBlockPolicy {
            enabled: true,
            settings: &settings,
            identity: &mut identity,
            ledger: &ledger,
        };
        assert!(!policy.allow_manual_switch(&junction, SwitchMode::Manual));
        assert!(!policy.allow_manual_switch(&junction, SwitchMode::Silent));
        assert!(policy.allow_manual_switch(&junction, SwitchMode::Forced));
    }

    #[test]
    fn threshold_is_inclusive_at_ruin_level() {
        let settings = WearSettings::default();
        let mut identity = IdentityCache::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));

        let worn = ledger_with("J1", 0.998);
        let mut policy = SwitchBlockPolicy {
            enabled: true,
            settings: &settings,
            identity: &mut identity,
            ledger: &worn,
        };
        assert!(policy.allow_manual_switch(&junction, SwitchMode::Manual));

        let ruined = ledger_with("J1", 0.999);
        policy.ledger = &ruined;
        assert!(!policy.allow_manual_switch(&junction, SwitchMode::Manual));
    }

    #[test]
    fn disabled_feature_or_system_always_allows() {
        let ledger = ledger_with("J1", 1.0);
        let mut identity = IdentityCache::new();
        let junction: Rc<dyn Junction> = Rc::new(Named("J1"));

        let off = WearSettings {
            block_manual_switch_at_full_damage: false,
            ..WearSettings::default()
        };
        let mut policy = SwitchBlockPolicy {
            enabled: true,
            settings: &off,
            identity: &mut identity,
            ledger: &ledger,
        };
        assert!(policy.allow_manual_switch(&junction, SwitchMode::Manual));

        let on = WearSettings::default();
        policy.settings = &on;
        policy.enabled = false;
        assert!(policy.allow_manual_switch(&junction, SwitchMode::Manual));
    }
}
