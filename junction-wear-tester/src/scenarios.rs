//! Named yard scenarios and their expectations.

use std::collections::BTreeMap;

use junction_wear::constants::{LEGACY_SAVE_KEY, RUINED_DAMAGE, SAVE_KEY};
use junction_wear::{FlipDecision, JunctionKey, WearEngine, WearSettings};
use log::debug;
use serde_json::json;

use crate::yard::SimYard;

/// Outcome of one scenario run for one seed.
#[derive(Debug, Default)]
pub struct ScenarioOutcome {
    pub failures: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl ScenarioOutcome {
    fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.failures.push(message());
        }
    }

    fn metric(&mut self, name: &str, value: impl Into<f64>) {
        self.metrics.insert(name.to_string(), value.into());
    }
}

type ScenarioFn = fn(&WearSettings, u64) -> ScenarioOutcome;

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl Scenario {
    #[must_use]
    pub fn run(&self, settings: &WearSettings, seed: u64) -> ScenarioOutcome {
        debug!("running scenario {} with seed {seed}", self.name);
        (self.run)(settings, seed)
    }
}

const CATALOG: &[Scenario] = &[
    Scenario {
        name: "smoke",
        description: "Run-throughs accrue damage and switching stays available",
        run: smoke,
    },
    Scenario {
        name: "runthrough-damage",
        description: "Damage follows one percent per full 10 km/h",
        run: runthrough_damage,
    },
    Scenario {
        name: "ruined-junction",
        description: "Fully worn junctions refuse manual switching but not run-throughs",
        run: ruined_junction,
    },
    Scenario {
        name: "flip-rate",
        description: "Observed mis-routing rate matches damage x multiplier",
        run: flip_rate,
    },
    Scenario {
        name: "frame-dedup",
        description: "Repeated branch queries within one tick roll once",
        run: frame_dedup,
    },
    Scenario {
        name: "save-roundtrip",
        description: "Ledger survives save/load and the legacy entry is dropped once",
        run: save_roundtrip,
    },
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG
        .iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<&'static Scenario> {
    CATALOG.iter().find(|scenario| scenario.name == name)
}

#[must_use]
pub fn all_scenario_names() -> Vec<String> {
    CATALOG.iter().map(|s| s.name.to_string()).collect()
}

fn smoke(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::default();
    let mut yard = SimYard::new(settings.clone(), seed, 2);
    for _ in 0..10 {
        yard.run_through(0, 55.0);
    }
    let damage = yard.engine.ledger().get(&junction_key(&yard, 0));
    outcome.metric("damage_pct", damage * 100.0);
    outcome.metric("junctions", u32::try_from(yard.junction_count()).unwrap_or(u32::MAX));
    outcome.metric("vehicles", u32::try_from(yard.vehicle_count()).unwrap_or(u32::MAX));
    if settings.enable_random_flip {
        outcome.check((damage - 0.5).abs() < 1e-4, || {
            format!("expected 50% damage after ten 55 km/h run-throughs, got {:.3}%", damage * 100.0)
        });
    }
    outcome.check(yard.manual_switch(0), || {
        "manual switch refused on a half-worn junction".to_string()
    });
    outcome.check(yard.engine.ledger().get(&junction_key(&yard, 1)) <= 0.0, || {
        "untouched junction picked up damage".to_string()
    });
    outcome
}

fn runthrough_damage(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::default();
    let settings = WearSettings {
        enable_random_flip: true,
        ..settings.clone()
    };
    let mut yard = SimYard::new(settings, seed, 1);
    let mut expected = 0_i32;
    // Speeds sit mid-bucket so the km/h -> m/s -> km/h trip cannot cross a tier edge.
    for kmh in [5.0_f32, 9.5, 10.5, 15.0, 27.0, 85.0] {
        let tier = junction_wear::numbers::damage_tier(kmh).max(0);
        expected += tier;
        let applied = yard.run_through(0, kmh);
        outcome.check(applied.is_some() == (tier > 0), || {
            format!("run-through at {kmh} km/h: expected tier {tier}, got {applied:?}")
        });
    }
    let damage = yard.engine.ledger().get(&junction_key(&yard, 0));
    let expected_damage = f64::from(expected) / 100.0;
    outcome.metric("damage_pct", damage * 100.0);
    outcome.check((f64::from(damage) - expected_damage).abs() < 1e-4, || {
        format!("expected {expected}% cumulative damage, got {:.3}%", damage * 100.0)
    });
    outcome
}

fn ruined_junction(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::default();
    let settings = WearSettings {
        block_manual_switch_at_full_damage: true,
        enable_random_flip: true,
        ..settings.clone()
    };
    let mut yard = SimYard::new(settings, seed, 1);
    let mut run_throughs = 0_u32;
    while yard.engine.ledger().get(&junction_key(&yard, 0)) < RUINED_DAMAGE && run_throughs < 50 {
        yard.run_through(0, 105.0);
        run_throughs += 1;
    }
    outcome.metric("run_throughs_to_ruin", run_throughs);
    outcome.check(run_throughs == 10, || {
        format!("expected 10 run-throughs at 105 km/h to ruin a junction, took {run_throughs}")
    });
    outcome.check(!yard.manual_switch(0), || {
        "manual switch allowed on a ruined junction".to_string()
    });
    outcome.check(yard.run_through(0, 105.0).is_some(), || {
        "forced run-through blocked on a ruined junction".to_string()
    });
    outcome
}

fn flip_rate(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    const TRAINS: u32 = 2_000;
    let mut outcome = ScenarioOutcome::default();
    let settings = WearSettings {
        enable_random_flip: true,
        ..settings.clone()
    };
    let multiplier = settings.effective_flip_multiplier();
    let mut yard = SimYard::new(settings, seed, 1);
    let key = JunctionKey::new(junction_key(&yard, 0));
    yard.engine.ledger_mut().set(&key, 1.0);

    let mut flips = 0_u32;
    for _ in 0..TRAINS {
        let (_, decisions) = yard.diverge(0, 60.0, 1);
        if decisions.iter().any(|d| matches!(d, FlipDecision::Flipped { .. })) {
            flips += 1;
        }
    }
    let observed = f64::from(flips) / f64::from(TRAINS);
    // Two outgoing branches: a roll succeeds with `multiplier`, then all eight picks may collide.
    let expected = f64::from(multiplier) * (1.0 - 0.5_f64.powi(8));
    outcome.metric("flip_rate", observed);
    outcome.metric("expected_rate", expected);
    outcome.check((observed - expected).abs() < 0.05, || {
        format!("flip rate {observed:.3} too far from expected {expected:.3}")
    });
    outcome
}

fn frame_dedup(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::default();
    let settings = WearSettings {
        enable_random_flip: true,
        ..settings.clone()
    };
    let mut yard = SimYard::new(settings, seed, 1);
    let key = JunctionKey::new(junction_key(&yard, 0));
    yard.engine.ledger_mut().set(&key, 1.0);

    let mut duplicates = 0_u32;
    for _ in 0..100 {
        let (_, decisions) = yard.diverge(0, 60.0, 4);
        duplicates += u32::try_from(
            decisions
                .iter()
                .filter(|d| **d == FlipDecision::Duplicate)
                .count(),
        )
        .unwrap_or(u32::MAX);
        outcome.check(decisions.first() != Some(&FlipDecision::Duplicate), || {
            "first query of a tick was treated as a duplicate".to_string()
        });
    }
    outcome.metric("duplicates", duplicates);
    outcome.check(duplicates == 300, || {
        format!("expected 300 deduplicated queries, saw {duplicates}")
    });
    outcome
}

fn save_roundtrip(settings: &WearSettings, seed: u64) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::default();
    let mut yard = SimYard::new(settings.clone(), seed, 4);
    let key = JunctionKey::new(junction_key(&yard, 0));
    yard.engine.ledger_mut().set(&key, 0.42);
    let key = JunctionKey::new(junction_key(&yard, 3));
    yard.engine.ledger_mut().set(&key, 1.0);
    yard.document
        .insert(LEGACY_SAVE_KEY.to_string(), json!([["junction-000@0", 0.9]]));

    yard.engine.on_load_from_save_selected();
    outcome.check(yard.save(), || "save skipped".to_string());
    outcome.check(!yard.document.contains_key(LEGACY_SAVE_KEY), || {
        "legacy entry survived the first save after load".to_string()
    });
    yard.document
        .insert(LEGACY_SAVE_KEY.to_string(), json!([]));
    yard.save();
    outcome.check(yard.document.contains_key(LEGACY_SAVE_KEY), || {
        "legacy cleanup ran twice in one load".to_string()
    });

    let mut restored = WearEngine::new(settings.clone(), Box::new(EmptyFleet), seed);
    restored.on_load_from_save_selected();
    restored.on_save_data_available(&yard.document);
    outcome.check(restored.ledger() == yard.engine.ledger(), || {
        format!(
            "restored ledger {:?} differs from saved {:?}",
            restored.ledger().all(),
            yard.engine.ledger().all()
        )
    });
    outcome.metric("saved_entries", u32::try_from(restored.ledger().len()).unwrap_or(u32::MAX));
    outcome.check(yard.document.contains_key(SAVE_KEY), || {
        format!("save document lacks '{SAVE_KEY}'")
    });
    outcome
}

struct EmptyFleet;

impl junction_wear::VehicleSource for EmptyFleet {
    fn live_vehicles(&self) -> Option<Vec<std::rc::Weak<dyn junction_wear::Vehicle>>> {
        None
    }
}

fn junction_key(yard: &SimYard, index: usize) -> String {
    yard.junction(index)
        .stable_key()
        .unwrap_or_else(|_| junction_wear::constants::FALLBACK_JUNCTION_KEY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_passes_with_defaults() {
        let settings = WearSettings::default();
        for (name, _) in list_scenarios() {
            let scenario = get_scenario(name).expect("catalogued");
            let outcome = scenario.run(&settings, 1337);
            assert!(outcome.failures.is_empty(), "{name}: {:?}", outcome.failures);
        }
    }

    #[test]
    fn unknown_scenario_is_none() {
        assert!(get_scenario("does-not-exist").is_none());
        assert_eq!(all_scenario_names().len(), list_scenarios().len());
    }
}
