use colored::Colorize;
use junction_wear::WearSettings;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::scenarios::Scenario;

/// Aggregated result of one scenario against one base seed.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Metrics from the last iteration.
    pub metrics: BTreeMap<String, f64>,
    #[serde(serialize_with = "serialize_millis")]
    pub average_duration: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u128(duration.as_millis())
}

pub struct ScenarioRunner<'a> {
    settings: &'a WearSettings,
    verbose: bool,
}

impl<'a> ScenarioRunner<'a> {
    #[must_use]
    pub const fn new(settings: &'a WearSettings, verbose: bool) -> Self {
        Self { settings, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &Scenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (seed: {seed})",
                        scenario.name.bright_white()
                    );
                }
                self.run_single(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single(&self, scenario: &Scenario, seed: u64, iterations: usize) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut timings = Vec::new();
        let mut metrics = BTreeMap::new();

        for i in 0..iterations {
            let start = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let outcome = scenario.run(self.settings, iteration_seed);
            timings.push(start.elapsed());
            metrics = outcome.metrics;

            if outcome.failures.is_empty() {
                successes += 1;
                if self.verbose {
                    println!("  ✅ Iteration {}/{iterations} passed", i + 1);
                }
            } else {
                for failure in outcome.failures {
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{iterations} failed: {}",
                            i + 1,
                            failure.clone().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): {failure}",
                        i + 1
                    ));
                }
            }
        }

        let average_duration = if timings.is_empty() {
            Duration::ZERO
        } else {
            timings.iter().sum::<Duration>() / u32::try_from(timings.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            metrics,
            average_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::get_scenario;

    #[test]
    fn smoke_passes_for_every_seed() {
        let settings = WearSettings::default();
        let runner = ScenarioRunner::new(&settings, false);
        let scenario = get_scenario("smoke").expect("smoke registered");
        let results = runner.run_scenario(scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert_eq!(result.iterations_run, 2);
        }
        assert_eq!(results[1].seed, 2);
    }

    #[test]
    fn zero_iterations_report_zero_duration() {
        let settings = WearSettings::default();
        let runner = ScenarioRunner::new(&settings, false);
        let scenario = get_scenario("frame-dedup").expect("registered");
        let results = runner.run_scenario(scenario, &[7], 0);
        assert_eq!(results[0].average_duration, Duration::ZERO);
        assert!(results[0].passed);
        assert!(results[0].metrics.is_empty());
    }
}
