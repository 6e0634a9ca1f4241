mod reports;
mod runner;
mod scenarios;
mod util;
mod yard;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use junction_wear::WearSettings;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use runner::{ScenarioResult, ScenarioRunner};
use scenarios::{all_scenario_names, get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "junction-wear-tester", version)]
#[command(about = "Headless yard simulator for the junction wear engine")]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file with wear settings; defaults apply when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let settings = load_settings(args.settings.as_ref())?;
    let seeds = parse_seeds(&split_csv(&args.seeds))?;
    let scenarios = expand_scenarios(&args.scenarios);
    info!(
        "running {} scenario(s) over {} seed(s), {} iteration(s) each",
        scenarios.len(),
        seeds.len(),
        args.iterations
    );

    let results = run_scenarios(&args, &settings, &scenarios, &seeds);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🚦 Junction Wear Tester".bright_cyan().bold());
    println!("{}", "=======================".cyan());
}

fn load_settings(path: Option<&PathBuf>) -> Result<WearSettings> {
    let Some(path) = path else {
        return Ok(WearSettings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    WearSettings::from_json(&raw)
        .with_context(|| format!("failed to parse settings {}", path.display()))
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for name in all_scenario_names() {
            if !scenarios.contains(&name) {
                scenarios.push(name);
            }
        }
    }
    scenarios
}

fn run_scenarios(
    args: &Args,
    settings: &WearSettings,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<ScenarioResult> {
    let runner = ScenarioRunner::new(settings, args.verbose);
    let mut results = Vec::new();
    for name in scenarios {
        if let Some(scenario) = get_scenario(name) {
            results.extend(runner.run_scenario(scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    if args.report == "json" {
        if results.is_empty() {
            writeln!(&mut output_target, "[]")?;
        } else {
            reports::generate_json_report(&mut output_target, results)?;
        }
    } else {
        let duration = start_time.elapsed();
        if results.is_empty() {
            writeln!(&mut output_target, "No scenarios executed.")?;
        } else {
            reports::generate_console_report(&mut output_target, results, duration)?;
        }
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        self.writer().flush()
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
