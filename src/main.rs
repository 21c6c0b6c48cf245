//! Dining philosophers CLI.
//!
//! Commands:
//! - (none): ask for a scenario number on stdin
//! - scenario: run a preset scenario
//! - run: run a custom configuration

use std::io::{self, BufRead, Write};
use std::process;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dining::config::{DEFAULT_ACTORS, DEFAULT_EAT, DEFAULT_THINK};
use dining::{run_batch, RunConfig, RunReport, Scenario, StopFlag, Strategy, TimeRange};

#[derive(Parser)]
#[command(name = "dining")]
#[command(version)]
#[command(about = "Dining philosophers: naive versus gate-limited fork acquisition")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print each run report as JSON instead of the text summary
    #[arg(long, global = true)]
    json: bool,

    /// Include every philosopher event in the JSON report
    #[arg(long, global = true)]
    capture_events: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a preset scenario (1-4)
    Scenario {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=4))]
        number: u32,
    },

    /// Run a custom configuration
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Number of philosophers
    #[arg(long, env = "DINING_ACTORS", default_value_t = DEFAULT_ACTORS)]
    actors: usize,

    #[arg(long, value_enum, env = "DINING_STRATEGY", default_value_t = Strategy::Naive)]
    strategy: Strategy,

    /// Shortest think time (us)
    #[arg(long, env = "DINING_THINK_MIN", default_value_t = DEFAULT_THINK.min_us)]
    think_min: u64,

    /// Longest think time (us)
    #[arg(long, env = "DINING_THINK_MAX", default_value_t = DEFAULT_THINK.max_us)]
    think_max: u64,

    /// Shortest meal (us)
    #[arg(long, env = "DINING_EAT_MIN", default_value_t = DEFAULT_EAT.min_us)]
    eat_min: u64,

    /// Longest meal (us)
    #[arg(long, env = "DINING_EAT_MAX", default_value_t = DEFAULT_EAT.max_us)]
    eat_max: u64,

    /// Run length in seconds
    #[arg(long, env = "DINING_DURATION", default_value_t = 30)]
    duration: u64,

    /// Philosophers allowed at the table at once (default: actors - 1)
    #[arg(long, env = "DINING_GATE")]
    gate: Option<usize>,

    /// Random seed for think and eat times
    #[arg(long, env = "DINING_SEED")]
    seed: Option<u64>,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        let config = RunConfig::new(self.actors, self.strategy)
            .with_think(TimeRange::micros(self.think_min, self.think_max))
            .with_eat(TimeRange::micros(self.eat_min, self.eat_max))
            .with_duration(Duration::from_secs(self.duration))
            .with_seed(self.seed);
        match self.gate {
            Some(gate) => config.with_gate(gate),
            None => config,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    let configs = match cli.command {
        Some(Commands::Scenario { number }) => scenario_runs(number)?,
        Some(Commands::Run(args)) => vec![args.into_config()],
        None => scenario_runs(prompt_scenario()?)?,
    };

    let stop = StopFlag::new();
    watch_signals(stop.clone())?;

    let json = cli.json;
    let mut print_failed = None;
    run_batch(&configs, &stop, cli.capture_events, |report| {
        let printed = if json {
            print_json(report)
        } else {
            print_summary(report)
        };
        if let Err(e) = printed {
            print_failed.get_or_insert(e);
        }
    })
    .context("simulation failed")?;

    match print_failed {
        Some(e) => Err(e).context("writing report"),
        None => Ok(()),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .compact();
    // keep stdout clean for the JSON reports
    if json {
        builder.with_writer(io::stderr).init();
    } else {
        builder.init();
    }
}

fn prompt_scenario() -> Result<u32> {
    print!("Select scenario (1-4): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading scenario number")?;
    line.trim()
        .parse()
        .with_context(|| format!("invalid scenario {:?}", line.trim()))
}

fn scenario_runs(number: u32) -> Result<Vec<RunConfig>> {
    let scenario = Scenario::from_number(number)?;
    println!("{scenario}");
    Ok(scenario.runs())
}

// First signal ends the current run cleanly; a second one exits at once.
fn watch_signals(stop: StopFlag) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if stop.is_raised() {
                    process::exit(130);
                }
                warn!(signal = sig, "stop requested, wrapping up the current run");
                stop.raise();
            }
        })
        .context("spawning signal thread")?;
    Ok(())
}

fn print_summary(report: &RunReport) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out)?;
    writeln!(
        out,
        "--- MEAL SUMMARY ({} philosophers, {}) ---",
        report.actors, report.strategy
    )?;
    for (seat, meals) in report.meals.iter().enumerate() {
        writeln!(out, "Philosopher {seat} : {meals} meals")?;
    }
    writeln!(
        out,
        "Total {} | min {} | max {} | fairness {:.2}",
        report.total_meals(),
        report.min_meals(),
        report.max_meals(),
        report.fairness()
    )?;
    if report.strategy == Strategy::Limit {
        writeln!(
            out,
            "Gate peak {}/{}",
            report.peak_gate_occupancy, report.gate_capacity
        )?;
    }
    writeln!(
        out,
        "Deadlock detected: {}",
        if report.deadlock_detected { "yes" } else { "no" }
    )?;
    if report.anomalies > 0 {
        writeln!(out, "Anomalies: {}", report.anomalies)?;
    }
    if report.cancelled {
        writeln!(out, "(stopped early after {:.1}s)", report.elapsed.as_secs_f64())?;
    }
    Ok(())
}

fn print_json(report: &RunReport) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)
}
