//! Drives one run from configuration to report.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{Deadline, StopFlag};
use crate::config::{RunConfig, Strategy};
use crate::error::{ConfigError, SimulationError};
use crate::events::{Event, EventLog};
use crate::monitor;
use crate::philosopher::Philosopher;
use crate::seat::Seats;
use crate::table::Table;

/// Everything one run shares between its threads. Built fresh per run and
/// borrowed by the philosophers and the monitor, so nothing carries over.
pub struct RunContext {
    pub(crate) config: RunConfig,
    pub(crate) table: Table,
    pub(crate) seats: Seats,
    pub(crate) log: EventLog,
    pub(crate) deadline: Deadline,
    deadlock: AtomicBool,
    anomalies: AtomicUsize,
}

impl RunContext {
    pub(crate) fn new(
        config: RunConfig,
        stop: StopFlag,
        capture: bool,
    ) -> Result<Self, ConfigError> {
        Ok(RunContext {
            table: Table::new(config.actors, config.gate_capacity)?,
            seats: Seats::new(config.actors),
            log: EventLog::new(capture),
            deadline: Deadline::after(config.duration, stop),
            deadlock: AtomicBool::new(false),
            anomalies: AtomicUsize::new(0),
            config,
        })
    }

    /// Flips the deadlock latch. Only the first caller gets `true`.
    pub(crate) fn latch_deadlock(&self) -> bool {
        self.deadlock
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn deadlock_reported(&self) -> bool {
        self.deadlock.load(Ordering::Acquire)
    }

    pub(crate) fn note_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn anomalies(&self) -> usize {
        self.anomalies.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub actors: usize,
    pub strategy: Strategy,
    pub gate_capacity: usize,
    pub meals: Vec<u64>,
    pub deadlock_detected: bool,
    pub peak_gate_occupancy: usize,
    pub forks_held_at_teardown: usize,
    pub anomalies: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

impl RunReport {
    pub fn total_meals(&self) -> u64 {
        self.meals.iter().sum()
    }

    pub fn min_meals(&self) -> u64 {
        self.meals.iter().copied().min().unwrap_or(0)
    }

    pub fn max_meals(&self) -> u64 {
        self.meals.iter().copied().max().unwrap_or(0)
    }

    /// Least-fed over best-fed seat; 1.0 when nobody ate.
    pub fn fairness(&self) -> f64 {
        match self.max_meals() {
            0 => 1.0,
            max => self.min_meals() as f64 / max as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: RunConfig,
    capture: bool,
}

impl Simulation {
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Simulation {
            config,
            capture: false,
        })
    }

    /// Keep every event in the report, not just in the log.
    pub fn capture_events(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn run(&self, stop: &StopFlag) -> Result<RunReport, SimulationError> {
        let config = &self.config;
        info!(
            actors = config.actors,
            strategy = %config.strategy,
            gate = config.gate_capacity,
            think = %config.think,
            eat = %config.eat,
            duration_s = config.duration.as_secs_f64(),
            "starting run"
        );

        let started = Instant::now();
        let ctx = RunContext::new(config.clone(), stop.clone(), self.capture)?;
        dine_all(&ctx)?;
        let report = teardown(&ctx, started);
        info!(
            total_meals = report.total_meals(),
            deadlock = report.deadlock_detected,
            elapsed_s = report.elapsed.as_secs_f64(),
            "run finished"
        );
        Ok(report)
    }
}

/// Runs every philosopher and the monitor on scoped threads until the
/// deadline, then joins them all.
fn dine_all(ctx: &RunContext) -> Result<(), SimulationError> {
    thread::scope(|s| -> Result<(), SimulationError> {
        let mut handles = Vec::with_capacity(ctx.config.actors + 1);
        for seat in 0..ctx.config.actors {
            let name = format!("philosopher-{seat}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn_scoped(s, move || Philosopher::new(ctx, seat).dine())
                .map_err(|source| SimulationError::Spawn { name: name.clone(), source })?;
            handles.push((name, handle));
        }

        let name = "deadlock-monitor".to_string();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn_scoped(s, move || monitor::watch(ctx))
            .map_err(|source| SimulationError::Spawn { name: name.clone(), source })?;
        handles.push((name, handle));

        // join everyone before reporting the first failure
        let mut failed = None;
        for (name, handle) in handles {
            if handle.join().is_err() && failed.is_none() {
                failed = Some(name);
            }
        }
        match failed {
            Some(name) => Err(SimulationError::ThreadPanicked(name)),
            None => Ok(()),
        }
    })
}

fn teardown(ctx: &RunContext, started: Instant) -> RunReport {
    let held = ctx.table.held_forks().unwrap_or_else(|e| {
        warn!(error = %e, "could not inspect forks at teardown");
        Vec::new()
    });
    if !held.is_empty() {
        warn!(forks = ?held, "forks still held at teardown");
    }

    let config = &ctx.config;
    RunReport {
        actors: config.actors,
        strategy: config.strategy,
        gate_capacity: config.gate_capacity,
        meals: ctx.seats.meal_counts(),
        deadlock_detected: ctx.deadlock_reported(),
        peak_gate_occupancy: ctx.table.gate_peak().unwrap_or(0),
        forks_held_at_teardown: held.len(),
        anomalies: ctx.anomalies(),
        elapsed: started.elapsed(),
        cancelled: ctx.deadline.cancelled(),
        events: ctx.log.take(),
    }
}

/// Runs each configuration in turn, each with its own table and counters,
/// handing every report to `on_report` as soon as its run ends. All configs
/// are validated before the first run starts. Stops starting new runs once
/// `stop` is raised.
pub fn run_batch<F>(
    configs: &[RunConfig],
    stop: &StopFlag,
    capture: bool,
    mut on_report: F,
) -> Result<Vec<RunReport>, SimulationError>
where
    F: FnMut(&RunReport),
{
    let sims = configs
        .iter()
        .map(|c| Simulation::new(c.clone()).map(|sim| sim.capture_events(capture)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut reports = Vec::with_capacity(sims.len());
    for sim in sims {
        if stop.is_raised() {
            info!("stop requested, skipping remaining runs");
            break;
        }
        let report = sim.run(stop)?;
        on_report(&report);
        reports.push(report);
    }
    Ok(reports)
}
