//! Preset scenarios offered by the console menu.

use std::fmt;
use std::time::Duration;

use crate::config::{RunConfig, Strategy, TimeRange, DEFAULT_EAT, DEFAULT_THINK};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Naive forks with long meals: meant to lock up.
    Deadlock,
    /// Gate-limited table, watched for starvation.
    Fairness,
    /// Small table with very short holds.
    Robustness,
    /// Gate-limited runs at several table sizes.
    Batch,
}

pub const BATCH_SIZES: [usize; 3] = [2, 7, 12];

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Deadlock,
        Scenario::Fairness,
        Scenario::Robustness,
        Scenario::Batch,
    ];

    pub fn from_number(n: u32) -> Result<Self, ConfigError> {
        match n {
            1 => Ok(Scenario::Deadlock),
            2 => Ok(Scenario::Fairness),
            3 => Ok(Scenario::Robustness),
            4 => Ok(Scenario::Batch),
            other => Err(ConfigError::UnknownScenario(other)),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Scenario::Deadlock => {
                "Scenario 1: Deadlock. 5 philosophers, naive, think <1s, eat 2-3s, 10s"
            }
            Scenario::Fairness => {
                "Scenario 2: Fairness. 5 philosophers, limit, think 1-2s, eat 0.5-1s, 60s"
            }
            Scenario::Robustness => {
                "Scenario 3: Robustness. 3 philosophers, limit, think 50-100ms, eat 100-300ms, 30s"
            }
            Scenario::Batch => {
                "Scenario 4: Table sizes 2, 7 and 12, limit, standard think and eat, 20s each"
            }
        }
    }

    pub fn runs(&self) -> Vec<RunConfig> {
        match self {
            Scenario::Deadlock => vec![RunConfig::new(5, Strategy::Naive)
                .with_think(TimeRange::micros(100_000, 900_000))
                .with_eat(TimeRange::micros(2_000_000, 3_000_000))
                .with_duration(Duration::from_secs(10))],
            Scenario::Fairness => vec![RunConfig::new(5, Strategy::Limit)
                .with_gate(4)
                .with_think(TimeRange::micros(1_000_000, 2_000_000))
                .with_eat(TimeRange::micros(500_000, 1_000_000))
                .with_duration(Duration::from_secs(60))],
            Scenario::Robustness => vec![RunConfig::new(3, Strategy::Limit)
                .with_gate(2)
                .with_think(TimeRange::micros(50_000, 100_000))
                .with_eat(TimeRange::micros(100_000, 300_000))
                .with_duration(Duration::from_secs(30))],
            Scenario::Batch => BATCH_SIZES
                .iter()
                .map(|&n| {
                    RunConfig::new(n, Strategy::Limit)
                        .with_think(DEFAULT_THINK)
                        .with_eat(DEFAULT_EAT)
                        .with_duration(Duration::from_secs(20))
                })
                .collect(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
