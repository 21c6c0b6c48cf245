//! Run configuration.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_ACTORS: usize = 5;
pub const DEFAULT_THINK: TimeRange = TimeRange::micros(1_000_000, 3_000_000);
pub const DEFAULT_EAT: TimeRange = TimeRange::micros(500_000, 1_500_000);
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);

/// How a philosopher gets hold of both forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Left fork, then poll for the right one. Can deadlock.
    Naive,
    /// Enter through the gate, then take left and right. Deadlock-free.
    Limit,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Naive => f.write_str("naive"),
            Strategy::Limit => f.write_str("limit"),
        }
    }
}

/// Inclusive range of hold times, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min_us: u64,
    pub max_us: u64,
}

impl TimeRange {
    pub const fn micros(min_us: u64, max_us: u64) -> Self {
        TimeRange { min_us, max_us }
    }

    pub const fn fixed(us: u64) -> Self {
        TimeRange::micros(us, us)
    }

    /// Uniform draw from `[min, max]`; `min` when the range is empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_us <= self.min_us {
            return Duration::from_micros(self.min_us);
        }
        Duration::from_micros(rng.gen_range(self.min_us..=self.max_us))
    }

    fn check(&self, which: &'static str) -> Result<(), ConfigError> {
        if self.min_us > self.max_us {
            return Err(ConfigError::InvertedRange {
                which,
                min_us: self.min_us,
                max_us: self.max_us,
            });
        }
        Ok(())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} us", self.min_us, self.max_us)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub actors: usize,
    pub strategy: Strategy,
    pub think: TimeRange,
    pub eat: TimeRange,
    pub gate_capacity: usize,
    pub duration: Duration,
    pub seed: Option<u64>,
}

/// One less than the number of philosophers, but never an empty gate.
pub fn default_gate(actors: usize) -> usize {
    actors.saturating_sub(1).max(1)
}

impl RunConfig {
    pub fn new(actors: usize, strategy: Strategy) -> Self {
        RunConfig {
            actors,
            strategy,
            think: DEFAULT_THINK,
            eat: DEFAULT_EAT,
            gate_capacity: default_gate(actors),
            duration: DEFAULT_DURATION,
            seed: None,
        }
    }

    pub fn with_think(mut self, think: TimeRange) -> Self {
        self.think = think;
        self
    }

    pub fn with_eat(mut self, eat: TimeRange) -> Self {
        self.eat = eat;
        self
    }

    pub fn with_gate(mut self, capacity: usize) -> Self {
        self.gate_capacity = capacity;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// The limit strategy is only deadlock-free while fewer philosophers than
    /// seats can be inside the gate, so `gate_capacity <= actors - 1` is
    /// enforced here rather than by the philosophers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actors == 0 {
            return Err(ConfigError::NoActors);
        }
        self.think.check("think")?;
        self.eat.check("eat")?;
        if self.gate_capacity == 0 {
            return Err(ConfigError::EmptyGate);
        }
        if self.strategy == Strategy::Limit && self.gate_capacity >= self.actors {
            return Err(ConfigError::GateTooWide {
                capacity: self.gate_capacity,
                actors: self.actors,
            });
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if Instant::now().checked_add(self.duration).is_none() {
            return Err(ConfigError::DurationTooLong(self.duration.as_secs()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new(DEFAULT_ACTORS, Strategy::Naive);
        assert_eq!(config.gate_capacity, 4);
        assert_eq!(config.duration, Duration::from_secs(30));
        assert_eq!(config.think, TimeRange::micros(1_000_000, 3_000_000));
        assert_eq!(config.eat, TimeRange::micros(500_000, 1_500_000));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_default_gate_never_empty() {
        assert_eq!(default_gate(0), 1);
        assert_eq!(default_gate(1), 1);
        assert_eq!(default_gate(2), 1);
        assert_eq!(default_gate(12), 11);
    }

    #[test]
    fn test_rejects_zero_actors() {
        let config = RunConfig::new(0, Strategy::Naive);
        assert_eq!(config.validate(), Err(ConfigError::NoActors));
    }

    #[test]
    fn test_rejects_wide_gate_for_limit() {
        let config = RunConfig::new(5, Strategy::Limit).with_gate(5);
        assert_eq!(
            config.validate(),
            Err(ConfigError::GateTooWide {
                capacity: 5,
                actors: 5
            })
        );
        // the naive strategy never enters the gate
        let config = RunConfig::new(5, Strategy::Naive).with_gate(5);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_limit_needs_two_seats() {
        let config = RunConfig::new(1, Strategy::Limit);
        assert_eq!(
            config.validate(),
            Err(ConfigError::GateTooWide {
                capacity: 1,
                actors: 1
            })
        );
        assert_eq!(RunConfig::new(1, Strategy::Naive).validate(), Ok(()));
    }

    #[test]
    fn test_rejects_empty_gate() {
        let config = RunConfig::new(5, Strategy::Limit).with_gate(0);
        assert_eq!(config.validate(), Err(ConfigError::EmptyGate));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let config = RunConfig::new(5, Strategy::Limit).with_eat(TimeRange::micros(10, 5));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange {
                which: "eat",
                min_us: 10,
                max_us: 5
            })
        );
    }

    #[test]
    fn test_rejects_zero_duration() {
        let config = RunConfig::new(5, Strategy::Limit).with_duration(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration));
    }

    #[test]
    fn test_rejects_unrepresentable_duration() {
        let config = RunConfig::new(2, Strategy::Limit).with_duration(Duration::from_secs(u64::MAX));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DurationTooLong(u64::MAX))
        );
        // a long but ordinary run is fine
        let config = config.with_duration(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_fixed_range() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            TimeRange::fixed(100_000).sample(&mut rng),
            Duration::from_millis(100)
        );
        assert_eq!(TimeRange::fixed(0).sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(serde_json::to_string(&Strategy::Limit).unwrap(), "\"limit\"");
        let s: Strategy = serde_json::from_str("\"naive\"").unwrap();
        assert_eq!(s, Strategy::Naive);
    }

    mod prop {
        use super::*;
        use crate::config::Strategy;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sample_stays_in_range(min in 0u64..5_000_000, span in 0u64..5_000_000, seed in any::<u64>()) {
                let range = TimeRange::micros(min, min + span);
                let mut rng = StdRng::seed_from_u64(seed);
                let d = range.sample(&mut rng);
                prop_assert!(d >= Duration::from_micros(min));
                prop_assert!(d <= Duration::from_micros(min + span));
            }

            #[test]
            fn default_gate_is_valid_for_limit(actors in 2usize..100) {
                let config = RunConfig::new(actors, Strategy::Limit);
                prop_assert_eq!(config.validate(), Ok(()));
            }
        }
    }
}
