//! Error types for the simulator.

use thiserror::Error;

/// Rejected run configuration. Reported before any thread is started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a table needs at least one philosopher")]
    NoActors,

    #[error("{which} time range is inverted: min {min_us} us > max {max_us} us")]
    InvertedRange {
        which: &'static str,
        min_us: u64,
        max_us: u64,
    },

    #[error("gate capacity must be at least 1")]
    EmptyGate,

    #[error("gate capacity {capacity} must be below the philosopher count {actors} for the limit strategy")]
    GateTooWide { capacity: usize, actors: usize },

    #[error("run duration must be positive")]
    ZeroDuration,

    #[error("run duration of {0} s is too long")]
    DurationTooLong(u64),

    #[error("invalid scenario {0}, expected 1-4")]
    UnknownScenario(u32),
}

/// Failure of a fork or gate primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("{0} lock poisoned")]
    Poisoned(String),

    #[error("{0} released more often than acquired")]
    OverRelease(String),

    #[error("fork {index} does not exist on a table of {forks}")]
    NoSuchFork { index: usize, forks: usize },
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {0} panicked")]
    ThreadPanicked(String),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
