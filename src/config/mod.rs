//! Matcher configuration.
//!
//! [`MatchConfig`] carries every tunable of a match run. It can be built in
//! code, deserialised with `serde`, or read from `TRAJMATCH_*` environment
//! variables (optionally through a `.env` file) with [`MatchConfig::from_env`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

#[cfg(test)]
mod test;

pub const ENV_PREFIX: &str = "TRAJMATCH_";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be strictly positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("worker count must be -1 (all cores) or at least 1, got {0}")]
    InvalidWorkers(isize),

    #[error("could not parse environment variable {key}={value}")]
    Environment { key: String, value: String },

    #[error("could not start {workers} worker threads: {reason}")]
    ThreadPool { workers: usize, reason: String },
}

/// What to do with samples that have no road candidate within the search radius.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Drop the sample and let the transition bridge its retained neighbours.
    #[default]
    Bridge,
    /// Bridge short gaps, start a new segment after long ones.
    Split,
    /// Bridge short gaps, fail the trajectory on long ones.
    Terminate,
}

/// What the decoder does when no transition into a time step is reachable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPolicy {
    #[default]
    Restart,
    Fail,
}

/// The scale parameter of the transition distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaPolicy {
    /// The same β for every trajectory.
    Fixed(f64),
    /// β grows with the mean sampling interval of the trajectory,
    /// `β = β₁ × mean interval`.
    PerSecond(f64),
}

impl Default for BetaPolicy {
    fn default() -> Self {
        BetaPolicy::Fixed(5.0)
    }
}

impl BetaPolicy {
    fn value(&self) -> f64 {
        match self {
            BetaPolicy::Fixed(beta) | BetaPolicy::PerSecond(beta) => *beta,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[default]
    Grid,
    RTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub kind: IndexKind,
    /// Average number of segments per grid cell.
    pub cell_capacity: usize,
    /// Register grid segments in every cell their envelope overlaps,
    /// instead of only the cell holding their midpoint.
    pub replicate_boundary: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            kind: IndexKind::Grid,
            cell_capacity: 16,
            replicate_boundary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidate search radius, in metres.
    pub search_radius: f64,
    /// Standard deviation of GPS noise, in metres.
    pub sigma: f64,
    pub beta: BetaPolicy,
    /// Largest straight-line span, in metres, a gap may cover and still be
    /// bridged under [`GapPolicy::Split`] and [`GapPolicy::Terminate`].
    pub max_gap_extension: f64,
    /// Number of ranked alternative matches to keep.
    pub rank_length: usize,
    /// Worker threads for batch matching, `-1` for every available core.
    pub workers: isize,
    pub gap_policy: GapPolicy,
    pub break_policy: BreakPolicy,
    /// Closest candidates kept per sample.
    pub max_candidates: usize,
    /// Speed, in metres per second, bounding the route search between samples.
    pub max_speed: f64,
    /// Multiple of the straight-line distance bounding the route search.
    pub route_factor: f64,
    /// Way traversals settled per route search before giving up.
    pub max_expansions: usize,
    /// Extra metres charged for turning back onto the way just left.
    pub u_turn_penalty: f64,
    /// Time steps the online decoder keeps before committing.
    pub online_window: usize,
    pub index: IndexConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            search_radius: 50.0,
            sigma: 10.0,
            beta: BetaPolicy::default(),
            max_gap_extension: 15.0,
            rank_length: 1,
            workers: -1,
            gap_policy: GapPolicy::Bridge,
            break_policy: BreakPolicy::Restart,
            max_candidates: 25,
            max_speed: 50.0,
            route_factor: 8.0,
            max_expansions: 10_000,
            u_turn_penalty: 0.0,
            online_window: 16,
            index: IndexConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn non_zero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

/// Resolves a configured worker count, where `-1` means every core the
/// platform reports.
pub fn resolve_workers(workers: isize) -> Result<usize, ConfigError> {
    match workers {
        -1 => Ok(std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)),
        n if n >= 1 => Ok(n as usize),
        n => Err(ConfigError::InvalidWorkers(n)),
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("search_radius", self.search_radius)?;
        positive("sigma", self.sigma)?;
        positive("beta", self.beta.value())?;
        non_negative("max_gap_extension", self.max_gap_extension)?;
        non_zero("rank_length", self.rank_length)?;
        resolve_workers(self.workers)?;
        non_zero("max_candidates", self.max_candidates)?;
        positive("max_speed", self.max_speed)?;
        positive("route_factor", self.route_factor)?;
        non_zero("max_expansions", self.max_expansions)?;
        non_negative("u_turn_penalty", self.u_turn_penalty)?;
        non_zero("online_window", self.online_window)?;
        non_zero("index.cell_capacity", self.index.cell_capacity)?;

        Ok(())
    }

    /// Builds a configuration from the defaults, overridden by any
    /// `TRAJMATCH_*` variable present in the environment or in a `.env` file.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `TRAJMATCH_SEARCH_RADIUS` | [`search_radius`](Self::search_radius) |
    /// | `TRAJMATCH_SIGMA` | [`sigma`](Self::sigma) |
    /// | `TRAJMATCH_BETA` | [`BetaPolicy::Fixed`] |
    /// | `TRAJMATCH_BETA_PER_SECOND` | [`BetaPolicy::PerSecond`] |
    /// | `TRAJMATCH_MAX_GAP_EXTENSION` | [`max_gap_extension`](Self::max_gap_extension) |
    /// | `TRAJMATCH_RANK_LENGTH` | [`rank_length`](Self::rank_length) |
    /// | `TRAJMATCH_WORKERS` | [`workers`](Self::workers) |
    /// | `TRAJMATCH_GAP_POLICY` | `bridge`, `split` or `terminate` |
    /// | `TRAJMATCH_BREAK_POLICY` | `restart` or `fail` |
    /// | `TRAJMATCH_MAX_CANDIDATES` | [`max_candidates`](Self::max_candidates) |
    /// | `TRAJMATCH_MAX_SPEED` | [`max_speed`](Self::max_speed) |
    /// | `TRAJMATCH_ROUTE_FACTOR` | [`route_factor`](Self::route_factor) |
    /// | `TRAJMATCH_MAX_EXPANSIONS` | [`max_expansions`](Self::max_expansions) |
    /// | `TRAJMATCH_U_TURN_PENALTY` | [`u_turn_penalty`](Self::u_turn_penalty) |
    /// | `TRAJMATCH_ONLINE_WINDOW` | [`online_window`](Self::online_window) |
    /// | `TRAJMATCH_INDEX` | `grid` or `rtree` |
    /// | `TRAJMATCH_CELL_CAPACITY` | [`IndexConfig::cell_capacity`] |
    /// | `TRAJMATCH_REPLICATE_BOUNDARY` | [`IndexConfig::replicate_boundary`] |
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment overrides from {}", path.display());
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// As [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = MatchConfig::default();
        let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        override_with(&mut config.search_radius, "SEARCH_RADIUS", &read)?;
        override_with(&mut config.sigma, "SIGMA", &read)?;
        override_with(&mut config.max_gap_extension, "MAX_GAP_EXTENSION", &read)?;
        override_with(&mut config.rank_length, "RANK_LENGTH", &read)?;
        override_with(&mut config.workers, "WORKERS", &read)?;
        override_with(&mut config.gap_policy, "GAP_POLICY", &read)?;
        override_with(&mut config.break_policy, "BREAK_POLICY", &read)?;
        override_with(&mut config.max_candidates, "MAX_CANDIDATES", &read)?;
        override_with(&mut config.max_speed, "MAX_SPEED", &read)?;
        override_with(&mut config.route_factor, "ROUTE_FACTOR", &read)?;
        override_with(&mut config.max_expansions, "MAX_EXPANSIONS", &read)?;
        override_with(&mut config.u_turn_penalty, "U_TURN_PENALTY", &read)?;
        override_with(&mut config.online_window, "ONLINE_WINDOW", &read)?;
        override_with(&mut config.index.kind, "INDEX", &read)?;
        override_with(&mut config.index.cell_capacity, "CELL_CAPACITY", &read)?;
        override_with(&mut config.index.replicate_boundary, "REPLICATE_BOUNDARY", &read)?;

        let mut beta: Option<f64> = None;
        override_with(&mut beta, "BETA", &read)?;
        if let Some(beta) = beta {
            config.beta = BetaPolicy::Fixed(beta);
        }

        let mut per_second: Option<f64> = None;
        override_with(&mut per_second, "BETA_PER_SECOND", &read)?;
        if let Some(beta) = per_second {
            config.beta = BetaPolicy::PerSecond(beta);
        }

        config.validate()?;
        Ok(config)
    }
}

trait Overridable: Sized {
    fn parse_from(value: &str) -> Option<Self>;
}

macro_rules! overridable {
    ($($ty:ty),*) => {
        $(impl Overridable for $ty {
            fn parse_from(value: &str) -> Option<Self> {
                value.trim().parse().ok()
            }
        })*
    };
}

overridable!(f64, usize, isize, bool, GapPolicy, BreakPolicy, IndexKind);

impl<T: Overridable> Overridable for Option<T> {
    fn parse_from(value: &str) -> Option<Self> {
        T::parse_from(value).map(Some)
    }
}

fn override_with<T: Overridable>(
    field: &mut T,
    name: &str,
    read: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let Some(value) = read(name) else {
        return Ok(());
    };

    *field = T::parse_from(&value).ok_or_else(|| ConfigError::Environment {
        key: format!("{ENV_PREFIX}{name}"),
        value,
    })?;

    Ok(())
}

macro_rules! keyword {
    ($ty:ty { $($text:literal => $variant:expr),* $(,)? }) => {
        impl FromStr for $ty {
            type Err = ();

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)*
                    _ => Err(()),
                }
            }
        }
    };
}

keyword!(GapPolicy {
    "bridge" => GapPolicy::Bridge,
    "split" => GapPolicy::Split,
    "terminate" => GapPolicy::Terminate,
});

keyword!(BreakPolicy {
    "restart" => BreakPolicy::Restart,
    "fail" => BreakPolicy::Fail,
});

keyword!(IndexKind {
    "grid" => IndexKind::Grid,
    "rtree" => IndexKind::RTree,
});
