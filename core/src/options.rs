//! # Options
//!
//! Configuration options for the encoder and the search drivers.

use std::{fmt, time::Duration};

/// Solver-wide configuration options
#[derive(Clone, Copy, Debug)]
pub struct KernelOptions {
    /// Ordering constraints between interchangeable couriers
    pub symmetry_breaking: bool,
    /// How courier capacities are enforced
    pub capacity_encoding: CapacityEncoding,
    /// Overrides the number of route positions per courier
    ///
    /// Defaults to `n - m + 1` (at least 1): since every courier carries at
    /// least one package, no route can be longer than that.
    pub route_horizon: Option<usize>,
}

impl Default for KernelOptions {
    fn default() -> Self {
        KernelOptions {
            symmetry_breaking: true,
            capacity_encoding: CapacityEncoding::default(),
            route_horizon: None,
        }
    }
}

/// The search strategy driving the objective bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SearchStrategy {
    /// Tighten the bound below each model until unsat
    Linear,
    /// Bisect the bound window
    #[default]
    Binary,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::Linear => write!(f, "linear"),
            SearchStrategy::Binary => write!(f, "binary"),
        }
    }
}

/// The encoding enforcing courier capacities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CapacityEncoding {
    /// Sum carrier-masked weights with binary adders and compare
    #[default]
    Adder,
    /// Sequential counter over weight-many repetitions of each carrier
    Counter,
}

impl fmt::Display for CapacityEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityEncoding::Adder => write!(f, "adder"),
            CapacityEncoding::Counter => write!(f, "counter"),
        }
    }
}

/// Limits for a call to [`crate::Solve::solve`]
#[derive(Clone, Copy, Default)]
pub struct Limits {
    /// The wall-clock budget for the whole solve
    pub timeout: Option<Duration>,
    /// The maximum number of oracle calls to make
    pub oracle_calls: Option<usize>,
}

impl Limits {
    /// No limits
    pub fn none() -> Limits {
        Limits {
            timeout: None,
            oracle_calls: None,
        }
    }
}
