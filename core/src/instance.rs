//! # Courier Planning Instances
//!
//! The instance model and the plain-text `.dat` parser: two integers `m` and
//! `n` on their own lines, a line of `m` capacities, a line of `n` package
//! weights, then `n + 1` rows of `n + 1` distances with the depot as the
//! last row and column. Distances may be asymmetric and the diagonal is not
//! assumed to be zero.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use thiserror::Error;

/// Errors from parsing a `.dat` instance file
#[derive(Error, Debug)]
pub enum ParseError {
    /// An underlying IO error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The file ended before the expected record
    #[error("unexpected end of file while reading {0}")]
    UnexpectedEnd(&'static str),
    /// A token could not be parsed as a non-negative integer
    #[error("invalid integer `{token}` in {field}")]
    InvalidInt {
        /// The record being parsed
        field: &'static str,
        /// The offending token
        token: String,
    },
    /// A record has the wrong number of values
    #[error("expected {expected} values for {field}, found {found}")]
    WrongCount {
        /// The record being parsed
        field: &'static str,
        /// The expected value count
        expected: usize,
        /// The found value count
        found: usize,
    },
}

/// An immutable courier planning instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    /// The number of couriers
    pub n_couriers: usize,
    /// The number of packages
    pub n_packages: usize,
    /// The load capacity of each courier
    pub capacities: Vec<usize>,
    /// The weight of each package
    pub weights: Vec<usize>,
    /// The `(n + 1) x (n + 1)` distance matrix, depot last
    pub dists: Vec<Vec<usize>>,
}

impl Instance {
    /// Parses an instance from a `.dat` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Parses an instance from a reader holding `.dat` data
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut lines = reader.lines();
        let n_couriers = parse_line(&mut lines, "courier count", 1)?[0];
        let n_packages = parse_line(&mut lines, "package count", 1)?[0];
        let capacities = parse_line(&mut lines, "capacities", n_couriers)?;
        let weights = parse_line(&mut lines, "weights", n_packages)?;
        let dists = (0..=n_packages)
            .map(|_| parse_line(&mut lines, "distance matrix", n_packages + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Instance {
            n_couriers,
            n_packages,
            capacities,
            weights,
            dists,
        })
    }

    /// The matrix index of the depot
    pub fn depot(&self) -> usize {
        self.n_packages
    }

    /// The distance from one location to another (package indices `0..n`,
    /// depot at `n`)
    pub fn dist(&self, from: usize, to: usize) -> usize {
        self.dists[from][to]
    }

    /// A structural lower bound on the minimax objective
    ///
    /// Every dispatched courier leaves the depot once and returns to it
    /// once, so no route is shorter than the cheapest depot-out leg plus the
    /// cheapest depot-in leg.
    pub fn dist_lower_bound(&self) -> usize {
        let depot = self.depot();
        let out = (0..self.n_packages)
            .map(|to| self.dists[depot][to])
            .min()
            .unwrap_or(0);
        let back = (0..self.n_packages)
            .map(|from| self.dists[from][depot])
            .min()
            .unwrap_or(0);
        out + back
    }

    /// A structural upper bound on any route distance
    ///
    /// A route leaves every location at most once, so its distance is at
    /// most the sum of the per-row maxima of the matrix.
    pub fn dist_upper_bound(&self) -> usize {
        self.dists
            .iter()
            .map(|row| row.iter().copied().max().unwrap_or(0))
            .sum()
    }

    /// The largest courier capacity
    pub fn max_capacity(&self) -> usize {
        self.capacities.iter().copied().max().unwrap_or(0)
    }

    /// The total weight of all packages
    pub fn total_weight(&self) -> usize {
        self.weights.iter().sum()
    }
}

/// Reads the next non-blank line as exactly `expected` integers
fn parse_line<B: BufRead>(
    lines: &mut io::Lines<B>,
    field: &'static str,
    expected: usize,
) -> Result<Vec<usize>, ParseError> {
    let line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(ParseError::UnexpectedEnd(field)),
        }
    };
    let vals = line
        .split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| ParseError::InvalidInt {
                field,
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<usize>, _>>()?;
    if vals.len() != expected {
        return Err(ParseError::WrongCount {
            field,
            expected,
            found: vals.len(),
        });
    }
    Ok(vals)
}
