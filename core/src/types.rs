//! # Types
//!
//! The result record shared between the search drivers and the front end.

use serde::{Serialize, Serializer};

/// The outcome of one solve, in the shape the surrounding tooling consumes
///
/// `sol` holds one ordered, 1-indexed package list per courier; the depot is
/// implicit at both ends of every route. `obj` is `None` when no solution
/// was found within the budget, which serializes as `"N/A"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Elapsed whole seconds, capped at the configured timeout
    pub time: u64,
    /// Whether the reported objective is proven optimal
    pub optimal: bool,
    /// The realized maximum route distance
    #[serde(serialize_with = "obj_or_na")]
    pub obj: Option<usize>,
    /// One route per courier
    pub sol: Vec<Vec<usize>>,
}

impl RunResult {
    /// The record reported when no solution was found
    pub fn unsolved(time: u64) -> Self {
        RunResult {
            time,
            optimal: false,
            obj: None,
            sol: vec![],
        }
    }
}

fn obj_or_na<S: Serializer>(obj: &Option<usize>, ser: S) -> Result<S::Ok, S::Error> {
    match obj {
        Some(val) => ser.serialize_u64(*val as u64),
        None => ser.serialize_str("N/A"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsolved_serializes_na() {
        let res = RunResult::unsolved(300);
        let json = serde_json::to_string(&res).unwrap();
        assert_eq!(json, r#"{"time":300,"optimal":false,"obj":"N/A","sol":[]}"#);
    }

    #[test]
    fn solved_serializes_routes() {
        let res = RunResult {
            time: 2,
            optimal: true,
            obj: Some(12),
            sol: vec![vec![3, 1], vec![2]],
        };
        let json = serde_json::to_string(&res).unwrap();
        assert_eq!(
            json,
            r#"{"time":2,"optimal":true,"obj":12,"sol":[[3,1],[2]]}"#
        );
    }
}
