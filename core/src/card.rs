//! # Cardinality Encodings
//!
//! At-least-one, at-most-one, exactly-one and at-most-k constraints over
//! literal lists. At-most-one switches between the pairwise encoding and the
//! sequential ladder depending on the input size; at-most-k is the
//! sequential counter of \[1\]. The choice of encoding never changes
//! semantics, only the clause/variable trade-off.
//!
//! A weighted bound can be expressed through [`at_most_k`] by repeating a
//! literal weight-many times in the input list: every repetition advances
//! the counter once more.
//!
//! ## References
//!
//! - \[1\] Carsten Sinz: _Towards an Optimal CNF Encoding of Boolean
//!     Cardinality Constraints_, CP 2005.

use rustsat::{
    clause, encodings::CollectClauses, instances::ManageVars, types::Lit, OutOfMemory,
};

/// Input size up to which at-most-one stays pairwise
///
/// At this size the pairwise encoding needs ten clauses and no variables,
/// the ladder nine clauses and four variables.
const PAIRWISE_LIMIT: usize = 5;

/// Enforces that at least one of `lits` is true
pub fn at_least_one<Col>(lits: &[Lit], collector: &mut Col) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    collector.add_clause(lits.iter().copied().collect())
}

/// Enforces that at most one of `lits` is true
///
/// Pairwise negated conjunctions for short inputs, the sequential ladder
/// with `|lits| - 1` chain variables beyond [`PAIRWISE_LIMIT`].
pub fn at_most_one<Col>(
    lits: &[Lit],
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    if lits.len() <= PAIRWISE_LIMIT {
        for (idx, &a) in lits.iter().enumerate() {
            for &b in &lits[idx + 1..] {
                collector.add_clause(clause![!a, !b])?;
            }
        }
        return Ok(());
    }
    let n = lits.len();
    let chain: Vec<Lit> = (0..n - 1).map(|_| var_manager.new_lit()).collect();
    collector.add_clause(clause![!lits[0], chain[0]])?;
    collector.add_clause(clause![!lits[n - 1], !chain[n - 2]])?;
    for idx in 1..n - 1 {
        collector.add_clause(clause![!lits[idx], chain[idx]])?;
        collector.add_clause(clause![!lits[idx], !chain[idx - 1]])?;
        collector.add_clause(clause![!chain[idx - 1], chain[idx]])?;
    }
    Ok(())
}

/// Enforces that exactly one of `lits` is true
pub fn exactly_one<Col>(
    lits: &[Lit],
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    at_least_one(lits, collector)?;
    at_most_one(lits, collector, var_manager)
}

/// Enforces that at most `k` of `lits` are true
///
/// For `k = 0` every literal is forced false; if the input is no longer than
/// `k` the constraint is trivially satisfied. Otherwise the sequential
/// counter introduces `k` register literals per position, where
/// `regs[i][j]` reads "at least `j + 1` of the first `i + 1` inputs are
/// true", and forbids any input from pushing the count past `k`. Repeated
/// input literals each advance the counter, which is what expresses
/// weighted bounds.
pub fn at_most_k<Col>(
    lits: &[Lit],
    k: usize,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(), OutOfMemory>
where
    Col: CollectClauses,
{
    if k == 0 {
        for &l in lits {
            collector.add_clause(clause![!l])?;
        }
        return Ok(());
    }
    let n = lits.len();
    if n <= k {
        return Ok(());
    }
    let regs: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| var_manager.new_lit()).collect())
        .collect();
    collector.add_clause(clause![!lits[0], regs[0][0]])?;
    for j in 1..k {
        collector.add_clause(clause![!regs[0][j]])?;
    }
    for i in 1..n - 1 {
        collector.add_clause(clause![!lits[i], regs[i][0]])?;
        collector.add_clause(clause![!regs[i - 1][0], regs[i][0]])?;
        for j in 1..k {
            collector.add_clause(clause![!lits[i], !regs[i - 1][j - 1], regs[i][j]])?;
            collector.add_clause(clause![!regs[i - 1][j], regs[i][j]])?;
        }
        collector.add_clause(clause![!lits[i], !regs[i - 1][k - 1]])?;
    }
    collector.add_clause(clause![!lits[n - 1], !regs[n - 2][k - 1]])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rustsat::{
        instances::{BasicVarManager, Cnf, ManageVars},
        solvers::{Solve, SolveIncremental, SolverResult},
        types::Lit,
    };
    use rustsat_cadical::CaDiCaL;

    use super::*;

    fn oracle_with(cnf: Cnf) -> CaDiCaL<'static, 'static> {
        let mut oracle = CaDiCaL::default();
        oracle.add_cnf(cnf).unwrap();
        oracle
    }

    fn assumps_for(lits: &[Lit], mask: usize) -> Vec<Lit> {
        lits.iter()
            .enumerate()
            .map(|(idx, &l)| if mask >> idx & 1 == 1 { l } else { !l })
            .collect()
    }

    #[test]
    fn exactly_one_all_assignments() {
        // both the pairwise and the ladder path
        for n in 1..=7usize {
            let mut vm = BasicVarManager::default();
            let mut cnf = Cnf::new();
            let lits: Vec<Lit> = (0..n).map(|_| vm.new_lit()).collect();
            exactly_one(&lits, &mut cnf, &mut vm).unwrap();
            let mut oracle = oracle_with(cnf);
            for mask in 0..1usize << n {
                let expected = if mask.count_ones() == 1 {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(
                    oracle.solve_assumps(&assumps_for(&lits, mask)).unwrap(),
                    expected,
                    "n={n} mask={mask:b}"
                );
            }
        }
    }

    #[test]
    fn at_most_one_all_assignments() {
        for n in [2usize, 5, 6, 8] {
            let mut vm = BasicVarManager::default();
            let mut cnf = Cnf::new();
            let lits: Vec<Lit> = (0..n).map(|_| vm.new_lit()).collect();
            at_most_one(&lits, &mut cnf, &mut vm).unwrap();
            let mut oracle = oracle_with(cnf);
            for mask in 0..1usize << n {
                let expected = if mask.count_ones() <= 1 {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(
                    oracle.solve_assumps(&assumps_for(&lits, mask)).unwrap(),
                    expected,
                    "n={n} mask={mask:b}"
                );
            }
        }
    }

    #[test]
    fn at_most_k_all_assignments() {
        const N: usize = 5;
        for k in 0..=N {
            let mut vm = BasicVarManager::default();
            let mut cnf = Cnf::new();
            let lits: Vec<Lit> = (0..N).map(|_| vm.new_lit()).collect();
            at_most_k(&lits, k, &mut cnf, &mut vm).unwrap();
            let mut oracle = oracle_with(cnf);
            for mask in 0..1usize << N {
                let expected = if (mask.count_ones() as usize) <= k {
                    SolverResult::Sat
                } else {
                    SolverResult::Unsat
                };
                assert_eq!(
                    oracle.solve_assumps(&assumps_for(&lits, mask)).unwrap(),
                    expected,
                    "k={k} mask={mask:b}"
                );
            }
        }
    }

    #[test]
    fn at_most_k_weighted_repetition() {
        // weights 3, 2, 1 against a bound of 4
        let weights = [3usize, 2, 1];
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let lits: Vec<Lit> = (0..weights.len()).map(|_| vm.new_lit()).collect();
        let repeated: Vec<Lit> = lits
            .iter()
            .zip(weights)
            .flat_map(|(&l, w)| std::iter::repeat(l).take(w))
            .collect();
        at_most_k(&repeated, 4, &mut cnf, &mut vm).unwrap();
        let mut oracle = oracle_with(cnf);
        for mask in 0..1usize << weights.len() {
            let total: usize = weights
                .iter()
                .enumerate()
                .filter(|(idx, _)| mask >> idx & 1 == 1)
                .map(|(_, &w)| w)
                .sum();
            let expected = if total <= 4 {
                SolverResult::Sat
            } else {
                SolverResult::Unsat
            };
            assert_eq!(
                oracle.solve_assumps(&assumps_for(&lits, mask)).unwrap(),
                expected,
                "mask={mask:b}"
            );
        }
    }
}
