//! # Problem Encoding
//!
//! Compiles one [`Instance`] into clauses over an assignment tensor
//! `X[courier][position][0..=n]`, where index 0 is the "no package" padding
//! marker and `1..=n` are the packages. Every satisfying assignment of the
//! emitted formula corresponds to exactly one feasible courier assignment;
//! optimality is the search driver's business.
//!
//! The encoder owns the bit-width choices: one width per semantic quantity
//! (weights, distances, the objective bound), sized from the instance maxima
//! so that no sum a model can realize overflows its adders.
//!
//! Feasibility is not pre-validated. An instance with fewer packages than
//! couriers, or a package heavier than every capacity, still encodes; the
//! oracle discovers the infeasibility as unsat.

use itertools::iproduct;
use rustsat::{
    clause,
    encodings::CollectClauses,
    instances::ManageVars,
    types::{Assignment, Lit, TernaryVal},
};

use crate::{
    bits::{self, BinaryNumber},
    card,
    instance::Instance,
    options::{CapacityEncoding, KernelOptions, SearchStrategy},
};

/// Variable handles retained from encoding one instance
///
/// All variables are created here, once; the search drivers only ever add
/// unit or threshold clauses over the retained handles.
#[derive(Debug)]
pub struct Encoding {
    /// The assignment tensor; `cells[i][j][0]` is the padding marker,
    /// `cells[i][j][k]` for `k >= 1` means courier `i` visits package `k`
    /// at position `j`
    cells: Vec<Vec<Vec<Lit>>>,
    /// `carriers[i][k]`: package `k + 1` is somewhere in courier `i`'s route
    carriers: Vec<Vec<Lit>>,
    /// Per-courier total route distance
    dists: Vec<BinaryNumber>,
    /// Per-courier total load, present with the adder capacity encoding
    loads: Vec<BinaryNumber>,
    /// The objective bound
    rho: BinaryNumber,
}

impl Encoding {
    /// Builds the full clause set for `inst` into `collector`
    ///
    /// The objective side depends on the strategy: linear search gets a free
    /// bound above every courier distance, binary search gets the bound
    /// defined as the tournament maximum of the courier distances.
    pub fn new<Col>(
        inst: &Instance,
        opts: &KernelOptions,
        strategy: SearchStrategy,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<Self, bits::Error>
    where
        Col: CollectClauses,
    {
        let m = inst.n_couriers;
        let n = inst.n_packages;
        let horizon = opts
            .route_horizon
            .unwrap_or((n + 1).saturating_sub(m))
            .clamp(1, n.max(1));
        let weight_bits = bits::required_bits(inst.total_weight().max(inst.max_capacity()));
        let dist_bits = bits::required_bits(inst.dist_upper_bound());

        let cells: Vec<Vec<Vec<Lit>>> = (0..m)
            .map(|_| {
                (0..horizon)
                    .map(|_| (0..=n).map(|_| var_manager.new_lit()).collect())
                    .collect()
            })
            .collect();
        let carriers: Vec<Vec<Lit>> = (0..m)
            .map(|_| (0..n).map(|_| var_manager.new_lit()).collect())
            .collect();

        // each cell holds exactly one value, the marker included
        for (cou, pos) in iproduct!(0..m, 0..horizon) {
            card::exactly_one(&cells[cou][pos], collector, var_manager)?;
        }
        // every package is delivered exactly once
        for pac in 1..=n {
            let occurrences: Vec<Lit> = iproduct!(0..m, 0..horizon)
                .map(|(cou, pos)| cells[cou][pos][pac])
                .collect();
            card::exactly_one(&occurrences, collector, var_manager)?;
        }
        // once a route is padded it stays padded
        for (cou, pos) in iproduct!(0..m, 1..horizon) {
            collector.add_clause(clause![!cells[cou][pos - 1][0], cells[cou][pos][0]])?;
        }
        // every courier starts with a real package
        for cou in 0..m {
            card::at_least_one(&cells[cou][0][1..], collector)?;
        }
        // carrier literals: package k is somewhere in courier i's route
        for (cou, pac) in iproduct!(0..m, 1..=n) {
            let carrier = carriers[cou][pac - 1];
            let mut any = clause![!carrier];
            for pos in 0..horizon {
                collector.add_clause(clause![!cells[cou][pos][pac], carrier])?;
                any.add(cells[cou][pos][pac]);
            }
            collector.add_clause(any)?;
        }

        let loads = Self::encode_capacities(
            inst,
            opts.capacity_encoding,
            weight_bits,
            &carriers,
            collector,
            var_manager,
        )?;
        let dists =
            Self::encode_distances(inst, horizon, dist_bits, &cells, collector, var_manager)?;

        let rho = match strategy {
            SearchStrategy::Linear => {
                let rho = BinaryNumber::new(dist_bits, var_manager);
                for dist in &dists {
                    bits::less_or_equal(&[], dist, &rho, collector, var_manager)?;
                }
                rho
            }
            SearchStrategy::Binary => bits::maximum(&dists, collector, var_manager)?,
        };

        if opts.symmetry_breaking {
            // couriers with the same capacity are interchangeable; order them
            // by the package they pick up first
            for (cou1, cou2) in iproduct!(0..m, 0..m) {
                if cou1 < cou2 && inst.capacities[cou1] == inst.capacities[cou2] {
                    bits::one_hot_less(&cells[cou1][0], &cells[cou2][0], collector)?;
                }
            }
        }

        Ok(Encoding {
            cells,
            carriers,
            dists,
            loads,
            rho,
        })
    }

    /// Enforces each courier's capacity and returns the load numbers (adder
    /// encoding only)
    fn encode_capacities<Col>(
        inst: &Instance,
        encoding: CapacityEncoding,
        weight_bits: usize,
        carriers: &[Vec<Lit>],
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<Vec<BinaryNumber>, bits::Error>
    where
        Col: CollectClauses,
    {
        match encoding {
            CapacityEncoding::Adder => carriers
                .iter()
                .zip(&inst.capacities)
                .map(|(row, &cap)| {
                    let parts: Vec<BinaryNumber> = row
                        .iter()
                        .zip(&inst.weights)
                        .map(|(&carrier, &weight)| {
                            BinaryNumber::masked(weight, weight_bits, carrier)
                        })
                        .collect::<Result<_, _>>()?;
                    let load = bits::sum(&parts, collector, var_manager)?;
                    let cap = BinaryNumber::constant(cap, weight_bits)?;
                    bits::less_or_equal(&[], &load, &cap, collector, var_manager)?;
                    Ok(load)
                })
                .collect(),
            CapacityEncoding::Counter => {
                for (row, &cap) in carriers.iter().zip(&inst.capacities) {
                    let repeated: Vec<Lit> = row
                        .iter()
                        .zip(&inst.weights)
                        .flat_map(|(&carrier, &weight)| std::iter::repeat(carrier).take(weight))
                        .collect();
                    card::at_most_k(&repeated, cap, collector, var_manager)?;
                }
                Ok(vec![])
            }
        }
    }

    /// Accumulates each courier's route distance leg by leg
    ///
    /// One partial-distance number per leg: depot to position 0, between
    /// consecutive positions, and the final position back to the depot. A
    /// leg between padded positions is gated to zero, so the depot diagonal
    /// entry of the matrix is never referenced and need not be zero. The
    /// return leg is charged exactly once, at the first padded position.
    fn encode_distances<Col>(
        inst: &Instance,
        horizon: usize,
        dist_bits: usize,
        cells: &[Vec<Vec<Lit>>],
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<Vec<BinaryNumber>, bits::Error>
    where
        Col: CollectClauses,
    {
        let n = inst.n_packages;
        let depot = inst.depot();
        let zero = BinaryNumber::constant(0, dist_bits)?;
        cells
            .iter()
            .map(|route| {
                let mut legs = Vec::with_capacity(horizon + 1);
                let first = BinaryNumber::new(dist_bits, var_manager);
                for pac in 1..=n {
                    let out = BinaryNumber::constant(inst.dist(depot, pac - 1), dist_bits)?;
                    bits::equals(&[route[0][pac]], &first, &out, collector)?;
                }
                bits::equals(&[route[0][0]], &first, &zero, collector)?;
                legs.push(first);
                for pos in 1..horizon {
                    let leg = BinaryNumber::new(dist_bits, var_manager);
                    for (pac1, pac2) in iproduct!(1..=n, 1..=n) {
                        if pac1 == pac2 {
                            continue;
                        }
                        let hop =
                            BinaryNumber::constant(inst.dist(pac1 - 1, pac2 - 1), dist_bits)?;
                        bits::equals(
                            &[route[pos - 1][pac1], route[pos][pac2]],
                            &leg,
                            &hop,
                            collector,
                        )?;
                    }
                    for pac in 1..=n {
                        // the route ends here: charge the return leg
                        let back = BinaryNumber::constant(inst.dist(pac - 1, depot), dist_bits)?;
                        bits::equals(&[route[pos - 1][pac], route[pos][0]], &leg, &back, collector)?;
                    }
                    bits::equals(&[route[pos - 1][0], route[pos][0]], &leg, &zero, collector)?;
                    legs.push(leg);
                }
                let last = BinaryNumber::new(dist_bits, var_manager);
                for pac in 1..=n {
                    let back = BinaryNumber::constant(inst.dist(pac - 1, depot), dist_bits)?;
                    bits::equals(&[route[horizon - 1][pac]], &last, &back, collector)?;
                }
                bits::equals(&[route[horizon - 1][0]], &last, &zero, collector)?;
                legs.push(last);
                bits::sum(&legs, collector, var_manager)
            })
            .collect()
    }

    /// Asserts `rho <= bound` under a fresh activation literal
    ///
    /// The returned literal must be passed as an assumption for the bound to
    /// hold; permanently adding its negation retires the scope.
    pub fn enforce_bound<Col>(
        &self,
        bound: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<Lit, bits::Error>
    where
        Col: CollectClauses,
    {
        let act = var_manager.new_lit();
        let bound = BinaryNumber::constant(bound, self.rho.width())?;
        bits::less_or_equal(&[act], &self.rho, &bound, collector, var_manager)?;
        Ok(act)
    }

    /// Permanently asserts `rho <= bound`
    pub fn tighten_bound<Col>(
        &self,
        bound: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), bits::Error>
    where
        Col: CollectClauses,
    {
        let bound = BinaryNumber::constant(bound, self.rho.width())?;
        bits::less_or_equal(&[], &self.rho, &bound, collector, var_manager)?;
        Ok(())
    }

    /// Reads the routes out of a model: one ordered, 1-indexed package list
    /// per courier, walked until the padding marker
    pub fn routes(&self, sol: &Assignment) -> Vec<Vec<usize>> {
        self.cells
            .iter()
            .map(|route| {
                let mut packages = Vec::new();
                for position in route {
                    let pac = position
                        .iter()
                        .position(|&l| sol.lit_value(l) == TernaryVal::True)
                        .unwrap_or(0);
                    if pac == 0 {
                        break;
                    }
                    packages.push(pac);
                }
                packages
            })
            .collect()
    }

    /// Decodes each courier's total route distance from a model
    pub fn route_dists(&self, sol: &Assignment) -> Vec<usize> {
        self.dists.iter().map(|dist| dist.value(sol)).collect()
    }

    /// The realized objective of a model
    ///
    /// Recomputed as the maximum of the decoded courier distances rather
    /// than read off the bound variable, so an encoding error in the bound
    /// cannot leak into the reported objective.
    pub fn objective(&self, sol: &Assignment) -> usize {
        self.route_dists(sol).into_iter().max().unwrap_or(0)
    }

    /// Decodes each courier's load from a model (adder capacity encoding
    /// only; empty otherwise)
    pub fn loads(&self, sol: &Assignment) -> Vec<usize> {
        self.loads.iter().map(|load| load.value(sol)).collect()
    }

    /// Whether a courier carries a package according to a model
    pub fn carries(&self, sol: &Assignment, courier: usize, package: usize) -> bool {
        sol.lit_value(self.carriers[courier][package - 1]) == TernaryVal::True
    }
}

#[cfg(test)]
mod tests {
    use rustsat::{
        instances::{BasicVarManager, Cnf, ManageVars},
        solvers::{Solve, SolveIncremental, SolverResult},
    };
    use rustsat_cadical::CaDiCaL;

    use super::*;

    fn small() -> Instance {
        Instance::from_reader(
            "2\n3\n10 10\n3 3 3\n0 3 4 2\n3 0 5 3\n4 5 0 4\n2 3 4 0\n".as_bytes(),
        )
        .unwrap()
    }

    fn solve_with(
        inst: &Instance,
        opts: &KernelOptions,
        strategy: SearchStrategy,
    ) -> (Encoding, SolverResult, Option<Assignment>, BasicVarManager) {
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let enc = Encoding::new(inst, opts, strategy, &mut cnf, &mut vm).unwrap();
        let mut oracle: CaDiCaL<'static, 'static> = CaDiCaL::default();
        oracle.add_cnf(cnf).unwrap();
        let res = oracle.solve().unwrap();
        let sol = (res == SolverResult::Sat)
            .then(|| oracle.solution(vm.max_var().unwrap()).unwrap());
        (enc, res, sol, vm)
    }

    fn assert_feasible(inst: &Instance, enc: &Encoding, sol: &Assignment) {
        let routes = enc.routes(sol);
        assert_eq!(routes.len(), inst.n_couriers);
        // every package delivered exactly once, every courier dispatched
        let mut seen = vec![false; inst.n_packages];
        for (cou, route) in routes.iter().enumerate() {
            assert!(!route.is_empty());
            let mut weight = 0;
            for &pac in route {
                assert!(!seen[pac - 1]);
                seen[pac - 1] = true;
                weight += inst.weights[pac - 1];
                assert!(enc.carries(sol, cou, pac));
            }
            assert!(weight <= inst.capacities[cou]);
        }
        assert!(seen.into_iter().all(|s| s));
        // decoded distances match the routes walked through the matrix
        let depot = inst.depot();
        for (route, decoded) in routes.iter().zip(enc.route_dists(sol)) {
            let mut from = depot;
            let mut total = 0;
            for &pac in route {
                total += inst.dist(from, pac - 1);
                from = pac - 1;
            }
            total += inst.dist(from, depot);
            assert_eq!(decoded, total);
        }
    }

    #[test]
    fn small_is_satisfiable() {
        let inst = small();
        for strategy in [SearchStrategy::Linear, SearchStrategy::Binary] {
            let (enc, res, sol, _) = solve_with(&inst, &KernelOptions::default(), strategy);
            assert_eq!(res, SolverResult::Sat);
            assert_feasible(&inst, &enc, &sol.unwrap());
        }
    }

    #[test]
    fn counter_capacities_agree() {
        let inst = small();
        let opts = KernelOptions {
            capacity_encoding: CapacityEncoding::Counter,
            ..KernelOptions::default()
        };
        let (enc, res, sol, _) = solve_with(&inst, &opts, SearchStrategy::Binary);
        assert_eq!(res, SolverResult::Sat);
        assert_feasible(&inst, &enc, &sol.unwrap());
    }

    #[test]
    fn more_couriers_than_packages_is_unsat() {
        let inst = Instance::from_reader(
            "3\n2\n5 5 5\n1 1\n0 2 1\n2 0 1\n1 1 0\n".as_bytes(),
        )
        .unwrap();
        let (_, res, _, _) = solve_with(&inst, &KernelOptions::default(), SearchStrategy::Binary);
        assert_eq!(res, SolverResult::Unsat);
    }

    #[test]
    fn oversized_package_is_unsat() {
        let inst = Instance::from_reader(
            "2\n2\n3 3\n2 5\n0 2 1\n2 0 1\n1 1 0\n".as_bytes(),
        )
        .unwrap();
        for encoding in [CapacityEncoding::Adder, CapacityEncoding::Counter] {
            let opts = KernelOptions {
                capacity_encoding: encoding,
                ..KernelOptions::default()
            };
            let (_, res, _, _) = solve_with(&inst, &opts, SearchStrategy::Binary);
            assert_eq!(res, SolverResult::Unsat);
        }
    }

    #[test]
    fn bound_scopes_enforce_and_retire() {
        let inst = small();
        let mut vm = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let enc = Encoding::new(
            &inst,
            &KernelOptions::default(),
            SearchStrategy::Binary,
            &mut cnf,
            &mut vm,
        )
        .unwrap();
        let mut oracle: CaDiCaL<'static, 'static> = CaDiCaL::default();
        oracle.add_cnf(cnf).unwrap();
        // below the structural lower bound nothing is feasible
        let act = enc.enforce_bound(3, &mut oracle, &mut vm).unwrap();
        assert_eq!(
            oracle.solve_assumps(&[act]).unwrap(),
            SolverResult::Unsat
        );
        // retiring the scope restores satisfiability
        oracle.extend_clauses([clause![!act]]).unwrap();
        assert_eq!(oracle.solve().unwrap(), SolverResult::Sat);
    }
}
