//! # Binary Bound Search
//!
//! Bisects the objective window between the instance's structural lower and
//! upper bounds. Each iteration asserts `rho <= mid` under an activation
//! literal, checks, and retires the scope again on every exit path; a sat
//! answer pulls the upper bound down to the realized objective from the
//! model, an unsat answer pushes the lower bound past the probe. The search
//! is optimal once the window collapses.

use rustsat::{
    encodings::CollectClauses,
    solvers::{SolveIncremental, SolveStats, SolverResult, SolverStats, Terminate},
    types::Assignment,
};

use crate::{
    instance::Instance,
    options::{KernelOptions, Limits, SearchStrategy},
    types::RunResult,
    EncodingStats, Stats, WriteSolverLog,
};

use super::{Init, Interrupter, Kernel, KernelFunctions, SearchState, Solve};

/// The binary bound search driver
///
/// # Generics
///
/// - `O`: the SAT solver oracle
pub struct Bisect<O = rustsat_cadical::CaDiCaL<'static, 'static>> {
    /// The solver kernel
    kernel: Kernel<O>,
    /// The search state
    state: SearchState,
    /// The best model found so far
    best: Option<Assignment>,
    /// Greatest objective value proven infeasible is `lower - 1`
    lower: usize,
    /// The realized objective of the best model, or the structural bound
    upper: usize,
}

impl<O> Init for Bisect<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    type Oracle = O;

    fn new(inst: Instance, opts: KernelOptions) -> anyhow::Result<Self> {
        let upper = inst.dist_upper_bound();
        let lower = inst.dist_lower_bound().min(upper);
        Ok(Bisect {
            kernel: Kernel::new(inst, opts, SearchStrategy::Binary)?,
            state: SearchState::Searching,
            best: None,
            lower,
            upper,
        })
    }
}

impl<O> Solve for Bisect<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    fn solve(&mut self, limits: Limits) -> anyhow::Result<RunResult> {
        self.kernel.start_solving(limits);
        self.alg_main()
    }
}

impl<O> KernelFunctions for Bisect<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    fn stats(&self) -> Stats {
        self.kernel.stats()
    }

    fn encoding_stats(&self) -> EncodingStats {
        self.kernel.encoding_stats()
    }

    fn oracle_stats(&self) -> SolverStats {
        self.kernel.oracle_stats()
    }

    fn attach_logger<L: WriteSolverLog + 'static>(&mut self, logger: L) {
        self.kernel.attach_logger(logger);
    }

    fn detach_logger(&mut self) -> Option<Box<dyn WriteSolverLog>> {
        self.kernel.detach_logger()
    }

    fn interrupter(&mut self) -> Interrupter {
        self.kernel.interrupter()
    }
}

impl<O> Bisect<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    /// The main search loop
    fn alg_main(&mut self) -> anyhow::Result<RunResult> {
        self.kernel.log_routine_start("binary search")?;
        while !self.state.is_exhausted() {
            if self.kernel.budget_exhausted() {
                let reason = self.kernel.stop_reason();
                self.kernel.log_termination(reason)?;
                self.state = self.state.gave_up();
                break;
            }
            if self.upper <= self.lower {
                if self.best.is_some() {
                    self.state = self.state.proven_optimal();
                    break;
                }
                // the window collapsed without a model; the upper bound is
                // structurally sound, so one probe there decides feasibility
                if self.probe(self.upper)? == SolverResult::Unsat {
                    self.kernel.log_message("instance is infeasible")?;
                    self.state = self.state.proven_optimal();
                }
                continue;
            }
            self.kernel.log_bounds(self.lower, self.upper)?;
            let mid = if self.upper - self.lower == 1 {
                self.lower
            } else {
                self.lower + (self.upper - self.lower + 1) / 2
            };
            self.probe(mid)?;
        }
        self.kernel.log_routine_end()?;
        Ok(self.kernel.run_result(self.state, self.best.as_ref()))
    }

    /// Checks the formula under `rho <= bound` and updates the window
    ///
    /// The bound scope is retired again before the result is interpreted, so
    /// no exit path can leave it active.
    fn probe(&mut self, bound: usize) -> anyhow::Result<SolverResult> {
        let act = self.kernel.enforce_bound(bound)?;
        let res = self.kernel.solve_assumps(&[act]);
        let retired = self.kernel.retire_bound(act);
        let res = res?;
        retired?;
        match res {
            SolverResult::Sat => {
                let model = self.kernel.solution()?;
                let obj = self.kernel.encoding().objective(&model);
                debug_assert!(obj <= bound);
                self.kernel.log_candidate(obj)?;
                self.state = self.state.found(obj);
                self.best = Some(model);
                // converge on the realized objective, not on the probe
                self.upper = obj;
            }
            SolverResult::Unsat => self.lower = bound + 1,
            SolverResult::Interrupted => {
                let reason = self.kernel.stop_reason();
                self.kernel.log_termination(reason)?;
                self.state = self.state.gave_up();
            }
        }
        Ok(res)
    }
}
