//! # Linear Sat-Unsat Search
//!
//! Repeatedly checks the formula, reads the realized maximum route distance
//! off each model and permanently forbids any solution that does not beat
//! it. The last model is optimal once the formula comes back unsat; unsat on
//! the very first check means the instance is infeasible.

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

/// The linear sat-unsat search driver
///
/// # Generics
///
/// - `O`: the SAT solver oracle
pub struct LinSu<O = rustsat_cadical::CaDiCaL<'static, 'static>> {
    /// The solver kernel
    kernel: Kernel<O>,
    /// The search state
    state: SearchState,
    /// The best model found so far
    best: Option<Assignment>,
}

impl<O> Init for LinSu<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    type Oracle = O;

    fn new(inst: Instance, opts: KernelOptions) -> anyhow::Result<Self> {
        Ok(LinSu {
            kernel: Kernel::new(inst, opts, SearchStrategy::Linear)?,
            state: SearchState::Searching,
            best: None,
        })
    }
}

impl<O> Solve for LinSu<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    fn solve(&mut self, limits: Limits) -> anyhow::Result<RunResult> {
        self.kernel.start_solving(limits);
        self.alg_main()
    }
}

impl<O> KernelFunctions for LinSu<O>
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

impl<O> LinSu<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    /// The main search loop
    fn alg_main(&mut self) -> anyhow::Result<RunResult> {
        self.kernel.log_routine_start("linear search")?;
        while !self.state.is_exhausted() {
            if self.kernel.budget_exhausted() {
                let reason = self.kernel.stop_reason();
                self.kernel.log_termination(reason)?;
                self.state = self.state.gave_up();
                break;
            }
            match self.kernel.solve()? {
                SolverResult::Sat => {
                    let model = self.kernel.solution()?;
                    let obj = self.kernel.encoding().objective(&model);
                    self.kernel.log_candidate(obj)?;
                    self.state = self.state.found(obj);
                    self.best = Some(model);
                    if obj == 0 {
                        // nothing can beat a zero-distance plan
                        self.state = self.state.proven_optimal();
                        break;
                    }
                    self.kernel.tighten_bound(obj - 1)?;
                }
                SolverResult::Unsat => {
                    if self.best.is_none() {
                        self.kernel.log_message("instance is infeasible")?;
                    }
                    self.state = self.state.proven_optimal();
                }
                SolverResult::Interrupted => {
                    let reason = self.kernel.stop_reason();
                    self.kernel.log_termination(reason)?;
                    self.state = self.state.gave_up();
                }
            }
        }
        self.kernel.log_routine_end()?;
        Ok(self.kernel.run_result(self.state, self.best.as_ref()))
    }
}
