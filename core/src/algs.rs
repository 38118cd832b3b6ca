//! # Search Drivers
//!
//! Functionality shared between the two objective search strategies: the
//! kernel owning the oracle and the encoding, the explicit search state
//! machine, and the budget bookkeeping. The strategies themselves live in
//! [`linsu`] and [`bisect`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use anyhow::Context;
use rustsat::{
    clause,
    encodings::CollectClauses,
    instances::{BasicVarManager, Cnf, ManageVars},
    solvers::{
        ControlSignal, SolveIncremental, SolveStats, SolverResult, SolverStats, Terminate,
    },
    types::{Assignment, Lit},
};

use crate::{
    encode::Encoding,
    instance::Instance,
    options::{KernelOptions, Limits, SearchStrategy},
    types::RunResult,
    EncodingStats, Stats, Termination, WriteSolverLog,
};

pub mod bisect;
pub mod linsu;

pub use bisect::Bisect;
pub use linsu::LinSu;

/// Trait for initializing a search driver from an instance
pub trait Init: Sized {
    /// The SAT oracle backing the driver
    type Oracle;

    /// Encodes the instance and loads it into a fresh oracle
    fn new(inst: Instance, opts: KernelOptions) -> anyhow::Result<Self>;
}

/// Solving interface of the search drivers
pub trait Solve: KernelFunctions {
    /// Runs the search under the given limits
    ///
    /// Every early exit still produces a result record: the best model found
    /// so far with `optimal = false`, or the unsolved record if none was
    /// found. Errors are reserved for oracle, logger and encoding failures.
    fn solve(&mut self, limits: Limits) -> anyhow::Result<RunResult>;
}

/// Shared functionality provided by the [`Kernel`]
pub trait KernelFunctions {
    /// Gets tracked statistics from the driver
    fn stats(&self) -> Stats;
    /// Gets statistics of the built encoding
    fn encoding_stats(&self) -> EncodingStats;
    /// Gets statistics from the internal oracle
    fn oracle_stats(&self) -> SolverStats;
    /// Attaches a logger to the driver
    fn attach_logger<L: WriteSolverLog + 'static>(&mut self, logger: L);
    /// Detaches a logger from the driver
    fn detach_logger(&mut self) -> Option<Box<dyn WriteSolverLog>>;
    /// Gets an interrupter to the driver
    fn interrupter(&mut self) -> Interrupter;
}

/// Asynchronous handle stopping a running search
pub struct Interrupter {
    /// Termination flag of the search
    term_flag: Arc<AtomicBool>,
}

impl Interrupter {
    /// Interrupts the search asynchronously
    pub fn interrupt(&mut self) {
        self.term_flag.store(true, Ordering::Relaxed);
    }
}

/// The state of the objective search
///
/// Transitions are the same for both strategies: models move the search to
/// [`SearchState::SolutionFound`], a proof that no better model exists
/// exhausts it optimally, and running out of budget exhausts it
/// non-optimally. Proving optimality without ever finding a model means the
/// instance is infeasible, which is reported as a non-optimal empty result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// No model found yet
    Searching,
    /// The best model so far realizes this objective value
    SolutionFound {
        /// The realized maximum route distance
        best: usize,
    },
    /// The search is finished
    Exhausted {
        /// Whether the best model was proven optimal
        optimal: bool,
    },
}

impl SearchState {
    /// Transition on a model realizing objective value `obj`
    pub fn found(self, obj: usize) -> SearchState {
        match self {
            SearchState::Searching => SearchState::SolutionFound { best: obj },
            SearchState::SolutionFound { best } => SearchState::SolutionFound {
                best: best.min(obj),
            },
            SearchState::Exhausted { .. } => self,
        }
    }

    /// Transition on a proof that no model beats the best one
    ///
    /// In linear search this is the tightened formula coming back unsat, in
    /// binary search the bound window collapsing.
    pub fn proven_optimal(self) -> SearchState {
        match self {
            SearchState::Searching => SearchState::Exhausted { optimal: false },
            SearchState::SolutionFound { .. } => SearchState::Exhausted { optimal: true },
            SearchState::Exhausted { .. } => self,
        }
    }

    /// Transition on an exhausted budget: timeout, oracle giving up,
    /// interrupt or call limit
    pub fn gave_up(self) -> SearchState {
        match self {
            SearchState::Exhausted { .. } => self,
            _ => SearchState::Exhausted { optimal: false },
        }
    }

    /// The objective of the best model found so far
    pub fn best(&self) -> Option<usize> {
        match self {
            SearchState::SolutionFound { best } => Some(*best),
            _ => None,
        }
    }

    /// Whether the search is finished
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SearchState::Exhausted { .. })
    }
}

/// Kernel struct shared between the search drivers
///
/// # Generics
///
/// - `O`: the SAT solver oracle
pub struct Kernel<O> {
    /// The SAT solver backend
    oracle: O,
    /// The variable manager keeping track of variables
    var_manager: BasicVarManager,
    /// Handles into the built encoding
    encoding: Encoding,
    /// The instance being solved
    inst: Instance,
    /// Running statistics
    stats: Stats,
    /// Statistics of the built encoding
    enc_stats: EncodingStats,
    /// Limits for the current solving run
    lims: Limits,
    /// Logger to log with
    logger: Option<Box<dyn WriteSolverLog>>,
    /// Termination flag
    term_flag: Arc<AtomicBool>,
    /// When the solve started, including encoding time
    start: Instant,
    /// The wall-clock deadline of the current solving run
    deadline: Option<Instant>,
}

impl<O> Kernel<O>
where
    O: SolveIncremental + SolveStats + CollectClauses + Terminate<'static> + Default,
{
    /// Encodes `inst` and loads the clauses into a fresh oracle
    pub fn new(inst: Instance, opts: KernelOptions, strategy: SearchStrategy) -> anyhow::Result<Self> {
        let start = Instant::now();
        let mut var_manager = BasicVarManager::default();
        let mut cnf = Cnf::new();
        let encoding = Encoding::new(&inst, &opts, strategy, &mut cnf, &mut var_manager)
            .context("failed to encode instance")?;
        let enc_stats = EncodingStats {
            n_clauses: cnf.len(),
            n_vars: var_manager.n_used(),
        };
        let mut oracle = O::default();
        oracle.add_cnf(cnf).context("failed to load encoding")?;
        Ok(Kernel {
            oracle,
            var_manager,
            encoding,
            inst,
            stats: Stats::default(),
            enc_stats,
            lims: Limits::none(),
            logger: None,
            term_flag: Arc::new(AtomicBool::new(false)),
            start,
            deadline: None,
        })
    }

    /// Starts a solving run: records limits, arms the deadline and attaches
    /// the terminator enforcing it inside oracle calls
    pub fn start_solving(&mut self, limits: Limits) {
        self.stats.n_solve_calls += 1;
        self.lims = limits;
        self.deadline = limits.timeout.map(|budget| self.start + budget);
        let term_flag = self.term_flag.clone();
        let deadline = self.deadline;
        self.oracle.attach_terminator(move || {
            if term_flag.load(Ordering::Relaxed) {
                return ControlSignal::Terminate;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return ControlSignal::Terminate;
                }
            }
            ControlSignal::Continue
        });
    }

    pub fn interrupter(&mut self) -> Interrupter {
        Interrupter {
            term_flag: self.term_flag.clone(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn encoding_stats(&self) -> EncodingStats {
        self.enc_stats
    }

    pub fn oracle_stats(&self) -> SolverStats {
        self.oracle.stats()
    }

    pub fn attach_logger<L: WriteSolverLog + 'static>(&mut self, logger: L) {
        self.logger = Some(Box::new(logger));
    }

    pub fn detach_logger(&mut self) -> Option<Box<dyn WriteSolverLog>> {
        self.logger.take()
    }

    /// The instance being solved
    pub fn instance(&self) -> &Instance {
        &self.inst
    }

    /// Handles into the built encoding
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Whether no further oracle call may be started
    pub fn budget_exhausted(&self) -> bool {
        if self.term_flag.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        if let Some(max_calls) = self.lims.oracle_calls {
            if self.stats.n_oracle_calls >= max_calls {
                return true;
            }
        }
        false
    }

    /// The reason the budget ran out
    pub fn stop_reason(&self) -> Termination {
        if self.term_flag.load(Ordering::Relaxed) {
            return Termination::Interrupted;
        }
        if let Some(max_calls) = self.lims.oracle_calls {
            if self.stats.n_oracle_calls >= max_calls {
                return Termination::OracleCallsLimit;
            }
        }
        Termination::Timeout
    }

    /// Wrapper around the oracle with call counting and logging
    pub fn solve(&mut self) -> anyhow::Result<SolverResult> {
        self.log_routine_start("oracle call")?;
        let res = self.oracle.solve().context("oracle failed")?;
        self.log_routine_end()?;
        self.stats.n_oracle_calls += 1;
        if let Some(logger) = &mut self.logger {
            logger.log_oracle_call(res).context("logger failed")?;
        }
        Ok(res)
    }

    /// Wrapper around the oracle with call counting and logging
    pub fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult> {
        self.log_routine_start("oracle call")?;
        let res = self
            .oracle
            .solve_assumps(assumps)
            .context("oracle failed")?;
        self.log_routine_end()?;
        self.stats.n_oracle_calls += 1;
        if let Some(logger) = &mut self.logger {
            logger.log_oracle_call(res).context("logger failed")?;
        }
        Ok(res)
    }

    /// Gets the current model from the oracle
    pub fn solution(&mut self) -> anyhow::Result<Assignment> {
        let max_var = self
            .var_manager
            .max_var()
            .context("encoding has no variables")?;
        Ok(self.oracle.solution(max_var)?)
    }

    /// Permanently asserts `rho <= bound`
    pub fn tighten_bound(&mut self, bound: usize) -> anyhow::Result<()> {
        let Kernel {
            oracle,
            var_manager,
            encoding,
            ..
        } = self;
        encoding.tighten_bound(bound, oracle, var_manager)?;
        Ok(())
    }

    /// Asserts `rho <= bound` under a fresh activation literal
    pub fn enforce_bound(&mut self, bound: usize) -> anyhow::Result<Lit> {
        let Kernel {
            oracle,
            var_manager,
            encoding,
            ..
        } = self;
        Ok(encoding.enforce_bound(bound, oracle, var_manager)?)
    }

    /// Retires a bound scope by permanently negating its activation literal
    pub fn retire_bound(&mut self, act: Lit) -> anyhow::Result<()> {
        self.oracle.extend_clauses([clause![!act]])?;
        Ok(())
    }

    /// Logs a candidate objective value found by a model
    pub fn log_candidate(&mut self, obj: usize) -> anyhow::Result<()> {
        self.stats.n_candidates += 1;
        if let Some(logger) = &mut self.logger {
            logger.log_candidate(obj).context("logger failed")?;
        }
        Ok(())
    }

    /// Logs an update of the bound window
    pub fn log_bounds(&mut self, lower: usize, upper: usize) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_bounds(lower, upper).context("logger failed")?;
        }
        Ok(())
    }

    /// Logs why the search gave up
    pub fn log_termination(&mut self, term: Termination) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_termination(term).context("logger failed")?;
        }
        Ok(())
    }

    /// Logs a free-form message
    pub fn log_message(&mut self, msg: &str) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_message(msg).context("logger failed")?;
        }
        Ok(())
    }

    fn log_routine_start(&mut self, desc: &'static str) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_routine_start(desc).context("logger failed")?;
        }
        Ok(())
    }

    fn log_routine_end(&mut self) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_routine_end().context("logger failed")?;
        }
        Ok(())
    }

    /// Builds the result record for the final search state
    pub fn run_result(&self, state: SearchState, model: Option<&Assignment>) -> RunResult {
        let time = self.start.elapsed().as_secs();
        let time = match self.lims.timeout {
            Some(budget) => time.min(budget.as_secs()),
            None => time,
        };
        let optimal = matches!(state, SearchState::Exhausted { optimal: true });
        match model {
            Some(model) => RunResult {
                time,
                optimal,
                obj: Some(self.encoding.objective(model)),
                sol: self.encoding.routes(model),
            },
            None => RunResult::unsolved(time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SearchState;

    #[test]
    fn state_machine_linear_run() {
        let state = SearchState::Searching;
        let state = state.found(12);
        assert_eq!(state, SearchState::SolutionFound { best: 12 });
        let state = state.found(8);
        assert_eq!(state.best(), Some(8));
        let state = state.proven_optimal();
        assert_eq!(state, SearchState::Exhausted { optimal: true });
        assert!(state.is_exhausted());
    }

    #[test]
    fn state_machine_infeasible() {
        // proving optimality without a model means infeasible, not optimal
        let state = SearchState::Searching.proven_optimal();
        assert_eq!(state, SearchState::Exhausted { optimal: false });
    }

    #[test]
    fn state_machine_budget_exhaustion() {
        let state = SearchState::Searching.found(5).gave_up();
        assert_eq!(state, SearchState::Exhausted { optimal: false });
        let state = SearchState::Searching.gave_up();
        assert_eq!(state, SearchState::Exhausted { optimal: false });
    }

    #[test]
    fn state_machine_exhausted_is_final() {
        let state = SearchState::Searching.found(5).proven_optimal();
        assert_eq!(state.found(3), state);
        assert_eq!(state.gave_up(), state);
        assert_eq!(state.proven_optimal(), state);
    }

    #[test]
    fn state_machine_keeps_best() {
        let state = SearchState::Searching.found(9).found(11);
        assert_eq!(state.best(), Some(9));
    }
}
