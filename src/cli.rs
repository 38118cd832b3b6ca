//! # Command Line Interface for the Solver Binary

use std::io::Error as IOError;
use std::path::PathBuf;
use std::time::Duration;
use std::{
    fmt::{self},
    io::Write,
};

use clap::{crate_authors, crate_name, crate_version, Args, Parser, Subcommand, ValueEnum};
use cpu_time::ProcessTime;
use packhorse_core::{
    instance::Instance,
    options::{CapacityEncoding, KernelOptions},
    EncodingStats, Limits, RunResult, SearchStrategy, Stats, Termination, WriteSolverLog,
};
use rustsat::solvers::{SolverResult, SolverStats};
use termcolor::{Buffer, BufferWriter, Color, ColorSpec, WriteColor};

macro_rules! none_if_zero {
    ($val:expr) => {
        if $val == 0 {
            None
        } else {
            Some($val)
        }
    };
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: StrategyCommand,
}

#[derive(Subcommand)]
enum StrategyCommand {
    /// Linear sat-unsat search over the objective bound
    Linear {
        #[command(flatten)]
        shared: SharedArgs,
    },
    /// Binary search over the objective bound window
    Binary {
        #[command(flatten)]
        shared: SharedArgs,
    },
}

#[derive(Args)]
struct SharedArgs {
    /// The wall-clock budget for the whole solve in seconds (0 is no limit)
    #[arg(long, default_value_t = 300)]
    timeout: u64,
    /// Limit the number of SAT oracle calls (0 is no limit)
    #[arg(long, default_value_t = 0)]
    oracle_call_limit: usize,
    /// Ordering constraints between couriers with equal capacity
    #[arg(long, default_value_t = Bool::True)]
    symmetry_breaking: Bool,
    /// The encoding enforcing courier capacities
    #[arg(long, value_enum, default_value_t = CapacityEncoding::Adder)]
    capacity_encoding: CapacityEncoding,
    /// The number of route positions per courier (0 picks n - m + 1)
    #[arg(long, default_value_t = 0)]
    route_horizon: usize,
    /// Write the result record as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
    /// The path to the instance file to load
    inst_path: PathBuf,
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Args)]
struct LogArgs {
    #[command(flatten)]
    color: concolor_clap::Color,
    /// Print the solver configuration
    #[arg(long)]
    print_solver_config: bool,
    /// Don't print statistics
    #[arg(long)]
    no_print_stats: bool,
    /// Verbosity of the solver output
    #[arg(short, long, default_value_t = 0)]
    verbosity: u8,
    /// Log candidate objective values along the search trace
    #[arg(long)]
    log_candidates: bool,
    /// Log SAT oracle calls
    #[arg(long)]
    log_oracle_calls: bool,
    /// Log bound-window updates
    #[arg(long)]
    log_bounds: bool,
    /// Log routine starts and ends till a given depth
    #[arg(long, default_value_t = 0)]
    log_routines: usize,
}

impl From<&LogArgs> for LoggerConfig {
    fn from(args: &LogArgs) -> Self {
        LoggerConfig {
            log_candidates: args.log_candidates || args.verbosity >= 1,
            log_bounds: args.log_bounds || args.verbosity >= 1,
            log_oracle_calls: args.log_oracle_calls || args.verbosity >= 2,
            log_routines: std::cmp::max(args.log_routines, args.verbosity as usize * 2),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Bool {
    /// Turn on feature
    True,
    /// Turn off feature
    False,
}

impl From<Bool> for bool {
    fn from(val: Bool) -> Self {
        val == Bool::True
    }
}

impl fmt::Display for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bool::True => write!(f, "true"),
            Bool::False => write!(f, "false"),
        }
    }
}

pub struct Cli {
    pub strategy: SearchStrategy,
    pub opts: KernelOptions,
    pub limits: Limits,
    pub inst_path: PathBuf,
    pub json_path: Option<PathBuf>,
    stdout: BufferWriter,
    stderr: BufferWriter,
    print_solver_config: bool,
    print_stats: bool,
    color: concolor_clap::Color,
    logger_config: LoggerConfig,
}

impl Cli {
    pub fn init() -> Self {
        let writer = |stream: atty::Stream,
                      color: concolor_clap::Color,
                      mk: fn(termcolor::ColorChoice) -> BufferWriter| {
            mk(match color.color {
                concolor_clap::ColorChoice::Always => termcolor::ColorChoice::Always,
                concolor_clap::ColorChoice::Never => termcolor::ColorChoice::Never,
                concolor_clap::ColorChoice::Auto => {
                    if atty::is(stream) {
                        termcolor::ColorChoice::Auto
                    } else {
                        termcolor::ColorChoice::Never
                    }
                }
            })
        };
        let (strategy, shared) = match CliArgs::parse().command {
            StrategyCommand::Linear { shared } => (SearchStrategy::Linear, shared),
            StrategyCommand::Binary { shared } => (SearchStrategy::Binary, shared),
        };
        Cli {
            strategy,
            opts: KernelOptions {
                symmetry_breaking: shared.symmetry_breaking.into(),
                capacity_encoding: shared.capacity_encoding,
                route_horizon: none_if_zero!(shared.route_horizon),
            },
            limits: Limits {
                timeout: none_if_zero!(shared.timeout).map(Duration::from_secs),
                oracle_calls: none_if_zero!(shared.oracle_call_limit),
            },
            inst_path: shared.inst_path,
            json_path: shared.json,
            stdout: writer(atty::Stream::Stdout, shared.log.color, BufferWriter::stdout),
            stderr: writer(atty::Stream::Stderr, shared.log.color, BufferWriter::stderr),
            print_solver_config: shared.log.print_solver_config,
            print_stats: !shared.log.no_print_stats,
            color: shared.log.color,
            logger_config: (&shared.log).into(),
        }
    }

    pub fn new_cli_logger(&self) -> CliLogger {
        CliLogger {
            stdout: BufferWriter::stdout(match self.color.color {
                concolor_clap::ColorChoice::Always => termcolor::ColorChoice::Always,
                concolor_clap::ColorChoice::Never => termcolor::ColorChoice::Never,
                concolor_clap::ColorChoice::Auto => {
                    if atty::is(atty::Stream::Stdout) {
                        termcolor::ColorChoice::Auto
                    } else {
                        termcolor::ColorChoice::Never
                    }
                }
            }),
            config: self.logger_config.clone(),
            routine_stack: vec![],
        }
    }

    pub fn warning(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stderr.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Yellow)))?;
        write!(buffer, "warning")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn error(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stderr.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Red)))?;
        write!(buffer, "error")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn info(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
        write!(buffer, "info")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn print_header(&self) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Green)))?;
        write!(buffer, "{}", crate_name!())?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(buffer, " ({})", crate_version!())?;
        buffer.reset()?;
        writeln!(buffer, "{}", crate_authors!("\n"))?;
        write!(buffer, "search strategy: ")?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(buffer, "{}", self.strategy)?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, "==============================")?;
        buffer.reset()?;
        writeln!(buffer)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn print_solver_config(&self) -> Result<(), IOError> {
        if self.print_solver_config {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Solver Config")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "search-strategy", self.strategy)?;
            Self::print_parameter(
                &mut buffer,
                "symmetry-breaking",
                self.opts.symmetry_breaking,
            )?;
            Self::print_parameter(
                &mut buffer,
                "capacity-encoding",
                self.opts.capacity_encoding,
            )?;
            Self::print_parameter(
                &mut buffer,
                "route-horizon",
                OptVal::new(self.opts.route_horizon),
            )?;
            Self::print_parameter(
                &mut buffer,
                "timeout",
                OptVal::new(self.limits.timeout.map(DurPrinter::new)),
            )?;
            Self::print_parameter(
                &mut buffer,
                "oracle-call-limit",
                OptVal::new(self.limits.oracle_calls),
            )?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    pub fn print_result(&self, inst: &Instance, res: &RunResult) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        Self::start_block(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
        write!(buffer, "Result")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(buffer, ": ")?;
        buffer.reset()?;
        Self::print_parameter(&mut buffer, "optimal", res.optimal)?;
        Self::print_parameter(&mut buffer, "objective", OptVal::new(res.obj))?;
        Self::print_parameter(&mut buffer, "time", res.time)?;
        let depot = inst.depot();
        for (cou, route) in res.sol.iter().enumerate() {
            let mut dist = 0;
            let mut from = depot;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(buffer, "courier {}", cou + 1)?;
            buffer.reset()?;
            write!(buffer, ": depot")?;
            for &pac in route {
                dist += inst.dist(from, pac - 1);
                from = pac - 1;
                write!(buffer, " => {}", pac)?;
            }
            dist += inst.dist(from, depot);
            writeln!(buffer, " => depot (distance {})", dist)?;
        }
        Self::end_block(&mut buffer)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn print_stats(&self, stats: Stats) -> Result<(), IOError> {
        if self.print_stats {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Solver Stats")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "n-solve-calls", stats.n_solve_calls)?;
            Self::print_parameter(&mut buffer, "n-oracle-calls", stats.n_oracle_calls)?;
            Self::print_parameter(&mut buffer, "n-candidates", stats.n_candidates)?;
            Self::print_parameter(
                &mut buffer,
                "cpu-time",
                DurPrinter::new(ProcessTime::now().as_duration()),
            )?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    pub fn print_encoding_stats(&self, stats: EncodingStats) -> Result<(), IOError> {
        if self.print_stats {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Encoding Stats")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "n-clauses", stats.n_clauses)?;
            Self::print_parameter(&mut buffer, "n-vars", stats.n_vars)?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    pub fn print_oracle_stats(&self, stats: SolverStats) -> Result<(), IOError> {
        if self.print_stats {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Oracle Stats")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "n-sat-solves", stats.n_sat)?;
            Self::print_parameter(&mut buffer, "n-unsat-solves", stats.n_unsat)?;
            Self::print_parameter(&mut buffer, "n-clauses", stats.n_clauses)?;
            Self::print_parameter(&mut buffer, "max-var", OptVal::new(stats.max_var))?;
            Self::print_parameter(&mut buffer, "avg-clause-len", stats.avg_clause_len)?;
            Self::print_parameter(
                &mut buffer,
                "cpu-solve-time",
                DurPrinter::new(stats.cpu_solve_time),
            )?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn print_parameter<V: fmt::Display>(
        buffer: &mut Buffer,
        name: &str,
        val: V,
    ) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(buffer, "{}", name)?;
        buffer.reset()?;
        writeln!(buffer, ": {}", val)?;
        Ok(())
    }

    fn start_block(buffer: &mut Buffer) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(buffer, ">>>>>")?;
        buffer.reset()?;
        writeln!(buffer)?;
        Ok(())
    }

    fn end_block(buffer: &mut Buffer) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(buffer, "<<<<<")?;
        buffer.reset()?;
        writeln!(buffer)?;
        Ok(())
    }
}

#[derive(Clone)]
struct LoggerConfig {
    log_candidates: bool,
    log_bounds: bool,
    log_oracle_calls: bool,
    log_routines: usize,
}

pub struct CliLogger {
    stdout: BufferWriter,
    config: LoggerConfig,
    routine_stack: Vec<&'static str>,
}

impl CliLogger {
    fn print_tagged(&self, tag: &str, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(buffer, "{}", tag)?;
        buffer.reset()?;
        writeln!(buffer, ": {}", msg)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }
}

impl WriteSolverLog for CliLogger {
    fn log_candidate(&mut self, obj: usize) -> anyhow::Result<()> {
        if self.config.log_candidates {
            self.print_tagged(
                "candidate",
                &format!(
                    "objective: {}; cpu-time: {}",
                    obj,
                    DurPrinter::new(ProcessTime::now().as_duration()),
                ),
            )?;
        }
        Ok(())
    }

    fn log_oracle_call(&mut self, result: SolverResult) -> anyhow::Result<()> {
        if self.config.log_oracle_calls {
            self.print_tagged(
                "oracle call",
                &format!(
                    "result: {}; cpu-time: {}",
                    result,
                    DurPrinter::new(ProcessTime::now().as_duration()),
                ),
            )?;
        }
        Ok(())
    }

    fn log_bounds(&mut self, lower: usize, upper: usize) -> anyhow::Result<()> {
        if self.config.log_bounds {
            self.print_tagged("bounds", &format!("window: [{}, {}]", lower, upper))?;
        }
        Ok(())
    }

    fn log_routine_start(&mut self, desc: &'static str) -> anyhow::Result<()> {
        self.routine_stack.push(desc);
        if self.routine_stack.len() <= self.config.log_routines {
            self.print_tagged("routine start", desc)?;
        }
        Ok(())
    }

    fn log_routine_end(&mut self) -> anyhow::Result<()> {
        let within = self.routine_stack.len() <= self.config.log_routines;
        if let Some(desc) = self.routine_stack.pop() {
            if within {
                self.print_tagged("routine end", desc)?;
            }
        }
        Ok(())
    }

    fn log_termination(&mut self, term: Termination) -> anyhow::Result<()> {
        self.print_tagged("termination", &format!("{}", term))?;
        Ok(())
    }

    fn log_message(&mut self, msg: &str) -> anyhow::Result<()> {
        self.print_tagged("message", msg)?;
        Ok(())
    }
}

struct OptVal<T> {
    val: Option<T>,
}

impl<T> OptVal<T> {
    fn new(val: Option<T>) -> Self {
        OptVal { val }
    }
}

impl<T: fmt::Display> fmt::Display for OptVal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.val {
            Some(t) => fmt::Display::fmt(&t, f),
            None => write!(f, "none"),
        }
    }
}

struct DurPrinter {
    dur: Duration,
}

impl DurPrinter {
    fn new(dur: Duration) -> Self {
        Self { dur }
    }
}

impl fmt::Display for DurPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dur)
    }
}
