use std::{fs, thread};

use packhorse_core::{
    instance::Instance, Bisect, Init, KernelFunctions, LinSu, RunResult, SearchStrategy, Solve,
};
use rustsat_cadical::CaDiCaL;

mod cli;
use cli::Cli;

/// The SAT solver used
type Oracle = CaDiCaL<'static, 'static>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::init();

    match sub_main(&cli) {
        Ok(_) => (),
        Err(err) => {
            cli.error(&format!("{err}"))?;
            std::process::exit(1);
        }
    };

    Ok(())
}

fn sub_main(cli: &Cli) -> anyhow::Result<()> {
    cli.print_header()?;
    cli.print_solver_config()?;

    cli.info(&format!("solving instance {:?}", cli.inst_path))?;
    let inst = Instance::from_path(&cli.inst_path)?;

    if let Some(horizon) = cli.opts.route_horizon {
        let needed = (inst.n_packages + 1)
            .saturating_sub(inst.n_couriers)
            .max(1);
        if horizon < needed {
            cli.warning(&format!(
                "route horizon {} is below {}, optimal plans may be cut off",
                horizon, needed
            ))?;
        }
    }

    let res = match cli.strategy {
        SearchStrategy::Linear => run::<LinSu<Oracle>>(cli, inst.clone())?,
        SearchStrategy::Binary => run::<Bisect<Oracle>>(cli, inst.clone())?,
    };

    cli.print_result(&inst, &res)?;

    if let Some(path) = &cli.json_path {
        fs::write(path, serde_json::to_string(&res)?)?;
        cli.info(&format!("result record written to {:?}", path))?;
    }

    Ok(())
}

fn run<Alg>(cli: &Cli, inst: Instance) -> anyhow::Result<RunResult>
where
    Alg: Init + Solve,
{
    let mut alg = Alg::new(inst, cli.opts)?;

    // === Set up CLI interaction ===
    // Set up signal handling
    let mut interrupter = alg.interrupter();
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGXCPU,
        signal_hook::consts::SIGABRT,
    ])?;
    // Thread for catching incoming signals
    thread::spawn(move || {
        for _ in signals.forever() {
            interrupter.interrupt();
        }
    });

    alg.attach_logger(cli.new_cli_logger());

    let res = alg.solve(cli.limits)?;

    cli.print_stats(alg.stats())?;
    cli.print_encoding_stats(alg.encoding_stats())?;
    cli.print_oracle_stats(alg.oracle_stats())?;

    Ok(res)
}
