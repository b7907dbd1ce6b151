//! prezen CLI: solve a FlatZinc file and print the session output.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use prezen::solver::{FznSolver, SolverOptions};
use prezen::Config;

/// FlatZinc presolving front-end with a bundled reference engine.
#[derive(Parser, Debug)]
#[command(
    name = "prezen",
    version,
    about = "FlatZinc presolving front-end for constraint solvers",
    long_about = "Parses a FlatZinc model, presolves it to a fix-point, and solves it\n\
                  with the bundled reference engine. Output follows the FlatZinc\n\
                  specification: solutions end with `----------`, a completed search\n\
                  with `==========`."
)]
struct Args {
    /// FlatZinc input file (.fzn)
    #[arg(value_name = "MODEL")]
    file: PathBuf,

    /// Run the presolve fix-point (the default)
    #[arg(long, overrides_with = "no_presolve")]
    presolve: bool,

    /// Disable the presolve fix-point
    #[arg(long)]
    no_presolve: bool,

    /// Route pure-boolean constraints to a SAT-style sub-propagator
    #[arg(long, alias = "use_sat")]
    use_sat: bool,

    /// Number of workers (the bundled engine runs single-threaded)
    #[arg(long, value_name = "N", default_value = "1")]
    workers: usize,

    /// Find all solutions (satisfaction problems)
    #[arg(short = 'a', long)]
    all_solutions: bool,

    /// Stop after N solutions
    #[arg(short = 'n', long, value_name = "N")]
    num_solutions: Option<usize>,

    /// Time limit in milliseconds (0 = no limit)
    #[arg(short = 't', long, value_name = "MS", default_value = "0")]
    time: u64,

    /// Print solver statistics
    #[arg(short = 's', long)]
    statistics: bool,

    /// Verbose logging (repeat for more detail)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let options = SolverOptions {
        config: Config {
            presolve: !args.no_presolve,
            use_sat: args.use_sat,
            workers: args.workers.max(1),
        },
        all_solutions: args.all_solutions,
        max_solutions: args.num_solutions,
        statistics: args.statistics,
        timeout_ms: args.time,
    };

    let mut solver = FznSolver::with_options(options);
    if let Err(e) = solver.load_file(&args.file.display().to_string()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = solver.solve() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    print!("{}", solver.to_flatzinc());
    ExitCode::SUCCESS
}
