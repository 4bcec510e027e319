//! Command-line front end: sort a binary file of 32-bit integers across
//! the launched process group and report the outcome.
//!
//! Single process: `ferrosort [-d 0|1] <file>`.
//! MPI deployment (feature `mpi`): `mpiexec -n <P> ferrosort [-d 0|1] <file>`
//! with P a power of two in [1, 8].
//!
//! Every process parses the (replicated) argument list deterministically;
//! only the coordinator prints. The element count comes from the input
//! file and travels to the other processes in the settings broadcast.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use ferrosort::comm::ROOT;
use ferrosort::timer::DeltaTimer;
use ferrosort::{Communicator, Direction, Error, engine, sort};

const PROGRAM: &str = "ferrosort";

fn main() -> ExitCode {
    #[cfg(feature = "mpi")]
    let world = match ferrosort::MpiComm::init() {
        Ok(world) => world,
        Err(e) => {
            eprintln!("{PROGRAM}: {e}");
            return ExitCode::FAILURE;
        }
    };
    #[cfg(not(feature = "mpi"))]
    let world = ferrosort::LocalComm::solo();

    let args: Vec<String> = env::args().skip(1).collect();
    drive(world, &args)
}

/// Parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Run { direction: Direction, file: PathBuf },
    Help,
}

fn parse_args(args: &[String]) -> Result<Parsed, String> {
    let mut direction = Direction::Ascending;
    let mut file = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" => return Ok(Parsed::Help),
            "-d" => {
                let value = it.next().ok_or("option -d requires a value")?;
                direction = value
                    .parse::<i64>()
                    .ok()
                    .and_then(Direction::from_flag)
                    .ok_or_else(|| {
                        format!("invalid sort direction '{value}' (0 = ascending, 1 = descending)")
                    })?;
            }
            s if s.starts_with('-') => return Err(format!("invalid option '{s}'")),
            s => {
                if file.replace(PathBuf::from(s)).is_some() {
                    return Err("more than one file name provided".into());
                }
            }
        }
    }

    match file {
        Some(file) => Ok(Parsed::Run { direction, file }),
        None => Err("no file name provided".into()),
    }
}

fn usage() {
    eprintln!("\nSynopsis: {PROGRAM} [OPTIONS] <FILE>");
    eprintln!("  OPTIONS:");
    eprintln!("  -d      --- sort direction (0 = ascending || 1 = descending) (default = 0)");
    eprintln!("  -h      --- print this help");
}

fn drive<C: Communicator>(world: C, args: &[String]) -> ExitCode {
    let at_root = world.rank() == ROOT;

    // Topology first: local check on every process, nobody is blocked yet.
    if let Err(e) = engine::check_topology(world.size()) {
        if at_root {
            eprintln!("{PROGRAM}: {e}");
        }
        return ExitCode::FAILURE;
    }

    let (direction, file) = match parse_args(args) {
        Ok(Parsed::Run { direction, file }) => (direction, file),
        Ok(Parsed::Help) => {
            if at_root {
                usage();
            }
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            if at_root {
                eprintln!("{PROGRAM}: {msg}");
                usage();
            }
            return ExitCode::FAILURE;
        }
    };

    if at_root {
        println!("File name = {}", file.display());
        println!("Sort direction = {direction}");
    }

    let mut timer = DeltaTimer::start();

    let (settings, buffer) =
        match engine::exchange_settings(&world, direction, at_root.then_some(file.as_path())) {
            Ok(exchange) => exchange,
            Err(Error::Aborted) => {
                // The coordinator already reported the cause.
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("{PROGRAM}: {e}");
                return ExitCode::FAILURE;
            }
        };

    let sorted = match engine::run(world, settings, buffer) {
        Ok(sorted) => sorted,
        Err(e) => {
            eprintln!("{PROGRAM}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Only the coordinator ends the run holding the array.
    if let Some(sorted) = sorted {
        let ordered = sort::is_ordered(&sorted, settings.direction);
        if ordered {
            println!("The array is properly sorted.");
        } else {
            println!("ERROR: the array is NOT properly sorted!");
        }
        println!("Elapsed time = {:.6} s", timer.lap());
        if !ordered {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
