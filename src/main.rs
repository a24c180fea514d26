#[macro_use]
extern crate log;

use std::{env::args, str::FromStr, thread, time::Duration};

use pretty_env_logger::formatted_builder;
use rand::{rngs::StdRng, Rng, SeedableRng};
use satire_incremental::{prelude::*, report::Report, solver, Solver, Status, Strictness};

fn usage_string() -> String {
    format!(
        "Usage: {} [--<option>=<value>]... <command>

command:
    solve <file_name> [seconds] - solve the formula, interrupting after the time limit
                                  (the time limit is the only interrupt, Ctrl-C aborts the process)
    cubes <file_name> <depth> - split the formula into cubes
    simplify <file_name> <rounds> - simplify the formula and print what remains
    random <variables> <k> [seed] - grow a random k-SAT formula until it is unsatisfiable
    options - list the available options",
        args().next().unwrap_or_else(|| "satire-incremental".to_owned())
    )
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unknown command '{}'\n\n{}", name, usage_string()))]
    UnknownCommand { name: String },
    #[snafu(display("Unknown option '{}'", option))]
    UnknownOption { option: String },
    #[snafu(display("Invalid value '{}' for {}", value, name))]
    InvalidArgument { name: &'static str, value: String },
    #[snafu(display("Required argument does not exist\n\n{}", usage_string()))]
    MissingArgument,
    #[snafu(display("Solver failed"))]
    SolverError { source: solver::Error },
}

fn parse_arg<T: FromStr>(args: &[String], index: usize, name: &'static str) -> Result<T, Error> {
    let value = args.get(index).context(MissingArgument)?;
    value.parse::<T>().ok().context(InvalidArgument {
        name,
        value: value.to_owned(),
    })
}

fn configured(options: &[String]) -> Result<Solver, Error> {
    let mut solver = Solver::new();
    for option in options {
        ensure!(
            solver.set_long_option(option).context(SolverError)?,
            UnknownOption {
                option: option.to_owned()
            }
        );
    }
    Ok(solver)
}

fn load(args: &[String], options: &[String]) -> Result<Solver, Error> {
    let path = args.get(1).context(MissingArgument)?;
    let mut solver = configured(options)?;
    let variables = solver
        .read_dimacs(path, Strictness::Relaxed)
        .context(SolverError)?;
    info!("read {} variables from '{}'", variables, path);
    Ok(solver)
}

fn print_outcome(solver: &Solver, status: Status) -> Result<(), Error> {
    println!("s {}", status);
    if status == Status::Satisfiable {
        let model = solver.model().context(SolverError)?;
        let literals = model.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        println!("v {} 0", literals.join(" "));
    }
    Ok(())
}

fn solve(solver: &mut Solver, seconds: Option<u64>) -> Result<(), Error> {
    if let Some(seconds) = seconds {
        let flag = solver.interrupt_flag();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            flag.raise();
        });
    }

    match solver.solve() {
        Ok(status) => print_outcome(solver, status),
        Err(e) if e.is_interrupt() => {
            warn!("solving interrupted after {} seconds", seconds.unwrap_or(0));
            println!("s {}", Status::Unsolved);
            Ok(())
        }
        Err(e) => Err(e).context(SolverError),
    }
}

fn print_simplified(solver: &Solver, status: Status) -> Result<(), Error> {
    println!("s {}", status);
    let clauses = solver.clauses().context(SolverError)?;
    println!("p cnf {} {}", solver.vars(), clauses.len());
    for clause in clauses {
        let literals = clause.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        println!("{} 0", literals.join(" "));
    }
    for (clause, witness) in solver.witnesses().context(SolverError)? {
        let clause = clause.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        let witness = witness.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        println!("c witness {} 0 {} 0", witness.join(" "), clause.join(" "));
    }
    Ok(())
}

/// Adds random clauses of `width` literals until the formula becomes unsatisfiable,
/// printing learned binary and unit clauses on the way.
fn grow_random_formula(
    solver: &mut Solver,
    variables: i32,
    width: usize,
    seed: u64,
) -> Result<(), Error> {
    let mut pending: Vec<i32> = Vec::new();
    solver.connect_learner(
        |size| Ok(size <= 2),
        move |literal| {
            if literal == 0 {
                let literals = pending.iter().map(|l| l.to_string()).collect::<Vec<_>>();
                println!("c learned {} 0", literals.join(" "));
                pending.clear();
            } else {
                pending.push(literal);
            }
            Ok(())
        },
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut added = 0;
    loop {
        let clause = (0..width)
            .map(|_| {
                let variable = rng.gen_range(1..=variables);
                if rng.gen::<bool>() {
                    variable
                } else {
                    -variable
                }
            })
            .collect::<Vec<_>>();
        solver.add_clause(clause).context(SolverError)?;
        added += 1;

        if added % variables as usize != 0 {
            continue;
        }
        let status = solver.solve().context(SolverError)?;
        debug!("{} random clauses: {}", added, status);
        if status == Status::Unsatisfiable {
            println!("s {} after {} clauses", status, added);
            return Ok(());
        }
    }
}

fn dispatch_command(args: Vec<String>, options: Vec<String>) -> Result<(), Error> {
    match args.get(0).map(|s| s.as_str()) {
        Some("solve") => {
            let mut solver = load(&args, &options)?;
            let seconds = match args.get(2) {
                Some(_) => Some(parse_arg::<u64>(&args, 2, "seconds")?),
                None => None,
            };
            solve(&mut solver, seconds)?;
            solver.print_statistics();
        }
        Some("cubes") => {
            let mut solver = load(&args, &options)?;
            let depth = parse_arg::<usize>(&args, 2, "depth")?;
            let cubes = solver.generate_cubes(depth).context(SolverError)?;
            println!("s {}", cubes.status);
            for cube in cubes.cubes {
                let literals = cube.iter().map(|l| l.to_string()).collect::<Vec<_>>();
                println!("a {} 0", literals.join(" "));
            }
        }
        Some("simplify") => {
            let mut solver = load(&args, &options)?;
            let rounds = parse_arg::<usize>(&args, 2, "rounds")?;
            let status = solver.simplify(rounds).context(SolverError)?;
            print_simplified(&solver, status)?;
        }
        Some("random") => {
            let variables = parse_arg::<i32>(&args, 1, "variables")?;
            let width = parse_arg::<usize>(&args, 2, "k")?;
            ensure!(
                variables > 0 && width > 0,
                InvalidArgument {
                    name: "random formula size",
                    value: format!("{} {}", variables, width)
                }
            );
            let seed = match args.get(3) {
                Some(_) => parse_arg::<u64>(&args, 3, "seed")?,
                None => 0,
            };

            let mut solver = configured(&options)?;
            grow_random_formula(&mut solver, variables, width, seed)?;
            solver.print_statistics();
        }
        Some("options") => {
            Solver::print_usage();
            Solver::print_configurations();
        }
        Some(name) => UnknownCommand {
            name: name.to_owned(),
        }
        .fail()?,
        None => MissingArgument.fail()?,
    }

    Ok(())
}

fn init_logger() {
    let mut builder = formatted_builder();

    if let Ok(s) = ::std::env::var("RUST_LOG") {
        builder.parse_filters(&s);
    } else {
        if cfg!(debug_assertions) {
            builder.parse_filters("satire_incremental=debug");
        } else {
            builder.parse_filters("satire_incremental=warn");
        }
    }

    builder.try_init().expect("Failed to initialize the logger");
}

fn main() -> Result<(), Report> {
    init_logger();

    let mut args = args();

    // drop arg[0]
    args.next();

    let (options, remaining): (Vec<_>, Vec<_>) = args.partition(|arg| arg.starts_with("--"));

    if remaining.is_empty() {
        println!("{}", usage_string());
        return Ok(());
    }

    dispatch_command(remaining, options)?;

    Ok(())
}
