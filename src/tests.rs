use std::{
    cell::RefCell,
    fs, io,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    rc::Rc,
};

use paste::paste;

use crate::{
    bridge::{Interrupted, InterruptFlag},
    engine::{self, Fixed, State, Status},
    parser::{parse_file, Strictness},
    solver::{Error, Solver},
};

fn check_model(solver: &Solver, path: impl AsRef<Path>) {
    let formula = parse_file(path, Strictness::Strict).unwrap();
    for clause in formula.cnf.clauses() {
        assert!(
            clause
                .to_dimacs()
                .iter()
                .any(|&literal| solver.val(literal).unwrap() == literal),
            "clause {:?} is falsified",
            clause.to_dimacs()
        );
    }
}

fn load(name: &str) -> Solver {
    let mut solver = Solver::new();
    solver
        .read_dimacs(format!("testcases/small/{}.cnf", name), Strictness::Strict)
        .unwrap();
    solver
}

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "satire-incremental-{}-{}",
        std::process::id(),
        name
    ))
}

fn sorted_clauses(solver: &Solver) -> Vec<Vec<i32>> {
    let mut clauses = Vec::new();
    assert!(solver
        .traverse_clauses(|clause: &[i32]| {
            let mut clause = clause.to_vec();
            clause.sort_unstable();
            clauses.push(clause);
            Ok(true)
        })
        .unwrap());
    clauses.sort();
    clauses
}

macro_rules! sat_testcase_with_configuration {
    ($config:ident, $preprocessing:expr, $dir:ident, $name:ident) => {
        paste! {
            #[test]
            fn [< $config:lower _ $dir _ $name >]() {
                let path = concat!("testcases/", stringify!($dir), "/", stringify!($name), ".cnf");
                let mut solver = Solver::new();
                assert!(solver.configure(stringify!($config)).unwrap());
                solver.read_dimacs(path, Strictness::Strict).unwrap();
                assert!(solver.limit("preprocessing", $preprocessing).unwrap());
                assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
                check_model(&solver, path);
            }
        }
    };
}

macro_rules! unsat_testcase_with_configuration {
    ($config:ident, $preprocessing:expr, $dir:ident, $name:ident) => {
        paste! {
            #[test]
            fn [< $config:lower _ $dir _ $name >]() {
                let path = concat!("testcases/", stringify!($dir), "/", stringify!($name), ".cnf");
                let mut solver = Solver::new();
                assert!(solver.configure(stringify!($config)).unwrap());
                solver.read_dimacs(path, Strictness::Strict).unwrap();
                assert!(solver.limit("preprocessing", $preprocessing).unwrap());
                assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
                assert_eq!(solver.state(), State::Unsatisfied);
            }
        }
    };
}

macro_rules! sat_testcase {
    ($dir:ident, $name:ident) => {
        sat_testcase_with_configuration!(default, 0, $dir, $name);
        sat_testcase_with_configuration!(sat, 3, $dir, $name);
    };
}

macro_rules! unsat_testcase {
    ($dir:ident, $name:ident) => {
        unsat_testcase_with_configuration!(plain, 0, $dir, $name);
        unsat_testcase_with_configuration!(unsat, 3, $dir, $name);
    };
}

sat_testcase!(small, unit_sat);
unsat_testcase!(small, unit_unsat);
sat_testcase!(small, chain);

unsat_testcase!(small, full2);
unsat_testcase!(small, full3);
unsat_testcase!(small, full4);

sat_testcase!(small, php33);
unsat_testcase!(small, php32);
unsat_testcase!(small, php43);
unsat_testcase!(small, php54);

sat_testcase!(small, planted20);
sat_testcase!(small, planted30);

mod callbacks {
    use super::*;

    #[test]
    fn terminator_error_is_reraised() {
        let mut solver = load("php43");
        let mut calls = 0;
        solver.connect_terminator(move || {
            calls += 1;
            if calls == 2 {
                Err(io::Error::new(io::ErrorKind::Other, "stop here").into())
            } else {
                Ok(false)
            }
        });

        let error = solver.solve().unwrap_err();
        let callback = error.callback().unwrap();
        assert_eq!(callback.to_string(), "stop here");
        assert!(callback.downcast_ref::<io::Error>().is_some());
        assert!(!error.is_interrupt());
        assert_eq!(solver.state(), State::Unknown);

        solver.disconnect_terminator();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn terminator_stops_solving() {
        let mut solver = load("php54");
        solver.connect_terminator(|| Ok(true));
        assert_eq!(solver.solve().unwrap(), Status::Unsolved);
        assert_eq!(solver.status(), Status::Unsolved);
    }

    #[test]
    fn terminate_request_is_cleared_after_the_call() {
        let mut solver = load("php43");
        solver.terminate();
        assert_eq!(solver.solve().unwrap(), Status::Unsolved);
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn learner_error_is_reraised() {
        let mut solver = load("php43");
        solver.connect_learner(|_| Ok(true), |_| Err("no room".into()));
        let error = solver.solve().unwrap_err();
        assert_eq!(error.callback().unwrap().to_string(), "no room");
        assert_ne!(solver.state(), State::Solving);
        assert_eq!(solver.statistics().solves, 1);

        solver.disconnect_learner();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn learner_receives_terminated_clauses() {
        let learned = Rc::new(RefCell::new(Vec::new()));
        let sizes = Rc::new(RefCell::new(Vec::new()));

        let mut solver = load("php43");
        {
            let learned = Rc::clone(&learned);
            let sizes = Rc::clone(&sizes);
            solver.connect_learner(
                move |size| {
                    sizes.borrow_mut().push(size);
                    Ok(true)
                },
                move |literal| {
                    learned.borrow_mut().push(literal);
                    Ok(())
                },
            );
        }
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);

        let learned = learned.borrow();
        let clauses = learned.split(|&literal| literal == 0).count() - 1;
        assert_eq!(learned.last(), Some(&0));
        assert_eq!(clauses, sizes.borrow().len());
    }

    #[test]
    fn panics_are_resumed_after_the_call() {
        let mut solver = load("php43");
        solver.connect_terminator(|| panic!("terminator panicked"));

        let payload = panic::catch_unwind(AssertUnwindSafe(|| solver.solve())).unwrap_err();
        assert_eq!(
            payload.downcast_ref::<&str>(),
            Some(&"terminator panicked")
        );
        assert_eq!(solver.state(), State::Unknown);
    }

    #[test]
    fn interrupt_flag_stops_solving() {
        let mut solver = load("php54");
        let flag = solver.interrupt_flag();
        flag.raise();

        let error = solver.solve().unwrap_err();
        assert!(error.is_interrupt());
        assert!(!flag.is_raised());
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn interrupt_flag_raised_from_another_thread() {
        let mut solver = load("php54");
        let flag = solver.interrupt_flag();
        std::thread::spawn(move || flag.raise()).join().unwrap();

        assert!(solver.solve().unwrap_err().is_interrupt());
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn interrupt_sources_can_be_replaced() {
        let mut solver = load("php43");
        solver.connect_interrupt_source(|| Err(Interrupted.into()));
        assert!(solver.lookahead().unwrap_err().is_interrupt());

        let flag = InterruptFlag::new();
        solver.connect_interrupt_source(flag.clone());
        solver.interrupt_flag().raise();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
        assert!(!flag.is_raised());
    }

    #[test]
    fn interrupt_terminator_can_be_reconnected() {
        let mut solver = load("php43");
        solver.disconnect_terminator();
        solver.interrupt_flag().raise();
        assert!(solver.limit("decisions", 0).unwrap());
        assert_eq!(solver.solve().unwrap(), Status::Unsolved);

        solver.connect_interrupt_terminator();
        assert!(solver.solve().unwrap_err().is_interrupt());
    }

    #[test]
    fn disconnecting_twice_is_harmless() {
        let mut solver = load("unit_sat");
        solver.disconnect_terminator();
        solver.disconnect_terminator();
        solver.disconnect_learner();
        solver.disconnect_learner();
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
    }

    #[test]
    fn traversal_failures_are_reraised() {
        let mut solver = load("full3");
        let mut visited = 0;
        let error = solver
            .traverse_clauses(|_: &[i32]| {
                visited += 1;
                Err("visitor gave up".into())
            })
            .unwrap_err();
        assert_eq!(visited, 1);
        assert_eq!(error.callback().unwrap().to_string(), "visitor gave up");

        assert!(!solver.traverse_clauses(|_: &[i32]| Ok(false)).unwrap());
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn cube_generation_reraises_terminator_errors() {
        let mut solver = load("php54");
        solver.connect_terminator(|| Err("cubes interrupted".into()));
        let error = solver.generate_cubes(2).unwrap_err();
        assert_eq!(error.callback().unwrap().to_string(), "cubes interrupted");
    }
}

mod incremental {
    use super::*;

    #[test]
    fn failed_assumptions() {
        let mut solver = Solver::new();
        solver.add_clause(vec![-1, -2]).unwrap();
        solver.solve_with(vec![3, 1, 2]).unwrap();
        assert_eq!(solver.status(), Status::Unsatisfiable);

        let failed1 = solver.failed(1).unwrap();
        let failed2 = solver.failed(2).unwrap();
        assert!(failed1 || failed2);
        assert!(!solver.failed(3).unwrap());

        match solver.failed(4) {
            Err(Error::EngineReported {
                source: engine::Error::NotAssumed { literal: 4 },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }

        // assumptions only last for one call
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
    }

    #[test]
    fn model_values() {
        let mut solver = Solver::new();
        solver.add_clause(vec![1, 2]).unwrap();
        solver.phase(-1).unwrap();
        solver.phase(2).unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);

        assert_eq!(solver.val(1).unwrap(), -1);
        assert_eq!(solver.val(-1).unwrap(), -1);
        assert_eq!(solver.val(2).unwrap(), 2);
        assert_eq!(solver.model().unwrap(), vec![-1, 2]);
    }

    #[test]
    fn clauses_accumulate_between_calls() {
        let mut solver = Solver::new();
        solver.add_clauses(vec![vec![1, 2], vec![-1, 2]]).unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
        assert_eq!(solver.val(2).unwrap(), 2);

        solver.add_clause(vec![-2]).unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
        assert_eq!(solver.fixed(2).unwrap(), Fixed::Negation);
    }

    #[test]
    fn fixed_literals() {
        let mut solver = load("unit_sat");
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
        assert_eq!(solver.fixed(1).unwrap(), Fixed::Implied);
        assert_eq!(solver.fixed(2).unwrap(), Fixed::Negation);
        assert_eq!(solver.fixed(-2).unwrap(), Fixed::Implied);
        assert_eq!(solver.fixed(7).unwrap(), Fixed::Unclear);
    }

    #[test]
    fn state_gating() {
        let mut solver = Solver::new();
        assert_eq!(solver.state(), State::Initializing);
        assert!(solver.set("seed", 7).unwrap());
        assert_eq!(solver.state(), State::Configuring);
        assert_eq!(solver.get("seed"), Some(7));

        solver.add(1).unwrap();
        assert_eq!(solver.state(), State::Adding);
        match solver.solve() {
            Err(Error::EngineReported {
                source: engine::Error::InvalidState { .. },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        solver.add(0).unwrap();

        match solver.set("seed", 1) {
            Err(Error::EngineReported {
                source: engine::Error::InvalidState { .. },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(solver.val(1).is_err());
        assert!(solver.failed(1).is_err());

        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
        assert_eq!(solver.state(), State::Satisfied);
        assert!(solver.failed(1).is_err());
    }

    #[test]
    fn invalid_literals() {
        let mut solver = Solver::new();
        match solver.assume(i32::MIN) {
            Err(Error::EngineReported {
                source: engine::Error::InvalidLiteral { .. },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(solver.freeze(0).is_err());
    }

    #[test]
    fn freeze_and_melt() {
        let mut solver = Solver::new();
        solver.freeze(1).unwrap();
        solver.freeze(1).unwrap();
        assert!(solver.frozen(1).unwrap());
        solver.melt(1).unwrap();
        assert!(solver.frozen(1).unwrap());
        solver.melt(1).unwrap();
        assert!(!solver.frozen(1).unwrap());

        match solver.melt(1) {
            Err(Error::EngineReported {
                source: engine::Error::NotFrozen { literal: 1 },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn frozen_variables_survive_simplification() {
        let mut solver = Solver::new();
        solver.add_clauses(vec![vec![1, 2], vec![-1, 3]]).unwrap();
        for variable in 1..=3 {
            solver.freeze(variable).unwrap();
        }
        assert_eq!(solver.simplify(3).unwrap(), Status::Unsolved);
        assert_eq!(solver.active(), 3);
        assert!(solver
            .traverse_witnesses_forward(|_: &[i32], _: &[i32]| Err("unexpected witness".into()))
            .unwrap());
    }

    #[test]
    fn elimination_preserves_models() {
        let mut solver = load("planted20");
        assert_eq!(solver.simplify(3).unwrap(), Status::Unsolved);
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
        check_model(&solver, "testcases/small/planted20.cnf");
    }

    #[test]
    fn eliminated_variables_are_restored() {
        let mut solver = Solver::new();
        solver.add_clauses(vec![vec![1, 2], vec![-1, 3]]).unwrap();
        assert_eq!(solver.simplify(3).unwrap(), Status::Unsolved);
        assert!(solver.active() < 3);

        let mut forward = Vec::new();
        solver
            .traverse_witnesses_forward(|clause: &[i32], witness: &[i32]| {
                assert_eq!(witness.len(), 1);
                assert!(clause.contains(&witness[0]));
                forward.push(clause.to_vec());
                Ok(true)
            })
            .unwrap();
        let mut backward = Vec::new();
        solver
            .traverse_witnesses_backward(|clause: &[i32], _: &[i32]| {
                backward.push(clause.to_vec());
                Ok(true)
            })
            .unwrap();
        assert!(!forward.is_empty());
        backward.reverse();
        assert_eq!(forward, backward);
        let collected = solver.witnesses().unwrap();
        assert_eq!(
            collected.into_iter().map(|(clause, _)| clause).collect::<Vec<_>>(),
            forward
        );

        solver.add_clause(vec![-2]).unwrap();
        solver.add_clause(vec![-3]).unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn limits_apply_to_one_call() {
        let mut solver = load("php54");
        assert!(Solver::is_valid_limit("decisions"));
        assert!(!solver.limit("bogus", 1).unwrap());
        assert!(solver.limit("decisions", 0).unwrap());
        assert_eq!(solver.solve().unwrap(), Status::Unsolved);
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
    }

    #[test]
    fn options_and_configurations() {
        assert!(Solver::is_valid_option("elim"));
        assert!(Solver::is_preprocessing_option("elim"));
        assert!(!Solver::is_preprocessing_option("restart"));
        assert!(Solver::is_valid_long_option("--no-elim"));
        assert!(!Solver::is_valid_long_option("--bogus=1"));
        assert!(Solver::is_valid_configuration("plain"));

        let mut solver = Solver::new();
        assert!(!solver.set("bogus", 1).unwrap());
        assert!(solver.set_long_option("--no-elim").unwrap());
        assert_eq!(solver.get("elim"), Some(0));
        assert!(solver.configure("default").unwrap());
        assert_eq!(solver.get("elim"), Some(1));
        assert!(!solver.configure("bogus").unwrap());
        assert_eq!(solver.get("bogus"), None);
        solver.optimize(1).unwrap();
    }

    #[test]
    fn reserve_variables() {
        let mut solver = Solver::new();
        solver.reserve(10).unwrap();
        assert_eq!(solver.vars(), 10);
        assert_eq!(solver.active(), 10);
        solver.add_clause(vec![3]).unwrap();
        assert_eq!(solver.active(), 9);
    }

    #[test]
    fn copies_are_independent() {
        let mut solver = Solver::new();
        solver.set("seed", 5).unwrap();
        solver.add_clauses(vec![vec![1, 2], vec![-1, 2]]).unwrap();

        let mut copy = solver.copy().unwrap();
        assert_eq!(copy.get("seed"), Some(5));
        assert_eq!(sorted_clauses(&copy), sorted_clauses(&solver));

        copy.add_clause(vec![-2]).unwrap();
        assert_eq!(copy.solve().unwrap(), Status::Unsatisfiable);
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
    }

    #[test]
    fn lookahead_suggests_a_literal() {
        let mut solver = load("planted20");
        let literal = solver.lookahead().unwrap();
        assert!(literal != 0 && literal.abs() <= 20);

        let mut solver = load("chain");
        assert_eq!(solver.lookahead().unwrap(), 0);
    }

    #[test]
    fn cubes_respect_depth() {
        let mut solver = load("php43");
        let cubes = solver.generate_cubes(1).unwrap();
        assert_eq!(cubes.status, Status::Unsolved);
        assert!(!cubes.cubes.is_empty());
        assert!(cubes.cubes.iter().all(|cube| cube.len() <= 1));

        let mut solver = load("unit_unsat");
        let cubes = solver.generate_cubes(2).unwrap();
        assert_eq!(cubes.status, Status::Unsatisfiable);
        assert!(cubes.cubes.is_empty());
    }

    #[test]
    fn cubes_of_a_small_satisfiable_formula() {
        let mut solver = Solver::new();
        solver.add_clause(vec![1, 2]).unwrap();
        let cubes = solver.generate_cubes(1).unwrap();
        assert_ne!(cubes.status, Status::Unsatisfiable);
        assert!(!cubes.cubes.is_empty());
        assert!(cubes
            .cubes
            .iter()
            .flatten()
            .all(|&literal| literal != 0 && literal.abs() <= 2));
    }

    #[test]
    fn unsatisfiable_under_assumptions() {
        let mut solver = Solver::new();
        solver
            .add_clauses(vec![vec![1, 2], vec![-1, 2], vec![1, -2], vec![-1, -2]])
            .unwrap();
        solver.assume(1).unwrap();
        solver.assume(2).unwrap();
        let status = solver.solve().unwrap();
        assert_eq!(i32::from(status), crate::UNSATISFIABLE);

        let failed1 = solver.failed(1).unwrap();
        let failed2 = solver.failed(2).unwrap();
        assert!(failed1 || failed2);
    }

    #[test]
    fn traversal_keeps_input_clauses() {
        let input = vec![vec![1, 2, 3], vec![-1, -2], vec![2, 3]];
        let mut solver = Solver::new();
        solver.add_clauses(input.clone()).unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);

        let clauses = sorted_clauses(&solver);
        for mut clause in input {
            clause.sort_unstable();
            assert!(clauses.contains(&clause), "{:?} is missing", clause);
        }
        assert_eq!(solver.clauses().unwrap().len(), clauses.len());
        assert!(solver.witnesses().unwrap().is_empty());
    }
}

mod dimacs {
    use super::*;

    #[test]
    fn dimacs_round_trip() {
        let path = scratch_file("round-trip.cnf");
        let solver = load("php32");
        solver.write_dimacs(&path, 10).unwrap();

        let mut reloaded = Solver::new();
        assert_eq!(reloaded.read_dimacs(&path, Strictness::Strict).unwrap(), 10);
        assert_eq!(sorted_clauses(&reloaded), sorted_clauses(&solver));
        assert_eq!(reloaded.solve().unwrap(), Status::Unsatisfiable);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn parse_errors_are_reported() {
        let mut solver = Solver::new();
        let result = solver.read_dimacs_from("p cnf 1 1\n2 0\n".as_bytes(), Strictness::Strict);
        match result {
            Err(Error::EngineReported {
                source: engine::Error::Parse { .. },
            }) => {}
            other => panic!("unexpected {:?}", other),
        }

        let relaxed = solver
            .read_dimacs_from("1 -2 0\n2".as_bytes(), Strictness::Relaxed)
            .unwrap();
        assert_eq!(relaxed, 2);
        assert_eq!(solver.solve().unwrap(), Status::Satisfiable);
        assert_eq!(solver.model().unwrap(), vec![1, 2]);
    }

    #[test]
    fn incremental_cubes() {
        let mut solver = Solver::new();
        let inccnf = solver
            .read_dimacs_inccnf("testcases/incremental/two_cubes.icnf", Strictness::Strict)
            .unwrap();
        assert!(inccnf.incremental);
        assert_eq!(inccnf.cubes, vec![vec![1], vec![-2]]);

        assert_eq!(
            solver.solve_with(inccnf.cubes[0].clone()).unwrap(),
            Status::Satisfiable
        );
        assert_eq!(
            solver.solve_with(inccnf.cubes[1].clone()).unwrap(),
            Status::Unsatisfiable
        );
        assert!(solver.failed(-2).unwrap());
    }

    #[test]
    fn proof_ends_with_empty_clause() {
        let path = scratch_file("proof.drat");
        let mut solver = Solver::new();
        solver.set("binary", 0).unwrap();
        solver.trace_proof(&path).unwrap();
        solver
            .read_dimacs("testcases/small/php32.cnf", Strictness::Strict)
            .unwrap();
        assert_eq!(solver.solve().unwrap(), Status::Unsatisfiable);
        solver.close_proof_trace().unwrap();

        let proof = fs::read_to_string(&path).unwrap();
        assert_eq!(proof.lines().last().map(str::trim), Some("0"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn extension_stack_is_written() {
        let path = scratch_file("extension.txt");
        let mut solver = Solver::new();
        solver.add_clauses(vec![vec![1, 2], vec![-1, 3]]).unwrap();
        solver.simplify(3).unwrap();
        solver.write_extension(&path).unwrap();

        let extension = fs::read_to_string(&path).unwrap();
        let entries = extension.lines().filter(|line| !line.starts_with('c')).count();
        assert!(entries > 0);
        fs::remove_file(&path).unwrap();
    }
}
