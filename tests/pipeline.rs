//! End-to-end sessions: FlatZinc text in, FlatZinc output text out.

use prezen::solver::{FznSolver, SolveStatus, SolverOptions};
use prezen::Config;

fn run(source: &str) -> FznSolver {
    run_with(source, SolverOptions::default())
}

fn run_with(source: &str, options: SolverOptions) -> FznSolver {
    let mut solver = FznSolver::with_options(options);
    solver.load_str(source).unwrap();
    solver.solve().unwrap();
    solver
}

#[test]
fn trivially_unsatisfiable_model() {
    let solver = run("var 1..3: x;\nconstraint int_eq(x, 5);\nsolve satisfy;");
    assert_eq!(solver.status(), SolveStatus::Unsatisfiable);
    assert_eq!(solver.to_flatzinc(), "=====UNSATISFIABLE=====\n");
}

#[test]
fn single_satisfying_solution() {
    let solver = run(
        "var 1..3: x :: output_var;\nconstraint int_lt(x, 3);\nsolve satisfy;",
    );
    assert_eq!(solver.solution_count(), 1);
    assert_eq!(solver.to_flatzinc(), "x = 1;\n----------\n");
}

#[test]
fn enumerating_all_solutions_completes_the_search() {
    let solver = run_with(
        "var 1..3: x :: output_var;\nconstraint int_lt(x, 3);\nsolve satisfy;",
        SolverOptions {
            all_solutions: true,
            ..SolverOptions::default()
        },
    );
    assert_eq!(solver.solution_count(), 2);
    assert_eq!(
        solver.to_flatzinc(),
        "x = 1;\n----------\nx = 2;\n----------\n==========\n"
    );
}

#[test]
fn minimization_prints_the_optimum_and_closes() {
    let solver = run(
        "var 1..5: x :: output_var;\nvar 1..5: y;\nconstraint int_lt(y, x);\nsolve minimize x;",
    );
    assert_eq!(solver.status(), SolveStatus::Complete);
    assert_eq!(solver.to_flatzinc(), "x = 2;\n----------\n==========\n");
}

#[test]
fn maximization_through_a_defined_objective() {
    let solver = run(
        "var 0..4: x;\nvar 0..99: z :: output_var;\n\
         constraint int_lin_eq([-1, 3], [z, x], 0) :: defines_var(z);\n\
         solve maximize z;",
    );
    assert_eq!(solver.status(), SolveStatus::Complete);
    assert_eq!(solver.to_flatzinc(), "z = 12;\n----------\n==========\n");
}

#[test]
fn alias_elimination_reaches_the_backend_once() {
    let solver = run(
        "var 0..10: x :: output_var;\nvar 0..10: y;\nconstraint int_eq(x, y);\nsolve minimize x;",
    );
    assert_eq!(solver.to_flatzinc(), "x = 0;\n----------\n==========\n");
}

#[test]
fn array_output_uses_dimension_bounds() {
    let solver = run(
        "array [1..2] of var 1..2: g :: output_array([1..2]);\n\
         constraint int_ne(g[1], g[2]);\nsolve satisfy;",
    );
    assert_eq!(
        solver.to_flatzinc(),
        "g = array1d(1..2, [1, 2]);\n----------\n"
    );
}

#[test]
fn boolean_outputs_print_true_and_false() {
    let solver = run(
        "var bool: b :: output_var;\nvar bool: c :: output_var;\n\
         constraint bool_eq(b, true);\nconstraint bool_eq(c, false);\nsolve satisfy;",
    );
    assert_eq!(
        solver.to_flatzinc(),
        "b = true;\nc = false;\n----------\n"
    );
}

#[test]
fn search_annotations_steer_the_branching_order() {
    // indomain ordering is ascending, so branching on y first still finds
    // the lexicographically-first (y, x) pair.
    let solver = run(
        "var 1..3: x :: output_var;\nvar 1..3: y :: output_var;\n\
         constraint int_ne(x, y);\n\
         solve :: int_search([y, x], input_order, indomain_min, complete) satisfy;",
    );
    assert_eq!(solver.solution_count(), 1);
    let text = solver.to_flatzinc();
    assert!(text.contains("x = 2;"));
    assert!(text.contains("y = 1;"));
}

#[test]
fn chained_max_solves_end_to_end() {
    let solver = run(
        "var 2..2: a;\nvar 7..7: b;\nvar 5..5: c;\nvar 0..9: z :: output_var;\n\
         var 0..9: t1 :: var_is_introduced;\nvar 0..9: t2 :: var_is_introduced;\n\
         constraint int_max(a, a, t1);\nconstraint int_max(b, t1, t2);\nconstraint int_max(c, t2, z);\n\
         solve satisfy;",
    );
    assert_eq!(solver.to_flatzinc(), "z = 7;\n----------\n");
}

#[test]
fn all_different_is_enforced() {
    let solver = run_with(
        "array [1..3] of var 1..3: q :: output_array([1..3]);\n\
         constraint all_different_int(q);\nsolve satisfy;",
        SolverOptions {
            all_solutions: true,
            ..SolverOptions::default()
        },
    );
    // 3! permutations.
    assert_eq!(solver.solution_count(), 6);
    assert_eq!(solver.status(), SolveStatus::Complete);
}

#[test]
fn duplicate_alldiff_is_posted_once() {
    let solver = run_with(
        "array [1..2] of var 1..2: q :: output_array([1..2]);\n\
         constraint all_different_int(q);\nconstraint all_different_int(q);\n\
         solve satisfy;",
        SolverOptions {
            all_solutions: true,
            ..SolverOptions::default()
        },
    );
    assert_eq!(solver.solution_count(), 2);
}

#[test]
fn statistics_block_is_emitted_on_request() {
    let solver = run_with(
        "var 1..2: x :: output_var;\nsolve satisfy;",
        SolverOptions {
            statistics: true,
            ..SolverOptions::default()
        },
    );
    let text = solver.to_flatzinc();
    assert!(text.contains("----------\n"));
    assert!(text.contains("%%%mzn-stat: solutions=1"));
    assert!(text.contains("%%%mzn-stat-end"));
}

#[test]
fn presolve_can_be_disabled() {
    let solver = run_with(
        "var 1..3: x :: output_var;\nconstraint int_eq(x, 2);\nsolve satisfy;",
        SolverOptions {
            config: Config {
                presolve: false,
                ..Config::default()
            },
            ..SolverOptions::default()
        },
    );
    assert_eq!(solver.to_flatzinc(), "x = 2;\n----------\n");
}

#[test]
fn linear_model_with_parameters() {
    let solver = run(
        "int: n = 7;\narray [1..2] of int: c = [2, 3];\n\
         var 0..9: x :: output_var;\nvar 0..9: y :: output_var;\n\
         constraint int_lin_eq(c, [x, y], n);\nsolve satisfy;",
    );
    assert_eq!(solver.solution_count(), 1);
    let text = solver.to_flatzinc();
    // 2x + 3y = 7 admits (2, 1) as its least solution in branching order.
    assert!(text.contains("x = 2;"));
    assert!(text.contains("y = 1;"));
}

#[test]
fn reified_pipeline_round_trip() {
    let solver = run_with(
        "var 0..3: x :: output_var;\nvar bool: b :: output_var;\n\
         constraint int_eq_reif(x, 2, b);\nconstraint int_lt(x, 2);\nsolve satisfy;",
        SolverOptions {
            all_solutions: true,
            ..SolverOptions::default()
        },
    );
    // x in {0, 1}, so b is false in every solution.
    assert_eq!(solver.solution_count(), 2);
    let text = solver.to_flatzinc();
    assert!(text.contains("b = false;"));
    assert!(!text.contains("b = true;"));
}

#[test]
fn element_pipeline_round_trip() {
    let solver = run(
        "var 1..4: i :: output_var;\nvar 25..35: r :: output_var;\n\
         constraint array_int_element(i, [10, 30, 20, 40], r);\nsolve satisfy;",
    );
    let text = solver.to_flatzinc();
    assert!(text.contains("i = 2;"));
    assert!(text.contains("r = 30;"));
}

#[test]
fn timeout_reports_the_marker() {
    // An expensive enumeration with an already-expired deadline.
    let solver = run_with(
        "array [1..8] of var 1..8: q;\nvar 1..8: z :: output_var;\n\
         constraint all_different_int(q);\nconstraint int_eq(q[1], z);\nsolve satisfy;",
        SolverOptions {
            all_solutions: true,
            timeout_ms: 1,
            ..SolverOptions::default()
        },
    );
    assert_eq!(solver.status(), SolveStatus::TimedOut);
    assert!(solver.to_flatzinc().ends_with("%% TIMEOUT\n"));
}
