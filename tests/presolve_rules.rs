//! Presolve rule behavior, driven through the text front door.

use prezen::context::lower;
use prezen::domain::Domain;
use prezen::model::{Argument, CstrId, Model, VarId};
use prezen::parser::parse;
use prezen::presolve::Presolver;
use prezen::tokenizer::tokenize;

fn presolved(source: &str) -> (Model, std::collections::HashMap<String, VarId>) {
    let ast = parse(tokenize(source).unwrap()).unwrap();
    let (mut model, ctx) = lower(&ast).unwrap();
    let mut presolver = Presolver::new(None);
    presolver.run(&mut model).unwrap();
    (model, ctx.variables)
}

fn presolved_report(source: &str) -> (Model, bool) {
    let ast = parse(tokenize(source).unwrap()).unwrap();
    let (mut model, _) = lower(&ast).unwrap();
    let mut presolver = Presolver::new(None);
    let report = presolver.run(&mut model).unwrap();
    (model, report.infeasible)
}

fn active_types(model: &Model) -> Vec<&str> {
    model
        .active_constraint_ids()
        .into_iter()
        .map(|id| model.constraint(id).ctype.as_str())
        .collect()
}

#[test]
fn fixed_equality_narrows_and_retires() {
    let (model, vars) = presolved("var 1..10: x;\nconstraint int_eq(x, 4);\nsolve satisfy;");
    assert_eq!(model.var(vars["x"]).domain, Domain::singleton(4));
    assert!(active_types(&model).is_empty());
}

#[test]
fn contradictory_equality_is_infeasible() {
    let (model, infeasible) =
        presolved_report("var 1..3: x;\nconstraint int_eq(x, 5);\nsolve satisfy;");
    assert!(infeasible);
    assert!(model.variables.iter().any(|v| v.domain.is_empty()));
}

#[test]
fn variable_equality_unifies() {
    let (model, vars) = presolved(
        "var 0..10: x;\nvar 0..10: y;\nconstraint int_eq(x, y);\nsolve minimize x;",
    );
    let (x, y) = (vars["x"], vars["y"]);
    assert!(active_types(&model).is_empty());
    assert_ne!(model.var(x).active, model.var(y).active);
    let survivor = if model.var(x).active { x } else { y };
    assert_eq!(model.objective, Some(survivor));
}

#[test]
fn disequality_splices_the_domain() {
    let (model, vars) = presolved("var 1..5: x;\nconstraint int_ne(x, 3);\nsolve satisfy;");
    assert_eq!(model.var(vars["x"]).domain, Domain::Values(vec![1, 2, 4, 5]));
    assert!(active_types(&model).is_empty());
}

#[test]
fn inequalities_tighten_one_sided_bounds() {
    let (model, vars) = presolved(
        "var 1..10: x;\nvar 1..10: y;\nconstraint int_le(x, 4);\nconstraint int_gt(y, 7);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(1, 4));
    assert_eq!(model.var(vars["y"]).domain, Domain::interval(8, 10));
    assert!(active_types(&model).is_empty());
}

#[test]
fn two_sided_inequality_tightens_both() {
    let (model, vars) = presolved(
        "var 1..5: x;\nvar 1..5: y;\nconstraint int_lt(y, x);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["y"]).domain, Domain::interval(1, 4));
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(2, 5));
    // The relation itself still goes to the back-end.
    assert_eq!(active_types(&model), vec!["int_lt"]);
}

#[test]
fn bool2int_aliases_both_sides() {
    let (model, vars) = presolved(
        "var bool: b;\nvar 0..1: x;\nconstraint bool2int(b, x);\nsolve satisfy;",
    );
    assert!(active_types(&model).is_empty());
    assert_ne!(model.var(vars["b"]).active, model.var(vars["x"]).active);
}

#[test]
fn set_membership_folds_into_the_domain() {
    let (model, vars) = presolved(
        "var 1..9: x;\nconstraint set_in(x, {2, 4, 6});\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["x"]).domain, Domain::Values(vec![2, 4, 6]));
    assert!(active_types(&model).is_empty());
}

#[test]
fn fixed_reification_unwraps_to_the_plain_form() {
    let (model, vars) = presolved(
        "var 1..5: x;\nvar bool: b;\nconstraint int_lt_reif(x, 3, b);\nconstraint bool_eq(b, true);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(1, 2));
    assert!(active_types(&model).is_empty());
}

#[test]
fn false_reification_inverts_the_comparator() {
    let (model, vars) = presolved(
        "var 1..5: x;\nvar bool: b;\nconstraint int_le_reif(x, 3, b);\nconstraint bool_eq(b, false);\nsolve satisfy;",
    );
    // not(x <= 3) is x > 3.
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(4, 5));
    assert!(active_types(&model).is_empty());
}

#[test]
fn decided_reified_comparison_fixes_the_boolean() {
    let (model, vars) = presolved(
        "var 0..5: x;\nvar bool: b;\nconstraint int_gt_reif(x, 7, b);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["b"]).domain, Domain::singleton(0));
    assert!(active_types(&model).is_empty());
}

#[test]
fn singleton_or_becomes_equality() {
    let (model, vars) = presolved(
        "var bool: a;\nvar bool: r;\nconstraint array_bool_or([a], r);\nsolve satisfy;",
    );
    // bool_eq(a, r) then aliasing: nothing survives.
    assert!(active_types(&model).is_empty());
    assert_ne!(model.var(vars["a"]).active, model.var(vars["r"]).active);
}

#[test]
fn false_or_pushes_zero_to_all_elements() {
    let (model, vars) = presolved(
        "var bool: a;\nvar bool: b;\nvar bool: r;\nconstraint array_bool_or([a, b], r);\nconstraint bool_eq(r, false);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["a"]).domain, Domain::singleton(0));
    assert_eq!(model.var(vars["b"]).domain, Domain::singleton(0));
    assert!(active_types(&model).is_empty());
}

#[test]
fn forcing_element_decides_the_or() {
    let (model, vars) = presolved(
        "var bool: a;\nvar bool: r;\nconstraint array_bool_or([a, true], r);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["r"]).domain, Domain::singleton(1));
    assert!(active_types(&model).is_empty());
    assert_eq!(model.var(vars["a"]).domain, Domain::boolean());
}

#[test]
fn strict_linear_canonicalizes_to_nonstrict() {
    let (model, _) = presolved(
        "var 0..9: x;\nvar 0..9: y;\nconstraint int_lin_gt([1, 1], [x, y], 3);\nsolve satisfy;",
    );
    let id = model.active_constraint_ids()[0];
    let ct = model.constraint(id);
    assert_eq!(ct.ctype, "int_lin_ge");
    assert_eq!(ct.args[2], Argument::IntValue(4));
}

#[test]
fn all_negative_coefficients_flip() {
    let (model, _) = presolved(
        "var 0..9: x;\nvar 0..9: y;\nconstraint int_lin_le([-1, -1], [x, y], -3);\nsolve satisfy;",
    );
    let id = model.active_constraint_ids()[0];
    let ct = model.constraint(id);
    assert_eq!(ct.ctype, "int_lin_ge");
    assert_eq!(ct.args[0], Argument::IntList(vec![1, 1]));
    assert_eq!(ct.args[2], Argument::IntValue(3));
}

#[test]
fn unary_linear_demotes_to_plain_comparison() {
    let (model, vars) = presolved(
        "var 0..9: x;\nconstraint int_lin_eq([1], [x], 5);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["x"]).domain, Domain::singleton(5));
    assert!(active_types(&model).is_empty());
}

#[test]
fn positive_linear_propagation_caps_terms() {
    let (model, vars) = presolved(
        "var 0..100: x;\nvar 0..100: y;\nconstraint int_lin_le([2, 3], [x, y], 10);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(0, 5));
    assert_eq!(model.var(vars["y"]).domain, Domain::interval(0, 3));
    assert_eq!(active_types(&model), vec!["int_lin_le"]);
}

#[test]
fn hidden_disjunction_is_recognized() {
    let (model, vars) = presolved(
        "var bool: b;\nvar bool: p;\nvar bool: q;\nconstraint int_lin_le([-2, 1, 1], [b, p, q], 0);\nsolve satisfy;",
    );
    let id = model.active_constraint_ids()[0];
    let ct = model.constraint(id);
    assert_eq!(ct.ctype, "array_bool_or");
    assert_eq!(
        ct.args[0],
        Argument::IntVarRefArray(vec![vars["p"], vars["q"]])
    );
    assert_eq!(ct.args[1], Argument::IntVarRef(vars["b"]));
}

#[test]
fn linear_equality_defines_its_leading_variable() {
    let (model, vars) = presolved(
        "var 0..9: x;\nvar 0..99: z;\nconstraint int_lin_eq([-1, 3], [z, x], 0);\nsolve satisfy;",
    );
    let id = model.active_constraint_ids()[0];
    assert_eq!(model.constraint(id).target_variable, Some(vars["z"]));
    assert_eq!(model.var(vars["z"]).defining_constraint, Some(id));
}

#[test]
fn difference_map_rewrites_zero_equality() {
    let (model, vars) = presolved(
        "var 0..20: x;\nvar 0..20: y;\nvar -20..20: d;\nconstraint int_lin_eq([1, -1, 1], [d, x, y], 0);\nconstraint int_eq(d, 0);\nsolve satisfy;",
    );
    // d = x - y and d = 0 collapse x and y into one class.
    assert_eq!(model.var(vars["d"]).domain, Domain::singleton(0));
    assert_ne!(model.var(vars["x"]).active, model.var(vars["y"]).active);
}

#[test]
fn linear_reification_outside_reach_is_false() {
    let (model, vars) = presolved(
        "var 0..5: x;\nvar 0..5: y;\nvar bool: b;\nconstraint int_lin_eq_reif([1, 1], [x, y], 100, b);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["b"]).domain, Domain::singleton(0));
    assert!(active_types(&model).is_empty());
}

#[test]
fn pinned_linear_reification_is_true() {
    let (model, vars) = presolved(
        "var 2..2: x;\nvar 3..3: y;\nvar bool: b;\nconstraint int_lin_eq_reif([1, 1], [x, y], 5, b);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["b"]).domain, Domain::singleton(1));
}

#[test]
fn fixed_multiplication_settles_the_product() {
    let (model, vars) = presolved(
        "var 0..100: z;\nconstraint int_times(6, 7, z);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["z"]).domain, Domain::singleton(42));
    assert!(active_types(&model).is_empty());
}

#[test]
fn abs_knowledge_rewrites_reified_bound() {
    let (model, vars) = presolved(
        "var -5..5: x;\nvar 0..5: y;\nvar bool: b;\nconstraint int_abs(x, y);\nconstraint int_le_reif(y, 2, b);\nsolve satisfy;",
    );
    let rewritten = model
        .active_constraint_ids()
        .into_iter()
        .find(|&id| model.constraint(id).ctype == "set_in_reif")
        .expect("reified bound becomes a membership test");
    let ct = model.constraint(rewritten);
    assert_eq!(ct.args[0], Argument::IntVarRef(vars["x"]));
    assert_eq!(ct.args[1], Argument::IntInterval(-2, 2));
}

#[test]
fn bound_element_index_becomes_equality() {
    let (model, vars) = presolved(
        "var 1..9: r;\nconstraint array_int_element(2, [10, 20, 30], r);\nsolve satisfy;",
    );
    // values[2] = 20 is outside 1..9: infeasible via the equality rule.
    assert!(model.var(vars["r"]).domain.is_empty());
    assert!(active_types(&model).is_empty());
}

#[test]
fn element_trimming_proves_unsat() {
    let (_, infeasible) = presolved_report(
        "var 1..10: i;\narray [1..10] of int: a = [5, 5, 5, 5, 5, 5, 5, 5, 5, 5];\nconstraint array_int_element(i, a, 7);\nsolve satisfy;",
    );
    assert!(infeasible);
}

#[test]
fn element_index_is_clamped_to_the_array() {
    let (model, vars) = presolved(
        "var 1..100: i;\nvar 0..100: r;\nconstraint array_int_element(i, [7, 8, 9, 12], r);\nsolve satisfy;",
    );
    assert_eq!(model.var(vars["i"]).domain, Domain::interval(1, 4));
}

#[test]
fn contiguous_element_values_become_affine() {
    let (model, vars) = presolved(
        "var 1..4: i;\nvar 0..100: r;\nconstraint array_int_element(i, [5, 6, 7, 8], r);\nsolve satisfy;",
    );
    let id = model.active_constraint_ids()[0];
    let ct = model.constraint(id);
    assert_eq!(ct.ctype, "int_lin_eq");
    assert_eq!(ct.args[0], Argument::IntList(vec![-1, 1]));
    assert_eq!(
        ct.args[1],
        Argument::IntVarRefArray(vec![vars["r"], vars["i"]])
    );
    assert_eq!(ct.args[2], Argument::IntValue(-4));
}

#[test]
fn affine_index_mapping_translates_the_array() {
    let (model, vars) = presolved(
        "var 1..4: x;\nvar 1..10: z;\nvar 1..100: r;\nconstraint int_lin_eq([-1, 2], [z, x], 1) :: defines_var(z);\nconstraint array_int_element(z, [10, 20, 30, 40], r);\nsolve satisfy;",
    );
    let element = model
        .active_constraint_ids()
        .into_iter()
        .find(|&id| model.constraint(id).ctype == "array_int_element")
        .expect("element survives with a translated array");
    let ct = model.constraint(element);
    assert_eq!(ct.args[0], Argument::IntVarRef(vars["x"]));
    assert_eq!(ct.args[1], Argument::IntList(vec![10, 30]));
    assert_eq!(model.var(vars["x"]).domain, Domain::interval(1, 2));
}

#[test]
fn fixed_var_element_demotes_to_constants() {
    let (model, _) = presolved(
        "var 1..3: i;\nvar 2..2: a;\nvar 3..3: b;\nvar 4..4: c;\nvar 1..9: r;\nconstraint array_var_int_element(i, [a, b, c], r);\nsolve satisfy;",
    );
    // Constants [2, 3, 4] are contiguous, so the lookup ends affine.
    let id = model.active_constraint_ids()[0];
    assert_eq!(model.constraint(id).ctype, "int_lin_eq");
}

#[test]
fn presolve_is_idempotent_at_the_fixpoint() {
    let source = "var 1..10: x;\nvar 1..10: y;\nconstraint int_lt(y, x);\nconstraint int_le(x, 8);\nsolve satisfy;";
    let ast = parse(tokenize(source).unwrap()).unwrap();
    let (mut model, _) = lower(&ast).unwrap();
    Presolver::new(None).run(&mut model).unwrap();
    let domains: Vec<Domain> = model.variables.iter().map(|v| v.domain.clone()).collect();
    let types = active_types(&model)
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let report = Presolver::new(None).run(&mut model).unwrap();
    assert_eq!(report.rewrites, 0);
    let after: Vec<Domain> = model.variables.iter().map(|v| v.domain.clone()).collect();
    assert_eq!(domains, after);
    assert_eq!(
        types,
        active_types(&model)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
    );
}

#[test]
fn consistency_holds_after_presolve() {
    let (model, _) = presolved(
        "var 0..9: x;\nvar 0..99: z;\nvar bool: b;\nconstraint int_lin_eq([-1, 3], [z, x], 0);\nconstraint int_eq_reif(z, 6, b);\nsolve satisfy;",
    );
    model.check_consistency().unwrap();
    let _: Vec<CstrId> = model.active_constraint_ids();
}
