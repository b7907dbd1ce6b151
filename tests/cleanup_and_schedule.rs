//! Clean-up pass and extraction-order behavior.

use prezen::cleanup::cleanup;
use prezen::context::lower;
use prezen::model::{Argument, Model, VarId};
use prezen::parser::parse;
use prezen::presolve::Presolver;
use prezen::schedule::schedule;
use prezen::tokenizer::tokenize;
use prezen::Config;

fn prepared(source: &str, config: &Config) -> (Model, std::collections::HashMap<String, VarId>) {
    let ast = parse(tokenize(source).unwrap()).unwrap();
    let (mut model, ctx) = lower(&ast).unwrap();
    Presolver::new(None).run(&mut model).unwrap();
    cleanup(&mut model, config).unwrap();
    (model, ctx.variables)
}

#[test]
fn max_chain_regroups_into_one_constraint() {
    let (model, vars) = prepared(
        "var 0..9: a;\nvar 0..9: b;\nvar 0..9: c;\nvar 0..9: z :: output_var;\n\
         var 0..9: t1 :: var_is_introduced;\nvar 0..9: t2 :: var_is_introduced;\n\
         constraint int_max(a, a, t1);\nconstraint int_max(b, t1, t2);\nconstraint int_max(c, t2, z);\n\
         solve satisfy;",
        &Config::default(),
    );
    let active = model.active_constraint_ids();
    assert_eq!(active.len(), 1);
    let ct = model.constraint(active[0]);
    assert_eq!(ct.ctype, "maximum_int");
    assert_eq!(ct.args[0], Argument::IntVarRef(vars["z"]));
    assert_eq!(
        ct.args[1],
        Argument::IntVarRefArray(vec![vars["a"], vars["b"], vars["c"]])
    );
    assert!(!model.var(vars["t1"]).active);
    assert!(!model.var(vars["t2"]).active);
}

#[test]
fn min_chain_regroups_too() {
    let (model, vars) = prepared(
        "var 0..9: p;\nvar 0..9: q;\nvar 0..9: m :: output_var;\n\
         var 0..9: t :: var_is_introduced;\n\
         constraint int_min(p, p, t);\nconstraint int_min(q, t, m);\nsolve satisfy;",
        &Config::default(),
    );
    let active = model.active_constraint_ids();
    assert_eq!(active.len(), 1);
    let ct = model.constraint(active[0]);
    assert_eq!(ct.ctype, "minimum_int");
    assert_eq!(
        ct.args[1],
        Argument::IntVarRefArray(vec![vars["p"], vars["q"]])
    );
    assert!(!model.var(vars["t"]).active);
}

#[test]
fn heavily_referenced_link_breaks_the_chain() {
    // t1 is consumed by a third constraint, so the chain must stop at it.
    let (model, _) = prepared(
        "var 0..9: a;\nvar 0..9: b;\nvar 0..9: z;\nvar 0..9: u;\n\
         var 0..9: t1 :: var_is_introduced;\n\
         constraint int_max(a, a, t1);\nconstraint int_max(b, t1, z);\n\
         constraint int_lt(t1, u);\nsolve satisfy;",
        &Config::default(),
    );
    let types: Vec<&str> = model
        .active_constraint_ids()
        .into_iter()
        .map(|id| model.constraint(id).ctype.as_str())
        .collect();
    assert!(types.contains(&"int_max"));
    assert!(!types.contains(&"maximum_int"));
}

#[test]
fn reified_comparison_gains_a_target() {
    let (model, vars) = prepared(
        "var 0..9: x;\nvar bool: b;\nconstraint int_eq_reif(x, 4, b);\nsolve satisfy;",
        &Config::default(),
    );
    let active = model.active_constraint_ids();
    assert_eq!(active.len(), 1);
    assert_eq!(model.constraint(active[0]).target_variable, Some(vars["b"]));
}

#[test]
fn sat_routing_strips_boolean_targets() {
    let source = "var bool: p;\nvar bool: q;\nvar bool: r;\n\
                  constraint array_bool_or([p, q], r) :: defines_var(r);\nsolve satisfy;";
    let config = Config {
        use_sat: true,
        ..Config::default()
    };
    let (model, vars) = prepared(source, &config);
    let active = model.active_constraint_ids();
    assert_eq!(active.len(), 1);
    assert_eq!(model.constraint(active[0]).target_variable, None);
    assert_eq!(model.var(vars["r"]).defining_constraint, None);

    // Without SAT routing the definition stays.
    let (model, vars) = prepared(source, &Config::default());
    let active = model.active_constraint_ids();
    assert_eq!(model.constraint(active[0]).target_variable, Some(vars["r"]));
}

#[test]
fn set_membership_reification_never_defines() {
    let (model, _) = prepared(
        "var 0..9: x;\nvar bool: b;\nconstraint set_in_reif(x, {1, 3}, b) :: defines_var(b);\nsolve satisfy;",
        &Config::default(),
    );
    let active = model.active_constraint_ids();
    assert_eq!(active.len(), 1);
    assert_eq!(model.constraint(active[0]).target_variable, None);
}

#[test]
fn schedule_puts_definitions_before_consumers() {
    let (model, _) = prepared(
        "var 0..9: x;\nvar 0..99: z;\nvar 0..99: w;\n\
         constraint int_le(w, x);\n\
         constraint int_lin_eq([-1, 1, 1], [w, z, x], 0);\n\
         constraint int_lin_eq([-1, 3], [z, x], 0);\n\
         solve satisfy;",
        &Config::default(),
    );
    let order = schedule(&model).unwrap();
    let type_at = |position: usize| model.constraint(order[position]).ctype.clone();
    // z's definition must precede w's (which consumes z); the plain
    // comparison goes last.
    let z_def = (0..order.len())
        .find(|&i| {
            model.constraint(order[i]).target_variable.is_some()
                && matches!(&model.constraint(order[i]).args[0], Argument::IntList(c) if c.len() == 2)
        })
        .unwrap();
    let w_def = (0..order.len())
        .find(|&i| {
            matches!(&model.constraint(order[i]).args[0], Argument::IntList(c) if c.len() == 3)
        })
        .unwrap();
    assert!(z_def < w_def);
    assert_eq!(type_at(order.len() - 1), "int_le");
}
