//! Post-presolve clean-up.
//!
//! Runs once after the fix-point: adjusts target variables for the
//! back-end's benefit and regroups the binary `int_min`/`int_max` chains
//! the MiniZinc flattener emits into single n-ary constraints.

use std::collections::HashSet;

use log::{debug, trace};

use crate::error::FznResult;
use crate::model::{Argument, CstrId, Model, VarId};
use crate::stats::ModelStatistics;
use crate::Config;

const INT_CMP_REIF: [&str; 6] = [
    "int_eq_reif",
    "int_ne_reif",
    "int_le_reif",
    "int_lt_reif",
    "int_ge_reif",
    "int_gt_reif",
];

const BOOL_CMP_REIF: [&str; 6] = [
    "bool_eq_reif",
    "bool_ne_reif",
    "bool_le_reif",
    "bool_lt_reif",
    "bool_ge_reif",
    "bool_gt_reif",
];

const LIN_CMP_REIF: [&str; 4] = [
    "int_lin_eq_reif",
    "int_lin_ne_reif",
    "int_lin_le_reif",
    "int_lin_ge_reif",
];

pub fn cleanup(model: &mut Model, config: &Config) -> FznResult<()> {
    adjust_targets(model, config)?;
    regroup_min_max_chains(model);
    debug_assert!(model.check_consistency().is_ok());
    Ok(())
}

fn adjust_targets(model: &mut Model, config: &Config) -> FznResult<()> {
    for index in 0..model.constraints.len() {
        let id = CstrId(index);
        let ct = model.constraint(id);
        if !ct.active {
            continue;
        }
        let ctype = ct.ctype.clone();

        // Long strongly-propagated linear equalities go to the back-end as
        // table constraints, which cannot define a variable.
        if ctype == "int_lin_eq"
            && ct.target_variable.is_some()
            && ct.strong_propagation
            && linear_term_count(ct.args.first()) > 3
        {
            trace!("cleanup: releasing target of a long linear equality");
            model.remove_target(id);
            continue;
        }

        // A SAT-routed back-end accepts pure boolean constraints only as
        // plain clauses, never as definitions.
        if config.use_sat {
            if matches!(ctype.as_str(), "array_bool_and" | "array_bool_or")
                && model.constraint(id).target_variable.is_some()
            {
                model.remove_target(id);
                continue;
            }
            if BOOL_CMP_REIF.contains(&ctype.as_str()) {
                let ct = model.constraint(id);
                let comparand_free = ct.args.len() == 3
                    && !ct.args[0].has_one_value(model)
                    && !ct.args[1].has_one_value(model);
                if comparand_free && ct.target_variable.is_some() {
                    model.remove_target(id);
                    continue;
                }
            }
        }

        // These reifications never define their boolean.
        if matches!(ctype.as_str(), "set_in_reif" | "count_reif" | "count_eq_reif")
            && model.constraint(id).target_variable.is_some()
        {
            model.remove_target(id);
            continue;
        }

        // Conversely, a reified comparison with an otherwise-undefined
        // boolean may as well define it.
        let creates = INT_CMP_REIF.contains(&ctype.as_str())
            || LIN_CMP_REIF.contains(&ctype.as_str())
            || (!config.use_sat && BOOL_CMP_REIF.contains(&ctype.as_str()));
        if creates {
            let ct = model.constraint(id);
            if ct.target_variable.is_none() {
                if let Some(Argument::IntVarRef(reif)) = ct.args.last() {
                    let reif = *reif;
                    let single_occurrence = ct
                        .referenced_variables()
                        .iter()
                        .filter(|&&v| v == reif)
                        .count()
                        == 1;
                    if single_occurrence
                        && model.var(reif).active
                        && model.var(reif).defining_constraint.is_none()
                        && !model.var(reif).has_one_value()
                    {
                        model.set_target(id, reif)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn linear_term_count(arg: Option<&Argument>) -> usize {
    match arg {
        Some(Argument::IntList(coeffs)) => coeffs.len(),
        _ => 0,
    }
}

/// The flattener expands `z = max(a, b, c)` into a chain
/// `int_max(a, a, t1); int_max(b, t1, t2); int_max(c, t2, z)`. The head is
/// recognizable by its self-applied first link; each intermediate output is
/// referenced only by its producer and its consumer. The whole chain
/// becomes one `maximum_int`/`minimum_int` over the element vector.
fn regroup_min_max_chains(model: &mut Model) {
    let stats = ModelStatistics::compute(model);
    let protected = protected_variables(model);
    let mut regrouped = 0usize;

    for index in 0..model.constraints.len() {
        let head = CstrId(index);
        let ct = model.constraint(head);
        if !ct.active || !matches!(ct.ctype.as_str(), "int_min" | "int_max") {
            continue;
        }
        let ctype = ct.ctype.clone();
        let Some((first, second, output)) = binary_min_max(ct) else {
            continue;
        };
        if first != second {
            continue;
        }

        let mut elements = vec![first];
        let mut links = vec![head];
        let mut current = output;
        loop {
            if protected.contains(&current) || stats.occurrences(current) > 2 {
                break;
            }
            let next = model.active_constraint_ids().into_iter().find(|&id| {
                !links.contains(&id)
                    && model.constraint(id).ctype == ctype
                    && binary_min_max(model.constraint(id))
                        .is_some_and(|(_, chained, _)| chained == current)
            });
            let Some(next) = next else {
                break;
            };
            let (element, _, next_output) = binary_min_max(model.constraint(next)).unwrap();
            elements.push(element);
            links.push(next);
            current = next_output;
        }

        if links.len() < 2 {
            continue;
        }

        let last = *links.last().unwrap();
        let intermediates: Vec<CstrId> = links[..links.len() - 1].to_vec();
        let mut dead_outputs: Vec<VarId> = Vec::new();
        for &id in &intermediates {
            if let Some((_, _, out)) = binary_min_max(model.constraint(id)) {
                dead_outputs.push(out);
            }
            model.deactivate(id);
        }
        for out in dead_outputs {
            model.var_mut(out).active = false;
        }
        let grouped = if ctype == "int_min" {
            "minimum_int"
        } else {
            "maximum_int"
        };
        trace!(
            "cleanup: regrouped a {}-long {} chain into {}",
            elements.len(),
            ctype,
            grouped
        );
        let ct = model.constraint_mut(last);
        ct.ctype = grouped.to_string();
        ct.args = vec![
            Argument::IntVarRef(current),
            Argument::IntVarRefArray(elements),
        ];
        regrouped += 1;
    }
    if regrouped > 0 {
        debug!("cleanup: regrouped {} min/max chains", regrouped);
    }
}

fn binary_min_max(ct: &crate::model::Constraint) -> Option<(VarId, VarId, VarId)> {
    if ct.args.len() != 3 {
        return None;
    }
    Some((ct.args[0].var()?, ct.args[1].var()?, ct.args[2].var()?))
}

/// Variables the rest of the pipeline still needs by name: printed outputs
/// and the objective.
fn protected_variables(model: &Model) -> HashSet<VarId> {
    let mut protected: HashSet<VarId> = model
        .output_items
        .iter()
        .flat_map(|item| item.variables.iter().copied())
        .collect();
    protected.extend(model.objective);
    protected
}
