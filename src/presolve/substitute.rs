//! Whole-IR alias substitution.
//!
//! Runs at pass boundaries only, never during rule dispatch, so iterators
//! over the constraint arena stay valid and no rule sees a half-rewritten
//! model.

use crate::alias::AliasTable;
use crate::model::{Argument, CstrId, Model};

/// Replaces every variable slot in the model with its representative:
/// constraint arguments, target-variable pointers, annotation trees, output
/// items, and the objective. Each loser's residual domain is folded into its
/// winner in case it narrowed after the alias was recorded.
pub fn substitute(model: &mut Model, aliases: &mut AliasTable) {
    if aliases.is_empty() {
        return;
    }

    for ct in &mut model.constraints {
        if !ct.active {
            continue;
        }
        for arg in &mut ct.args {
            match arg {
                Argument::IntVarRef(v) => *v = aliases.representative(*v),
                Argument::IntVarRefArray(vars) => {
                    for v in vars {
                        *v = aliases.representative(*v);
                    }
                }
                _ => {}
            }
        }
        if let Some(target) = ct.target_variable {
            ct.target_variable = Some(aliases.representative(target));
        }
    }

    for ann in &mut model.search_annotations {
        ann.rewrite_variables(&mut |v| aliases.representative(v));
    }
    for item in &mut model.output_items {
        for v in &mut item.variables {
            *v = aliases.representative(*v);
        }
    }
    if let Some(objective) = model.objective {
        model.objective = Some(aliases.representative(objective));
    }

    // Domains may have narrowed on either side while aliases accumulated.
    for (loser, winner) in aliases.pairs() {
        let residual = model.var(loser).domain.clone();
        model
            .var_mut(winner)
            .domain
            .intersect_with_domain(&residual);
    }

    // Substitution can fold a second occurrence of a target into its own
    // constraint; such a constraint can no longer define the variable.
    for index in 0..model.constraints.len() {
        let id = CstrId(index);
        let ct = model.constraint(id);
        if !ct.active {
            continue;
        }
        if let Some(target) = ct.target_variable {
            let occurrences = ct
                .referenced_variables()
                .iter()
                .filter(|&&v| v == target)
                .count();
            if occurrences > 1 {
                model.remove_target(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::model::{Annotation, OutputItem, VarId};

    fn two_var_model() -> (Model, VarId, VarId) {
        let mut model = Model::new();
        let x = model.new_variable("x", Domain::interval(0, 10), false);
        let t = model.new_variable("t", Domain::interval(0, 10), true);
        (model, x, t)
    }

    #[test]
    fn empty_alias_map_is_identity() {
        let (mut model, x, t) = two_var_model();
        model.new_constraint(
            "int_le",
            vec![Argument::IntVarRef(x), Argument::IntVarRef(t)],
        );
        let before = model.constraint(CstrId(0)).args.clone();
        let mut aliases = AliasTable::default();
        substitute(&mut model, &mut aliases);
        assert_eq!(model.constraint(CstrId(0)).args, before);
    }

    #[test]
    fn arguments_annotations_and_outputs_are_rewritten() {
        let (mut model, x, t) = two_var_model();
        model.new_constraint(
            "int_lin_le",
            vec![
                Argument::IntList(vec![1, 1]),
                Argument::IntVarRefArray(vec![t, x]),
                Argument::IntValue(5),
            ],
        );
        model.search_annotations = vec![Annotation::Call(
            "int_search".to_string(),
            vec![Annotation::VarRefArray(vec![t])],
        )];
        model.output_items.push(OutputItem {
            name: "t".to_string(),
            bounds: Vec::new(),
            variables: vec![t],
            as_bool: false,
        });
        model.objective = Some(t);

        let mut aliases = AliasTable::default();
        assert!(aliases.try_unify(&mut model, t, x));
        substitute(&mut model, &mut aliases);

        assert_eq!(
            model.constraint(CstrId(0)).args[1],
            Argument::IntVarRefArray(vec![x, x])
        );
        assert_eq!(
            model.search_annotations[0],
            Annotation::Call(
                "int_search".to_string(),
                vec![Annotation::VarRefArray(vec![x])]
            )
        );
        assert_eq!(model.output_items[0].variables, vec![x]);
        assert_eq!(model.objective, Some(x));
    }

    #[test]
    fn duplicated_target_is_released() {
        let (mut model, x, t) = two_var_model();
        let c = model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![-1, 1]),
                Argument::IntVarRefArray(vec![x, t]),
                Argument::IntValue(0),
            ],
        );
        model.set_target(c, x).unwrap();
        let mut aliases = AliasTable::default();
        assert!(aliases.try_unify(&mut model, t, x));
        substitute(&mut model, &mut aliases);
        assert_eq!(model.constraint(c).target_variable, None);
        assert_eq!(model.var(x).defining_constraint, None);
    }
}
