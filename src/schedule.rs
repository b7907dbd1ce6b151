//! Extraction scheduling.
//!
//! Orders the active constraints so that every defined variable is created
//! (through its defining constraint) before any constraint that consumes it.
//! Among ready constraints, definitions someone is waiting on go first and
//! constraints defining nothing go last; insertion order breaks ties. A
//! cycle in the definition dependencies is an input error.

use std::collections::HashSet;

use log::debug;

use crate::error::{FznError, FznResult};
use crate::model::{CstrId, Model, VarId};

struct Descriptor {
    id: CstrId,
    target: Option<VarId>,
    /// Dependent variables this constraint consumes, its own target aside.
    required: HashSet<VarId>,
}

pub fn schedule(model: &Model) -> FznResult<Vec<CstrId>> {
    let dependent: HashSet<VarId> = model
        .variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.active && v.defining_constraint.is_some())
        .map(|(i, _)| VarId(i))
        .collect();

    let mut pending: Vec<Descriptor> = model
        .active_constraint_ids()
        .into_iter()
        .map(|id| {
            let ct = model.constraint(id);
            let required = ct
                .referenced_variables()
                .into_iter()
                .filter(|v| dependent.contains(v) && Some(*v) != ct.target_variable)
                .collect();
            Descriptor {
                id,
                target: ct.target_variable,
                required,
            }
        })
        .collect();

    let mut order = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let chosen = choose_ready(&pending).ok_or_else(|| {
            let stuck: Vec<&str> = pending
                .iter()
                .filter(|d| !d.required.is_empty())
                .take(4)
                .map(|d| model.constraint(d.id).ctype.as_str())
                .collect();
            FznError::inconsistent(format!(
                "cycle in variable-definition dependencies involving: {}",
                stuck.join(", ")
            ))
        })?;
        let descriptor = pending.swap_remove(chosen);
        if let Some(target) = descriptor.target {
            for other in &mut pending {
                other.required.remove(&target);
            }
        }
        order.push(descriptor.id);
    }
    debug!("scheduled {} constraints", order.len());
    Ok(order)
}

/// The ready descriptor to extract next, by (depended-on target, any
/// target, no target) and then insertion index.
fn choose_ready(pending: &[Descriptor]) -> Option<usize> {
    let mut best: Option<(usize, (u8, CstrId))> = None;
    for (position, descriptor) in pending.iter().enumerate() {
        if !descriptor.required.is_empty() {
            continue;
        }
        let rank = match descriptor.target {
            Some(target) => {
                let awaited = pending
                    .iter()
                    .any(|other| other.required.contains(&target));
                if awaited {
                    0
                } else {
                    1
                }
            }
            None => 2,
        };
        let key = (rank, descriptor.id);
        if best.is_none_or(|(_, best_key)| key < best_key) {
            best = Some((position, key));
        }
    }
    best.map(|(position, _)| position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::model::Argument;

    /// z is defined from x and y; the consumer of z must come after.
    #[test]
    fn definitions_precede_uses() {
        let mut model = Model::new();
        let x = model.new_variable("x", Domain::interval(0, 9), false);
        let y = model.new_variable("y", Domain::interval(0, 9), false);
        let z = model.new_variable("z", Domain::interval(0, 18), true);
        let consumer = model.new_constraint(
            "int_le",
            vec![Argument::IntVarRef(z), Argument::IntValue(7)],
        );
        let definer = model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![-1, 1, 1]),
                Argument::IntVarRefArray(vec![z, x, y]),
                Argument::IntValue(0),
            ],
        );
        model.set_target(definer, z).unwrap();

        let order = schedule(&model).unwrap();
        let pos = |id| order.iter().position(|&c| c == id).unwrap();
        assert!(pos(definer) < pos(consumer));
    }

    #[test]
    fn untargeted_constraints_come_last() {
        let mut model = Model::new();
        let x = model.new_variable("x", Domain::interval(0, 9), false);
        let z = model.new_variable("z", Domain::interval(0, 9), true);
        let plain = model.new_constraint(
            "int_ne",
            vec![Argument::IntVarRef(x), Argument::IntValue(0)],
        );
        let definer = model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![-1, 2]),
                Argument::IntVarRefArray(vec![z, x]),
                Argument::IntValue(0),
            ],
        );
        model.set_target(definer, z).unwrap();

        let order = schedule(&model).unwrap();
        assert_eq!(order, vec![definer, plain]);
    }

    #[test]
    fn definition_cycle_is_reported() {
        let mut model = Model::new();
        let a = model.new_variable("a", Domain::interval(0, 9), true);
        let b = model.new_variable("b", Domain::interval(0, 9), true);
        let c1 = model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![-1, 1]),
                Argument::IntVarRefArray(vec![a, b]),
                Argument::IntValue(0),
            ],
        );
        let c2 = model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![-1, 1]),
                Argument::IntVarRefArray(vec![b, a]),
                Argument::IntValue(1),
            ],
        );
        model.set_target(c1, a).unwrap();
        model.set_target(c2, b).unwrap();

        assert!(matches!(
            schedule(&model),
            Err(FznError::InconsistentModel { .. })
        ));
    }
}
