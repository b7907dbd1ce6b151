//! Occurrence statistics over active constraints.
//!
//! Two multi-maps: constraint type to constraints, and variable to the
//! constraints it appears in. Recomputed on demand; only active constraints
//! count. The per-variable counts feed the search-ordering heuristics.

use std::collections::HashMap;

use crate::model::{CstrId, Model, VarId};

#[derive(Debug, Default)]
pub struct ModelStatistics {
    pub constraints_per_type: HashMap<String, Vec<CstrId>>,
    pub constraints_per_variable: HashMap<VarId, Vec<CstrId>>,
}

impl ModelStatistics {
    pub fn compute(model: &Model) -> Self {
        let mut stats = ModelStatistics::default();
        for id in model.active_constraint_ids() {
            let ct = model.constraint(id);
            stats
                .constraints_per_type
                .entry(ct.ctype.clone())
                .or_default()
                .push(id);
            let mut vars = ct.referenced_variables();
            vars.sort_unstable();
            vars.dedup();
            for var in vars {
                stats
                    .constraints_per_variable
                    .entry(var)
                    .or_default()
                    .push(id);
            }
        }
        stats
    }

    /// Number of active constraints mentioning `var`.
    pub fn occurrences(&self, var: VarId) -> usize {
        self.constraints_per_variable
            .get(&var)
            .map_or(0, Vec::len)
    }

    pub fn constraints_of_type(&self, ctype: &str) -> &[CstrId] {
        self.constraints_per_type
            .get(ctype)
            .map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::model::Argument;

    #[test]
    fn counts_ignore_inactive_constraints() {
        let mut model = Model::new();
        let x = model.new_variable("x", Domain::interval(0, 5), false);
        let y = model.new_variable("y", Domain::interval(0, 5), false);
        let c0 = model.new_constraint(
            "int_le",
            vec![Argument::IntVarRef(x), Argument::IntVarRef(y)],
        );
        model.new_constraint(
            "int_ne",
            vec![Argument::IntVarRef(x), Argument::IntValue(3)],
        );
        model.deactivate(c0);

        let stats = ModelStatistics::compute(&model);
        assert_eq!(stats.occurrences(x), 1);
        assert_eq!(stats.occurrences(y), 0);
        assert_eq!(stats.constraints_of_type("int_le").len(), 0);
        assert_eq!(stats.constraints_of_type("int_ne").len(), 1);
    }

    #[test]
    fn duplicate_mentions_count_once_per_constraint() {
        let mut model = Model::new();
        let x = model.new_variable("x", Domain::interval(0, 5), false);
        model.new_constraint(
            "int_lin_eq",
            vec![
                Argument::IntList(vec![1, -1]),
                Argument::IntVarRefArray(vec![x, x]),
                Argument::IntValue(0),
            ],
        );
        let stats = ModelStatistics::compute(&model);
        assert_eq!(stats.occurrences(x), 1);
    }
}
