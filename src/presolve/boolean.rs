//! `array_bool_or` / `array_bool_and` burn-down.

use super::Presolver;
use crate::model::{Argument, CstrId, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BoolOp {
    Or,
    And,
}

impl BoolOp {
    /// The value that leaves the operation undecided (0 for or, 1 for and).
    fn identity(self) -> i64 {
        match self {
            BoolOp::Or => 0,
            BoolOp::And => 1,
        }
    }

    /// The value that decides the whole operation (1 for or, 0 for and).
    fn forcing(self) -> i64 {
        1 - self.identity()
    }
}

impl Presolver {
    pub(super) fn presolve_array_bool(
        &mut self,
        model: &mut Model,
        id: CstrId,
        op: BoolOp,
    ) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let target = ct.args[1].clone();

        // A fully constant array decides the target outright.
        if let Argument::IntList(values) = &ct.args[0] {
            let result = match op {
                BoolOp::Or => values.iter().any(|&v| v != 0),
                BoolOp::And => values.iter().all(|&v| v != 0),
            };
            return self.settle_bool_target(model, id, &target, result);
        }

        let Argument::IntVarRefArray(vars) = ct.args[0].clone() else {
            return false;
        };

        if vars.len() == 1 {
            let ct = model.constraint_mut(id);
            ct.ctype = "bool_eq".to_string();
            ct.args = vec![Argument::IntVarRef(vars[0]), target];
            return true;
        }

        // Target pinned to the identity forces every element to it.
        if target.value(model) == Some(op.identity()) {
            for &v in &vars {
                self.narrow_interval(model, v, op.identity(), op.identity());
            }
            model.deactivate(id);
            return true;
        }

        // One forcing element decides the target and satisfies the rest.
        if vars
            .iter()
            .any(|&v| model.var(v).domain.value() == Some(op.forcing()))
        {
            return self.settle_bool_target(model, id, &target, op.forcing() == 1);
        }

        // Everything fixed (necessarily to the identity at this point).
        if vars.iter().all(|&v| model.var(v).has_one_value()) {
            return self.settle_bool_target(model, id, &target, op.identity() == 1);
        }

        // Drop the already-decided elements.
        let remaining: Vec<_> = vars
            .iter()
            .copied()
            .filter(|&v| !model.var(v).has_one_value())
            .collect();
        if remaining.len() != vars.len() {
            model.constraint_mut(id).args[0] = Argument::IntVarRefArray(remaining);
            return true;
        }
        false
    }

    fn settle_bool_target(
        &mut self,
        model: &mut Model,
        id: CstrId,
        target: &Argument,
        result: bool,
    ) -> bool {
        match (target.var(), target.value(model)) {
            (Some(r), None) => {
                self.narrow_interval(model, r, result as i64, result as i64);
                model.deactivate(id);
                true
            }
            (_, Some(v)) => {
                if (v != 0) != result {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            _ => false,
        }
    }
}
