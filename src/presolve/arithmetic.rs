//! Arithmetic constraint rules and the abs-map storage rule.

use super::Presolver;
use crate::model::{CstrId, Model};

impl Presolver {
    /// `int_times(a, b, c)`: fixed inputs pin the output.
    pub(super) fn presolve_int_times(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 3 || ct.presolve_propagation_done {
            return false;
        }
        let (Some(a), Some(b)) = (ct.args[0].value(model), ct.args[1].value(model)) else {
            return false;
        };
        let Some(product) = a.checked_mul(b) else {
            return false;
        };
        model.constraint_mut(id).presolve_propagation_done = true;
        self.settle_result(model, id, product)
    }

    /// `int_div(a, b, c)`: fixed inputs pin the output; a zero divisor is
    /// unsatisfiable.
    pub(super) fn presolve_int_div(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 3 || ct.presolve_propagation_done {
            return false;
        }
        let (Some(a), Some(b)) = (ct.args[0].value(model), ct.args[1].value(model)) else {
            return false;
        };
        if b == 0 {
            self.fail();
            model.deactivate(id);
            return true;
        }
        let Some(quotient) = a.checked_div(b) else {
            return false;
        };
        model.constraint_mut(id).presolve_propagation_done = true;
        self.settle_result(model, id, quotient)
    }

    /// `int_mod(x, m, r)`: a target already pinned by its domain no longer
    /// needs defining.
    pub(super) fn presolve_int_mod(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 3 {
            return false;
        }
        let (Some(target), Some(result)) = (ct.target_variable, ct.args[2].var()) else {
            return false;
        };
        if target == result && model.var(result).has_one_value() {
            model.remove_target(id);
            return true;
        }
        false
    }

    /// `int_abs(x, y)` feeds the abs map: `y = |x|`. Bookkeeping only.
    pub(super) fn presolve_int_abs(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        if let (Some(x), Some(y)) = (ct.args[0].var(), ct.args[1].var()) {
            if x != y {
                self.abs_map.entry(y).or_insert(x);
            }
        }
        false
    }

    /// Pins the third argument of a functional constraint to `value` and
    /// retires the constraint.
    fn settle_result(&mut self, model: &mut Model, id: CstrId, value: i64) -> bool {
        let result = model.constraint(id).args[2].clone();
        match (result.var(), result.value(model)) {
            (Some(r), _) => {
                self.narrow_interval(model, r, value, value);
                model.deactivate(id);
                true
            }
            (None, Some(v)) => {
                if v != value {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            _ => false,
        }
    }
}
