//! Equality, disequality, and ordering rules.

use log::trace;

use super::{Cmp, Presolver};
use crate::model::{Argument, CstrId, Model};

impl Presolver {
    /// `bool2int(b, x)`: a fixed side demotes the constraint to `int_eq`;
    /// two free variables are aliased and the constraint retires.
    pub(super) fn presolve_bool2int(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        if ct.args[0].has_one_value(model) || ct.args[1].has_one_value(model) {
            model.constraint_mut(id).ctype = "int_eq".to_string();
            return true;
        }
        let (Some(b), Some(x)) = (ct.args[0].var(), ct.args[1].var()) else {
            return false;
        };
        if b == x {
            model.deactivate(id);
            return true;
        }
        if self.record_alias(model, b, x) {
            trace!("bool2int: aliasing {:?} and {:?}", b, x);
            model.deactivate(id);
            true
        } else {
            // Both sides already own defining constraints; keep the
            // relation as a plain equality for the back-end.
            model.constraint_mut(id).ctype = "int_eq".to_string();
            true
        }
    }

    /// `int_eq` / `bool_eq`.
    pub(super) fn presolve_eq(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let left = ct.args[0].clone();
        let right = ct.args[1].clone();
        let left_value = left.value(model);
        let right_value = right.value(model);

        match (left_value, right_value) {
            (Some(a), Some(b)) => {
                if a != b {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (None, Some(c)) if left.is_variable() => {
                self.equality_with_constant(model, id, left.var().unwrap(), c)
            }
            (Some(c), None) if right.is_variable() => {
                self.equality_with_constant(model, id, right.var().unwrap(), c)
            }
            (None, None) => {
                let (Some(x), Some(y)) = (left.var(), right.var()) else {
                    return false;
                };
                if x == y {
                    model.deactivate(id);
                    return true;
                }
                if self.record_alias(model, x, y) {
                    model.deactivate(id);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// A variable equated to a constant. When the constant is zero and the
    /// difference map knows `x = p - q`, the constraint becomes the
    /// equivalent `int_eq(p, q)`; otherwise the domain collapses and the
    /// constraint retires.
    fn equality_with_constant(&mut self, model: &mut Model, id: CstrId, x: crate::model::VarId, c: i64) -> bool {
        if c == 0 {
            if let Some(&(p, q)) = self.difference_map.get(&x) {
                if p != x
                    && q != x
                    && model.var(p).active
                    && model.var(q).active
                    && model.var(x).active
                {
                    self.narrow_interval(model, x, 0, 0);
                    model.remove_target(id);
                    let ct = model.constraint_mut(id);
                    ct.args = vec![Argument::IntVarRef(p), Argument::IntVarRef(q)];
                    return true;
                }
            }
        }
        self.narrow_interval(model, x, c, c);
        model.deactivate(id);
        true
    }

    /// `int_ne`, binary `bool_not`, and binary `bool_xor` (all `a != b`).
    pub(super) fn presolve_ne(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let left = ct.args[0].clone();
        let right = ct.args[1].clone();

        match (left.value(model), right.value(model)) {
            (Some(a), Some(b)) => {
                if a == b {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (None, Some(c)) if left.is_variable() => {
                self.disequality_with_constant(model, id, left.var().unwrap(), c)
            }
            (Some(c), None) if right.is_variable() => {
                self.disequality_with_constant(model, id, right.var().unwrap(), c)
            }
            (None, None) => match (left.var(), right.var()) {
                (Some(x), Some(y)) if x == y => {
                    self.fail();
                    model.deactivate(id);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn disequality_with_constant(
        &mut self,
        model: &mut Model,
        id: CstrId,
        x: crate::model::VarId,
        c: i64,
    ) -> bool {
        if !model.var(x).domain.contains(c) {
            model.deactivate(id);
            return true;
        }
        if self.remove_value(model, x, c) {
            model.deactivate(id);
            true
        } else {
            // The removal is not representable (wide interval interior);
            // the back-end keeps the constraint.
            false
        }
    }

    /// `int_le` / `int_lt` / `int_ge` / `int_gt` and the bool analogues.
    pub(super) fn presolve_cmp(&mut self, model: &mut Model, id: CstrId, cmp: Cmp) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let left = ct.args[0].clone();
        let right = ct.args[1].clone();

        match (left.value(model), right.value(model)) {
            (Some(a), Some(b)) => {
                if !cmp.holds(a, b) {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (None, Some(c)) if left.is_variable() => {
                let x = left.var().unwrap();
                // x cmp c tightens x's upper or lower side.
                let ok = match cmp {
                    Cmp::Le => Some(self.narrow_interval(model, x, i64::MIN, c)),
                    Cmp::Lt => c
                        .checked_sub(1)
                        .map(|hi| self.narrow_interval(model, x, i64::MIN, hi)),
                    Cmp::Ge => Some(self.narrow_interval(model, x, c, i64::MAX)),
                    Cmp::Gt => c
                        .checked_add(1)
                        .map(|lo| self.narrow_interval(model, x, lo, i64::MAX)),
                };
                if ok.is_none() {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (Some(c), None) if right.is_variable() => {
                let y = right.var().unwrap();
                // c cmp y tightens y from the other side.
                let ok = match cmp {
                    Cmp::Le => Some(self.narrow_interval(model, y, c, i64::MAX)),
                    Cmp::Lt => c
                        .checked_add(1)
                        .map(|lo| self.narrow_interval(model, y, lo, i64::MAX)),
                    Cmp::Ge => Some(self.narrow_interval(model, y, i64::MIN, c)),
                    Cmp::Gt => c
                        .checked_sub(1)
                        .map(|hi| self.narrow_interval(model, y, i64::MIN, hi)),
                };
                if ok.is_none() {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (None, None) => {
                let (Some(x), Some(y)) = (left.var(), right.var()) else {
                    return false;
                };
                if x == y {
                    if matches!(cmp, Cmp::Lt | Cmp::Gt) {
                        self.fail();
                    }
                    model.deactivate(id);
                    return true;
                }
                if model.constraint(id).presolve_propagation_done {
                    return false;
                }
                model.constraint_mut(id).presolve_propagation_done = true;
                self.tighten_pair(model, x, y, cmp)
            }
            _ => false,
        }
    }

    /// Bound propagation across `x cmp y`, once per constraint. Sentinel
    /// bounds (unbounded sides) propagate nothing.
    fn tighten_pair(
        &mut self,
        model: &mut Model,
        x: crate::model::VarId,
        y: crate::model::VarId,
        cmp: Cmp,
    ) -> bool {
        // Normalize to x' <= y' or x' < y'.
        let (lo_side, hi_side, strict) = match cmp {
            Cmp::Le => (x, y, false),
            Cmp::Lt => (x, y, true),
            Cmp::Ge => (y, x, false),
            Cmp::Gt => (y, x, true),
        };
        let mut changed = false;
        let upper = model.var(hi_side).max();
        if upper != i64::MAX {
            let bound = if strict { upper - 1 } else { upper };
            changed |= self.narrow_interval(model, lo_side, i64::MIN, bound);
        }
        let lower = model.var(lo_side).min();
        if lower != i64::MIN {
            let bound = if strict { lower + 1 } else { lower };
            changed |= self.narrow_interval(model, hi_side, bound, i64::MAX);
        }
        changed
    }
}
