//! Reification rules: unwrap, fixed-comparand demotion, comparison
//! propagation, and set membership.

use log::trace;

use super::{set_argument, Presolver};
use crate::domain::Domain;
use crate::model::{Argument, CstrId, Model, VarId};

/// The negated form of a comparison constraint name, e.g. `int_le` to
/// `int_gt`. `None` when the constraint has no comparator tail to invert.
fn negated_comparison(base: &str) -> Option<String> {
    if base == "set_in" {
        return Some("set_not_in".to_string());
    }
    let (prefix, suffix) = base.rsplit_once('_')?;
    let inverted = match suffix {
        "eq" => "ne",
        "ne" => "eq",
        "le" => "gt",
        "gt" => "le",
        "lt" => "ge",
        "ge" => "lt",
        _ => return None,
    };
    Some(format!("{}_{}", prefix, inverted))
}

impl Presolver {
    /// Any `*_reif` whose reification argument is fixed sheds the boolean:
    /// a true reification drops the suffix, a false one also inverts the
    /// comparator.
    pub(super) fn unwrap_reified(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        let Some(last) = ct.args.last() else {
            return false;
        };
        let Some(value) = last.value(model) else {
            return false;
        };
        let base = ct.ctype.trim_end_matches("_reif").to_string();
        let renamed = if value != 0 {
            base
        } else {
            match negated_comparison(&base) {
                Some(negated) => negated,
                None => return false,
            }
        };
        trace!("unwrap: {} -> {}", ct.ctype, renamed);
        if let (Some(target), Some(reif_var)) = (ct.target_variable, last.var()) {
            if target == reif_var {
                model.remove_target(id);
            }
        }
        let ct = model.constraint_mut(id);
        ct.args.pop();
        ct.ctype = renamed;
        true
    }

    /// `bool_eq_reif` / `bool_ne_reif` with a fixed comparand demote to
    /// `bool_eq` or `bool_not`; equal operands fix the reification.
    pub(super) fn presolve_bool_cmp_reif(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 3 {
            return false;
        }
        let equality = ct.ctype == "bool_eq_reif";
        let left = ct.args[0].clone();
        let right = ct.args[1].clone();
        let reif = ct.args[2].clone();

        if let (Some(x), Some(y)) = (left.var(), right.var()) {
            if x == y {
                if let Some(r) = reif.var() {
                    self.narrow_interval(model, r, equality as i64, equality as i64);
                    model.deactivate(id);
                    return true;
                }
            }
        }

        let (fixed, other) = match (left.value(model), right.value(model)) {
            (Some(c), None) => (c, right),
            (None, Some(c)) => (c, left),
            _ => return false,
        };
        let keeps_polarity = (fixed == 1) == equality;
        let ct = model.constraint_mut(id);
        ct.ctype = if keeps_polarity {
            "bool_eq".to_string()
        } else {
            "bool_not".to_string()
        };
        ct.args = vec![other, reif];
        true
    }

    /// Reified integer comparisons: the abs-map rewrites, then propagation
    /// when both sides coincide or one side's range decides the comparison.
    pub(super) fn presolve_int_cmp_reif(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 3 {
            return false;
        }
        let op = ct
            .ctype
            .trim_end_matches("_reif")
            .rsplit('_')
            .next()
            .unwrap_or("")
            .to_string();
        let left = ct.args[0].clone();
        let right = ct.args[1].clone();
        let reif = ct.args[2].clone();

        if self.rewrite_through_abs(model, id, &op, &left, &right) {
            return true;
        }

        if let (Some(x), Some(y)) = (left.var(), right.var()) {
            if x == y {
                let at_equality = matches!(op.as_str(), "eq" | "le" | "ge");
                return self.fix_reification(model, id, &reif, at_equality);
            }
        }

        if let (Some(a), Some(b)) = (left.value(model), right.value(model)) {
            let value = match op.as_str() {
                "eq" => a == b,
                "ne" => a != b,
                "le" => a <= b,
                "lt" => a < b,
                "ge" => a >= b,
                "gt" => a > b,
                _ => return false,
            };
            return self.fix_reification(model, id, &reif, value);
        }

        // Normalize to "x op c".
        let (x, c, op) = match (left.var(), left.value(model), right.var(), right.value(model)) {
            (Some(x), None, _, Some(c)) => (x, c, op),
            (_, Some(c), Some(y), None) => (y, c, mirrored(&op)),
            _ => return false,
        };
        let (min, max) = (model.var(x).min(), model.var(x).max());
        let decided = match op.as_str() {
            "eq" => {
                if !model.var(x).domain.contains(c) {
                    Some(false)
                } else if model.var(x).has_one_value() {
                    Some(true)
                } else {
                    None
                }
            }
            "ne" => {
                if !model.var(x).domain.contains(c) {
                    Some(true)
                } else if model.var(x).has_one_value() {
                    Some(false)
                } else {
                    None
                }
            }
            "le" => {
                if max <= c {
                    Some(true)
                } else if min > c {
                    Some(false)
                } else {
                    None
                }
            }
            "lt" => {
                if max < c {
                    Some(true)
                } else if min >= c {
                    Some(false)
                } else {
                    None
                }
            }
            "ge" => {
                if min >= c {
                    Some(true)
                } else if max < c {
                    Some(false)
                } else {
                    None
                }
            }
            "gt" => {
                if min > c {
                    Some(true)
                } else if max <= c {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        };
        match decided {
            Some(value) => self.fix_reification(model, id, &reif, value),
            None => false,
        }
    }

    /// `int_eq_reif(|x|, 0, r)` tests `x` directly; `int_le_reif(|x|, c, r)`
    /// with `c >= 0` becomes a symmetric membership test.
    fn rewrite_through_abs(
        &mut self,
        model: &mut Model,
        id: CstrId,
        op: &str,
        left: &Argument,
        right: &Argument,
    ) -> bool {
        let source_of = |arg: &Argument, this: &Self| -> Option<VarId> {
            arg.var().and_then(|v| this.abs_map.get(&v).copied())
        };
        match op {
            "eq" => {
                if let (Some(x), Some(0)) = (source_of(left, self), right.value(model)) {
                    if Some(x) != left.var() {
                        model.constraint_mut(id).args[0] = Argument::IntVarRef(x);
                        return true;
                    }
                }
                if let (Some(0), Some(x)) = (left.value(model), source_of(right, self)) {
                    if Some(x) != right.var() {
                        model.constraint_mut(id).args[1] = Argument::IntVarRef(x);
                        return true;
                    }
                }
                false
            }
            "le" => {
                if let (Some(x), Some(c)) = (source_of(left, self), right.value(model)) {
                    if c >= 0 {
                        let reif = model.constraint(id).args[2].clone();
                        let ct = model.constraint_mut(id);
                        ct.ctype = "set_in_reif".to_string();
                        ct.args = vec![Argument::IntVarRef(x), Argument::IntInterval(-c, c), reif];
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    pub(super) fn fix_reification(
        &mut self,
        model: &mut Model,
        id: CstrId,
        reif: &Argument,
        value: bool,
    ) -> bool {
        match reif.var() {
            Some(r) => {
                self.narrow_interval(model, r, value as i64, value as i64);
                model.deactivate(id);
                true
            }
            None => match reif.value(model) {
                Some(v) => {
                    if (v != 0) != value {
                        self.fail();
                    }
                    model.deactivate(id);
                    true
                }
                None => false,
            },
        }
    }

    /// `set_in(x, S)`: fold the set into the domain and retire.
    pub(super) fn presolve_set_in(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let Some(set) = set_argument(&ct.args[1]) else {
            return false;
        };
        match (ct.args[0].var(), ct.args[0].value(model)) {
            (Some(x), None) => {
                self.narrow_domain(model, x, &set);
                model.deactivate(id);
                true
            }
            (_, Some(v)) => {
                if !set.contains(v) {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            _ => false,
        }
    }

    /// `set_not_in(x, S)`: remove what is representable; keep the
    /// constraint when a wide interval blocks a removal.
    pub(super) fn presolve_set_not_in(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 2 {
            return false;
        }
        let Some(set) = set_argument(&ct.args[1]) else {
            return false;
        };
        if let Some(v) = ct.args[0].value(model) {
            if set.contains(v) {
                self.fail();
            }
            model.deactivate(id);
            return true;
        }
        let Some(x) = ct.args[0].var() else {
            return false;
        };
        let excluded: Vec<i64> = match &set {
            Domain::Values(values) => values.clone(),
            Domain::Interval { lo, hi } if hi.checked_sub(*lo).is_some_and(|w| w < 64) => {
                (*lo..=*hi).collect()
            }
            _ => return false,
        };
        let mut complete = true;
        let mut changed = false;
        for v in excluded {
            if !model.var(x).domain.contains(v) {
                continue;
            }
            if self.remove_value(model, x, v) {
                changed = true;
            } else {
                complete = false;
            }
        }
        if complete {
            model.deactivate(id);
            return true;
        }
        changed
    }
}

fn mirrored(op: &str) -> String {
    match op {
        "le" => "ge",
        "lt" => "gt",
        "ge" => "le",
        "gt" => "lt",
        other => other,
    }
    .to_string()
}
