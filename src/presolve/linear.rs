//! Rules over the `int_lin_*` family.
//!
//! Bound computations saturate at the i64 limits, and any rule that needs a
//! linear expression's reach skips constraints whose variables sit at a
//! sentinel bound.

use log::trace;

use super::{int_list, var_array, AffineMapping, Flatten2dMapping, Presolver};
use crate::error::FznResult;
use crate::model::{Argument, CstrId, Model, VarId};

/// The three-argument shape shared by every linear constraint.
struct LinearView {
    coeffs: Vec<i64>,
    vars: Vec<VarId>,
    rhs: i64,
}

fn linear_view(model: &Model, id: CstrId) -> Option<LinearView> {
    let ct = model.constraint(id);
    if ct.args.len() < 3 {
        return None;
    }
    let coeffs = int_list(&ct.args[0])?.to_vec();
    let vars = var_array(&ct.args[1])?.to_vec();
    let Argument::IntValue(rhs) = ct.args[2] else {
        return None;
    };
    if coeffs.len() != vars.len() {
        return None;
    }
    Some(LinearView { coeffs, vars, rhs })
}

/// Reach of `sum(coeffs * vars)` under the current bounds, or `None` when a
/// variable is unbounded on the side that matters.
fn linear_bounds(model: &Model, coeffs: &[i64], vars: &[VarId]) -> Option<(i64, i64)> {
    let mut lower = 0i64;
    let mut upper = 0i64;
    for (&c, &v) in coeffs.iter().zip(vars) {
        let (min, max) = (model.var(v).min(), model.var(v).max());
        if min == i64::MIN || max == i64::MAX {
            return None;
        }
        let (term_lo, term_hi) = if c >= 0 {
            (c.saturating_mul(min), c.saturating_mul(max))
        } else {
            (c.saturating_mul(max), c.saturating_mul(min))
        };
        lower = lower.saturating_add(term_lo);
        upper = upper.saturating_add(term_hi);
    }
    Some((lower, upper))
}

fn div_floor(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

fn div_ceil(a: i64, b: i64) -> i64 {
    a.div_euclid(b) + i64::from(a.rem_euclid(b) != 0)
}

impl Presolver {
    /// `int_lin_lt` / `int_lin_gt` canonicalize to their non-strict forms.
    pub(super) fn canonicalize_strict_linear(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() < 3 {
            return false;
        }
        let Argument::IntValue(rhs) = ct.args[2] else {
            return false;
        };
        let (renamed, bumped) = match ct.ctype.as_str() {
            "int_lin_lt" => ("int_lin_le", rhs.checked_sub(1)),
            "int_lin_gt" => ("int_lin_ge", rhs.checked_add(1)),
            _ => return false,
        };
        let Some(bumped) = bumped else {
            return false;
        };
        let ct = model.constraint_mut(id);
        ct.ctype = renamed.to_string();
        ct.args[2] = Argument::IntValue(bumped);
        true
    }

    /// `int_lin_eq` / `int_lin_le` / `int_lin_ge` / `int_lin_ne`.
    pub(super) fn presolve_linear(&mut self, model: &mut Model, id: CstrId) -> FznResult<bool> {
        let Some(view) = linear_view(model, id) else {
            return Ok(false);
        };
        let op = model.constraint(id).ctype.clone();
        let op = op.trim_start_matches("int_lin_");

        if self.evaluate_fixed_linear(model, id, &view, op) {
            return Ok(true);
        }
        if self.negate_all_negative(model, id, &view, op) {
            return Ok(true);
        }
        if view.coeffs.len() == 1 && view.coeffs[0] == 1 {
            let ct = model.constraint_mut(id);
            ct.ctype = format!("int_{}", op);
            ct.args = vec![Argument::IntVarRef(view.vars[0]), Argument::IntValue(view.rhs)];
            return Ok(true);
        }
        if op == "le" && self.rewrite_hidden_or(model, id, &view) {
            return Ok(true);
        }
        if op == "eq" {
            self.store_index_mappings(model, id, &view);
        }
        let mut changed = false;
        if matches!(op, "eq" | "le" | "ge") {
            changed |= self.propagate_positive_linear(model, id, &view, op);
        }
        if op == "eq" {
            changed |= self.create_linear_target(model, id, &view)?;
        }
        Ok(changed)
    }

    /// A linear constraint whose variables are all fixed either holds or
    /// refutes the model.
    fn evaluate_fixed_linear(
        &mut self,
        model: &mut Model,
        id: CstrId,
        view: &LinearView,
        op: &str,
    ) -> bool {
        let mut sum = 0i64;
        for (&c, &v) in view.coeffs.iter().zip(&view.vars) {
            let Some(value) = model.var(v).domain.value() else {
                return false;
            };
            sum = sum.saturating_add(c.saturating_mul(value));
        }
        let holds = match op {
            "eq" => sum == view.rhs,
            "ne" => sum != view.rhs,
            "le" => sum <= view.rhs,
            "ge" => sum >= view.rhs,
            _ => return false,
        };
        if !holds {
            self.fail();
        }
        model.deactivate(id);
        true
    }

    /// All-non-positive coefficient vectors flip sign, inverting `le`/`ge`.
    fn negate_all_negative(
        &mut self,
        model: &mut Model,
        id: CstrId,
        view: &LinearView,
        op: &str,
    ) -> bool {
        if view.coeffs.iter().any(|&c| c > 0) || view.coeffs.iter().all(|&c| c == 0) {
            return false;
        }
        if let Some(target) = model.constraint(id).target_variable {
            if view.vars.contains(&target) {
                return false;
            }
        }
        if view.coeffs.contains(&i64::MIN) || view.rhs == i64::MIN {
            return false;
        }
        let flipped = match op {
            "eq" => "int_lin_eq",
            "ne" => "int_lin_ne",
            "le" => "int_lin_ge",
            "ge" => "int_lin_le",
            _ => return false,
        };
        let negated: Vec<i64> = view.coeffs.iter().map(|&c| -c).collect();
        let ct = model.constraint_mut(id);
        ct.ctype = flipped.to_string();
        ct.args[0] = Argument::IntList(negated);
        ct.args[2] = Argument::IntValue(-view.rhs);
        true
    }

    /// `int_lin_le([-k, 1, ..., 1], [b, b1, ..., bn], 0)` with `k >= n` over
    /// booleans is a disjunction with `b` as its result.
    fn rewrite_hidden_or(&mut self, model: &mut Model, id: CstrId, view: &LinearView) -> bool {
        if view.rhs != 0 || view.coeffs.len() < 2 {
            return false;
        }
        let k = -view.coeffs[0];
        let n = (view.coeffs.len() - 1) as i64;
        if k < n || view.coeffs[1..].iter().any(|&c| c != 1) {
            return false;
        }
        if view.vars.iter().any(|&v| !model.var(v).is_boolean()) {
            return false;
        }
        trace!("hidden array_bool_or over {} elements", n);
        let ct = model.constraint_mut(id);
        ct.ctype = "array_bool_or".to_string();
        ct.args = vec![
            Argument::IntVarRefArray(view.vars[1..].to_vec()),
            Argument::IntVarRef(view.vars[0]),
        ];
        true
    }

    /// Defining equalities feed the affine and 2D-flattening maps consumed
    /// by the element rules. Pure bookkeeping, not a rewrite.
    fn store_index_mappings(&mut self, model: &Model, id: CstrId, view: &LinearView) {
        let Some(target) = model.constraint(id).target_variable else {
            return;
        };
        match (view.coeffs.as_slice(), view.vars.as_slice()) {
            (&[-1, a], &[z, x]) if z == target && a != 0 && view.rhs != i64::MIN => {
                self.affine_map.entry(z).or_insert(AffineMapping {
                    var: x,
                    coefficient: a,
                    offset: -view.rhs,
                });
            }
            (&[-1, a, 1], &[z, x, y]) if z == target && a != 0 && view.rhs != i64::MIN => {
                self.flatten2d_map.entry(z).or_insert(Flatten2dMapping {
                    row: x,
                    col: y,
                    coefficient: a,
                    offset: -view.rhs,
                });
            }
            _ => {}
        }
    }

    /// With non-negative coefficients and non-negative lower bounds, `rhs`
    /// caps every term: `x_i <= rhs / c_i`. Unary constraints also pin the
    /// lower side. One-shot per constraint.
    fn propagate_positive_linear(
        &mut self,
        model: &mut Model,
        id: CstrId,
        view: &LinearView,
        op: &str,
    ) -> bool {
        if model.constraint(id).presolve_propagation_done {
            return false;
        }
        if view.coeffs.iter().any(|&c| c < 0) {
            return false;
        }
        if view.vars.iter().any(|&v| model.var(v).min() < 0) {
            return false;
        }
        model.constraint_mut(id).presolve_propagation_done = true;
        let mut changed = false;
        if matches!(op, "eq" | "le") {
            for (&c, &v) in view.coeffs.iter().zip(&view.vars) {
                if c > 0 {
                    changed |= self.narrow_interval(model, v, i64::MIN, div_floor(view.rhs, c));
                }
            }
        }
        if view.coeffs.len() == 1 && view.coeffs[0] > 0 && matches!(op, "eq" | "ge") {
            let lo = div_ceil(view.rhs, view.coeffs[0]);
            changed |= self.narrow_interval(model, view.vars[0], lo, i64::MAX);
        }
        changed
    }

    /// `[-1, c...] . [xt, x...] = rhs` defines `xt` when nothing else does.
    fn create_linear_target(
        &mut self,
        model: &mut Model,
        id: CstrId,
        view: &LinearView,
    ) -> FznResult<bool> {
        if model.constraint(id).target_variable.is_some() {
            return Ok(false);
        }
        if view.coeffs.len() < 2 || view.coeffs[0] != -1 {
            return Ok(false);
        }
        let candidate = view.vars[0];
        if !model.var(candidate).active
            || model.var(candidate).defining_constraint.is_some()
            || view.vars[1..].contains(&candidate)
        {
            return Ok(false);
        }
        trace!(
            "defining '{}' through a linear equality",
            model.var(candidate).name
        );
        model.set_target(id, candidate)?;
        Ok(true)
    }

    /// `int_lin_eq_reif`: when the expression's reach excludes or pins the
    /// right-hand side, the reification is decided.
    pub(super) fn presolve_lin_eq_reif(&mut self, model: &mut Model, id: CstrId) -> bool {
        let ct = model.constraint(id);
        if ct.args.len() != 4 {
            return false;
        }
        let (Some(coeffs), Some(vars)) = (int_list(&ct.args[0]), var_array(&ct.args[1])) else {
            return false;
        };
        let Argument::IntValue(rhs) = ct.args[2] else {
            return false;
        };
        if coeffs.len() != vars.len() {
            return false;
        }
        let (coeffs, vars) = (coeffs.to_vec(), vars.to_vec());
        let reif = ct.args[3].clone();
        let Some((lower, upper)) = linear_bounds(model, &coeffs, &vars) else {
            return false;
        };
        if rhs < lower || rhs > upper {
            return self.fix_reification(model, id, &reif, false);
        }
        if lower == upper && lower == rhs {
            return self.fix_reification(model, id, &reif, true);
        }
        false
    }
}
