//! `array_int_element` / `array_var_int_element` rules.
//!
//! Besides the direct simplifications, these reverse the affine and
//! 2D-flattening index mappings collected by the linear rules: an index
//! variable that is itself `a*x + b` lets the lookup run over `x` and a
//! translated array instead. The 2D rewrite only fires on constraints that
//! asked for strong propagation; the plain rewrite can pessimize back-ends
//! that specialize one-dimensional element.

use log::trace;

use super::Presolver;
use crate::domain::Domain;
use crate::error::FznResult;
use crate::model::{Argument, CstrId, Model, VarId};

impl Presolver {
    pub(super) fn presolve_array_int_element(
        &mut self,
        model: &mut Model,
        id: CstrId,
    ) -> FznResult<bool> {
        let ct = model.constraint(id);
        if ct.args.len() != 3 {
            return Ok(false);
        }
        let Some(values) = super::int_list(&ct.args[1]).map(<[i64]>::to_vec) else {
            return Ok(false);
        };
        let result = ct.args[2].clone();

        // Bound index: the lookup is a plain equality.
        if let Some(v) = ct.args[0].value(model) {
            if v < 1 || v as usize > values.len() {
                self.fail();
                model.deactivate(id);
                return Ok(true);
            }
            let element = values[v as usize - 1];
            self.release_target_outside_result(model, id, &result);
            let ct = model.constraint_mut(id);
            ct.ctype = "int_eq".to_string();
            ct.args = vec![Argument::IntValue(element), result];
            return Ok(true);
        }
        let Some(index) = ct.args[0].var() else {
            return Ok(false);
        };

        let changed = self.clamp_index(model, index, values.len());

        // Trailing values outside the result's domain can never be chosen.
        if let Some(result_domain) = argument_domain(model, &result) {
            let mut trimmed = values.clone();
            while let Some(&last) = trimmed.last() {
                if result_domain.contains(last) {
                    break;
                }
                trimmed.pop();
            }
            if trimmed.is_empty() {
                self.fail();
                model.deactivate(id);
                return Ok(true);
            }
            if trimmed.len() != values.len() {
                trace!(
                    "element: trimmed {} unreachable trailing values",
                    values.len() - trimmed.len()
                );
                let new_len = trimmed.len();
                model.constraint_mut(id).args[1] = Argument::IntList(trimmed);
                self.clamp_index(model, index, new_len);
                return Ok(true);
            }
        }

        // A contiguous increasing run starting at s means
        // result = index + (s - 1).
        if values.len() >= 2
            && values
                .windows(2)
                .all(|w| w[1].checked_sub(w[0]) == Some(1))
        {
            let offset = values[0] - 1;
            return Ok(self.rewrite_contiguous_run(model, id, index, &result, offset));
        }

        if self.reverse_affine_const(model, id, index, &values)? {
            return Ok(true);
        }
        if self.reverse_flatten2d(model, id, index) {
            return Ok(true);
        }
        Ok(changed)
    }

    pub(super) fn presolve_array_var_int_element(
        &mut self,
        model: &mut Model,
        id: CstrId,
    ) -> FznResult<bool> {
        let ct = model.constraint(id);
        if ct.args.len() != 3 {
            return Ok(false);
        }
        let Some(elements) = super::var_array(&ct.args[1]).map(<[VarId]>::to_vec) else {
            return Ok(false);
        };
        let result = ct.args[2].clone();

        if let Some(v) = ct.args[0].value(model) {
            if v < 1 || v as usize > elements.len() {
                self.fail();
                model.deactivate(id);
                return Ok(true);
            }
            let element = elements[v as usize - 1];
            self.release_target_outside_result(model, id, &result);
            let ct = model.constraint_mut(id);
            ct.ctype = "int_eq".to_string();
            ct.args = vec![Argument::IntVarRef(element), result];
            return Ok(true);
        }
        let Some(index) = ct.args[0].var() else {
            return Ok(false);
        };

        let changed = self.clamp_index(model, index, elements.len());

        // Fully fixed elements demote to the constant-array form.
        if elements.iter().all(|&v| model.var(v).has_one_value()) {
            let values: Vec<i64> = elements
                .iter()
                .map(|&v| model.var(v).domain.value().unwrap())
                .collect();
            let ct = model.constraint_mut(id);
            ct.ctype = "array_int_element".to_string();
            ct.args[1] = Argument::IntList(values);
            return Ok(true);
        }

        if self.reverse_affine_vars(model, id, index, &elements)? {
            return Ok(true);
        }
        Ok(changed)
    }

    /// Keeps the index inside `1..=len`.
    fn clamp_index(&mut self, model: &mut Model, index: VarId, len: usize) -> bool {
        self.narrow_interval(model, index, 1, len as i64)
    }

    /// The index positions reachable through `index = a*x + b` for
    /// `x = 1, 2, ...`, while they stay inside `1..=len`.
    fn reachable_positions(&self, index: VarId, len: usize) -> Option<(VarId, Vec<usize>)> {
        let mapping = self.affine_map.get(&index)?;
        let (a, b) = (mapping.coefficient, mapping.offset);
        if a < 1 || a.saturating_add(b) < 1 {
            return None;
        }
        // A chained mapping on the underlying variable would re-trigger the
        // rewrite forever; one level is all the flattener produces.
        if self.affine_map.contains_key(&mapping.var)
            || self.flatten2d_map.contains_key(&mapping.var)
        {
            return None;
        }
        let mut positions = Vec::new();
        let mut x = 1i64;
        loop {
            let position = a.saturating_mul(x).saturating_add(b);
            if position > len as i64 {
                break;
            }
            if position >= 1 {
                positions.push(position as usize);
            }
            x += 1;
        }
        Some((mapping.var, positions))
    }

    fn reverse_affine_const(
        &mut self,
        model: &mut Model,
        id: CstrId,
        index: VarId,
        values: &[i64],
    ) -> FznResult<bool> {
        let Some((underlying, positions)) = self.reachable_positions(index, values.len()) else {
            return Ok(false);
        };
        if !model.var(underlying).active {
            return Ok(false);
        }
        if positions.is_empty() {
            self.fail();
            model.deactivate(id);
            return Ok(true);
        }
        let translated: Vec<i64> = positions.iter().map(|&p| values[p - 1]).collect();
        trace!(
            "element: affine reversal onto '{}' with {} entries",
            model.var(underlying).name,
            translated.len()
        );
        let len = translated.len();
        let ct = model.constraint_mut(id);
        ct.args[0] = Argument::IntVarRef(underlying);
        ct.args[1] = Argument::IntList(translated);
        self.clamp_index(model, underlying, len);
        Ok(true)
    }

    fn reverse_affine_vars(
        &mut self,
        model: &mut Model,
        id: CstrId,
        index: VarId,
        elements: &[VarId],
    ) -> FznResult<bool> {
        let Some((underlying, positions)) = self.reachable_positions(index, elements.len()) else {
            return Ok(false);
        };
        if !model.var(underlying).active {
            return Ok(false);
        }
        if positions.is_empty() {
            self.fail();
            model.deactivate(id);
            return Ok(true);
        }
        let translated: Vec<VarId> = positions.iter().map(|&p| elements[p - 1]).collect();
        let len = translated.len();
        let ct = model.constraint_mut(id);
        ct.args[0] = Argument::IntVarRef(underlying);
        ct.args[1] = Argument::IntVarRefArray(translated);
        self.clamp_index(model, underlying, len);
        Ok(true)
    }

    /// `index = a*row + col + b` turns the lookup into a 2D element over
    /// the two underlying variables. Opt-in through strong propagation.
    fn reverse_flatten2d(&mut self, model: &mut Model, id: CstrId, index: VarId) -> bool {
        if !model.constraint(id).strong_propagation {
            return false;
        }
        let Some(mapping) = self.flatten2d_map.get(&index).copied() else {
            return false;
        };
        if !model.var(mapping.row).active || !model.var(mapping.col).active {
            return false;
        }
        let ct = model.constraint_mut(id);
        let values = ct.args[1].clone();
        let result = ct.args[2].clone();
        trace!("element: rewriting as 2D lookup");
        ct.ctype = "array_int_element_2d".to_string();
        ct.args = vec![
            Argument::IntVarRefArray(vec![mapping.row, mapping.col]),
            values,
            result,
            Argument::IntValue(mapping.coefficient),
            Argument::IntValue(mapping.offset),
        ];
        true
    }

    /// `result = index + offset`, posted as an equality the target rules
    /// understand.
    fn rewrite_contiguous_run(
        &mut self,
        model: &mut Model,
        id: CstrId,
        index: VarId,
        result: &Argument,
        offset: i64,
    ) -> bool {
        match (result.var(), result.value(model)) {
            (Some(r), _) if r == index => {
                if offset != 0 {
                    self.fail();
                }
                model.deactivate(id);
                true
            }
            (Some(r), None) => {
                let ct = model.constraint_mut(id);
                if offset == 0 {
                    ct.ctype = "int_eq".to_string();
                    ct.args = vec![Argument::IntVarRef(index), Argument::IntVarRef(r)];
                } else {
                    // -result + index = -offset keeps the defining shape
                    // when the result is the target.
                    ct.ctype = "int_lin_eq".to_string();
                    ct.args = vec![
                        Argument::IntList(vec![-1, 1]),
                        Argument::IntVarRefArray(vec![r, index]),
                        Argument::IntValue(-offset),
                    ];
                }
                true
            }
            (_, Some(v)) => {
                self.release_target_outside_result(model, id, result);
                let ct = model.constraint_mut(id);
                ct.ctype = "int_eq".to_string();
                ct.args = vec![Argument::IntVarRef(index), Argument::IntValue(v - offset)];
                true
            }
            _ => false,
        }
    }

    /// Element rewrites drop the index from the argument list; a target
    /// pointing anywhere but the result must be released first.
    fn release_target_outside_result(&mut self, model: &mut Model, id: CstrId, result: &Argument) {
        if let Some(target) = model.constraint(id).target_variable {
            if result.var() != Some(target) {
                model.remove_target(id);
            }
        }
    }
}

/// The domain constraining an element result: the variable's domain or the
/// literal's singleton.
fn argument_domain(model: &Model, arg: &Argument) -> Option<Domain> {
    match arg {
        Argument::IntVarRef(v) => Some(model.var(*v).domain.clone()),
        Argument::IntValue(v) => Some(Domain::singleton(*v)),
        _ => None,
    }
}
