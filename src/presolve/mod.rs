//! Rule-driven presolve engine.
//!
//! The driver runs three phases: a first-pass scan that fills the
//! difference map and the decision-variable set, a `bool2int` burn-down, and
//! a general fix-point over the whole rule set. Variable aliases recorded by
//! rules are never applied mid-pass: the driver breaks out, runs the
//! substitutor at the phase boundary, and resumes, so no rule ever observes
//! a partially substituted model.
//!
//! Every rule is monotone: it narrows a domain, deactivates a constraint,
//! shrinks an argument array, or sets a one-shot flag. A full pass with no
//! change terminates the loop.

mod arithmetic;
mod boolean;
mod element;
mod equality;
mod linear;
mod reified;
mod substitute;

pub use substitute::substitute;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{debug, trace};

use crate::alias::AliasTable;
use crate::domain::Domain;
use crate::error::FznResult;
use crate::model::{Argument, CstrId, Model, VarId};

/// What a presolve run did.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresolveReport {
    pub rewrites: usize,
    pub infeasible: bool,
    pub timed_out: bool,
}

/// `target = coefficient * var + offset`, recorded from a defining linear
/// equality.
#[derive(Debug, Clone, Copy)]
pub struct AffineMapping {
    pub var: VarId,
    pub coefficient: i64,
    pub offset: i64,
}

/// `target = coefficient * row + col + offset`, the index form produced by
/// flattening a 2D array lookup.
#[derive(Debug, Clone, Copy)]
pub struct Flatten2dMapping {
    pub row: VarId,
    pub col: VarId,
    pub coefficient: i64,
    pub offset: i64,
}

/// Comparison operators shared by the inequality and reification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cmp {
    Le,
    Lt,
    Ge,
    Gt,
}

impl Cmp {
    pub(crate) fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Cmp::Le => left <= right,
            Cmp::Lt => left < right,
            Cmp::Ge => left >= right,
            Cmp::Gt => left > right,
        }
    }
}

pub struct Presolver {
    deadline: Option<Instant>,
    aliases: AliasTable,
    /// `x -> (p, q)` meaning `x = p - q`, from the first-pass scan.
    difference_map: HashMap<VarId, (VarId, VarId)>,
    /// `y -> x` meaning `y = |x|`.
    abs_map: HashMap<VarId, VarId>,
    affine_map: HashMap<VarId, AffineMapping>,
    flatten2d_map: HashMap<VarId, Flatten2dMapping>,
    /// Variables mentioned anywhere in the search annotations.
    decision_vars: HashSet<VarId>,
    infeasible: bool,
}

impl Presolver {
    pub fn new(deadline: Option<Instant>) -> Self {
        Presolver {
            deadline,
            aliases: AliasTable::default(),
            difference_map: HashMap::new(),
            abs_map: HashMap::new(),
            affine_map: HashMap::new(),
            flatten2d_map: HashMap::new(),
            decision_vars: HashSet::new(),
            infeasible: false,
        }
    }

    pub fn decision_variables(&self) -> &HashSet<VarId> {
        &self.decision_vars
    }

    /// Runs presolve to a fix-point over `model`.
    pub fn run(&mut self, model: &mut Model) -> FznResult<PresolveReport> {
        self.first_pass_scan(model);

        let mut rewrites = 0;
        for id in model.active_constraint_ids() {
            if model.constraint(id).active && model.constraint(id).ctype == "bool2int" {
                rewrites += usize::from(self.presolve_bool2int(model, id));
            }
        }
        if !self.aliases.is_empty() {
            substitute(model, &mut self.aliases);
            self.aliases.clear();
        }

        let mut timed_out = false;
        let mut passes = 0usize;
        while !self.infeasible {
            if self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
            {
                timed_out = true;
                break;
            }
            passes += 1;
            let mut pass_rewrites = 0;
            for id in model.active_constraint_ids() {
                if !model.constraint(id).active {
                    continue;
                }
                pass_rewrites += usize::from(self.presolve_one(model, id)?);
                if self.infeasible || !self.aliases.is_empty() {
                    break;
                }
            }
            rewrites += pass_rewrites;
            if !self.aliases.is_empty() {
                substitute(model, &mut self.aliases);
                self.aliases.clear();
                continue;
            }
            if pass_rewrites == 0 {
                break;
            }
        }

        debug!(
            "presolve: {} rewrites over {} passes{}",
            rewrites,
            passes,
            if timed_out { " (deadline hit)" } else { "" }
        );
        debug_assert!(model.check_consistency().is_ok());

        let infeasible = self.infeasible
            || model
                .variables
                .iter()
                .any(|v| v.active && v.domain.is_empty());
        Ok(PresolveReport {
            rewrites,
            infeasible,
            timed_out,
        })
    }

    /// Fills the difference map from `x - y + z = 0` shapes and collects the
    /// decision variables named by the search annotations.
    fn first_pass_scan(&mut self, model: &Model) {
        for id in model.active_constraint_ids() {
            let ct = model.constraint(id);
            if ct.ctype != "int_lin_eq" || ct.args.len() != 3 {
                continue;
            }
            let (Some(coeffs), Some(vars)) = (int_list(&ct.args[0]), var_array(&ct.args[1]))
            else {
                continue;
            };
            if ct.args[2] != Argument::IntValue(0) || vars.len() != 3 {
                continue;
            }
            if coeffs == [1, -1, 1] || coeffs == [-1, 1, -1] {
                let (x, y, z) = (vars[0], vars[1], vars[2]);
                // x - y + z = 0: both x and z are differences over the
                // remaining pair.
                self.difference_map.entry(x).or_insert((y, z));
                self.difference_map.entry(z).or_insert((y, x));
            }
        }
        let mut mentioned = Vec::new();
        for ann in &model.search_annotations {
            ann.collect_variables(&mut mentioned);
        }
        self.decision_vars.extend(mentioned);
        trace!(
            "first pass: {} difference entries, {} decision variables",
            self.difference_map.len(),
            self.decision_vars.len()
        );
    }

    /// Applies rules to one constraint, re-dispatching while rules rename
    /// its type (rules may chain within one visit).
    fn presolve_one(&mut self, model: &mut Model, id: CstrId) -> FznResult<bool> {
        let mut changed = false;
        loop {
            if !model.constraint(id).active {
                break;
            }
            let type_before = model.constraint(id).ctype.clone();
            let step = self.dispatch(model, id)?;
            changed |= step;
            if !step || self.infeasible || model.constraint(id).ctype == type_before {
                break;
            }
        }
        Ok(changed)
    }

    fn dispatch(&mut self, model: &mut Model, id: CstrId) -> FznResult<bool> {
        if model.constraint(id).ctype.ends_with("_reif") && self.unwrap_reified(model, id) {
            return Ok(true);
        }
        let ctype = model.constraint(id).ctype.clone();
        let changed = match ctype.as_str() {
            "bool2int" => self.presolve_bool2int(model, id),
            "int_eq" | "bool_eq" => self.presolve_eq(model, id),
            "int_ne" | "bool_not" | "bool_xor" if model.constraint(id).args.len() == 2 => {
                self.presolve_ne(model, id)
            }
            "int_le" | "bool_le" => self.presolve_cmp(model, id, Cmp::Le),
            "int_lt" | "bool_lt" => self.presolve_cmp(model, id, Cmp::Lt),
            "int_ge" | "bool_ge" => self.presolve_cmp(model, id, Cmp::Ge),
            "int_gt" | "bool_gt" => self.presolve_cmp(model, id, Cmp::Gt),
            "set_in" => self.presolve_set_in(model, id),
            "set_not_in" => self.presolve_set_not_in(model, id),
            "int_times" => self.presolve_int_times(model, id),
            "int_div" => self.presolve_int_div(model, id),
            "int_mod" => self.presolve_int_mod(model, id),
            "int_abs" => self.presolve_int_abs(model, id),
            "array_bool_or" => self.presolve_array_bool(model, id, boolean::BoolOp::Or),
            "array_bool_and" => self.presolve_array_bool(model, id, boolean::BoolOp::And),
            "bool_eq_reif" | "bool_ne_reif" => self.presolve_bool_cmp_reif(model, id),
            "int_eq_reif" | "int_ne_reif" | "int_le_reif" | "int_lt_reif" | "int_ge_reif"
            | "int_gt_reif" => self.presolve_int_cmp_reif(model, id),
            "int_lin_lt" | "int_lin_gt" => self.canonicalize_strict_linear(model, id),
            "int_lin_eq" | "int_lin_le" | "int_lin_ge" | "int_lin_ne" => {
                self.presolve_linear(model, id)?
            }
            "int_lin_eq_reif" => self.presolve_lin_eq_reif(model, id),
            "array_int_element" => self.presolve_array_int_element(model, id)?,
            "array_var_int_element" => self.presolve_array_var_int_element(model, id)?,
            _ => false,
        };
        Ok(changed)
    }

    // Narrowing helpers. Each returns whether the domain changed and flags
    // infeasibility when a domain empties.

    pub(crate) fn narrow_interval(
        &mut self,
        model: &mut Model,
        var: VarId,
        lo: i64,
        hi: i64,
    ) -> bool {
        let domain = &mut model.var_mut(var).domain;
        let changed = domain.intersect_with_interval(lo, hi);
        if domain.is_empty() {
            self.infeasible = true;
        }
        changed
    }

    pub(crate) fn narrow_domain(&mut self, model: &mut Model, var: VarId, with: &Domain) -> bool {
        let domain = &mut model.var_mut(var).domain;
        let changed = domain.intersect_with_domain(with);
        if domain.is_empty() {
            self.infeasible = true;
        }
        changed
    }

    pub(crate) fn remove_value(&mut self, model: &mut Model, var: VarId, value: i64) -> bool {
        let domain = &mut model.var_mut(var).domain;
        let removed = domain.remove_value(value);
        if domain.is_empty() {
            self.infeasible = true;
        }
        removed
    }

    /// Records provable unsatisfiability.
    pub(crate) fn fail(&mut self) -> bool {
        self.infeasible = true;
        true
    }

    pub(crate) fn record_alias(&mut self, model: &mut Model, a: VarId, b: VarId) -> bool {
        self.aliases.try_unify(model, a, b)
    }
}

/// The value list of an `IntList` argument.
pub(crate) fn int_list(arg: &Argument) -> Option<&[i64]> {
    match arg {
        Argument::IntList(values) => Some(values),
        _ => None,
    }
}

/// The variable vector of an `IntVarRefArray` argument.
pub(crate) fn var_array(arg: &Argument) -> Option<&[VarId]> {
    match arg {
        Argument::IntVarRefArray(vars) => Some(vars),
        _ => None,
    }
}

/// The set argument of `set_in`-style constraints, as a domain.
pub(crate) fn set_argument(arg: &Argument) -> Option<Domain> {
    match arg {
        Argument::IntInterval(lo, hi) => Some(Domain::interval(*lo, *hi)),
        Argument::IntList(values) => Some(Domain::values(values.to_vec())),
        Argument::IntValue(v) => Some(Domain::singleton(*v)),
        _ => None,
    }
}
