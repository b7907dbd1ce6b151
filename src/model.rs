//! Typed in-memory representation of a FlatZinc model.
//!
//! Variables and constraints live in insertion-ordered arenas on [`Model`];
//! everything else points at them through [`VarId`] / [`CstrId`] handles, so
//! the variable/defining-constraint back-pointers never form ownership
//! cycles. The bijection between a constraint's target variable and the
//! variable's defining constraint is maintained exclusively by
//! [`Model::set_target`] and [`Model::remove_target`].

use crate::domain::Domain;
use crate::error::{FznError, FznResult};

/// Handle of a variable in [`Model::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Handle of a constraint in [`Model::constraints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CstrId(pub usize);

/// An integer decision variable.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub domain: Domain,
    /// The constraint whose value functionally determines this variable,
    /// if any. Mirrors [`Constraint::target_variable`].
    pub defining_constraint: Option<CstrId>,
    /// True for variables synthesized during MiniZinc flattening.
    pub temporary: bool,
    /// Cleared when presolve eliminates the variable by substitution.
    pub active: bool,
}

impl Variable {
    pub fn min(&self) -> i64 {
        self.domain.min()
    }

    pub fn max(&self) -> i64 {
        self.domain.max()
    }

    pub fn is_all_int(&self) -> bool {
        self.domain.is_all()
    }

    pub fn is_boolean(&self) -> bool {
        self.domain.is_boolean()
    }

    pub fn has_one_value(&self) -> bool {
        self.domain.has_one_value()
    }
}

/// One slot in a constraint or annotation argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    IntValue(i64),
    IntInterval(i64, i64),
    /// Sorted for domain literals; verbatim order for constant arrays.
    IntList(Vec<i64>),
    IntVarRef(VarId),
    IntVarRefArray(Vec<VarId>),
    /// Float, string, or otherwise unsupported payload; carried but ignored.
    Void,
}

impl Argument {
    /// True for a literal value or a variable whose domain is a singleton.
    pub fn has_one_value(&self, model: &Model) -> bool {
        match self {
            Argument::IntValue(_) => true,
            Argument::IntVarRef(v) => model.var(*v).has_one_value(),
            _ => false,
        }
    }

    /// The single value, when [`Argument::has_one_value`] holds.
    pub fn value(&self, model: &Model) -> Option<i64> {
        match self {
            Argument::IntValue(v) => Some(*v),
            Argument::IntVarRef(v) => model.var(*v).domain.value(),
            _ => None,
        }
    }

    pub fn var(&self) -> Option<VarId> {
        match self {
            Argument::IntVarRef(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Argument::IntVarRef(_))
    }

    /// The variables referenced by this argument, appended to `out`.
    pub fn collect_variables(&self, out: &mut Vec<VarId>) {
        match self {
            Argument::IntVarRef(v) => out.push(*v),
            Argument::IntVarRefArray(vars) => out.extend_from_slice(vars),
            _ => {}
        }
    }
}

/// A constraint over integer variables, identified by its FlatZinc type
/// name. Presolve mutates constraints freely: arguments are swapped, types
/// renamed, and tautologies deactivated rather than deleted.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub ctype: String,
    pub args: Vec<Argument>,
    /// Request for domain-consistent propagation (`::domain` annotation).
    pub strong_propagation: bool,
    /// Mirrors [`Variable::defining_constraint`].
    pub target_variable: Option<VarId>,
    pub active: bool,
    /// One-shot guard for presolve rules that narrow domains while leaving
    /// the constraint active.
    pub presolve_propagation_done: bool,
}

impl Constraint {
    /// All variables referenced in the argument vector, in order.
    pub fn referenced_variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        for arg in &self.args {
            arg.collect_variables(&mut out);
        }
        out
    }
}

/// Solver-configuration directive attached to a constraint, a variable, or
/// the solve item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    List(Vec<Annotation>),
    Identifier(String),
    Call(String, Vec<Annotation>),
    Interval(i64, i64),
    VarRef(VarId),
    VarRefArray(Vec<VarId>),
}

impl Annotation {
    /// All variables referenced anywhere in the annotation tree.
    pub fn collect_variables(&self, out: &mut Vec<VarId>) {
        match self {
            Annotation::List(items) | Annotation::Call(_, items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Annotation::VarRef(v) => out.push(*v),
            Annotation::VarRefArray(vars) => out.extend_from_slice(vars),
            Annotation::Identifier(_) | Annotation::Interval(..) => {}
        }
    }

    /// Rewrites every variable reference through `map`.
    pub fn rewrite_variables(&mut self, map: &mut impl FnMut(VarId) -> VarId) {
        match self {
            Annotation::List(items) | Annotation::Call(_, items) => {
                for item in items {
                    item.rewrite_variables(map);
                }
            }
            Annotation::VarRef(v) => *v = map(*v),
            Annotation::VarRefArray(vars) => {
                for v in vars {
                    *v = map(*v);
                }
            }
            Annotation::Identifier(_) | Annotation::Interval(..) => {}
        }
    }
}

/// A `output_var` or `output_array` item. Scalars have no dimension bounds
/// and exactly one variable; arrays carry one closed bound per dimension and
/// their variables flattened in row-major order.
#[derive(Debug, Clone)]
pub struct OutputItem {
    pub name: String,
    pub bounds: Vec<(i64, i64)>,
    pub variables: Vec<VarId>,
    /// Print values as `true`/`false` rather than integers.
    pub as_bool: bool,
}

/// Optimization direction of the solve item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Satisfy,
    Minimize,
    Maximize,
}

/// The whole model: arenas plus the solve item.
#[derive(Debug, Default)]
pub struct Model {
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub output_items: Vec<OutputItem>,
    pub search_annotations: Vec<Annotation>,
    pub objective: Option<VarId>,
    pub maximize: bool,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn goal(&self) -> Goal {
        match self.objective {
            None => Goal::Satisfy,
            Some(_) if self.maximize => Goal::Maximize,
            Some(_) => Goal::Minimize,
        }
    }

    pub fn new_variable(
        &mut self,
        name: impl Into<String>,
        domain: Domain,
        temporary: bool,
    ) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            domain,
            defining_constraint: None,
            temporary,
            active: true,
        });
        id
    }

    pub fn new_constraint(&mut self, ctype: impl Into<String>, args: Vec<Argument>) -> CstrId {
        let id = CstrId(self.constraints.len());
        self.constraints.push(Constraint {
            ctype: ctype.into(),
            args,
            strong_propagation: false,
            target_variable: None,
            active: true,
            presolve_propagation_done: false,
        });
        id
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub fn constraint(&self, id: CstrId) -> &Constraint {
        &self.constraints[id.0]
    }

    pub fn constraint_mut(&mut self, id: CstrId) -> &mut Constraint {
        &mut self.constraints[id.0]
    }

    pub fn active_constraint_ids(&self) -> Vec<CstrId> {
        (0..self.constraints.len())
            .map(CstrId)
            .filter(|id| self.constraints[id.0].active)
            .collect()
    }

    /// Declares `var` to be defined by `constraint`, wiring both sides of
    /// the bijection. Fails if either side is already claimed elsewhere.
    pub fn set_target(&mut self, constraint: CstrId, var: VarId) -> FznResult<()> {
        if let Some(existing) = self.variables[var.0].defining_constraint {
            if existing != constraint {
                return Err(FznError::inconsistent(format!(
                    "variable '{}' is already defined by another constraint",
                    self.variables[var.0].name
                )));
            }
        }
        if let Some(old) = self.constraints[constraint.0].target_variable {
            if old != var {
                self.variables[old.0].defining_constraint = None;
            }
        }
        self.constraints[constraint.0].target_variable = Some(var);
        self.variables[var.0].defining_constraint = Some(constraint);
        Ok(())
    }

    /// Clears both sides of the target bijection atomically.
    pub fn remove_target(&mut self, constraint: CstrId) {
        if let Some(var) = self.constraints[constraint.0].target_variable.take() {
            if self.variables[var.0].defining_constraint == Some(constraint) {
                self.variables[var.0].defining_constraint = None;
            }
        }
    }

    /// Marks a constraint inactive, releasing its target variable.
    pub fn deactivate(&mut self, constraint: CstrId) {
        self.remove_target(constraint);
        self.constraints[constraint.0].active = false;
    }

    /// Debug-time structural check: target/defining bijection, domain
    /// invariants, single occurrence of a target in its own arguments.
    pub fn check_consistency(&self) -> FznResult<()> {
        for (i, ct) in self.constraints.iter().enumerate() {
            if !ct.active {
                continue;
            }
            if let Some(v) = ct.target_variable {
                if self.variables[v.0].defining_constraint != Some(CstrId(i)) {
                    return Err(FznError::inconsistent(format!(
                        "constraint '{}' targets '{}' which does not point back",
                        ct.ctype, self.variables[v.0].name
                    )));
                }
                let occurrences = ct
                    .referenced_variables()
                    .iter()
                    .filter(|&&r| r == v)
                    .count();
                if occurrences > 1 {
                    return Err(FznError::inconsistent(format!(
                        "target '{}' occurs {} times in '{}'",
                        self.variables[v.0].name, occurrences, ct.ctype
                    )));
                }
            }
        }
        for var in &self.variables {
            if let Domain::Values(values) = &var.domain {
                if values.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(FznError::inconsistent(format!(
                        "domain of '{}' is not strictly increasing",
                        var.name
                    )));
                }
            }
            if let Domain::Interval { lo, hi } = var.domain {
                if lo > hi {
                    return Err(FznError::inconsistent(format!(
                        "domain of '{}' has inverted bounds",
                        var.name
                    )));
                }
            }
        }
        Ok(())
    }
}
