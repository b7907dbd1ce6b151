//! Back-end contract and the extraction adapter.
//!
//! The pipeline hands constraints to any solver implementing [`Backend`].
//! The adapter owns the mapping from IR variables to back-end expressions:
//! independent variables are created eagerly, defined variables are created
//! through their defining constraint (which may yield an expression wider
//! than the declared domain, hence the deferred domain posting at the end).

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::domain::Domain;
use crate::error::{FznError, FznResult};
use crate::model::{Argument, CstrId, Model, VarId};

/// One argument as a back-end sees it.
#[derive(Debug, Clone)]
pub enum BackendArg<E> {
    Expr(E),
    /// Mixed array; elements are `Expr`, `Value`, or `Target`.
    Array(Vec<BackendArg<E>>),
    Value(i64),
    ValueArray(Vec<i64>),
    Interval(i64, i64),
    /// The slot being defined, in [`Backend::define`] calls only.
    Target,
}

/// A constraint ready for the back-end.
#[derive(Debug, Clone)]
pub struct PostedConstraint<E> {
    pub name: String,
    pub args: Vec<BackendArg<E>>,
    pub strong_propagation: bool,
}

/// The operation set an external solver exposes to this front-end.
pub trait Backend {
    type Expr: Clone;

    fn interval_var(&mut self, name: &str, lo: i64, hi: i64) -> Self::Expr;
    fn enumerated_var(&mut self, name: &str, values: &[i64]) -> Self::Expr;
    fn constant(&mut self, value: i64) -> Self::Expr;

    /// Posts a constraint; refusing a signature is fatal.
    fn post(&mut self, constraint: PostedConstraint<Self::Expr>) -> FznResult<()>;

    /// Posts a defining constraint and returns the expression standing for
    /// the `Target` slot. The expression may admit more values than the
    /// target's declared domain.
    fn define(
        &mut self,
        target_name: &str,
        constraint: PostedConstraint<Self::Expr>,
    ) -> FznResult<Self::Expr>;

    /// Shrinks an expression's range in place.
    fn set_range(&mut self, expr: &Self::Expr, lo: i64, hi: i64) -> FznResult<()>;
    /// Posts a range constraint on an expression.
    fn between(&mut self, expr: &Self::Expr, lo: i64, hi: i64) -> FznResult<()>;
    /// Posts a membership constraint on an expression.
    fn member(&mut self, expr: &Self::Expr, values: &[i64]) -> FznResult<()>;
}

/// Drives a [`Backend`] over a scheduled model.
pub struct Extractor<'m, B: Backend> {
    model: &'m Model,
    exprs: HashMap<VarId, B::Expr>,
    /// Sorted variable vectors of already-posted all-different constraints.
    alldiff_registry: HashSet<Vec<VarId>>,
}

impl<'m, B: Backend> Extractor<'m, B> {
    /// Extracts the whole model in `order` and returns the variable-to-
    /// expression map for solution readback.
    pub fn extract(
        model: &'m Model,
        backend: &mut B,
        order: &[CstrId],
    ) -> FznResult<HashMap<VarId, B::Expr>> {
        let mut extractor = Extractor {
            model,
            exprs: HashMap::new(),
            alldiff_registry: HashSet::new(),
        };

        // Independent variables exist before any constraint; a variable
        // fixed by presolve becomes a constant, not a search variable.
        for (index, var) in model.variables.iter().enumerate() {
            if !var.active || var.defining_constraint.is_some() {
                continue;
            }
            let expr = match var.domain.value() {
                Some(v) => backend.constant(v),
                None => match &var.domain {
                    Domain::All => backend.interval_var(&var.name, i64::MIN, i64::MAX),
                    Domain::Interval { lo, hi } => backend.interval_var(&var.name, *lo, *hi),
                    Domain::Values(values) => backend.enumerated_var(&var.name, values),
                },
            };
            extractor.exprs.insert(VarId(index), expr);
        }

        for &id in order {
            extractor.extract_constraint(backend, id)?;
        }

        // The defining operation may have returned wider expressions; the
        // declared domains still bind.
        for (index, var) in model.variables.iter().enumerate() {
            if !var.active || var.defining_constraint.is_none() {
                continue;
            }
            let Some(expr) = extractor.exprs.get(&VarId(index)) else {
                continue;
            };
            match &var.domain {
                Domain::All => {}
                Domain::Interval { lo, hi } => backend.between(expr, *lo, *hi)?,
                Domain::Values(values) => backend.member(expr, values)?,
            }
        }

        debug!(
            "extracted {} constraints over {} expressions",
            order.len(),
            extractor.exprs.len()
        );
        Ok(extractor.exprs)
    }

    fn extract_constraint(&mut self, backend: &mut B, id: CstrId) -> FznResult<()> {
        let ct = self.model.constraint(id);

        if ct.ctype == "all_different_int" {
            if let Some(Argument::IntVarRefArray(vars)) = ct.args.first() {
                let mut key = vars.clone();
                key.sort_unstable();
                if !self.alldiff_registry.insert(key) {
                    trace!("skipping all_different over an already-covered vector");
                    return Ok(());
                }
            }
        }

        let target = ct.target_variable;
        let mut args = Vec::with_capacity(ct.args.len());
        for arg in &ct.args {
            args.push(self.backend_arg(backend, arg, target)?);
        }
        let posted = PostedConstraint {
            name: ct.ctype.clone(),
            args,
            strong_propagation: ct.strong_propagation,
        };

        match target {
            Some(var) => {
                let expr = backend.define(&self.model.var(var).name, posted)?;
                self.exprs.insert(var, expr);
            }
            None => backend.post(posted)?,
        }
        Ok(())
    }

    fn backend_arg(
        &mut self,
        backend: &mut B,
        arg: &Argument,
        target: Option<VarId>,
    ) -> FznResult<BackendArg<B::Expr>> {
        Ok(match arg {
            Argument::IntValue(v) => BackendArg::Value(*v),
            Argument::IntInterval(lo, hi) => BackendArg::Interval(*lo, *hi),
            Argument::IntList(values) => BackendArg::ValueArray(values.clone()),
            Argument::IntVarRef(v) if Some(*v) == target => BackendArg::Target,
            Argument::IntVarRef(v) => BackendArg::Expr(self.expression(backend, *v)?),
            Argument::IntVarRefArray(vars) => {
                let mut elements = Vec::with_capacity(vars.len());
                for &v in vars {
                    elements.push(if Some(v) == target {
                        BackendArg::Target
                    } else {
                        BackendArg::Expr(self.expression(backend, v)?)
                    });
                }
                BackendArg::Array(elements)
            }
            Argument::Void => {
                return Err(FznError::backend(
                    "constraint carries an unsupported (void) argument",
                ));
            }
        })
    }

    /// The expression for a variable; a fixed variable degrades to a
    /// constant even when it was never created eagerly.
    fn expression(&mut self, backend: &mut B, var: VarId) -> FznResult<B::Expr> {
        if let Some(expr) = self.exprs.get(&var) {
            return Ok(expr.clone());
        }
        if let Some(v) = self.model.var(var).domain.value() {
            let expr = backend.constant(v);
            self.exprs.insert(var, expr.clone());
            return Ok(expr);
        }
        Err(FznError::inconsistent(format!(
            "variable '{}' is consumed before it is defined",
            self.model.var(var).name
        )))
    }
}
