//! Reference back-end.
//!
//! A deliberately small finite-domain solver behind the [`Backend`] trait:
//! depth-first search assigning variables in a given order, checking each
//! constraint as soon as its variables are assigned, with branch-and-bound
//! for optimization and cooperative deadline polling. It exists so the CLI
//! and the end-to-end tests run without an external solver; production
//! deployments bind their own `Backend`.

use std::time::Instant;

use log::warn;

use crate::backend::{Backend, BackendArg, PostedConstraint};
use crate::domain::Domain;
use crate::error::{FznError, FznResult};

/// Default clamp for variables the model leaves unbounded, mirroring the
/// bound inference the front-end's models usually allow.
const DEFAULT_BOUND: i64 = 1_000_000;

/// Deadline polling interval, in search nodes.
const NODE_POLL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExpr {
    Var(usize),
    Const(i64),
}

#[derive(Debug)]
struct EngineVar {
    name: String,
    domain: Domain,
}

#[derive(Debug, Clone, Copy)]
pub enum EngineGoal {
    Satisfy { limit: usize },
    Minimize(EngineExpr),
    Maximize(EngineExpr),
}

#[derive(Debug, Default)]
pub struct SearchResult {
    /// Value per engine variable, one entry per recorded solution. Under
    /// optimization, successive entries improve; the last one is best.
    pub solutions: Vec<Vec<i64>>,
    /// The search space was exhausted (optimality or full enumeration).
    pub complete: bool,
    pub timed_out: bool,
}

#[derive(Debug, Default)]
pub struct Engine {
    vars: Vec<EngineVar>,
    constraints: Vec<PostedConstraint<EngineExpr>>,
    infeasible: bool,
    pub deadline: Option<Instant>,
}

impl Engine {
    pub fn new(deadline: Option<Instant>) -> Self {
        Engine {
            deadline,
            ..Engine::default()
        }
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    fn push_var(&mut self, name: &str, domain: Domain) -> EngineExpr {
        self.vars.push(EngineVar {
            name: name.to_string(),
            domain,
        });
        EngineExpr::Var(self.vars.len() - 1)
    }

    fn restrict(&mut self, expr: &EngineExpr, with: &Domain) {
        match expr {
            EngineExpr::Var(index) => {
                let domain = &mut self.vars[*index].domain;
                domain.intersect_with_domain(with);
                if domain.is_empty() {
                    self.infeasible = true;
                }
            }
            EngineExpr::Const(v) => {
                if !with.contains(*v) {
                    self.infeasible = true;
                }
            }
        }
    }

    /// Runs the search. `order_hint` lists engine variable indices to
    /// branch on first; the rest follow in creation order.
    pub fn solve(&self, goal: EngineGoal, order_hint: &[usize]) -> SearchResult {
        if self.infeasible {
            return SearchResult {
                complete: true,
                ..SearchResult::default()
            };
        }

        // Branching order: the hint first, then everything else.
        let mut order: Vec<usize> = Vec::with_capacity(self.vars.len());
        let mut seen = vec![false; self.vars.len()];
        for &index in order_hint {
            if index < self.vars.len() && !seen[index] {
                seen[index] = true;
                order.push(index);
            }
        }
        for index in 0..self.vars.len() {
            if !seen[index] {
                order.push(index);
            }
        }

        // Unbounded domains get clamped to inferred bounds before value
        // enumeration.
        let clamp = self.inferred_bound();
        let domains: Vec<Vec<i64>> = self
            .vars
            .iter()
            .map(|var| enumerate_domain(&var.name, &var.domain, clamp))
            .collect();

        // Check a constraint at the deepest of its variables' positions.
        let position_of: Vec<usize> = {
            let mut position = vec![0usize; self.vars.len()];
            for (depth, &index) in order.iter().enumerate() {
                position[index] = depth;
            }
            position
        };
        let mut checks_at: Vec<Vec<usize>> = vec![Vec::new(); order.len() + 1];
        for (ci, constraint) in self.constraints.iter().enumerate() {
            let mut deepest = 0usize;
            let mut any = false;
            for var in constraint_vars(constraint) {
                any = true;
                deepest = deepest.max(position_of[var] + 1);
            }
            if any {
                checks_at[deepest].push(ci);
            } else {
                checks_at[0].push(ci);
            }
        }

        let mut search = Search {
            engine: self,
            order: &order,
            domains: &domains,
            checks_at: &checks_at,
            values: vec![0; self.vars.len()],
            goal,
            best: None,
            result: SearchResult::default(),
            done: false,
            nodes: 0,
        };

        // Constraints with no variables are decided now.
        for &ci in &checks_at[0] {
            if !eval_constraint(&self.constraints[ci], &search.values) {
                search.result.complete = true;
                return search.result;
            }
        }

        search.descend(0);
        let constant_objective_met = matches!(
            goal,
            EngineGoal::Minimize(EngineExpr::Const(_)) | EngineGoal::Maximize(EngineExpr::Const(_))
        ) && !search.result.solutions.is_empty();
        search.result.complete =
            !search.result.timed_out && (!search.done || constant_objective_met);
        search.result
    }

    /// Largest absolute bound any bounded variable declares; used to clamp
    /// the unbounded ones.
    fn inferred_bound(&self) -> i64 {
        let mut bound = 0i64;
        for var in &self.vars {
            let (min, max) = (var.domain.min(), var.domain.max());
            if min != i64::MIN {
                bound = bound.max(min.saturating_abs());
            }
            if max != i64::MAX {
                bound = bound.max(max.saturating_abs());
            }
        }
        if bound == 0 {
            DEFAULT_BOUND
        } else {
            bound.saturating_mul(2).clamp(bound, DEFAULT_BOUND.max(bound))
        }
    }
}

fn enumerate_domain(name: &str, domain: &Domain, clamp: i64) -> Vec<i64> {
    let mut clamped = domain.clone();
    if clamped.min() == i64::MIN || clamped.max() == i64::MAX {
        warn!("clamping unbounded variable '{}' to [{}, {}]", name, -clamp, clamp);
        clamped.intersect_with_interval(-clamp, clamp);
    }
    match clamped {
        Domain::Values(values) => values,
        Domain::Interval { lo, hi } => (lo..=hi).collect(),
        Domain::All => unreachable!("unbounded domain survived clamping"),
    }
}

struct Search<'e> {
    engine: &'e Engine,
    order: &'e [usize],
    domains: &'e [Vec<i64>],
    checks_at: &'e [Vec<usize>],
    values: Vec<i64>,
    goal: EngineGoal,
    best: Option<i64>,
    result: SearchResult,
    /// Stop unwinding: the solution limit was reached or the objective
    /// cannot improve further.
    done: bool,
    nodes: u64,
}

impl Search<'_> {
    fn descend(&mut self, depth: usize) {
        if self.done || self.result.timed_out {
            return;
        }
        if depth == self.order.len() {
            self.record_leaf();
            return;
        }
        let var = self.order[depth];
        for vi in 0..self.domains[var].len() {
            let value = self.domains[var][vi];
            if !self.admissible(var, value) {
                continue;
            }
            self.nodes += 1;
            if self.nodes % NODE_POLL == 0
                && self
                    .engine
                    .deadline
                    .is_some_and(|deadline| Instant::now() >= deadline)
            {
                self.result.timed_out = true;
                return;
            }
            self.values[var] = value;
            let consistent = self.checks_at[depth + 1]
                .iter()
                .all(|&ci| eval_constraint(&self.engine.constraints[ci], &self.values));
            if consistent {
                self.descend(depth + 1);
                if self.done || self.result.timed_out {
                    return;
                }
            }
        }
    }

    /// Objective-aware value filtering: under branch-and-bound only strict
    /// improvements over the incumbent are worth exploring.
    fn admissible(&self, var: usize, value: i64) -> bool {
        let Some(best) = self.best else {
            return true;
        };
        match self.goal {
            EngineGoal::Minimize(EngineExpr::Var(objective)) if objective == var => value < best,
            EngineGoal::Maximize(EngineExpr::Var(objective)) if objective == var => value > best,
            _ => true,
        }
    }

    /// A full assignment passed every check.
    fn record_leaf(&mut self) {
        match self.goal {
            EngineGoal::Satisfy { limit } => {
                self.result.solutions.push(self.values.clone());
                if self.result.solutions.len() >= limit {
                    self.done = true;
                }
            }
            EngineGoal::Minimize(expr) | EngineGoal::Maximize(expr) => {
                let objective = match expr {
                    EngineExpr::Var(index) => self.values[index],
                    EngineExpr::Const(v) => v,
                };
                let improved = match (self.best, self.goal) {
                    (None, _) => true,
                    (Some(best), EngineGoal::Minimize(_)) => objective < best,
                    (Some(best), EngineGoal::Maximize(_)) => objective > best,
                    (Some(_), EngineGoal::Satisfy { .. }) => unreachable!(),
                };
                if improved {
                    self.best = Some(objective);
                    self.result.solutions.push(self.values.clone());
                }
                // A constant objective is optimal at the first solution.
                if matches!(expr, EngineExpr::Const(_)) {
                    self.done = true;
                }
            }
        }
    }
}

/// Engine variable indices mentioned by a constraint.
fn constraint_vars(constraint: &PostedConstraint<EngineExpr>) -> Vec<usize> {
    fn walk(arg: &BackendArg<EngineExpr>, out: &mut Vec<usize>) {
        match arg {
            BackendArg::Expr(EngineExpr::Var(index)) => out.push(*index),
            BackendArg::Array(elements) => {
                for element in elements {
                    walk(element, out);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    for arg in &constraint.args {
        walk(arg, &mut out);
    }
    out
}

const SUPPORTED: &[&str] = &[
    "int_eq",
    "int_ne",
    "int_le",
    "int_lt",
    "int_ge",
    "int_gt",
    "bool_eq",
    "bool_not",
    "bool_le",
    "bool_lt",
    "bool_ge",
    "bool_gt",
    "bool_xor",
    "bool2int",
    "bool_clause",
    "array_bool_or",
    "array_bool_and",
    "int_lin_eq",
    "int_lin_ne",
    "int_lin_le",
    "int_lin_ge",
    "int_lin_lt",
    "int_lin_gt",
    "int_abs",
    "int_plus",
    "int_minus",
    "int_times",
    "int_div",
    "int_mod",
    "int_min",
    "int_max",
    "minimum_int",
    "maximum_int",
    "array_int_minimum",
    "array_int_maximum",
    "array_int_element",
    "array_var_int_element",
    "array_bool_element",
    "array_var_bool_element",
    "array_int_element_2d",
    "all_different_int",
    "set_in",
    "set_not_in",
    "count_eq",
    "count",
    "table_int",
    "cumulative",
];

fn is_supported(name: &str) -> bool {
    if SUPPORTED.contains(&name) {
        return true;
    }
    name.strip_suffix("_reif")
        .is_some_and(|base| SUPPORTED.contains(&base))
}

impl Backend for Engine {
    type Expr = EngineExpr;

    fn interval_var(&mut self, name: &str, lo: i64, hi: i64) -> EngineExpr {
        self.push_var(name, Domain::interval(lo, hi))
    }

    fn enumerated_var(&mut self, name: &str, values: &[i64]) -> EngineExpr {
        self.push_var(name, Domain::values(values.to_vec()))
    }

    fn constant(&mut self, value: i64) -> EngineExpr {
        EngineExpr::Const(value)
    }

    fn post(&mut self, constraint: PostedConstraint<EngineExpr>) -> FznResult<()> {
        if !is_supported(&constraint.name) {
            return Err(FznError::backend(format!(
                "unknown constraint '{}'",
                constraint.name
            )));
        }
        self.constraints.push(constraint);
        Ok(())
    }

    fn define(
        &mut self,
        target_name: &str,
        constraint: PostedConstraint<EngineExpr>,
    ) -> FznResult<EngineExpr> {
        // The defining expression is a fresh variable; its declared domain
        // arrives afterwards through `between`/`member`.
        let expr = self.push_var(target_name, Domain::all());
        let mut grounded = constraint;
        for arg in &mut grounded.args {
            substitute_target(arg, expr);
        }
        self.post(grounded)?;
        Ok(expr)
    }

    fn set_range(&mut self, expr: &EngineExpr, lo: i64, hi: i64) -> FznResult<()> {
        self.restrict(expr, &Domain::interval(lo, hi));
        Ok(())
    }

    fn between(&mut self, expr: &EngineExpr, lo: i64, hi: i64) -> FznResult<()> {
        self.restrict(expr, &Domain::interval(lo, hi));
        Ok(())
    }

    fn member(&mut self, expr: &EngineExpr, values: &[i64]) -> FznResult<()> {
        self.restrict(expr, &Domain::values(values.to_vec()));
        Ok(())
    }
}

fn substitute_target(arg: &mut BackendArg<EngineExpr>, expr: EngineExpr) {
    match arg {
        BackendArg::Target => *arg = BackendArg::Expr(expr),
        BackendArg::Array(elements) => {
            for element in elements {
                substitute_target(element, expr);
            }
        }
        _ => {}
    }
}

// Constraint evaluation over a full assignment.

fn scalar(arg: &BackendArg<EngineExpr>, values: &[i64]) -> Option<i64> {
    match arg {
        BackendArg::Expr(EngineExpr::Var(index)) => Some(values[*index]),
        BackendArg::Expr(EngineExpr::Const(v)) | BackendArg::Value(v) => Some(*v),
        _ => None,
    }
}

fn array(arg: &BackendArg<EngineExpr>, values: &[i64]) -> Option<Vec<i64>> {
    match arg {
        BackendArg::Array(elements) => elements.iter().map(|e| scalar(e, values)).collect(),
        BackendArg::ValueArray(list) => Some(list.clone()),
        _ => None,
    }
}

fn in_set(arg: &BackendArg<EngineExpr>, value: i64) -> bool {
    match arg {
        BackendArg::Interval(lo, hi) => *lo <= value && value <= *hi,
        BackendArg::ValueArray(list) => list.contains(&value),
        BackendArg::Value(v) => *v == value,
        _ => false,
    }
}

/// Truth of one constraint under a full assignment.
fn eval_constraint(constraint: &PostedConstraint<EngineExpr>, values: &[i64]) -> bool {
    let name = constraint.name.as_str();
    let args = &constraint.args;

    // Reified forms check the comparison against the boolean tail.
    if let Some(base) = name.strip_suffix("_reif") {
        let Some(reif) = args.last().and_then(|a| scalar(a, values)) else {
            return false;
        };
        let inner = PostedConstraint {
            name: base.to_string(),
            args: args[..args.len() - 1].to_vec(),
            strong_propagation: false,
        };
        return eval_constraint(&inner, values) == (reif != 0);
    }

    let s = |i: usize| args.get(i).and_then(|a| scalar(a, values));
    let a = |i: usize| args.get(i).and_then(|a| array(a, values));

    match name {
        "int_eq" | "bool_eq" | "bool2int" => s(0) == s(1) && s(0).is_some(),
        "int_ne" | "bool_not" => matches!((s(0), s(1)), (Some(x), Some(y)) if x != y),
        "int_le" | "bool_le" => matches!((s(0), s(1)), (Some(x), Some(y)) if x <= y),
        "int_lt" | "bool_lt" => matches!((s(0), s(1)), (Some(x), Some(y)) if x < y),
        "int_ge" | "bool_ge" => matches!((s(0), s(1)), (Some(x), Some(y)) if x >= y),
        "int_gt" | "bool_gt" => matches!((s(0), s(1)), (Some(x), Some(y)) if x > y),
        "bool_xor" => match args.len() {
            2 => matches!((s(0), s(1)), (Some(x), Some(y)) if (x != 0) != (y != 0)),
            _ => matches!(
                (s(0), s(1), s(2)),
                (Some(x), Some(y), Some(r)) if ((x != 0) != (y != 0)) == (r != 0)
            ),
        },
        "bool_clause" => {
            let (Some(pos), Some(neg)) = (a(0), a(1)) else {
                return false;
            };
            pos.iter().any(|&v| v != 0) || neg.iter().any(|&v| v == 0)
        }
        "array_bool_or" => {
            let (Some(bs), Some(r)) = (a(0), s(1)) else {
                return false;
            };
            bs.iter().any(|&v| v != 0) == (r != 0)
        }
        "array_bool_and" => {
            let (Some(bs), Some(r)) = (a(0), s(1)) else {
                return false;
            };
            bs.iter().all(|&v| v != 0) == (r != 0)
        }
        "int_lin_eq" | "int_lin_ne" | "int_lin_le" | "int_lin_ge" | "int_lin_lt"
        | "int_lin_gt" => {
            let (Some(coeffs), Some(xs), Some(rhs)) = (a(0), a(1), s(2)) else {
                return false;
            };
            if coeffs.len() != xs.len() {
                return false;
            }
            let sum: i64 = coeffs
                .iter()
                .zip(&xs)
                .map(|(&c, &x)| c.saturating_mul(x))
                .fold(0i64, |acc, t| acc.saturating_add(t));
            match name {
                "int_lin_eq" => sum == rhs,
                "int_lin_ne" => sum != rhs,
                "int_lin_le" => sum <= rhs,
                "int_lin_ge" => sum >= rhs,
                "int_lin_lt" => sum < rhs,
                _ => sum > rhs,
            }
        }
        "int_abs" => matches!((s(0), s(1)), (Some(x), Some(y)) if x.checked_abs() == Some(y)),
        "int_plus" => {
            matches!((s(0), s(1), s(2)), (Some(x), Some(y), Some(z)) if x.checked_add(y) == Some(z))
        }
        "int_minus" => {
            matches!((s(0), s(1), s(2)), (Some(x), Some(y), Some(z)) if x.checked_sub(y) == Some(z))
        }
        "int_times" => {
            matches!((s(0), s(1), s(2)), (Some(x), Some(y), Some(z)) if x.checked_mul(y) == Some(z))
        }
        "int_div" => matches!(
            (s(0), s(1), s(2)),
            (Some(x), Some(y), Some(z)) if y != 0 && x.checked_div(y) == Some(z)
        ),
        "int_mod" => matches!(
            (s(0), s(1), s(2)),
            (Some(x), Some(y), Some(z)) if y != 0 && x.checked_rem(y) == Some(z)
        ),
        "int_min" => {
            matches!((s(0), s(1), s(2)), (Some(x), Some(y), Some(z)) if x.min(y) == z)
        }
        "int_max" => {
            matches!((s(0), s(1), s(2)), (Some(x), Some(y), Some(z)) if x.max(y) == z)
        }
        "minimum_int" | "array_int_minimum" => {
            let (Some(m), Some(xs)) = (s(0), a(1)) else {
                return false;
            };
            xs.iter().min() == Some(&m)
        }
        "maximum_int" | "array_int_maximum" => {
            let (Some(m), Some(xs)) = (s(0), a(1)) else {
                return false;
            };
            xs.iter().max() == Some(&m)
        }
        "array_int_element" | "array_var_int_element" | "array_bool_element"
        | "array_var_bool_element" => {
            let (Some(index), Some(xs), Some(result)) = (s(0), a(1), s(2)) else {
                return false;
            };
            index >= 1 && (index as usize) <= xs.len() && xs[index as usize - 1] == result
        }
        "array_int_element_2d" => {
            let (Some(indices), Some(xs), Some(result), Some(coef), Some(offset)) =
                (a(0), a(1), s(2), s(3), s(4))
            else {
                return false;
            };
            let [row, col] = indices.as_slice() else {
                return false;
            };
            let position = coef.saturating_mul(*row).saturating_add(*col).saturating_add(offset);
            position >= 1 && (position as usize) <= xs.len() && xs[position as usize - 1] == result
        }
        "all_different_int" => {
            let Some(xs) = a(0) else {
                return false;
            };
            let mut sorted = xs;
            sorted.sort_unstable();
            sorted.windows(2).all(|w| w[0] != w[1])
        }
        "set_in" => matches!(s(0), Some(x) if args.len() == 2 && in_set(&args[1], x)),
        "set_not_in" => matches!(s(0), Some(x) if args.len() == 2 && !in_set(&args[1], x)),
        "count_eq" | "count" => {
            let (Some(xs), Some(needle), Some(count)) = (a(0), s(1), s(2)) else {
                return false;
            };
            xs.iter().filter(|&&x| x == needle).count() as i64 == count
        }
        "table_int" => {
            let (Some(xs), Some(flat)) = (a(0), a(1)) else {
                return false;
            };
            let width = xs.len();
            width > 0 && flat.chunks(width).any(|row| row == xs.as_slice())
        }
        "cumulative" => {
            let (Some(starts), Some(durations), Some(demands), Some(cap)) =
                (a(0), a(1), a(2), s(3))
            else {
                return false;
            };
            if starts.len() != durations.len() || starts.len() != demands.len() {
                return false;
            }
            // Peak load occurs at some task start.
            for (i, &t) in starts.iter().enumerate() {
                if durations[i] <= 0 {
                    continue;
                }
                let load: i64 = starts
                    .iter()
                    .enumerate()
                    .filter(|&(j, &sj)| sj <= t && t < sj.saturating_add(durations[j]))
                    .map(|(j, _)| demands[j])
                    .sum();
                if load > cap {
                    return false;
                }
            }
            true
        }
        _ => false,
    }
}
