//! Symbol tables and AST-to-IR lowering.
//!
//! The parse context resolves identifiers to integer constants, constant
//! arrays, variables, variable arrays, and domain aliases. Array indexing is
//! 1-based per the FlatZinc convention; a bad index or an unknown name is a
//! fatal reference error.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::ast::{
    AnnArg, AnnAst, BaseType, ConstraintItem, Declaration, Expr, FznAst, SolveGoal, TypeInst,
};
use crate::domain::Domain;
use crate::error::{FznError, FznResult};
use crate::model::{Annotation, Argument, Model, OutputItem, VarId};

/// Identifier environment built while lowering a parsed file.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub int_constants: HashMap<String, i64>,
    pub int_constant_arrays: HashMap<String, Vec<i64>>,
    pub variables: HashMap<String, VarId>,
    pub variable_arrays: HashMap<String, Vec<VarId>>,
    pub domain_aliases: HashMap<String, Domain>,
    /// Identifiers bound to payloads the pipeline ignores (floats, strings,
    /// set arrays); references lower to [`Argument::Void`].
    void_idents: HashSet<String>,
    /// One shared variable per integer literal used in variable position.
    constant_cache: HashMap<i64, VarId>,
}

impl ParseContext {
    /// The fixed variable standing for a literal in variable position.
    pub fn constant_var(&mut self, model: &mut Model, value: i64) -> VarId {
        if let Some(&id) = self.constant_cache.get(&value) {
            return id;
        }
        let id = model.new_variable(value.to_string(), Domain::singleton(value), true);
        self.constant_cache.insert(value, id);
        id
    }
}

/// Lowers a parsed file into the IR model plus the context that named it.
pub fn lower(ast: &FznAst) -> FznResult<(Model, ParseContext)> {
    let mut lowerer = Lowerer {
        model: Model::new(),
        ctx: ParseContext::default(),
    };
    for decl in &ast.declarations {
        lowerer.lower_declaration(decl)?;
    }
    for item in &ast.constraints {
        lowerer.lower_constraint(item)?;
    }
    lowerer.lower_solve(ast)?;
    Ok((lowerer.model, lowerer.ctx))
}

struct Lowerer {
    model: Model,
    ctx: ParseContext,
}

impl Lowerer {
    fn lower_declaration(&mut self, decl: &Declaration) -> FznResult<()> {
        match (&decl.ty.base, decl.ty.is_var) {
            (BaseType::Array { dimensions, element }, _) => {
                self.lower_array_declaration(decl, dimensions, element)
            }
            (_, true) => self.lower_variable_declaration(decl),
            (_, false) => self.lower_parameter_declaration(decl),
        }
    }

    fn lower_parameter_declaration(&mut self, decl: &Declaration) -> FznResult<()> {
        match &decl.ty.base {
            BaseType::Float | BaseType::FloatRange(..) => {
                warn!("ignoring float parameter '{}'", decl.name);
                self.ctx.void_idents.insert(decl.name.clone());
                Ok(())
            }
            BaseType::SetOfInt => {
                let init = decl.init.as_ref().ok_or_else(|| {
                    FznError::reference(format!("parameter '{}' has no value", decl.name))
                })?;
                let domain = match init {
                    Expr::Range(lo, hi) => Domain::interval(*lo, *hi),
                    Expr::SetLit(values) => Domain::values(values.clone()),
                    other => {
                        return Err(FznError::reference(format!(
                            "set parameter '{}' has a non-set value: {:?}",
                            decl.name, other
                        )));
                    }
                };
                self.ctx.domain_aliases.insert(decl.name.clone(), domain);
                Ok(())
            }
            _ => {
                let init = decl.init.as_ref().ok_or_else(|| {
                    FznError::reference(format!("parameter '{}' has no value", decl.name))
                })?;
                let value = self.expr_to_constant(init)?;
                self.ctx.int_constants.insert(decl.name.clone(), value);
                Ok(())
            }
        }
    }

    fn lower_variable_declaration(&mut self, decl: &Declaration) -> FznResult<()> {
        let domain = self.domain_of(&decl.ty, &decl.name)?;
        let temporary = has_annotation(&decl.annotations, "var_is_introduced");

        // An initializer that names another variable makes this declaration
        // an alias; no fresh variable is created.
        let var_id = match &decl.init {
            Some(expr) => match self.resolve_init(expr)? {
                Resolved::Var(existing) => {
                    self.model
                        .var_mut(existing)
                        .domain
                        .intersect_with_domain(&domain);
                    existing
                }
                Resolved::Value(v) => {
                    let mut narrowed = domain;
                    narrowed.intersect_with_interval(v, v);
                    self.model.new_variable(decl.name.clone(), narrowed, temporary)
                }
            },
            None => self
                .model
                .new_variable(decl.name.clone(), domain, temporary),
        };
        self.ctx.variables.insert(decl.name.clone(), var_id);

        if has_annotation(&decl.annotations, "output_var") {
            self.model.output_items.push(OutputItem {
                name: decl.name.clone(),
                bounds: Vec::new(),
                variables: vec![var_id],
                as_bool: decl.ty.base == BaseType::Bool,
            });
        }
        Ok(())
    }

    fn lower_array_declaration(
        &mut self,
        decl: &Declaration,
        dimensions: &[i64],
        element: &TypeInst,
    ) -> FznResult<()> {
        let &[length] = dimensions else {
            return Err(FznError::Unsupported {
                message: format!(
                    "array declaration '{}' must have a single index set",
                    decl.name
                ),
            });
        };
        if length < 0 {
            return Err(FznError::reference(format!(
                "array '{}' has a negative length",
                decl.name
            )));
        }

        if !element.is_var {
            return self.lower_parameter_array(decl, length as usize, element);
        }

        let element_domain = self.domain_of(element, &decl.name)?;
        let temporary = has_annotation(&decl.annotations, "var_is_introduced");
        let vars = match &decl.init {
            Some(Expr::ArrayLit(elements)) => {
                if elements.len() != length as usize {
                    return Err(FznError::reference(format!(
                        "array '{}' declares {} elements but initializes {}",
                        decl.name,
                        length,
                        elements.len()
                    )));
                }
                let mut vars = Vec::with_capacity(elements.len());
                for element in elements {
                    let id = match self.resolve_init(element)? {
                        Resolved::Var(id) => id,
                        Resolved::Value(v) => self.ctx.constant_var(&mut self.model, v),
                    };
                    vars.push(id);
                }
                vars
            }
            Some(other) => {
                return Err(FznError::reference(format!(
                    "array '{}' has a non-array initializer: {:?}",
                    decl.name, other
                )));
            }
            None => (1..=length)
                .map(|i| {
                    self.model.new_variable(
                        format!("{}[{}]", decl.name, i),
                        element_domain.clone(),
                        temporary,
                    )
                })
                .collect(),
        };
        self.ctx
            .variable_arrays
            .insert(decl.name.clone(), vars.clone());

        if let Some(bounds) = output_array_bounds(&decl.annotations) {
            self.model.output_items.push(OutputItem {
                name: decl.name.clone(),
                bounds,
                variables: vars,
                as_bool: element.base == BaseType::Bool,
            });
        }
        Ok(())
    }

    fn lower_parameter_array(
        &mut self,
        decl: &Declaration,
        length: usize,
        element: &TypeInst,
    ) -> FznResult<()> {
        match &element.base {
            BaseType::Float | BaseType::FloatRange(..) | BaseType::SetOfInt => {
                warn!("ignoring non-integer parameter array '{}'", decl.name);
                self.ctx.void_idents.insert(decl.name.clone());
                return Ok(());
            }
            _ => {}
        }
        let Some(Expr::ArrayLit(elements)) = &decl.init else {
            return Err(FznError::reference(format!(
                "parameter array '{}' has no value",
                decl.name
            )));
        };
        if elements.len() != length {
            return Err(FznError::reference(format!(
                "array '{}' declares {} elements but initializes {}",
                decl.name,
                length,
                elements.len()
            )));
        }
        let values: FznResult<Vec<i64>> =
            elements.iter().map(|e| self.expr_to_constant(e)).collect();
        self.ctx
            .int_constant_arrays
            .insert(decl.name.clone(), values?);
        Ok(())
    }

    fn lower_constraint(&mut self, item: &ConstraintItem) -> FznResult<()> {
        let mut args = Vec::with_capacity(item.args.len());
        for expr in &item.args {
            args.push(self.expr_to_argument(expr)?);
        }
        let cid = self.model.new_constraint(item.predicate.clone(), args);

        for ann in &item.annotations {
            match ann.name.as_str() {
                "defines_var" => {
                    let Some(AnnArg::Expr(expr)) = ann.args.first() else {
                        continue;
                    };
                    let target = self.resolve_variable(expr)?;
                    self.model.set_target(cid, target)?;
                }
                "domain" => {
                    self.model.constraint_mut(cid).strong_propagation = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_solve(&mut self, ast: &FznAst) -> FznResult<()> {
        match &ast.solve.goal {
            SolveGoal::Satisfy => {}
            SolveGoal::Minimize(expr) => {
                self.model.objective = Some(self.resolve_variable(expr)?);
                self.model.maximize = false;
            }
            SolveGoal::Maximize(expr) => {
                self.model.objective = Some(self.resolve_variable(expr)?);
                self.model.maximize = true;
            }
        }
        let lowered: Vec<Annotation> = ast
            .solve
            .annotations
            .iter()
            .map(|ann| self.lower_annotation(ann))
            .collect();
        self.model.search_annotations = lowered;
        Ok(())
    }

    fn domain_of(&self, ty: &TypeInst, name: &str) -> FznResult<Domain> {
        Ok(match &ty.base {
            BaseType::Bool => Domain::boolean(),
            BaseType::Int => Domain::all(),
            BaseType::IntRange(lo, hi) => Domain::interval(*lo, *hi),
            BaseType::IntSet(values) => Domain::values(values.clone()),
            BaseType::Float | BaseType::FloatRange(..) => {
                // Floats carry no integer constraints; the variable exists
                // so references resolve, with an unconstrained domain.
                warn!("treating float variable '{}' as unconstrained", name);
                Domain::all()
            }
            BaseType::SetOfInt => {
                return Err(FznError::Unsupported {
                    message: format!("set variable '{}'", name),
                });
            }
            BaseType::Array { .. } => {
                return Err(FznError::Unsupported {
                    message: format!("nested array type for '{}'", name),
                });
            }
        })
    }

    /// A declaration initializer: either an existing variable or a value.
    fn resolve_init(&mut self, expr: &Expr) -> FznResult<Resolved> {
        match expr {
            Expr::IntLit(v) => Ok(Resolved::Value(*v)),
            Expr::BoolLit(b) => Ok(Resolved::Value(i64::from(*b))),
            Expr::Ident(name) => {
                if let Some(&v) = self.ctx.int_constants.get(name) {
                    Ok(Resolved::Value(v))
                } else if let Some(&id) = self.ctx.variables.get(name) {
                    Ok(Resolved::Var(id))
                } else {
                    Err(FznError::reference(format!("unknown identifier '{}'", name)))
                }
            }
            Expr::ArrayAccess { name, index } => match self.resolve_access(name, *index)? {
                AccessResult::Var(id) => Ok(Resolved::Var(id)),
                AccessResult::Value(v) => Ok(Resolved::Value(v)),
            },
            other => Err(FznError::reference(format!(
                "initializer must be a value or a variable, found {:?}",
                other
            ))),
        }
    }

    fn expr_to_constant(&self, expr: &Expr) -> FznResult<i64> {
        match expr {
            Expr::IntLit(v) => Ok(*v),
            Expr::BoolLit(b) => Ok(i64::from(*b)),
            Expr::Ident(name) => self
                .ctx
                .int_constants
                .get(name)
                .copied()
                .ok_or_else(|| FznError::reference(format!("unknown constant '{}'", name))),
            Expr::ArrayAccess { name, index } => {
                let array = self.ctx.int_constant_arrays.get(name).ok_or_else(|| {
                    FznError::reference(format!("unknown constant array '{}'", name))
                })?;
                constant_at(name, array, *index)
            }
            other => Err(FznError::reference(format!(
                "expected a constant, found {:?}",
                other
            ))),
        }
    }

    fn resolve_variable(&mut self, expr: &Expr) -> FznResult<VarId> {
        match expr {
            Expr::Ident(name) => {
                if let Some(&id) = self.ctx.variables.get(name) {
                    Ok(id)
                } else if let Some(&v) = self.ctx.int_constants.get(name) {
                    Ok(self.ctx.constant_var(&mut self.model, v))
                } else {
                    Err(FznError::reference(format!("unknown variable '{}'", name)))
                }
            }
            Expr::ArrayAccess { name, index } => match self.resolve_access(name, *index)? {
                AccessResult::Var(id) => Ok(id),
                AccessResult::Value(v) => Ok(self.ctx.constant_var(&mut self.model, v)),
            },
            Expr::IntLit(v) => Ok(self.ctx.constant_var(&mut self.model, *v)),
            Expr::BoolLit(b) => Ok(self.ctx.constant_var(&mut self.model, i64::from(*b))),
            other => Err(FznError::reference(format!(
                "expected a variable, found {:?}",
                other
            ))),
        }
    }

    /// 1-based element lookup in a variable or constant array.
    fn resolve_access(&self, name: &str, index: i64) -> FznResult<AccessResult> {
        if let Some(vars) = self.ctx.variable_arrays.get(name) {
            if index < 1 || index as usize > vars.len() {
                return Err(FznError::reference(format!(
                    "index {} out of range for array '{}' of length {}",
                    index,
                    name,
                    vars.len()
                )));
            }
            return Ok(AccessResult::Var(vars[index as usize - 1]));
        }
        if let Some(values) = self.ctx.int_constant_arrays.get(name) {
            return constant_at(name, values, index).map(AccessResult::Value);
        }
        Err(FznError::reference(format!("unknown array '{}'", name)))
    }

    fn expr_to_argument(&mut self, expr: &Expr) -> FznResult<Argument> {
        match expr {
            Expr::IntLit(v) => Ok(Argument::IntValue(*v)),
            Expr::BoolLit(b) => Ok(Argument::IntValue(i64::from(*b))),
            Expr::FloatLit(_) | Expr::StringLit(_) => Ok(Argument::Void),
            Expr::Range(lo, hi) => Ok(Argument::IntInterval(*lo, *hi)),
            Expr::SetLit(values) => {
                let mut sorted = values.clone();
                sorted.sort_unstable();
                sorted.dedup();
                Ok(Argument::IntList(sorted))
            }
            Expr::Ident(name) => {
                if let Some(&v) = self.ctx.int_constants.get(name) {
                    Ok(Argument::IntValue(v))
                } else if let Some(&id) = self.ctx.variables.get(name) {
                    Ok(Argument::IntVarRef(id))
                } else if let Some(vars) = self.ctx.variable_arrays.get(name) {
                    Ok(Argument::IntVarRefArray(vars.clone()))
                } else if let Some(values) = self.ctx.int_constant_arrays.get(name) {
                    Ok(Argument::IntList(values.clone()))
                } else if let Some(domain) = self.ctx.domain_aliases.get(name) {
                    Ok(match domain {
                        Domain::All => Argument::IntInterval(i64::MIN, i64::MAX),
                        Domain::Interval { lo, hi } => Argument::IntInterval(*lo, *hi),
                        Domain::Values(values) => Argument::IntList(values.clone()),
                    })
                } else if self.ctx.void_idents.contains(name) {
                    Ok(Argument::Void)
                } else {
                    Err(FznError::reference(format!("unknown identifier '{}'", name)))
                }
            }
            Expr::ArrayAccess { name, index } => match self.resolve_access(name, *index)? {
                AccessResult::Var(id) => Ok(Argument::IntVarRef(id)),
                AccessResult::Value(v) => Ok(Argument::IntValue(v)),
            },
            Expr::ArrayLit(elements) => self.array_literal_to_argument(elements),
        }
    }

    /// An all-constant literal becomes a value list in source order; any
    /// variable promotes the whole array to variable references, with
    /// constant slots filled by fixed variables.
    fn array_literal_to_argument(&mut self, elements: &[Expr]) -> FznResult<Argument> {
        let mut constants = Vec::with_capacity(elements.len());
        let mut all_constant = true;
        for element in elements {
            match self.expr_to_constant(element) {
                Ok(v) => constants.push(v),
                Err(_) => {
                    all_constant = false;
                    break;
                }
            }
        }
        if all_constant {
            return Ok(Argument::IntList(constants));
        }
        let mut vars = Vec::with_capacity(elements.len());
        for element in elements {
            vars.push(self.resolve_variable(element)?);
        }
        Ok(Argument::IntVarRefArray(vars))
    }

    fn lower_annotation(&mut self, ann: &AnnAst) -> Annotation {
        if ann.args.is_empty() {
            return Annotation::Identifier(ann.name.clone());
        }
        let args = ann
            .args
            .iter()
            .map(|arg| self.lower_ann_arg(arg))
            .collect();
        Annotation::Call(ann.name.clone(), args)
    }

    fn lower_ann_arg(&mut self, arg: &AnnArg) -> Annotation {
        match arg {
            AnnArg::Call(call) => self.lower_annotation(call),
            AnnArg::List(items) => {
                Annotation::List(items.iter().map(|a| self.lower_ann_arg(a)).collect())
            }
            AnnArg::Expr(expr) => self.lower_ann_expr(expr),
        }
    }

    fn lower_ann_expr(&mut self, expr: &Expr) -> Annotation {
        match expr {
            Expr::Ident(name) => {
                if let Some(&id) = self.ctx.variables.get(name) {
                    Annotation::VarRef(id)
                } else if let Some(vars) = self.ctx.variable_arrays.get(name) {
                    Annotation::VarRefArray(vars.clone())
                } else {
                    Annotation::Identifier(name.clone())
                }
            }
            Expr::ArrayAccess { name, index } => match self.resolve_access(name, *index) {
                Ok(AccessResult::Var(id)) => Annotation::VarRef(id),
                Ok(AccessResult::Value(v)) => Annotation::Identifier(v.to_string()),
                Err(_) => Annotation::Identifier(format!("{}[{}]", name, index)),
            },
            Expr::ArrayLit(elements) => {
                let mut vars = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Expr::Ident(name) => {
                            if let Some(&id) = self.ctx.variables.get(name) {
                                vars.push(id);
                                continue;
                            }
                        }
                        Expr::ArrayAccess { name, index } => {
                            if let Ok(AccessResult::Var(id)) = self.resolve_access(name, *index) {
                                vars.push(id);
                                continue;
                            }
                        }
                        _ => {}
                    }
                    // Mixed content falls back to a plain annotation list.
                    return Annotation::List(
                        elements.iter().map(|e| self.lower_ann_expr(e)).collect(),
                    );
                }
                Annotation::VarRefArray(vars)
            }
            Expr::Range(lo, hi) => Annotation::Interval(*lo, *hi),
            Expr::IntLit(v) => Annotation::Identifier(v.to_string()),
            Expr::BoolLit(b) => Annotation::Identifier(b.to_string()),
            Expr::FloatLit(v) => Annotation::Identifier(v.to_string()),
            Expr::StringLit(s) => Annotation::Identifier(s.clone()),
            Expr::SetLit(values) => Annotation::List(
                values
                    .iter()
                    .map(|v| Annotation::Identifier(v.to_string()))
                    .collect(),
            ),
        }
    }
}

enum Resolved {
    Var(VarId),
    Value(i64),
}

enum AccessResult {
    Var(VarId),
    Value(i64),
}

fn constant_at(name: &str, values: &[i64], index: i64) -> FznResult<i64> {
    if index < 1 || index as usize > values.len() {
        return Err(FznError::reference(format!(
            "index {} out of range for array '{}' of length {}",
            index,
            name,
            values.len()
        )));
    }
    Ok(values[index as usize - 1])
}

fn has_annotation(annotations: &[AnnAst], name: &str) -> bool {
    annotations.iter().any(|a| a.name == name)
}

/// Extracts the dimension bounds of an `output_array([1..n, ...])`
/// annotation, if present.
fn output_array_bounds(annotations: &[AnnAst]) -> Option<Vec<(i64, i64)>> {
    let ann = annotations.iter().find(|a| a.name == "output_array")?;
    let Some(AnnArg::List(items)) = ann.args.first() else {
        return Some(Vec::new());
    };
    let mut bounds = Vec::with_capacity(items.len());
    for item in items {
        if let AnnArg::Expr(Expr::Range(lo, hi)) = item {
            bounds.push((*lo, *hi));
        }
    }
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn lower_str(input: &str) -> (Model, ParseContext) {
        lower(&parse(tokenize(input).unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn parameters_and_constant_arrays() {
        let (_, ctx) = lower_str(
            "int: n = 3;\narray [1..3] of int: A = [5, n, 7];\nsolve satisfy;",
        );
        assert_eq!(ctx.int_constants.get("n"), Some(&3));
        assert_eq!(ctx.int_constant_arrays.get("A"), Some(&vec![5, 3, 7]));
    }

    #[test]
    fn variable_alias_through_initializer() {
        let (model, ctx) = lower_str(
            "var 0..10: y;\nvar 2..20: x = y;\nsolve satisfy;",
        );
        assert_eq!(ctx.variables["x"], ctx.variables["y"]);
        assert_eq!(model.var(ctx.variables["y"]).domain, Domain::interval(2, 10));
    }

    #[test]
    fn constraint_arguments_resolve() {
        let (model, ctx) = lower_str(
            "var 1..5: x;\nvar 1..5: y;\nconstraint int_lin_eq([1, -1], [x, y], 0);\nsolve satisfy;",
        );
        let ct = model.constraint(crate::model::CstrId(0));
        assert_eq!(ct.args[0], Argument::IntList(vec![1, -1]));
        assert_eq!(
            ct.args[1],
            Argument::IntVarRefArray(vec![ctx.variables["x"], ctx.variables["y"]])
        );
        assert_eq!(ct.args[2], Argument::IntValue(0));
    }

    #[test]
    fn mixed_array_literal_promotes_constants() {
        let (model, _) = lower_str(
            "var 1..5: x;\nconstraint all_different_int([x, 3]);\nsolve satisfy;",
        );
        let ct = model.constraint(crate::model::CstrId(0));
        let Argument::IntVarRefArray(vars) = &ct.args[0] else {
            panic!("expected variable array");
        };
        assert_eq!(vars.len(), 2);
        assert_eq!(model.var(vars[1]).domain, Domain::singleton(3));
    }

    #[test]
    fn defines_var_sets_the_target() {
        let (model, ctx) = lower_str(
            "var 1..5: x;\nvar 1..9: z;\nconstraint int_lin_eq([-1, 2], [z, x], 0) :: defines_var(z);\nsolve satisfy;",
        );
        let ct = model.constraint(crate::model::CstrId(0));
        assert_eq!(ct.target_variable, Some(ctx.variables["z"]));
        assert_eq!(
            model.var(ctx.variables["z"]).defining_constraint,
            Some(crate::model::CstrId(0))
        );
    }

    #[test]
    fn output_array_item_keeps_bounds() {
        let (model, _) = lower_str(
            "array [1..4] of var 0..1: g :: output_array([1..2, 1..2]);\nsolve satisfy;",
        );
        assert_eq!(model.output_items.len(), 1);
        assert_eq!(model.output_items[0].bounds, vec![(1, 2), (1, 2)]);
        assert_eq!(model.output_items[0].variables.len(), 4);
    }

    #[test]
    fn search_annotation_resolves_variables() {
        let (model, ctx) = lower_str(
            "var 1..5: x;\nsolve :: int_search([x], input_order, indomain_min, complete) satisfy;",
        );
        let Annotation::Call(name, args) = &model.search_annotations[0] else {
            panic!("expected call annotation");
        };
        assert_eq!(name, "int_search");
        assert_eq!(args[0], Annotation::VarRefArray(vec![ctx.variables["x"]]));
        assert_eq!(args[1], Annotation::Identifier("input_order".to_string()));
    }

    #[test]
    fn out_of_range_access_is_a_reference_error() {
        let ast = parse(
            tokenize(
                "array [1..2] of int: A = [1, 2];\nvar 1..5: x;\nconstraint int_eq(x, A[3]);\nsolve satisfy;",
            )
            .unwrap(),
        )
        .unwrap();
        assert!(matches!(lower(&ast), Err(FznError::RefError { .. })));
    }

    #[test]
    fn domain_alias_lowering() {
        let (model, _) = lower_str(
            "set of int: S = {2, 4, 6};\nvar 1..9: x;\nconstraint set_in(x, S);\nsolve satisfy;",
        );
        let ct = model.constraint(crate::model::CstrId(0));
        assert_eq!(ct.args[1], Argument::IntList(vec![2, 4, 6]));
    }
}
