//! Parse-level abstract syntax for FlatZinc.
//!
//! This is the raw shape of the input file; name resolution, array
//! expansion, and typing happen during lowering (`context`).

use crate::tokenizer::Location;

/// A parsed FlatZinc file.
#[derive(Debug, Clone, Default)]
pub struct FznAst {
    pub declarations: Vec<Declaration>,
    pub constraints: Vec<ConstraintItem>,
    pub solve: SolveItem,
}

/// A parameter or variable declaration (both use the same item syntax).
#[derive(Debug, Clone)]
pub struct Declaration {
    pub ty: TypeInst,
    pub name: String,
    pub annotations: Vec<AnnAst>,
    pub init: Option<Expr>,
    pub location: Location,
}

/// Type-instance of a declaration. `is_var` distinguishes decision
/// variables from parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInst {
    pub is_var: bool,
    pub base: BaseType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaseType {
    Bool,
    Int,
    IntRange(i64, i64),
    IntSet(Vec<i64>),
    Float,
    FloatRange(f64, f64),
    SetOfInt,
    Array {
        /// Size of each index set; FlatZinc arrays are `1..n` per dimension.
        dimensions: Vec<i64>,
        element: Box<TypeInst>,
    },
}

/// A constraint item: predicate name, arguments, annotations.
#[derive(Debug, Clone)]
pub struct ConstraintItem {
    pub predicate: String,
    pub args: Vec<Expr>,
    pub annotations: Vec<AnnAst>,
    pub location: Location,
}

#[derive(Debug, Clone, Default)]
pub struct SolveItem {
    pub goal: SolveGoal,
    pub annotations: Vec<AnnAst>,
}

#[derive(Debug, Clone, Default)]
pub enum SolveGoal {
    #[default]
    Satisfy,
    Minimize(Expr),
    Maximize(Expr),
}

/// An expression in argument position.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    BoolLit(bool),
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    Ident(String),
    /// `name[index]`, index already a literal per the FlatZinc grammar.
    ArrayAccess { name: String, index: i64 },
    ArrayLit(Vec<Expr>),
    SetLit(Vec<i64>),
    Range(i64, i64),
}

/// A parsed annotation: bare identifier or call. Call arguments may nest
/// annotations (e.g. `seq_search([int_search(...), ...])`).
#[derive(Debug, Clone, PartialEq)]
pub struct AnnAst {
    pub name: String,
    pub args: Vec<AnnArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnArg {
    Expr(Expr),
    Call(AnnAst),
    List(Vec<AnnArg>),
}
