//! FlatZinc parser.
//!
//! Recursive-descent parser over the token vector. Predicate items are
//! accepted and skipped; everything else lands in the parse-level AST.

use crate::ast::*;
use crate::error::{FznError, FznResult};
use crate::tokenizer::{Keyword, Location, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn location(&self) -> Location {
        self.current().location
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> FznError {
        let loc = self.location();
        FznError::ParseError {
            message: message.into(),
            line: loc.line,
            column: loc.column,
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> FznResult<()> {
        if std::mem::discriminant(self.kind()) == std::mem::discriminant(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.kind())))
        }
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if std::mem::discriminant(self.kind()) == std::mem::discriminant(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if *self.kind() == TokenKind::Kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> FznResult<String> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {}, found {:?}", what, other))),
        }
    }

    fn expect_int(&mut self, what: &str) -> FznResult<i64> {
        match self.kind() {
            TokenKind::IntLit(v) => {
                let v = *v;
                self.advance();
                Ok(v)
            }
            other => Err(self.error(format!("expected {}, found {:?}", what, other))),
        }
    }

    /// Parses the whole file.
    pub fn parse_model(&mut self) -> FznResult<FznAst> {
        let mut ast = FznAst::default();
        let mut saw_solve = false;
        while *self.kind() != TokenKind::Eof {
            match self.kind() {
                TokenKind::Kw(Keyword::Predicate) => self.skip_predicate()?,
                TokenKind::Kw(Keyword::Constraint) => {
                    ast.constraints.push(self.parse_constraint()?);
                }
                TokenKind::Kw(Keyword::Solve) => {
                    ast.solve = self.parse_solve()?;
                    saw_solve = true;
                }
                TokenKind::Kw(
                    Keyword::Var
                    | Keyword::Array
                    | Keyword::Bool
                    | Keyword::Int
                    | Keyword::Float
                    | Keyword::Set,
                )
                | TokenKind::IntLit(_)
                | TokenKind::FloatLit(_)
                | TokenKind::LBrace => {
                    ast.declarations.push(self.parse_declaration()?);
                }
                other => {
                    return Err(self.error(format!("unexpected token {:?}", other)));
                }
            }
        }
        if !saw_solve {
            return Err(self.error("missing solve item"));
        }
        Ok(ast)
    }

    /// Predicate declarations carry no information the pipeline uses;
    /// consume up to the closing semicolon.
    fn skip_predicate(&mut self) -> FznResult<()> {
        self.expect(&TokenKind::Kw(Keyword::Predicate))?;
        loop {
            match self.kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Eof => {
                    return Err(self.error("unterminated predicate item"));
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_declaration(&mut self) -> FznResult<Declaration> {
        let location = self.location();
        let ty = self.parse_type_inst()?;
        self.expect(&TokenKind::Colon)?;
        let name = self.expect_ident("declaration name")?;
        let annotations = self.parse_annotations()?;
        let init = if self.eat(&TokenKind::Equals) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon)?;
        Ok(Declaration {
            ty,
            name,
            annotations,
            init,
            location,
        })
    }

    fn parse_type_inst(&mut self) -> FznResult<TypeInst> {
        if self.eat_keyword(Keyword::Array) {
            self.expect(&TokenKind::LBracket)?;
            let mut dimensions = Vec::new();
            loop {
                if self.eat_keyword(Keyword::Int) {
                    // `array [int]` appears in predicate parameters only;
                    // an unsized dimension never reaches a declaration.
                    dimensions.push(0);
                } else {
                    let lo = self.expect_int("index range")?;
                    if self.eat(&TokenKind::DoubleDot) {
                        let hi = self.expect_int("index range upper bound")?;
                        if lo != 1 {
                            return Err(self.error(format!(
                                "array index sets must start at 1, found {}..{}",
                                lo, hi
                            )));
                        }
                        dimensions.push(hi);
                    } else {
                        dimensions.push(lo);
                    }
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket)?;
            self.expect(&TokenKind::Kw(Keyword::Of))?;
            let element = Box::new(self.parse_type_inst()?);
            return Ok(TypeInst {
                is_var: false,
                base: BaseType::Array {
                    dimensions,
                    element,
                },
            });
        }

        let is_var = self.eat_keyword(Keyword::Var);
        let base = match self.kind().clone() {
            TokenKind::Kw(Keyword::Bool) => {
                self.advance();
                BaseType::Bool
            }
            TokenKind::Kw(Keyword::Int) => {
                self.advance();
                BaseType::Int
            }
            TokenKind::Kw(Keyword::Float) => {
                self.advance();
                BaseType::Float
            }
            TokenKind::Kw(Keyword::Set) => {
                self.advance();
                self.expect(&TokenKind::Kw(Keyword::Of))?;
                // `set of int` and `set of 1..n` both lower to a domain
                // alias; the range itself is kept by the initializer.
                if !self.eat_keyword(Keyword::Int) {
                    let _ = self.expect_int("set element range")?;
                    self.expect(&TokenKind::DoubleDot)?;
                    let _ = self.expect_int("set element range upper bound")?;
                }
                BaseType::SetOfInt
            }
            TokenKind::IntLit(lo) => {
                self.advance();
                self.expect(&TokenKind::DoubleDot)?;
                let hi = self.expect_int("range upper bound")?;
                BaseType::IntRange(lo, hi)
            }
            TokenKind::FloatLit(lo) => {
                self.advance();
                self.expect(&TokenKind::DoubleDot)?;
                match self.kind().clone() {
                    TokenKind::FloatLit(hi) => {
                        self.advance();
                        BaseType::FloatRange(lo, hi)
                    }
                    other => {
                        return Err(self
                            .error(format!("expected float range upper bound, found {:?}", other)));
                    }
                }
            }
            TokenKind::LBrace => {
                self.advance();
                let values = self.parse_int_list(&TokenKind::RBrace)?;
                self.expect(&TokenKind::RBrace)?;
                BaseType::IntSet(values)
            }
            other => {
                return Err(self.error(format!("expected type, found {:?}", other)));
            }
        };
        Ok(TypeInst { is_var, base })
    }

    fn parse_int_list(&mut self, terminator: &TokenKind) -> FznResult<Vec<i64>> {
        let mut values = Vec::new();
        if std::mem::discriminant(self.kind()) == std::mem::discriminant(terminator) {
            return Ok(values);
        }
        loop {
            values.push(self.expect_int("integer")?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(values)
    }

    fn parse_constraint(&mut self) -> FznResult<ConstraintItem> {
        let location = self.location();
        self.expect(&TokenKind::Kw(Keyword::Constraint))?;
        let predicate = self.expect_ident("constraint predicate name")?;
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if *self.kind() != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let annotations = self.parse_annotations()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(ConstraintItem {
            predicate,
            args,
            annotations,
            location,
        })
    }

    fn parse_solve(&mut self) -> FznResult<SolveItem> {
        self.expect(&TokenKind::Kw(Keyword::Solve))?;
        let annotations = self.parse_annotations()?;
        let goal = if self.eat_keyword(Keyword::Satisfy) {
            SolveGoal::Satisfy
        } else if self.eat_keyword(Keyword::Minimize) {
            SolveGoal::Minimize(self.parse_expr()?)
        } else if self.eat_keyword(Keyword::Maximize) {
            SolveGoal::Maximize(self.parse_expr()?)
        } else {
            return Err(self.error("expected satisfy, minimize, or maximize"));
        };
        self.expect(&TokenKind::Semicolon)?;
        Ok(SolveItem { goal, annotations })
    }

    fn parse_annotations(&mut self) -> FznResult<Vec<AnnAst>> {
        let mut annotations = Vec::new();
        while self.eat(&TokenKind::DoubleColon) {
            annotations.push(self.parse_annotation()?);
        }
        Ok(annotations)
    }

    fn parse_annotation(&mut self) -> FznResult<AnnAst> {
        let name = self.expect_ident("annotation name")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::LParen) {
            if *self.kind() != TokenKind::RParen {
                loop {
                    args.push(self.parse_ann_arg()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(AnnAst { name, args })
    }

    fn parse_ann_arg(&mut self) -> FznResult<AnnArg> {
        match self.kind() {
            TokenKind::Ident(_) => {
                // Nested call if a parenthesis follows; bare identifiers and
                // array accesses fall through to expressions.
                let next = self.tokens.get(self.position + 1).map(|t| &t.kind);
                if next == Some(&TokenKind::LParen) {
                    Ok(AnnArg::Call(self.parse_annotation()?))
                } else {
                    Ok(AnnArg::Expr(self.parse_expr()?))
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if *self.kind() != TokenKind::RBracket {
                    loop {
                        items.push(self.parse_ann_arg()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(AnnArg::List(items))
            }
            _ => Ok(AnnArg::Expr(self.parse_expr()?)),
        }
    }

    fn parse_expr(&mut self) -> FznResult<Expr> {
        match self.kind().clone() {
            TokenKind::Kw(Keyword::True) => {
                self.advance();
                Ok(Expr::BoolLit(true))
            }
            TokenKind::Kw(Keyword::False) => {
                self.advance();
                Ok(Expr::BoolLit(false))
            }
            TokenKind::IntLit(v) => {
                self.advance();
                if self.eat(&TokenKind::DoubleDot) {
                    let hi = self.expect_int("range upper bound")?;
                    Ok(Expr::Range(v, hi))
                } else {
                    Ok(Expr::IntLit(v))
                }
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                Ok(Expr::FloatLit(v))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::StringLit(s))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::LBracket) {
                    let index = self.expect_int("array index")?;
                    self.expect(&TokenKind::RBracket)?;
                    Ok(Expr::ArrayAccess { name, index })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if *self.kind() != TokenKind::RBracket {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::ArrayLit(elements))
            }
            TokenKind::LBrace => {
                self.advance();
                let values = self.parse_int_list(&TokenKind::RBrace)?;
                self.expect(&TokenKind::RBrace)?;
                Ok(Expr::SetLit(values))
            }
            other => Err(self.error(format!("unexpected token in expression: {:?}", other))),
        }
    }
}

/// Parses a token stream into the AST.
pub fn parse(tokens: Vec<Token>) -> FznResult<FznAst> {
    Parser::new(tokens).parse_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_str(input: &str) -> FznAst {
        parse(tokenize(input).unwrap()).unwrap()
    }

    #[test]
    fn variable_declaration_with_range() {
        let ast = parse_str("var 1..10: x;\nsolve satisfy;");
        assert_eq!(ast.declarations.len(), 1);
        assert_eq!(ast.declarations[0].name, "x");
        assert_eq!(ast.declarations[0].ty.base, BaseType::IntRange(1, 10));
        assert!(ast.declarations[0].ty.is_var);
    }

    #[test]
    fn constraint_with_array_argument() {
        let ast = parse_str(
            "var 1..3: x;\nconstraint int_lin_eq([1, -1], [x, x], 0);\nsolve satisfy;",
        );
        assert_eq!(ast.constraints.len(), 1);
        assert_eq!(ast.constraints[0].predicate, "int_lin_eq");
        assert_eq!(ast.constraints[0].args.len(), 3);
    }

    #[test]
    fn output_annotations_are_kept() {
        let ast = parse_str("var bool: b :: output_var;\nsolve satisfy;");
        assert_eq!(ast.declarations[0].annotations.len(), 1);
        assert_eq!(ast.declarations[0].annotations[0].name, "output_var");
    }

    #[test]
    fn solve_with_search_annotation() {
        let ast = parse_str(
            "var 1..5: x;\nsolve :: int_search([x], first_fail, indomain_min, complete) minimize x;",
        );
        assert!(matches!(ast.solve.goal, SolveGoal::Minimize(Expr::Ident(ref n)) if n == "x"));
        assert_eq!(ast.solve.annotations.len(), 1);
        assert_eq!(ast.solve.annotations[0].name, "int_search");
        assert_eq!(ast.solve.annotations[0].args.len(), 4);
    }

    #[test]
    fn predicate_items_are_skipped() {
        let ast = parse_str(
            "predicate my_pred(array [int] of var int: xs, int: c);\nvar bool: b;\nsolve satisfy;",
        );
        assert_eq!(ast.declarations.len(), 1);
    }

    #[test]
    fn nested_search_annotations() {
        let ast = parse_str(
            "var 1..2: x;\nvar 1..2: y;\nsolve :: seq_search([int_search([x], input_order, indomain_min, complete), int_search([y], input_order, indomain_max, complete)]) satisfy;",
        );
        let ann = &ast.solve.annotations[0];
        assert_eq!(ann.name, "seq_search");
        assert!(matches!(ann.args[0], AnnArg::List(ref items) if items.len() == 2));
    }

    #[test]
    fn missing_solve_item_is_an_error() {
        let tokens = tokenize("var bool: b;").unwrap();
        assert!(parse(tokens).is_err());
    }
}
