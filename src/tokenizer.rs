//! FlatZinc tokenizer.
//!
//! Turns FlatZinc 1.x source text into a token vector with source locations
//! for error reporting. Integer literals are read as i64; float and string
//! literals are tokenized but carry no meaning downstream.

use crate::error::{FznError, FznResult};

/// Line/column position in the source, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

/// FlatZinc keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Predicate,
    Var,
    Array,
    Of,
    Constraint,
    Solve,
    Satisfy,
    Minimize,
    Maximize,
    Int,
    Bool,
    Float,
    Set,
    True,
    False,
}

impl Keyword {
    fn lookup(ident: &str) -> Option<Keyword> {
        Some(match ident {
            "predicate" => Keyword::Predicate,
            "var" => Keyword::Var,
            "array" => Keyword::Array,
            "of" => Keyword::Of,
            "constraint" => Keyword::Constraint,
            "solve" => Keyword::Solve,
            "satisfy" => Keyword::Satisfy,
            "minimize" => Keyword::Minimize,
            "maximize" => Keyword::Maximize,
            "int" => Keyword::Int,
            "bool" => Keyword::Bool,
            "float" => Keyword::Float,
            "set" => Keyword::Set,
            "true" => Keyword::True,
            "false" => Keyword::False,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Kw(Keyword),
    Ident(String),
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    DoubleColon,
    Colon,
    Semicolon,
    Comma,
    DoubleDot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Equals,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

struct Lexer<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            rest: source,
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>, at: Location) -> FznError {
        FznError::LexError {
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest.chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.rest = &self.rest[ch.len_utf8()..];
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Consumes the longest prefix whose chars satisfy `keep`.
    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !keep(c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (taken, rest) = self.rest.split_at(end);
        for ch in taken.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.rest = rest;
        taken
    }

    fn skip_trivia(&mut self) -> FznResult<()> {
        loop {
            self.take_while(char::is_whitespace);
            match self.peek() {
                Some('%') => {
                    self.take_while(|c| c != '\n');
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error("unterminated block comment", start));
                            }
                            Some('*') if self.peek_second() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_number(&mut self) -> FznResult<TokenKind> {
        let start = self.location();
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        text.push_str(self.take_while(|c| c.is_ascii_digit()));
        let mut is_float = false;
        // A '.' starts a fraction only when a digit follows; `1..3` must
        // leave the dots for the range operator.
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.bump();
            text.push_str(self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            text.push('e');
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.bump().unwrap());
            }
            text.push_str(self.take_while(|c| c.is_ascii_digit()));
        }
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| self.error(format!("invalid float literal '{}'", text), start))
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| self.error(format!("invalid integer literal '{}'", text), start))
        }
    }

    fn lex_string(&mut self) -> FznResult<TokenKind> {
        let start = self.location();
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error("unterminated string literal", start));
                }
                Some('"') => {
                    self.bump();
                    return Ok(TokenKind::StringLit(text));
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        _ => return Err(self.error("invalid escape sequence", start)),
                    }
                }
                Some(ch) => {
                    text.push(ch);
                    self.bump();
                }
            }
        }
    }

    fn next_token(&mut self) -> FznResult<Token> {
        self.skip_trivia()?;
        let location = self.location();
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                match Keyword::lookup(ident) {
                    Some(kw) => TokenKind::Kw(kw),
                    None => TokenKind::Ident(ident.to_string()),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.lex_number()?,
            Some('-') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.lex_number()?
            }
            Some('"') => self.lex_string()?,
            Some(':') => {
                self.bump();
                if self.peek() == Some(':') {
                    self.bump();
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            Some('.') => {
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DoubleDot
                } else {
                    return Err(self.error("stray '.'", location));
                }
            }
            Some(';') => {
                self.bump();
                TokenKind::Semicolon
            }
            Some(',') => {
                self.bump();
                TokenKind::Comma
            }
            Some('(') => {
                self.bump();
                TokenKind::LParen
            }
            Some(')') => {
                self.bump();
                TokenKind::RParen
            }
            Some('[') => {
                self.bump();
                TokenKind::LBracket
            }
            Some(']') => {
                self.bump();
                TokenKind::RBracket
            }
            Some('{') => {
                self.bump();
                TokenKind::LBrace
            }
            Some('}') => {
                self.bump();
                TokenKind::RBrace
            }
            Some('=') => {
                self.bump();
                TokenKind::Equals
            }
            Some(ch) => {
                return Err(self.error(format!("unexpected character '{}'", ch), location));
            }
        };
        Ok(Token { kind, location })
    }
}

/// Tokenizes a whole FlatZinc source string.
pub fn tokenize(source: &str) -> FznResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
