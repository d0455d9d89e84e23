//! Textual predicate syntax
//!
//! ```text
//! age >= 30 && (name.startsWith("A") || !active) && status in ["open", "new"]
//! ```
//!
//! | Form | Meaning |
//! |------|---------|
//! | `== != < <= > >=` | comparison |
//! | `&&` / `and`, `\|\|` / `or`, `!` / `not` | logic |
//! | `a.b.c` | nested field |
//! | `f.contains(s)`, `f.startsWith(s)`, `f.endsWith(s)` | string match |
//! | `f in [v, ...]` | membership |
//! | `42`, `-1.5`, `"text"`, `'text'`, `true`, `false`, `null` | literals |
//!
//! Any other method call and any `[n]` element access parse fine and are
//! rejected by the translator, so the error names the exact subexpression.
//!
//! Nesting is capped at [`MAX_PREDICATE_DEPTH`] while parsing, so hostile
//! input fails with a `Limit` error instead of exhausting the stack.

use crate::ast::{CompareOp, Expr, Literal, StringMatch};
use stratadoc_core::{Error, LimitError, Result, MAX_PREDICATE_DEPTH};

/// Parse a predicate
///
/// # Errors
///
/// `InvalidQuery` describing the position of the first syntax error, or
/// `Limit` when the predicate nests deeper than [`MAX_PREDICATE_DEPTH`].
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(token.start, "unexpected trailing input"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Compare(CompareOp),
    AndAnd,
    OrOr,
    Bang,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    start: usize,
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    i: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().collect(),
            i: 0,
        }
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.i + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.i)
            .map_or(self.input.len(), |(pos, _)| *pos)
    }

    fn error(&self, pos: usize, reason: &str) -> Error {
        Error::invalid_query(self.input, format!("{} at position {}", reason, pos))
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek_char(0) {
            let start = self.offset();
            if c.is_whitespace() {
                self.i += 1;
                continue;
            }
            let kind = match c {
                '(' => self.single(Kind::LParen),
                ')' => self.single(Kind::RParen),
                '[' => self.single(Kind::LBracket),
                ']' => self.single(Kind::RBracket),
                ',' => self.single(Kind::Comma),
                '.' => self.single(Kind::Dot),
                '=' if self.peek_char(1) == Some('=') => self.double(Kind::Compare(CompareOp::Eq)),
                '!' if self.peek_char(1) == Some('=') => self.double(Kind::Compare(CompareOp::Ne)),
                '!' => self.single(Kind::Bang),
                '<' if self.peek_char(1) == Some('=') => self.double(Kind::Compare(CompareOp::Le)),
                '<' => self.single(Kind::Compare(CompareOp::Lt)),
                '>' if self.peek_char(1) == Some('=') => self.double(Kind::Compare(CompareOp::Ge)),
                '>' => self.single(Kind::Compare(CompareOp::Gt)),
                '&' if self.peek_char(1) == Some('&') => self.double(Kind::AndAnd),
                '|' if self.peek_char(1) == Some('|') => self.double(Kind::OrOr),
                '"' | '\'' => self.string(c, start)?,
                '-' if self.peek_char(1).map_or(false, |d| d.is_ascii_digit()) => {
                    self.number(start)?
                }
                d if d.is_ascii_digit() => self.number(start)?,
                a if a.is_ascii_alphabetic() || a == '_' => self.ident(),
                other => {
                    return Err(self.error(start, &format!("unexpected character '{}'", other)))
                }
            };
            tokens.push(Token { kind, start });
        }
        Ok(tokens)
    }

    fn single(&mut self, kind: Kind) -> Kind {
        self.i += 1;
        kind
    }

    fn double(&mut self, kind: Kind) -> Kind {
        self.i += 2;
        kind
    }

    fn ident(&mut self) -> Kind {
        let mut name = String::new();
        while let Some(c) = self.peek_char(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.i += 1;
            } else {
                break;
            }
        }
        Kind::Ident(name)
    }

    fn number(&mut self, start: usize) -> Result<Kind> {
        let mut text = String::new();
        if self.peek_char(0) == Some('-') {
            text.push('-');
            self.i += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek_char(0) {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_float && self.peek_char(1).map_or(false, |d| d.is_ascii_digit())
            {
                is_float = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && is_float {
                text.push(c);
                if let Some(sign @ ('+' | '-')) = self.peek_char(1) {
                    text.push(sign);
                    self.i += 1;
                }
            } else {
                break;
            }
            self.i += 1;
        }
        if is_float {
            text.parse::<f64>()
                .map(Kind::Float)
                .map_err(|_| self.error(start, "malformed number"))
        } else {
            text.parse::<i64>()
                .map(Kind::Int)
                .map_err(|_| self.error(start, "integer out of range"))
        }
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Kind> {
        self.i += 1;
        let mut value = String::new();
        loop {
            match self.peek_char(0) {
                None => return Err(self.error(start, "unterminated string")),
                Some('\\') => {
                    let escaped = match self.peek_char(1) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c @ ('\\' | '"' | '\'')) => c,
                        _ => return Err(self.error(self.offset(), "invalid escape")),
                    };
                    value.push(escaped);
                    self.i += 2;
                }
                Some(c) if c == quote => {
                    self.i += 1;
                    return Ok(Kind::Str(value));
                }
                Some(c) => {
                    value.push(c);
                    self.i += 1;
                }
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of the tree built so far
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&Kind> {
        self.peek().map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn here(&self) -> usize {
        self.peek().map_or(self.input.len(), |t| t.start)
    }

    fn error(&self, pos: usize, reason: &str) -> Error {
        Error::invalid_query(self.input, format!("{} at position {}", reason, pos))
    }

    fn expect(&mut self, kind: Kind, what: &str) -> Result<()> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(self.error(token.start, &format!("expected {}", what))),
            None => Err(self.error(self.input.len(), &format!("expected {}", what))),
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek_kind(), Some(Kind::Ident(name)) if name == word)
    }

    /// One level deeper; callers reset `depth` once the level is built.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_PREDICATE_DEPTH {
            return Err(LimitError::PredicateTooDeep {
                depth: self.depth,
                max: MAX_PREDICATE_DEPTH,
            }
            .into());
        }
        Ok(())
    }

    fn or(&mut self) -> Result<Expr> {
        let entered = self.depth;
        let mut expr = self.and()?;
        while matches!(self.peek_kind(), Some(Kind::OrOr)) || self.is_keyword("or") {
            self.pos += 1;
            self.descend()?;
            expr = expr.or(self.and()?);
        }
        self.depth = entered;
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let entered = self.depth;
        let mut expr = self.unary()?;
        while matches!(self.peek_kind(), Some(Kind::AndAnd)) || self.is_keyword("and") {
            self.pos += 1;
            self.descend()?;
            expr = expr.and(self.unary()?);
        }
        self.depth = entered;
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if matches!(self.peek_kind(), Some(Kind::Bang)) || self.is_keyword("not") {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(inner.negate());
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.postfix()?;
        if let Some(Kind::Compare(op)) = self.peek_kind() {
            let op = *op;
            self.pos += 1;
            let rhs = self.postfix()?;
            return Ok(Expr::compare(op, lhs, rhs));
        }
        if self.is_keyword("in") {
            self.pos += 1;
            let values = self.list()?;
            return Ok(Expr::In {
                target: Box::new(lhs),
                values,
            });
        }
        Ok(lhs)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let entered = self.depth;
        let mut expr = self.primary()?;
        loop {
            match self.peek_kind() {
                Some(Kind::Dot) => {
                    self.pos += 1;
                    let start = self.here();
                    let name = match self.next() {
                        Some(Token {
                            kind: Kind::Ident(name),
                            ..
                        }) => name,
                        _ => return Err(self.error(start, "expected member name")),
                    };
                    if matches!(self.peek_kind(), Some(Kind::LParen)) {
                        self.pos += 1;
                        self.descend()?;
                        let args = self.arguments()?;
                        expr = method_call(expr, name, args);
                    } else if let Expr::Field(path) = &mut expr {
                        path.push('.');
                        path.push_str(&name);
                    } else {
                        return Err(self.error(start, "member access on a non-field"));
                    }
                }
                Some(Kind::LBracket) => {
                    self.pos += 1;
                    self.descend()?;
                    let index = self.or()?;
                    self.expect(Kind::RBracket, "']'")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.depth = entered;
                    return Ok(expr);
                }
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let start = self.here();
        let token = match self.next() {
            Some(token) => token,
            None => return Err(self.error(start, "unexpected end of input")),
        };
        match token.kind {
            Kind::Int(i) => Ok(Expr::lit(i)),
            Kind::Float(x) => Ok(Expr::lit(x)),
            Kind::Str(s) => Ok(Expr::lit(s)),
            Kind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::lit(true)),
                "false" => Ok(Expr::lit(false)),
                "null" => Ok(Expr::Const(Literal::Null)),
                "and" | "or" | "not" | "in" => {
                    Err(self.error(start, &format!("unexpected keyword '{}'", name)))
                }
                _ => Ok(Expr::Field(name)),
            },
            Kind::LParen => {
                self.descend()?;
                let expr = self.or()?;
                self.expect(Kind::RParen, "')'")?;
                self.depth -= 1;
                Ok(expr)
            }
            _ => Err(self.error(start, "expected a field, literal or '('")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.peek_kind(), Some(Kind::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.or()?);
            match self.next() {
                Some(Token {
                    kind: Kind::Comma, ..
                }) => continue,
                Some(Token {
                    kind: Kind::RParen, ..
                }) => return Ok(args),
                Some(token) => return Err(self.error(token.start, "expected ',' or ')'")),
                None => return Err(self.error(self.input.len(), "expected ')'")),
            }
        }
    }

    fn list(&mut self) -> Result<Vec<Expr>> {
        self.expect(Kind::LBracket, "'['")?;
        let mut values = Vec::new();
        if matches!(self.peek_kind(), Some(Kind::RBracket)) {
            self.pos += 1;
            return Ok(values);
        }
        loop {
            values.push(self.postfix()?);
            match self.next() {
                Some(Token {
                    kind: Kind::Comma, ..
                }) => continue,
                Some(Token {
                    kind: Kind::RBracket,
                    ..
                }) => return Ok(values),
                Some(token) => return Err(self.error(token.start, "expected ',' or ']'")),
                None => return Err(self.error(self.input.len(), "expected ']'")),
            }
        }
    }
}

fn method_call(target: Expr, method: String, mut args: Vec<Expr>) -> Expr {
    match StringMatch::from_method(&method) {
        Some(kind) if args.len() == 1 => Expr::StringMatch {
            kind,
            target: Box::new(target),
            pattern: Box::new(args.remove(0)),
        },
        _ => Expr::Call {
            target: Box::new(target),
            method,
            args,
        },
    }
}
