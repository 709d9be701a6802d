//! Numeric expressions used by `NumExpr`/`NumExprTex` tags and NAT grading.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := number | ident | ident '(' args ')' | '(' expr ')'
//! ```
//!
//! All arithmetic is `f64`; `^` is right-associative and binds tighter than
//! unary minus, so `-2^2` is `-4`.
//!
//! Parsing rejects trees deeper than [`MAX_DEPTH`]. Every parenthesis,
//! prefix sign and chained operator counts as one level.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use thiserror::Error;

use crate::model::ParameterMap;

/// Errors from parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("empty expression")]
    Empty,

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("expression does not evaluate to a finite number")]
    NotFinite,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    /// Explicit parentheses from the source, kept for TeX output.
    Group(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Deepest expression tree the parser accepts.
pub const MAX_DEPTH: usize = 256;

const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// Returns the value of a built-in constant.
pub fn constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
}

impl Expr {
    /// Free variable names, excluding function names.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                out.insert(name.as_str());
            }
            Expr::Neg(e) | Expr::Group(e) => e.collect_variables(out),
            Expr::Binary(_, l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_variables(out)),
        }
    }

    /// Evaluate with `lookup` resolving variables. Constants apply only when
    /// `lookup` has no value for the name.
    pub fn eval<F>(&self, lookup: &F) -> Result<f64, ExprError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Variable(name) => lookup(name)
                .or_else(|| constant(name))
                .ok_or_else(|| ExprError::UnknownVariable(name.clone()))?,
            Expr::Neg(e) => -e.eval(lookup)?,
            Expr::Group(e) => e.eval(lookup)?,
            Expr::Binary(op, l, r) => {
                let (a, b) = (l.eval(lookup)?, r.eval(lookup)?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(lookup))
                    .collect::<Result<Vec<_>, _>>()?;
                call(name, &values)?
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NotFinite)
        }
    }

    /// Render as TeX, replacing variables with `substitute(name)` when it
    /// returns a value.
    pub fn to_tex<F>(&self, substitute: &F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        self.write_tex(&mut out, substitute);
        out
    }

    fn write_tex<F>(&self, out: &mut String, substitute: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Expr::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Expr::Variable(name) => match substitute(name) {
                Some(value) => out.push_str(&value),
                None if name == "pi" => out.push_str("\\pi"),
                None => out.push_str(name),
            },
            Expr::Neg(e) => {
                out.push('-');
                e.write_tex(out, substitute);
            }
            Expr::Group(e) => {
                out.push_str("\\left(");
                e.write_tex(out, substitute);
                out.push_str("\\right)");
            }
            Expr::Binary(BinOp::Div, l, r) => {
                out.push_str("\\frac{");
                l.write_tex(out, substitute);
                out.push_str("}{");
                r.write_tex(out, substitute);
                out.push('}');
            }
            Expr::Binary(BinOp::Pow, l, r) => {
                l.write_tex(out, substitute);
                out.push_str("^{");
                r.write_tex(out, substitute);
                out.push('}');
            }
            Expr::Binary(op, l, r) => {
                l.write_tex(out, substitute);
                out.push_str(match op {
                    BinOp::Add => " + ",
                    BinOp::Sub => " - ",
                    BinOp::Mul => " \\cdot ",
                    _ => " \\bmod ",
                });
                r.write_tex(out, substitute);
            }
            Expr::Call(name, args) if name == "sqrt" && args.len() == 1 => {
                out.push_str("\\sqrt{");
                args[0].write_tex(out, substitute);
                out.push('}');
            }
            Expr::Call(name, args) => {
                let _ = write!(out, "\\operatorname{{{name}}}\\left(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write_tex(out, substitute);
                }
                out.push_str("\\right)");
            }
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, ExprError> {
    let unary = |f: fn(f64) -> f64| -> Result<f64, ExprError> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(ExprError::Arity {
                name: name.to_string(),
                expected: "1",
                got: args.len(),
            }),
        }
    };
    match name {
        "sqrt" => unary(f64::sqrt),
        "abs" => unary(f64::abs),
        "ln" => unary(f64::ln),
        "log" => match args {
            [x] => Ok(x.log10()),
            [x, base] => Ok(x.log(*base)),
            _ => Err(ExprError::Arity {
                name: name.to_string(),
                expected: "1 or 2",
                got: args.len(),
            }),
        },
        "exp" => unary(f64::exp),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "min" | "max" => {
            if args.is_empty() {
                return Err(ExprError::Arity {
                    name: name.to_string(),
                    expected: "at least 1",
                    got: 0,
                });
            }
            let fold: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            Ok(args[1..].iter().copied().fold(args[0], fold))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

/// Returns `true` if `name` is a built-in function.
pub fn is_function(name: &str) -> bool {
    matches!(
        name,
        "sqrt"
            | "abs"
            | "ln"
            | "log"
            | "exp"
            | "sin"
            | "cos"
            | "tan"
            | "floor"
            | "ceil"
            | "round"
            | "min"
            | "max"
    )
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(s) => s.clone(),
            Token::Op(c) => c.to_string(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            // Scientific notation: 1e3, 2.5E-4
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    while j < bytes.len() && bytes[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let literal = &input[start..i];
            let value = literal
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedToken(literal.to_string()))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(input[start..i].to_string()));
            continue;
        }

        let token = match c {
            '+' | '-' | '*' | '/' | '%' | '^' => Token::Op(c),
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            _ => {
                let ch = input[i..].chars().next().unwrap_or(c);
                return Err(ExprError::UnexpectedChar { ch, offset: i });
            }
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(ExprError::UnexpectedToken(t.describe())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let depth = self.depth;
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            self.descend()?;
            let rhs = self.term()?;
            let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            self.descend()?;
            let rhs = self.unary()?;
            let op = match op {
                '*' => BinOp::Mul,
                '/' => BinOp::Div,
                _ => BinOp::Rem,
            };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        self.descend()?;
        let parsed = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|e| Expr::Neg(Box::new(e))),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        parsed
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expr()?);
                            if self.peek() == Some(&Token::Comma) {
                                self.pos += 1;
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen)?;
                    if !is_function(&name) {
                        return Err(ExprError::UnknownFunction(name));
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            Some(t) => Err(ExprError::UnexpectedToken(t.describe())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parse an expression string.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.next() {
        None => Ok(expr),
        Some(t) => Err(ExprError::UnexpectedToken(t.describe())),
    }
}

/// Parse and evaluate `input` with numeric values taken from `params`.
pub fn evaluate(input: &str, params: &ParameterMap) -> Result<f64, ExprError> {
    parse(input)?.eval(&|name| params.get(name).and_then(|v| v.as_number()))
}

/// Format a computed value the way it is shown to students.
pub fn format_number(value: f64) -> String {
    // Avoid "-0" for results like -0.0 * x.
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}
