//! Restricted arithmetic formulas for custom deduction rules.
//!
//! A formula is parsed once into a small expression tree and evaluated against
//! the wage base. The grammar only admits decimal literals, `+ - * /`, unary
//! minus, parentheses, the variable `salary` and the functions `min` and `max`:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | 'salary' | func '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// The only variable a formula may reference.
pub const SALARY_VARIABLE: &str = "salary";

/// Problems found while parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// The formula references a name other than `salary`.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The formula calls a function other than `min` or `max`.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// The formula is not well formed.
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        position: usize,
        /// What was expected.
        message: String,
    },

    /// A divisor evaluated to zero.
    #[error("division by zero")]
    DivisionByZero,

    /// An intermediate value left the representable range.
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Number(Decimal),
    Salary,
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

/// A parsed formula, ready to be evaluated any number of times.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::Formula;
/// use rust_decimal::Decimal;
///
/// let formula = Formula::parse("min(salary, 5000) * 0.02").unwrap();
/// assert_eq!(formula.evaluate(Decimal::new(8000, 0)).unwrap(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    source: String,
    root: Expr,
}

impl Formula {
    /// Parses a formula, rejecting unknown names and malformed input.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: source.len(),
        };
        let root = parser.expr()?;
        if let Some((position, token)) = parser.peek() {
            return Err(FormulaError::Syntax {
                position,
                message: format!("unexpected {}", token),
            });
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Evaluates the formula with `salary` bound to `salary`.
    pub fn evaluate(&self, salary: Decimal) -> Result<Decimal, FormulaError> {
        eval(&self.root, salary)
    }

    /// The formula text as written.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Parses and evaluates `source` in one step.
pub fn evaluate_formula(source: &str, salary: Decimal) -> Result<Decimal, FormulaError> {
    Formula::parse(source)?.evaluate(salary)
}

fn eval(expr: &Expr, salary: Decimal) -> Result<Decimal, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Salary => Ok(salary),
        Expr::Neg(inner) => Ok(-eval(inner, salary)?),
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs, salary)?;
            let b = eval(rhs, salary)?;
            match op {
                BinaryOp::Add => a.checked_add(b).ok_or(FormulaError::Overflow),
                BinaryOp::Sub => a.checked_sub(b).ok_or(FormulaError::Overflow),
                BinaryOp::Mul => a.checked_mul(b).ok_or(FormulaError::Overflow),
                BinaryOp::Div => {
                    if b.is_zero() {
                        return Err(FormulaError::DivisionByZero);
                    }
                    a.checked_div(b).ok_or(FormulaError::Overflow)
                }
            }
        }
        Expr::Call(func, args) => {
            let mut values = args.iter().map(|arg| eval(arg, salary));
            // The parser guarantees at least one argument.
            let mut acc = values.next().unwrap_or(Ok(Decimal::ZERO))?;
            for value in values {
                let value = value?;
                acc = match func {
                    Function::Min => acc.min(value),
                    Function::Max => acc.max(value),
                };
            }
            Ok(acc)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Ident(name) => write!(f, "'{}'", name),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[start..end];
            let number = Decimal::from_str(text).map_err(|_| FormulaError::Syntax {
                position: start,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push((start, Token::Number(number)));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((start, Token::Ident(source[start..end].to_string())));
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(FormulaError::Syntax {
                    position: start,
                    message: format!("unexpected character '{}'", other),
                });
            }
        };
        tokens.push((start, token));
        chars.next();
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    pos: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(usize, &Token)> {
        self.tokens.get(self.pos).map(|(p, t)| (*p, t))
    }

    fn advance(&mut self) -> Option<(usize, &Token)> {
        let token = self.tokens.get(self.pos).map(|(p, t)| (*p, t));
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some((_, token)) if *token == expected => Ok(()),
            Some((position, token)) => Err(FormulaError::Syntax {
                position,
                message: format!("expected {}, found {}", expected, token),
            }),
            None => Err(FormulaError::Syntax {
                position: self.end,
                message: format!("expected {}, found end of formula", expected),
            }),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some((_, Token::Plus)) => BinaryOp::Add,
                Some((_, Token::Minus)) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some((_, Token::Star)) => BinaryOp::Mul,
                Some((_, Token::Slash)) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some((_, Token::Minus)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some((_, Token::Plus)) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let end = self.end;
        let (position, token) = match self.advance() {
            Some((position, token)) => (position, token.clone()),
            None => {
                return Err(FormulaError::Syntax {
                    position: end,
                    message: "unexpected end of formula".to_string(),
                });
            }
        };

        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if matches!(self.peek(), Some((_, Token::LParen))) {
                    self.pos += 1;
                    let func = match name.to_ascii_lowercase().as_str() {
                        "min" => Function::Min,
                        "max" => Function::Max,
                        _ => return Err(FormulaError::UnknownFunction(name)),
                    };
                    let mut args = vec![self.expr()?];
                    while matches!(self.peek(), Some((_, Token::Comma))) {
                        self.pos += 1;
                        args.push(self.expr()?);
                    }
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call(func, args))
                } else if name.eq_ignore_ascii_case(SALARY_VARIABLE) {
                    Ok(Expr::Salary)
                } else {
                    Err(FormulaError::UnknownVariable(name))
                }
            }
            other => Err(FormulaError::Syntax {
                position,
                message: format!("unexpected {}", other),
            }),
        }
    }
}
