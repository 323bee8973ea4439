//! Built-in boolean expression evaluator (tokens + recursive descent parser).

use super::Evaluator;
use crate::error::{Error, Result};
use crate::template::value::{FieldPath, Value, is_ident_char};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(FieldPath),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

fn fail(msg: impl Into<String>) -> Error {
    Error::Evaluation(msg.into())
}

/// Whether a `-` after `last` starts a number rather than following a value.
fn expects_operand(last: Option<&Token>) -> bool {
    !matches!(
        last,
        Some(Token::Path(_) | Token::Number(_) | Token::Str(_) | Token::True | Token::False | Token::Null | Token::RParen)
    )
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut buf = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == ch => break,
                    Some(c) => buf.push(c),
                    None => return Err(fail(format!("Unterminated string literal in {input:?}"))),
                }
            }
            tokens.push(Token::Str(buf));
            continue;
        }

        let negative = ch == '-' && expects_operand(tokens.last()) && {
            let mut ahead = chars.clone();
            ahead.next();
            ahead.peek().is_some_and(char::is_ascii_digit)
        };
        if ch.is_ascii_digit() || negative {
            let mut buf = String::new();
            if negative {
                buf.push(ch);
                chars.next();
            }
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_digit() || c == '.') {
                    break;
                }
                buf.push(c);
                chars.next();
            }
            let n = fast_float2::parse::<f64, _>(&buf).map_err(|_| fail(format!("Invalid number {buf:?}")))?;
            tokens.push(Token::Number(n));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let mut buf = String::new();
            while let Some(&c) = chars.peek() {
                if !(is_ident_char(c) || matches!(c, '.' | '[' | ']')) {
                    break;
                }
                buf.push(c);
                chars.next();
            }
            tokens.push(match buf.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "true" | "True" => Token::True,
                "false" | "False" => Token::False,
                "null" | "None" => Token::Null,
                _ => Token::Path(buf),
            });
            continue;
        }

        chars.next();
        let next = chars.peek().copied();
        let mut two = |token: Token| {
            chars.next();
            token
        };
        let token = match (ch, next) {
            ('=', Some('=')) => two(Token::Eq),
            ('=', Some('~')) => two(Token::Contains),
            ('!', Some('=')) => two(Token::Ne),
            ('<', Some('=')) => two(Token::Le),
            ('>', Some('=')) => two(Token::Ge),
            ('&', Some('&')) => two(Token::And),
            ('|', Some('|')) => two(Token::Or),
            ('<', _) => Token::Lt,
            ('>', _) => Token::Gt,
            ('!', _) => Token::Not,
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            _ => return Err(fail(format!("Unexpected character {ch:?} in {input:?}"))),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Grammar:
///
/// ```text
/// or      := and (("or" | "||") and)*
/// and     := not (("and" | "&&") not)*
/// not     := ("not" | "!") not | compare
/// compare := primary (("==" | "!=" | "<" | "<=" | ">" | ">=" | "=~") primary)?
/// primary := literal | field_path | "(" or ")"
/// ```
struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            lhs = Expr::Or(Box::new(lhs), Box::new(self.parse_and()?));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            lhs = Expr::And(Box::new(lhs), Box::new(self.parse_not()?));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            Some(Token::Contains) => CompareOp::Contains,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_primary()?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Path(p)) => Ok(Expr::Path(FieldPath::parse(&p)?)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(fail("Expected ')'")),
                }
            },
            Some(token) => Err(fail(format!("Unexpected token {token:?}"))),
            None => Err(fail("Unexpected end of expression")),
        }
    }
}

fn parse_expression(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(fail("Empty expression"));
    }
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(fail(format!("Unexpected trailing token {token:?} in {input:?}")));
    }
    Ok(expr)
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => Some(*n),
        Value::String(s) => fast_float2::parse::<f64, _>(s.trim()).ok(),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            matches!((as_number(a), as_number(b)), (Some(x), Some(y)) if x == y)
        },
        _ => a == b,
    }
}

fn compare(op: CompareOp, a: &Value, b: &Value) -> Result<bool> {
    let ordering = |a: &Value, b: &Value| -> Result<Option<Ordering>> {
        Ok(match (a, b) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => return Err(fail(format!("Cannot compare {a:?} with {b:?}"))),
            },
        })
    };
    Ok(match op {
        CompareOp::Eq => values_equal(a, b),
        CompareOp::Ne => !values_equal(a, b),
        CompareOp::Lt => ordering(a, b)? == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(a, b)?, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering(a, b)? == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering(a, b)?, Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Contains => match a {
            Value::List(items) => items.iter().any(|item| values_equal(item, b)),
            Value::String(s) => s.contains(b.display("").as_str()),
            Value::Map(map) => matches!(b, Value::String(k) if map.contains_key(k)),
            _ => false,
        },
    })
}

fn eval(expr: &Expr, context: &Value) -> Result<Value> {
    Ok(match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Path(path) => context.lookup(path).cloned().unwrap_or_default(),
        Expr::Not(inner) => Value::Bool(!eval(inner, context)?.is_truthy()),
        Expr::And(l, r) => Value::Bool(eval(l, context)?.is_truthy() && eval(r, context)?.is_truthy()),
        Expr::Or(l, r) => Value::Bool(eval(l, context)?.is_truthy() || eval(r, context)?.is_truthy()),
        Expr::Compare(op, l, r) => Value::Bool(compare(*op, &eval(l, context)?, &eval(r, context)?)?),
    })
}

/// Default evaluator: comparisons, boolean connectives and field paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEvaluator;

impl Evaluator for BasicEvaluator {
    fn evaluate(&self, expression: &str, context: &Value) -> Result<Value> {
        eval(&parse_expression(expression)?, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Value {
        serde_json::from_str(
            r#"{"a": true, "n": 3, "name": "Ann", "tags": ["x", "y"], "user": {"role": "admin", "age": 41}, "empty": ""}"#,
        )
        .unwrap()
    }

    fn check(expr: &str) -> bool {
        BasicEvaluator.evaluate(expr, &ctx()).unwrap().is_truthy()
    }

    #[test]
    fn test_comparisons_and_connectives() {
        assert!(check("a"));
        assert!(check("n == 3 and name == 'Ann'"));
        assert!(check("n > 2 && n <= 3"));
        assert!(check("user.role != \"guest\" or false"));
        assert!(check("not (n < 1)"));
        assert!(check("!empty"));
        assert!(!check("missing"));
        assert!(check("missing == null"));
        assert!(check("user.age >= 41"));
    }

    #[test]
    fn test_negative_numbers() {
        assert!(check("n > -1"));
        assert!(check("-2 < n"));
        assert!(check("not (n <= -3.5)"));
        assert!(check("(-1 < n) and n != -3"));
        assert_eq!(BasicEvaluator.evaluate("-0.25", &ctx()).unwrap(), Value::Number(-0.25));
    }

    #[test]
    fn test_membership() {
        assert!(check("tags =~ 'y'"));
        assert!(!check("tags =~ 'z'"));
        assert!(check("name =~ 'nn'"));
        assert!(check("user =~ 'role'"));
    }

    #[test]
    fn test_returns_raw_values() {
        assert_eq!(BasicEvaluator.evaluate("name", &ctx()).unwrap(), Value::from("Ann"));
        assert_eq!(BasicEvaluator.evaluate("tags[1]", &ctx()).unwrap(), Value::from("y"));
    }

    #[test]
    fn test_malformed_expressions() {
        for bad in ["", "a ==", "(a", "a b", "'open", "a # b", "name < 3", "n -1", "n > - 1", "n > --1"] {
            let err = BasicEvaluator.evaluate(bad, &ctx()).unwrap_err();
            assert!(matches!(err, Error::Evaluation(_)), "{bad:?}");
        }
    }
}
