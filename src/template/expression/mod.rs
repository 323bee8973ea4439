//! Conditional expressions.
//!
//! Template authors write conditions in a forgiving surface syntax (`a = b`,
//! `!name`, `tags includes 'x'`, word-processor "smart" quotes). This module
//! rewrites that syntax into what an [`Evaluator`] understands and prepares
//! the data context it runs against.

mod evaluator;

pub use evaluator::BasicEvaluator;

use super::directive::closing_quote;
use super::value::{Value, is_ident_char};
use crate::error::Result;
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

/// A boolean expression evaluator.
///
/// Implementations return the raw value of the expression; the caller
/// decides truthiness.
pub trait Evaluator {
    fn evaluate(&self, expression: &str, context: &Value) -> Result<Value>;
}

const SURFACE_PATTERNS: [&str; 6] = ["\u{2018}", "\u{2019}", "\u{201C}", "\u{201D}", " = ", " includes "];
const SURFACE_REPLACEMENTS: [&str; 6] = ["'", "'", "\"", "\"", " == ", " =~ "];

static SURFACE: Lazy<Option<AhoCorasick>> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(SURFACE_PATTERNS)
        .ok()
});

/// Rewrite the surface syntax into evaluator syntax.
///
/// - curly quotes become straight quotes
/// - a bare ` = ` becomes ` == `
/// - the word `includes` becomes the membership operator `=~`
/// - `!name` becomes `name == null`
///
/// Quoted literals are copied verbatim apart from their delimiters.
pub fn normalize(expression: &str) -> String {
    let mut replaced = String::with_capacity(expression.len() + 8);
    let mut rest = expression;
    while let Some((at, open, close)) = rest
        .char_indices()
        .find_map(|(i, c)| closing_quote(c).map(|close| (i, c, close)))
    {
        replaced.push_str(&replace_surface(&rest[..at]));
        let straight = if matches!(open, '"' | '\u{201C}') { '"' } else { '\'' };
        let body = &rest[at + open.len_utf8()..];
        replaced.push(straight);
        match body.find(close) {
            Some(len) => {
                replaced.push_str(&body[..len]);
                replaced.push(straight);
                rest = &body[len + close.len_utf8()..];
            },
            None => {
                replaced.push_str(body);
                rest = "";
            },
        }
    }
    replaced.push_str(&replace_surface(rest));
    rewrite_negations(&replaced)
}

fn replace_surface(text: &str) -> String {
    match SURFACE.as_ref() {
        Some(ac) => ac.replace_all(text, &SURFACE_REPLACEMENTS),
        None => text.to_string(),
    }
}

fn rewrite_negations(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    let mut prev: Option<char> = None;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(c);
        } else if c == '!'
            && prev.is_none_or(|p| p.is_whitespace() || p == '(')
            && chars.peek().is_some_and(|&n| n.is_alphabetic() || n == '_')
        {
            let mut token = String::new();
            while let Some(&n) = chars.peek() {
                if !(is_ident_char(n) || matches!(n, '.' | '[' | ']')) {
                    break;
                }
                token.push(n);
                chars.next();
            }
            out.push_str(&token);
            out.push_str(" == null");
            prev = token.chars().last();
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Coerce numeric-looking strings to numbers, recursively.
fn coerce(value: &Value) -> Value {
    match value {
        Value::String(s) if looks_numeric(s) => fast_float2::parse::<f64, _>(s)
            .map(Value::Number)
            .unwrap_or_else(|_| value.clone()),
        Value::List(items) => Value::List(items.iter().map(coerce).collect()),
        Value::Map(map) => Value::Map(map.iter().map(|(k, v)| (k.clone(), coerce(v))).collect()),
        _ => value.clone(),
    }
}

fn looks_numeric(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        && s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

/// Build the context expressions run against.
///
/// Numeric-looking strings become numbers, and `yes`/`no` are bound to their
/// own names so conditions can compare against them unquoted.
pub fn prepare_context(data: &Value) -> Value {
    let mut context = coerce(data);
    if let Value::Map(map) = &mut context {
        for word in ["yes", "no"] {
            map.entry(word.to_string()).or_insert_with(|| Value::from(word));
        }
    }
    context
}

/// Connects block conditions to an evaluator over a prepared context.
pub struct ExpressionBridge<'e> {
    evaluator: &'e dyn Evaluator,
    context: Value,
}

impl<'e> ExpressionBridge<'e> {
    pub fn new(evaluator: &'e dyn Evaluator, data: &Value) -> Self {
        Self {
            evaluator,
            context: prepare_context(data),
        }
    }

    /// Evaluate a condition in surface syntax.
    pub fn condition(&self, expression: &str) -> Result<bool> {
        let normalized = normalize(expression);
        let result = self.evaluator.evaluate(&normalized, &self.context)?;
        tracing::trace!(expression, normalized = %normalized, ?result, "evaluated condition");
        Ok(result.is_truthy())
    }
}
