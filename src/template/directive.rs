//! Directive grammar.
//!
//! ```text
//! value   := "{{" field_path "}}"
//! block   := "{%" keyword body "%}"
//! keyword := "for" IDENT "in" field_path | "endfor" | "if" expression | "endif"
//! ```
//!
//! The malformed delimiter variants `{% … }}` and `{ % … %}` are accepted too;
//! the opening delimiter decides whether a placeholder is a value or a block.

use super::value::is_ident_char;
use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    For,
    EndFor,
    If,
    EndIf,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "for" => Keyword::For,
    "endfor" => Keyword::EndFor,
    "if" => Keyword::If,
    "endif" => Keyword::EndIf,
};

/// A classified placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `{{ field_path }}`
    Value(&'a str),
    /// `{% for variable in source %}`
    ForStart { variable: &'a str, source: &'a str },
    /// `{% endfor %}`
    EndFor,
    /// `{% if expression %}`
    IfStart { expression: &'a str },
    /// `{% endif %}`
    EndIf,
    /// A block placeholder with an unknown or malformed keyword
    Unknown,
}

impl<'a> Directive<'a> {
    /// Classify the raw text of a placeholder span, delimiters included.
    pub fn parse(raw: &'a str) -> Self {
        let Some(rest) = raw.strip_prefix('{') else {
            return Directive::Unknown;
        };
        let rest = rest.trim_start();
        let (is_block, rest) = if let Some(r) = rest.strip_prefix('%') {
            (true, r)
        } else if let Some(r) = rest.strip_prefix('{') {
            (false, r)
        } else {
            return Directive::Unknown;
        };
        let Some(rest) = rest.strip_suffix('}') else {
            return Directive::Unknown;
        };
        let inner = rest
            .strip_suffix('%')
            .or_else(|| rest.strip_suffix('}'))
            .unwrap_or(rest)
            .trim();

        if !is_block {
            return Directive::Value(inner);
        }

        let word_end = inner.find(char::is_whitespace).unwrap_or(inner.len());
        let (word, body) = inner.split_at(word_end);
        match KEYWORDS.get(word) {
            Some(Keyword::For) => parse_for(body.trim()),
            Some(Keyword::EndFor) if body.trim().is_empty() => Directive::EndFor,
            Some(Keyword::If) if !body.trim().is_empty() => Directive::IfStart {
                expression: body.trim(),
            },
            Some(Keyword::EndIf) if body.trim().is_empty() => Directive::EndIf,
            _ => Directive::Unknown,
        }
    }

    #[inline]
    pub fn is_for_start(&self) -> bool {
        matches!(self, Directive::ForStart { .. })
    }

    #[inline]
    pub fn is_if_start(&self) -> bool {
        matches!(self, Directive::IfStart { .. })
    }
}

fn parse_for(body: &str) -> Directive<'_> {
    let var_end = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
    let (variable, rest) = body.split_at(var_end);
    if variable.is_empty() || variable.starts_with(|c: char| c.is_ascii_digit()) {
        return Directive::Unknown;
    }
    let rest = rest.trim_start();
    match rest.strip_prefix("in") {
        Some(source) if source.starts_with(char::is_whitespace) && !source.trim().is_empty() => {
            Directive::ForStart {
                variable,
                source: source.trim(),
            }
        },
        _ => Directive::Unknown,
    }
}

pub(crate) fn closing_quote(open: char) -> Option<char> {
    match open {
        '\'' => Some('\''),
        '"' => Some('"'),
        '\u{2018}' => Some('\u{2019}'),
        '\u{201C}' => Some('\u{201D}'),
        _ => None,
    }
}

/// Replace each standalone occurrence of `variable` in `text` with `base`.
///
/// An occurrence must start a path (not preceded by an identifier character
/// or `.`) and be a whole identifier (not followed by an identifier
/// character). Quoted string literals are left alone. Returns `None` when
/// nothing was replaced.
pub fn rewrite_identifier(text: &str, variable: &str, base: &str) -> Option<String> {
    if variable.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(text.len() + base.len());
    let mut prev: Option<char> = None;
    let mut quote: Option<char> = None;
    let mut changed = false;
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        if let Some(close) = quote {
            if c == close {
                quote = None;
            }
        } else if let Some(close) = closing_quote(c) {
            quote = Some(close);
        } else if text[i..].starts_with(variable)
            && prev.is_none_or(|p| !is_ident_char(p) && p != '.')
            && text[i + variable.len()..].chars().next().is_none_or(|n| !is_ident_char(n))
        {
            out.push_str(base);
            i += variable.len();
            prev = variable.chars().last();
            changed = true;
            continue;
        }
        out.push(c);
        prev = Some(c);
        i += c.len_utf8();
    }

    changed.then_some(out)
}

/// Rewrite the loop variable inside one placeholder's raw text.
///
/// A nested `for` keeps its own variable and only has its source rewritten.
pub fn rewrite_loop_variable(raw: &str, variable: &str, base: &str) -> Option<String> {
    match Directive::parse(raw) {
        Directive::ForStart {
            variable: inner,
            source,
        } => {
            let source = rewrite_identifier(source, variable, base)?;
            Some(format!("{{% for {inner} in {source} %}}"))
        },
        _ => rewrite_identifier(raw, variable, base),
    }
}
