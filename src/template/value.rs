//! Data context values and field paths.

use crate::error::{Error, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// A value in the data context.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Resolve a field path against this value. A missing step yields `None`.
    pub fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = self;
        for segment in &path.segments {
            current = current.step(segment)?;
        }
        Some(current)
    }

    fn step(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Map(map), PathSegment::Key(key)) => map.get(key.as_str()),
            // A one-element list stands for its element, so `items.name`
            // reads the only item.
            (Value::List(list), PathSegment::Key(_)) if list.len() == 1 => list[0].step(segment),
            (Value::List(list), PathSegment::Index(i)) => list.get(*i),
            _ => None,
        }
    }

    /// Number of loop iterations this value drives.
    ///
    /// Lists iterate their elements; null, empty strings and empty lists
    /// iterate zero times; anything else is a single item.
    pub fn item_count(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::List(list) => list.len(),
            Value::String(s) if s.is_empty() => 0,
            _ => 1,
        }
    }

    /// `false` only for `false` itself and empty or absent values.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => false,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            _ => true,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the value as document text; `missing` stands in for null.
    pub fn display(&self, missing: &str) -> String {
        match self {
            Value::Null => missing.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::List(list) => list
                .iter()
                .map(|v| v.display(missing))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(_) => String::new(),
        }
    }
}

/// Integral values print without a fraction, everything else round-trips.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any template data value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed field path: `identifier ('.' identifier | '[' integer ']')*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub segments: SmallVec<[PathSegment; 4]>,
}

#[inline]
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl FieldPath {
    /// Parse a field path, tolerating surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::Evaluation(format!("Invalid field path: {input:?}"));
        let text = input.trim();
        let mut segments = SmallVec::new();
        let mut chars = text.char_indices().peekable();
        let mut expect_ident = true;

        while let Some(&(pos, c)) = chars.peek() {
            if expect_ident {
                if !(c.is_alphabetic() || c == '_') {
                    return Err(invalid());
                }
                let mut end = text.len();
                while let Some(&(p, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        end = p;
                        break;
                    }
                    chars.next();
                }
                segments.push(PathSegment::Key(text[pos..end].to_string()));
                expect_ident = false;
                continue;
            }
            chars.next();
            match c {
                '.' => expect_ident = true,
                '[' => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, ']')) => break,
                            Some((_, d)) if d.is_ascii_digit() => digits.push(d),
                            _ => return Err(invalid()),
                        }
                    }
                    segments.push(PathSegment::Index(digits.parse().map_err(|_| invalid())?));
                },
                _ => return Err(invalid()),
            }
        }

        if expect_ident {
            return Err(invalid());
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}
