//! Runtime values.
//!
//! A tagged variant over everything an expression can evaluate to. Large
//! payloads (arrays, hashes, iterators) sit behind `Rc` so cloning a value
//! is cheap and sharing is observable: copy-on-write sites (the `+>`
//! append operator, match-scope capture) inspect `Rc::strong_count` and
//! only allocate when a value is actually shared.

pub mod iterator;

use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::Type;

pub use iterator::IteratorValue;

/// An insertion-ordered mapping from values to values.
pub type ValueHash = IndexMap<Value, Value>;

/// A compiled regex value, remembering its source pattern.
///
/// Equality and hashing use the pattern text; the compiled program is
/// shared and never compared.
#[derive(Debug, Clone)]
pub struct ValueRegex {
    source: String,
    pattern: Rc<regex::Regex>,
}

impl ValueRegex {
    /// Compiles a pattern, failing with the regex crate's message.
    pub fn new(source: impl Into<String>) -> Result<Self, String> {
        let source = source.into();
        match regex::Regex::new(&source) {
            Ok(pattern) => Ok(Self {
                pattern: Rc::new(pattern),
                source,
            }),
            Err(error) => Err(error.to_string()),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn pattern(&self) -> &regex::Regex {
        &self.pattern
    }
}

impl PartialEq for ValueRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ValueRegex {}

impl Hash for ValueRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

/// A runtime value.
///
/// `PartialEq`/`Eq`/`Hash` are structural (floats by bit pattern) and are
/// what hash keys and set-like dedup use. The language's `==` operator has
/// different rules (numeric cross-type equality, case-insensitive strings)
/// and lives in [`Value::equals`].
#[derive(Debug, Clone)]
pub enum Value {
    Undef,
    /// The `default` keyword as a value.
    Default,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Regex(ValueRegex),
    /// A type as a value (`Integer[1, 10]`, `Notify['a']`, …).
    Type(Type),
    Array(Rc<Vec<Value>>),
    Hash(Rc<ValueHash>),
    /// A lazy iterable view with step and direction.
    Iterator(Rc<IteratorValue>),
}

impl Value {
    /// Builds an array value from elements.
    #[must_use]
    pub fn array(elements: Vec<Value>) -> Self {
        Self::Array(Rc::new(elements))
    }

    /// Builds a hash value from pairs, preserving insertion order.
    #[must_use]
    pub fn hash(pairs: ValueHash) -> Self {
        Self::Hash(Rc::new(pairs))
    }

    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// Truthiness: only `undef` and `false` are false; everything else
    /// (including `''` and `0`) is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Undef | Self::Boolean(false))
    }

    #[must_use]
    pub fn is_undef(&self) -> bool {
        matches!(self, Self::Undef)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(elements) => Some(elements),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_hash(&self) -> Option<&ValueHash> {
        match self {
            Self::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Self::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Language equality (`==`): numbers compare across integer/float,
    /// strings compare case-insensitively, collections recurse.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undef, Self::Undef) | (Self::Default, Self::Default) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => (*a as f64) == *b,
            (Self::String(a), Self::String(b)) => a.eq_ignore_ascii_case(b),
            (Self::Regex(a), Self::Regex(b)) => a.source == b.source,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Self::Hash(a), Self::Hash(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.equals(other)))
            }
            _ => false,
        }
    }

    /// Converts to an array per the language rules: arrays pass through,
    /// hashes become `[key, value]` pairs when `convert_hash` is set,
    /// `undef` becomes empty, and any other value wraps in a single
    /// element.
    #[must_use]
    pub fn into_elements(self, convert_hash: bool) -> Vec<Value> {
        match self {
            Self::Array(elements) => match Rc::try_unwrap(elements) {
                Ok(elements) => elements,
                Err(shared) => shared.as_ref().clone(),
            },
            Self::Hash(hash) if convert_hash => hash
                .iter()
                .map(|(key, value)| Value::array(vec![key.clone(), value.clone()]))
                .collect(),
            Self::Undef => Vec::new(),
            other => vec![other],
        }
    }

    /// Projects the value for the catalog's JSON output.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undef => serde_json::Value::Null,
            Self::Default => serde_json::Value::String("default".to_owned()),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Regex(r) => serde_json::Value::String(format!("/{}/", r.source())),
            Self::Type(t) => serde_json::Value::String(t.to_string()),
            Self::Array(elements) => serde_json::Value::Array(elements.iter().map(Value::to_json).collect()),
            Self::Hash(hash) => {
                let mut object = serde_json::Map::with_capacity(hash.len());
                for (key, value) in hash.iter() {
                    object.insert(key.to_string(), value.to_json());
                }
                serde_json::Value::Object(object)
            }
            Self::Iterator(iterator) => iterator.materialize().to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undef, Self::Undef) | (Self::Default, Self::Default) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Self::Iterator(a), Self::Iterator(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Undef | Self::Default => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::Regex(r) => r.hash(state),
            Self::Type(t) => t.hash(state),
            Self::Array(elements) => {
                for element in elements.iter() {
                    element.hash(state);
                }
            }
            Self::Hash(hash) => {
                for (key, value) in hash.iter() {
                    key.hash(state);
                    value.hash(state);
                }
            }
            Self::Iterator(iterator) => iterator.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undef => Ok(()),
            Self::Default => f.write_str("default"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(value) => {
                let mut buffer = ryu::Buffer::new();
                f.write_str(buffer.format(*value))
            }
            Self::String(s) => f.write_str(s),
            Self::Regex(r) => write!(f, "/{}/", r.source()),
            Self::Type(t) => write!(f, "{t}"),
            Self::Array(elements) => {
                f.write_char('[')?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_char(']')
            }
            Self::Hash(hash) => {
                f.write_char('{')?;
                for (index, (key, value)) in hash.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} => {value}")?;
                }
                f.write_char('}')
            }
            Self::Iterator(iterator) => write!(f, "{}", iterator.materialize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Undef.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::Integer(0).is_truthy());
    }

    #[test]
    fn language_equality_crosses_numeric_types() {
        assert!(Value::Integer(1).equals(&Value::Float(1.0)));
        assert!(!Value::Integer(1).equals(&Value::Float(1.5)));
    }

    #[test]
    fn language_equality_ignores_string_case() {
        assert!(Value::string("Foo").equals(&Value::string("foo")));
        assert_ne!(Value::string("Foo"), Value::string("foo"));
    }

    #[test]
    fn into_elements_converts_hashes_to_pairs() {
        let mut hash = ValueHash::default();
        hash.insert(Value::string("a"), Value::Integer(1));
        let elements = Value::hash(hash).into_elements(true);
        assert_eq!(elements.len(), 1);
        assert_eq!(
            elements[0],
            Value::array(vec![Value::string("a"), Value::Integer(1)])
        );
    }

    #[test]
    fn undef_converts_to_empty_array() {
        assert!(Value::Undef.into_elements(true).is_empty());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::string("a")]).to_string(),
            "[1, a]"
        );
        assert_eq!(Value::Undef.to_string(), "");
    }
}
