//! Lazy iterator values.
//!
//! `step` and `reverse_each` do not materialize their input; they wrap it
//! in an [`IteratorValue`] that the iteration driver walks on demand.
//! Integers iterate as `0..n`, strings by character, hashes by entry.

use std::hash::{Hash, Hasher};

use crate::error::{EvalResult, EvaluationError};
use crate::value::Value;

/// A lazy view over an iterable value with a step and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorValue {
    source: Value,
    step: i64,
    reversed: bool,
}

impl Hash for IteratorValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.step.hash(state);
        self.reversed.hash(state);
    }
}

impl IteratorValue {
    /// Wraps an iterable value with a positive step.
    pub fn stepped(source: Value, step: i64) -> Result<Self, EvaluationError> {
        if step <= 0 {
            return Err(EvaluationError::without_span(format!(
                "step must be a positive integer but was given {step}"
            )));
        }
        let (inner_source, inner_step, reversed) = Self::unwrap_source(source);
        Ok(Self {
            source: inner_source,
            step: inner_step.saturating_mul(step),
            reversed,
        })
    }

    /// Wraps an iterable value with reversed direction.
    #[must_use]
    pub fn reversed(source: Value) -> Self {
        let (inner_source, step, reversed) = Self::unwrap_source(source);
        Self {
            source: inner_source,
            step,
            reversed: !reversed,
        }
    }

    /// Stacked iterators flatten into one view.
    fn unwrap_source(source: Value) -> (Value, i64, bool) {
        if let Value::Iterator(inner) = source {
            (inner.source.clone(), inner.step, inner.reversed)
        } else {
            (source, 1, false)
        }
    }

    #[must_use]
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Yields each `(key, value)` entry in iteration order.
    pub fn each_entry(&self, f: &mut dyn FnMut(Value, Value) -> EvalResult<bool>) -> EvalResult<bool> {
        let mut entries = Vec::new();
        collect_entries(&self.source, &mut entries)?;
        if self.reversed {
            entries.reverse();
        }
        for (key, value) in entries.into_iter().step_by(self.step.unsigned_abs() as usize) {
            if !f(key, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The number of entries the iterator produces.
    #[must_use]
    pub fn len(&self) -> usize {
        let total = entry_count(&self.source);
        let step = self.step.unsigned_abs() as usize;
        total.div_ceil(step.max(1))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes the remaining entries as an array (hash sources become
    /// `[key, value]` pair arrays).
    #[must_use]
    pub fn materialize(&self) -> Value {
        let mut values = Vec::new();
        let produces_pairs = matches!(self.source, Value::Hash(_));
        let _ = self.each_entry(&mut |key, value| {
            if produces_pairs {
                values.push(Value::array(vec![key, value]));
            } else {
                values.push(value);
            }
            Ok(true)
        });
        Value::array(values)
    }
}

/// Yields `(key, value)` entries for any iterable value: array indices,
/// hash keys, `0..n` for a non-negative integer, characters of a string,
/// or an iterator's own view. Fails for non-iterable values.
pub fn each_entry(value: &Value, f: &mut dyn FnMut(Value, Value) -> EvalResult<bool>) -> EvalResult<bool> {
    if let Value::Iterator(iterator) = value {
        return iterator.each_entry(f);
    }
    let mut entries = Vec::new();
    collect_entries(value, &mut entries)?;
    for (key, entry) in entries {
        if !f(key, entry)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The number of entries iteration over `value` yields.
#[must_use]
pub fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(elements) => elements.len(),
        Value::Hash(hash) => hash.len(),
        Value::Integer(n) => usize::try_from(*n).unwrap_or(0),
        Value::String(s) => s.chars().count(),
        Value::Iterator(iterator) => iterator.len(),
        _ => 0,
    }
}

/// True when iteration over the value is defined.
#[must_use]
pub fn is_iterable(value: &Value) -> bool {
    match value {
        Value::Array(_) | Value::Hash(_) | Value::String(_) | Value::Iterator(_) => true,
        Value::Integer(n) => *n >= 0,
        Value::Type(t) => t.iterable_range().is_some(),
        _ => false,
    }
}

fn collect_entries(value: &Value, entries: &mut Vec<(Value, Value)>) -> EvalResult<()> {
    match value {
        Value::Array(elements) => {
            for (index, element) in elements.iter().enumerate() {
                entries.push((Value::Integer(index as i64), element.clone()));
            }
        }
        Value::Hash(hash) => {
            for (key, entry) in hash.iter() {
                entries.push((key.clone(), entry.clone()));
            }
        }
        Value::Integer(n) if *n >= 0 => {
            for index in 0..*n {
                entries.push((Value::Integer(index), Value::Integer(index)));
            }
        }
        Value::String(s) => {
            for (index, c) in s.chars().enumerate() {
                entries.push((Value::Integer(index as i64), Value::String(c.to_string())));
            }
        }
        Value::Iterator(iterator) => {
            iterator.each_entry(&mut |key, entry| {
                entries.push((key, entry));
                Ok(true)
            })?;
        }
        Value::Type(t) => {
            if let Some((from, to)) = t.iterable_range() {
                for (index, n) in (from..=to).enumerate() {
                    entries.push((Value::Integer(index as i64), Value::Integer(n)));
                }
            } else {
                return Err(not_iterable(value));
            }
        }
        _ => return Err(not_iterable(value)),
    }
    Ok(())
}

fn not_iterable(value: &Value) -> EvaluationError {
    EvaluationError::without_span(format!(
        "values of type {} cannot be iterated",
        crate::types::type_of(value)
    ))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn collect(value: &Value) -> Vec<(Value, Value)> {
        let mut out = Vec::new();
        each_entry(value, &mut |key, entry| {
            out.push((key, entry));
            Ok(true)
        })
        .unwrap();
        out
    }

    #[test]
    fn integer_iterates_from_zero() {
        let entries = collect(&Value::Integer(3));
        assert_eq!(
            entries.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>(),
            vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]
        );
    }

    #[test]
    fn hash_iterates_in_insertion_order() {
        let mut hash = IndexMap::new();
        hash.insert(Value::string("b"), Value::Integer(2));
        hash.insert(Value::string("a"), Value::Integer(1));
        let entries = collect(&Value::hash(hash));
        assert_eq!(entries[0].0, Value::string("b"));
        assert_eq!(entries[1].0, Value::string("a"));
    }

    #[test]
    fn reverse_and_step_compose() {
        let iterator = IteratorValue::stepped(
            Value::Iterator(std::rc::Rc::new(IteratorValue::reversed(Value::Integer(6)))),
            2,
        )
        .unwrap();
        let mut seen = Vec::new();
        iterator
            .each_entry(&mut |_, value| {
                seen.push(value);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![Value::Integer(5), Value::Integer(3), Value::Integer(1)]);
    }

    #[test]
    fn string_iterates_by_character() {
        let entries = collect(&Value::string("ab"));
        assert_eq!(entries[1].1, Value::string("b"));
    }

    #[test]
    fn non_iterable_errors() {
        let error = each_entry(&Value::Float(1.0), &mut |_, _| Ok(true)).unwrap_err();
        assert!(error.message.contains("cannot be iterated"));
    }
}
