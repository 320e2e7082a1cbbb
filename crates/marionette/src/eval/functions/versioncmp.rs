//! The `versioncmp` function: compares two version strings, returning
//! -1, 0, or 1.
//!
//! Versions split into runs of digits and non-digits; digit runs compare
//! numerically, other runs lexicographically, and a shorter version that
//! is a prefix of the longer compares less.

use std::cmp::Ordering;

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("versioncmp");
    descriptor.add(signature(vec![Type::string(), Type::string()], 2, 2), versioncmp);
    descriptor
}

fn versioncmp(_context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let (Value::String(left), Value::String(right)) = (&call.args[0], &call.args[1]) else {
        unreachable!("guarded by the dispatch signature");
    };
    let ordering = compare_versions(left, right);
    Ok(Value::Integer(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

fn compare_versions(left: &str, right: &str) -> Ordering {
    let left_runs = runs(left);
    let right_runs = runs(right);
    for (l, r) in left_runs.iter().zip(right_runs.iter()) {
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            _ => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left_runs.len().cmp(&right_runs.len())
}

/// Splits a version into alternating digit and non-digit runs, dropping
/// separator characters.
fn runs(version: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;
    for c in version.chars() {
        if c == '.' || c == '-' || c == '_' {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            runs.push(std::mem::take(&mut current));
        }
        current_is_digit = is_digit;
        current.push(c);
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_runs_compare_numerically() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0rc1", "1.0rc2"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }
}
