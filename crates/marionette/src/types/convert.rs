//! String-to-numeric conversions for `Integer.new` and `Float.new`.
//!
//! The accepted syntax is wider than Rust's own parsers: leading and
//! trailing whitespace is allowed, and so is whitespace between the sign
//! and the first digit. Integer accepts `0x`/`0X`, `0b`/`0B`, and
//! leading-zero octal; Float accepts the hex and binary prefixes but
//! rejects octal.

use crate::error::ConversionError;
use crate::value::Value;

/// Converts a value to an integer: integers pass through, floats
/// truncate, booleans become 0/1, and strings parse per the prefix rules.
pub fn to_integer(from: &Value) -> Result<i64, ConversionError> {
    match from {
        Value::Integer(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i64),
        Value::Boolean(v) => Ok(i64::from(*v)),
        Value::String(s) => integer_from_string(s, 0),
        other => Err(ConversionError::new(format!(
            "cannot convert a value of type {} to Integer",
            crate::types::type_of(other)
        ))),
    }
}

/// Converts a value to a float; string parsing accepts the integer
/// prefixes except octal, plus ordinary decimal float syntax.
pub fn to_float(from: &Value) -> Result<f64, ConversionError> {
    match from {
        Value::Float(v) => Ok(*v),
        Value::Integer(v) => Ok(*v as f64),
        Value::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
        Value::String(s) => float_from_string(s),
        other => Err(ConversionError::new(format!(
            "cannot convert a value of type {} to Float",
            crate::types::type_of(other)
        ))),
    }
}

/// Parses an integer from a string. `radix` 0 selects by prefix
/// (`0x`/`0X` hex, `0b`/`0B` binary, leading 0 octal, else decimal).
pub fn integer_from_string(text: &str, radix: u32) -> Result<i64, ConversionError> {
    let invalid = || ConversionError::new(format!("string '{text}' cannot be converted to Integer"));
    let out_of_range = || ConversionError::new(format!("string '{text}' is out of range for Integer"));

    let (negate, digits) = split_sign(text).ok_or_else(invalid)?;
    if digits.is_empty() {
        return Err(invalid());
    }

    let (radix, digits) = if radix != 0 {
        (radix, digits)
    } else if let Some(rest) = strip_prefix_ci(digits, "0x") {
        (16, rest)
    } else if let Some(rest) = strip_prefix_ci(digits, "0b") {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if digits.is_empty() || digits.starts_with(char::is_whitespace) {
        return Err(invalid());
    }

    let magnitude = i64::from_str_radix(digits, radix).map_err(|error| match error.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => out_of_range(),
        _ => invalid(),
    })?;
    Ok(if negate { -magnitude } else { magnitude })
}

/// Parses a float from a string, accepting hex and binary integer forms
/// but rejecting octal.
pub fn float_from_string(text: &str) -> Result<f64, ConversionError> {
    let invalid = || ConversionError::new(format!("string '{text}' cannot be converted to Float"));
    let out_of_range = || ConversionError::new(format!("string '{text}' is out of range for Float"));

    let (negate, digits) = split_sign(text).ok_or_else(invalid)?;
    if digits.is_empty() {
        return Err(invalid());
    }

    let sign = if negate { -1.0 } else { 1.0 };
    if let Some(rest) = strip_prefix_ci(digits, "0x") {
        let magnitude = i64::from_str_radix(rest, 16).map_err(|_| invalid())?;
        return Ok(sign * magnitude as f64);
    }
    if let Some(rest) = strip_prefix_ci(digits, "0b") {
        let magnitude = i64::from_str_radix(rest, 2).map_err(|_| invalid())?;
        return Ok(sign * magnitude as f64);
    }
    // Octal is not a valid float form
    if digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with(['.', 'e', 'E']) {
        return Err(invalid());
    }

    let value: f64 = digits.parse().map_err(|_| invalid())?;
    if value.is_infinite() {
        return Err(out_of_range());
    }
    Ok(sign * value)
}

/// Splits optional whitespace, an optional sign, and more optional
/// whitespace off the front, and trailing whitespace off the back.
/// Returns `None` when a second sign appears.
fn split_sign(text: &str) -> Option<(bool, &str)> {
    let text = text.trim();
    let (negate, rest) = if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    };
    let rest = rest.trim_start();
    if rest.starts_with(['+', '-']) {
        return None;
    }
    Some((negate, rest))
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_prefixes() {
        assert_eq!(integer_from_string("10", 0).unwrap(), 10);
        assert_eq!(integer_from_string("0x1F", 0).unwrap(), 31);
        assert_eq!(integer_from_string("0B101", 0).unwrap(), 5);
        assert_eq!(integer_from_string("0755", 0).unwrap(), 493);
    }

    #[test]
    fn integer_sign_with_whitespace() {
        assert_eq!(integer_from_string("  - 10  ", 0).unwrap(), -10);
        assert_eq!(integer_from_string("+ 7", 0).unwrap(), 7);
        assert!(integer_from_string("+ - 7", 0).is_err());
    }

    #[test]
    fn integer_overflow_is_out_of_range() {
        let error = integer_from_string("9223372036854775808", 0).unwrap_err();
        assert!(error.to_string().contains("out of range"));
    }

    #[test]
    fn float_rejects_octal() {
        assert!(float_from_string("0755").is_err());
        assert_eq!(float_from_string("0.5").unwrap(), 0.5);
        assert_eq!(float_from_string("0x10", ).unwrap(), 16.0);
        assert_eq!(float_from_string("-1.5e2").unwrap(), -150.0);
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(integer_from_string("12abc", 0).is_err());
        assert!(float_from_string("", ).is_err());
    }
}
