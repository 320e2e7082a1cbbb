//! String interpolation at evaluation time.
//!
//! Double-quoted strings were segmented by the lexer, so their parts just
//! evaluate and concatenate. Heredoc bodies arrive raw: margin trimming,
//! the opener's escape set, `$name` shorthand, and `${...}` expression
//! groups (re-lexed and parsed on the fly) are all applied here, the
//! lexer being restartable from a position inside the body.

use crate::ast::StringPart;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::Context;
use crate::lexer::position::{Position, Span, TAB_WIDTH};
use crate::lexer::token::HeredocText;
use crate::parser;
use crate::value::Value;

/// Evaluates the parts of a lexer-segmented interpolated string.
pub fn interpolate_parts(context: &mut Context<'_>, parts: &[StringPart]) -> EvalResult<Value> {
    let mut text = String::new();
    for part in parts {
        match part {
            StringPart::Literal(literal) => text.push_str(literal),
            StringPart::Expression(expr) => {
                let value = context.evaluate(expr)?;
                text.push_str(&value.to_string());
            }
        }
    }
    Ok(Value::string(text))
}

/// Processes a heredoc body into its final string.
pub fn interpolate_heredoc(context: &mut Context<'_>, heredoc: &HeredocText, span: Span) -> EvalResult<Value> {
    let text = interpolate(
        context,
        &heredoc.text,
        &heredoc.escapes,
        heredoc.interpolated,
        heredoc.margin,
        heredoc.remove_break,
        Some(heredoc.body),
        span,
    )?;
    Ok(Value::string(text))
}

/// The interpolation driver: margin, escapes, and `$` interpolation in
/// one pass over the raw text.
///
/// `body` is the text's position within the current tree's source, when
/// the text is a verbatim slice of it (heredoc bodies are); expression
/// groups then re-lex the original source from that position so their
/// diagnostics carry exact locations.
#[expect(clippy::too_many_lines, reason = "one pass keeps the margin state machine readable")]
pub fn interpolate(
    context: &mut Context<'_>,
    text: &str,
    escapes: &str,
    full: bool,
    margin: usize,
    remove_break: bool,
    body: Option<Position>,
    span: Span,
) -> EvalResult<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut index = 0;
    let mut current_margin = margin;

    while index < chars.len() {
        // Consume margin whitespace at the start of each line
        while current_margin > 0 && index < chars.len() {
            match chars[index] {
                ' ' => {
                    current_margin -= 1;
                    index += 1;
                }
                '\t' => {
                    current_margin = current_margin.saturating_sub(TAB_WIDTH);
                    index += 1;
                }
                _ => break,
            }
        }
        if index >= chars.len() {
            break;
        }
        current_margin = 0;

        let c = chars[index];
        if c == '\\' && !escapes.is_empty() {
            let mut next = index + 1;
            if chars.get(next) == Some(&'\r') {
                next += 1;
            }
            if let Some(&escaped) = chars.get(next) {
                if escapes.contains(escaped) {
                    match escaped {
                        'r' => result.push('\r'),
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        's' => result.push(' '),
                        'u' => {
                            index = unicode_escape(context, &chars, next + 1, &mut result, span);
                            continue;
                        }
                        '\n' => {
                            // Line continuation resets the margin
                            current_margin = margin;
                        }
                        '$' => result.push('$'),
                        other => result.push(other),
                    }
                    index = next + 1;
                    continue;
                }
                context.warn(span, &format!("invalid escape sequence '\\{escaped}'"));
            }
            result.push('\\');
            index += 1;
            continue;
        }

        if c == '\n' {
            current_margin = margin;
            result.push('\n');
            index += 1;
            continue;
        }

        if full && c == '$' {
            if let Some(&next) = chars.get(index + 1) {
                if next == '{' {
                    // Re-lex and parse the expression group; the lexer
                    // stops at the balancing brace
                    let brace_offset: usize = chars[..index + 2].iter().map(|c| c.len_utf8()).sum();
                    let original = body.and_then(|body| {
                        let tree = context.current_tree()?;
                        let start = body.offset + brace_offset;
                        // Only when the text really is a slice of the source
                        if tree.source.get(body.offset..body.offset + text.len()) == Some(text) {
                            let line = body.line + text[..brace_offset].matches('\n').count();
                            Some((tree, Position::new(start, line)))
                        } else {
                            None
                        }
                    });
                    let (expr, end_offset) = match original {
                        Some((tree, start)) => {
                            let (expr, end) = parser::parse_interpolation(&tree.source, start).map_err(|error| {
                                EvaluationError::new(format!("interpolation parse failure: {error}"), error.span)
                            })?;
                            (expr, end.offset - body.expect("original implies body").offset)
                        }
                        None => {
                            let fragment = &text[brace_offset..];
                            let (expr, end) = parser::parse_interpolation(fragment, Position::new(0, span.begin.line))
                                .map_err(|error| {
                                    EvaluationError::new(format!("interpolation parse failure: {error}"), span)
                                })?;
                            (expr, brace_offset + end.offset)
                        }
                    };
                    let value = context.evaluate(&expr)?;
                    result.push_str(&value.to_string());
                    index = text[..end_offset].chars().count();
                    continue;
                }
                if next.is_ascii_alphanumeric() || next == '_' || next == ':' {
                    // $name shorthand
                    let mut end = index + 1;
                    while end < chars.len()
                        && (chars[end].is_ascii_alphanumeric() || chars[end] == '_' || chars[end] == ':')
                    {
                        end += 1;
                    }
                    let name: String = chars[index + 1..end].iter().collect();
                    let name = name.trim_end_matches(':');
                    if !name.is_empty() {
                        if let Some(value) = context.lookup(name) {
                            result.push_str(&value.to_string());
                        }
                        index = index + 1 + name.chars().count();
                        continue;
                    }
                }
            }
        }

        result.push(c);
        index += 1;
    }

    if remove_break {
        if result.ends_with('\n') {
            result.pop();
        }
        if result.ends_with('\r') {
            result.pop();
        }
    }
    Ok(result)
}

/// Decodes `\uXXXX` or `\u{X...}`, warning and emitting the text
/// literally when malformed. Returns the next index to resume at.
fn unicode_escape(
    context: &mut Context<'_>,
    chars: &[char],
    start: usize,
    result: &mut String,
    span: Span,
) -> usize {
    let braced = chars.get(start) == Some(&'{');
    let digits_start = if braced { start + 1 } else { start };
    let mut end = digits_start;
    while end < chars.len() && chars[end].is_ascii_hexdigit() && (braced || end - digits_start < 4) {
        end += 1;
    }
    let digits: String = chars[digits_start..end].iter().collect();
    let expected_count = if braced { digits.len().clamp(1, 8) } else { 4 };

    let valid = digits.len() == expected_count
        && !digits.is_empty()
        && digits.len() <= 8
        && (!braced || chars.get(end) == Some(&'}'));
    let decoded = if valid {
        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
    } else {
        None
    };

    match decoded {
        Some(c) => {
            result.push(c);
            if braced { end + 1 } else { end }
        }
        None => {
            context.warn(span, "invalid unicode escape sequence");
            result.push_str("\\u");
            start
        }
    }
}
