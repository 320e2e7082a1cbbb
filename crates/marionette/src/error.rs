use std::borrow::Cow;
use std::fmt;

use crate::lexer::position::{Span, line_info};
use crate::logging::{Diagnostic, Level};

/// Result type alias for lexing.
pub type LexResult<T> = Result<T, LexError>;

/// Result type alias for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type alias for evaluation.
pub type EvalResult<T> = Result<T, EvaluationError>;

/// Errors produced while tokenizing source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A quoted string with no closing quote before end of input.
    UnclosedString,
    /// A `/* ... */` comment with no closing `*/`.
    UnclosedComment,
    /// A heredoc whose tag line never appears.
    UnclosedHeredoc,
    /// A `/.../` regex with no closing delimiter.
    UnclosedRegex,
    /// A number literal that does not parse in its base, or overflows.
    InvalidNumber(String),
    /// A `$` not followed by a valid variable name.
    InvalidVariableName,
    /// A heredoc opener that is not `@("TAG"...)` shaped.
    InvalidHeredocTag,
    /// A byte no token can start with.
    UnexpectedCharacter(char),
}

/// A lex failure with the span of the offending character(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[must_use]
    pub const fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnclosedString => write!(f, "unexpected end of input while looking for closing quote"),
            LexErrorKind::UnclosedComment => write!(f, "unexpected end of input while looking for '*/'"),
            LexErrorKind::UnclosedHeredoc => write!(f, "unexpected end of input while looking for heredoc tag"),
            LexErrorKind::UnclosedRegex => write!(f, "unexpected end of input while looking for closing '/'"),
            LexErrorKind::InvalidNumber(text) => write!(f, "'{text}' is not a valid number"),
            LexErrorKind::InvalidVariableName => write!(f, "expected a variable name following '$'"),
            LexErrorKind::InvalidHeredocTag => write!(f, "expected a quoted tag following '@('"),
            LexErrorKind::UnexpectedCharacter(c) => {
                if c.is_ascii_graphic() || *c == ' ' {
                    write!(f, "unexpected character '{c}'")
                } else {
                    write!(f, "unexpected character '\\x{:02x}'", u32::from(*c))
                }
            }
        }
    }
}

/// A non-fatal source diagnostic (invalid escape, ineffective statement).
///
/// Collected during lexing and parsing and surfaced through the logger as
/// warnings once the owning file's compilation reaches a safe boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWarning {
    pub span: Span,
    /// Number of source characters to highlight.
    pub length: usize,
    pub message: String,
}

/// A parse failure: a message and the span it points at.
///
/// Messages take one of three forms (unexpected-token, unexpected-character,
/// expected-X-found-Y); the constructors below build them so wording stays
/// uniform across the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: Cow<'static, str>,
    pub span: Span,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// `unexpected <description>.`
    #[must_use]
    pub fn unexpected(description: &str, span: Span) -> Self {
        Self::new(format!("unexpected {description}"), span)
    }

    /// `expected <expected> but found <found>.`
    #[must_use]
    pub fn expected_found(expected: &str, found: &str, span: Span) -> Self {
        Self::new(format!("expected {expected} but found {found}"), span)
    }

    /// `unexpected end of input; expected <expected>.`
    #[must_use]
    pub fn unexpected_end(expected: &str, span: Span) -> Self {
        Self::new(format!("unexpected end of input; expected {expected}"), span)
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        Self::new(error.to_string(), error.span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One frame of the evaluation call stack, attached to evaluation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function, class, or defined type name.
    pub name: String,
    /// Call site, when known.
    pub span: Option<Span>,
    /// True for frames the host injected (facts, external calls).
    pub external: bool,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "in '{}' (line {})", self.name, span.begin.line),
            None => write!(f, "in '{}'", self.name),
        }
    }
}

/// A value-level failure during evaluation.
///
/// Carries an optional span (the evaluator's current AST context fills it in
/// when the raiser did not) and the call-frame stack captured at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    pub message: Cow<'static, str>,
    pub span: Option<Span>,
    pub frames: Vec<StackFrame>,
    /// True for the control-flow value a `break` statement raises; the
    /// iteration drivers recognize and absorb it. One that escapes to the
    /// top level becomes an ordinary error.
    pub control_break: bool,
}

impl EvaluationError {
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
            frames: Vec::new(),
            control_break: false,
        }
    }

    /// An error whose site the evaluator fills in from its current context.
    #[must_use]
    pub fn without_span(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            span: None,
            frames: Vec::new(),
            control_break: false,
        }
    }

    /// The control-flow value raised by `break`.
    #[must_use]
    pub fn break_control(span: Span) -> Self {
        Self {
            message: Cow::Borrowed("break() cannot be used from this context"),
            span: Some(span),
            frames: Vec::new(),
            control_break: true,
        }
    }

    /// Returns the error with `span` set if it was not already.
    #[must_use]
    pub fn with_default_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Returns the error with the given frames attached, unless frames were
    /// already captured closer to the raise site.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        if self.frames.is_empty() {
            self.frames = frames;
        }
        self
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A string-to-numeric conversion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError(pub Cow<'static, str>);

impl ConversionError {
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ConversionError> for EvaluationError {
    fn from(error: ConversionError) -> Self {
        Self::without_span(error.0)
    }
}

/// A dependency cycle found during catalog finalization.
///
/// `resources` lists each participating resource in `Type[title]` form, in
/// cycle order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub resources: Vec<String>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found dependency cycle between the following resources: {}",
            self.resources.join(" => ")
        )
    }
}

/// The public compilation error: any core failure wrapped with the source
/// context needed to render a caret diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub length: usize,
    /// The text of the offending line, when the failure has a location.
    pub text: Option<String>,
    pub frames: Vec<StackFrame>,
}

impl CompileError {
    /// Wraps an error at a known span, re-reading the offending line from
    /// `source` to fill in column and line text.
    #[must_use]
    pub fn at_span(message: &str, source: &str, path: &str, span: Span) -> Self {
        let info = line_info(source, span.begin.offset, span.len().max(1));
        Self {
            message: message.to_owned(),
            path: path.to_owned(),
            line: span.begin.line,
            column: info.column,
            length: info.length,
            text: Some(info.text),
            frames: Vec::new(),
        }
    }

    /// Wraps an error with no usable location.
    #[must_use]
    pub fn bare(message: &str, path: &str) -> Self {
        Self {
            message: message.to_owned(),
            path: path.to_owned(),
            line: 0,
            column: 0,
            length: 0,
            text: None,
            frames: Vec::new(),
        }
    }

    /// Wraps a lex failure.
    #[must_use]
    pub fn from_lex(error: &LexError, source: &str, path: &str) -> Self {
        Self::at_span(&error.to_string(), source, path, error.span)
    }

    /// Wraps a parse failure.
    #[must_use]
    pub fn from_parse(error: &ParseError, source: &str, path: &str) -> Self {
        Self::at_span(&error.message, source, path, error.span)
    }

    /// Wraps an evaluation failure, carrying its frame stack through.
    #[must_use]
    pub fn from_evaluation(error: &EvaluationError, source: &str, path: &str) -> Self {
        let mut wrapped = match error.span {
            Some(span) => Self::at_span(&error.message, source, path, span),
            None => Self::bare(&error.message, path),
        };
        wrapped.frames = error.frames.clone();
        wrapped
    }

    /// Wraps a finalization cycle failure.
    #[must_use]
    pub fn from_cycle(error: &CycleError, path: &str) -> Self {
        Self::bare(&error.to_string(), path)
    }

    /// Projects the error as an error-level [`Diagnostic`] for a logger.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic<'_> {
        Diagnostic {
            level: Level::Error,
            message: &self.message,
            path: if self.path.is_empty() { None } else { Some(&self.path) },
            line: self.line,
            column: self.column,
            length: self.length,
            text: self.text.as_deref(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostic().render())?;
        for frame in &self.frames {
            write!(f, "\n  {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::position::Position;

    #[test]
    fn compile_error_reads_line_text() {
        let source = "$x = 1\n$x = 2\n";
        let span = Span::new(Position::new(7, 2), Position::new(9, 2));
        let error = CompileError::at_span("cannot reassign", source, "test.pp", span);
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 1);
        assert_eq!(error.length, 2);
        assert_eq!(error.text.as_deref(), Some("$x = 2"));
    }

    #[test]
    fn expected_found_wording() {
        let error = ParseError::expected_found("an expression", "']'", Span::default());
        assert_eq!(error.message, "expected an expression but found ']'");
    }
}
