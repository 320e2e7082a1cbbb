use std::fmt::Write as _;
use std::io::{self, Write as _};

use strum::{Display, EnumString, IntoStaticStr};

/// Diagnostic severity levels.
///
/// Uses strum derives for automatic `Display`/`FromStr`; all variants
/// serialize to lowercase, matching the logging function names exposed to
/// manifests (`notice(...)`, `crit(...)`, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Alert,
    Critical,
    Emergency,
}

/// A single diagnostic, with optional source context.
///
/// `line`, `column`, and `length` are meaningful only when `text` is
/// present; `column` is 1-based with tabs expanded.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostic<'a> {
    pub level: Level,
    pub message: &'a str,
    pub path: Option<&'a str>,
    pub line: usize,
    pub column: usize,
    pub length: usize,
    /// The text of the offending source line, when known.
    pub text: Option<&'a str>,
}

impl<'a> Diagnostic<'a> {
    /// A bare message with no source context.
    #[must_use]
    pub const fn bare(level: Level, message: &'a str) -> Self {
        Self {
            level,
            message,
            path: None,
            line: 0,
            column: 0,
            length: 0,
            text: None,
        }
    }

    /// Renders the diagnostic in the standard form:
    /// `Level: message` followed by location, line text, and a caret.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let level = match self.level {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Notice => "Notice",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Alert => "Alert",
            Level::Critical => "Critical",
            Level::Emergency => "Emergency",
        };
        let _ = write!(out, "{level}: {}", self.message);
        if let Some(path) = self.path {
            let _ = write!(out, "\n  at {path}:{}:{}", self.line, self.column);
        }
        if let Some(text) = self.text {
            let _ = write!(out, "\n    {text}");
            if self.column > 0 {
                let _ = write!(out, "\n    {}^", " ".repeat(self.column - 1));
                if self.length > 1 {
                    out.push_str(&"~".repeat(self.length - 1));
                }
            }
        }
        out
    }
}

/// Trait for handling diagnostic output from compilation.
///
/// Implement this trait to capture or redirect diagnostics. The default
/// implementation [`StdLogger`] writes to stderr.
pub trait Logger {
    /// Called once per diagnostic, in emission order.
    fn log(&mut self, diagnostic: &Diagnostic<'_>);

    /// Returns false to suppress a level entirely (the compiler skips
    /// formatting work for suppressed levels).
    fn enabled(&self, level: Level) -> bool {
        let _ = level;
        true
    }
}

/// Default `Logger` that renders each diagnostic to stderr.
#[derive(Debug, Default)]
pub struct StdLogger {
    /// Minimum level to emit; diagnostics below it are dropped.
    pub minimum: Level,
}

impl StdLogger {
    #[must_use]
    pub fn new() -> Self {
        Self { minimum: Level::Notice }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Notice
    }
}

impl Logger for StdLogger {
    fn log(&mut self, diagnostic: &Diagnostic<'_>) {
        if diagnostic.level < self.minimum {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", diagnostic.render());
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.minimum
    }
}

/// A `Logger` that collects `(level, message)` pairs into a vector.
///
/// Useful for testing and for capturing compilation output programmatically.
#[derive(Debug, Default)]
pub struct CollectLogger {
    entries: Vec<(Level, String)>,
}

impl CollectLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected entries, in emission order.
    #[must_use]
    pub fn entries(&self) -> &[(Level, String)] {
        &self.entries
    }

    /// The collected messages at the given level, in emission order.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    /// Consumes the logger and returns the collected entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<(Level, String)> {
        self.entries
    }
}

impl Logger for CollectLogger {
    fn log(&mut self, diagnostic: &Diagnostic<'_>) {
        self.entries.push((diagnostic.level, diagnostic.message.to_owned()));
    }
}

/// `Logger` that ignores all diagnostics.
#[derive(Debug, Default)]
pub struct NoLogger;

impl Logger for NoLogger {
    fn log(&mut self, _diagnostic: &Diagnostic<'_>) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Wraps a logger with warning and error tallies.
///
/// A nonzero error count aborts compilation at the next safe boundary.
pub struct Reporter<'a> {
    logger: &'a mut dyn Logger,
    warnings: u32,
    errors: u32,
}

impl<'a> Reporter<'a> {
    pub fn new(logger: &'a mut dyn Logger) -> Self {
        Self {
            logger,
            warnings: 0,
            errors: 0,
        }
    }

    /// Emits a diagnostic, bumping the matching tally.
    pub fn log(&mut self, diagnostic: &Diagnostic<'_>) {
        match diagnostic.level {
            Level::Warning => self.warnings += 1,
            Level::Error | Level::Alert | Level::Critical | Level::Emergency => self.errors += 1,
            Level::Debug | Level::Info | Level::Notice => {}
        }
        self.logger.log(diagnostic);
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.logger.enabled(level)
    }

    #[must_use]
    pub fn warning_count(&self) -> u32 {
        self.warnings
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.errors
    }
}

impl std::fmt::Debug for Reporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("warnings", &self.warnings)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_with_caret() {
        let diagnostic = Diagnostic {
            level: Level::Error,
            message: "unexpected token ']'",
            path: Some("site.pp"),
            line: 3,
            column: 5,
            length: 1,
            text: Some("$x = ]"),
        };
        let rendered = diagnostic.render();
        assert!(rendered.starts_with("Error: unexpected token ']'"));
        assert!(rendered.contains("at site.pp:3:5"));
        assert!(rendered.ends_with("    ^"));
    }

    #[test]
    fn reporter_counts() {
        let mut logger = CollectLogger::new();
        let mut reporter = Reporter::new(&mut logger);
        reporter.log(&Diagnostic::bare(Level::Warning, "w"));
        reporter.log(&Diagnostic::bare(Level::Error, "e"));
        reporter.log(&Diagnostic::bare(Level::Notice, "n"));
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(logger.entries().len(), 3);
    }
}
