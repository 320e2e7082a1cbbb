use std::fmt;

/// Width a tab stop occupies when computing diagnostic columns.
pub const TAB_WIDTH: usize = 4;

/// A location in manifest source text.
///
/// Offsets are byte offsets into the UTF-8 source; lines are 1-based.
/// Columns are not stored — they are recomputed from the source text on
/// demand by [`line_info`], which is the only consumer that needs them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
}

impl Position {
    /// Creates a position from an offset and a 1-based line number.
    #[must_use]
    pub const fn new(offset: usize, line: usize) -> Self {
        Self { offset, line }
    }

    /// The position of the first byte of any input.
    #[must_use]
    pub const fn start() -> Self {
        Self { offset: 0, line: 1 }
    }
}

/// A half-open `[begin, end)` range of source text.
///
/// Every AST node carries one of these; diagnostics use it to re-read the
/// offending line and compute a column.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub begin: Position,
    pub end: Position,
}

/// Custom Debug implementation to make dumping syntax trees much less verbose.
impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Span({}:{}..{}:{})",
            self.begin.line, self.begin.offset, self.end.line, self.end.offset
        )
    }
}

impl Span {
    /// Creates a span from begin and end positions.
    #[must_use]
    pub const fn new(begin: Position, end: Position) -> Self {
        Self { begin, end }
    }

    /// Creates an empty span at a single position.
    #[must_use]
    pub const fn at(position: Position) -> Self {
        Self {
            begin: position,
            end: position,
        }
    }

    /// Returns a new span covering both this span and `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let begin = if other.begin.offset < self.begin.offset {
            other.begin
        } else {
            self.begin
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Self { begin, end }
    }

    /// Length of the spanned text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.begin.offset)
    }

    /// True when the span covers no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The text of a source line together with the diagnostic column info
/// computed for a highlighted range within it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInfo {
    /// The full text of the line containing the highlight (no trailing newline).
    pub text: String,
    /// 1-based column of the first highlighted character, with tabs expanded.
    pub column: usize,
    /// Number of characters the highlight covers within the line.
    pub length: usize,
}

/// Extracts the line containing byte `position` and computes the 1-based
/// column and highlight length for a `length`-byte range starting there.
///
/// The column counts characters, not bytes, and expands `\t` to
/// [`TAB_WIDTH`]. A highlight that extends past the end of the line is
/// clipped to the line.
#[must_use]
pub fn line_info(source: &str, position: usize, length: usize) -> LineInfo {
    let mut position = position;
    if position >= source.len() {
        position = source.len().saturating_sub(1);
    }

    // Walk backwards to the previous newline and forwards to the next
    let start = match source[..position].rfind('\n') {
        Some(index) => index + 1,
        None => 0,
    };
    let end = source[start..].find('\n').map_or(source.len(), |index| start + index);

    let text = source[start..end].to_owned();

    let highlight_start = position - start;
    let highlight_end = (highlight_start + length).min(text.len());

    let mut column = 1;
    let mut highlight_length = 0;
    for (index, c) in text.char_indices() {
        if index < highlight_start {
            column += if c == '\t' { TAB_WIDTH } else { 1 };
        } else if index < highlight_end {
            highlight_length += 1;
        } else {
            break;
        }
    }

    LineInfo {
        text,
        column,
        length: highlight_length,
    }
}

/// Returns the position of the last non-whitespace byte of the input.
///
/// Used to point "unexpected end of input" diagnostics at real text rather
/// than at a trailing newline.
#[must_use]
pub fn last_position(source: &str) -> Position {
    let mut offset = 0;
    let mut line = 1;
    let mut current_offset = 0;
    let mut current_line = 1;
    for c in source.chars() {
        if c == '\n' {
            current_line += 1;
        }
        current_offset += c.len_utf8();
        if !c.is_whitespace() {
            offset = current_offset;
            line = current_line;
        }
    }
    Position::new(offset, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_info_first_line() {
        let info = line_info("$x = 1\n$y = 2\n", 5, 1);
        assert_eq!(info.text, "$x = 1");
        assert_eq!(info.column, 6);
        assert_eq!(info.length, 1);
    }

    #[test]
    fn line_info_second_line() {
        let info = line_info("$x = 1\n$y = 2\n", 7, 2);
        assert_eq!(info.text, "$y = 2");
        assert_eq!(info.column, 1);
        assert_eq!(info.length, 2);
    }

    #[test]
    fn line_info_expands_tabs() {
        let info = line_info("\tnotice(1)", 1, 6);
        assert_eq!(info.column, 1 + TAB_WIDTH);
        assert_eq!(info.length, 6);
    }

    #[test]
    fn line_info_clips_highlight_to_line() {
        let info = line_info("ab\ncd", 0, 10);
        assert_eq!(info.text, "ab");
        assert_eq!(info.length, 2);
    }

    #[test]
    fn last_position_skips_trailing_whitespace() {
        let position = last_position("notice(1)\n\n");
        assert_eq!(position.offset, 9);
        assert_eq!(position.line, 1);
    }
}
