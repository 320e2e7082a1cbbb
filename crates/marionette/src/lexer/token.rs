use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::lexer::position::{Position, Span};

/// Punctuators and operators, single- and multi-character.
///
/// Uses strum derives so every punctuator's rendered form (`=>`, `<<|`, …)
/// round-trips through `FromStr` back to the same token. The lexer relies on
/// maximal-munch ordering, not this table, to recognize them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum Punct {
    #[strum(serialize = "[")]
    LeftBracket,
    #[strum(serialize = "]")]
    RightBracket,
    #[strum(serialize = "{")]
    LeftBrace,
    #[strum(serialize = "}")]
    RightBrace,
    #[strum(serialize = "(")]
    LeftParen,
    #[strum(serialize = ")")]
    RightParen,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = ";")]
    Semicolon,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = "@")]
    At,
    #[strum(serialize = "@@")]
    AtAt,
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "=>")]
    FatArrow,
    #[strum(serialize = "+>")]
    PlusArrow,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "=~")]
    Match,
    #[strum(serialize = "!~")]
    NotMatch,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<<")]
    LeftShift,
    #[strum(serialize = ">>")]
    RightShift,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "<|")]
    LeftCollect,
    #[strum(serialize = "|>")]
    RightCollect,
    #[strum(serialize = "<<|")]
    LeftExportCollect,
    #[strum(serialize = "|>>")]
    RightExportCollect,
    #[strum(serialize = "->")]
    InEdge,
    #[strum(serialize = "~>")]
    InEdgeSubscribe,
    #[strum(serialize = "<-")]
    OutEdge,
    #[strum(serialize = "<~")]
    OutEdgeSubscribe,
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

/// Reserved words of the language.
///
/// All variants serialize to lowercase, so `Keyword::Class.to_string()` is
/// the exact source text and `"class".parse()` round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Case,
    Class,
    Default,
    Define,
    If,
    Elsif,
    Else,
    Inherits,
    Node,
    And,
    Or,
    Undef,
    False,
    True,
    In,
    Unless,
    Function,
    Type,
    Attr,
    Private,
    Produces,
    Consumes,
    Application,
    Site,
}

/// Function names that may be called statement-style, without parentheses.
///
/// `notice "hello"` is legal only because `notice` appears here; the lexer
/// classifies these names so the parser can accept the argument list form.
pub const STATEMENT_CALLS: &[&str] = &[
    "require", "realize", "include", "contain", "tag", "debug", "info", "notice", "warning", "err", "fail", "import",
];

/// The radix a number literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NumericBase {
    Decimal,
    Octal,
    Hexadecimal,
}

/// The numeric payload of a number token.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => {
                let mut buffer = ryu::Buffer::new();
                f.write_str(buffer.format(*value))
            }
        }
    }
}

/// A heredoc body, emitted as a single token once the closing tag line is found.
///
/// Escape processing, margin trimming, and interpolation are deferred to
/// evaluation; the token carries everything the interpolation driver needs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeredocText {
    /// Raw body text, margin and escapes untouched.
    pub text: String,
    /// Position of the body's first byte in the source, letting the
    /// interpolation driver restart the lexer with exact positions.
    pub body: Position,
    /// Escape characters enabled by the opener's `/`-flags (empty when none).
    pub escapes: String,
    /// Whether `$`-interpolation applies (tag was double quoted).
    pub interpolated: bool,
    /// Optional syntax name from `@("TAG:syntax")`.
    pub syntax: Option<String>,
    /// Margin column established by a `|` on the closing tag line.
    pub margin: usize,
    /// Whether the trailing line break is removed (`-` on the closing tag line).
    pub remove_break: bool,
}

/// A lexed token: a tagged variant over everything the grammar consumes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TokenKind {
    Punct(Punct),
    Keyword(Keyword),
    /// A lowercase, possibly `::`-qualified name: `foo`, `foo::bar`.
    Name(String),
    /// A bare word: letters/digits/dashes that is not a valid name (`up-to-date`).
    BareWord(String),
    /// A variable reference without the `$` sigil: `x`, `::foo::bar`, `0`.
    Variable(String),
    /// A capitalized, possibly qualified type name: `Integer`, `Foo::Bar`.
    TypeName(String),
    /// A name from [`STATEMENT_CALLS`] in statement position.
    StatementCall(String),
    Number {
        value: Number,
        base: NumericBase,
    },
    /// A single-quoted string, escapes already applied.
    LiteralString(String),
    /// Opening `"` of an interpolated string.
    StringStart,
    /// A run of literal text inside an interpolated string, escapes applied.
    StringText(String),
    /// `${` opening an embedded expression.
    InterpolationStart,
    /// The `}` closing an embedded expression.
    InterpolationEnd,
    /// Closing `"` of an interpolated string.
    StringEnd,
    /// A `/.../` regex literal; the payload excludes the delimiters.
    Regex(String),
    /// A complete heredoc body.
    Heredoc(HeredocText),
    /// `<%` or `<%-`; `trim` strips leading whitespace from the prior text.
    EppStart {
        trim: bool,
    },
    /// `%>` or `-%>`; `trim` strips the following line break.
    EppEnd {
        trim: bool,
    },
    /// A run of literal template text in EPP mode.
    EppRender(String),
}

impl TokenKind {
    /// A short human description used by "unexpected token" diagnostics.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Punct(p) => format!("'{p}'"),
            Self::Keyword(k) => format!("keyword '{k}'"),
            Self::Name(name) => format!("name '{name}'"),
            Self::BareWord(word) => format!("bare word '{word}'"),
            Self::Variable(name) => format!("variable '${name}'"),
            Self::TypeName(name) => format!("type name '{name}'"),
            Self::StatementCall(name) => format!("name '{name}'"),
            Self::Number { value, .. } => format!("number '{value}'"),
            Self::LiteralString(_) | Self::StringStart | Self::StringText(_) | Self::StringEnd => "string".to_owned(),
            Self::InterpolationStart => "'${'".to_owned(),
            Self::InterpolationEnd => "'}'".to_owned(),
            Self::Regex(pattern) => format!("regex '/{pattern}/'"),
            Self::Heredoc(_) => "heredoc".to_owned(),
            Self::EppStart { .. } => "'<%'".to_owned(),
            Self::EppEnd { .. } => "'%>'".to_owned(),
            Self::EppRender(_) => "template text".to_owned(),
        }
    }

    /// True when this token is the given punctuator.
    #[must_use]
    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self, Self::Punct(p) if *p == punct)
    }

    /// True when this token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Self::Keyword(k) if *k == keyword)
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn punct_text_round_trips() {
        for punct in Punct::iter() {
            let rendered = punct.to_string();
            assert_eq!(Punct::from_str(&rendered).unwrap(), punct, "{rendered}");
        }
    }

    #[test]
    fn keyword_text_round_trips() {
        for keyword in Keyword::iter() {
            let rendered = keyword.to_string();
            assert_eq!(Keyword::from_str(&rendered).unwrap(), keyword, "{rendered}");
        }
    }

    #[test]
    fn keyword_is_lowercase() {
        assert_eq!(Keyword::Class.to_string(), "class");
        assert_eq!(Keyword::Elsif.to_string(), "elsif");
    }
}
