//! The syntax tree.
//!
//! A closed sum over every statement and expression form in the language.
//! Every node carries a [`Span`]; diagnostics use spans to re-read source
//! lines, so nothing here stores text beyond what the grammar captured.

use strum::{Display, IntoStaticStr};

use crate::lexer::position::Span;
use crate::lexer::token::HeredocText;

/// An expression together with its source span.
///
/// The span covers the whole expression including any operands, so a
/// diagnostic attached to an `ExprLoc` underlines everything the user wrote.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExprLoc {
    pub expr: Expr,
    pub span: Span,
}

impl ExprLoc {
    #[must_use]
    pub fn new(expr: Expr, span: Span) -> Self {
        Self { expr, span }
    }
}

/// One piece of an interpolated string: literal text or an embedded
/// expression from `${...}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StringPart {
    Literal(String),
    Expression(ExprLoc),
}

/// Binary operators, in source form via strum (`BinaryOp::Plus` displays
/// as `+`), used directly in dispatcher error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "and")]
    And,
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
    #[strum(serialize = "<<")]
    LeftShift,
    #[strum(serialize = ">>")]
    RightShift,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "->")]
    InEdge,
    #[strum(serialize = "~>")]
    InEdgeSubscribe,
    #[strum(serialize = "<-")]
    OutEdge,
    #[strum(serialize = "<~")]
    OutEdgeSubscribe,
}

impl BinaryOp {
    /// True for the four relationship operators, which produce catalog
    /// edges rather than values.
    #[must_use]
    pub fn is_relationship(self) -> bool {
        matches!(
            self,
            Self::InEdge | Self::InEdgeSubscribe | Self::OutEdge | Self::OutEdgeSubscribe
        )
    }

    /// Precedence level per the language grammar; higher binds tighter.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Assign => 1,
            Self::Or => 2,
            Self::And => 3,
            Self::Equals
            | Self::NotEquals
            | Self::Match
            | Self::NotMatch
            | Self::Less
            | Self::LessEqual
            | Self::Greater
            | Self::GreaterEqual => 4,
            Self::Plus | Self::Minus => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::LeftShift | Self::RightShift => 7,
            Self::In => 8,
            Self::InEdge | Self::InEdgeSubscribe | Self::OutEdge | Self::OutEdgeSubscribe => 9,
        }
    }

    /// Only assignment associates to the right.
    #[must_use]
    pub fn right_associative(self) -> bool {
        matches!(self, Self::Assign)
    }
}

/// A binary operation with the operator's own span (for operator-targeted
/// diagnostics like "left operand of '+' is not numeric").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BinaryExpr {
    pub left: ExprLoc,
    pub op: BinaryOp,
    pub op_span: Span,
    pub right: ExprLoc,
}

/// A lambda: `|$x, $y| { ... }` attached to a function or method call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lambda {
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A parameter in a class, defined type, function, node, or lambda.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Parameter {
    /// Optional type annotation; restricted by the type-position walk.
    pub type_expr: Option<ExprLoc>,
    /// True for a `*$rest` captures-rest parameter.
    pub captures_rest: bool,
    pub name: String,
    pub name_span: Span,
    pub default: Option<ExprLoc>,
}

/// A function call: `name(args)`, `name args` (statement form), or the
/// call part of a method invocation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<ExprLoc>,
    pub lambda: Option<Lambda>,
}

/// A method call postfix: `target.name(args) |...| { ... }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MethodCall {
    pub target: ExprLoc,
    pub name: String,
    pub name_span: Span,
    pub args: Vec<ExprLoc>,
    pub lambda: Option<Lambda>,
}

/// An access postfix: `target[arg, ...]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AccessExpr {
    pub target: ExprLoc,
    pub args: Vec<ExprLoc>,
}

/// A selector postfix: `target ? { option => value, ... }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectorExpr {
    pub target: ExprLoc,
    pub cases: Vec<(ExprLoc, ExprLoc)>,
}

/// `if`/`unless` with optional `elsif` chain and `else`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IfExpr {
    pub condition: ExprLoc,
    pub body: Vec<Statement>,
    pub elsifs: Vec<(ExprLoc, Vec<Statement>)>,
    pub else_body: Option<Vec<Statement>>,
}

/// One `option[, option]: { body }` arm of a case expression.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseProposition {
    pub options: Vec<ExprLoc>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseExpr {
    pub expression: ExprLoc,
    pub propositions: Vec<CaseProposition>,
}

/// How a resource declaration was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResourceStatus {
    /// `type { title: ... }` — realized immediately.
    Realized,
    /// `@type { title: ... }` — virtual until collected or realized.
    Virtual,
    /// `@@type { title: ... }` — virtual and exported.
    Exported,
}

/// The type position of a resource declaration: a lowercase name or the
/// `class` keyword.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ResourceType {
    Name(String),
    Class,
}

/// One attribute operation: `name => value` or `name +> value`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeOperation {
    pub name: String,
    pub name_span: Span,
    pub append: bool,
    pub value: ExprLoc,
}

/// One body of a resource declaration: `title: attr => value, ...`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceBody {
    pub title: ExprLoc,
    pub operations: Vec<AttributeOperation>,
}

/// A resource declaration: `[@|@@]type { title: ...; title2: ... }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceExpr {
    pub status: ResourceStatus,
    pub resource_type: ResourceType,
    pub type_span: Span,
    pub bodies: Vec<ResourceBody>,
}

/// A resource override: `Notify['a'] { message => 'x' }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceOverrideExpr {
    pub reference: ExprLoc,
    pub operations: Vec<AttributeOperation>,
}

/// Resource defaults: `Notify { message => 'x' }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceDefaultsExpr {
    pub type_name: String,
    pub type_span: Span,
    pub operations: Vec<AttributeOperation>,
}

/// Attribute-query operators inside collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, serde::Serialize, serde::Deserialize)]
pub enum QueryOp {
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
}

/// A collector attribute query: conditions joined by `and`/`or`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Query {
    Condition {
        attribute: String,
        attribute_span: Span,
        op: QueryOp,
        value: ExprLoc,
    },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

/// A collector: `Type <| query |>` or `Type <<| query |>>` with optional
/// attribute-override tail.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CollectorExpr {
    pub type_name: String,
    pub type_span: Span,
    pub exported: bool,
    pub query: Option<Query>,
    pub operations: Vec<AttributeOperation>,
}

/// An expression in the syntax tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Undef,
    Default,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// A single-quoted string (escapes already applied) or other literal text.
    String(String),
    /// A double-quoted string with interpolation parts.
    InterpolatedString(Vec<StringPart>),
    /// A heredoc body; margin/escape/interpolation processing happens at
    /// evaluation.
    Heredoc(HeredocText),
    Regex(String),
    Name(String),
    BareWord(String),
    TypeName(String),
    Variable(String),
    Array(Vec<ExprLoc>),
    Hash(Vec<(ExprLoc, ExprLoc)>),

    If(Box<IfExpr>),
    Unless(Box<IfExpr>),
    Case(Box<CaseExpr>),

    FunctionCall(Box<FunctionCall>),
    MethodCall(Box<MethodCall>),
    Access(Box<AccessExpr>),
    Selector(Box<SelectorExpr>),
    Binary(Box<BinaryExpr>),

    /// Unary minus.
    Negate(Box<ExprLoc>),
    /// Logical not (`!`).
    Not(Box<ExprLoc>),
    /// Unary splat (`*`) — unfolds in argument and array contexts.
    Splat(Box<ExprLoc>),

    Resource(Box<ResourceExpr>),
    ResourceOverride(Box<ResourceOverrideExpr>),
    ResourceDefaults(Box<ResourceDefaultsExpr>),
    Collector(Box<CollectorExpr>),

    /// EPP literal template text.
    RenderString(String),
    /// EPP `<%= expression %>`.
    RenderExpression(Box<ExprLoc>),
}

/// A host matcher on a node definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Hostname {
    Literal(String),
    Regex(String),
    Default,
}

impl Hostname {
    /// The matcher's display text (regexes without delimiters).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(name) | Self::Regex(name) => name,
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassStatement {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<Parameter>,
    /// Optional `inherits` parent class name.
    pub parent: Option<(String, Span)>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DefinedTypeStatement {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeStatement {
    pub hostnames: Vec<(Hostname, Span)>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionStatement {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TypeAliasStatement {
    pub name: String,
    pub name_span: Span,
    /// The aliased type expression, validated by the type-position walk.
    pub aliased: ExprLoc,
    pub span: Span,
}

/// `produces` / `consumes` direction of a capability mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum CapabilityKind {
    Produces,
    Consumes,
}

/// A capability mapping: `Sql produces Db { user => $user }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CapabilityMapping {
    pub resource_type: String,
    pub kind: CapabilityKind,
    pub capability: String,
    pub operations: Vec<AttributeOperation>,
    pub span: Span,
}

/// An application definition (instantiated like a defined type).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApplicationStatement {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A site block, evaluated at top scope.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SiteStatement {
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A top-level (or body) statement.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Statement {
    Class(ClassStatement),
    DefinedType(DefinedTypeStatement),
    Node(NodeStatement),
    Function(FunctionStatement),
    TypeAlias(TypeAliasStatement),
    Capability(CapabilityMapping),
    Application(ApplicationStatement),
    Site(SiteStatement),
    /// An expression evaluated for effect (includes function-call and
    /// relationship statements).
    Expression(ExprLoc),
    /// `break` — only meaningful inside a lambda body.
    Break(Span),
}

impl Statement {
    /// The statement's span.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Class(s) => s.span,
            Self::DefinedType(s) => s.span,
            Self::Node(s) => s.span,
            Self::Function(s) => s.span,
            Self::TypeAlias(s) => s.span,
            Self::Capability(s) => s.span,
            Self::Application(s) => s.span,
            Self::Site(s) => s.span,
            Self::Expression(e) => e.span,
            Self::Break(span) => *span,
        }
    }
}

/// A parsed manifest: the statement list plus the path and source it came
/// from, kept so diagnostics can re-read lines after evaluation unwinds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SyntaxTree {
    pub path: String,
    pub source: String,
    pub statements: Vec<Statement>,
}

impl SyntaxTree {
    #[must_use]
    pub fn new(path: impl Into<String>, source: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            statements,
        }
    }
}
