//! Recursive-descent parser with explicit precedence climbing.
//!
//! The parser pulls tokens lazily from the lexer, keeping a small lookahead
//! buffer. Statements and expressions share one grammar; binary operators
//! are resolved by precedence climbing over the table in
//! [`BinaryOp::precedence`].

pub mod validate;

use std::collections::VecDeque;

use crate::ast::{
    AccessExpr, ApplicationStatement, AttributeOperation, BinaryExpr, BinaryOp, CapabilityKind, CapabilityMapping,
    CaseExpr, CaseProposition, ClassStatement, CollectorExpr, DefinedTypeStatement, Expr, ExprLoc, FunctionCall,
    FunctionStatement, Hostname, IfExpr, Lambda, MethodCall, NodeStatement, Parameter, Query, QueryOp, ResourceBody,
    ResourceDefaultsExpr, ResourceExpr, ResourceOverrideExpr, ResourceStatus, ResourceType, SelectorExpr, SiteStatement,
    Statement, StringPart, SyntaxTree, TypeAliasStatement,
};
use crate::error::{ParseError, ParseResult, SourceWarning};
use crate::lexer::position::{Position, Span};
use crate::lexer::token::{Keyword, Number, Punct, Token, TokenKind};
use crate::lexer::Lexer;

/// Maximum expression nesting depth. Prevents stack overflow on inputs like
/// `((((((...))))))`.
const MAX_NESTING_DEPTH: u16 = 96;

/// Result of parsing a manifest: the tree plus buffered warnings.
#[derive(Debug)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub warnings: Vec<SourceWarning>,
}

/// Result of parsing an EPP template.
#[derive(Debug)]
pub struct EppOutput {
    /// Template parameters from a leading `<%- |$x| -%>` block.
    pub parameters: Option<Vec<Parameter>>,
    pub tree: SyntaxTree,
    pub warnings: Vec<SourceWarning>,
}

/// Parses manifest source into a syntax tree, running the post-parse
/// validation walks (ineffective statements, type positions).
pub fn parse(source: &str, path: &str) -> ParseResult<ParseOutput> {
    let mut parser = Parser::new(Lexer::new(source));
    let statements = parser.parse_statements_until(|_| false)?;
    let mut warnings = parser.finish();
    validate::validate(&statements, &mut warnings)?;
    Ok(ParseOutput {
        tree: SyntaxTree::new(path, source, statements),
        warnings,
    })
}

/// Parses an EPP template into a syntax tree of render statements.
pub fn parse_epp(source: &str, path: &str) -> ParseResult<EppOutput> {
    let mut parser = Parser::new(Lexer::epp(source));
    let (parameters, statements) = parser.parse_epp_template()?;
    let mut warnings = parser.finish();
    validate::validate(&statements, &mut warnings)?;
    Ok(EppOutput {
        parameters,
        tree: SyntaxTree::new(path, source, statements),
        warnings,
    })
}

/// Parses the expression group of a `${...}` interpolation embedded in text.
///
/// `source` must start just past the `{`; `start` biases reported positions
/// so they land inside the enclosing document. Returns the expressions and
/// the position just past the balancing `}`.
pub fn parse_interpolation(source: &str, start: Position) -> ParseResult<(ExprLoc, Position)> {
    let mut parser = Parser::new(Lexer::interpolation(source, start));
    let expr = parser.parse_expression()?;
    let expr = transform_interpolated(expr);
    let end_token = parser.expect_some("'}'")?;
    if end_token.kind != TokenKind::InterpolationEnd {
        return Err(ParseError::expected_found("'}'", &end_token.kind.description(), end_token.span));
    }
    Ok((expr, end_token.span.end))
}

/// Rewrites the leading expression of an interpolation group to its
/// variable form: `${foo}` means `$foo`, `${foo[0]}` means `$foo[0]`,
/// `${0}` is the match variable `$0`, and in `${foo + 1}` the leftmost
/// name becomes the variable.
fn transform_interpolated(expr: ExprLoc) -> ExprLoc {
    let span = expr.span;
    match expr.expr {
        Expr::Name(name) | Expr::BareWord(name) => ExprLoc::new(Expr::Variable(name), span),
        Expr::Integer(value) if value >= 0 => ExprLoc::new(Expr::Variable(value.to_string()), span),
        Expr::Binary(binary) => {
            let binary = *binary;
            ExprLoc::new(
                Expr::Binary(Box::new(BinaryExpr {
                    left: transform_interpolated(binary.left),
                    op: binary.op,
                    op_span: binary.op_span,
                    right: binary.right,
                })),
                span,
            )
        }
        Expr::Access(access) => {
            let access = *access;
            let target = transform_interpolated_base(access.target);
            ExprLoc::new(
                Expr::Access(Box::new(AccessExpr {
                    target,
                    args: access.args,
                })),
                span,
            )
        }
        Expr::MethodCall(call) => {
            let call = *call;
            let target = transform_interpolated_base(call.target);
            ExprLoc::new(
                Expr::MethodCall(Box::new(MethodCall {
                    target,
                    name: call.name,
                    name_span: call.name_span,
                    args: call.args,
                    lambda: call.lambda,
                })),
                span,
            )
        }
        other => ExprLoc::new(other, span),
    }
}

/// Rewrites only a bare-name base (not nested expressions) to a variable.
fn transform_interpolated_base(expr: ExprLoc) -> ExprLoc {
    let span = expr.span;
    match expr.expr {
        Expr::Name(name) | Expr::BareWord(name) => ExprLoc::new(Expr::Variable(name), span),
        Expr::Access(access) => {
            let access = *access;
            ExprLoc::new(
                Expr::Access(Box::new(AccessExpr {
                    target: transform_interpolated_base(access.target),
                    args: access.args,
                })),
                span,
            )
        }
        other => ExprLoc::new(other, span),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    buffer: VecDeque<Token>,
    warnings: Vec<SourceWarning>,
    depth: u16,
    /// Span of the most recently consumed token, for accurate end positions.
    last_span: Span,
    /// True while parsing the head expression of `if`/`unless`/`case`,
    /// where `name {` must not be taken as a resource declaration because
    /// the `{` belongs to the control structure.
    no_brace_forms: bool,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            buffer: VecDeque::new(),
            warnings: Vec::new(),
            depth: 0,
            last_span: Span::default(),
            no_brace_forms: false,
        }
    }

    fn finish(mut self) -> Vec<SourceWarning> {
        let mut warnings = self.lexer.drain_warnings();
        warnings.append(&mut self.warnings);
        warnings
    }

    // --- token access ---

    fn fill(&mut self, count: usize) -> ParseResult<()> {
        while self.buffer.len() < count {
            match self.lexer.next_token()? {
                Some(token) => self.buffer.push_back(token),
                None => break,
            }
        }
        Ok(())
    }

    fn peek(&mut self) -> ParseResult<Option<&Token>> {
        self.fill(1)?;
        Ok(self.buffer.front())
    }

    fn peek_kind(&mut self) -> ParseResult<Option<&TokenKind>> {
        Ok(self.peek()?.map(|token| &token.kind))
    }

    fn peek2(&mut self) -> ParseResult<Option<&Token>> {
        self.fill(2)?;
        Ok(self.buffer.get(1))
    }

    fn next(&mut self) -> ParseResult<Option<Token>> {
        self.fill(1)?;
        let token = self.buffer.pop_front();
        if let Some(token) = &token {
            self.last_span = token.span;
        }
        Ok(token)
    }

    fn end_span(&self) -> Span {
        self.last_span
    }

    /// Consumes the next token, failing with unexpected-end when input is
    /// exhausted.
    fn expect_some(&mut self, expected: &str) -> ParseResult<Token> {
        let span = self.end_span();
        self.next()?
            .ok_or_else(|| ParseError::unexpected_end(expected, span))
    }

    fn at_punct(&mut self, punct: Punct) -> ParseResult<bool> {
        Ok(self.peek_kind()?.is_some_and(|kind| kind.is_punct(punct)))
    }

    fn eat_punct(&mut self, punct: Punct) -> ParseResult<Option<Span>> {
        if self.at_punct(punct)? {
            let token = self.expect_some("a token")?;
            return Ok(Some(token.span));
        }
        Ok(None)
    }

    fn expect_punct(&mut self, punct: Punct, context: &str) -> ParseResult<Span> {
        let token = self.expect_some(&format!("'{punct}'"))?;
        if token.kind.is_punct(punct) {
            Ok(token.span)
        } else {
            Err(ParseError::expected_found(
                &format!("'{punct}' {context}"),
                &token.kind.description(),
                token.span,
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Span> {
        let token = self.expect_some(&format!("keyword '{keyword}'"))?;
        if token.kind.is_keyword(keyword) {
            Ok(token.span)
        } else {
            Err(ParseError::expected_found(
                &format!("keyword '{keyword}'"),
                &token.kind.description(),
                token.span,
            ))
        }
    }

    /// Consumes a name-like token, returning its text.
    fn expect_name(&mut self, context: &str) -> ParseResult<(String, Span)> {
        let token = self.expect_some(context)?;
        match token.kind {
            TokenKind::Name(name) | TokenKind::StatementCall(name) | TokenKind::BareWord(name) => {
                Ok((name, token.span))
            }
            other => Err(ParseError::expected_found(context, &other.description(), token.span)),
        }
    }

    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new("expression nesting is too deep", self.end_span()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // --- statements ---

    fn parse_statements_until(&mut self, stop: impl Fn(&TokenKind) -> bool + Copy) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            let Some(token) = self.peek()? else {
                break;
            };
            if stop(&token.kind) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_block(&mut self, context: &str) -> ParseResult<Vec<Statement>> {
        self.expect_punct(Punct::LeftBrace, context)?;
        let statements = self.parse_statements_until(|kind| kind.is_punct(Punct::RightBrace))?;
        self.expect_punct(Punct::RightBrace, context)?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let Some(kind) = self.peek_kind()?.cloned() else {
            return Err(ParseError::unexpected_end("a statement", self.end_span()));
        };
        match kind {
            TokenKind::Keyword(Keyword::Class) => {
                // `class { 'name': }` is a resource expression, not a definition
                if self.peek2_is_brace()? {
                    Ok(Statement::Expression(self.parse_expression()?))
                } else {
                    self.parse_class()
                }
            }
            TokenKind::Keyword(Keyword::Define) => self.parse_defined_type(),
            TokenKind::Keyword(Keyword::Node) => self.parse_node(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function(),
            TokenKind::Keyword(Keyword::Type) if self.peek2_is_type_name()? => self.parse_type_alias(),
            TokenKind::Keyword(Keyword::Application) => self.parse_application(),
            TokenKind::Keyword(Keyword::Site) => self.parse_site(),
            TokenKind::Keyword(Keyword::Attr | Keyword::Private) => {
                let token = self.expect_some("a statement")?;
                Err(ParseError::unexpected(&token.kind.description(), token.span))
            }
            TokenKind::TypeName(_) if self.peek2_is_capability_keyword()? => self.parse_capability(),
            TokenKind::Name(name) if name == "break" => {
                let token = self.expect_some("a statement")?;
                let mut span = token.span;
                if self.at_punct(Punct::LeftParen)? {
                    self.expect_punct(Punct::LeftParen, "after 'break'")?;
                    span = span.merge(self.expect_punct(Punct::RightParen, "after 'break('")?);
                }
                Ok(Statement::Break(span))
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn peek2_is_brace(&mut self) -> ParseResult<bool> {
        Ok(self.peek2()?.is_some_and(|token| token.kind.is_punct(Punct::LeftBrace)))
    }

    fn peek2_is_type_name(&mut self) -> ParseResult<bool> {
        Ok(self.peek2()?.is_some_and(|token| matches!(token.kind, TokenKind::TypeName(_))))
    }

    fn peek2_is_capability_keyword(&mut self) -> ParseResult<bool> {
        Ok(self
            .peek2()?
            .is_some_and(|token| token.kind.is_keyword(Keyword::Produces) || token.kind.is_keyword(Keyword::Consumes)))
    }

    fn parse_class(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Class)?;
        let (name, name_span) = self.expect_name("a class name")?;
        let parameters = self.parse_optional_parameters()?;
        let parent = if self.peek_kind()?.is_some_and(|kind| kind.is_keyword(Keyword::Inherits)) {
            self.expect_keyword(Keyword::Inherits)?;
            let (parent, parent_span) = self.expect_name("a parent class name")?;
            Some((parent, parent_span))
        } else {
            None
        };
        let body = self.parse_block("to open the class body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::Class(ClassStatement {
            name,
            name_span,
            parameters,
            parent,
            body,
            span,
        }))
    }

    fn parse_defined_type(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Define)?;
        let (name, name_span) = self.expect_name("a defined type name")?;
        let parameters = self.parse_optional_parameters()?;
        let body = self.parse_block("to open the defined type body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::DefinedType(DefinedTypeStatement {
            name,
            name_span,
            parameters,
            body,
            span,
        }))
    }

    fn parse_function(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Function)?;
        let (name, name_span) = self.expect_name("a function name")?;
        let parameters = self.parse_optional_parameters()?;
        let body = self.parse_block("to open the function body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::Function(FunctionStatement {
            name,
            name_span,
            parameters,
            body,
            span,
        }))
    }

    fn parse_application(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Application)?;
        let (name, name_span) = self.expect_name("an application name")?;
        let parameters = self.parse_optional_parameters()?;
        let body = self.parse_block("to open the application body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::Application(ApplicationStatement {
            name,
            name_span,
            parameters,
            body,
            span,
        }))
    }

    fn parse_site(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Site)?;
        let body = self.parse_block("to open the site body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::Site(SiteStatement { body, span }))
    }

    fn parse_type_alias(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Type)?;
        let token = self.expect_some("a type name")?;
        let (name, name_span) = match token.kind {
            TokenKind::TypeName(name) => (name, token.span),
            other => return Err(ParseError::expected_found("a type name", &other.description(), token.span)),
        };
        self.expect_punct(Punct::Assign, "in type alias")?;
        let aliased = self.parse_expression()?;
        let span = begin.merge(aliased.span);
        Ok(Statement::TypeAlias(TypeAliasStatement {
            name,
            name_span,
            aliased,
            span,
        }))
    }

    fn parse_capability(&mut self) -> ParseResult<Statement> {
        let token = self.expect_some("a type name")?;
        let TokenKind::TypeName(resource_type) = token.kind else {
            return Err(ParseError::expected_found(
                "a type name",
                &token.kind.description(),
                token.span,
            ));
        };
        let begin = token.span;
        let keyword = self.expect_some("'produces' or 'consumes'")?;
        let kind = match &keyword.kind {
            TokenKind::Keyword(Keyword::Produces) => CapabilityKind::Produces,
            TokenKind::Keyword(Keyword::Consumes) => CapabilityKind::Consumes,
            other => {
                return Err(ParseError::expected_found(
                    "'produces' or 'consumes'",
                    &other.description(),
                    keyword.span,
                ));
            }
        };
        let capability_token = self.expect_some("a capability type name")?;
        let TokenKind::TypeName(capability) = capability_token.kind else {
            return Err(ParseError::expected_found(
                "a capability type name",
                &capability_token.kind.description(),
                capability_token.span,
            ));
        };
        self.expect_punct(Punct::LeftBrace, "to open the capability mapping")?;
        let operations = self.parse_attribute_operations()?;
        let end = self.expect_punct(Punct::RightBrace, "to close the capability mapping")?;
        Ok(Statement::Capability(CapabilityMapping {
            resource_type,
            kind,
            capability,
            operations,
            span: begin.merge(end),
        }))
    }

    fn parse_node(&mut self) -> ParseResult<Statement> {
        let begin = self.expect_keyword(Keyword::Node)?;
        let mut hostnames = Vec::new();
        loop {
            hostnames.push(self.parse_hostname()?);
            if self.eat_punct(Punct::Comma)?.is_none() {
                break;
            }
        }
        let body = self.parse_block("to open the node body")?;
        let span = begin.merge(self.last_span);
        Ok(Statement::Node(NodeStatement { hostnames, body, span }))
    }

    /// A hostname: `default`, a regex, a string, or dotted name parts
    /// (`foo.bar-baz.com` glues name, bare-word, and number segments).
    fn parse_hostname(&mut self) -> ParseResult<(Hostname, Span)> {
        let token = self.expect_some("a hostname")?;
        let begin = token.span;
        match token.kind {
            TokenKind::Keyword(Keyword::Default) => Ok((Hostname::Default, begin)),
            TokenKind::Regex(pattern) => Ok((Hostname::Regex(pattern), begin)),
            TokenKind::LiteralString(text) => Ok((Hostname::Literal(text), begin)),
            TokenKind::Name(first) | TokenKind::BareWord(first) | TokenKind::StatementCall(first) => {
                let mut text = first;
                let mut span = begin;
                while self.at_punct(Punct::Dot)? {
                    span = span.merge(self.expect_punct(Punct::Dot, "in hostname")?);
                    let part = self.expect_some("a hostname part")?;
                    let piece = match part.kind {
                        TokenKind::Name(p) | TokenKind::BareWord(p) | TokenKind::StatementCall(p) => p,
                        TokenKind::Number { value: Number::Integer(n), .. } => n.to_string(),
                        other => {
                            return Err(ParseError::expected_found(
                                "a hostname part",
                                &other.description(),
                                part.span,
                            ));
                        }
                    };
                    text.push('.');
                    text.push_str(&piece);
                    span = span.merge(part.span);
                }
                Ok((Hostname::Literal(text), span))
            }
            TokenKind::Number { value: Number::Integer(n), .. } => Ok((Hostname::Literal(n.to_string()), begin)),
            other => Err(ParseError::expected_found("a hostname", &other.description(), begin)),
        }
    }

    // --- parameters ---

    fn parse_optional_parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        if self.at_punct(Punct::LeftParen)? {
            self.parse_parameters(Punct::LeftParen, Punct::RightParen)
        } else {
            Ok(Vec::new())
        }
    }

    /// Parses a parameter list delimited by the given punctuators
    /// (parentheses for definitions, pipes for lambdas).
    fn parse_parameters(&mut self, open: Punct, close: Punct) -> ParseResult<Vec<Parameter>> {
        self.expect_punct(open, "to open the parameter list")?;
        let mut parameters = Vec::new();
        loop {
            if self.eat_punct(close)?.is_some() {
                break;
            }
            parameters.push(self.parse_parameter()?);
            if self.eat_punct(Punct::Comma)?.is_none() {
                self.expect_punct(close, "to close the parameter list")?;
                break;
            }
        }
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let type_expr = if self.peek_kind()?.is_some_and(|kind| matches!(kind, TokenKind::TypeName(_))) {
            Some(self.parse_postfix()?)
        } else {
            None
        };
        let captures_rest = self.eat_punct(Punct::Multiply)?.is_some();
        let token = self.expect_some("a parameter name")?;
        let TokenKind::Variable(name) = token.kind else {
            return Err(ParseError::expected_found(
                "a parameter name",
                &token.kind.description(),
                token.span,
            ));
        };
        let default = if self.eat_punct(Punct::Assign)?.is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Parameter {
            type_expr,
            captures_rest,
            name,
            name_span: token.span,
            default,
        })
    }

    /// Parses a lambda if the next token is `|`.
    fn parse_optional_lambda(&mut self) -> ParseResult<Option<Lambda>> {
        if !self.at_punct(Punct::Pipe)? {
            return Ok(None);
        }
        let begin = self.end_span();
        let parameters = self.parse_parameters(Punct::Pipe, Punct::Pipe)?;
        let body = self.parse_block("to open the lambda body")?;
        let span = begin.merge(self.last_span);
        Ok(Some(Lambda { parameters, body, span }))
    }

    // --- expressions ---

    fn parse_expression(&mut self) -> ParseResult<ExprLoc> {
        self.parse_binary(0)
    }

    /// Precedence climbing: consumes operators at or above `min_prec`,
    /// recursing on the right with `precedence + 1` (or the same precedence
    /// for right-associative assignment).
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<ExprLoc> {
        let mut left = self.parse_postfix()?;
        loop {
            let Some((op, op_span)) = self.peek_binary_op()? else {
                break;
            };
            if op.precedence() < min_prec {
                break;
            }
            self.next()?;
            let next_min = if op.right_associative() {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let right = self.descend(|parser| parser.parse_binary(next_min))?;
            let span = left.span.merge(right.span);
            left = ExprLoc::new(
                Expr::Binary(Box::new(BinaryExpr {
                    left,
                    op,
                    op_span,
                    right,
                })),
                span,
            );
        }
        Ok(left)
    }

    fn peek_binary_op(&mut self) -> ParseResult<Option<(BinaryOp, Span)>> {
        let Some(token) = self.peek()? else {
            return Ok(None);
        };
        let op = match &token.kind {
            TokenKind::Punct(punct) => match punct {
                Punct::Assign => BinaryOp::Assign,
                Punct::Equals => BinaryOp::Equals,
                Punct::NotEquals => BinaryOp::NotEquals,
                Punct::Match => BinaryOp::Match,
                Punct::NotMatch => BinaryOp::NotMatch,
                Punct::Less => BinaryOp::Less,
                Punct::LessEqual => BinaryOp::LessEqual,
                Punct::Greater => BinaryOp::Greater,
                Punct::GreaterEqual => BinaryOp::GreaterEqual,
                Punct::Plus => BinaryOp::Plus,
                Punct::Minus => BinaryOp::Minus,
                Punct::Multiply => BinaryOp::Multiply,
                Punct::Divide => BinaryOp::Divide,
                Punct::Modulo => BinaryOp::Modulo,
                Punct::LeftShift => BinaryOp::LeftShift,
                Punct::RightShift => BinaryOp::RightShift,
                Punct::InEdge => BinaryOp::InEdge,
                Punct::InEdgeSubscribe => BinaryOp::InEdgeSubscribe,
                Punct::OutEdge => BinaryOp::OutEdge,
                Punct::OutEdgeSubscribe => BinaryOp::OutEdgeSubscribe,
                _ => return Ok(None),
            },
            TokenKind::Keyword(Keyword::And) => BinaryOp::And,
            TokenKind::Keyword(Keyword::Or) => BinaryOp::Or,
            TokenKind::Keyword(Keyword::In) => BinaryOp::In,
            _ => return Ok(None),
        };
        Ok(Some((op, token.span)))
    }

    /// A primary followed by zero or more access, method call, or selector
    /// postfixes. A `{` after a type-name access becomes a resource
    /// override.
    fn parse_postfix(&mut self) -> ParseResult<ExprLoc> {
        let mut expr = self.parse_primary()?;
        loop {
            let Some(kind) = self.peek_kind()?.cloned() else {
                break;
            };
            match kind {
                TokenKind::Punct(Punct::LeftBracket) => {
                    self.next()?;
                    let mut args = Vec::new();
                    loop {
                        if self.at_punct(Punct::RightBracket)? {
                            break;
                        }
                        args.push(self.parse_expression()?);
                        if self.eat_punct(Punct::Comma)?.is_none() {
                            break;
                        }
                    }
                    let end = self.expect_punct(Punct::RightBracket, "to close the access expression")?;
                    let span = expr.span.merge(end);
                    expr = ExprLoc::new(Expr::Access(Box::new(AccessExpr { target: expr, args })), span);

                    // Type[title] { ... } is a resource override
                    if !self.no_brace_forms && self.at_punct(Punct::LeftBrace)? && is_type_access(&expr.expr) {
                        self.expect_punct(Punct::LeftBrace, "to open the override")?;
                        let operations = self.parse_attribute_operations()?;
                        let end = self.expect_punct(Punct::RightBrace, "to close the override")?;
                        let span = expr.span.merge(end);
                        expr = ExprLoc::new(
                            Expr::ResourceOverride(Box::new(ResourceOverrideExpr {
                                reference: expr,
                                operations,
                            })),
                            span,
                        );
                        return Ok(expr);
                    }
                }
                TokenKind::Punct(Punct::Dot) => {
                    self.next()?;
                    let (name, name_span) = self.expect_name("a method name")?;
                    let mut args = Vec::new();
                    if self.eat_punct(Punct::LeftParen)?.is_some() {
                        loop {
                            if self.at_punct(Punct::RightParen)? {
                                break;
                            }
                            args.push(self.parse_expression()?);
                            if self.eat_punct(Punct::Comma)?.is_none() {
                                break;
                            }
                        }
                        self.expect_punct(Punct::RightParen, "to close the argument list")?;
                    }
                    let lambda = self.parse_optional_lambda()?;
                    let span = expr.span.merge(self.last_span).merge(name_span);
                    expr = ExprLoc::new(
                        Expr::MethodCall(Box::new(MethodCall {
                            target: expr,
                            name,
                            name_span,
                            args,
                            lambda,
                        })),
                        span,
                    );
                }
                TokenKind::Punct(Punct::Question) => {
                    self.next()?;
                    self.expect_punct(Punct::LeftBrace, "to open the selector")?;
                    let mut cases = Vec::new();
                    loop {
                        if self.at_punct(Punct::RightBrace)? {
                            break;
                        }
                        let option = self.parse_selector_option()?;
                        self.expect_punct(Punct::FatArrow, "in selector case")?;
                        let value = self.parse_expression()?;
                        cases.push((option, value));
                        if self.eat_punct(Punct::Comma)?.is_none() {
                            break;
                        }
                    }
                    let end = self.expect_punct(Punct::RightBrace, "to close the selector")?;
                    let span = expr.span.merge(end);
                    expr = ExprLoc::new(Expr::Selector(Box::new(SelectorExpr { target: expr, cases })), span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// A selector or case option: `default` or an expression.
    fn parse_selector_option(&mut self) -> ParseResult<ExprLoc> {
        if self.peek_kind()?.is_some_and(|kind| kind.is_keyword(Keyword::Default)) {
            let token = self.expect_some("an option")?;
            return Ok(ExprLoc::new(Expr::Default, token.span));
        }
        self.parse_expression()
    }

    fn parse_primary(&mut self) -> ParseResult<ExprLoc> {
        self.descend(Self::parse_primary_inner)
    }

    fn parse_primary_inner(&mut self) -> ParseResult<ExprLoc> {
        let token = self.expect_some("an expression")?;
        let span = token.span;
        match token.kind {
            TokenKind::Number { value: Number::Integer(n), .. } => Ok(ExprLoc::new(Expr::Integer(n), span)),
            TokenKind::Number { value: Number::Float(f), .. } => Ok(ExprLoc::new(Expr::Float(f), span)),
            TokenKind::LiteralString(text) => Ok(ExprLoc::new(Expr::String(text), span)),
            TokenKind::StringStart => self.parse_interpolated_string(span),
            TokenKind::Heredoc(heredoc) => Ok(ExprLoc::new(Expr::Heredoc(heredoc), span)),
            TokenKind::Regex(pattern) => Ok(ExprLoc::new(Expr::Regex(pattern), span)),
            TokenKind::Variable(name) => Ok(ExprLoc::new(Expr::Variable(name), span)),
            TokenKind::Keyword(Keyword::Undef) => Ok(ExprLoc::new(Expr::Undef, span)),
            TokenKind::Keyword(Keyword::Default) => Ok(ExprLoc::new(Expr::Default, span)),
            TokenKind::Keyword(Keyword::True) => Ok(ExprLoc::new(Expr::Boolean(true), span)),
            TokenKind::Keyword(Keyword::False) => Ok(ExprLoc::new(Expr::Boolean(false), span)),
            TokenKind::Keyword(Keyword::If) => self.parse_if(span, false),
            TokenKind::Keyword(Keyword::Unless) => self.parse_if(span, true),
            TokenKind::Keyword(Keyword::Case) => self.parse_case(span),
            TokenKind::Keyword(Keyword::Class) => {
                // `class { 'name': }` declares classes as resources
                if !self.at_punct(Punct::LeftBrace)? {
                    return Err(ParseError::unexpected("keyword 'class'", span));
                }
                self.parse_resource_bodies(ResourceStatus::Realized, ResourceType::Class, span)
            }
            TokenKind::Punct(Punct::Minus) => {
                let operand = self.parse_postfix()?;
                let span = span.merge(operand.span);
                Ok(ExprLoc::new(Expr::Negate(Box::new(operand)), span))
            }
            TokenKind::Punct(Punct::Not) => {
                let operand = self.parse_postfix()?;
                let span = span.merge(operand.span);
                Ok(ExprLoc::new(Expr::Not(Box::new(operand)), span))
            }
            TokenKind::Punct(Punct::Multiply) => {
                let operand = self.parse_postfix()?;
                let span = span.merge(operand.span);
                Ok(ExprLoc::new(Expr::Splat(Box::new(operand)), span))
            }
            TokenKind::Punct(Punct::LeftParen) => {
                let saved = self.no_brace_forms;
                self.no_brace_forms = false;
                let inner = self.parse_expression();
                self.no_brace_forms = saved;
                let inner = inner?;
                let end = self.expect_punct(Punct::RightParen, "to close the expression")?;
                Ok(ExprLoc::new(inner.expr, span.merge(end)))
            }
            TokenKind::Punct(Punct::LeftBracket) => {
                let mut elements = Vec::new();
                loop {
                    if self.at_punct(Punct::RightBracket)? {
                        break;
                    }
                    elements.push(self.parse_expression()?);
                    if self.eat_punct(Punct::Comma)?.is_none() {
                        break;
                    }
                }
                let end = self.expect_punct(Punct::RightBracket, "to close the array")?;
                Ok(ExprLoc::new(Expr::Array(elements), span.merge(end)))
            }
            TokenKind::Punct(Punct::LeftBrace) => {
                let mut pairs = Vec::new();
                loop {
                    if self.at_punct(Punct::RightBrace)? {
                        break;
                    }
                    let key = self.parse_expression()?;
                    self.expect_punct(Punct::FatArrow, "in hash entry")?;
                    let value = self.parse_expression()?;
                    pairs.push((key, value));
                    if self.eat_punct(Punct::Comma)?.is_none() {
                        break;
                    }
                }
                let end = self.expect_punct(Punct::RightBrace, "to close the hash")?;
                Ok(ExprLoc::new(Expr::Hash(pairs), span.merge(end)))
            }
            TokenKind::Punct(Punct::At) => self.parse_status_resource(ResourceStatus::Virtual, span),
            TokenKind::Punct(Punct::AtAt) => self.parse_status_resource(ResourceStatus::Exported, span),
            TokenKind::TypeName(name) => self.parse_type_name_form(name, span),
            TokenKind::Name(name) => {
                if self.at_punct(Punct::LeftParen)? {
                    return self.parse_function_call(name, span);
                }
                if !self.no_brace_forms && self.at_punct(Punct::LeftBrace)? {
                    return self.parse_resource_bodies(ResourceStatus::Realized, ResourceType::Name(name), span);
                }
                Ok(ExprLoc::new(Expr::Name(name), span))
            }
            TokenKind::StatementCall(name) => {
                if self.at_punct(Punct::LeftParen)? {
                    return self.parse_function_call(name, span);
                }
                if self.starts_expression()? {
                    // Statement form: arguments without parentheses
                    let mut args = Vec::new();
                    loop {
                        args.push(self.parse_expression()?);
                        if self.eat_punct(Punct::Comma)?.is_none() {
                            break;
                        }
                    }
                    let end = args.last().map_or(span, |arg| arg.span);
                    let span = span.merge(end);
                    return Ok(ExprLoc::new(
                        Expr::FunctionCall(Box::new(FunctionCall {
                            name,
                            name_span: token.span,
                            args,
                            lambda: None,
                        })),
                        span,
                    ));
                }
                Ok(ExprLoc::new(Expr::Name(name), span))
            }
            TokenKind::BareWord(word) => Ok(ExprLoc::new(Expr::BareWord(word), span)),
            other => Err(ParseError::unexpected(&other.description(), span)),
        }
    }

    /// True when the next token can begin an expression (used for
    /// statement-call argument detection).
    fn starts_expression(&mut self) -> ParseResult<bool> {
        let Some(kind) = self.peek_kind()? else {
            return Ok(false);
        };
        Ok(match kind {
            TokenKind::Number { .. }
            | TokenKind::LiteralString(_)
            | TokenKind::StringStart
            | TokenKind::Heredoc(_)
            | TokenKind::Regex(_)
            | TokenKind::Variable(_)
            | TokenKind::Name(_)
            | TokenKind::BareWord(_)
            | TokenKind::TypeName(_)
            | TokenKind::StatementCall(_) => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Undef
                    | Keyword::Default
                    | Keyword::True
                    | Keyword::False
                    | Keyword::If
                    | Keyword::Unless
                    | Keyword::Case
                    | Keyword::Class
            ),
            TokenKind::Punct(punct) => matches!(
                punct,
                Punct::Minus
                    | Punct::Not
                    | Punct::Multiply
                    | Punct::LeftParen
                    | Punct::LeftBracket
                    | Punct::LeftBrace
                    | Punct::At
                    | Punct::AtAt
            ),
            _ => false,
        })
    }

    fn parse_function_call(&mut self, name: String, name_span: Span) -> ParseResult<ExprLoc> {
        self.expect_punct(Punct::LeftParen, "to open the argument list")?;
        let mut args = Vec::new();
        loop {
            if self.at_punct(Punct::RightParen)? {
                break;
            }
            args.push(self.parse_expression()?);
            if self.eat_punct(Punct::Comma)?.is_none() {
                break;
            }
        }
        let end = self.expect_punct(Punct::RightParen, "to close the argument list")?;
        let lambda = self.parse_optional_lambda()?;
        let span = name_span.merge(end).merge(self.last_span);
        Ok(ExprLoc::new(
            Expr::FunctionCall(Box::new(FunctionCall {
                name,
                name_span,
                args,
                lambda,
            })),
            span,
        ))
    }

    /// A type name in primary position: possibly a collector, resource
    /// defaults, or a plain type-name operand.
    fn parse_type_name_form(&mut self, name: String, span: Span) -> ParseResult<ExprLoc> {
        if self.at_punct(Punct::LeftCollect)? || self.at_punct(Punct::LeftExportCollect)? {
            return self.parse_collector(name, span);
        }
        if !self.no_brace_forms && self.at_punct(Punct::LeftBrace)? {
            self.expect_punct(Punct::LeftBrace, "to open the defaults")?;
            let operations = self.parse_attribute_operations()?;
            let end = self.expect_punct(Punct::RightBrace, "to close the defaults")?;
            return Ok(ExprLoc::new(
                Expr::ResourceDefaults(Box::new(ResourceDefaultsExpr {
                    type_name: name,
                    type_span: span,
                    operations,
                })),
                span.merge(end),
            ));
        }
        Ok(ExprLoc::new(Expr::TypeName(name), span))
    }

    fn parse_collector(&mut self, type_name: String, type_span: Span) -> ParseResult<ExprLoc> {
        let exported = if self.eat_punct(Punct::LeftCollect)?.is_some() {
            false
        } else {
            self.expect_punct(Punct::LeftExportCollect, "to open the collector")?;
            true
        };
        let close = if exported { Punct::RightExportCollect } else { Punct::RightCollect };
        let query = if self.at_punct(close)? {
            None
        } else {
            Some(self.parse_query(0)?)
        };
        let mut end = self.expect_punct(close, "to close the collector")?;

        // Optional attribute-override tail
        let mut operations = Vec::new();
        if !self.no_brace_forms && self.at_punct(Punct::LeftBrace)? {
            self.expect_punct(Punct::LeftBrace, "to open the collector attributes")?;
            operations = self.parse_attribute_operations()?;
            end = self.expect_punct(Punct::RightBrace, "to close the collector attributes")?;
        }

        Ok(ExprLoc::new(
            Expr::Collector(Box::new(CollectorExpr {
                type_name,
                type_span,
                exported,
                query,
                operations,
            })),
            type_span.merge(end),
        ))
    }

    /// Attribute queries use their own climb with `or` binding looser than
    /// `and` (1 and 2 respectively, per the language).
    fn parse_query(&mut self, min_prec: u8) -> ParseResult<Query> {
        let mut left = self.parse_query_primary()?;
        loop {
            let Some(kind) = self.peek_kind()? else {
                break;
            };
            let (prec, is_and) = match kind {
                TokenKind::Keyword(Keyword::Or) => (1, false),
                TokenKind::Keyword(Keyword::And) => (2, true),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            self.next()?;
            let right = self.parse_query(prec + 1)?;
            left = if is_and {
                Query::And(Box::new(left), Box::new(right))
            } else {
                Query::Or(Box::new(left), Box::new(right))
            };
        }
        Ok(left)
    }

    fn parse_query_primary(&mut self) -> ParseResult<Query> {
        if self.eat_punct(Punct::LeftParen)?.is_some() {
            let inner = self.parse_query(0)?;
            self.expect_punct(Punct::RightParen, "to close the query")?;
            return Ok(inner);
        }
        let (attribute, attribute_span) = self.expect_name("an attribute name")?;
        let op_token = self.expect_some("'==' or '!='")?;
        let op = match &op_token.kind {
            TokenKind::Punct(Punct::Equals) => QueryOp::Equals,
            TokenKind::Punct(Punct::NotEquals) => QueryOp::NotEquals,
            other => {
                return Err(ParseError::expected_found(
                    "'==' or '!='",
                    &other.description(),
                    op_token.span,
                ));
            }
        };
        let value = self.parse_expression()?;
        Ok(Query::Condition {
            attribute,
            attribute_span,
            op,
            value,
        })
    }

    fn parse_status_resource(&mut self, status: ResourceStatus, begin: Span) -> ParseResult<ExprLoc> {
        let token = self.expect_some("a resource type name")?;
        let resource_type = match token.kind {
            TokenKind::Name(name) | TokenKind::StatementCall(name) => ResourceType::Name(name),
            TokenKind::Keyword(Keyword::Class) => ResourceType::Class,
            other => {
                return Err(ParseError::expected_found(
                    "a resource type name",
                    &other.description(),
                    token.span,
                ));
            }
        };
        self.parse_resource_bodies(status, resource_type, begin.merge(token.span))
    }

    /// The brace-delimited bodies of a resource declaration:
    /// `{ title: attr => value; title2: ... }`.
    fn parse_resource_bodies(
        &mut self,
        status: ResourceStatus,
        resource_type: ResourceType,
        type_span: Span,
    ) -> ParseResult<ExprLoc> {
        self.expect_punct(Punct::LeftBrace, "to open the resource declaration")?;
        let mut bodies = Vec::new();
        loop {
            if self.at_punct(Punct::RightBrace)? {
                break;
            }
            let title = self.parse_resource_title()?;
            self.expect_punct(Punct::Colon, "after the resource title")?;
            let operations = self.parse_attribute_operations()?;
            bodies.push(ResourceBody { title, operations });
            if self.eat_punct(Punct::Semicolon)?.is_none() {
                break;
            }
        }
        let end = self.expect_punct(Punct::RightBrace, "to close the resource declaration")?;
        Ok(ExprLoc::new(
            Expr::Resource(Box::new(ResourceExpr {
                status,
                resource_type,
                type_span,
                bodies,
            })),
            type_span.merge(end),
        ))
    }

    /// A resource title, which may be a comma list (an implicit array).
    fn parse_resource_title(&mut self) -> ParseResult<ExprLoc> {
        let first = self.parse_expression()?;
        if !self.at_punct(Punct::Comma)? {
            return Ok(first);
        }
        let mut titles = vec![first];
        while self.eat_punct(Punct::Comma)?.is_some() {
            if self.at_punct(Punct::Colon)? {
                break;
            }
            titles.push(self.parse_expression()?);
        }
        let span = titles
            .first()
            .map(|t| t.span)
            .unwrap_or_default()
            .merge(titles.last().map(|t| t.span).unwrap_or_default());
        Ok(ExprLoc::new(Expr::Array(titles), span))
    }

    /// `name => value` / `name +> value` pairs separated by commas.
    fn parse_attribute_operations(&mut self) -> ParseResult<Vec<AttributeOperation>> {
        let mut operations = Vec::new();
        loop {
            let Some(token) = self.peek()? else {
                break;
            };
            let (name, name_span) = match &token.kind {
                TokenKind::Name(name) | TokenKind::StatementCall(name) | TokenKind::BareWord(name) => {
                    (name.clone(), token.span)
                }
                TokenKind::Keyword(keyword) => (keyword.to_string(), token.span),
                _ => break,
            };
            self.next()?;
            let op_token = self.expect_some("'=>' or '+>'")?;
            let append = match &op_token.kind {
                TokenKind::Punct(Punct::FatArrow) => false,
                TokenKind::Punct(Punct::PlusArrow) => true,
                other => {
                    return Err(ParseError::expected_found(
                        "'=>' or '+>'",
                        &other.description(),
                        op_token.span,
                    ));
                }
            };
            let value = self.parse_expression()?;
            operations.push(AttributeOperation {
                name,
                name_span,
                append,
                value,
            });
            if self.eat_punct(Punct::Comma)?.is_none() {
                break;
            }
        }
        Ok(operations)
    }

    // --- control flow ---

    fn parse_condition(&mut self) -> ParseResult<ExprLoc> {
        let saved = self.no_brace_forms;
        self.no_brace_forms = true;
        let condition = self.parse_expression();
        self.no_brace_forms = saved;
        condition
    }

    fn parse_if(&mut self, begin: Span, unless: bool) -> ParseResult<ExprLoc> {
        let condition = self.parse_condition()?;
        let body = self.parse_block("to open the body")?;
        let mut elsifs = Vec::new();
        let mut else_body = None;
        loop {
            let Some(kind) = self.peek_kind()? else {
                break;
            };
            if kind.is_keyword(Keyword::Elsif) {
                if unless {
                    let token = self.expect_some("a statement")?;
                    return Err(ParseError::unexpected("keyword 'elsif' after 'unless'", token.span));
                }
                self.expect_keyword(Keyword::Elsif)?;
                let elsif_condition = self.parse_condition()?;
                let elsif_body = self.parse_block("to open the body")?;
                elsifs.push((elsif_condition, elsif_body));
            } else if kind.is_keyword(Keyword::Else) {
                self.expect_keyword(Keyword::Else)?;
                else_body = Some(self.parse_block("to open the body")?);
                break;
            } else {
                break;
            }
        }
        let span = begin.merge(self.last_span);
        let if_expr = Box::new(IfExpr {
            condition,
            body,
            elsifs,
            else_body,
        });
        let expr = if unless { Expr::Unless(if_expr) } else { Expr::If(if_expr) };
        Ok(ExprLoc::new(expr, span))
    }

    fn parse_case(&mut self, begin: Span) -> ParseResult<ExprLoc> {
        let expression = self.parse_condition()?;
        self.expect_punct(Punct::LeftBrace, "to open the case body")?;
        let mut propositions = Vec::new();
        while !self.at_punct(Punct::RightBrace)? {
            let prop_begin = self.end_span();
            let mut options = vec![self.parse_selector_option()?];
            while self.eat_punct(Punct::Comma)?.is_some() {
                options.push(self.parse_selector_option()?);
            }
            self.expect_punct(Punct::Colon, "after the case options")?;
            let body = self.parse_block("to open the case body")?;
            propositions.push(CaseProposition {
                options,
                body,
                span: prop_begin.merge(self.last_span),
            });
        }
        let end = self.expect_punct(Punct::RightBrace, "to close the case expression")?;
        Ok(ExprLoc::new(
            Expr::Case(Box::new(CaseExpr {
                expression,
                propositions,
            })),
            begin.merge(end),
        ))
    }

    // --- strings ---

    /// Assembles an interpolated string from the lexer's segment tokens.
    fn parse_interpolated_string(&mut self, begin: Span) -> ParseResult<ExprLoc> {
        let mut parts = Vec::new();
        loop {
            let token = self.expect_some("the rest of the string")?;
            match token.kind {
                TokenKind::StringText(text) => parts.push(StringPart::Literal(text)),
                TokenKind::InterpolationStart => {
                    let expr = self.parse_expression()?;
                    let expr = transform_interpolated(expr);
                    let end_token = self.expect_some("'}'")?;
                    if end_token.kind != TokenKind::InterpolationEnd {
                        return Err(ParseError::expected_found(
                            "'}'",
                            &end_token.kind.description(),
                            end_token.span,
                        ));
                    }
                    parts.push(StringPart::Expression(expr));
                }
                TokenKind::StringEnd => {
                    let span = begin.merge(token.span);
                    return Ok(ExprLoc::new(Expr::InterpolatedString(parts), span));
                }
                other => {
                    return Err(ParseError::expected_found(
                        "the rest of the string",
                        &other.description(),
                        token.span,
                    ));
                }
            }
        }
    }

    // --- EPP ---

    /// Parses an EPP template: alternating render text and code blocks,
    /// with an optional leading parameter block.
    fn parse_epp_template(&mut self) -> ParseResult<(Option<Vec<Parameter>>, Vec<Statement>)> {
        let mut parameters = None;
        let mut statements: Vec<Statement> = Vec::new();
        let mut trim_next_render = false;
        let mut seen_content = false;

        while let Some(token) = self.next()? {
            match token.kind {
                TokenKind::EppRender(mut text) => {
                    if trim_next_render {
                        trim_next_render = false;
                        if let Some(stripped) = text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')) {
                            text = stripped.to_owned();
                        }
                    }
                    if !text.is_empty() {
                        seen_content = true;
                        statements.push(Statement::Expression(ExprLoc::new(Expr::RenderString(text), token.span)));
                    }
                }
                TokenKind::EppStart { trim } => {
                    if trim {
                        trim_trailing_render(&mut statements);
                    }
                    // Leading parameter block: <%- |$x| -%>
                    if !seen_content && parameters.is_none() && self.at_punct(Punct::Pipe)? {
                        parameters = Some(self.parse_parameters(Punct::Pipe, Punct::Pipe)?);
                        let end = self.expect_some("'%>'")?;
                        match end.kind {
                            TokenKind::EppEnd { trim } => trim_next_render = trim,
                            other => {
                                return Err(ParseError::expected_found("'%>'", &other.description(), end.span));
                            }
                        }
                        continue;
                    }
                    seen_content = true;
                    if self.at_punct(Punct::Assign)? {
                        // <%= expression %> renders the expression's value
                        self.expect_punct(Punct::Assign, "in render expression")?;
                        let expr = self.parse_expression()?;
                        let end = self.expect_some("'%>'")?;
                        match end.kind {
                            TokenKind::EppEnd { trim } => trim_next_render = trim,
                            other => {
                                return Err(ParseError::expected_found("'%>'", &other.description(), end.span));
                            }
                        }
                        let span = token.span.merge(expr.span);
                        statements.push(Statement::Expression(ExprLoc::new(
                            Expr::RenderExpression(Box::new(expr)),
                            span,
                        )));
                    } else {
                        let mut block =
                            self.parse_statements_until(|kind| matches!(kind, TokenKind::EppEnd { .. }))?;
                        statements.append(&mut block);
                        let end = self.expect_some("'%>'")?;
                        match end.kind {
                            TokenKind::EppEnd { trim } => trim_next_render = trim,
                            other => {
                                return Err(ParseError::expected_found("'%>'", &other.description(), end.span));
                            }
                        }
                    }
                }
                other => {
                    return Err(ParseError::unexpected(&other.description(), token.span));
                }
            }
        }
        Ok((parameters, statements))
    }
}

/// Strips trailing spaces and tabs from the last render-string statement
/// (the `<%-` trim behavior).
fn trim_trailing_render(statements: &mut Vec<Statement>) {
    if let Some(Statement::Expression(expr)) = statements.last_mut() {
        if let Expr::RenderString(text) = &mut expr.expr {
            let trimmed = text.trim_end_matches([' ', '\t']);
            if trimmed.len() != text.len() {
                *text = trimmed.to_owned();
            }
            if text.is_empty() {
                statements.pop();
            }
        }
    }
}

/// True when an expression is a bracket access whose ultimate target is a
/// type name (the shape of a resource reference like `Notify['a']`).
fn is_type_access(expr: &Expr) -> bool {
    match expr {
        Expr::Access(access) => matches!(access.target.expr, Expr::TypeName(_)) || is_type_access(&access.target.expr),
        _ => false,
    }
}
