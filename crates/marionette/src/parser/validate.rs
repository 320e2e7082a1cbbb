//! Post-parse validation walks.
//!
//! Two passes over the finished tree: one flags statements that cannot have
//! any effect (warnings), the other rejects expressions that are not legal
//! in type positions (errors).

use crate::ast::{Expr, ExprLoc, Lambda, Parameter, Statement};
use crate::error::{ParseError, ParseResult, SourceWarning};

/// Runs both validation walks over a parsed statement list.
pub fn validate(statements: &[Statement], warnings: &mut Vec<SourceWarning>) -> ParseResult<()> {
    check_effectiveness(statements, warnings);
    check_type_positions(statements)?;
    Ok(())
}

// --- ineffective statements ---

/// Flags intermediate statements whose evaluation produces no catalog
/// change and no side effect: pure literals, unary operations on literals,
/// selectors, and access expressions. The last statement of a body is its
/// value and is never flagged.
fn check_effectiveness(statements: &[Statement], warnings: &mut Vec<SourceWarning>) {
    for (index, statement) in statements.iter().enumerate() {
        let last = index + 1 == statements.len();
        if !last {
            if let Statement::Expression(expr) = statement {
                if is_ineffective(&expr.expr) {
                    warnings.push(SourceWarning {
                        span: expr.span,
                        length: expr.span.len().max(1),
                        message: "this statement has no effect".to_owned(),
                    });
                }
            }
        }
        walk_nested_bodies(statement, warnings);
    }
}

fn walk_nested_bodies(statement: &Statement, warnings: &mut Vec<SourceWarning>) {
    match statement {
        Statement::Class(s) => check_effectiveness(&s.body, warnings),
        Statement::DefinedType(s) => check_effectiveness(&s.body, warnings),
        Statement::Node(s) => check_effectiveness(&s.body, warnings),
        Statement::Function(s) => check_effectiveness(&s.body, warnings),
        Statement::Application(s) => check_effectiveness(&s.body, warnings),
        Statement::Site(s) => check_effectiveness(&s.body, warnings),
        Statement::Expression(expr) => walk_expr_bodies(&expr.expr, warnings),
        Statement::TypeAlias(_) | Statement::Capability(_) | Statement::Break(_) => {}
    }
}

fn walk_expr_bodies(expr: &Expr, warnings: &mut Vec<SourceWarning>) {
    match expr {
        Expr::If(e) | Expr::Unless(e) => {
            check_effectiveness(&e.body, warnings);
            for (_, body) in &e.elsifs {
                check_effectiveness(body, warnings);
            }
            if let Some(body) = &e.else_body {
                check_effectiveness(body, warnings);
            }
        }
        Expr::Case(e) => {
            for proposition in &e.propositions {
                check_effectiveness(&proposition.body, warnings);
            }
        }
        Expr::FunctionCall(call) => walk_lambda(call.lambda.as_ref(), warnings),
        Expr::MethodCall(call) => {
            walk_expr_bodies(&call.target.expr, warnings);
            walk_lambda(call.lambda.as_ref(), warnings);
        }
        Expr::Binary(binary) => {
            walk_expr_bodies(&binary.left.expr, warnings);
            walk_expr_bodies(&binary.right.expr, warnings);
        }
        _ => {}
    }
}

fn walk_lambda(lambda: Option<&Lambda>, warnings: &mut Vec<SourceWarning>) {
    if let Some(lambda) = lambda {
        check_effectiveness(&lambda.body, warnings);
    }
}

/// The ineffective set: pure literals, unary operations over ineffective
/// operands, selectors, and access expressions.
fn is_ineffective(expr: &Expr) -> bool {
    match expr {
        Expr::Undef
        | Expr::Default
        | Expr::Boolean(_)
        | Expr::Integer(_)
        | Expr::Float(_)
        | Expr::String(_)
        | Expr::InterpolatedString(_)
        | Expr::Heredoc(_)
        | Expr::Regex(_)
        | Expr::Name(_)
        | Expr::BareWord(_)
        | Expr::TypeName(_)
        | Expr::Variable(_)
        | Expr::Array(_)
        | Expr::Hash(_)
        | Expr::Selector(_)
        | Expr::Access(_) => true,
        Expr::Negate(operand) | Expr::Not(operand) | Expr::Splat(operand) => is_ineffective(&operand.expr),
        _ => false,
    }
}

// --- type positions ---

/// Walks every type annotation and alias body, rejecting expression forms
/// that cannot denote a type.
fn check_type_positions(statements: &[Statement]) -> ParseResult<()> {
    for statement in statements {
        match statement {
            Statement::Class(s) => {
                check_parameters(&s.parameters)?;
                check_type_positions(&s.body)?;
            }
            Statement::DefinedType(s) => {
                check_parameters(&s.parameters)?;
                check_type_positions(&s.body)?;
            }
            Statement::Node(s) => check_type_positions(&s.body)?,
            Statement::Function(s) => {
                check_parameters(&s.parameters)?;
                check_type_positions(&s.body)?;
            }
            Statement::Application(s) => {
                check_parameters(&s.parameters)?;
                check_type_positions(&s.body)?;
            }
            Statement::Site(s) => check_type_positions(&s.body)?,
            Statement::TypeAlias(s) => check_type_expression(&s.aliased)?,
            Statement::Expression(expr) => check_expr_lambdas(&expr.expr)?,
            Statement::Capability(_) | Statement::Break(_) => {}
        }
    }
    Ok(())
}

fn check_parameters(parameters: &[Parameter]) -> ParseResult<()> {
    for parameter in parameters {
        if let Some(type_expr) = &parameter.type_expr {
            check_type_expression(type_expr)?;
        }
    }
    Ok(())
}

fn check_expr_lambdas(expr: &Expr) -> ParseResult<()> {
    match expr {
        Expr::FunctionCall(call) => {
            if let Some(lambda) = &call.lambda {
                check_parameters(&lambda.parameters)?;
                check_type_positions(&lambda.body)?;
            }
        }
        Expr::MethodCall(call) => {
            check_expr_lambdas(&call.target.expr)?;
            if let Some(lambda) = &call.lambda {
                check_parameters(&lambda.parameters)?;
                check_type_positions(&lambda.body)?;
            }
        }
        Expr::Binary(binary) => {
            check_expr_lambdas(&binary.left.expr)?;
            check_expr_lambdas(&binary.right.expr)?;
        }
        Expr::If(e) | Expr::Unless(e) => {
            check_type_positions(&e.body)?;
            for (_, body) in &e.elsifs {
                check_type_positions(body)?;
            }
            if let Some(body) = &e.else_body {
                check_type_positions(body)?;
            }
        }
        Expr::Case(e) => {
            for proposition in &e.propositions {
                check_type_positions(&proposition.body)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Rejects forms that are not legal in a type position: variables, control
/// flow, function and method calls, selectors, resource forms, and EPP
/// render expressions.
fn check_type_expression(expr: &ExprLoc) -> ParseResult<()> {
    let offending = match &expr.expr {
        Expr::Variable(_) => Some("a variable"),
        Expr::If(_) | Expr::Unless(_) | Expr::Case(_) => Some("a control-flow expression"),
        Expr::FunctionCall(_) => Some("a function call"),
        Expr::MethodCall(_) => Some("a method call"),
        Expr::Selector(_) => Some("a selector"),
        Expr::Resource(_) | Expr::ResourceOverride(_) | Expr::ResourceDefaults(_) | Expr::Collector(_) => {
            Some("a resource expression")
        }
        Expr::RenderString(_) | Expr::RenderExpression(_) => Some("a template expression"),
        Expr::Access(access) => {
            check_type_expression(&access.target)?;
            for arg in &access.args {
                check_type_expression(arg)?;
            }
            None
        }
        Expr::Array(elements) => {
            for element in elements {
                check_type_expression(element)?;
            }
            None
        }
        Expr::Hash(pairs) => {
            for (key, value) in pairs {
                check_type_expression(key)?;
                check_type_expression(value)?;
            }
            None
        }
        Expr::Negate(operand) | Expr::Not(operand) | Expr::Splat(operand) => {
            check_type_expression(operand)?;
            None
        }
        Expr::Binary(binary) => {
            check_type_expression(&binary.left)?;
            check_type_expression(&binary.right)?;
            None
        }
        _ => None,
    };
    match offending {
        Some(what) => Err(ParseError::new(
            format!("{what} is not allowed in a type specification"),
            expr.span,
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    #[test]
    fn flags_ineffective_literal_statement() {
        let output = parse("1\nnotice(2)", "test.pp").unwrap();
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].message.contains("no effect"));
    }

    #[test]
    fn last_statement_is_not_flagged() {
        let output = parse("notice(2)\n1", "test.pp").unwrap();
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn rejects_variable_in_type_position() {
        let error = parse("type Foo = $bar", "test.pp").unwrap_err();
        assert!(error.message.contains("not allowed in a type specification"));
    }

    #[test]
    fn rejects_selector_in_annotation() {
        let error = parse("type Foo = Variant[$x ? { default => Integer }]", "test.pp").unwrap_err();
        assert!(error.message.contains("not allowed in a type specification"));
    }

    #[test]
    fn rejects_call_in_type_position() {
        let error = parse("type Foo = lookup('x')", "test.pp").unwrap_err();
        assert!(error.message.contains("not allowed in a type specification"));
    }
}
