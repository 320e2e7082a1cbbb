//! Parser and lexer properties: token round-trips, operator precedence,
//! and source-position accuracy.

use marionette::ast::{Expr, ExprLoc, Statement};
use marionette::lexer::token::{Keyword, Punct, TokenKind};
use marionette::lexer::Lexer;
use marionette::line_info;
use marionette::parser::parse;
use pretty_assertions::assert_eq;
use strum::IntoEnumIterator;

/// Renders an expression's binary structure with explicit parentheses,
/// for shape comparisons independent of spans.
fn shape(expr: &ExprLoc) -> String {
    match &expr.expr {
        Expr::Name(name) => name.clone(),
        Expr::Variable(name) => format!("${name}"),
        Expr::Integer(value) => value.to_string(),
        Expr::Binary(binary) => format!("({} {} {})", shape(&binary.left), binary.op, shape(&binary.right)),
        other => format!("{other:?}"),
    }
}

fn first_expression(source: &str) -> ExprLoc {
    let output = parse(source, "test.pp").unwrap();
    match output.tree.statements.into_iter().next().unwrap() {
        Statement::Expression(expr) => expr,
        other => panic!("expected an expression statement, found {other:?}"),
    }
}

#[test]
fn punctuator_text_lexes_back_to_the_same_token() {
    for punct in Punct::iter() {
        // A leading variable puts the lexer in a state where `/` is
        // division rather than a regex delimiter
        let source = format!("$x {punct}");
        let mut lexer = Lexer::new(&source);
        let _ = lexer.next_token().unwrap().unwrap();
        let token = lexer
            .next_token()
            .unwrap_or_else(|error| panic!("'{punct}' failed to lex: {error}"))
            .unwrap_or_else(|| panic!("'{punct}' lexed to nothing"));
        assert_eq!(token.kind, TokenKind::Punct(punct), "{punct}");
    }
}

#[test]
fn keyword_text_lexes_back_to_the_same_token() {
    for keyword in Keyword::iter() {
        let source = keyword.to_string();
        let mut lexer = Lexer::new(&source);
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::Keyword(keyword), "{keyword}");
    }
}

#[test]
fn precedence_matches_explicit_parentheses() {
    let implicit = first_expression("a or b and c == d + e * f");
    let explicit = first_expression("a or (b and (c == (d + (e * f))))");
    assert_eq!(shape(&implicit), shape(&explicit));
    assert_eq!(shape(&implicit), "(a or (b and (c == (d + (e * f)))))");
}

#[test]
fn assignment_is_right_associative() {
    let expr = first_expression("$a = $b = 1");
    assert_eq!(shape(&expr), "($a = ($b = 1))");
}

#[test]
fn comparison_and_shift_levels() {
    let expr = first_expression("a << b + c");
    assert_eq!(shape(&expr), "(a << (b + c))");
    let expr = first_expression("a in b << c");
    assert_eq!(shape(&expr), "(a in (b << c))");
}

#[test]
fn relationship_operators_are_left_associative() {
    let expr = first_expression("$a -> $b ~> $c");
    assert_eq!(shape(&expr), "(($a -> $b) ~> $c)");
}

#[test]
fn syntax_error_positions_align_with_the_caret() {
    let source = "$x = 1\n$y = = 2\n";
    let error = parse(source, "test.pp").unwrap_err();
    // The error points at the second '='
    assert_eq!(error.span.begin.line, 2);
    let info = line_info(source, error.span.begin.offset, 1);
    assert_eq!(info.text, "$y = = 2");
    assert_eq!(info.column, 6);
    assert_eq!(info.length, 1);
}

#[test]
fn unexpected_character_is_a_lex_error() {
    let error = parse("$x = `", "test.pp").unwrap_err();
    assert!(error.message.contains("unexpected character"));
}

#[test]
fn nesting_depth_is_bounded() {
    let mut source = String::from("$x = ");
    source.push_str(&"(".repeat(300));
    source.push('1');
    source.push_str(&")".repeat(300));
    let error = parse(&source, "test.pp").unwrap_err();
    assert!(error.message.contains("nesting is too deep"));
}

#[test]
fn selector_parses_as_postfix() {
    let expr = first_expression("$x ? { 'a' => 1, default => 2 }");
    assert!(matches!(expr.expr, Expr::Selector(_)));
}

#[test]
fn case_options_allow_commas_and_default() {
    let output = parse(
        "case $x { 'a', 'b': { notice(1) } default: { notice(2) } }",
        "test.pp",
    )
    .unwrap();
    let Statement::Expression(expr) = &output.tree.statements[0] else {
        panic!("expected expression");
    };
    let Expr::Case(case) = &expr.expr else {
        panic!("expected case");
    };
    assert_eq!(case.propositions.len(), 2);
    assert_eq!(case.propositions[0].options.len(), 2);
}

#[test]
fn resource_bodies_separate_with_semicolons() {
    let output = parse("notify { 'a': ; 'b': message => 'x' }", "test.pp").unwrap();
    let Statement::Expression(expr) = &output.tree.statements[0] else {
        panic!("expected expression");
    };
    let Expr::Resource(resource) = &expr.expr else {
        panic!("expected resource");
    };
    assert_eq!(resource.bodies.len(), 2);
}

#[test]
fn virtual_and_exported_markers_parse() {
    for (source, expected_exported) in [("@notify { 'a': }", false), ("@@notify { 'a': }", true)] {
        let output = parse(source, "test.pp").unwrap();
        let Statement::Expression(expr) = &output.tree.statements[0] else {
            panic!("expected expression");
        };
        let Expr::Resource(resource) = &expr.expr else {
            panic!("expected resource");
        };
        let exported = matches!(resource.status, marionette::ast::ResourceStatus::Exported);
        assert_eq!(exported, expected_exported);
    }
}

#[test]
fn epp_templates_parse_with_parameters() {
    let output = marionette::parser::parse_epp("<%- |$name| -%>Hello <%= $name %>", "template.epp").unwrap();
    assert_eq!(output.parameters.as_ref().map(Vec::len), Some(1));
    assert_eq!(output.tree.statements.len(), 2);
}

#[test]
fn attribute_queries_parse_with_reversed_and_or_precedence() {
    let output = parse("Notify <| a == 1 or b == 2 and c == 3 |>", "test.pp").unwrap();
    let Statement::Expression(expr) = &output.tree.statements[0] else {
        panic!("expected expression");
    };
    let Expr::Collector(collector) = &expr.expr else {
        panic!("expected collector");
    };
    // `or` binds looser than `and`: a == 1 or (b == 2 and c == 3)
    let marionette::ast::Query::Or(_, right) = collector.query.as_ref().unwrap() else {
        panic!("expected top-level or");
    };
    assert!(matches!(**right, marionette::ast::Query::And(_, _)));
}
