//! Evaluator properties: iteration arity, overflow checks, assignment
//! rules, operators, and match scopes.

use std::rc::Rc;

use marionette::{Catalog, CollectLogger, CompileError, Compiler, Level, MapFacts, Node};
use pretty_assertions::assert_eq;

fn compile(source: &str) -> (Catalog, Vec<(Level, String)>) {
    let compiler = Compiler::new(source, "test.pp");
    let mut logger = CollectLogger::new();
    let catalog = compiler
        .compile(Node::new("test.example.com"), Rc::new(MapFacts::new()), &mut logger)
        .unwrap_or_else(|error| panic!("compilation failed: {error}"));
    (catalog, logger.into_entries())
}

fn compile_error(source: &str) -> CompileError {
    let compiler = Compiler::new(source, "test.pp");
    let mut logger = CollectLogger::new();
    compiler
        .compile(Node::new("test.example.com"), Rc::new(MapFacts::new()), &mut logger)
        .expect_err("compilation unexpectedly succeeded")
}

fn notices(entries: &[(Level, String)]) -> Vec<&str> {
    entries
        .iter()
        .filter(|(level, _)| *level == Level::Notice)
        .map(|(_, message)| message.as_str())
        .collect()
}

// --- iteration arity ---

#[test]
fn each_with_one_parameter_yields_pairs_for_hashes() {
    let source = "{ a => 1, b => 2 }.each |$entry| { notice($entry) }";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["[a, 1]", "[b, 2]"]);
}

#[test]
fn each_with_two_parameters_yields_key_and_value() {
    let source = "{ a => 1, b => 2 }.each |$k, $v| { notice(\"$k=$v\") }";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["a=1", "b=2"]);
}

#[test]
fn each_over_arrays_yields_index_and_value() {
    let source = "['x', 'y'].each |$i, $v| { notice(\"$i:$v\") }";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["0:x", "1:y"]);
}

#[test]
fn each_over_integers_counts_from_zero() {
    let (_, entries) = compile("3.each |$i| { notice($i) }");
    assert_eq!(notices(&entries), vec!["0", "1", "2"]);
}

#[test]
fn map_and_filter_chain() {
    let source = "notice([1, 2, 3, 4].filter |$v| { $v % 2 == 0 }.map |$v| { $v * 10 })";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["[20, 40]"]);
}

#[test]
fn reverse_each_and_step() {
    let (_, entries) = compile("6.reverse_each.step(2) |$v| { notice($v) }");
    assert_eq!(notices(&entries), vec!["5", "3", "1"]);
}

#[test]
fn wrong_block_arity_is_reported() {
    let error = compile_error("[1].each |$a, $b, $c| { }");
    assert!(error.message.contains("block"), "unexpected: {}", error.message);
}

// --- arithmetic ---

#[test]
fn integer_overflow_raises() {
    let error = compile_error("notice(9223372036854775807 + 1)");
    assert!(error.message.contains("overflow"));
}

#[test]
fn integer_underflow_raises() {
    let error = compile_error("notice(-9223372036854775807 - 2)");
    assert!(error.message.contains("underflow"));
}

#[test]
fn division_by_zero_raises() {
    let error = compile_error("notice(1 / 0)");
    assert!(error.message.contains("divide by zero"));
}

#[test]
fn mixed_arithmetic_produces_floats() {
    let (_, entries) = compile("notice(1 + 0.5)");
    assert_eq!(notices(&entries), vec!["1.5"]);
}

#[test]
fn plus_concatenates_arrays_and_merges_hashes() {
    let (_, entries) = compile("notice([1, 2] + [3])\nnotice({a => 1} + {b => 2})");
    assert_eq!(notices(&entries), vec!["[1, 2, 3]", "{a => 1, b => 2}"]);
}

#[test]
fn minus_removes_elements_and_keys() {
    let (_, entries) = compile("notice([1, 2, 3, 2] - [2])\nnotice({a => 1, b => 2} - ['a'])");
    assert_eq!(notices(&entries), vec!["[1, 3]", "{b => 2}"]);
}

#[test]
fn left_shift_appends_to_arrays() {
    let (_, entries) = compile("notice([1] << [2])\nnotice(1 << 3)");
    assert_eq!(notices(&entries), vec!["[1, [2]]", "8"]);
}

#[test]
fn operand_type_errors_name_the_operator() {
    let error = compile_error("notice(true + 1)");
    assert!(error.message.contains("left operand of '+'"), "unexpected: {}", error.message);
    let error = compile_error("notice(1 + 'x')");
    assert!(error.message.contains("right operand of '+'"), "unexpected: {}", error.message);
}

// --- assignment ---

#[test]
fn reassignment_points_at_the_original_site() {
    let error = compile_error("$x = 1\n$x = 2");
    assert!(error.message.contains("previously assigned at line 1"));
    assert_eq!(error.line, 2);
}

#[test]
fn array_assignment_binds_by_position() {
    let (_, entries) = compile("[$a, $b] = [1, 2]\nnotice(\"$a $b\")");
    assert_eq!(notices(&entries), vec!["1 2"]);
}

#[test]
fn array_assignment_from_hash_binds_by_name() {
    let (_, entries) = compile("[$a] = { a => 1 }\nnotice($a)");
    assert_eq!(notices(&entries), vec!["1"]);
}

#[test]
fn mismatched_assignment_sizes_raise() {
    let error = compile_error("[$a, $b] = [1]");
    assert!(error.message.contains("expected 2 elements"));
    let error = compile_error("[$missing] = { other => 1 }");
    assert!(error.message.contains("no key 'missing'"));
}

#[test]
fn assignment_to_non_variable_is_illegal() {
    let error = compile_error("1 = 2");
    assert!(error.message.contains("illegal assignment") || error.message.contains("left operand"));
}

// --- match expressions and scopes ---

#[test]
fn regex_match_populates_match_variables() {
    let source = r"
if 'hello world' =~ /(h\w+) (w\w+)/ {
  notice($0)
  notice($2)
}
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["hello world", "world"]);
}

#[test]
fn match_variables_reset_outside_the_control_structure() {
    let source = r"
if 'abc' =~ /(b)/ { notice($1) }
notice($1)
";
    let (_, entries) = compile(source);
    // The second notice sees no captures and logs the empty undef form
    assert_eq!(notices(&entries), vec!["b", ""]);
}

#[test]
fn type_match_tests_instances() {
    let (_, entries) = compile("notice(5 =~ Integer[0, 10])\nnotice('x' !~ Integer)");
    assert_eq!(notices(&entries), vec!["true", "true"]);
}

#[test]
fn case_matches_regexes_types_and_values() {
    let source = r#"
case 'web42' {
  /^web(\d+)$/: { notice("server ${1}") }
  default:      { notice('other') }
}
"#;
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["server 42"]);
}

#[test]
fn selector_requires_a_match() {
    let (_, entries) = compile("notice(2 ? { 1 => 'one', 2 => 'two', default => 'many' })");
    assert_eq!(notices(&entries), vec!["two"]);
    let error = compile_error("notice(9 ? { 1 => 'one' })");
    assert!(error.message.contains("no matching selector option"));
}

// --- functions ---

#[test]
fn user_defined_functions_dispatch_before_builtins() {
    let source = r"
function double(Integer $n) { $n * 2 }
notice(double(21))
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["42"]);
}

#[test]
fn user_function_type_mismatch_is_reported() {
    let source = r"
function double(Integer $n) { $n * 2 }
notice(double('x'))
";
    let error = compile_error(source);
    assert!(error.message.contains("expects a value of type Integer"));
}

#[test]
fn builtin_type_mismatch_names_the_argument() {
    let error = compile_error("split(1, ',')");
    assert!(
        error.message.contains("expects String for the first argument"),
        "unexpected: {}",
        error.message
    );
}

#[test]
fn with_yields_its_arguments() {
    let (_, entries) = compile("notice(with(1, 2) |$a, $b| { $a + $b })");
    assert_eq!(notices(&entries), vec!["3"]);
}

#[test]
fn split_and_versioncmp() {
    let (_, entries) = compile("notice(split('a,b,c', ','))\nnotice(versioncmp('1.10', '1.9'))");
    assert_eq!(notices(&entries), vec!["[a, b, c]", "1"]);
}

#[test]
fn assert_type_returns_or_raises() {
    let (_, entries) = compile("notice(assert_type(Integer, 5))");
    assert_eq!(notices(&entries), vec!["5"]);
    let error = compile_error("assert_type(Integer, 'x')");
    assert!(error.message.contains("expected a value of type Integer"));
}

#[test]
fn assert_type_block_recovers() {
    let source = "notice(assert_type(Integer, 'x') |$expected, $actual| { \"want $expected got $actual\" })";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["want Integer got String"]);
}

#[test]
fn defined_checks_variables_and_definitions() {
    let source = r"
$x = 1
class configured { }
notice(defined('$x'))
notice(defined('$missing'))
notice(defined('configured'))
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false", "true"]);
}

#[test]
fn type_conversions_via_new() {
    let (_, entries) = compile("notice(Integer.new('0x1F'))\nnotice(Float.new(' -1.5 '))");
    assert_eq!(notices(&entries), vec!["31", "-1.5"]);
    let error = compile_error("Integer.new('wat')");
    assert!(error.message.contains("cannot be converted"));
}

#[test]
fn access_expressions_index_and_slice() {
    let source = r"
notice([10, 20, 30][1])
notice([10, 20, 30][-1])
notice('hello'[1, 3])
notice({a => 1}['a'])
notice({a => 1}['b'])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["20", "30", "[e, l, l]", "1", ""]);
}

#[test]
fn unfold_splats_into_arguments_and_arrays() {
    let (_, entries) = compile("$parts = [1, 2]\nnotice([0, *$parts])");
    assert_eq!(notices(&entries), vec!["[0, 1, 2]"]);
}

#[test]
fn break_outside_iteration_is_an_error() {
    let error = compile_error("break");
    assert!(error.message.contains("break"));
}
