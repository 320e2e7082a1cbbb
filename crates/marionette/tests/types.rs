//! Type lattice properties exercised through the language: range
//! invariants, generalization, recursive aliases, and annotations.

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

#[test]
fn integer_range_membership() {
    let source = r"
notice(3 =~ Integer[3, 5])
notice(5 =~ Integer[3, 5])
notice(2 =~ Integer[3, 5])
notice(6 =~ Integer[3, 5])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "false", "false"]);
}

#[test]
fn range_types_are_ordered_by_inclusion() {
    let source = r"
notice(Integer[3, 5] < Integer)
notice(Integer[3, 5] <= Integer[3, 5])
notice(Integer < Numeric)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "true"]);
}

#[test]
fn recursive_alias_terminates() {
    let source = r"
type Tree = Variant[Integer, Hash[String, Tree]]
notice(1 =~ Tree)
notice({ 'node' => { 'leaf' => 2 } } =~ Tree)
notice(true =~ Tree)
notice(Tree <= Tree)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "false", "true"]);
}

#[test]
fn string_length_bounds() {
    let source = r"
notice('abc' =~ String[2, 3])
notice('a' =~ String[2, 3])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false"]);
}

#[test]
fn enum_and_pattern_membership() {
    let source = r"
notice('present' =~ Enum['present', 'absent'])
notice('gone' =~ Enum['present', 'absent'])
notice('web42' =~ Pattern[/^web\d+$/])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false", "true"]);
}

#[test]
fn optional_and_notundef() {
    let source = r"
notice(undef =~ Optional[Integer])
notice(7 =~ Optional[Integer])
notice(undef =~ NotUndef)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "false"]);
}

#[test]
fn tuple_and_struct_shapes() {
    let source = r"
notice([1, 'x'] =~ Tuple[Integer, String])
notice(['x', 1] =~ Tuple[Integer, String])
notice({ mode => 'ro' } =~ Struct[{ mode => String }])
notice({ mode => 'ro', extra => 1 } =~ Struct[{ mode => String }])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false", "true", "false"]);
}

#[test]
fn parameter_annotations_enforce_types() {
    let source = r"
class sized(Integer[1, 10] $count) { notice($count) }
class { 'sized': count => 3 }
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["3"]);

    let error = compile_error(
        "class sized(Integer[1, 10] $count) { }\nclass { 'sized': count => 42 }",
    );
    assert!(error.message.contains("expects a value of type Integer[1, 10]"));
}

#[test]
fn alias_annotations_resolve_through_the_registry() {
    let source = r"
type Port = Integer[1, 65535]
define listener(Port $port) { notice($port) }
listener { 'http': port => 8080 }
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["8080"]);
}

#[test]
fn resource_references_are_catalog_entries() {
    let source = r"
notify { 'a': }
notice(Notify['a'] =~ CatalogEntry)
notice(Notify['a'] =~ Resource)
notice(Notify['a'] =~ Type)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "true"]);
}

#[test]
fn variant_deduplicates_and_matches_members() {
    let source = r"
notice(1 =~ Variant[Integer, String, Integer])
notice(true =~ Variant[Integer, String])
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false"]);
}

#[test]
fn undef_and_default_are_singleton_types() {
    let source = r"
notice(undef =~ Undef)
notice(default =~ Default)
notice(1 =~ Undef)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "true", "false"]);
}

#[test]
fn data_accepts_plain_structures() {
    let source = r"
notice({ a => [1, 'two', undef] } =~ Data)
notice(/regex/ =~ Data)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["true", "false"]);
}
