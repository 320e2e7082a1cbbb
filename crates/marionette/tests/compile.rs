//! End-to-end compilation scenarios: manifest source in, logger output
//! and catalog JSON out.

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
fn arithmetic_literal() {
    let (_, entries) = compile("notice(1 + 2 * 3)");
    assert_eq!(notices(&entries), vec!["7"]);
}

#[test]
fn variable_and_string_interpolation() {
    let (_, entries) = compile("$x = 10\nnotice(\"x=$x, y=${x + 1}\")");
    assert_eq!(notices(&entries), vec!["x=10, y=11"]);
}

#[test]
fn class_with_parameter_and_inheritance() {
    let source = r#"
class base { notice("base") }
class child($p = 7) inherits base { notice("child:$p") }
include child
"#;
    let (catalog, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["base", "child:7"]);

    assert!(catalog.find("Class", "base").is_some());
    assert!(catalog.find("Class", "child").is_some());
    assert!(catalog.find("Class", "main").is_some());

    // Class[child] depends on Class[base]
    let child = catalog.find("Class", "child").unwrap();
    let base = catalog.find("Class", "base").unwrap();
    let mut dependencies = Vec::new();
    catalog.each_dependency(child, &mut |_, source| dependencies.push(source));
    assert!(dependencies.contains(&base));
}

#[test]
fn resource_relationships_project_into_json() {
    let source = "notify { 'a': } -> notify { 'b': } ~> notify { 'c': }";
    let (catalog, _) = compile(source);
    let json = catalog.to_json("test.example.com");
    let resources = json["resources"].as_array().unwrap();

    let find = |title: &str| {
        resources
            .iter()
            .find(|resource| resource["type"] == "Notify" && resource["title"] == title)
            .unwrap_or_else(|| panic!("Notify[{title}] missing from the catalog"))
    };
    assert_eq!(find("b")["parameters"]["require"][0], "Notify[a]");
    assert_eq!(find("c")["parameters"]["subscribe"][0], "Notify[b]");
    assert!(find("a").get("parameters").is_none());
}

#[test]
fn iteration_with_break() {
    let source = r"
$sum = [1, 2, 3, 4, 5].reduce(0) |$m, $v| { if $v > 3 { break } else { $m + $v } }
notice($sum)
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["6"]);
}

#[test]
fn require_cycle_fails_finalization() {
    let source = r"
notify { 'a': require => Notify['b'] }
notify { 'b': require => Notify['a'] }
";
    let error = compile_error(source);
    assert!(error.message.contains("cycle"), "unexpected message: {}", error.message);
    assert!(error.message.contains("Notify[a]"));
    assert!(error.message.contains("Notify[b]"));
}

#[test]
fn heredoc_with_margin_and_interpolation() {
    let source = "$who = 'world'\n$text = @(\"END\")\n    Hello ${who}!\n    second line\n    | END\nnotice($text)\n";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["Hello world!\nsecond line\n"]);
}

#[test]
fn inline_epp_renders() {
    let source = "notice(inline_epp('Hello <%= $name %>!', { name => 'epp' }))";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["Hello epp!"]);
}

#[test]
fn defined_type_instantiates_per_declaration() {
    let source = r#"
define greeting($target) { notice("hello $target from $title") }
greeting { 'one': target => 'a' }
greeting { 'two': target => 'b' }
"#;
    let (catalog, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["hello a from one", "hello b from two"]);
    assert!(catalog.find("Greeting", "one").is_some());
    assert!(catalog.find("Greeting", "two").is_some());
}

#[test]
fn virtual_resources_realize_via_collector() {
    let source = r"
@notify { 'virtual': message => 'waiting' }
Notify <| title == 'virtual' |>
";
    let (catalog, _) = compile(source);
    let index = catalog.find("Notify", "virtual").unwrap();
    assert!(!catalog.get(index).virtualized());
}

#[test]
fn unrealized_virtual_resources_stay_out_of_the_projection() {
    let source = "@notify { 'virtual': }\nnotify { 'real': }";
    let (catalog, _) = compile(source);
    let json = catalog.to_json("test.example.com");
    let titles: Vec<&str> = json["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|resource| resource["type"] == "Notify")
        .map(|resource| resource["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["real"]);
}

#[test]
fn collector_applies_override_tail() {
    let source = r"
@notify { 'virtual': }
Notify <| title == 'virtual' |> { message => 'collected' }
";
    let (catalog, _) = compile(source);
    let index = catalog.find("Notify", "virtual").unwrap();
    let message = catalog.get(index).get("message").unwrap();
    assert_eq!(message.value.to_string(), "collected");
}

#[test]
fn resource_defaults_apply_through_scopes() {
    let source = r"
Notify { message => 'default message' }
notify { 'a': }
";
    let (catalog, _) = compile(source);
    let index = catalog.find("Notify", "a").unwrap();
    let message = catalog.get(index).get("message").unwrap();
    assert_eq!(message.value.to_string(), "default message");
}

#[test]
fn append_operator_extends_defaults() {
    let source = r"
Notify { tag => ['red'] }
notify { 'a': tag +> ['blue'] }
";
    let (catalog, _) = compile(source);
    let index = catalog.find("Notify", "a").unwrap();
    let tags = catalog.get(index).calculate_tags(&catalog);
    assert!(tags.contains(&"red".to_owned()));
    assert!(tags.contains(&"blue".to_owned()));
}

#[test]
fn resource_override_applies_late() {
    let source = r"
Notify['a'] { message => 'overridden' }
notify { 'a': message => 'original' }
";
    let (catalog, _) = compile(source);
    let index = catalog.find("Notify", "a").unwrap();
    let message = catalog.get(index).get("message").unwrap();
    assert_eq!(message.value.to_string(), "overridden");
}

#[test]
fn duplicate_resource_declaration_reports_previous_site() {
    let error = compile_error("notify { 'a': }\nnotify { 'a': }");
    assert!(error.message.contains("previously declared"));
    assert_eq!(error.line, 2);
}

#[test]
fn node_definitions_select_by_priority() {
    let source = r"
node /example/ { notice('regex') }
node 'test.example.com' { notice('named') }
node default { notice('default') }
";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["named"]);
}

#[test]
fn node_regex_captures_populate_match_variables() {
    let source = "node /^(\\w+)\\.example\\.com$/ { notice($1) }";
    let (_, entries) = compile(source);
    assert_eq!(notices(&entries), vec!["test"]);
}

#[test]
fn unknown_function_is_an_error() {
    let error = compile_error("no_such_function(1)");
    assert!(error.message.contains("unknown function 'no_such_function'"));
}

#[test]
fn fail_aborts_with_message() {
    let error = compile_error("fail('boom')");
    assert!(error.message.contains("boom"));
}

#[test]
fn err_function_aborts_at_the_boundary() {
    let error = compile_error("err('problem')\nnotice('still runs')");
    assert!(error.message.contains("previously reported errors"));
}

#[test]
fn ineffective_statement_warns() {
    let compiler = Compiler::new("1\nnotice(2)", "test.pp");
    let mut logger = CollectLogger::new();
    compiler
        .compile(Node::new("test"), Rc::new(MapFacts::new()), &mut logger)
        .unwrap();
    let warnings: Vec<&str> = logger
        .entries()
        .iter()
        .filter(|(level, _)| *level == Level::Warning)
        .map(|(_, message)| message.as_str())
        .collect();
    assert_eq!(warnings, vec!["this statement has no effect"]);
}

#[test]
fn facts_are_visible_and_immutable() {
    let compiler = Compiler::new("notice($fqdn)\n$fqdn = 'other'", "test.pp");
    let mut logger = CollectLogger::new();
    let mut facts = MapFacts::new();
    facts.insert("fqdn", marionette::Value::string("test.example.com"));
    let error = compiler
        .compile(Node::new("test.example.com"), Rc::new(facts), &mut logger)
        .expect_err("assigning a fact should fail");
    assert!(error.message.contains("fact"));
    assert_eq!(notices(&logger.into_entries()), vec!["test.example.com"]);
}
