//! Catalog construction properties: containment, tags, exported
//! resources, overrides, and the JSON projection.

use std::rc::Rc;

use marionette::{Catalog, CollectLogger, CompileError, Compiler, Level, MapFacts, Node};
use pretty_assertions::assert_eq;

fn compile(source: &str) -> Catalog {
    let compiler = Compiler::new(source, "test.pp");
    let mut logger = CollectLogger::new();
    compiler
        .compile(Node::new("test.example.com"), Rc::new(MapFacts::new()), &mut logger)
        .unwrap_or_else(|error| panic!("compilation failed: {error}"))
}

fn compile_error(source: &str) -> CompileError {
    let compiler = Compiler::new(source, "test.pp");
    let mut logger = CollectLogger::new();
    compiler
        .compile(Node::new("test.example.com"), Rc::new(MapFacts::new()), &mut logger)
        .expect_err("compilation unexpectedly succeeded")
}

#[test]
fn the_containment_roots_exist() {
    let catalog = compile("notify { 'a': }");
    assert!(catalog.find("Stage", "main").is_some());
    assert!(catalog.find("Class", "main").is_some());

    let json = catalog.to_json("test.example.com");
    let edges = json["edges"].as_array().unwrap();
    assert!(edges.iter().any(|edge| edge["source"] == "Stage[main]" && edge["target"] == "Class[main]"));
    assert!(edges.iter().any(|edge| edge["source"] == "Class[main]" && edge["target"] == "Notify[a]"));
}

#[test]
fn resources_project_type_title_file_and_line() {
    let catalog = compile("notify { 'greeting': message => 'hi' }");
    let json = catalog.to_json("test.example.com");
    let resource = json["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|resource| resource["type"] == "Notify")
        .unwrap();
    assert_eq!(resource["title"], "greeting");
    assert_eq!(resource["file"], "test.pp");
    assert_eq!(resource["line"], 1);
    assert_eq!(resource["exported"], false);
    assert_eq!(resource["parameters"]["message"], "hi");
}

#[test]
fn qualified_type_names_normalize() {
    let catalog = compile("define my_mod::rule { }\nmy_mod::rule { 'one': }");
    assert!(catalog.find("My_mod::Rule", "one").is_some());
    // Lookup is case-insensitive through normalization
    assert!(catalog.find("my_mod::rule", "one").is_some());
}

#[test]
fn auto_tags_cover_name_segments() {
    let catalog = compile("define my_mod::rule { }\nmy_mod::rule { 'one': }");
    let index = catalog.find("My_mod::Rule", "one").unwrap();
    let tags = catalog.get(index).calculate_tags(&catalog);
    assert!(tags.contains(&"my_mod".to_owned()));
    assert!(tags.contains(&"rule".to_owned()));
    assert!(tags.contains(&"my_mod::rule".to_owned()));
}

#[test]
fn container_tags_propagate() {
    let source = r"
class outer {
  tag('wrapped')
  notify { 'inner': }
}
include outer
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "inner").unwrap();
    let tags = catalog.get(index).calculate_tags(&catalog);
    assert!(tags.contains(&"wrapped".to_owned()), "tags were {tags:?}");
    assert!(tags.contains(&"outer".to_owned()));
}

#[test]
fn exported_resources_only_match_exported_collectors() {
    let source = r"
@@notify { 'exported': }
Notify <| |>
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "exported").unwrap();
    // The non-exported collector ignored the exported resource
    assert!(catalog.get(index).virtualized());

    let source = r"
@@notify { 'exported': }
Notify <<| |>>
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "exported").unwrap();
    assert!(!catalog.get(index).virtualized());
}

#[test]
fn collector_matches_late_declarations() {
    // The collector runs before 'late' exists; finalization re-runs it
    let source = r"
Notify <| |>
@notify { 'late': }
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "late").unwrap();
    assert!(!catalog.get(index).virtualized());
}

#[test]
fn collector_queries_combine_with_and_or() {
    let source = r"
@notify { 'a': message => 'keep', loglevel => 'info' }
@notify { 'b': message => 'keep', loglevel => 'debug' }
@notify { 'c': message => 'drop' }
Notify <| message == 'keep' and loglevel == 'info' or title == 'c' |>
";
    let catalog = compile(source);
    assert!(!catalog.get(catalog.find("Notify", "a").unwrap()).virtualized());
    assert!(catalog.get(catalog.find("Notify", "b").unwrap()).virtualized());
    assert!(!catalog.get(catalog.find("Notify", "c").unwrap()).virtualized());
}

#[test]
fn override_with_undef_removes_the_attribute() {
    let source = r"
notify { 'a': message => 'original' }
Notify['a'] { message => undef }
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "a").unwrap();
    assert!(catalog.get(index).get("message").is_none());
}

#[test]
fn relationship_metaparameters_accept_reference_strings() {
    let source = r#"
notify { 'a': }
notify { 'b': before => 'Notify[a]' }
"#;
    let catalog = compile(source);
    let json = catalog.to_json("test.example.com");
    let a = json["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|resource| resource["title"] == "a")
        .unwrap();
    assert_eq!(a["parameters"]["require"][0], "Notify[b]");
}

#[test]
fn relationship_operands_fan_out_over_arrays() {
    let source = r"
notify { 'a': }
notify { 'b': }
notify { 'c': }
[Notify['a'], Notify['b']] -> Notify['c']
";
    let catalog = compile(source);
    let c = catalog.find("Notify", "c").unwrap();
    let mut sources = Vec::new();
    catalog.each_dependency(c, &mut |_, source| {
        sources.push(catalog.get(source).title().to_owned());
    });
    sources.sort();
    assert_eq!(sources, vec!["a", "b"]);
}

#[test]
fn missing_relationship_target_is_an_error() {
    let error = compile_error("notify { 'a': } -> Notify['missing']");
    assert!(error.message.contains("does not exist"));
}

#[test]
fn missing_metaparameter_reference_fails_finalization() {
    let error = compile_error("notify { 'a': require => Notify['missing'] }");
    assert!(error.message.contains("does not exist"));
}

#[test]
fn pending_override_for_a_never_declared_resource_fails() {
    let error = compile_error("Notify['ghost'] { message => 'x' }");
    assert!(error.message.contains("does not exist"));
}

#[test]
fn realize_materializes_virtual_resources() {
    let source = r"
@notify { 'virtual': }
realize(Notify['virtual'])
";
    let catalog = compile(source);
    let index = catalog.find("Notify", "virtual").unwrap();
    assert!(!catalog.get(index).virtualized());
}

#[test]
fn stage_and_class_resources_sort_before_their_contents() {
    let catalog = compile("notify { 'a': }");
    let json = catalog.to_json("test.example.com");
    let types: Vec<&str> = json["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|resource| resource["type"].as_str().unwrap())
        .collect();
    // Vertex order: realization order
    assert_eq!(types, vec!["Stage", "Class", "Notify"]);
}

#[test]
fn contain_adds_a_containment_edge() {
    let source = r"
class inner { }
class outer { contain inner }
include outer
";
    let catalog = compile(source);
    let json = catalog.to_json("test.example.com");
    let edges = json["edges"].as_array().unwrap();
    assert!(
        edges
            .iter()
            .any(|edge| edge["source"] == "Class[outer]" && edge["target"] == "Class[inner]"),
        "edges were {edges:#?}"
    );
}

#[test]
fn require_function_orders_the_class_first() {
    let source = r"
class wanted { }
class consumer { require wanted }
include consumer
";
    let catalog = compile(source);
    let consumer = catalog.find("Class", "consumer").unwrap();
    let wanted = catalog.find("Class", "wanted").unwrap();
    let mut dependencies = Vec::new();
    catalog.each_dependency(consumer, &mut |_, source| dependencies.push(source));
    assert!(dependencies.contains(&wanted));
}

#[test]
fn warnings_do_not_abort_but_errors_do() {
    let compiler = Compiler::new("warning('just a warning')\nnotice('done')", "test.pp");
    let mut logger = CollectLogger::new();
    let catalog = compiler
        .compile(Node::new("test"), Rc::new(MapFacts::new()), &mut logger)
        .unwrap();
    assert!(!catalog.is_empty());
    assert_eq!(
        logger
            .entries()
            .iter()
            .filter(|(level, _)| *level == Level::Warning)
            .count(),
        1
    );
}
