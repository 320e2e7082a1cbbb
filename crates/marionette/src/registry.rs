//! The definition registry and tree scanner.
//!
//! A scanner walks each imported syntax tree and registers classes,
//! defined types, nodes, functions, type aliases, and applications.
//! Importing is idempotent per tree, tracked by tree identity. Lookup
//! rules differ per table: class names may be registered more than once,
//! defined types may not, and nodes match by name, then regex, then
//! `default`.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::ast::{
    ApplicationStatement, CapabilityMapping, ClassStatement, DefinedTypeStatement, ExprLoc, FunctionStatement,
    Hostname, NodeStatement, Statement, SyntaxTree, TypeAliasStatement,
};
use crate::error::{EvalResult, EvaluationError};
use crate::node::Node;
use crate::types::{AliasType, parse as type_parse};
use crate::value::ValueRegex;

/// A registered class definition. The same name may be registered several
/// times; lookup context selects the definition.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub name: String,
    pub statement: Rc<ClassStatement>,
    pub tree: Rc<SyntaxTree>,
}

/// A registered defined type. Names are unique.
#[derive(Debug, Clone)]
pub struct DefinedTypeDefinition {
    pub name: String,
    pub statement: Rc<DefinedTypeStatement>,
    pub tree: Rc<SyntaxTree>,
}

/// A registered node definition.
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub statement: Rc<NodeStatement>,
    pub tree: Rc<SyntaxTree>,
}

/// A registered user-defined function.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub statement: Rc<FunctionStatement>,
    pub tree: Rc<SyntaxTree>,
}

/// A registered application definition.
#[derive(Debug, Clone)]
pub struct ApplicationDefinition {
    pub name: String,
    pub statement: Rc<ApplicationStatement>,
    pub tree: Rc<SyntaxTree>,
}

/// Lowercases a definition name and strips any global `::` prefix.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches("::").to_ascii_lowercase()
}

/// Registration tables for everything a scanned tree can define.
#[derive(Default)]
pub struct Registry {
    imported: AHashSet<usize>,
    classes: AHashMap<String, Vec<ClassDefinition>>,
    defined_types: AHashMap<String, DefinedTypeDefinition>,
    functions: AHashMap<String, FunctionDefinition>,
    applications: AHashMap<String, ApplicationDefinition>,
    capabilities: Vec<CapabilityMapping>,
    nodes: Vec<NodeDefinition>,
    named_nodes: AHashMap<String, usize>,
    regex_nodes: Vec<(ValueRegex, usize)>,
    default_node_index: Option<usize>,
    aliases: AHashMap<String, AliasType>,
    /// Alias bodies waiting for [`Registry::resolve_aliases`].
    pending_aliases: Vec<(String, ExprLoc)>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes.len())
            .field("defined_types", &self.defined_types.len())
            .field("nodes", &self.nodes.len())
            .field("functions", &self.functions.len())
            .field("aliases", &self.aliases.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans a tree and registers its definitions. Each tree is scanned at
    /// most once, tracked by identity.
    pub fn import(&mut self, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        let identity = Rc::as_ptr(tree) as usize;
        if !self.imported.insert(identity) {
            return Ok(());
        }
        self.scan(&tree.statements, tree)?;
        self.resolve_aliases()
    }

    fn scan(&mut self, statements: &[Statement], tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        for statement in statements {
            match statement {
                Statement::Class(class) => {
                    self.register_class(class, tree);
                    self.scan(&class.body, tree)?;
                }
                Statement::DefinedType(defined_type) => self.register_defined_type(defined_type, tree)?,
                Statement::Node(node) => {
                    self.register_node(node, tree)?;
                    self.scan(&node.body, tree)?;
                }
                Statement::Function(function) => self.register_function(function, tree)?,
                Statement::TypeAlias(alias) => self.register_alias(alias)?,
                Statement::Application(application) => self.register_application(application, tree)?,
                Statement::Capability(mapping) => self.capabilities.push(mapping.clone()),
                Statement::Site(site) => self.scan(&site.body, tree)?,
                Statement::Expression(_) | Statement::Break(_) => {}
            }
        }
        Ok(())
    }

    // --- classes ---

    fn register_class(&mut self, class: &ClassStatement, tree: &Rc<SyntaxTree>) {
        let name = normalize_name(&class.name);
        self.classes.entry(name.clone()).or_default().push(ClassDefinition {
            name,
            statement: Rc::new(class.clone()),
            tree: tree.clone(),
        });
    }

    /// Finds the class definitions for a name, if any were registered.
    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<&[ClassDefinition]> {
        let definitions = self.classes.get(&normalize_name(name))?;
        if definitions.is_empty() {
            None
        } else {
            Some(definitions)
        }
    }

    // --- defined types ---

    fn register_defined_type(&mut self, defined_type: &DefinedTypeStatement, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        let name = normalize_name(&defined_type.name);
        if self.defined_types.contains_key(&name) {
            return Err(EvaluationError::new(
                format!("defined type '{name}' was previously defined"),
                defined_type.name_span,
            ));
        }
        self.defined_types.insert(
            name.clone(),
            DefinedTypeDefinition {
                name,
                statement: Rc::new(defined_type.clone()),
                tree: tree.clone(),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn find_defined_type(&self, name: &str) -> Option<&DefinedTypeDefinition> {
        self.defined_types.get(&normalize_name(name))
    }

    // --- functions ---

    fn register_function(&mut self, function: &FunctionStatement, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        let name = normalize_name(&function.name);
        if self.functions.contains_key(&name) {
            return Err(EvaluationError::new(
                format!("function '{name}' was previously defined"),
                function.name_span,
            ));
        }
        self.functions.insert(
            name.clone(),
            FunctionDefinition {
                name,
                statement: Rc::new(function.clone()),
                tree: tree.clone(),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(&normalize_name(name))
    }

    // --- applications ---

    fn register_application(&mut self, application: &ApplicationStatement, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        let name = normalize_name(&application.name);
        if self.applications.contains_key(&name) {
            return Err(EvaluationError::new(
                format!("application '{name}' was previously defined"),
                application.name_span,
            ));
        }
        self.applications.insert(
            name.clone(),
            ApplicationDefinition {
                name,
                statement: Rc::new(application.clone()),
                tree: tree.clone(),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn find_application(&self, name: &str) -> Option<&ApplicationDefinition> {
        self.applications.get(&normalize_name(name))
    }

    #[must_use]
    pub fn capabilities(&self) -> &[CapabilityMapping] {
        &self.capabilities
    }

    // --- nodes ---

    fn register_node(&mut self, node: &NodeStatement, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        // Reject a definition that conflicts with an already-registered one
        for (hostname, span) in &node.hostnames {
            let conflicts = match hostname {
                Hostname::Default => self.default_node_index.is_some(),
                Hostname::Regex(pattern) => self.regex_nodes.iter().any(|(regex, _)| regex.source() == pattern),
                Hostname::Literal(name) => self.named_nodes.contains_key(&name.to_ascii_lowercase()),
            };
            if conflicts {
                return Err(EvaluationError::new(
                    format!("node '{}' conflicts with a previous node definition", hostname.text()),
                    *span,
                ));
            }
        }

        // Compile all regexes before mutating any table
        let mut regexes = Vec::new();
        for (hostname, span) in &node.hostnames {
            if let Hostname::Regex(pattern) = hostname {
                let regex = ValueRegex::new(pattern.clone())
                    .map_err(|error| EvaluationError::new(format!("invalid regular expression: {error}"), *span))?;
                regexes.push(regex);
            }
        }

        let index = self.nodes.len();
        self.nodes.push(NodeDefinition {
            statement: Rc::new(node.clone()),
            tree: tree.clone(),
        });
        for (hostname, _) in &node.hostnames {
            match hostname {
                Hostname::Default => self.default_node_index = Some(index),
                Hostname::Literal(name) => {
                    self.named_nodes.insert(name.to_ascii_lowercase(), index);
                }
                Hostname::Regex(_) => {}
            }
        }
        for regex in regexes {
            self.regex_nodes.push((regex, index));
        }
        Ok(())
    }

    #[must_use]
    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Finds the definition matching a node. For each candidate name, an
    /// exact named match wins, then regexes in registration order; after
    /// all names are tried, the `default` definition applies if present.
    /// Returns the definition, the matched name, and any regex captures.
    #[must_use]
    pub fn find_node(&self, node: &Node) -> Option<(&NodeDefinition, String, Option<Vec<Option<String>>>)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut found: Option<(usize, String, Option<Vec<Option<String>>>)> = None;
        node.each_name(|name| {
            if let Some(index) = self.named_nodes.get(name) {
                found = Some((*index, name.to_owned(), None));
                return false;
            }
            for (regex, index) in &self.regex_nodes {
                if let Some(captures) = regex.pattern().captures(name) {
                    let groups = captures
                        .iter()
                        .map(|group| group.map(|m| m.as_str().to_owned()))
                        .collect();
                    found = Some((*index, format!("/{}/", regex.source()), Some(groups)));
                    return false;
                }
            }
            true
        });

        let (index, name, captures) = match found {
            Some(found) => found,
            None => (self.default_node_index?, "default".to_owned(), None),
        };
        Some((&self.nodes[index], name, captures))
    }

    // --- type aliases ---

    fn register_alias(&mut self, alias: &TypeAliasStatement) -> EvalResult<()> {
        if self.aliases.contains_key(&alias.name) {
            return Err(EvaluationError::new(
                format!("type alias '{}' was previously defined", alias.name),
                alias.name_span,
            ));
        }
        self.aliases.insert(alias.name.clone(), AliasType::new(alias.name.clone()));
        self.pending_aliases.push((alias.name.clone(), alias.aliased.clone()));
        Ok(())
    }

    #[must_use]
    pub fn find_alias(&self, name: &str) -> Option<AliasType> {
        self.aliases.get(name).cloned()
    }

    /// Resolves pending alias bodies against the full alias table, so
    /// aliases may reference themselves and one another in any order.
    fn resolve_aliases(&mut self) -> EvalResult<()> {
        let pending = std::mem::take(&mut self.pending_aliases);
        for (name, body) in pending {
            let resolver = |name: &str| self.aliases.get(name).cloned();
            let resolved = type_parse::type_from_expression(&body, &resolver)?;
            self.aliases
                .get(&name)
                .expect("alias was registered before resolution")
                .resolve(resolved);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::Type;
    use crate::value::Value;

    fn import(source: &str) -> Registry {
        let mut registry = Registry::new();
        let tree = Rc::new(parse(source, "test.pp").unwrap().tree);
        registry.import(&tree).unwrap();
        registry
    }

    #[test]
    fn import_is_idempotent_per_tree() {
        let mut registry = Registry::new();
        let tree = Rc::new(parse("define foo { }", "test.pp").unwrap().tree);
        registry.import(&tree).unwrap();
        registry.import(&tree).unwrap();
        assert!(registry.find_defined_type("foo").is_some());
    }

    #[test]
    fn duplicate_defined_type_is_fatal() {
        let mut registry = Registry::new();
        let first = Rc::new(parse("define foo { }", "a.pp").unwrap().tree);
        let second = Rc::new(parse("define foo { }", "b.pp").unwrap().tree);
        registry.import(&first).unwrap();
        let error = registry.import(&second).unwrap_err();
        assert!(error.message.contains("previously defined"));
    }

    #[test]
    fn duplicate_class_names_are_allowed() {
        let registry = import("class foo { }\nclass foo { }");
        assert_eq!(registry.find_class("foo").unwrap().len(), 2);
    }

    #[test]
    fn named_match_beats_regex() {
        let registry = import(
            "node /web/ { }\nnode 'web01.example.com' { }\nnode default { }",
        );
        let (definition, name, _) = registry.find_node(&Node::new("web01.example.com")).unwrap();
        assert_eq!(name, "web01.example.com");
        // The matched definition is the named one, not the regex
        let hostnames = &definition.statement.hostnames;
        assert!(matches!(&hostnames[0].0, Hostname::Literal(n) if n == "web01.example.com"));
    }

    #[test]
    fn default_node_is_last_resort() {
        let registry = import("node 'other' { }\nnode default { }");
        let (_, name, _) = registry.find_node(&Node::new("unmatched")).unwrap();
        assert_eq!(name, "default");
    }

    #[test]
    fn recursive_alias_resolves() {
        let registry = import("type Tree = Variant[Integer, Hash[String, Tree]]");
        let alias = registry.find_alias("Tree").unwrap();
        let t = Type::Alias(alias);
        assert!(t.assignable_from(&t));
        assert!(t.instance_of(&Value::Integer(1)));
    }
}
