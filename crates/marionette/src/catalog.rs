//! The resource catalog.
//!
//! Resources are created virtual (no vertex) and realized either
//! implicitly by a non-class declaration or explicitly by a collector or
//! `realize()`. Realization assigns a vertex id and materializes the
//! auto-tags derived from the type name. Finalization extracts edges from
//! relationship metaparameters and rejects any cycle in the non-`contains`
//! subgraph.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use strum::Display;

use crate::error::CycleError;
use crate::eval::scope::ScopeRef;
use crate::lexer::position::Span;
use crate::types::{Type, normalize_type_name};
use crate::value::Value;

/// Kinds of catalog edges. `source` must apply before `target`; `notify`
/// and `subscribe` additionally propagate change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Relationship {
    Contains,
    Before,
    Notify,
    Require,
    Subscribe,
}

impl Relationship {
    /// True when the target's JSON projection lists the source under
    /// `require` (apply-order only) rather than `subscribe`.
    #[must_use]
    pub fn is_ordering_only(self) -> bool {
        matches!(self, Self::Before | Self::Require)
    }
}

/// Index of a resource within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIndex(usize);

impl ResourceIndex {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A resource attribute: name and value, each with its source site.
///
/// Values are shared by `Rc` both at the attribute level (defaults are the
/// same `Attribute` across many resources) and inside array payloads, so
/// the append operator can test uniqueness before mutating.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub name_span: Span,
    pub value: Value,
    pub value_span: Span,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, name_span: Span, value: Value, value_span: Span) -> Self {
        Self {
            name: name.into(),
            name_span,
            value,
            value_span,
        }
    }
}

/// Metaparameter names accepted on every resource.
pub const METAPARAMETERS: &[&str] = &[
    "alias", "audit", "before", "loglevel", "noop", "notify", "require", "schedule", "stage", "subscribe", "tag",
];

/// The relationship metaparameters finalization turns into edges, with
/// the edge kind and whether the reference is the edge source.
const RELATIONSHIP_METAPARAMETERS: &[(&str, Relationship, bool)] = &[
    ("before", Relationship::Before, false),
    ("notify", Relationship::Notify, false),
    ("require", Relationship::Require, true),
    ("subscribe", Relationship::Subscribe, true),
];

/// True for the metaparameter names valid on any resource.
#[must_use]
pub fn is_metaparameter(name: &str) -> bool {
    METAPARAMETERS.contains(&name)
}

/// A declared resource.
#[derive(Debug)]
pub struct Resource {
    type_name: String,
    title: String,
    container: Option<ResourceIndex>,
    scope: Option<ScopeRef>,
    span: Option<Span>,
    path: String,
    exported: bool,
    vertex: Option<usize>,
    attributes: IndexMap<String, Rc<Attribute>>,
    tags: Vec<String>,
}

impl Resource {
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_class(&self) -> bool {
        self.type_name == "Class"
    }

    /// The resource's reference type: `Notify[a]` or `Class[foo]`.
    #[must_use]
    pub fn reference(&self) -> Type {
        if self.is_class() {
            Type::Class {
                title: Some(self.title.clone()),
            }
        } else {
            Type::Resource {
                type_name: Some(self.type_name.clone()),
                title: Some(self.title.clone()),
            }
        }
    }

    #[must_use]
    pub fn container(&self) -> Option<ResourceIndex> {
        self.container
    }

    #[must_use]
    pub fn scope(&self) -> Option<ScopeRef> {
        self.scope.clone()
    }

    #[must_use]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn exported(&self) -> bool {
        self.exported
    }

    /// True until the resource is realized.
    #[must_use]
    pub fn virtualized(&self) -> bool {
        self.vertex.is_none()
    }

    #[must_use]
    pub fn vertex_id(&self) -> Option<usize> {
        self.vertex
    }

    /// Gets an attribute, falling back to scope defaults for the type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<Attribute>> {
        if let Some(attribute) = self.attributes.get(name) {
            return Some(attribute.clone());
        }
        self.scope
            .as_ref()
            .and_then(|scope| scope.borrow().find_default(&self.type_name, name))
    }

    /// Sets (or replaces) an attribute.
    pub fn set(&mut self, attribute: Rc<Attribute>) {
        self.attributes.insert(attribute.name.clone(), attribute);
    }

    /// Removes an attribute, for `attr => undef` overrides.
    pub fn unset(&mut self, name: &str) {
        self.attributes.shift_remove(name);
    }

    /// Appends to an existing array attribute (the `+>` operator). The
    /// existing array is moved and extended only when wholly unshared; an
    /// array still aliased elsewhere (a scope default, another resource)
    /// is copied first.
    pub fn append(&mut self, attribute: Attribute) -> Result<(), String> {
        let existing = match self.attributes.shift_remove(&attribute.name) {
            Some(existing) => Some(existing),
            None => self
                .scope
                .as_ref()
                .and_then(|scope| scope.borrow().find_default(&self.type_name, &attribute.name)),
        };
        let Some(existing) = existing else {
            self.set(Rc::new(attribute));
            return Ok(());
        };
        if !matches!(existing.value, Value::Array(_)) {
            let message = format!(
                "attribute '{}' is not an array and cannot be appended to",
                attribute.name
            );
            self.attributes.insert(existing.name.clone(), existing);
            return Err(message);
        }

        let mut elements = match Rc::try_unwrap(existing) {
            Ok(owned) => match owned.value {
                Value::Array(elements) => match Rc::try_unwrap(elements) {
                    Ok(elements) => elements,
                    Err(shared) => shared.as_ref().clone(),
                },
                _ => unreachable!("checked above"),
            },
            Err(shared) => shared
                .value
                .as_array()
                .expect("checked above")
                .to_vec(),
        };
        elements.extend(attribute.value.into_elements(true));
        self.set(Rc::new(Attribute {
            name: attribute.name,
            name_span: attribute.name_span,
            value: Value::array(elements),
            value_span: attribute.value_span,
        }));
        Ok(())
    }

    /// Visits each attribute, including scope defaults not overridden
    /// locally.
    pub fn each_attribute(&self, callback: &mut dyn FnMut(&Attribute)) {
        let mut seen = AHashSet::new();
        for (name, attribute) in &self.attributes {
            seen.insert(name.clone());
            callback(attribute);
        }
        if let Some(scope) = &self.scope {
            scope.borrow().each_default(&self.type_name, &mut seen, &mut |attribute| {
                callback(attribute);
            });
        }
    }

    /// Adds an explicit tag (lowercased).
    pub fn tag(&mut self, tag: &str) {
        self.tags.push(tag.to_ascii_lowercase());
    }

    /// Realization: assigns the vertex and materializes auto-tags from the
    /// type name (or title, for classes).
    fn realize(&mut self, vertex: usize) {
        self.vertex = Some(vertex);

        let is_class = self.is_class();
        if is_class {
            self.tags.push("class".to_owned());
        }
        let name = if is_class { &self.title } else { &self.type_name }.to_ascii_lowercase();
        let mut parts = 0;
        for part in name.split("::").filter(|part| !part.is_empty()) {
            self.tags.push(part.to_owned());
            parts += 1;
        }
        if parts > 1 {
            self.tags.push(name);
        }
    }

    /// The complete tag set: own tags, the `tag` metaparameter, and
    /// (transitively) container tags, sorted and deduplicated.
    #[must_use]
    pub fn calculate_tags(&self, catalog: &Catalog) -> Vec<String> {
        let mut tags = Vec::new();
        self.populate_tags(catalog, &mut tags);
        tags.sort();
        tags.dedup();
        tags
    }

    fn populate_tags(&self, catalog: &Catalog, tags: &mut Vec<String>) {
        tags.extend(self.tags.iter().cloned());
        if let Some(attribute) = self.get("tag") {
            for element in attribute.value.clone().into_elements(false) {
                if let Value::String(tag) = element {
                    tags.push(tag.to_ascii_lowercase());
                }
            }
        }
        if let Some(container) = self.container {
            catalog.get(container).populate_tags(catalog, tags);
        }
    }
}

/// A labeled edge: `source` applies before `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: ResourceIndex,
    pub target: ResourceIndex,
    pub relationship: Relationship,
}

/// The catalog: an ordered resource set plus a relationship multigraph.
#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
    index: AHashMap<(String, String), ResourceIndex>,
    edges: Vec<Edge>,
    vertex_count: usize,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, virtual until realized. Fails with the existing
    /// index when the `{type, title}` identity is already declared, and
    /// rejects stages with containers.
    pub fn add(
        &mut self,
        type_name: &str,
        title: &str,
        container: Option<ResourceIndex>,
        scope: Option<ScopeRef>,
        span: Option<Span>,
        path: &str,
        exported: bool,
    ) -> Result<ResourceIndex, ResourceIndex> {
        let type_name = if type_name.eq_ignore_ascii_case("class") {
            "Class".to_owned()
        } else {
            normalize_type_name(type_name)
        };
        let title = if type_name == "Class" {
            title.trim_start_matches("::").to_ascii_lowercase()
        } else {
            title.to_owned()
        };
        assert!(
            !(type_name == "Stage" && container.is_some()),
            "stages cannot have a container"
        );

        let key = (type_name.clone(), title.clone());
        if let Some(existing) = self.index.get(&key) {
            return Err(*existing);
        }
        let index = ResourceIndex(self.resources.len());
        self.resources.push(Resource {
            type_name,
            title,
            container,
            scope,
            span,
            path: path.to_owned(),
            exported,
            vertex: None,
            attributes: IndexMap::new(),
            tags: Vec::new(),
        });
        self.index.insert(key, index);
        if let Some(container) = container {
            self.add_edge(container, index, Relationship::Contains);
        }
        Ok(index)
    }

    /// Finds a resource by type name and title.
    #[must_use]
    pub fn find(&self, type_name: &str, title: &str) -> Option<ResourceIndex> {
        let type_name = normalize_type_name(type_name);
        let title = if type_name == "Class" {
            title.trim_start_matches("::").to_ascii_lowercase()
        } else {
            title.to_owned()
        };
        self.index.get(&(type_name, title)).copied()
    }

    /// Finds a resource by a reference type value.
    #[must_use]
    pub fn find_by_reference(&self, reference: &Type) -> Option<ResourceIndex> {
        match reference {
            Type::Class { title: Some(title) } => self.find("Class", title),
            Type::Resource {
                type_name: Some(type_name),
                title: Some(title),
            } => self.find(type_name, title),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, index: ResourceIndex) -> &Resource {
        &self.resources[index.0]
    }

    pub fn get_mut(&mut self, index: ResourceIndex) -> &mut Resource {
        &mut self.resources[index.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource indices in declaration order. Returned by value so
    /// callers may mutate the catalog while walking.
    #[must_use]
    pub fn indices(&self) -> Vec<ResourceIndex> {
        (0..self.resources.len()).map(ResourceIndex).collect()
    }

    /// Realizes a resource, assigning the next vertex id. Idempotent.
    pub fn realize(&mut self, index: ResourceIndex) {
        let resource = &mut self.resources[index.0];
        if resource.vertex.is_some() {
            return;
        }
        let vertex = self.vertex_count;
        self.vertex_count += 1;
        resource.realize(vertex);
    }

    /// Adds a relationship edge; duplicate triples are ignored.
    pub fn add_edge(&mut self, source: ResourceIndex, target: ResourceIndex, relationship: Relationship) {
        let edge = Edge {
            source,
            target,
            relationship,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Visits each non-containment edge pointing at `target` (the
    /// resources `target` depends on).
    pub fn each_dependency(&self, target: ResourceIndex, callback: &mut dyn FnMut(Relationship, ResourceIndex)) {
        for edge in &self.edges {
            if edge.target == target && edge.relationship != Relationship::Contains {
                callback(edge.relationship, edge.source);
            }
        }
    }

    /// Extracts edges from the relationship metaparameters of every
    /// realized resource. Returns diagnostics for references to resources
    /// that do not exist.
    pub fn extract_metaparameter_edges(&mut self) -> Vec<(String, Option<Span>, String)> {
        let mut failures = Vec::new();
        let mut additions = Vec::new();
        for (index, resource) in self.resources.iter().enumerate() {
            if resource.virtualized() {
                continue;
            }
            let index = ResourceIndex(index);
            for (name, relationship, reference_is_source) in RELATIONSHIP_METAPARAMETERS {
                let Some(attribute) = resource.get(name) else {
                    continue;
                };
                each_reference(&attribute.value, &mut |reference| match self.find_by_reference(&reference) {
                    Some(referenced) => {
                        let (source, target) = if *reference_is_source {
                            (referenced, index)
                        } else {
                            (index, referenced)
                        };
                        additions.push(Edge {
                            source,
                            target,
                            relationship: *relationship,
                        });
                    }
                    None => {
                        failures.push((
                            resource.path.clone(),
                            Some(attribute.value_span),
                            format!(
                                "resource {reference} referenced by parameter '{name}' of resource {} does not exist in the catalog",
                                resource.reference()
                            ),
                        ));
                    }
                });
            }
        }
        for edge in additions {
            self.add_edge(edge.source, edge.target, edge.relationship);
        }
        failures
    }

    /// Cycle detection over the non-`contains` subgraph: depth-first
    /// search with tri-color marking; the first back edge found reports
    /// the cycle's members in traversal order.
    pub fn detect_cycles(&self) -> Result<(), CycleError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];
        for edge in &self.edges {
            if edge.relationship != Relationship::Contains {
                adjacency[edge.source.0].push(edge.target.0);
            }
        }

        let mut colors = vec![Color::White; self.resources.len()];
        for start in 0..self.resources.len() {
            if colors[start] != Color::White {
                continue;
            }
            // Iterative DFS keeping the gray path for cycle reporting
            let mut path: Vec<(usize, usize)> = vec![(start, 0)];
            colors[start] = Color::Gray;
            while let Some((vertex, next)) = path.last_mut() {
                if let Some(&successor) = adjacency[*vertex].get(*next) {
                    *next += 1;
                    match colors[successor] {
                        Color::White => {
                            colors[successor] = Color::Gray;
                            path.push((successor, 0));
                        }
                        Color::Gray => {
                            let begin = path
                                .iter()
                                .position(|(v, _)| *v == successor)
                                .unwrap_or_default();
                            let resources = path[begin..]
                                .iter()
                                .map(|(v, _)| self.resources[*v].reference().to_string())
                                .collect();
                            return Err(CycleError { resources });
                        }
                        Color::Black => {}
                    }
                } else {
                    colors[*vertex] = Color::Black;
                    path.pop();
                }
            }
        }
        Ok(())
    }

    /// The JSON projection: realized resources in vertex order with
    /// `require`/`subscribe` synthesized from the dependency edges, plus
    /// the containment edges.
    #[must_use]
    pub fn to_json(&self, node_name: &str) -> serde_json::Value {
        let mut ordered: Vec<ResourceIndex> = self
            .indices()
            .into_iter()
            .filter(|index| !self.get(*index).virtualized())
            .collect();
        ordered.sort_by_key(|index| self.get(*index).vertex_id());

        let resources: Vec<serde_json::Value> = ordered.iter().map(|index| self.resource_json(*index)).collect();

        let edges: Vec<serde_json::Value> = self
            .edges
            .iter()
            .filter(|edge| edge.relationship == Relationship::Contains)
            .filter(|edge| !self.get(edge.source).virtualized() && !self.get(edge.target).virtualized())
            .map(|edge| {
                serde_json::json!({
                    "source": self.get(edge.source).reference().to_string(),
                    "target": self.get(edge.target).reference().to_string(),
                })
            })
            .collect();

        serde_json::json!({
            "name": node_name,
            "resources": resources,
            "edges": edges,
        })
    }

    fn resource_json(&self, index: ResourceIndex) -> serde_json::Value {
        let resource = self.get(index);
        let mut object = serde_json::Map::new();
        object.insert("type".to_owned(), resource.type_name.clone().into());
        object.insert("title".to_owned(), resource.title.clone().into());
        object.insert(
            "tags".to_owned(),
            serde_json::Value::Array(resource.calculate_tags(self).into_iter().map(Into::into).collect()),
        );
        if let Some(span) = resource.span {
            object.insert("file".to_owned(), resource.path.clone().into());
            object.insert("line".to_owned(), span.begin.line.into());
        }
        object.insert("exported".to_owned(), resource.exported.into());

        let mut parameters = serde_json::Map::new();
        resource.each_attribute(&mut |attribute| {
            // Undef values and relationship metaparameters are omitted;
            // relationships re-emerge below from the dependency edges
            if attribute.value.is_undef() {
                return;
            }
            if matches!(attribute.name.as_str(), "before" | "notify" | "require" | "subscribe") {
                return;
            }
            parameters.insert(attribute.name.clone(), attribute.value.to_json());
        });

        let mut require = Vec::new();
        let mut subscribe = Vec::new();
        self.each_dependency(index, &mut |relationship, source| {
            let reference = self.get(source).reference().to_string().into();
            if relationship.is_ordering_only() {
                require.push(reference);
            } else {
                subscribe.push(reference);
            }
        });
        if !require.is_empty() {
            parameters.insert("require".to_owned(), serde_json::Value::Array(require));
        }
        if !subscribe.is_empty() {
            parameters.insert("subscribe".to_owned(), serde_json::Value::Array(subscribe));
        }

        if !parameters.is_empty() {
            object.insert("parameters".to_owned(), serde_json::Value::Object(parameters));
        }
        serde_json::Value::Object(object)
    }
}

/// Visits each resource reference in a metaparameter value: a reference
/// type, a `Type[title]` string, or an array of either.
pub fn each_reference(value: &Value, callback: &mut dyn FnMut(Type)) {
    match value {
        Value::Type(t) if t.is_catalog_reference() => callback(t.clone()),
        Value::String(text) => {
            if let Some(reference) = parse_reference(text) {
                callback(reference);
            }
        }
        Value::Array(elements) => {
            for element in elements.iter() {
                each_reference(element, callback);
            }
        }
        _ => {}
    }
}

/// Parses a `Type[title]` resource reference string.
#[must_use]
pub fn parse_reference(text: &str) -> Option<Type> {
    let open = text.find('[')?;
    let close = text.rfind(']')?;
    if close != text.len() - 1 || open == 0 {
        return None;
    }
    let type_name = text[..open].trim();
    let title = text[open + 1..close].trim().trim_matches('\'').trim_matches('"');
    if type_name.is_empty() || title.is_empty() {
        return None;
    }
    if type_name.eq_ignore_ascii_case("class") {
        Some(Type::class(title))
    } else {
        Some(Type::resource(type_name, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(names: &[&str]) -> (Catalog, Vec<ResourceIndex>) {
        let mut catalog = Catalog::new();
        let indices = names
            .iter()
            .map(|name| {
                let index = catalog
                    .add("notify", name, None, None, None, "test.pp", false)
                    .unwrap();
                catalog.realize(index);
                index
            })
            .collect();
        (catalog, indices)
    }

    #[test]
    fn duplicate_declaration_returns_existing() {
        let mut catalog = Catalog::new();
        let first = catalog.add("notify", "a", None, None, None, "t.pp", false).unwrap();
        let error = catalog.add("Notify", "a", None, None, None, "t.pp", false).unwrap_err();
        assert_eq!(first, error);
    }

    #[test]
    fn realization_assigns_auto_tags() {
        let mut catalog = Catalog::new();
        let index = catalog
            .add("foo::bar", "x", None, None, None, "t.pp", false)
            .unwrap();
        catalog.realize(index);
        let tags = catalog.get(index).calculate_tags(&catalog);
        assert!(tags.contains(&"foo".to_owned()));
        assert!(tags.contains(&"bar".to_owned()));
        assert!(tags.contains(&"foo::bar".to_owned()));
    }

    #[test]
    fn class_realization_tags_class() {
        let mut catalog = Catalog::new();
        let index = catalog.add("class", "base", None, None, None, "t.pp", false).unwrap();
        catalog.realize(index);
        let tags = catalog.get(index).calculate_tags(&catalog);
        assert!(tags.contains(&"class".to_owned()));
        assert!(tags.contains(&"base".to_owned()));
    }

    #[test]
    fn cycle_detection_reports_members() {
        let (mut catalog, indices) = catalog_with(&["a", "b", "c"]);
        catalog.add_edge(indices[0], indices[1], Relationship::Before);
        catalog.add_edge(indices[1], indices[2], Relationship::Before);
        catalog.add_edge(indices[2], indices[0], Relationship::Before);
        let error = catalog.detect_cycles().unwrap_err();
        assert_eq!(error.resources.len(), 3);
        assert!(error.resources.contains(&"Notify[a]".to_owned()));
    }

    #[test]
    fn contains_edges_do_not_cycle() {
        let (mut catalog, indices) = catalog_with(&["a", "b"]);
        catalog.add_edge(indices[0], indices[1], Relationship::Contains);
        catalog.add_edge(indices[1], indices[0], Relationship::Contains);
        assert!(catalog.detect_cycles().is_ok());
    }

    #[test]
    fn metaparameter_edges_synthesize_require() {
        let (mut catalog, indices) = catalog_with(&["a", "b"]);
        let attribute = Attribute::new(
            "require",
            Span::default(),
            Value::Type(Type::resource("notify", "b")),
            Span::default(),
        );
        catalog.get_mut(indices[0]).set(Rc::new(attribute));
        let failures = catalog.extract_metaparameter_edges();
        assert!(failures.is_empty());

        let json = catalog.to_json("test");
        let resources = json["resources"].as_array().unwrap();
        let a = resources.iter().find(|r| r["title"] == "a").unwrap();
        assert_eq!(a["parameters"]["require"][0], "Notify[b]");
    }

    #[test]
    fn missing_reference_is_reported() {
        let (mut catalog, indices) = catalog_with(&["a"]);
        let attribute = Attribute::new(
            "before",
            Span::default(),
            Value::string("Notify[missing]"),
            Span::default(),
        );
        catalog.get_mut(indices[0]).set(Rc::new(attribute));
        let failures = catalog.extract_metaparameter_edges();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].2.contains("does not exist"));
    }

    #[test]
    fn append_copies_shared_arrays() {
        let (mut catalog, indices) = catalog_with(&["a"]);
        let shared = Value::array(vec![Value::Integer(1)]);
        let original = shared.clone();
        catalog.get_mut(indices[0]).set(Rc::new(Attribute::new(
            "groups",
            Span::default(),
            shared,
            Span::default(),
        )));
        catalog
            .get_mut(indices[0])
            .append(Attribute::new(
                "groups",
                Span::default(),
                Value::Integer(2),
                Span::default(),
            ))
            .unwrap();
        // The alias held before the append still sees one element
        assert_eq!(original.as_array().unwrap().len(), 1);
        let appended = catalog.get(indices[0]).get("groups").unwrap();
        assert_eq!(appended.value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn parses_reference_strings() {
        assert_eq!(parse_reference("Notify[a]"), Some(Type::resource("notify", "a")));
        assert_eq!(parse_reference("Class['foo']"), Some(Type::class("foo")));
        assert_eq!(parse_reference("nonsense"), None);
    }
}
