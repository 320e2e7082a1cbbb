//! Lexical scopes and match scopes.
//!
//! Scopes form a parent chain shared by `Rc`: class scopes parent at their
//! inherited class (or node-or-top), defined type scopes at node-or-top,
//! and the top scope alone consults the fact provider. A variable binds at
//! most once per scope; the assignment site is kept for the error message
//! a rebind produces.
//!
//! Match scopes mirror control-flow nesting. Capture lists are shared with
//! closures by `Rc`; a write that observes sharing allocates a fresh list
//! instead of mutating (`Rc::strong_count` is the observation).

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::catalog::{Attribute, ResourceIndex};
use crate::lexer::position::Span;
use crate::node::Facts;
use crate::types::normalize_type_name;
use crate::value::Value;

/// A shared, mutable scope handle.
pub type ScopeRef = Rc<RefCell<Scope>>;

/// A variable binding together with its assignment site.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub span: Span,
}

/// A lexical scope.
#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeRef>,
    /// The resource this scope decorates (a class's resource), if any.
    resource: Option<ResourceIndex>,
    variables: AHashMap<String, Binding>,
    /// Per-resource-type default attributes declared with `Type { ... }`.
    defaults: AHashMap<String, IndexMap<String, Rc<Attribute>>>,
    /// Fact provider; present only on the top scope.
    facts: Option<Rc<dyn Facts>>,
}

impl Scope {
    /// Creates the top scope with its fact provider.
    #[must_use]
    pub fn top(facts: Rc<dyn Facts>) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            resource: None,
            variables: AHashMap::new(),
            defaults: AHashMap::new(),
            facts: Some(facts),
        }))
    }

    /// Creates a child scope, optionally decorating a resource.
    #[must_use]
    pub fn child(parent: ScopeRef, resource: Option<ResourceIndex>) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            resource,
            variables: AHashMap::new(),
            defaults: AHashMap::new(),
            facts: None,
        }))
    }

    #[must_use]
    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent.clone()
    }

    /// The resource this scope (or the nearest ancestor scope) decorates.
    #[must_use]
    pub fn resource(&self) -> Option<ResourceIndex> {
        match self.resource {
            Some(resource) => Some(resource),
            None => self.parent.as_ref().and_then(|p| p.borrow().resource()),
        }
    }

    /// Looks up a variable in this scope only (no parent walk), falling
    /// back to facts on the top scope.
    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.variables.get(name) {
            return Some(binding.value.clone());
        }
        if let Some(facts) = &self.facts {
            return facts.lookup(name);
        }
        None
    }

    /// Looks up a variable, walking parent scopes.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.get_local(name) {
            return Some(value);
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    /// The assignment site of a local binding, if the name is bound here.
    #[must_use]
    pub fn assignment_site(&self, name: &str) -> Option<Span> {
        self.variables.get(name).map(|binding| binding.span)
    }

    /// True when the name is a fact (or node parameter) on this scope.
    #[must_use]
    pub fn is_fact(&self, name: &str) -> bool {
        self.facts.as_ref().is_some_and(|facts| facts.lookup(name).is_some())
    }

    /// Binds a variable. Fails (returning the previous site, or `None`
    /// when the name shadows a fact) if the name is already bound in this
    /// scope.
    pub fn set(&mut self, name: String, value: Value, span: Span) -> Result<(), Option<Span>> {
        if self.is_fact(&name) {
            return Err(None);
        }
        if let Some(existing) = self.variables.get(&name) {
            return Err(Some(existing.span));
        }
        self.variables.insert(name, Binding { value, span });
        Ok(())
    }

    /// Records a default attribute for a resource type.
    pub fn set_default(&mut self, type_name: &str, attribute: Rc<Attribute>) {
        self.defaults
            .entry(normalize_type_name(type_name))
            .or_default()
            .insert(attribute.name.clone(), attribute);
    }

    /// Finds a default attribute for a resource type, walking parents.
    #[must_use]
    pub fn find_default(&self, type_name: &str, name: &str) -> Option<Rc<Attribute>> {
        if let Some(defaults) = self.defaults.get(type_name) {
            if let Some(attribute) = defaults.get(name) {
                return Some(attribute.clone());
            }
        }
        self.parent
            .as_ref()
            .and_then(|p| p.borrow().find_default(type_name, name))
    }

    /// Visits every default attribute for a resource type not already in
    /// `seen`, innermost scope first.
    pub fn each_default(
        &self,
        type_name: &str,
        seen: &mut ahash::AHashSet<String>,
        callback: &mut dyn FnMut(&Rc<Attribute>),
    ) {
        if let Some(defaults) = self.defaults.get(type_name) {
            for (name, attribute) in defaults {
                if seen.insert(name.clone()) {
                    callback(attribute);
                }
            }
        }
        if let Some(parent) = &self.parent {
            parent.borrow().each_default(type_name, seen, callback);
        }
    }
}

/// Regex captures from the most recent match: index 0 is the whole match.
pub type Captures = SmallVec<[Option<String>; 4]>;

/// The match-scope stack.
///
/// Entering `if`, `unless`, `case`, or a selector pushes a scope; leaving
/// pops it. A successful regex match replaces the innermost scope's
/// captures.
#[derive(Debug, Default)]
pub struct MatchScopes {
    stack: Vec<Option<Rc<Captures>>>,
}

impl MatchScopes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.stack.push(None);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Stores new captures in the innermost scope. Mutates in place when
    /// the capture list is unshared; allocates a fresh list when a closure
    /// still holds the old one.
    pub fn set(&mut self, captures: Captures) {
        let Some(innermost) = self.stack.last_mut() else {
            // Matches outside any control structure land in an implicit scope
            self.stack.push(Some(Rc::new(captures)));
            return;
        };
        match innermost {
            Some(existing) => match Rc::get_mut(existing) {
                Some(unshared) => *unshared = captures,
                None => *innermost = Some(Rc::new(captures)),
            },
            None => *innermost = Some(Rc::new(captures)),
        }
    }

    /// The current capture list, shared for closure capture.
    #[must_use]
    pub fn current(&self) -> Option<Rc<Captures>> {
        self.stack.iter().rev().find_map(Clone::clone)
    }

    /// Restores a previously captured list (closure invocation).
    pub fn restore(&mut self, captures: Option<Rc<Captures>>) {
        self.stack.push(captures);
    }

    /// Looks up match variable `$index` from the nearest scope with
    /// captures.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        let captures = self.stack.iter().rev().find_map(Clone::clone)?;
        match captures.get(index) {
            Some(Some(text)) => Some(Value::string(text.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MapFacts;

    fn top_scope() -> ScopeRef {
        Scope::top(Rc::new(MapFacts::default()))
    }

    #[test]
    fn rebinding_reports_original_site() {
        let scope = top_scope();
        let first = Span::default();
        scope
            .borrow_mut()
            .set("x".to_owned(), Value::Integer(1), first)
            .unwrap();
        let error = scope
            .borrow_mut()
            .set("x".to_owned(), Value::Integer(2), Span::default())
            .unwrap_err();
        assert_eq!(error, Some(first));
    }

    #[test]
    fn fact_names_cannot_be_bound() {
        let mut facts = MapFacts::default();
        facts.insert("fqdn", Value::string("node.example.com"));
        let scope = Scope::top(Rc::new(facts));
        let error = scope
            .borrow_mut()
            .set("fqdn".to_owned(), Value::Integer(1), Span::default())
            .unwrap_err();
        assert_eq!(error, None);
    }

    #[test]
    fn lookup_walks_parents() {
        let top = top_scope();
        top.borrow_mut()
            .set("x".to_owned(), Value::Integer(1), Span::default())
            .unwrap();
        let child = Scope::child(top, None);
        assert_eq!(child.borrow().get("x"), Some(Value::Integer(1)));
        assert_eq!(child.borrow().get_local("x"), None);
    }

    #[test]
    fn shared_captures_are_not_mutated() {
        let mut scopes = MatchScopes::new();
        scopes.push();
        scopes.set(SmallVec::from_vec(vec![Some("first".to_owned())]));
        let captured = scopes.current().unwrap();
        scopes.set(SmallVec::from_vec(vec![Some("second".to_owned())]));
        assert_eq!(captured[0].as_deref(), Some("first"));
        assert_eq!(scopes.get(0), Some(Value::string("second")));
    }

    #[test]
    fn inner_scope_shadows_and_pops() {
        let mut scopes = MatchScopes::new();
        scopes.push();
        scopes.set(SmallVec::from_vec(vec![Some("outer".to_owned())]));
        scopes.push();
        scopes.set(SmallVec::from_vec(vec![Some("inner".to_owned())]));
        assert_eq!(scopes.get(0), Some(Value::string("inner")));
        scopes.pop();
        assert_eq!(scopes.get(0), Some(Value::string("outer")));
    }
}
