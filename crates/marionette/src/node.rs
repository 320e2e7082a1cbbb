//! The node being compiled for: its name and facts.

use std::fmt;

use indexmap::IndexMap;

use crate::value::Value;

/// A fact provider, consulted only by the top scope.
pub trait Facts: fmt::Debug {
    /// Looks up a fact by name.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// The names of all known facts, in a stable order.
    fn names(&self) -> Vec<String>;
}

/// A fact provider over an in-memory map.
#[derive(Debug, Default, Clone)]
pub struct MapFacts {
    facts: IndexMap<String, Value>,
}

impl MapFacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.facts.insert(name.into(), value);
    }
}

impl Facts for MapFacts {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.facts.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.facts.keys().cloned().collect()
    }
}

/// The node a catalog is being compiled for.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
}

impl Node {
    /// Creates a node; the name is lowercased for matching.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Visits each candidate name for definition matching: the full name,
    /// then each `.`-suffix (`a.b.c`, `b.c`, `c`). The callback returns
    /// false to stop early; the visit returns false if stopped.
    pub fn each_name(&self, mut callback: impl FnMut(&str) -> bool) -> bool {
        let mut rest = self.name.as_str();
        loop {
            if !callback(rest) {
                return false;
            }
            match rest.find('.') {
                Some(index) => rest = &rest[index + 1..],
                None => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_name_yields_suffixes() {
        let node = Node::new("Web01.Example.COM");
        let mut names = Vec::new();
        node.each_name(|name| {
            names.push(name.to_owned());
            true
        });
        assert_eq!(names, vec!["web01.example.com", "example.com", "com"]);
    }

    #[test]
    fn each_name_stops_early() {
        let node = Node::new("a.b.c");
        let mut count = 0;
        let completed = node.each_name(|_| {
            count += 1;
            count < 2
        });
        assert!(!completed);
        assert_eq!(count, 2);
    }
}
