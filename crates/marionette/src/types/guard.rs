//! Recursion guard for alias traversal.
//!
//! Assignability and instance checks descend through aliases that may
//! reference themselves. The guard maps `(resolved-type identity, other
//! identity)` keys to a boolean seeded `true` on first entry; a second
//! entry for the same key short-circuits with the stored result, giving
//! recursive type equivalence its coinductive reading (a cycle proves
//! nothing false).

use ahash::AHashMap;

use crate::types::AliasType;

/// Result of entering the guard for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// First visit; compute the real answer and store it with
    /// [`RecursionGuard::store`].
    First(GuardKey),
    /// The key is already on the traversal path; use the stored value.
    Recursed(bool),
}

/// An opaque key returned by [`RecursionGuard::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardKey {
    resolved: usize,
    other: usize,
}

/// Tracks `(alias, other)` pairs already being traversed.
#[derive(Debug, Default)]
pub struct RecursionGuard {
    map: AHashMap<GuardKey, bool>,
}

impl RecursionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the guard for an alias paired with the address of whatever is
    /// being compared against (a type or a value).
    pub fn enter(&mut self, alias: &AliasType, other: usize) -> Entry {
        let key = GuardKey {
            resolved: alias.identity(),
            other,
        };
        match self.map.get(&key) {
            Some(stored) => Entry::Recursed(*stored),
            None => {
                self.map.insert(key, true);
                Entry::First(key)
            }
        }
    }

    /// Stores the computed result for a key returned by [`Self::enter`].
    pub fn store(&mut self, key: GuardKey, value: bool) {
        self.map.insert(key, value);
    }
}

/// Address of a referent, used as the `other` half of a guard key.
#[must_use]
pub fn identity_of<T>(value: &T) -> usize {
    std::ptr::from_ref(value) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn second_entry_recurses_with_seed_true() {
        let alias = AliasType::new("T");
        let other = Type::Boolean;
        let mut guard = RecursionGuard::new();
        let Entry::First(key) = guard.enter(&alias, identity_of(&other)) else {
            panic!("expected first entry");
        };
        assert_eq!(guard.enter(&alias, identity_of(&other)), Entry::Recursed(true));
        guard.store(key, false);
        assert_eq!(guard.enter(&alias, identity_of(&other)), Entry::Recursed(false));
    }
}
