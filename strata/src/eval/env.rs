//! Lexical environments
//!
//! An environment maps names to store addresses. It has snapshot
//! semantics: extension builds a new environment sharing the old one's
//! blocks, so capturing an environment in a closure is O(1) and later
//! extension of the defining scope cannot retroactively change the
//! capture. Later/inner bindings shadow earlier/outer ones.

use std::rc::Rc;

use super::store::Address;

#[derive(Debug)]
struct Block {
    bindings: Vec<(String, Address)>,
    parent: Option<Rc<Block>>,
}

/// Persistent name-to-address mapping
#[derive(Debug, Clone, Default)]
pub struct Environment {
    head: Option<Rc<Block>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { head: None }
    }

    /// A new environment with one extra binding; `self` is unaffected.
    pub fn insert(&self, name: impl Into<String>, addr: Address) -> Environment {
        self.extend(vec![(name.into(), addr)])
    }

    /// A new environment with a block of bindings; `self` is unaffected.
    pub fn extend(&self, bindings: Vec<(String, Address)>) -> Environment {
        if bindings.is_empty() {
            return self.clone();
        }
        Environment {
            head: Some(Rc::new(Block {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    /// Union in `mappend` style: every binding of `inner` shadows any
    /// same-named binding of `self`.
    pub fn union(&self, inner: &Environment) -> Environment {
        let mut inner_blocks = Vec::new();
        let mut cursor = &inner.head;
        while let Some(block) = cursor {
            inner_blocks.push(block);
            cursor = &block.parent;
        }
        // replay outer-to-inner so shadowing order is preserved
        let mut result = self.clone();
        for block in inner_blocks.into_iter().rev() {
            result = result.extend(block.bindings.clone());
        }
        result
    }

    /// Nearest binding for `name`, if any
    pub fn lookup(&self, name: &str) -> Option<Address> {
        let mut cursor = &self.head;
        while let Some(block) = cursor {
            // within a block the later binding wins
            if let Some((_, addr)) = block.bindings.iter().rev().find(|(n, _)| n == name) {
                return Some(*addr);
            }
            cursor = &block.parent;
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Visible names, nearest first, shadowed duplicates removed
    pub fn names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let mut cursor = &self.head;
        while let Some(block) = cursor {
            for (name, _) in block.bindings.iter().rev() {
                if !seen.iter().any(|s| s == name) {
                    seen.push(name.clone());
                }
            }
            cursor = &block.parent;
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::store::Store;

    fn addr(store: &mut Store<i64>) -> Address {
        store.alloc()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let env = Environment::new().insert("x", a);
        assert_eq!(env.lookup("x"), Some(a));
        assert_eq!(env.lookup("y"), None);
    }

    #[test]
    fn test_extension_is_a_snapshot() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let b = addr(&mut store);

        let base = Environment::new().insert("x", a);
        let extended = base.insert("y", b);

        // the original is unaffected by the extension
        assert_eq!(base.lookup("y"), None);
        assert_eq!(extended.lookup("x"), Some(a));
        assert_eq!(extended.lookup("y"), Some(b));
    }

    #[test]
    fn test_inner_binding_shadows() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let b = addr(&mut store);

        let env = Environment::new().insert("x", a).insert("x", b);
        assert_eq!(env.lookup("x"), Some(b));
    }

    #[test]
    fn test_union_inner_wins() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let b = addr(&mut store);
        let c = addr(&mut store);

        let outer = Environment::new().insert("x", a).insert("y", b);
        let inner = Environment::new().insert("x", c);

        let merged = outer.union(&inner);
        assert_eq!(merged.lookup("x"), Some(c));
        assert_eq!(merged.lookup("y"), Some(b));
    }

    #[test]
    fn test_names_dedup_nearest_first() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let b = addr(&mut store);

        let env = Environment::new().insert("x", a).insert("y", b).insert("x", b);
        assert_eq!(env.names(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_empty() {
        let env = Environment::new();
        assert!(env.is_empty());
        assert!(!env.contains("anything"));
    }

    #[test]
    fn test_capture_is_immune_to_later_extension() {
        let mut store = Store::new();
        let a = addr(&mut store);
        let b = addr(&mut store);

        let defining = Environment::new().insert("x", a);
        let captured = defining.clone();

        let _rebound = defining.insert("x", b);
        assert_eq!(captured.lookup("x"), Some(a));
    }
}
