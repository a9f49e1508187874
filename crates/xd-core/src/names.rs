//! Name scopes. The document root opens one, and so does every template.

use crate::id::ObjectId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct NameScope {
    names: HashMap<String, ObjectId>,
}

impl NameScope {
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Whether `name` is taken by an object other than `owner`.
    pub fn is_taken(&self, name: &str, owner: ObjectId) -> bool {
        self.names.get(name).is_some_and(|&o| o != owner)
    }

    /// Returns `false` when the name already belongs to another object.
    pub fn register(&mut self, name: &str, owner: ObjectId) -> bool {
        if self.is_taken(name, owner) {
            return false;
        }
        self.names.insert(name.to_string(), owner);
        true
    }

    pub fn unregister(&mut self, name: &str, owner: ObjectId) {
        if self.names.get(name) == Some(&owner) {
            self.names.remove(name);
        }
    }

    /// First free `prefix1`, `prefix2`, ...
    pub fn unique_name(&self, prefix: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}{n}"))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_else(|| prefix.to_string())
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.names.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// All scopes of a document, keyed by the object that opens them.
#[derive(Debug, Clone, Default)]
pub struct NameScopes {
    scopes: HashMap<ObjectId, NameScope>,
}

impl NameScopes {
    pub fn scope(&self, root: ObjectId) -> Option<&NameScope> {
        self.scopes.get(&root)
    }

    pub fn scope_mut(&mut self, root: ObjectId) -> &mut NameScope {
        self.scopes.entry(root).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let a = ObjectId::from_index(1);
        let b = ObjectId::from_index(2);
        let mut scope = NameScope::default();
        assert!(scope.register("ok", a));
        assert!(scope.register("ok", a));
        assert!(!scope.register("ok", b));
        scope.unregister("ok", b);
        assert_eq!(scope.lookup("ok"), Some(a));
        scope.unregister("ok", a);
        assert!(scope.register("ok", b));
    }

    #[test]
    fn unique_names_skip_taken() {
        let mut scope = NameScope::default();
        scope.register("button1", ObjectId::from_index(0));
        assert_eq!(scope.unique_name("button"), "button2");
    }
}
