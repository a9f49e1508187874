//! Live instances: the objects a XAML document describes.
//!
//! Instances hold member values keyed by name (attached members use the
//! `Owner.Member` key) and, for collection types, an ordered item list.

use crate::id::{InstanceId, Name, TypeKey};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Instance {
    pub ty: TypeKey,
    values: HashMap<Name, Value>,
    items: Vec<Value>,
    /// Parallel to `items` for dictionaries.
    keys: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    instances: Vec<Instance>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, ty: TypeKey) -> InstanceId {
        let id = InstanceId::from_index(self.instances.len());
        self.instances.push(Instance {
            ty,
            values: HashMap::new(),
            items: Vec::new(),
            keys: Vec::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn type_of(&self, id: InstanceId) -> TypeKey {
        self.instances[id.index()].ty
    }

    // ─── Members ──────────────────────────────────────────────────────────

    pub fn value(&self, id: InstanceId, key: Name) -> Option<&Value> {
        self.instances[id.index()].values.get(&key)
    }

    pub fn set_value(&mut self, id: InstanceId, key: Name, value: Value) {
        self.instances[id.index()].values.insert(key, value);
    }

    pub fn clear_value(&mut self, id: InstanceId, key: Name) -> Option<Value> {
        self.instances[id.index()].values.remove(&key)
    }

    pub fn has_value(&self, id: InstanceId, key: Name) -> bool {
        self.instances[id.index()].values.contains_key(&key)
    }

    // ─── Collections ──────────────────────────────────────────────────────

    pub fn items(&self, id: InstanceId) -> &[Value] {
        &self.instances[id.index()].items
    }

    pub fn count(&self, id: InstanceId) -> usize {
        self.instances[id.index()].items.len()
    }

    pub fn add(&mut self, id: InstanceId, value: Value) {
        let inst = &mut self.instances[id.index()];
        inst.items.push(value);
        inst.keys.push(None);
    }

    pub fn insert(&mut self, id: InstanceId, index: usize, value: Value) {
        let inst = &mut self.instances[id.index()];
        let index = index.min(inst.items.len());
        inst.items.insert(index, value);
        inst.keys.insert(index, None);
    }

    pub fn remove_at(&mut self, id: InstanceId, index: usize) -> Option<Value> {
        let inst = &mut self.instances[id.index()];
        if index >= inst.items.len() {
            return None;
        }
        inst.keys.remove(index);
        Some(inst.items.remove(index))
    }

    pub fn clear(&mut self, id: InstanceId) {
        let inst = &mut self.instances[id.index()];
        inst.items.clear();
        inst.keys.clear();
    }

    /// Add a keyed entry; an existing entry with the same key is replaced.
    pub fn dictionary_insert(&mut self, id: InstanceId, key: &str, value: Value) {
        let inst = &mut self.instances[id.index()];
        match inst.keys.iter().position(|k| k.as_deref() == Some(key)) {
            Some(i) => inst.items[i] = value,
            None => {
                inst.items.push(value);
                inst.keys.push(Some(key.to_string()));
            }
        }
    }

    pub fn dictionary_get(&self, id: InstanceId, key: &str) -> Option<&Value> {
        let inst = &self.instances[id.index()];
        inst.keys
            .iter()
            .position(|k| k.as_deref() == Some(key))
            .map(|i| &inst.items[i])
    }

    pub fn dictionary_keys(&self, id: InstanceId) -> impl Iterator<Item = &str> {
        self.instances[id.index()].keys.iter().filter_map(|k| k.as_deref())
    }
}
