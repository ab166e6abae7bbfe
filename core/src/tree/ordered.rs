//! Insertion-ordered nested map.
//!
//! `OrderedTree` is the untracked storage behind every config. It knows
//! nothing about owners or dirtiness; [`crate::tracking::DirtyTrackingTree`]
//! layers notification on top.

use indexmap::IndexMap;
use serde_yaml::Mapping;

use super::key::Key;
use super::value::{plain_key, Value};
use crate::error::{Result, StoreError};


/// A nested, key-ordered map of config values.
///
/// Deliberately not `Clone`: copies would escape change tracking. The
/// copying operations callers may reach for (`dup`, `reject`, `select`,
/// `merge`) exist only to fail with [`StoreError::Unsupported`].
#[derive(Debug, Default, PartialEq)]
pub struct OrderedTree {
    entries: IndexMap<Key, Value>,
}

impl OrderedTree {
    pub fn new() -> Self {
        OrderedTree {
            entries: IndexMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut Value> {
        self.entries.get_mut(&key.into())
    }

    /// The nested namespace at `key`, if one exists there.
    pub fn child(&self, key: impl Into<Key>) -> Option<&OrderedTree> {
        self.get(key).and_then(Value::as_tree)
    }

    /// Walk `path` through nested namespaces without creating anything.
    pub fn lookup(&self, path: &[Key]) -> Option<&OrderedTree> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.entries.contains_key(&key.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Auto-vivifying access: the namespace at `key`, created at the end of
    /// the map when absent. A leaf sitting at `key` is replaced.
    pub fn child_mut(&mut self, key: impl Into<Key>) -> &mut OrderedTree {
        let slot = self
            .entries
            .entry(key.into())
            .or_insert_with(|| Value::Tree(OrderedTree::new()));
        loop {
            match slot {
                Value::Tree(tree) => return tree,
                Value::Leaf(_) => *slot = Value::Tree(OrderedTree::new()),
            }
        }
    }

    /// Multi-segment [`OrderedTree::child_mut`].
    pub fn vivify(&mut self, path: &[Key]) -> &mut OrderedTree {
        path.iter().fold(self, |node, key| node.child_mut(key))
    }

    /// Insert or overwrite. Existing keys keep their position.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn delete(&mut self, key: impl Into<Key>) -> Option<Value> {
        self.entries.shift_remove(&key.into())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove every entry for which `predicate` returns true.
    pub fn delete_if<F>(&mut self, mut predicate: F) -> &mut Self
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.entries.retain(|k, v| !predicate(k, v));
        self
    }

    /// Keep only the entries for which `predicate` returns true.
    pub fn retain<F>(&mut self, mut predicate: F) -> &mut Self
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.entries.retain(|k, v| predicate(k, v));
        self
    }

    // -------------------------------------------------------------------
    // Unsupported copies
    // -------------------------------------------------------------------

    pub fn dup(&self) -> Result<OrderedTree> {
        Err(StoreError::unsupported("dup"))
    }

    pub fn reject<F>(&self, _predicate: F) -> Result<OrderedTree>
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        Err(StoreError::unsupported("reject"))
    }

    pub fn select<F>(&self, _predicate: F) -> Result<OrderedTree>
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        Err(StoreError::unsupported("select"))
    }

    pub fn merge(&self, _other: &OrderedTree) -> Result<OrderedTree> {
        Err(StoreError::unsupported("merge"))
    }

    // -------------------------------------------------------------------
    // Conversions
    // -------------------------------------------------------------------

    /// Plain YAML mapping in insertion order, namespaces nested as mappings.
    pub fn to_mapping(&self) -> Mapping {
        self.entries
            .iter()
            .map(|(k, v)| (plain_key(k), v.to_yaml()))
            .collect()
    }

    pub(crate) fn matches_mapping(&self, mapping: &Mapping) -> bool {
        self.len() == mapping.len()
            && mapping.iter().all(|(k, v)| {
                self.entries
                    .get(&Key::from_yaml(k))
                    .map_or(false, |mine| mine.matches_yaml(v))
            })
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for OrderedTree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = OrderedTree::new();
        for (k, v) in iter {
            tree.set(k, v);
        }
        tree
    }
}
