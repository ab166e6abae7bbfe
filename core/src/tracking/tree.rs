//! Dirty-tracking views over an [`OrderedTree`].
//!
//! A `DirtyTrackingTree` addresses one namespace of a root tree by path and
//! carries the owner every mutation reports to. Views derived from it
//! (`at`, `by_ref`, `path`) share that same owner, so a write at any depth
//! reaches the one record flag.
//!
//! Navigation is lazy. Walking into a namespace that does not exist yet
//! creates nothing; the path is materialized by the first write below it.

use serde_yaml::Value as YamlValue;

use super::owner::Owner;
use crate::error::{Result, StoreError};
use crate::tree::{Key, OrderedTree, Value};


pub struct DirtyTrackingTree<'a> {
    root: &'a mut OrderedTree,
    path: Vec<Key>,
    owner: Owner<'a>,
}

impl<'a> DirtyTrackingTree<'a> {
    /// A view of `root` itself.
    pub fn new(root: &'a mut OrderedTree, owner: Owner<'a>) -> Self {
        DirtyTrackingTree {
            root,
            path: Vec::new(),
            owner,
        }
    }

    // -------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------

    /// Descend into the namespace at `key`.
    pub fn at(mut self, key: impl Into<Key>) -> Self {
        self.path.push(key.into());
        self
    }

    /// Descend along a dotted path such as `sortable_tables.posts.sort`.
    pub fn path(self, dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self, |view, segment| view.at(segment))
    }

    /// A shorter-lived view of the same namespace, bound to the same owner.
    pub fn by_ref(&mut self) -> DirtyTrackingTree<'_> {
        DirtyTrackingTree {
            root: &mut *self.root,
            path: self.path.clone(),
            owner: self.owner.reborrow(),
        }
    }

    /// Keys from the root down to this namespace.
    pub fn location(&self) -> &[Key] {
        &self.path
    }

    pub fn owner(&self) -> &Owner<'a> {
        &self.owner
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// The namespace this view addresses, if it has been materialized.
    pub fn tree(&self) -> Option<&OrderedTree> {
        self.root.lookup(&self.path)
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.tree().and_then(|node| node.get(key))
    }

    /// Read a value at a dotted path below this namespace.
    pub fn get_path(&self, dotted: &str) -> Option<&Value> {
        let mut segments: Vec<Key> = dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(Key::from)
            .collect();
        let last = segments.pop()?;
        self.tree()?.lookup(&segments)?.get(last)
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.tree().map_or(false, |node| node.contains_key(key))
    }

    pub fn keys(&self) -> Vec<Key> {
        self.tree()
            .map(|node| node.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tree().map_or(0, OrderedTree::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------
    // Tracked writes
    // -------------------------------------------------------------------

    /// Store `value` at `key`.
    ///
    /// The owner hears about it first unless `key` already holds an equal
    /// value; the write itself happens either way.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        let unchanged = self
            .tree()
            .and_then(|node| node.get(&key))
            .map_or(false, |current| *current == value);
        if !unchanged {
            self.owner.mark_changed();
        }
        self.root.vivify(&self.path).set(key, value);
        self
    }

    /// Store `value` at a dotted path below this namespace.
    pub fn set_path(&mut self, dotted: &str, value: impl Into<Value>) -> &mut Self {
        let mut segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        if let Some(last) = segments.pop() {
            let mut view = segments
                .into_iter()
                .fold(self.by_ref(), |view, segment| view.at(segment));
            view.set(last, value);
        }
        self
    }

    /// Remove `key`. Only an actual removal is reported.
    pub fn delete(&mut self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        if !self.contains_key(&key) {
            return None;
        }
        self.owner.mark_changed();
        self.root.vivify(&self.path).delete(key)
    }

    /// Remove everything in this namespace. Always reported, even when
    /// there was nothing to remove.
    pub fn clear(&mut self) -> &mut Self {
        self.owner.mark_changed();
        if let Some(node) = self.node_mut() {
            node.clear();
        }
        self
    }

    /// Remove entries matching `predicate`; reported iff the keys changed.
    pub fn delete_if<F>(&mut self, predicate: F) -> &mut Self
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.with_keys_may_change(|node| {
            node.delete_if(predicate);
        })
    }

    /// Keep only entries matching `predicate`; reported iff the keys changed.
    pub fn retain<F>(&mut self, predicate: F) -> &mut Self
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.with_keys_may_change(|node| {
            node.retain(predicate);
        })
    }

    /// Alias of [`DirtyTrackingTree::delete_if`].
    pub fn reject_in_place<F>(&mut self, predicate: F) -> &mut Self
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.delete_if(predicate)
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

    /// This namespace as a plain YAML mapping (empty when unmaterialized).
    pub fn to_yaml(&self) -> YamlValue {
        YamlValue::Mapping(self.tree().map(OrderedTree::to_mapping).unwrap_or_default())
    }

    // -------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------

    fn node_mut(&mut self) -> Option<&mut OrderedTree> {
        let mut node = &mut *self.root;
        for key in &self.path {
            node = node.get_mut(key)?.as_tree_mut()?;
        }
        Some(node)
    }

    fn with_keys_may_change<F>(&mut self, mutate: F) -> &mut Self
    where
        F: FnOnce(&mut OrderedTree),
    {
        let starting_keys = self.keys();
        if let Some(node) = self.node_mut() {
            mutate(node);
        }
        if starting_keys != self.keys() {
            self.owner.mark_changed();
        }
        self
    }
}

impl std::fmt::Debug for DirtyTrackingTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirtyTrackingTree")
            .field("path", &self.path)
            .field("owner", &self.owner)
            .field("tree", &self.tree())
            .finish()
    }
}
