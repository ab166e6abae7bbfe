//! Per-record access to the config tree.
//!
//! A [`ConfigAccessor`] sits next to a record's other attributes. It keeps
//! the last persisted column text, decodes it on first access and hands out
//! [`DirtyTrackingTree`] views bound to whatever tracker the caller passes
//! in, so every access re-stamps the owner.

use indexmap::IndexMap;

use crate::codec::{Codec, Decoded};
use crate::error::{Result, StoreError};
use crate::tracking::{ChangeTracker, DirtyTrackingTree, Owner};


/// Before and after images of a changed config column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// Text last persisted, if any.
    pub old: Option<String>,
    /// Encoding of the current tree.
    pub new: String,
}


#[derive(Debug)]
pub struct ConfigAccessor {
    codec: Codec,
    persisted: Option<String>,
    /// `None` until the first access.
    decoded: Option<Decoded>,
}

impl ConfigAccessor {
    pub fn new(codec: Codec, stored: Option<String>) -> Self {
        ConfigAccessor {
            codec,
            persisted: stored,
            decoded: None,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn attribute(&self) -> &str {
        self.codec.attribute()
    }

    pub fn persisted(&self) -> Option<&str> {
        self.persisted.as_deref()
    }

    /// Whether the stored text has been decoded yet.
    pub fn is_loaded(&self) -> bool {
        self.decoded.is_some()
    }

    /// The root view, owned by `tracker` for the duration of the borrow.
    pub fn config<'a>(
        &'a mut self,
        tracker: &'a mut dyn ChangeTracker,
    ) -> Result<DirtyTrackingTree<'a>> {
        if self.decoded.is_none() {
            let decoded = self.codec.load(self.persisted.as_deref(), &mut *tracker)?;
            tracing::debug!(attribute = self.codec.attribute(), "materialized config");
            self.decoded = Some(decoded);
        }
        let attribute = self.codec.attribute();
        match &mut self.decoded {
            Some(Decoded::Tree(tree)) => {
                Ok(DirtyTrackingTree::new(tree, Owner::new(tracker, attribute)))
            }
            _ => Err(StoreError::ForeignContent {
                attribute: attribute.to_string(),
            }),
        }
    }

    pub fn config_changed(&self, tracker: &dyn ChangeTracker) -> bool {
        tracker.is_changed(self.attribute())
    }

    /// `None` unless the attribute is marked as changed.
    pub fn config_change(&self, tracker: &dyn ChangeTracker) -> Result<Option<ConfigChange>> {
        if !self.config_changed(tracker) {
            return Ok(None);
        }
        Ok(Some(ConfigChange {
            old: self.persisted.clone(),
            new: self.dump()?,
        }))
    }

    /// Column text for the current state.
    ///
    /// Foreign content is written back untouched. An accessor that was
    /// never read returns what it was given.
    pub fn dump(&self) -> Result<String> {
        match &self.decoded {
            Some(Decoded::Tree(tree)) => self.codec.dump(Some(tree)),
            Some(Decoded::Foreign(text)) => Ok(text.clone()),
            None => match &self.persisted {
                Some(text) if !text.trim().is_empty() => Ok(text.clone()),
                _ => self.codec.dump(None),
            },
        }
    }

    /// Record `text` as the column's persisted value after a write.
    pub fn mark_persisted(&mut self, text: String) {
        self.persisted = Some(text);
    }

    /// Discard the in-memory tree; the next access decodes `stored`.
    pub fn reload(&mut self, stored: Option<String>) {
        self.persisted = stored;
        self.decoded = None;
    }

    /// `attributes` without the config column.
    pub fn public_attributes<V>(&self, mut attributes: IndexMap<String, V>) -> IndexMap<String, V> {
        attributes.shift_remove(self.attribute());
        attributes
    }
}


/// Records that carry a config column.
///
/// Implementors expose their accessor and change tracker; the config
/// methods come for free.
pub trait Configurable {
    fn config_parts(&mut self) -> (&mut ConfigAccessor, &mut dyn ChangeTracker);

    fn config_state(&self) -> (&ConfigAccessor, &dyn ChangeTracker);

    fn config(&mut self) -> Result<DirtyTrackingTree<'_>> {
        let (accessor, tracker) = self.config_parts();
        accessor.config(tracker)
    }

    fn config_changed(&self) -> bool {
        let (accessor, tracker) = self.config_state();
        accessor.config_changed(tracker)
    }

    fn config_change(&self) -> Result<Option<ConfigChange>> {
        let (accessor, tracker) = self.config_state();
        accessor.config_change(tracker)
    }
}
