//! Change-tracking collaborator and the owner handle threaded through views.

use indexmap::IndexSet;


/// The host record's dirty-attribute bookkeeping.
///
/// Implemented by whatever persistence layer owns the record. The config
/// store only ever talks to it about its own attribute.
pub trait ChangeTracker {
    /// Register that `attribute` differs from its persisted value.
    fn mark_changed(&mut self, attribute: &str);

    /// Whether `attribute` is currently marked as changed.
    fn is_changed(&self, attribute: &str) -> bool;

    /// Forget any change recorded for `attribute`.
    fn clear_change_flag(&mut self, attribute: &str);

    /// All attributes currently marked as changed, in marking order.
    fn changed(&self) -> Vec<String>;
}


/// Insertion-ordered set of changed attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedAttributes {
    names: IndexSet<String>,
}

impl ChangedAttributes {
    pub fn new() -> Self {
        ChangedAttributes {
            names: IndexSet::new(),
        }
    }

    pub fn any(&self) -> bool {
        !self.names.is_empty()
    }

    /// Drop every recorded change (after a successful save).
    pub fn reset(&mut self) {
        self.names.clear();
    }
}

impl ChangeTracker for ChangedAttributes {
    fn mark_changed(&mut self, attribute: &str) {
        self.names.insert(attribute.to_string());
    }

    fn is_changed(&self, attribute: &str) -> bool {
        self.names.contains(attribute)
    }

    fn clear_change_flag(&mut self, attribute: &str) {
        self.names.shift_remove(attribute);
    }

    fn changed(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}


/// The notification target shared by a view and everything derived from it.
///
/// Not an ownership edge: it borrows the record's tracker for the duration
/// of one access and names the attribute to report against.
pub struct Owner<'a> {
    tracker: &'a mut dyn ChangeTracker,
    attribute: &'a str,
}

impl<'a> Owner<'a> {
    pub fn new(tracker: &'a mut dyn ChangeTracker, attribute: &'a str) -> Self {
        Owner { tracker, attribute }
    }

    pub fn attribute(&self) -> &str {
        self.attribute
    }

    pub fn is_changed(&self) -> bool {
        self.tracker.is_changed(self.attribute)
    }

    /// Report a change to the tracked attribute.
    pub fn mark_changed(&mut self) {
        tracing::trace!(attribute = self.attribute, "config changed");
        self.tracker.mark_changed(self.attribute);
    }

    /// The same owner, for a shorter-lived view.
    pub fn reborrow(&mut self) -> Owner<'_> {
        Owner {
            tracker: &mut *self.tracker,
            attribute: self.attribute,
        }
    }
}

impl std::fmt::Debug for Owner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("attribute", &self.attribute)
            .field("changed", &self.is_changed())
            .finish()
    }
}
