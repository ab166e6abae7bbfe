//! In-memory host records for testing.
//!
//! `MockTable` stands in for a database table and counts every row write;
//! `MockRecord` is a row loaded from it, carrying a config column next to
//! ordinary attributes. Together they exercise the full record lifecycle
//! (find, configure, save, reload) without a real persistence layer.

use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;

use crate::accessor::{ConfigAccessor, Configurable};
use crate::codec::Codec;
use crate::error::Result;
use crate::settings::StoreSettings;
use crate::tracking::{ChangeTracker, ChangedAttributes};


/// A stored row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockRow {
    pub name: String,
    pub email: String,
    /// Raw config column text.
    pub config: Option<String>,
}


/// A table of rows keyed by id.
#[derive(Debug, Default)]
pub struct MockTable {
    codec: Codec,
    rows: IndexMap<u64, MockRow>,
    /// Number of row writes performed so far.
    pub writes: usize,
}

impl MockTable {
    pub fn new() -> Self {
        Self::with_settings(StoreSettings::default())
    }

    pub fn with_settings(settings: StoreSettings) -> Self {
        MockTable {
            codec: Codec::new(settings),
            rows: IndexMap::new(),
            writes: 0,
        }
    }

    /// Insert a row directly, bypassing records. Not counted as a write.
    pub fn insert(&mut self, id: u64, row: MockRow) {
        self.rows.insert(id, row);
    }

    pub fn row(&self, id: u64) -> Option<&MockRow> {
        self.rows.get(&id)
    }

    /// Load the record stored under `id`.
    pub fn find(&self, id: u64) -> Option<MockRecord> {
        let row = self.rows.get(&id)?;
        Some(MockRecord {
            id,
            name: row.name.clone(),
            email: row.email.clone(),
            accessor: ConfigAccessor::new(self.codec.clone(), row.config.clone()),
            changes: ChangedAttributes::new(),
        })
    }

    /// A new, unsaved record.
    pub fn build(&self, id: u64, name: &str, email: &str) -> MockRecord {
        let mut record = MockRecord {
            id,
            name: name.to_string(),
            email: email.to_string(),
            accessor: ConfigAccessor::new(self.codec.clone(), None),
            changes: ChangedAttributes::new(),
        };
        record.changes.mark_changed("name");
        record.changes.mark_changed("email");
        record
    }
}


#[derive(Debug)]
pub struct MockRecord {
    pub id: u64,
    name: String,
    email: String,
    accessor: ConfigAccessor,
    changes: ChangedAttributes,
}

impl MockRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        if self.name != name {
            self.changes.mark_changed("name");
            self.name = name.to_string();
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: &str) {
        if self.email != email {
            self.changes.mark_changed("email");
            self.email = email.to_string();
        }
    }

    /// Whether any attribute, config included, is unsaved.
    pub fn is_changed(&self) -> bool {
        self.changes.any()
    }

    pub fn changed(&self) -> Vec<String> {
        self.changes.changed()
    }

    /// Write the row if anything changed. Returns whether a write happened.
    pub fn save(&mut self, table: &mut MockTable) -> Result<bool> {
        if !self.changes.any() {
            tracing::debug!(id = self.id, "record unchanged, skipping write");
            return Ok(false);
        }
        let mut row = table.rows.get(&self.id).cloned().unwrap_or_default();
        row.name = self.name.clone();
        row.email = self.email.clone();
        if self.accessor.config_changed(&self.changes) {
            let text = self.accessor.dump()?;
            row.config = Some(text.clone());
            self.accessor.mark_persisted(text);
        }
        table.rows.insert(self.id, row);
        table.writes += 1;
        tracing::debug!(id = self.id, changed = ?self.changes.changed(), "record saved");
        self.changes.reset();
        Ok(true)
    }

    /// Re-read the row, dropping unsaved changes.
    pub fn reload(&mut self, table: &MockTable) {
        if let Some(row) = table.rows.get(&self.id) {
            self.name = row.name.clone();
            self.email = row.email.clone();
            self.accessor.reload(row.config.clone());
        }
        self.changes.reset();
    }

    /// Public attributes; the config column is never listed.
    pub fn attributes(&self) -> IndexMap<String, YamlValue> {
        let mut attributes = IndexMap::new();
        attributes.insert("id".to_string(), YamlValue::from(self.id));
        attributes.insert("name".to_string(), YamlValue::from(self.name.as_str()));
        attributes.insert("email".to_string(), YamlValue::from(self.email.as_str()));
        attributes.insert(
            self.accessor.attribute().to_string(),
            self.accessor.persisted().map_or(YamlValue::Null, YamlValue::from),
        );
        self.accessor.public_attributes(attributes)
    }
}

impl Configurable for MockRecord {
    fn config_parts(&mut self) -> (&mut ConfigAccessor, &mut dyn ChangeTracker) {
        let tracker: &mut dyn ChangeTracker = &mut self.changes;
        (&mut self.accessor, tracker)
    }

    fn config_state(&self) -> (&ConfigAccessor, &dyn ChangeTracker) {
        let tracker: &dyn ChangeTracker = &self.changes;
        (&self.accessor, tracker)
    }
}
