//! Store Configurable: nested, dirty-tracked configuration trees for
//! persisted records.
//!
//! A record carries one config column. Reading it yields a tree of ordered
//! namespaces that auto-vivify on write, report every semantic change to
//! the record's change tracker, and persist as an ordered `--- !omap` YAML
//! document.

pub mod accessor;
pub mod codec;
pub mod error;
pub mod mock;
pub mod settings;
pub mod tracking;
pub mod tree;

pub use accessor::{ConfigAccessor, ConfigChange, Configurable};
pub use codec::{Codec, Decoded, Stored};
pub use error::{Result, StoreError};
pub use settings::{KeyStyle, StoreSettings};
pub use tracking::{ChangeTracker, ChangedAttributes, DirtyTrackingTree, Owner};
pub use tree::{Key, OrderedTree, Value};
