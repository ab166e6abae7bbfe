//! Change tracking: the owner contract and dirty-tracking tree views.
//!
//! Every tracked write goes through a [`DirtyTrackingTree`], which reports
//! semantic changes to one [`Owner`]: the host record's [`ChangeTracker`]
//! plus the name of the attribute the config is stored in.

pub mod owner;
pub mod tree;

pub use owner::{ChangeTracker, ChangedAttributes, Owner};
pub use tree::DirtyTrackingTree;
