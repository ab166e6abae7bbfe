//! Untracked config storage: normalized keys, values, and the ordered
//! nested map that holds them.

pub mod key;
pub mod ordered;
pub mod value;

pub use key::Key;
pub use ordered::OrderedTree;
pub use value::Value;
