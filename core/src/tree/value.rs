//! Values stored in a config tree.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value as YamlValue};

use super::key::Key;
use super::ordered::OrderedTree;
use crate::codec::is_map_tag;
use crate::error::{Result, StoreError};


/// A config entry: either a leaf value or a nested namespace.
///
/// Leaves are kept in serde_yaml's native representation so anything YAML
/// can express (scalars, sequences, mappings, tagged objects) is storable.
#[derive(Debug)]
pub enum Value {
    Leaf(YamlValue),
    Tree(OrderedTree),
}

impl Value {
    pub fn null() -> Self {
        Value::Leaf(YamlValue::Null)
    }

    /// Wrap an arbitrary serializable object under a YAML tag.
    ///
    /// The object is stored opaquely and compared by its serialized form.
    /// Tags the loader reads as maps (`omap`, `map`, `ruby/hash...`) would
    /// come back as a namespace, so they are refused, as is an empty tag.
    pub fn object<T: Serialize>(tag: &str, object: &T) -> Result<Self> {
        if tag.trim_start_matches('!').is_empty() || is_map_tag(&Tag::new(tag)) {
            return Err(StoreError::ReservedTag {
                tag: tag.to_string(),
            });
        }
        let value = serde_yaml::to_value(object)?;
        Ok(Value::Leaf(YamlValue::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        }))))
    }

    /// Read back an object stored with [`Value::object`].
    ///
    /// Untagged leaves are decoded directly.
    pub fn decode_object<T: DeserializeOwned>(&self) -> Result<T> {
        let yaml = match self {
            Value::Leaf(YamlValue::Tagged(tagged)) => tagged.value.clone(),
            Value::Leaf(other) => other.clone(),
            Value::Tree(tree) => YamlValue::Mapping(tree.to_mapping()),
        };
        Ok(serde_yaml::from_value(yaml)?)
    }

    pub fn as_leaf(&self) -> Option<&YamlValue> {
        match self {
            Value::Leaf(v) => Some(v),
            Value::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&OrderedTree> {
        match self {
            Value::Tree(t) => Some(t),
            Value::Leaf(_) => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut OrderedTree> {
        match self {
            Value::Tree(t) => Some(t),
            Value::Leaf(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_leaf().and_then(YamlValue::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_leaf().and_then(YamlValue::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_leaf().and_then(YamlValue::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_leaf().and_then(YamlValue::as_f64)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Leaf(YamlValue::Null))
    }

    /// The tag of an opaque object leaf, without the leading `!`.
    pub fn tag(&self) -> Option<String> {
        match self {
            Value::Leaf(YamlValue::Tagged(tagged)) => {
                Some(tagged.tag.to_string().trim_start_matches('!').to_string())
            }
            _ => None,
        }
    }

    /// Structural comparison against a raw YAML value.
    ///
    /// A nested tree matches a mapping holding the same keys (in either
    /// spelling) and matching values, regardless of order.
    pub fn matches_yaml(&self, other: &YamlValue) -> bool {
        match (self, other) {
            (Value::Leaf(mine), theirs) => mine == theirs,
            (Value::Tree(tree), YamlValue::Mapping(mapping)) => tree.matches_mapping(mapping),
            (Value::Tree(_), _) => false,
        }
    }

    /// Convert to a plain YAML value, nested trees becoming mappings.
    pub fn to_yaml(&self) -> YamlValue {
        match self {
            Value::Leaf(v) => v.clone(),
            Value::Tree(tree) => YamlValue::Mapping(tree.to_mapping()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Tree(a), Value::Tree(b)) => a == b,
            (value, Value::Leaf(leaf)) | (Value::Leaf(leaf), value) => value.matches_yaml(leaf),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<YamlValue> for Value {
    fn eq(&self, other: &YamlValue) -> bool {
        self.matches_yaml(other)
    }
}

macro_rules! leaf_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Leaf(YamlValue::from(value))
                }
            }
        )*
    };
}

leaf_from!(&str, String, bool, i32, i64, u32, u64, f64, Mapping);

impl From<YamlValue> for Value {
    fn from(value: YamlValue) -> Self {
        Value::Leaf(value)
    }
}

impl From<OrderedTree> for Value {
    fn from(tree: OrderedTree) -> Self {
        Value::Tree(tree)
    }
}

impl<T: Into<YamlValue>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Leaf(YamlValue::Sequence(items.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Value::null, Into::into)
    }
}

/// Build a mapping key for a normalized key, in plain spelling.
pub(crate) fn plain_key(key: &Key) -> YamlValue {
    YamlValue::String(key.as_str().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct StorableObject {
        value: String,
    }

    fn options() -> Mapping {
        let mut m = Mapping::new();
        m.insert(":sort".into(), "asc".into());
        m.insert(":on".into(), true.into());
        m
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(Value::from("black"), "black");
        assert_eq!(Value::from(true), true);
        assert_eq!(Value::from(7i64), 7i64);
        assert!(Value::from(None::<&str>).is_null());
    }

    #[test]
    fn leaf_equality_is_value_equality() {
        assert_eq!(Value::from("a"), Value::from("a".to_string()));
        assert_ne!(Value::from("a"), Value::from("b"));
        assert_ne!(Value::from(1i64), Value::from("1"));
    }

    #[test]
    fn tree_equals_matching_mapping() {
        let mut tree = OrderedTree::new();
        tree.set("on", true);
        tree.set("sort", "asc");
        assert_eq!(Value::Tree(tree), Value::from(options()));
    }

    #[test]
    fn tree_differs_from_other_mapping() {
        let mut tree = OrderedTree::new();
        tree.set("sort", "desc");
        tree.set("on", true);
        assert_ne!(Value::Tree(tree), Value::from(options()));

        let empty = OrderedTree::new();
        assert_ne!(Value::Tree(empty), Value::from("x"));
    }

    #[test]
    fn objects_round_trip_through_tags() {
        let obj = StorableObject { value: "test".into() };
        let value = Value::object("StorableObject", &obj).unwrap();
        assert_eq!(value.tag().as_deref(), Some("StorableObject"));
        let back: StorableObject = value.decode_object().unwrap();
        assert_eq!(back, obj);
    }

    #[test]
    fn map_shaped_tags_cannot_hold_objects() {
        let obj = StorableObject { value: "test".into() };
        for tag in ["omap", "!omap", "map", "tag:yaml.org,2002:omap", "ruby/hash:Foo", "", "!"] {
            match Value::object(tag, &obj) {
                Err(StoreError::ReservedTag { tag: rejected }) => assert_eq!(rejected, tag),
                other => panic!("expected ReservedTag for {:?}, got {:?}", tag, other),
            }
        }
        assert!(Value::object("ruby/object:Foo", &obj).is_ok());
    }

    #[test]
    fn objects_compare_by_content() {
        let a = Value::object("StorableObject", &StorableObject { value: "x".into() }).unwrap();
        let b = Value::object("StorableObject", &StorableObject { value: "x".into() }).unwrap();
        let c = Value::object("StorableObject", &StorableObject { value: "y".into() }).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sequences_are_leaves() {
        let value = Value::from(vec!["a", "b"]);
        assert!(value.as_leaf().unwrap().is_sequence());
    }
}
