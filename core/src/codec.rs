//! Ordered YAML encoding of config trees.
//!
//! Dumping writes a `--- !omap` document: every namespace becomes a
//! sequence of single-entry mappings so key order survives any YAML reader.
//!
//! Loading happens in two phases:
//!
//! 1. [`Codec::decode`] turns raw column text into a [`Stored`] value, with every
//!    map-shaped node (plain mappings, `!omap` sequences, legacy
//!    `!ruby/hash` mappings) normalized to an ordered `serde_yaml::Mapping`.
//! 2. [`Codec::attach`] turns the mapping plus the record's change tracker into an
//!    [`OrderedTree`], written through a [`DirtyTrackingTree`] bound to the
//!    owner, after which the change flag raised by the walk is cleared.

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Result, StoreError};
use crate::settings::{KeyStyle, StoreSettings};
use crate::tracking::{ChangeTracker, DirtyTrackingTree, Owner};
use crate::tree::{Key, OrderedTree, Value};


/// Tag written on every encoded namespace.
pub const OMAP_TAG: &str = "omap";

const YAML_CORE_PREFIX: &str = "tag:yaml.org,2002:";


/// Column content after phase one of a load.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    /// Nothing stored yet.
    Blank,
    /// Text that is not a YAML document, passed through untouched.
    Foreign(String),
    /// The decoded map, nested maps normalized, in stored order.
    Map(Mapping),
}

/// Result of a full load.
#[derive(Debug)]
pub enum Decoded {
    Tree(OrderedTree),
    Foreign(String),
}

impl Decoded {
    pub fn into_tree(self) -> Option<OrderedTree> {
        match self {
            Decoded::Tree(tree) => Some(tree),
            Decoded::Foreign(_) => None,
        }
    }
}


/// Encoder/decoder for one config attribute.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    settings: StoreSettings,
}

impl Codec {
    pub fn new(settings: StoreSettings) -> Self {
        Codec { settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// The attribute this codec reports changes against.
    pub fn attribute(&self) -> &str {
        &self.settings.attribute
    }

    // -------------------------------------------------------------------
    // Dump
    // -------------------------------------------------------------------

    /// Encode `tree`. `None` encodes exactly like an empty tree.
    pub fn dump(&self, tree: Option<&OrderedTree>) -> Result<String> {
        let empty = OrderedTree::new();
        let tree = tree.unwrap_or(&empty);
        let body = serde_yaml::to_string(&self.encode_tree(tree))?;
        let body = body.strip_prefix("---").map(str::trim_start).unwrap_or(&body);
        tracing::debug!(
            attribute = self.attribute(),
            keys = tree.len(),
            bytes = body.len(),
            "dumped config"
        );
        Ok(format!("--- {}", body))
    }

    fn encode_tree(&self, tree: &OrderedTree) -> YamlValue {
        let pairs = tree
            .iter()
            .map(|(key, value)| (self.encode_key(key), self.encode_value(value)));
        omap(pairs)
    }

    fn encode_value(&self, value: &Value) -> YamlValue {
        match value {
            Value::Tree(tree) => self.encode_tree(tree),
            Value::Leaf(leaf) => self.encode_leaf(leaf),
        }
    }

    /// Plain mapping leaves are written as namespaces; everything else is
    /// left to serde_yaml.
    fn encode_leaf(&self, leaf: &YamlValue) -> YamlValue {
        match leaf {
            YamlValue::Mapping(mapping) => omap(mapping.iter().map(|(k, v)| {
                (self.encode_key(&Key::from_yaml(k)), self.encode_leaf(v))
            })),
            other => other.clone(),
        }
    }

    /// A key that itself starts with `:` is always written in symbol
    /// spelling, or the load would strip its colon.
    fn encode_key(&self, key: &Key) -> YamlValue {
        match self.settings.key_style {
            KeyStyle::String if !key.as_str().starts_with(':') => {
                YamlValue::String(key.as_str().to_string())
            }
            _ => YamlValue::String(key.to_symbol()),
        }
    }

    // -------------------------------------------------------------------
    // Load
    // -------------------------------------------------------------------

    /// Decode and attach in one step.
    pub fn load(&self, raw: Option<&str>, tracker: &mut dyn ChangeTracker) -> Result<Decoded> {
        match self.decode(raw)? {
            Stored::Blank => Ok(Decoded::Tree(OrderedTree::new())),
            Stored::Foreign(text) => Ok(Decoded::Foreign(text)),
            Stored::Map(mapping) => {
                let tree = self.attach(mapping, tracker);
                tracing::debug!(attribute = self.attribute(), keys = tree.len(), "loaded config");
                Ok(Decoded::Tree(tree))
            }
        }
    }

    /// Phase one: raw column text to an ordered intermediate.
    pub fn decode(&self, raw: Option<&str>) -> Result<Stored> {
        let Some(raw) = raw.filter(|text| !text.trim().is_empty()) else {
            return Ok(Stored::Blank);
        };
        if !raw.lines().any(|line| line.starts_with("---")) {
            tracing::warn!(
                attribute = self.attribute(),
                "stored config is not a YAML document, passing it through"
            );
            return Ok(Stored::Foreign(raw.to_string()));
        }
        let parsed: YamlValue = serde_yaml::from_str(raw)?;
        if parsed.is_null() {
            return Ok(Stored::Blank);
        }
        match ordered_mapping(&parsed) {
            Some(mapping) => Ok(Stored::Map(mapping)),
            None => Err(StoreError::TypeMismatch {
                found: type_name(&parsed),
            }),
        }
    }

    /// Phase two: rebuild a tree bound to `tracker`.
    ///
    /// The rebuild writes through tracked `set` calls like any caller would;
    /// the change flag they raise is cleared afterwards unless the attribute
    /// was already marked before the load started.
    pub fn attach(&self, mapping: Mapping, tracker: &mut dyn ChangeTracker) -> OrderedTree {
        let attribute = self.attribute();
        let was_changed = tracker.is_changed(attribute);
        let mut tree = OrderedTree::new();
        fill(
            DirtyTrackingTree::new(&mut tree, Owner::new(&mut *tracker, attribute)),
            mapping,
        );
        if !was_changed {
            tracker.clear_change_flag(attribute);
        }
        tree
    }
}

fn fill(mut view: DirtyTrackingTree<'_>, mapping: Mapping) {
    for (key, value) in mapping {
        let key = Key::from_yaml(&key);
        match value {
            YamlValue::Mapping(nested) if nested.is_empty() => {
                view.set(key, OrderedTree::new());
            }
            YamlValue::Mapping(nested) => fill(view.by_ref().at(key), nested),
            leaf => {
                view.set(key, leaf);
            }
        }
    }
}

fn omap(pairs: impl Iterator<Item = (YamlValue, YamlValue)>) -> YamlValue {
    let entries = pairs
        .map(|(k, v)| {
            let mut entry = Mapping::with_capacity(1);
            entry.insert(k, v);
            YamlValue::Mapping(entry)
        })
        .collect();
    YamlValue::Tagged(Box::new(TaggedValue {
        tag: Tag::new(OMAP_TAG),
        value: YamlValue::Sequence(entries),
    }))
}

/// Tags whose content is treated as a map, across encoder versions.
pub(crate) fn is_map_tag(tag: &Tag) -> bool {
    let name = tag.to_string();
    let name = name.trim_start_matches('!');
    let name = name.strip_prefix(YAML_CORE_PREFIX).unwrap_or(name);
    name == OMAP_TAG || name == "map" || name.starts_with("ruby/hash")
}

/// The value as an ordered mapping with nested map-shaped values
/// normalized, or `None` if it is not map-shaped.
fn ordered_mapping(value: &YamlValue) -> Option<Mapping> {
    match value {
        YamlValue::Mapping(mapping) => Some(normalize(mapping.iter())),
        YamlValue::Tagged(tagged) if is_map_tag(&tagged.tag) => match &tagged.value {
            YamlValue::Mapping(mapping) => Some(normalize(mapping.iter())),
            YamlValue::Sequence(items) => {
                let pairs = items
                    .iter()
                    .map(|item| match item {
                        YamlValue::Mapping(entry) if entry.len() == 1 => entry.iter().next(),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(normalize(pairs.into_iter()))
            }
            _ => None,
        },
        _ => None,
    }
}

fn normalize<'v>(pairs: impl Iterator<Item = (&'v YamlValue, &'v YamlValue)>) -> Mapping {
    pairs
        .map(|(k, v)| {
            let v = ordered_mapping(v).map_or_else(|| v.clone(), YamlValue::Mapping);
            (k.clone(), v)
        })
        .collect()
}

fn type_name(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => "null".into(),
        YamlValue::Bool(_) => "boolean".into(),
        YamlValue::Number(n) if n.is_f64() => "float".into(),
        YamlValue::Number(_) => "integer".into(),
        YamlValue::String(_) => "string".into(),
        YamlValue::Sequence(_) => "sequence".into(),
        YamlValue::Mapping(_) => "mapping".into(),
        YamlValue::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::ChangedAttributes;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    const ATTR: &str = "_config";

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct StorableObject {
        value: String,
    }

    fn omap_yaml() -> &'static str {
        "--- !omap
- :remember_me: true
- :sortable_tables: !omap
  - :column: created_at
  - :direction: asc
- :you: !omap
  - :should: !omap
    - :never: !omap
      - :need: !omap
        - :to: !omap
          - :do: !omap
            - :this: deep_value
"
    }

    fn load_tree(codec: &Codec, raw: &str) -> OrderedTree {
        let mut changes = ChangedAttributes::new();
        let tree = codec
            .load(Some(raw), &mut changes)
            .unwrap()
            .into_tree()
            .unwrap();
        assert!(!changes.any(), "load must not leave the owner dirty");
        tree
    }

    fn path(segments: &[&str]) -> Vec<Key> {
        segments.iter().map(|s| Key::new(*s)).collect()
    }

    fn keys(tree: &OrderedTree) -> Vec<&str> {
        tree.keys().map(Key::as_str).collect()
    }

    #[test]
    fn dump_writes_omap_with_symbol_keys() {
        let mut tree = OrderedTree::new();
        tree.set("foo", "bar");
        let yaml = Codec::default().dump(Some(&tree)).unwrap();
        assert!(yaml.starts_with("--- !omap"), "{}", yaml);
        assert!(yaml.contains(":foo: bar"), "{}", yaml);
    }

    #[test]
    fn dump_none_matches_empty_tree() {
        let codec = Codec::default();
        let empty = OrderedTree::new();
        assert_eq!(codec.dump(None).unwrap(), codec.dump(Some(&empty)).unwrap());
        assert!(codec.dump(None).unwrap().starts_with("--- !omap"));
    }

    #[test]
    fn dump_string_key_style() {
        let codec = Codec::new(StoreSettings {
            key_style: KeyStyle::String,
            ..StoreSettings::default()
        });
        let mut tree = OrderedTree::new();
        tree.set(":color", "black");
        let yaml = codec.dump(Some(&tree)).unwrap();
        assert!(yaml.contains("- color: black"), "{}", yaml);
        assert!(!yaml.contains(":color"), "{}", yaml);
        assert_eq!(load_tree(&codec, &yaml).get("color").unwrap(), &"black");
    }

    #[test]
    fn string_key_style_keeps_leading_colons() {
        let codec = Codec::new(StoreSettings {
            key_style: KeyStyle::String,
            ..StoreSettings::default()
        });
        let mut tree = OrderedTree::new();
        tree.set("::odd", 1i64);
        tree.set("even", 2i64);
        let yaml = codec.dump(Some(&tree)).unwrap();
        assert!(yaml.contains("- ::odd: 1"), "{}", yaml);
        assert!(yaml.contains("- even: 2"), "{}", yaml);

        let loaded = load_tree(&codec, &yaml);
        assert_eq!(keys(&loaded), vec![":odd", "even"]);
        assert_eq!(loaded, tree);
    }

    #[test]
    fn blank_input_is_an_empty_tree() {
        let codec = Codec::default();
        let mut changes = ChangedAttributes::new();
        for raw in [None, Some(""), Some("   \n")] {
            let tree = codec.load(raw, &mut changes).unwrap().into_tree().unwrap();
            assert!(tree.is_empty());
        }
        assert!(!changes.any());
    }

    #[test]
    fn null_document_is_blank() {
        assert_eq!(Codec::default().decode(Some("---\n")).unwrap(), Stored::Blank);
    }

    #[test]
    fn foreign_text_passes_through() {
        let codec = Codec::default();
        let mut changes = ChangedAttributes::new();
        match codec.load(Some("color=black"), &mut changes).unwrap() {
            Decoded::Foreign(text) => assert_eq!(text, "color=black"),
            other => panic!("expected Foreign, got {:?}", other),
        }
    }

    #[test]
    fn non_map_document_is_a_type_mismatch() {
        let codec = Codec::default();
        let mut changes = ChangedAttributes::new();
        match codec.load(Some("--- 42\n"), &mut changes) {
            Err(StoreError::TypeMismatch { found }) => assert_eq!(found, "integer"),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
        match codec.decode(Some("--- [a, b]\n")) {
            Err(StoreError::TypeMismatch { found }) => assert_eq!(found, "sequence"),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn legacy_omap_columns_load() {
        let tree = load_tree(&Codec::default(), omap_yaml());
        assert_eq!(keys(&tree), vec!["remember_me", "sortable_tables", "you"]);
        assert_eq!(tree.get("remember_me").unwrap(), &true);

        let tables = tree.child("sortable_tables").unwrap();
        assert_eq!(keys(tables), vec!["column", "direction"]);
        assert_eq!(tables.get("column").unwrap(), &"created_at");

        let deep = tree
            .lookup(&path(&["you", "should", "never", "need", "to", "do"]))
            .unwrap();
        assert_eq!(deep.get("this").unwrap(), &"deep_value");
    }

    #[test]
    fn plain_and_ruby_hash_mappings_load() {
        let plain = load_tree(&Codec::default(), "---\n:color: black\nsize: 3\n");
        assert_eq!(keys(&plain), vec!["color", "size"]);
        assert_eq!(plain.get("size").unwrap(), &3i64);

        let tagged = load_tree(
            &Codec::default(),
            "--- !ruby/hash:ActiveSupport::OrderedHash\n:color: black\n",
        );
        assert_eq!(tagged.get("color").unwrap(), &"black");
    }

    #[test]
    fn round_trip_preserves_order_and_values() {
        let codec = Codec::default();
        let mut tree = OrderedTree::new();
        tree.set("color", "black");
        tree.set(":remember_me", true);
        tree.set("ratio", 0.5f64);
        tree.set("tags", vec!["a", "b"]);
        tree.set("nothing", Value::null());
        let sort = tree.vivify(&path(&["sortable_tables", "posts", "sort"]));
        sort.set(":on", "title");
        sort.set("dir", "asc");
        tree.child_mut("sortable_tables").set("column", "updated_at");

        let yaml = codec.dump(Some(&tree)).unwrap();
        let loaded = load_tree(&codec, &yaml);
        assert_eq!(loaded, tree);
        assert_eq!(
            keys(&loaded),
            vec!["color", "remember_me", "ratio", "tags", "nothing", "sortable_tables"]
        );
        assert_eq!(keys(loaded.child("sortable_tables").unwrap()), vec!["posts", "column"]);
        assert_eq!(codec.dump(Some(&loaded)).unwrap(), yaml);
    }

    #[test]
    fn objects_round_trip() {
        let codec = Codec::default();
        let mut tree = OrderedTree::new();
        let obj = StorableObject { value: "test".into() };
        tree.vivify(&path(&["you", "should"]))
            .set("this", Value::object("StorableObject", &obj).unwrap());

        let loaded = load_tree(&codec, &codec.dump(Some(&tree)).unwrap());
        let stored = loaded.lookup(&path(&["you", "should"])).unwrap().get("this").unwrap();
        assert_eq!(stored.tag().as_deref(), Some("StorableObject"));
        assert_eq!(stored.decode_object::<StorableObject>().unwrap(), obj);
        assert_eq!(loaded, tree);
    }

    #[test]
    fn mapping_leaves_reload_as_equal_namespaces() {
        let codec = Codec::default();
        let mut options = Mapping::new();
        options.insert(":sort".into(), "asc".into());
        options.insert(":on".into(), true.into());
        let mut tree = OrderedTree::new();
        tree.child_mut("plugin").set("options", options.clone());

        let loaded = load_tree(&codec, &codec.dump(Some(&tree)).unwrap());
        let reloaded = loaded.child("plugin").unwrap().get("options").unwrap();
        assert!(reloaded.as_tree().is_some());
        assert_eq!(reloaded, &Value::from(options));
    }

    #[test]
    fn empty_namespaces_survive() {
        let codec = Codec::default();
        let mut tree = OrderedTree::new();
        tree.set("empty", OrderedTree::new());
        tree.set("after", 1i64);
        let loaded = load_tree(&codec, &codec.dump(Some(&tree)).unwrap());
        assert_eq!(keys(&loaded), vec!["empty", "after"]);
        assert!(loaded.child("empty").unwrap().is_empty());
    }

    #[test]
    fn load_keeps_an_existing_change_flag() {
        let codec = Codec::default();
        let mut changes = ChangedAttributes::new();
        changes.mark_changed(ATTR);
        codec.load(Some(omap_yaml()), &mut changes).unwrap();
        assert!(changes.is_changed(ATTR));
    }

    #[test]
    fn attach_alone_is_never_dirty() {
        let codec = Codec::default();
        let Stored::Map(mapping) = codec.decode(Some(omap_yaml())).unwrap() else {
            panic!("expected a map");
        };
        let mut changes = ChangedAttributes::new();
        changes.mark_changed("name");
        let tree = codec.attach(mapping, &mut changes);
        assert_eq!(tree.len(), 3);
        assert_eq!(changes.changed(), vec!["name"]);
    }

    #[test]
    fn end_to_end_sortable_tables() {
        let codec = Codec::default();
        let mut tree = OrderedTree::new();
        let mut changes = ChangedAttributes::new();
        {
            let mut config = DirtyTrackingTree::new(&mut tree, Owner::new(&mut changes, ATTR));
            config.by_ref().path("sortable_tables.posts.sort").set("on", "title");
            assert_eq!(config.get_path("sortable_tables.posts.sort.on").unwrap(), &"title");
        }
        assert!(changes.is_changed(ATTR));

        let yaml = codec.dump(Some(&tree)).unwrap();
        let mut fresh = ChangedAttributes::new();
        let mut loaded = codec.load(Some(&yaml), &mut fresh).unwrap().into_tree().unwrap();
        let config = DirtyTrackingTree::new(&mut loaded, Owner::new(&mut fresh, ATTR));
        assert_eq!(config.get_path("sortable_tables.posts.sort.on").unwrap(), &"title");
        assert!(!config.owner().is_changed());
    }

    // -------------------------------------------------------------------
    // Round-trip property
    // -------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Gen {
        Leaf(YamlValue),
        Tree(Vec<(String, Gen)>),
    }

    /// Doubled colons leave one on the normalized key.
    fn key_strategy() -> impl Strategy<Value = String> {
        "(::)?[a-z][a-z0-9_]{0,7}"
    }

    fn style_strategy() -> impl Strategy<Value = KeyStyle> {
        prop_oneof![Just(KeyStyle::Symbol), Just(KeyStyle::String)]
    }

    fn leaf_strategy() -> impl Strategy<Value = YamlValue> {
        prop_oneof![
            any::<bool>().prop_map(YamlValue::from),
            any::<i64>().prop_map(YamlValue::from),
            "[a-zA-Z0-9 _-]{0,12}".prop_map(YamlValue::from),
        ]
    }

    fn gen_strategy() -> impl Strategy<Value = Gen> {
        leaf_strategy().prop_map(Gen::Leaf).prop_recursive(4, 32, 4, |inner| {
            prop::collection::vec((key_strategy(), inner), 0..4).prop_map(Gen::Tree)
        })
    }

    fn build(entries: Vec<(String, Gen)>) -> OrderedTree {
        let mut tree = OrderedTree::new();
        for (key, gen) in entries {
            match gen {
                Gen::Leaf(leaf) => tree.set(key, leaf),
                Gen::Tree(nested) => tree.set(key, build(nested)),
            };
        }
        tree
    }

    proptest! {
        #[test]
        fn dump_then_load_reproduces_the_tree(
            key_style in style_strategy(),
            entries in prop::collection::vec((key_strategy(), gen_strategy()), 0..6)
        ) {
            let codec = Codec::new(StoreSettings {
                key_style,
                ..StoreSettings::default()
            });
            let tree = build(entries);
            let yaml = codec.dump(Some(&tree)).unwrap();

            let mut changes = ChangedAttributes::new();
            let loaded = codec.load(Some(&yaml), &mut changes).unwrap().into_tree().unwrap();

            prop_assert!(!changes.any());
            prop_assert_eq!(&loaded, &tree);
            prop_assert_eq!(codec.dump(Some(&loaded)).unwrap(), yaml);
        }
    }
}
