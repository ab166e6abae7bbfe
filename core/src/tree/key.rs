//! Canonical config keys.
//!
//! Keys arrive in two spellings: plain (`color`) and symbol (`:color`), the
//! latter being how the persisted format writes them. Both collapse onto one
//! canonical form so either spelling reaches the same entry.

use std::fmt;

use serde_yaml::Value as YamlValue;


/// A normalized config key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Normalize `name`, dropping one leading `:` symbol marker.
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.starts_with(':') {
            name.remove(0);
        }
        Key(name)
    }

    /// Build a key from a decoded YAML mapping key.
    ///
    /// Strings normalize as usual; other scalars use their textual form.
    pub fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::String(s) => Key::new(s.as_str()),
            YamlValue::Bool(b) => Key(b.to_string()),
            YamlValue::Number(n) => Key(n.to_string()),
            YamlValue::Null => Key(String::new()),
            other => {
                let text = serde_yaml::to_string(other).unwrap_or_default();
                Key::new(text.trim_end())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The symbol spelling, `:name`.
    pub fn to_symbol(&self) -> String {
        format!(":{}", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::new(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::new(name.as_str())
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.0 == Key::new(other).0
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
