//! Order-preserving configuration tree.
//!
//! A [`ConfigNode`] is one of absent / scalar / sequence / ordered map. Map
//! entries keep insertion order and may repeat a key; order drives emission
//! order and first-wins decisions downstream.

use std::fmt;

use crate::error::{ConfigError, Location};

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => b.fmt(f),
            Scalar::Int(i) => i.fmt(f),
            Scalar::Float(x) => x.fmt(f),
            Scalar::Str(s) => s.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigNode
// ---------------------------------------------------------------------------

/// A node of the configuration document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigNode {
    /// A key with no value (`needs-monitor:`), used as a flag.
    #[default]
    Absent,
    Scalar(Scalar),
    Sequence(Vec<ConfigNode>),
    Map(ConfigMap),
}

impl ConfigNode {
    /// Short shape name used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            ConfigNode::Absent => "nothing",
            ConfigNode::Scalar(Scalar::Bool(_)) => "a boolean",
            ConfigNode::Scalar(Scalar::Int(_)) => "an integer",
            ConfigNode::Scalar(Scalar::Float(_)) => "a number",
            ConfigNode::Scalar(Scalar::Str(_)) => "a string",
            ConfigNode::Sequence(_) => "a list",
            ConfigNode::Map(_) => "a map",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ConfigNode::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Any scalar rendered as text (`0.15`, `42`, `true`, `foo`).
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConfigNode::Scalar(s) => Some(s.to_string()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigNode::Scalar(Scalar::Int(i)) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigNode::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// A flag is set when the key is present without a value or is `true`.
    pub fn is_flag_set(&self) -> bool {
        match self {
            ConfigNode::Absent => true,
            ConfigNode::Scalar(Scalar::Bool(b)) => *b,
            _ => false,
        }
    }

    // -- typed accessors that fail with a located ConfigError --------------

    pub fn expect_bool(&self, location: &Location) -> Result<bool, ConfigError> {
        self.as_bool().ok_or_else(|| self.type_error("a boolean", location))
    }

    /// Like [`is_flag_set`](Self::is_flag_set), but a value other than a
    /// boolean is an error.
    pub fn expect_flag(&self, location: &Location) -> Result<bool, ConfigError> {
        match self {
            ConfigNode::Absent => Ok(true),
            _ => self.expect_bool(location),
        }
    }

    pub fn expect_text(&self, location: &Location) -> Result<String, ConfigError> {
        self.as_text().ok_or_else(|| self.type_error("a scalar", location))
    }

    pub fn expect_u64(&self, location: &Location) -> Result<u64, ConfigError> {
        self.as_u64()
            .ok_or_else(|| self.type_error("a non-negative integer", location))
    }

    pub fn expect_map(&self, location: &Location) -> Result<&ConfigMap, ConfigError> {
        self.as_map().ok_or_else(|| self.type_error("a map", location))
    }

    pub fn expect_sequence(&self, location: &Location) -> Result<&[ConfigNode], ConfigError> {
        self.as_sequence().ok_or_else(|| self.type_error("a list", location))
    }

    /// A list of scalars, each rendered as text.
    pub fn expect_text_list(&self, location: &Location) -> Result<Vec<String>, ConfigError> {
        self.expect_sequence(location)?
            .iter()
            .enumerate()
            .map(|(i, item)| item.expect_text(&location.index(i)))
            .collect()
    }

    fn type_error(&self, expected: &'static str, location: &Location) -> ConfigError {
        ConfigError::UnexpectedType {
            location: location.clone(),
            expected,
            found: self.shape(),
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::Scalar(Scalar::Str(s.to_owned()))
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::Scalar(Scalar::Str(s))
    }
}

impl From<bool> for ConfigNode {
    fn from(b: bool) -> Self {
        ConfigNode::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ConfigNode {
    fn from(i: i64) -> Self {
        ConfigNode::Scalar(Scalar::Int(i))
    }
}

impl From<ConfigMap> for ConfigNode {
    fn from(m: ConfigMap) -> Self {
        ConfigNode::Map(m)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(items: Vec<ConfigNode>) -> Self {
        ConfigNode::Sequence(items)
    }
}

// ---------------------------------------------------------------------------
// ConfigMap
// ---------------------------------------------------------------------------

/// Ordered key → node entries. Duplicate keys are kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigMap {
    entries: Vec<(String, ConfigNode)>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for constructing documents in code.
    pub fn with(mut self, key: impl Into<String>, node: impl Into<ConfigNode>) -> Self {
        self.push(key, node);
        self
    }

    /// Builder-style insert of a key without a value.
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.push(key, ConfigNode::Absent);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, node: impl Into<ConfigNode>) {
        self.entries.push((key.into(), node.into()));
    }

    /// First entry for `key`.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Required lookup of `key`; a missing key is a configuration defect.
    pub fn require(&self, key: &str, location: &Location) -> Result<&ConfigNode, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            location: location.clone(),
            key: key.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigNode)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, ConfigNode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// serde_yaml conversion
// ---------------------------------------------------------------------------

impl ConfigNode {
    /// Convert a parsed YAML value. Keys must be scalars; tags are dropped.
    pub fn from_yaml(value: serde_yaml::Value, location: &Location) -> Result<Self, ConfigError> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => ConfigNode::Absent,
            Value::Bool(b) => ConfigNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => ConfigNode::Scalar(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or_default()),
            }),
            Value::String(s) => ConfigNode::Scalar(Scalar::Str(s)),
            Value::Sequence(items) => ConfigNode::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| ConfigNode::from_yaml(item, &location.index(i)))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(mapping) => {
                let mut map = ConfigMap::new();
                for (key, value) in mapping {
                    let key = match ConfigNode::from_yaml(key, location)? {
                        ConfigNode::Scalar(s) => s.to_string(),
                        other => {
                            return Err(ConfigError::UnexpectedType {
                                location: location.clone(),
                                expected: "a scalar key",
                                found: other.shape(),
                            })
                        }
                    };
                    let child = location.child(key.clone());
                    map.push(key, ConfigNode::from_yaml(value, &child)?);
                }
                ConfigNode::Map(map)
            }
            Value::Tagged(tagged) => ConfigNode::from_yaml(tagged.value, location)?,
        })
    }
}
