//! Typed view of a single configuration node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::source::path;

/// A property value as stored in the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Long(i64),
    String(String),
    Strings(Vec<String>),
}

impl PropertyValue {
    /// Single string value, if this is a string property.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Multi-valued view. A single string is returned as a one-element list.
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            PropertyValue::Strings(values) => values.clone(),
            PropertyValue::String(s) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Canonical text form, used for fingerprinting.
    pub fn canonical(&self) -> String {
        match self {
            PropertyValue::Bool(b) => format!("b:{}", b),
            PropertyValue::Long(l) => format!("l:{}", l),
            PropertyValue::String(s) => format!("s:{}", s),
            PropertyValue::Strings(values) => format!("m:{}", values.join("\u{1f}")),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        PropertyValue::Strings(values)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(values: Vec<&str>) -> Self {
        PropertyValue::Strings(values.into_iter().map(str::to_string).collect())
    }
}

/// A node read from the configuration source.
///
/// Child names are kept in stored order; child nodes are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    pub path: String,
    pub name: String,
    pub identifier: String,
    pub primary_type: String,
    pub properties: BTreeMap<String, PropertyValue>,
    pub children: Vec<String>,
}

impl SourceNode {
    pub fn new(path: &str, primary_type: &str, identifier: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            name: path::name(path).to_string(),
            identifier: identifier.into(),
            primary_type: primary_type.to_string(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValue::as_str)
    }

    /// Non-empty string property.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.string(name).filter(|s| !s.trim().is_empty())
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        self.property(name).map(PropertyValue::as_strings).unwrap_or_default()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.property(name).and_then(PropertyValue::as_bool)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_type(&self, primary_type: &str) -> bool {
        self.primary_type == primary_type
    }

    pub fn child_path(&self, name: &str) -> String {
        path::join(&self.path, name)
    }

    /// Zip `names`/`values` multi-valued properties into an ordered map.
    ///
    /// Extra names without a value are ignored.
    pub fn parameters(&self, names: &str, values: &str) -> BTreeMap<String, String> {
        self.strings(names)
            .into_iter()
            .zip(self.strings(values))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_zip() {
        let mut node = SourceNode::new("/a/b", "hst:component", "id-1");
        node.properties.insert("names".into(), vec!["x", "y", "z"].into());
        node.properties.insert("values".into(), vec!["1", "2"].into());

        let params = node.parameters("names", "values");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("x").map(String::as_str), Some("1"));
        assert_eq!(node.name, "b");
    }

    #[test]
    fn test_single_string_as_multi_value() {
        let value = PropertyValue::from("../common");
        assert_eq!(value.as_strings(), vec!["../common".to_string()]);
        assert_eq!(PropertyValue::from("true").as_bool(), Some(true));
    }
}
