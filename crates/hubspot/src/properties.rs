//! CRM property sets
//!
//! Every CRM object carries a flat map of named properties. Values are either
//! text or numbers on the way in; HubSpot hands everything back as text.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Local ticket field names and the HubSpot property names they are stored under.
pub const TICKET_PROPERTY_RENAMES: [(&str, &str); 3] = [
    ("description", "content"),
    ("category", "hs_ticket_category"),
    ("pipeline", "hs_pipeline"),
];

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
}

impl PropertyValue {
    /// Textual form, as HubSpot stores and compares it
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            PropertyValue::Text(s) => Cow::Borrowed(s.as_str()),
            PropertyValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

/// Ordered property map for a CRM object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a map from HubSpot's response shape, where unset properties come back as `null`.
    pub fn from_remote(raw: BTreeMap<String, Option<String>>) -> Self {
        raw.into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, PropertyValue::Text(v))))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Textual value of a property, if set
    pub fn get_text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.0.get(key).map(PropertyValue::as_text)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other` into `self`; keys already present in `self` win.
    pub fn merge_missing(&mut self, other: PropertyMap) {
        for (key, value) in other.0 {
            self.0.entry(key).or_insert(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn renamed<'a>(mut self, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Self {
        for (from, to) in pairs {
            if let Some(value) = self.0.remove(from) {
                self.0.insert(to.to_string(), value);
            }
        }
        self
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Rename local ticket fields to their HubSpot property names.
pub fn ticket_properties_to_remote(properties: PropertyMap) -> PropertyMap {
    properties.renamed(TICKET_PROPERTY_RENAMES.iter().copied())
}

/// Rename HubSpot ticket properties back to their local field names.
pub fn ticket_properties_from_remote(properties: PropertyMap) -> PropertyMap {
    properties.renamed(
        TICKET_PROPERTY_RENAMES
            .iter()
            .map(|(local, remote)| (*remote, *local)),
    )
}
