//! Field data supplied by the extraction service or typed in by the user.
//!
//! A [`FieldMap`] keeps insertion order: elements are created in the order
//! the fields arrive, which also decides their default stacking.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Ordered mapping of field name to field value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo data used when nothing has been extracted yet.
    pub fn sample() -> Self {
        [
            ("Name", "John Doe"),
            ("ID", "A12345678"),
            ("Date", "2023-01-01"),
        ]
        .into_iter()
        .collect()
    }

    /// Insert a field. Re-inserting a name replaces its value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Extraction services are loose about types; numbers and booleans are
/// stringified and `null` becomes an empty value.
fn value_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(object
            .into_iter()
            .map(|(k, v)| (k, value_to_text(v)))
            .collect())
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Response body of the field-extraction service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub confidence: HashMap<String, f32>,
    #[serde(default)]
    pub raw_text: Option<String>,
}
