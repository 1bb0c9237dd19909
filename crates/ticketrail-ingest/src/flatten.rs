// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nested record flattening into dotted-path scalars.
//!
//! Object keys are joined with `.`, array elements use their index as the
//! path segment, and `null` is kept so that "present but empty" stays
//! distinguishable from "absent".

use std::collections::BTreeMap;

use serde_json::Value;

/// A scalar leaf of a flattened record.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl FlatValue {
    /// Returns the string slice for text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlatValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a CSV cell. `null` renders empty.
    pub fn to_cell(&self) -> String {
        match self {
            FlatValue::Null => String::new(),
            FlatValue::Bool(b) => b.to_string(),
            FlatValue::Number(n) => n.to_string(),
            FlatValue::Text(s) => s.clone(),
        }
    }

    /// Returns the cell rendering when it is non-empty.
    pub fn non_empty(&self) -> Option<String> {
        let cell = self.to_cell();
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// A record flattened to dotted paths, ordered by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    fields: BTreeMap<String, FlatValue>,
}

impl FlatRecord {
    /// Flattens a JSON value. A scalar root is stored under the empty path.
    pub fn flatten(value: &Value) -> Self {
        let mut fields = BTreeMap::new();
        flatten_into(value, String::new(), &mut fields);
        Self { fields }
    }

    /// Rebuilds a record from exported text cells. Empty cells become `null`.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fields = columns
            .into_iter()
            .map(|(k, v)| {
                let value = if v.is_empty() {
                    FlatValue::Null
                } else {
                    FlatValue::Text(v.to_string())
                };
                (k.to_string(), value)
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, path: &str) -> Option<&FlatValue> {
        self.fields.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    /// Non-empty text rendering of the value at `path`.
    pub fn text(&self, path: &str) -> Option<String> {
        self.get(path).and_then(FlatValue::non_empty)
    }

    /// First non-empty value among `paths`, in order.
    pub fn first_text(&self, paths: &[&str]) -> Option<String> {
        paths.iter().find_map(|p| self.text(p))
    }

    /// First value whose last path segment equals `name`. A leading `#` on
    /// the segment is ignored, so `metadata.#agentIdentity` matches
    /// `agentIdentity`.
    pub fn leaf(&self, name: &str) -> Option<&FlatValue> {
        self.fields
            .iter()
            .find(|(path, _)| leaf_name(path) == name)
            .map(|(_, value)| value)
    }

    /// Non-empty text rendering of the first matching leaf.
    pub fn leaf_text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .filter(|(path, _)| leaf_name(path) == name)
            .find_map(|(_, value)| value.non_empty())
    }

    pub fn has_leaf(&self, name: &str) -> bool {
        self.leaf(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All leaves rendered as CSV cells, keyed by path.
    pub fn columns(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_cell()))
            .collect()
    }
}

/// Last segment of a dotted path with any leading `#` removed.
pub fn leaf_name(path: &str) -> &str {
    let last = path.rsplit('.').next().unwrap_or(path);
    last.trim_start_matches('#')
}

fn flatten_into(value: &Value, prefix: String, out: &mut BTreeMap<String, FlatValue>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, join(&prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(child, join(&prefix, &idx.to_string()), out);
            }
        }
        Value::Null => {
            out.insert(prefix, FlatValue::Null);
        }
        Value::Bool(b) => {
            out.insert(prefix, FlatValue::Bool(*b));
        }
        Value::Number(n) => {
            out.insert(prefix, FlatValue::Number(n.clone()));
        }
        Value::String(s) => {
            out.insert(prefix, FlatValue::Text(s.clone()));
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
