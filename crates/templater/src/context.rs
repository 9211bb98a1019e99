/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value and context types.
//!
//! This module defines the values a template can reference, the top-level
//! data mapping passed to a render call, and the two string tables consulted
//! by standalone constructs: localization strings and submitted form values.
//!
//! All mappings preserve insertion order, so `{%foreach}` over a map visits
//! entries in the order they were inserted (or appeared in the JSON/YAML
//! source).

use indexmap::IndexMap;
use serde::Deserialize;

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    /// A null/missing value.
    #[default]
    Null,

    /// A boolean value.
    Bool(bool),

    /// An integer value.
    Int(i64),

    /// A floating point value.
    Float(f64),

    /// A string value.
    String(String),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values, in insertion order.
    Map(IndexMap<String, TemplateValue>),
}

impl TemplateValue {
    /// Build a map value from key/value pairs.
    pub fn map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<TemplateValue>,
    {
        TemplateValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<V: Into<TemplateValue>>(items: impl IntoIterator<Item = V>) -> Self {
        TemplateValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Lists and maps are containers; everything else is a scalar.
    pub fn is_container(&self) -> bool {
        matches!(self, TemplateValue::List(_) | TemplateValue::Map(_))
    }

    /// Emptiness as tested by the `isempty|` operation.
    ///
    /// Null, `false`, `0`, `0.0`, `""`, `"0"` and empty containers are empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            TemplateValue::Null => true,
            TemplateValue::Bool(b) => !b,
            TemplateValue::Int(i) => *i == 0,
            TemplateValue::Float(f) => *f == 0.0,
            TemplateValue::String(s) => s.is_empty() || s == "0",
            TemplateValue::List(items) => items.is_empty(),
            TemplateValue::Map(m) => m.is_empty(),
        }
    }

    /// Index a container by key. Lists accept decimal indices.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        match self {
            TemplateValue::Map(m) => m.get(key),
            TemplateValue::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateValue::Null => "null",
            TemplateValue::Bool(_) => "boolean",
            TemplateValue::Int(_) => "integer",
            TemplateValue::Float(_) => "float",
            TemplateValue::String(_) => "string",
            TemplateValue::List(_) => "list",
            TemplateValue::Map(_) => "map",
        }
    }

    /// Render this value as a string for output.
    ///
    /// - String: returned as-is
    /// - Int/Float: shortest decimal form (`1.0` renders as `1`)
    /// - Bool: "1" or "" (empty for false)
    /// - Null: ""
    /// - List/Map: "" (containers are rejected before rendering)
    pub fn render(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Int(i) => i.to_string(),
            TemplateValue::Float(f) => f.to_string(),
            TemplateValue::Bool(true) => "1".to_string(),
            TemplateValue::Bool(false) | TemplateValue::Null => String::new(),
            TemplateValue::List(_) | TemplateValue::Map(_) => String::new(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<i64> for TemplateValue {
    fn from(i: i64) -> Self {
        TemplateValue::Int(i)
    }
}

impl From<f64> for TemplateValue {
    fn from(f: f64) -> Self {
        TemplateValue::Float(f)
    }
}

impl From<Vec<TemplateValue>> for TemplateValue {
    fn from(items: Vec<TemplateValue>) -> Self {
        TemplateValue::List(items)
    }
}

/// The top-level data mapping for one render call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TemplateContext {
    variables: IndexMap<String, TemplateValue>,
}

impl TemplateContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TemplateValue>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Get a top-level variable.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.variables.get(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for TemplateContext
where
    K: Into<String>,
    V: Into<TemplateValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            variables: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Localization strings consulted by `{%!key}` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LocaleStrings {
    strings: IndexMap<String, String>,
}

impl LocaleStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocaleStrings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            strings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Values submitted with the current request's form, keyed by field name.
///
/// `{%input}` tags prefer a submitted value over their declared default so a
/// re-displayed form keeps what the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    fields: IndexMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
