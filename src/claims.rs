// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Structured claim values.
//!
//! Certificate metadata, compliance blocks and extra token claims are plain
//! immutable trees of [`ClaimValue`], a closed variant set (string, number,
//! bool, list, map). The closed shape guarantees the structures are acyclic
//! and serialize cleanly; there is no null variant, absent values are simply
//! not present in the map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A map of claim names to values. `BTreeMap` keeps serialization order
/// deterministic.
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A single structured claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ClaimValue>),
    Map(ClaimMap),
}

impl ClaimValue {
    /// Returns the string content, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this value is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the nested map, if this value is a map.
    pub fn as_map(&self) -> Option<&ClaimMap> {
        match self {
            ClaimValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the nested list, if this value is a list.
    pub fn as_list(&self) -> Option<&[ClaimValue]> {
        match self {
            ClaimValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Convert a JSON value into a claim value. JSON nulls have no
    /// representation here: a top-level null yields `None`, and null entries
    /// inside objects or arrays are dropped.
    pub fn from_json(value: &serde_json::Value) -> Option<ClaimValue> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(ClaimValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ClaimValue::Integer(i))
                } else {
                    n.as_f64().map(ClaimValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(ClaimValue::String(s.clone())),
            serde_json::Value::Array(items) => Some(ClaimValue::List(
                items.iter().filter_map(ClaimValue::from_json).collect(),
            )),
            serde_json::Value::Object(fields) => Some(ClaimValue::Map(
                fields
                    .iter()
                    .filter_map(|(k, v)| ClaimValue::from_json(v).map(|cv| (k.clone(), cv)))
                    .collect(),
            )),
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ClaimValue::Bool(b) => serde_json::Value::Bool(*b),
            ClaimValue::Integer(n) => serde_json::Value::from(*n),
            ClaimValue::Float(f) => serde_json::Value::from(*f),
            ClaimValue::String(s) => serde_json::Value::String(s.clone()),
            ClaimValue::List(items) => {
                serde_json::Value::Array(items.iter().map(ClaimValue::to_json).collect())
            }
            ClaimValue::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::String(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        ClaimValue::String(s)
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        ClaimValue::Integer(n)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        ClaimValue::Bool(b)
    }
}

impl From<Vec<ClaimValue>> for ClaimValue {
    fn from(items: Vec<ClaimValue>) -> Self {
        ClaimValue::List(items)
    }
}

impl From<ClaimMap> for ClaimValue {
    fn from(map: ClaimMap) -> Self {
        ClaimValue::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_preserves_structure() {
        let mut inner = ClaimMap::new();
        inner.insert("subject".into(), "CN=example.com".into());
        inner.insert("compliant".into(), true.into());

        let mut map = ClaimMap::new();
        map.insert("certificate".into(), inner.into());
        map.insert("version".into(), ClaimValue::Integer(2));

        let json = serde_json::to_string(&ClaimValue::Map(map.clone())).unwrap();
        let back: ClaimValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClaimValue::Map(map));
    }

    #[test]
    fn from_json_drops_nulls() {
        let value = serde_json::json!({
            "keep": "yes",
            "drop": null,
            "nested": [1, null, 2],
        });
        let claim = ClaimValue::from_json(&value).unwrap();
        let map = claim.as_map().unwrap();
        assert!(map.contains_key("keep"));
        assert!(!map.contains_key("drop"));
        assert_eq!(
            map["nested"].as_list().unwrap(),
            &[ClaimValue::Integer(1), ClaimValue::Integer(2)]
        );
    }

    #[test]
    fn integers_stay_integers() {
        let claim = ClaimValue::from_json(&serde_json::json!(1706400000)).unwrap();
        assert_eq!(claim.as_i64(), Some(1706400000));
    }
}
