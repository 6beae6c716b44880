//! Backend domain objects
//!
//! The API speaks JSON. Every object shares a base envelope; the rest of the
//! body is kind-specific and kept as a raw JSON map addressed by dotted paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by the base envelope
pub const BASE_KEYS: &[&str] = &[
    "id",
    "name",
    "kind",
    "version",
    "description",
    "tags",
    "created",
    "lastModified",
    "links",
];

/// A relation link on an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Fields shared by every kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw tags; values may be any scalar, or `null` in a patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
}

/// A backend object: base envelope plus kind-specific body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainObject {
    pub base: Base,
    pub body: Map<String, Value>,
}

impl DomainObject {
    /// Split a JSON object into envelope and body
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(serde::de::Error::custom("expected a JSON object"));
        };
        let mut envelope = Map::new();
        for key in BASE_KEYS {
            if let Some(v) = map.remove(*key) {
                envelope.insert((*key).to_string(), v);
            }
        }
        Ok(Self {
            base: serde_json::from_value(Value::Object(envelope))?,
            body: map,
        })
    }

    /// Build from a flat JSON map holding both envelope and body keys
    pub fn from_map(map: Map<String, Value>) -> serde_json::Result<Self> {
        Self::from_json(Value::Object(map))
    }

    /// Merge envelope and body back into one JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = match serde_json::to_value(&self.base) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        // A tag patch must keep its nulls
        if let Some(tags) = &self.base.tags {
            map.insert("tags".to_string(), Value::Object(tags.clone()));
        }
        for (k, v) in &self.body {
            map.insert(k.clone(), v.clone());
        }
        map
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name.as_deref()
    }

    pub fn self_link(&self) -> Option<&str> {
        self.base
            .links
            .as_deref()
            .and_then(crate::link::self_link_of)
    }
}

/// Read a dotted path from a JSON map
pub fn get_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = map.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Write a dotted path into a JSON map, creating intermediate objects
pub fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}
