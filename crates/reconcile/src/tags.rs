//! Tag normalization
//!
//! The backend stamps its own tags on objects (deploy timestamps, cloud
//! provider metadata, geo hints). Those must never surface as declared drift,
//! nor be sent back as if the operator had authored them.

use crate::error::{Error, Result};
use crate::value::canonical_string;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Marker stamped on every object this engine creates or updates
pub const MANAGED_TAG: &str = "cpln/managedByCplnform";

/// Tag key prefixes owned by the server
pub const RESERVED_TAG_PREFIXES: &[&str] = &[
    "cpln/deployTimestamp",
    "cpln/aws",
    "cpln/azure",
    "cpln/docker",
    "cpln/gcp",
    "cpln/tls",
    "cpln/managedByTerraform",
    MANAGED_TAG,
    "cpln/city",
    "cpln/continent",
    "cpln/country",
    "cpln/state",
];

/// Maximum number of user tags per object
pub const MAX_TAGS: usize = 50;

/// User tags as they appear in declared configuration
pub type Tags = BTreeMap<String, String>;

/// Tag patch: `None` removes the key
pub type TagPatch = BTreeMap<String, Option<String>>;

pub fn is_reserved(key: &str) -> bool {
    RESERVED_TAG_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Drop reserved keys and nulls, stringifying scalar values
///
/// Used when reading backend objects; never fails.
pub fn filter(raw: &Map<String, Value>) -> Tags {
    raw.iter()
        .filter(|(key, _)| !is_reserved(key))
        .filter_map(|(key, value)| canonical_string(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Filter and enforce the tag cap
pub fn normalize(raw: &Map<String, Value>) -> Result<Tags> {
    let tags = filter(raw);
    check_count("tags", &tags)?;
    Ok(tags)
}

/// Reject declared tags that the server owns or that exceed the cap
pub fn validate(field: &str, tags: &Tags) -> Result<()> {
    if let Some(key) = tags.keys().find(|k| is_reserved(k)) {
        return Err(Error::validation(
            format!("{field}.{key}"),
            tags[key].clone(),
            "tag key uses a reserved prefix",
        ));
    }
    check_count(field, tags)
}

fn check_count(field: &str, tags: &Tags) -> Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(Error::validation(
            field,
            format!("{} tags", tags.len()),
            format!("at most {MAX_TAGS} tags are allowed"),
        ));
    }
    Ok(())
}

/// Merge two tag maps into a patch: new values win, removed keys are nulled
pub fn diff(old: &Tags, new: &Tags) -> TagPatch {
    let mut merged: TagPatch = old.keys().map(|k| (k.clone(), None)).collect();
    for (key, value) in new {
        merged.insert(key.clone(), Some(value.clone()));
    }
    merged
}

/// JSON form of a tag map
pub fn to_json(tags: &Tags) -> Map<String, Value> {
    tags.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// JSON form of a tag patch, with removals as `null`
pub fn patch_to_json(patch: &TagPatch) -> Map<String, Value> {
    patch
        .iter()
        .map(|(k, v)| (k.clone(), v.clone().map_or(Value::Null, Value::String)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_drops_reserved_and_stringifies() {
        let raw = json!({"cpln/deployTimestamp": "x", "env": "prod", "n": 3});
        let normalized = normalize(raw.as_object().unwrap()).unwrap();
        assert_eq!(normalized, tags(&[("env", "prod"), ("n", "3")]));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = json!({
            "cpln/aws/region": "us-east-1",
            "cpln/city": "Paris",
            "flag": true,
            "ratio": 0.5,
            "gone": null,
        });
        let once = normalize(raw.as_object().unwrap()).unwrap();
        let twice = normalize(&to_json(&once)).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, tags(&[("flag", "true"), ("ratio", "0.5")]));
    }

    #[test]
    fn test_no_reserved_key_survives() {
        let mut raw = Map::new();
        for prefix in RESERVED_TAG_PREFIXES {
            raw.insert(format!("{prefix}/suffix"), json!("v"));
            raw.insert((*prefix).to_string(), json!("v"));
        }
        assert!(filter(&raw).is_empty());
    }

    #[test]
    fn test_normalize_enforces_cap() {
        let raw: Map<String, Value> = (0..=MAX_TAGS)
            .map(|i| (format!("k{i}"), json!("v")))
            .collect();
        assert!(normalize(&raw).is_err());

        let capped: Map<String, Value> = (0..MAX_TAGS)
            .map(|i| (format!("k{i}"), json!("v")))
            .collect();
        assert_eq!(normalize(&capped).unwrap().len(), MAX_TAGS);
    }

    #[test]
    fn test_managed_marker_is_reserved() {
        let raw = to_json(&tags(&[(MANAGED_TAG, "true"), ("team", "core")]));
        assert_eq!(filter(&raw), tags(&[("team", "core")]));
        assert!(validate("tags", &tags(&[(MANAGED_TAG, "true")])).is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_keys() {
        let err = validate("tags", &tags(&[("cpln/tls", "x")])).unwrap_err();
        assert!(err.to_string().contains("tags.cpln/tls"));
        assert!(validate("tags", &tags(&[("team", "core")])).is_ok());
    }

    #[test]
    fn test_diff_nulls_removed_keys() {
        let old = tags(&[("a", "1"), ("b", "2")]);
        let new = tags(&[("b", "3"), ("c", "4")]);
        let merged = diff(&old, &new);

        assert_eq!(merged.get("a"), Some(&None));
        assert_eq!(merged.get("b"), Some(&Some("3".to_string())));
        assert_eq!(merged.get("c"), Some(&Some("4".to_string())));
        assert_eq!(
            Value::Object(patch_to_json(&merged)),
            json!({"a": null, "b": "3", "c": "4"})
        );
    }
}
