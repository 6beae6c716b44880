//! Declared configuration trees
//!
//! A [`ConfigTree`] is one instance's declared attributes, typed by its
//! [`KindSchema`]. Trees are parsed from JSON (the TOML config and the state
//! file both pass through `serde_json::Value`) and rendered back the same way.

use crate::error::{Error, Result};
use crate::schema::{FieldSpec, FieldType, KindSchema};
use crate::value::{Tristate, canonical_string};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A typed declared value
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Map(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    List(Vec<String>),
    Blocks(Vec<ConfigTree>),
}

impl Leaf {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_blocks(&self) -> Option<&[ConfigTree]> {
        match self {
            Self::Blocks(b) => Some(b),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Map(m) => m.is_empty(),
            Self::Set(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Blocks(b) => b.is_empty(),
            Self::Int(_) | Self::Float(_) | Self::Bool(_) => false,
        }
    }

    /// Short human rendering for error messages and plan output
    pub fn summary(&self) -> String {
        match self {
            Self::Str(s) => format!("{s:?}"),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Map(m) => format!("{{{} entries}}", m.len()),
            Self::Set(s) => format!("[{}]", s.iter().cloned().collect::<Vec<_>>().join(", ")),
            Self::List(l) => format!("[{}]", l.join(", ")),
            Self::Blocks(b) => format!("{} block(s)", b.len()),
        }
    }
}

/// A declared attribute
pub type Attr = Tristate<Leaf>;

impl Attr {
    /// Wrap a leaf, collapsing empty values to `Empty`
    ///
    /// Block lists carry no "explicitly empty" meaning and collapse to `Unset`.
    pub fn from_leaf(leaf: Leaf) -> Self {
        match leaf {
            Leaf::Blocks(ref b) if b.is_empty() => Self::Unset,
            ref l if l.is_empty() => Self::Empty,
            l => Self::Set(l),
        }
    }

    pub fn str(&self) -> Option<&str> {
        self.value().and_then(Leaf::as_str)
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Unset => "(unset)".to_string(),
            Self::Empty => "(empty)".to_string(),
            Self::Set(leaf) => leaf.summary(),
        }
    }
}

static UNSET: Attr = Tristate::Unset;

/// One instance's declared attributes; absent keys are `Unset`
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    attrs: BTreeMap<String, Attr>,
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> &Attr {
        self.attrs.get(key).unwrap_or(&UNSET)
    }

    /// Store an attribute; storing `Unset` removes the key
    pub fn set(&mut self, key: impl Into<String>, attr: Attr) {
        let key = key.into();
        if attr.is_set() {
            self.attrs.insert(key, attr);
        } else {
            self.attrs.remove(&key);
        }
    }

    /// Builder-style insert of a leaf (empty leaves become `Empty`)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, leaf: Leaf) -> Self {
        self.set(key, Attr::from_leaf(leaf));
        self
    }

    /// Builder-style insert of a string leaf
    #[must_use]
    pub fn with_str(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, Leaf::Str(value.into()))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).str()
    }

    /// Attributes that are set or explicitly empty
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
        self.attrs
            .iter()
            .filter(|(_, a)| a.is_set())
            .map(|(k, a)| (k.as_str(), a))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Parse a declared JSON object against a kind's schema
///
/// Checks shapes and rejects unknown keys; value rules are checked at build.
pub fn parse(schema: &KindSchema, object: &Map<String, Value>) -> Result<ConfigTree> {
    let mut tree = ConfigTree::new();
    for (key, value) in object {
        let ty = schema.shape_of(key).ok_or_else(|| {
            Error::validation(key.clone(), value.to_string(), "unknown attribute")
        })?;
        tree.set(key.clone(), parse_value(key, &ty, value)?);
    }
    Ok(tree)
}

fn parse_fields(path: &str, fields: &[FieldSpec], object: &Map<String, Value>) -> Result<ConfigTree> {
    let mut tree = ConfigTree::new();
    for (key, value) in object {
        let sub = format!("{path}.{key}");
        let spec = fields
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| Error::validation(sub.clone(), value.to_string(), "unknown attribute"))?;
        tree.set(key.clone(), parse_value(&sub, &spec.ty, value)?);
    }
    Ok(tree)
}

fn parse_value(path: &str, ty: &FieldType, value: &Value) -> Result<Attr> {
    if value.is_null() {
        return Ok(Attr::Unset);
    }
    let mismatch = |expected: &str| Error::validation(path, value.to_string(), format!("expected {expected}"));

    let leaf = match ty {
        FieldType::String | FieldType::Link(_) => {
            Leaf::Str(canonical_string(value).ok_or_else(|| mismatch("a string"))?)
        }
        FieldType::Int => Leaf::Int(value.as_i64().ok_or_else(|| mismatch("an integer"))?),
        FieldType::Float => Leaf::Float(value.as_f64().ok_or_else(|| mismatch("a number"))?),
        FieldType::Bool => Leaf::Bool(value.as_bool().ok_or_else(|| mismatch("a boolean"))?),
        FieldType::StringMap | FieldType::Tags => {
            let object = value.as_object().ok_or_else(|| mismatch("a table"))?;
            Leaf::Map(string_map(path, object)?)
        }
        FieldType::StringSet | FieldType::LinkSet(_) => {
            Leaf::Set(string_items(path, value)?.into_iter().collect())
        }
        FieldType::StringList => Leaf::List(string_items(path, value)?),
        FieldType::Block {
            fields,
            max_items,
            ordered,
        } => {
            let items: Vec<&Value> = match value {
                Value::Object(_) => vec![value],
                Value::Array(items) => items.iter().collect(),
                _ => return Err(mismatch("a table or an array of tables")),
            };
            if let Some(max) = max_items
                && items.len() > *max
            {
                return Err(Error::validation(
                    path,
                    format!("{} blocks", items.len()),
                    format!("at most {max} allowed"),
                ));
            }
            let mut blocks = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let object = item.as_object().ok_or_else(|| mismatch("a table"))?;
                blocks.push(parse_fields(&format!("{path}[{index}]"), fields, object)?);
            }
            if !ordered {
                sort_blocks(fields, &mut blocks);
            }
            Leaf::Blocks(blocks)
        }
    };

    let attr = Attr::from_leaf(leaf);
    // Tags carry no empty-versus-unset distinction remotely
    if matches!(ty, FieldType::Tags) && attr == Attr::Empty {
        return Ok(Attr::Unset);
    }
    Ok(attr)
}

fn string_map(path: &str, object: &Map<String, Value>) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let s = canonical_string(value).ok_or_else(|| {
            Error::validation(format!("{path}.{key}"), value.to_string(), "expected a scalar")
        })?;
        map.insert(key.clone(), s);
    }
    Ok(map)
}

fn string_items(path: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::validation(path, value.to_string(), "expected an array"))?;
    items
        .iter()
        .map(|item| {
            canonical_string(item)
                .ok_or_else(|| Error::validation(path, item.to_string(), "expected a scalar"))
        })
        .collect()
}

/// Put unordered blocks in canonical order
pub(crate) fn sort_blocks(fields: &[FieldSpec], blocks: &mut [ConfigTree]) {
    blocks.sort_by_cached_key(|b| Value::Object(render_fields(fields, b)).to_string());
}

/// Render a tree back to its declared JSON form
pub fn render(schema: &KindSchema, tree: &ConfigTree) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, attr) in tree.iter() {
        if let Some(ty) = schema.shape_of(key) {
            out.insert(key.to_string(), render_attr(&ty, attr));
        }
    }
    out
}

fn render_fields(fields: &[FieldSpec], tree: &ConfigTree) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, attr) in tree.iter() {
        if let Some(spec) = fields.iter().find(|f| f.key == key) {
            out.insert(key.to_string(), render_attr(&spec.ty, attr));
        }
    }
    out
}

fn render_attr(ty: &FieldType, attr: &Attr) -> Value {
    match attr {
        Tristate::Unset => Value::Null,
        Tristate::Empty => empty_json(ty),
        Tristate::Set(leaf) => render_leaf(ty, leaf),
    }
}

/// The declared-form empty value for a type
pub(crate) fn empty_json(ty: &FieldType) -> Value {
    match ty {
        FieldType::StringMap | FieldType::Tags => Value::Object(Map::new()),
        FieldType::StringSet
        | FieldType::StringList
        | FieldType::LinkSet(_)
        | FieldType::Block { .. } => Value::Array(Vec::new()),
        FieldType::String
        | FieldType::Link(_)
        | FieldType::Int
        | FieldType::Float
        | FieldType::Bool => Value::String(String::new()),
    }
}

fn render_leaf(ty: &FieldType, leaf: &Leaf) -> Value {
    match leaf {
        Leaf::Str(s) => Value::String(s.clone()),
        Leaf::Int(i) => Value::from(*i),
        Leaf::Float(f) => Value::from(*f),
        Leaf::Bool(b) => Value::Bool(*b),
        Leaf::Map(m) => Value::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
        Leaf::Set(s) => Value::Array(s.iter().cloned().map(Value::String).collect()),
        Leaf::List(l) => Value::Array(l.iter().cloned().map(Value::String).collect()),
        Leaf::Blocks(blocks) => {
            let fields = match ty {
                FieldType::Block { fields, .. } => *fields,
                _ => &[],
            };
            Value::Array(
                blocks
                    .iter()
                    .map(|b| Value::Object(render_fields(fields, b)))
                    .collect(),
            )
        }
    }
}
