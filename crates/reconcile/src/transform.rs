//! Build and flatten
//!
//! `build` turns a declared tree into the object the API expects, validating
//! every value on the way. `flatten` reads an API object back into a declared
//! tree plus the server-computed attributes. For every tree the schema can
//! represent, `flatten(build(x), hint = x)` yields `x` again.

use crate::error::{Error, Result};
use crate::link::LinkResolver;
use crate::object::{DomainObject, get_path, set_path};
use crate::schema::{FieldSpec, FieldType, KindSchema, LinkTarget, OneOfSpec, Payload, Presence, TAGS_KEY};
use crate::tags;
use crate::tree::{Attr, ConfigTree, Leaf, empty_json, sort_blocks};
use crate::validate::check_rules;
use crate::value::{Tristate, canonical_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Attributes only the server decides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    /// Identifier used by the host; the object's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Backend GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpln_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status: BTreeMap<String, Value>,
}

/// A flattened object: what was observed remotely, in declared form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    pub config: ConfigTree,
    pub computed: Computed,
}

/// The scope an instance lives in, from its declared tree
pub fn scope_of<'t>(schema: &KindSchema, tree: &'t ConfigTree) -> Result<Option<&'t str>> {
    match schema.scope_key() {
        None => Ok(None),
        Some(key) => match tree.str(key) {
            Some(scope) if !scope.is_empty() => Ok(Some(scope)),
            _ => Err(Error::validation(key, tree.get(key).summary(), "is required")),
        },
    }
}

/// Build the API object for a declared tree
pub fn build(schema: &KindSchema, tree: &ConfigTree, links: &LinkResolver<'_>) -> Result<DomainObject> {
    let builder = Builder {
        links,
        scope: scope_of(schema, tree)?,
    };
    let mut out = Map::new();
    builder.fields(schema.all_fields(), tree, "", &mut out)?;
    for group in schema.one_of {
        builder.one_of(group, tree, &mut out)?;
    }
    mark_managed(&mut out);
    DomainObject::from_map(out).map_err(|e| Error::Schema {
        kind: schema.kind.to_string(),
        message: e.to_string(),
    })
}

/// Build the partial object for an in-place update
///
/// Only `fields` are included, plus the management marker tag. Fields unset
/// in `new` are sent as `null`. Object values are merge patches against
/// `old`: keys `old` had and `new` lacks are sent as `null` at every depth,
/// and tags are sent as the merged tag diff.
pub fn build_patch(
    schema: &KindSchema,
    old: &ConfigTree,
    new: &ConfigTree,
    fields: &[String],
    links: &LinkResolver<'_>,
) -> Result<DomainObject> {
    let full = build(schema, new, links)?.to_map();
    let previous = match build(schema, old, links) {
        Ok(object) => object.to_map(),
        Err(e) => {
            log::debug!("{}: current object does not rebuild, removals stay unpatched: {e}", schema.kind);
            Map::new()
        }
    };
    let mut patch = Map::new();
    let changed = |path: &str, value: Value| null_removed(get_path(&previous, path), value);

    for key in fields {
        if key == TAGS_KEY {
            let merged = tags::diff(&tag_map(old), &tag_map(new));
            patch.insert(TAGS_KEY.to_string(), Value::Object(tags::patch_to_json(&merged)));
        } else if let Some(group) = schema.one_of.iter().find(|g| g.group == key) {
            for path in [group.discriminant_path, group.payload_path] {
                let value = get_path(&full, path).cloned().unwrap_or(Value::Null);
                set_path(&mut patch, path, changed(path, value));
            }
        } else if let Some(spec) = schema.field(key) {
            let value = match new.get(key) {
                Tristate::Unset => Value::Null,
                Tristate::Empty | Tristate::Set(_) => {
                    get_path(&full, spec.api_path).cloned().unwrap_or(Value::Null)
                }
            };
            set_path(&mut patch, spec.api_path, changed(spec.api_path, value));
        } else {
            log::debug!("{}: '{key}' is not patchable, skipping", schema.kind);
        }
    }

    mark_managed(&mut patch);
    DomainObject::from_map(patch).map_err(|e| Error::Schema {
        kind: schema.kind.to_string(),
        message: e.to_string(),
    })
}

/// Merge-patch value turning `old` into `new`
///
/// Objects are compared key by key; keys only `old` has become `null`.
/// Anything else, arrays included, is replaced whole.
fn null_removed(old: Option<&Value>, new: Value) -> Value {
    match (old, new) {
        (Some(Value::Object(old)), Value::Object(mut new)) => {
            for (key, previous) in old {
                let value = match new.remove(key) {
                    Some(value) => null_removed(Some(previous), value),
                    None => Value::Null,
                };
                new.insert(key.clone(), value);
            }
            Value::Object(new)
        }
        (_, new) => new,
    }
}

/// Stamp the management marker into the object's tags
fn mark_managed(out: &mut Map<String, Value>) {
    let tags = out
        .entry(TAGS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(tags) = tags {
        tags.insert(tags::MANAGED_TAG.to_string(), Value::String("true".to_string()));
    }
}

fn tag_map(tree: &ConfigTree) -> tags::Tags {
    tree.get(TAGS_KEY)
        .value()
        .and_then(Leaf::as_map)
        .cloned()
        .unwrap_or_default()
}

/// Read an API object back into declared form
///
/// `hint` is the declared tree the object is compared against; links are
/// spelled the way the hint spells them whenever they resolve identically.
pub fn flatten(
    schema: &KindSchema,
    object: &DomainObject,
    scope: Option<&str>,
    hint: Option<&ConfigTree>,
    links: &LinkResolver<'_>,
) -> Observed {
    let map = object.to_map();
    let flattener = Flattener { links, scope };
    let empty = ConfigTree::new();
    let hint = hint.unwrap_or(&empty);

    let mut config = flattener.fields(schema.all_fields(), &map, hint);
    if let (Some(key), Some(scope)) = (schema.scope_key(), scope) {
        config.set(key, Attr::from_leaf(Leaf::Str(scope.to_string())));
    }
    for group in schema.one_of {
        flattener.one_of(group, &map, hint, &mut config);
    }

    let computed = Computed {
        id: object.base.name.clone(),
        cpln_id: object.base.id.clone(),
        self_link: object.self_link().map(str::to_string),
        version: object.base.version,
        status: schema
            .computed
            .iter()
            .filter_map(|(key, path)| get_path(&map, path).map(|v| ((*key).to_string(), v.clone())))
            .collect(),
    };

    Observed { config, computed }
}

struct Builder<'a, 'o> {
    links: &'a LinkResolver<'o>,
    scope: Option<&'a str>,
}

impl Builder<'_, '_> {
    fn fields<'f>(
        &self,
        fields: impl Iterator<Item = &'f FieldSpec>,
        tree: &ConfigTree,
        prefix: &str,
        out: &mut Map<String, Value>,
    ) -> Result<()> {
        for spec in fields {
            let path = join(prefix, spec.key);
            match tree.get(spec.key) {
                Tristate::Unset => {
                    if spec.presence == Presence::Required {
                        return Err(Error::validation(path, "(unset)", "is required"));
                    }
                }
                Tristate::Empty => {
                    if spec.presence == Presence::Required {
                        return Err(Error::validation(path, "\"\"", "must not be empty"));
                    }
                    set_path(out, spec.api_path, empty_json(&spec.ty));
                }
                Tristate::Set(leaf) => {
                    check_rules(&path, spec.rules, leaf)?;
                    let value = self.leaf(&path, &spec.ty, leaf)?;
                    set_path(out, spec.api_path, value);
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, path: &str, ty: &FieldType, leaf: &Leaf) -> Result<Value> {
        let value = match (ty, leaf) {
            (FieldType::String, Leaf::Str(s)) => Value::String(s.clone()),
            (FieldType::Int, Leaf::Int(i)) => Value::from(*i),
            (FieldType::Float, Leaf::Float(f)) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| Error::validation(path, f.to_string(), "must be a finite number"))?,
            (FieldType::Bool, Leaf::Bool(b)) => Value::Bool(*b),
            (FieldType::StringMap, Leaf::Map(m)) => Value::Object(tags::to_json(m)),
            (FieldType::Tags, Leaf::Map(m)) => {
                tags::validate(path, m)?;
                Value::Object(tags::to_json(m))
            }
            (FieldType::StringSet, Leaf::Set(items)) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            (FieldType::StringList, Leaf::List(items)) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            (FieldType::Link(target), Leaf::Str(s)) => Value::String(self.resolve(target, s)),
            (FieldType::LinkSet(target), Leaf::Set(items)) => {
                let mut resolved: Vec<String> = items.iter().map(|s| self.resolve(target, s)).collect();
                resolved.sort();
                resolved.dedup();
                Value::Array(resolved.into_iter().map(Value::String).collect())
            }
            (
                FieldType::Block {
                    fields,
                    max_items,
                    ordered,
                },
                Leaf::Blocks(blocks),
            ) => {
                if let Some(max) = max_items
                    && blocks.len() > *max
                {
                    return Err(Error::validation(
                        path,
                        format!("{} blocks", blocks.len()),
                        format!("at most {max} allowed"),
                    ));
                }
                let mut built = Vec::with_capacity(blocks.len());
                for (index, block) in blocks.iter().enumerate() {
                    let mut object = Map::new();
                    self.fields(fields.iter(), block, &format!("{path}[{index}]"), &mut object)?;
                    built.push(Value::Object(object));
                }
                if ty.is_single() {
                    built.into_iter().next().unwrap_or(Value::Null)
                } else {
                    if !ordered {
                        built.sort_by_cached_key(Value::to_string);
                    }
                    Value::Array(built)
                }
            }
            _ => {
                return Err(Error::validation(
                    path,
                    leaf.summary(),
                    format!("does not match the declared type {ty:?}"),
                ));
            }
        };
        Ok(value)
    }

    fn one_of(&self, group: &OneOfSpec, tree: &ConfigTree, out: &mut Map<String, Value>) -> Result<()> {
        let selected: Vec<_> = group
            .variants
            .iter()
            .filter(|v| tree.get(v.key).is_set())
            .collect();
        let [variant] = selected.as_slice() else {
            return Err(Error::VariantSelection {
                group: group.group.to_string(),
                candidates: group.variants.iter().map(|v| v.key.to_string()).collect(),
                selected: selected.iter().map(|v| v.key.to_string()).collect(),
            });
        };

        let attr = tree.get(variant.key);
        let payload = match (variant.payload, attr) {
            (Payload::Fields(fields), Tristate::Set(Leaf::Blocks(blocks))) => {
                let mut object = Map::new();
                if let Some(block) = blocks.first() {
                    self.fields(fields.iter(), block, variant.key, &mut object)?;
                }
                Value::Object(object)
            }
            (Payload::Scalar(rules), Tristate::Set(leaf @ Leaf::Str(s))) => {
                check_rules(variant.key, rules, leaf)?;
                Value::String(s.clone())
            }
            (Payload::Map, Tristate::Set(Leaf::Map(m))) => Value::Object(tags::to_json(m)),
            (payload, Tristate::Empty) => match payload {
                Payload::Scalar(_) => Value::String(String::new()),
                Payload::Fields(_) | Payload::Map => Value::Object(Map::new()),
            },
            (_, other) => {
                return Err(Error::validation(
                    variant.key,
                    other.summary(),
                    "does not match the variant's declared shape",
                ));
            }
        };

        set_path(out, group.discriminant_path, Value::String(variant.discriminant.to_string()));
        set_path(out, group.payload_path, payload);
        Ok(())
    }

    fn resolve(&self, target: &LinkTarget, value: &str) -> String {
        let scope = if target.scoped { self.scope } else { None };
        self.links.resolve(target.kind, scope, value)
    }
}

struct Flattener<'a, 'o> {
    links: &'a LinkResolver<'o>,
    scope: Option<&'a str>,
}

impl Flattener<'_, '_> {
    fn fields<'f>(
        &self,
        fields: impl Iterator<Item = &'f FieldSpec>,
        map: &Map<String, Value>,
        hint: &ConfigTree,
    ) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for spec in fields {
            let attr = match get_path(map, spec.api_path) {
                None | Some(Value::Null) => Attr::Unset,
                Some(value) => self.value(spec, value, hint.get(spec.key)),
            };
            tree.set(spec.key, attr);
        }
        tree
    }

    fn value(&self, spec: &FieldSpec, value: &Value, hint: &Attr) -> Attr {
        let leaf = match &spec.ty {
            FieldType::String => canonical_string(value).map(Leaf::Str),
            FieldType::Int => value.as_i64().map(Leaf::Int),
            FieldType::Float => value.as_f64().map(Leaf::Float),
            FieldType::Bool => value.as_bool().map(Leaf::Bool),
            FieldType::StringMap => value.as_object().map(|m| {
                Leaf::Map(
                    m.iter()
                        .filter_map(|(k, v)| canonical_string(v).map(|s| (k.clone(), s)))
                        .collect(),
                )
            }),
            FieldType::Tags => {
                let filtered = value.as_object().map(tags::filter).unwrap_or_default();
                return if filtered.is_empty() {
                    Attr::Unset
                } else {
                    Attr::Set(Leaf::Map(filtered))
                };
            }
            FieldType::StringSet => strings(value).map(|items| Leaf::Set(items.into_iter().collect())),
            FieldType::StringList => strings(value).map(Leaf::List),
            FieldType::Link(target) => value.as_str().map(|link| {
                let scope = self.target_scope(target);
                Leaf::Str(self.links.respell(target.kind, scope, link, hint.str()))
            }),
            FieldType::LinkSet(target) => strings(value).map(|items| {
                let scope = self.target_scope(target);
                let hinted: Vec<&String> = match hint {
                    Tristate::Set(Leaf::Set(h)) => h.iter().collect(),
                    _ => Vec::new(),
                };
                Leaf::Set(
                    items
                        .iter()
                        .map(|link| {
                            let spelled = hinted
                                .iter()
                                .find(|h| self.links.same(target.kind, scope, h, link))
                                .map(|h| (*h).clone());
                            spelled.unwrap_or_else(|| self.links.shorten(target.kind, scope, link))
                        })
                        .collect(),
                )
            }),
            FieldType::Block {
                fields, ordered, ..
            } => Some(Leaf::Blocks(self.blocks(fields, *ordered, value, hint))),
        };

        match leaf {
            Some(leaf) => Attr::from_leaf(leaf),
            None => {
                log::warn!("'{}' has unexpected value {value}, ignoring", spec.key);
                Attr::Unset
            }
        }
    }

    fn blocks(&self, fields: &[FieldSpec], ordered: bool, value: &Value, hint: &Attr) -> Vec<ConfigTree> {
        let items: Vec<&Map<String, Value>> = match value {
            Value::Object(object) => vec![object],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        };
        let hints: &[ConfigTree] = hint.value().and_then(Leaf::as_blocks).unwrap_or(&[]);
        let empty = ConfigTree::new();

        let mut blocks: Vec<ConfigTree> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                if ordered {
                    let hint = hints.get(index).unwrap_or(&empty);
                    self.fields(fields.iter(), item, hint)
                } else {
                    // Match each element to the hint block it reproduces
                    hints
                        .iter()
                        .map(|hint| self.fields(fields.iter(), item, hint))
                        .find(|tree| hints.contains(tree))
                        .unwrap_or_else(|| self.fields(fields.iter(), item, &empty))
                }
            })
            .collect();

        if !ordered {
            sort_blocks(fields, &mut blocks);
        }
        blocks
    }

    fn one_of(&self, group: &OneOfSpec, map: &Map<String, Value>, hint: &ConfigTree, config: &mut ConfigTree) {
        let Some(discriminant) = get_path(map, group.discriminant_path).and_then(Value::as_str) else {
            return;
        };
        let Some(variant) = group.by_discriminant(discriminant) else {
            log::warn!("unknown {} '{discriminant}', leaving it out", group.group);
            return;
        };
        let payload = get_path(map, group.payload_path);

        let attr = match variant.payload {
            Payload::Fields(fields) => {
                let empty = Map::new();
                let object = payload.and_then(Value::as_object).unwrap_or(&empty);
                let block_hint = hint
                    .get(variant.key)
                    .value()
                    .and_then(Leaf::as_blocks)
                    .and_then(<[ConfigTree]>::first)
                    .cloned()
                    .unwrap_or_default();
                Attr::Set(Leaf::Blocks(vec![self.fields(fields.iter(), object, &block_hint)]))
            }
            Payload::Scalar(_) => payload
                .and_then(canonical_string)
                .map_or(Attr::Unset, |s| Attr::from_leaf(Leaf::Str(s))),
            Payload::Map => payload.and_then(Value::as_object).map_or(Attr::Unset, |m| {
                Attr::from_leaf(Leaf::Map(
                    m.iter()
                        .filter_map(|(k, v)| canonical_string(v).map(|s| (k.clone(), s)))
                        .collect(),
                ))
            }),
        };
        config.set(variant.key, attr);
    }

    fn target_scope(&self, target: &LinkTarget) -> Option<&str> {
        if target.scoped { self.scope } else { None }
    }
}

fn strings(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(canonical_string).collect())
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
