//! Test fixtures: small kind tables and an in-memory API
//!
//! Compiled for this crate's tests and, with the `testing` feature, for
//! dependents that exercise their own kind tables against [`MemoryApi`].

use crate::lifecycle::{ApiClient, ApiError};
use crate::link::self_link;
use crate::object::DomainObject;
use crate::schema::{
    FieldSpec, FieldType, KindSchema, LinkTarget, OneOfSpec, Rule, Scope, UpdatePolicy, Variant,
};
use crate::tree::{Attr, ConfigTree, Leaf};
use crate::value::canonical_string;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

static LOAD_BALANCER: [FieldSpec; 2] = [
    FieldSpec::new("dedicated", "dedicated", FieldType::Bool),
    FieldSpec::new("trusted_proxies", "trustedProxies", FieldType::Int),
];

pub static WIDGET: KindSchema = KindSchema {
    kind: "gvc",
    description: "test gvc",
    scope: Scope::Org,
    fields: &[
        FieldSpec::new(
            "locations",
            "spec.staticPlacement.locationLinks",
            FieldType::LinkSet(LinkTarget::org("location")),
        ),
        FieldSpec::new("domain", "spec.domain", FieldType::String),
        FieldSpec::new("env", "spec.env", FieldType::StringList),
        FieldSpec::new("load_balancer", "spec.loadBalancer", FieldType::single(&LOAD_BALANCER)),
    ],
    one_of: &[],
    computed: &[("endpoint", "status.endpoint")],
};

pub static IDENTITY: KindSchema = KindSchema {
    kind: "identity",
    description: "test identity",
    scope: Scope::Grouped {
        key: "gvc",
        parent_kind: "gvc",
    },
    fields: &[FieldSpec::new(
        "cloud_account_link",
        "aws.cloudAccountLink",
        FieldType::Link(LinkTarget::org("cloudaccount")),
    )],
    one_of: &[],
    computed: &[],
};

static AWS: [FieldSpec; 1] = [FieldSpec::new("role_arn", "roleArn", FieldType::String)
    .required()
    .rules(&[Rule::Regex(r"^arn:(aws|aws-us-gov|aws-cn):iam::[0-9]+:role/.+")])];

static GCP: [FieldSpec; 1] = [FieldSpec::new("project_id", "projectId", FieldType::String)
    .required()
    .rules(&[Rule::Length { min: 6, max: 30 }])];

pub static CLOUD_ACCOUNT: KindSchema = KindSchema {
    kind: "cloudaccount",
    description: "test cloud account",
    scope: Scope::Org,
    fields: &[],
    one_of: &[OneOfSpec {
        group: "provider",
        discriminant_path: "provider",
        payload_path: "data",
        variants: &[Variant::fields("aws", "aws", &AWS), Variant::fields("gcp", "gcp", &GCP)],
        policy: UpdatePolicy::Replace,
    }],
    computed: &[],
};

static OPAQUE: [FieldSpec; 1] = [FieldSpec::new("payload", "payload", FieldType::String).required()];

pub static SECRET: KindSchema = KindSchema {
    kind: "secret",
    description: "test secret",
    scope: Scope::Org,
    fields: &[],
    one_of: &[OneOfSpec {
        group: "type",
        discriminant_path: "type",
        payload_path: "data",
        variants: &[Variant::fields("opaque", "opaque", &OPAQUE), Variant::map("dictionary", "dictionary")],
        policy: UpdatePolicy::Mutable,
    }],
    computed: &[],
};

static BINDING: [FieldSpec; 2] = [
    FieldSpec::new("permissions", "permissions", FieldType::StringSet),
    FieldSpec::new("principal_links", "principalLinks", FieldType::StringSet).rules(&[Rule::Link]),
];

pub static POLICY: KindSchema = KindSchema {
    kind: "policy",
    description: "test policy",
    scope: Scope::Org,
    fields: &[
        FieldSpec::new("target_kind", "targetKind", FieldType::String)
            .required()
            .replace(),
        FieldSpec::new("binding", "bindings", FieldType::unordered(&BINDING)),
    ],
    one_of: &[],
    computed: &[],
};

/// Tree from scalar and object literals; objects become string maps
pub fn tree(pairs: &[(&str, Value)]) -> ConfigTree {
    let mut tree = ConfigTree::new();
    for (key, value) in pairs {
        let leaf = match value {
            Value::Bool(b) => Leaf::Bool(*b),
            Value::Number(n) if n.is_i64() => Leaf::Int(n.as_i64().unwrap()),
            Value::Number(n) => Leaf::Float(n.as_f64().unwrap()),
            Value::String(s) => Leaf::Str(s.clone()),
            Value::Object(m) => Leaf::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), canonical_string(v).unwrap()))
                    .collect(),
            ),
            other => panic!("unsupported literal {other}"),
        };
        let attr = Attr::from_leaf(leaf);
        // Mirror parsing: empty tags mean unset
        if *key == "tags" && attr == Attr::Empty {
            continue;
        }
        tree.set(*key, attr);
    }
    tree
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// In-memory backend with merge-patch updates and a call log
///
/// Objects are keyed by `kind/[scope/]name`; calls are logged as
/// `op kind/[scope/]name`.
#[derive(Default)]
pub struct MemoryApi {
    objects: Mutex<BTreeMap<String, Value>>,
    calls: Mutex<Vec<String>>,
    patches: Mutex<Vec<Value>>,
    failure: Mutex<Option<ApiError>>,
    failing: Mutex<BTreeMap<String, ApiError>>,
}

impl MemoryApi {
    fn key(kind: &str, scope: Option<&str>, name: &str) -> String {
        match scope {
            Some(scope) => format!("{kind}/{scope}/{name}"),
            None => format!("{kind}/{name}"),
        }
    }

    fn record(&self, op: &str, key: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("{op} {key}"));
        let failure = self.failure.lock().unwrap().take();
        match failure.or_else(|| self.failing.lock().unwrap().remove(key)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn insert(&self, kind: &str, scope: Option<&str>, mut object: Value) {
        let name = object["name"].as_str().unwrap().to_string();
        stamp(&mut object, kind, scope, &name);
        self.objects
            .lock()
            .unwrap()
            .insert(Self::key(kind, scope, &name), object);
    }

    /// Fail the next call, whatever it touches
    pub fn fail_next(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some(ApiError::new(Some(status), message));
    }

    /// Fail the next call touching `key`
    pub fn fail_on(&self, key: &str, status: u16, message: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(key.to_string(), ApiError::new(Some(status), message));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_patch(&self) -> Option<Value> {
        self.patches.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

fn stamp(object: &mut Value, kind: &str, scope: Option<&str>, name: &str) {
    let version = object["version"].as_i64().unwrap_or(0) + 1;
    object["id"] = json!(format!("guid-{kind}-{name}"));
    object["kind"] = json!(kind);
    object["version"] = json!(version);
    object["links"] = json!([{"rel": "self", "href": self_link("acme", kind, scope, name)}]);
}

fn merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(child) => {
                let entry = target.entry(key.clone()).or_insert_with(|| json!({}));
                if !entry.is_object() {
                    *entry = json!({});
                }
                if let Value::Object(existing) = entry {
                    merge_patch(existing, child);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

fn not_found(key: &str) -> ApiError {
    ApiError::new(Some(404), format!("status: 404, body: {key} not found"))
}

impl ApiClient for MemoryApi {
    fn get(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<DomainObject, ApiError> {
        let key = Self::key(kind, scope, name);
        self.record("get", &key)?;
        let object = self.objects.lock().unwrap().get(&key).cloned();
        object
            .map(|o| DomainObject::from_json(o).unwrap())
            .ok_or_else(|| not_found(&key))
    }

    fn create(&self, kind: &str, scope: Option<&str>, object: &DomainObject) -> Result<DomainObject, ApiError> {
        let name = object.name().unwrap_or_default().to_string();
        let key = Self::key(kind, scope, &name);
        self.record("create", &key)?;
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(ApiError::new(Some(409), format!("status: 409, body: {key} exists")));
        }
        let mut stored = object.to_json();
        stamp(&mut stored, kind, scope, &name);
        objects.insert(key, stored.clone());
        Ok(DomainObject::from_json(stored).unwrap())
    }

    fn update(
        &self,
        kind: &str,
        scope: Option<&str>,
        name: &str,
        patch: &DomainObject,
    ) -> Result<DomainObject, ApiError> {
        let key = Self::key(kind, scope, name);
        self.record("update", &key)?;
        let patch = patch.to_json();
        self.patches.lock().unwrap().push(patch.clone());
        let mut objects = self.objects.lock().unwrap();
        let stored = objects.get_mut(&key).ok_or_else(|| not_found(&key))?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut *stored, &patch) {
            merge_patch(target, changes);
        }
        stamp(stored, kind, scope, name);
        Ok(DomainObject::from_json(stored.clone()).unwrap())
    }

    fn delete(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<(), ApiError> {
        let key = Self::key(kind, scope, name);
        self.record("delete", &key)?;
        self.objects
            .lock()
            .unwrap()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| not_found(&key))
    }
}
