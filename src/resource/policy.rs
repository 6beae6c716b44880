//! Policy: permissions granted to principals over a kind's objects

use reconcile::{FieldSpec, FieldType, KindSchema, Rule, Scope};

/// Kinds a policy can target
const TARGET_KINDS: &[&str] = &[
    "agent",
    "auditctx",
    "cloudaccount",
    "domain",
    "group",
    "gvc",
    "identity",
    "image",
    "ipset",
    "location",
    "org",
    "policy",
    "quota",
    "secret",
    "serviceaccount",
    "task",
    "user",
    "volumeset",
    "workload",
];

static BINDING: [FieldSpec; 2] = [
    FieldSpec::new("permissions", "permissions", FieldType::StringSet).required(),
    FieldSpec::new("principal_links", "principalLinks", FieldType::StringSet)
        .required()
        .rules(&[Rule::Link]),
];

pub static POLICY: KindSchema = KindSchema {
    kind: "policy",
    description: "Access policy over one target kind",
    scope: Scope::Org,
    fields: &[
        FieldSpec::new("target_kind", "targetKind", FieldType::String)
            .required()
            .replace()
            .rules(&[Rule::OneOfValues(TARGET_KINDS)]),
        FieldSpec::new("target", "target", FieldType::String).rules(&[Rule::OneOfValues(&["all"])]),
        FieldSpec::new("target_links", "targetLinks", FieldType::StringSet),
        FieldSpec::new("binding", "bindings", FieldType::unordered(&BINDING)),
    ],
    one_of: &[],
    computed: &[("origin", "origin")],
};
