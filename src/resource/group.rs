//! Group: a named set of principals

use reconcile::{FieldSpec, FieldType, KindSchema, Rule, Scope};

static IDENTITY_MATCHER: [FieldSpec; 2] = [
    FieldSpec::new("expression", "expression", FieldType::String)
        .required()
        .rules(&[Rule::Length { min: 1, max: 4096 }]),
    FieldSpec::new("language", "language", FieldType::String)
        .optional_computed()
        .rules(&[Rule::OneOfValues(&["jmespath", "javascript"])]),
];

pub static GROUP: KindSchema = KindSchema {
    kind: "group",
    description: "Group of users and service accounts",
    scope: Scope::Org,
    fields: &[
        FieldSpec::new("member_links", "memberLinks", FieldType::StringSet).rules(&[Rule::Link]),
        FieldSpec::new("identity_matcher", "identityMatcher", FieldType::single(&IDENTITY_MATCHER)),
    ],
    one_of: &[],
    computed: &[("origin", "origin")],
};
