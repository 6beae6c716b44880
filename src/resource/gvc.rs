//! Global virtual cloud: the set of locations workloads run in

use reconcile::{FieldSpec, FieldType, KindSchema, LinkTarget, Rule, Scope};

static ENV: [FieldSpec; 2] = [
    FieldSpec::new("name", "name", FieldType::String).required(),
    FieldSpec::new("value", "value", FieldType::String),
];

static LOAD_BALANCER: [FieldSpec; 3] = [
    FieldSpec::new("dedicated", "dedicated", FieldType::Bool),
    FieldSpec::new("trusted_proxies", "trustedProxies", FieldType::Int)
        .rules(&[Rule::Range { min: -1, max: 2 }]),
    FieldSpec::new("ipset", "ipSet", FieldType::Link(LinkTarget::org("ipset"))),
];

pub static GVC: KindSchema = KindSchema {
    kind: "gvc",
    description: "Global virtual cloud",
    scope: Scope::Org,
    fields: &[
        FieldSpec::new(
            "locations",
            "spec.staticPlacement.locationLinks",
            FieldType::LinkSet(LinkTarget::org("location")),
        ),
        FieldSpec::new(
            "pull_secrets",
            "spec.pullSecretLinks",
            FieldType::LinkSet(LinkTarget::org("secret")),
        ),
        FieldSpec::new("domain", "spec.domain", FieldType::String),
        FieldSpec::new("endpoint_naming_format", "spec.endpointNamingFormat", FieldType::String)
            .optional_computed()
            .rules(&[Rule::OneOfValues(&["default", "org", "legacy"])]),
        FieldSpec::new("env", "spec.env", FieldType::ordered(&ENV)),
        FieldSpec::new("load_balancer", "spec.loadBalancer", FieldType::single(&LOAD_BALANCER)),
    ],
    one_of: &[],
    computed: &[("alias", "alias")],
};
