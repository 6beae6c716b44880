//! Identity: a workload's credentials towards clouds and private networks
//!
//! Identities live inside a gvc, so their address is `identity.<gvc>.<name>`.

use reconcile::{FieldSpec, FieldType, KindSchema, LinkTarget, Scope};

const CLOUD_ACCOUNT: LinkTarget = LinkTarget::org("cloudaccount");

static AWS: [FieldSpec; 3] = [
    FieldSpec::new("cloud_account_link", "cloudAccountLink", FieldType::Link(CLOUD_ACCOUNT)).required(),
    FieldSpec::new("role_name", "roleName", FieldType::String),
    FieldSpec::new("policy_refs", "policyRefs", FieldType::StringSet),
];

static GCP_BINDING: [FieldSpec; 2] = [
    FieldSpec::new("resource", "resource", FieldType::String).required(),
    FieldSpec::new("roles", "roles", FieldType::StringSet),
];

static GCP: [FieldSpec; 4] = [
    FieldSpec::new("cloud_account_link", "cloudAccountLink", FieldType::Link(CLOUD_ACCOUNT)).required(),
    FieldSpec::new("scopes", "scopes", FieldType::StringSet),
    FieldSpec::new("service_account", "serviceAccount", FieldType::String),
    FieldSpec::new("binding", "bindings", FieldType::unordered(&GCP_BINDING)),
];

static AZURE: [FieldSpec; 1] = [
    FieldSpec::new("cloud_account_link", "cloudAccountLink", FieldType::Link(CLOUD_ACCOUNT)).required(),
];

static NETWORK_RESOURCE: [FieldSpec; 4] = [
    FieldSpec::new("name", "name", FieldType::String).required(),
    FieldSpec::new("agent_link", "agentLink", FieldType::Link(LinkTarget::org("agent"))),
    FieldSpec::new("fqdn", "FQDN", FieldType::String),
    FieldSpec::new("ips", "IPs", FieldType::StringSet),
];

pub static IDENTITY: KindSchema = KindSchema {
    kind: "identity",
    description: "Workload identity, scoped to a gvc",
    scope: Scope::Grouped {
        key: "gvc",
        parent_kind: "gvc",
    },
    fields: &[
        FieldSpec::new("aws", "aws", FieldType::single(&AWS)),
        FieldSpec::new("gcp", "gcp", FieldType::single(&GCP)),
        FieldSpec::new("azure", "azure", FieldType::single(&AZURE)),
        FieldSpec::new("network_resource", "networkResources", FieldType::unordered(&NETWORK_RESOURCE)),
    ],
    one_of: &[],
    computed: &[("object_name", "status.objectName")],
};
