//! Cloud account: trust relationship with one cloud provider
//!
//! Exactly one provider block is declared. The provider cannot change once
//! the account exists, so any provider change replaces it.

use reconcile::{FieldSpec, FieldType, KindSchema, LinkTarget, OneOfSpec, Rule, Scope, UpdatePolicy, Variant};

static AWS: [FieldSpec; 1] = [FieldSpec::new("role_arn", "roleArn", FieldType::String)
    .required()
    .rules(&[Rule::Regex(r"^arn:(aws|aws-us-gov|aws-cn):iam::[0-9]+:role/.+")])];

static GCP: [FieldSpec; 1] = [FieldSpec::new("project_id", "projectId", FieldType::String)
    .required()
    .rules(&[Rule::Regex(r"^[a-z]([a-z0-9-]){4,28}[a-z0-9]$")])];

static AZURE: [FieldSpec; 1] = [FieldSpec::new(
    "secret_link",
    "secretLink",
    FieldType::Link(LinkTarget::org("secret")),
)
.required()];

static NGS: [FieldSpec; 1] = [FieldSpec::new(
    "secret_link",
    "secretLink",
    FieldType::Link(LinkTarget::org("secret")),
)
.required()];

pub static CLOUD_ACCOUNT: KindSchema = KindSchema {
    kind: "cloudaccount",
    description: "Cloud provider account",
    scope: Scope::Org,
    fields: &[],
    one_of: &[OneOfSpec {
        group: "provider",
        discriminant_path: "provider",
        payload_path: "data",
        variants: &[
            Variant::fields("aws", "aws", &AWS),
            Variant::fields("gcp", "gcp", &GCP),
            Variant::fields("azure", "azure", &AZURE),
            Variant::fields("ngs", "ngs", &NGS),
        ],
        policy: UpdatePolicy::Replace,
    }],
    computed: &[
        ("usable", "status.usable"),
        ("last_error", "status.lastError"),
    ],
};
