//! Secret: typed sensitive data
//!
//! The declared block names the secret type; its payload is sent under
//! `data`. Reads go through the reveal endpoint so the payload can be
//! compared.

use reconcile::{FieldSpec, FieldType, KindSchema, OneOfSpec, Payload, Rule, Scope, UpdatePolicy, Variant};

const ENCODINGS: Rule = Rule::OneOfValues(&["plain", "base64"]);

static OPAQUE: [FieldSpec; 2] = [
    FieldSpec::new("payload", "payload", FieldType::String).required(),
    FieldSpec::new("encoding", "encoding", FieldType::String)
        .optional_computed()
        .rules(&[ENCODINGS]),
];

static USERPASS: [FieldSpec; 3] = [
    FieldSpec::new("username", "username", FieldType::String).required(),
    FieldSpec::new("password", "password", FieldType::String).required(),
    FieldSpec::new("encoding", "encoding", FieldType::String)
        .optional_computed()
        .rules(&[ENCODINGS]),
];

static KEYPAIR: [FieldSpec; 3] = [
    FieldSpec::new("secret_key", "secretKey", FieldType::String).required(),
    FieldSpec::new("public_key", "publicKey", FieldType::String),
    FieldSpec::new("passphrase", "passphrase", FieldType::String),
];

static AWS: [FieldSpec; 4] = [
    FieldSpec::new("access_key", "accessKey", FieldType::String)
        .required()
        .rules(&[Rule::Regex(r"^AKIA[A-Z0-9]+$")]),
    FieldSpec::new("secret_key", "secretKey", FieldType::String).required(),
    FieldSpec::new("role_arn", "roleArn", FieldType::String),
    FieldSpec::new("external_id", "externalId", FieldType::String),
];

static TLS: [FieldSpec; 3] = [
    FieldSpec::new("key", "key", FieldType::String).required(),
    FieldSpec::new("cert", "cert", FieldType::String).required(),
    FieldSpec::new("chain", "chain", FieldType::String),
];

static NATS_ACCOUNT: [FieldSpec; 2] = [
    FieldSpec::new("account_id", "accountId", FieldType::String).required(),
    FieldSpec::new("private_key", "privateKey", FieldType::String).required(),
];

pub static SECRET: KindSchema = KindSchema {
    kind: "secret",
    description: "Secret data of one type",
    scope: Scope::Org,
    fields: &[],
    one_of: &[OneOfSpec {
        group: "type",
        discriminant_path: "type",
        payload_path: "data",
        variants: &[
            Variant::fields("opaque", "opaque", &OPAQUE),
            Variant::map("dictionary", "dictionary"),
            Variant::fields("userpass", "userpass", &USERPASS),
            Variant::fields("keypair", "keypair", &KEYPAIR),
            Variant::fields("aws", "aws", &AWS),
            Variant::fields("tls", "tls", &TLS),
            Variant::fields("nats_account", "nats-account", &NATS_ACCOUNT),
            Variant::scalar("docker", "docker"),
            Variant {
                key: "gcp",
                discriminant: "gcp",
                payload: Payload::Scalar(&[Rule::Regex(r"^\s*\{[\s\S]*\}\s*$")]),
            },
            Variant::scalar("azure_sdk", "azure-sdk"),
        ],
        policy: UpdatePolicy::Mutable,
    }],
    computed: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Change, ConfigTree, LinkResolver, build, build_patch, classify, flatten, tree};
    use serde_json::{Value, json};

    fn links() -> LinkResolver<'static> {
        LinkResolver::new("acme")
    }

    fn parse(config: Value) -> ConfigTree {
        tree::parse(&SECRET, config.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_dictionary_payload_is_a_map() {
        let declared = parse(json!({"name": "env", "dictionary": {"PORT": 8080, "DEBUG": true}}));
        let object = build(&SECRET, &declared, &links()).unwrap();
        let body = object.to_json();

        assert_eq!(body["type"], json!("dictionary"));
        // Scalars are stringified at the configuration boundary
        assert_eq!(body["data"], json!({"DEBUG": "true", "PORT": "8080"}));

        let observed = flatten(&SECRET, &object, None, Some(&declared), &links());
        assert_eq!(observed.config, declared);
    }

    #[test]
    fn test_scalar_payload() {
        let declared = parse(json!({"name": "registry", "docker": "{\"auths\":{}}"}));
        let object = build(&SECRET, &declared, &links()).unwrap();
        assert_eq!(object.body["type"], json!("docker"));
        assert_eq!(object.body["data"], json!("{\"auths\":{}}"));
    }

    #[test]
    fn test_gcp_payload_must_be_json() {
        let declared = parse(json!({"name": "sa", "gcp": "not json"}));
        assert!(build(&SECRET, &declared, &links()).is_err());
    }

    #[test]
    fn test_payload_change_is_in_place_and_type_change_replaces() {
        let old = parse(json!({"name": "db", "userpass": {"username": "app", "password": "a"}}));
        let new = parse(json!({"name": "db", "userpass": {"username": "app", "password": "b"}}));
        let fields = match classify(&SECRET, &old, &new) {
            Change::InPlaceUpdate(fields) => fields,
            other => panic!("expected an in-place update, got {other:?}"),
        };

        let patch = build_patch(&SECRET, &old, &new, &fields, &links()).unwrap();
        assert_eq!(patch.body["type"], json!("userpass"));
        assert_eq!(patch.body["data"]["password"], json!("b"));

        let opaque = parse(json!({"name": "db", "opaque": {"payload": "x"}}));
        assert!(matches!(classify(&SECRET, &old, &opaque), Change::Replace(_)));
    }
}
