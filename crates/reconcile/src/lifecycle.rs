//! Lifecycle controller
//!
//! Drives one instance through `Absent -> create -> Present -> update* ->
//! Present -> delete -> Absent` against an [`ApiClient`]. Not-found on read
//! and delete is a normal outcome; a conflict on create is surfaced as an
//! actionable error; everything else from the backend is returned verbatim.

use crate::address::Address;
use crate::context::ReconcileContext;
use crate::diff::{Change, classify};
use crate::error::{Error, Result};
use crate::object::DomainObject;
use crate::schema::KindSchema;
use crate::transform::{Observed, build, build_patch, flatten};
use crate::tree::ConfigTree;
use thiserror::Error;

/// Error returned by an API client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, if the call got that far
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == Some(409)
    }
}

/// Remote management API, one call per operation
///
/// `scope` is the parent instance name for grouped kinds.
pub trait ApiClient: Send + Sync {
    fn get(&self, kind: &str, scope: Option<&str>, name: &str) -> std::result::Result<DomainObject, ApiError>;

    fn create(
        &self,
        kind: &str,
        scope: Option<&str>,
        object: &DomainObject,
    ) -> std::result::Result<DomainObject, ApiError>;

    fn update(
        &self,
        kind: &str,
        scope: Option<&str>,
        name: &str,
        patch: &DomainObject,
    ) -> std::result::Result<DomainObject, ApiError>;

    fn delete(&self, kind: &str, scope: Option<&str>, name: &str) -> std::result::Result<(), ApiError>;
}

/// Reconciles single instances against the API
pub struct Controller<'a> {
    client: &'a dyn ApiClient,
    ctx: &'a ReconcileContext,
}

impl<'a> Controller<'a> {
    pub fn new(client: &'a dyn ApiClient, ctx: &'a ReconcileContext) -> Self {
        Self { client, ctx }
    }

    pub fn context(&self) -> &ReconcileContext {
        self.ctx
    }

    /// Create the instance; a 409 becomes [`Error::AlreadyExists`]
    pub fn create(&self, schema: &KindSchema, desired: &ConfigTree) -> Result<Observed> {
        let address = Address::of(schema, desired)?;
        let links = self.ctx.links();
        let object = build(schema, desired, &links)?;

        log::debug!("creating {address}");
        match self.client.create(schema.kind, address.scope(), &object) {
            Ok(created) => {
                log::info!("created {address}");
                Ok(flatten(schema, &created, address.scope(), Some(desired), &links))
            }
            Err(e) if e.is_conflict() => Err(Error::AlreadyExists {
                kind: address.kind,
                scope: address.scope,
                name: address.name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the instance; `None` when it no longer exists
    pub fn read(
        &self,
        schema: &KindSchema,
        address: &Address,
        hint: Option<&ConfigTree>,
    ) -> Result<Option<Observed>> {
        log::debug!("reading {address}");
        match self.client.get(schema.kind, address.scope(), &address.name) {
            Ok(object) => Ok(Some(flatten(
                schema,
                &object,
                address.scope(),
                hint,
                &self.ctx.links(),
            ))),
            Err(e) if e.is_not_found() => {
                log::warn!("{address} no longer exists remotely");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Patch the instance in place
    ///
    /// Returns `None` when nothing changed and no call was made. A change
    /// that needs a replacement is refused with [`Error::ReplaceRequired`].
    pub fn update(
        &self,
        schema: &KindSchema,
        current: &ConfigTree,
        desired: &ConfigTree,
    ) -> Result<Option<Observed>> {
        let fields = match classify(schema, current, desired) {
            Change::NoOp => return Ok(None),
            Change::Replace(fields) => return Err(Error::ReplaceRequired { fields }),
            Change::InPlaceUpdate(fields) => fields,
        };

        let address = Address::of(schema, desired)?;
        let links = self.ctx.links();
        let patch = build_patch(schema, current, desired, &fields, &links)?;

        log::debug!("updating {address}: {}", fields.join(", "));
        let updated = self
            .client
            .update(schema.kind, address.scope(), &address.name, &patch)?;
        log::info!("updated {address}");
        Ok(Some(flatten(schema, &updated, address.scope(), Some(desired), &links)))
    }

    /// Delete the instance; already gone counts as success
    pub fn delete(&self, schema: &KindSchema, address: &Address) -> Result<()> {
        log::debug!("deleting {address}");
        match self.client.delete(schema.kind, address.scope(), &address.name) {
            Ok(()) => {
                log::info!("deleted {address}");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                log::debug!("{address} was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the instance at `current`, then create `desired`
    pub fn replace(&self, schema: &KindSchema, current: &Address, desired: &ConfigTree) -> Result<Observed> {
        // Validate before destroying anything
        build(schema, desired, &self.ctx.links())?;
        self.delete(schema, current)?;
        self.create(schema, desired)
    }

    /// Adopt an existing remote object
    pub fn import(&self, schema: &KindSchema, address: &Address) -> Result<Observed> {
        self.read(schema, address, None)?.ok_or_else(|| Error::Missing {
            kind: address.kind.clone(),
            name: address.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CLOUD_ACCOUNT, IDENTITY, MemoryApi, SECRET, WIDGET, tree};
    use crate::tree::Leaf;
    use serde_json::json;

    fn ctx() -> ReconcileContext {
        ReconcileContext::new("acme")
    }

    #[test]
    fn test_create_then_read() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let desired = tree(&[("name", json!("prod")), ("domain", json!("example.com"))]);

        let created = controller.create(&WIDGET, &desired).unwrap();
        assert_eq!(created.config, desired);
        assert_eq!(created.computed.self_link.as_deref(), Some("/org/acme/gvc/prod"));

        let address = Address::new("gvc", None, "prod");
        let read = controller.read(&WIDGET, &address, Some(&desired)).unwrap().unwrap();
        assert_eq!(read.config, desired);
    }

    #[test]
    fn test_create_conflict_points_at_import() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let desired = tree(&[("name", json!("prod"))]);

        controller.create(&WIDGET, &desired).unwrap();
        let err = controller.create(&WIDGET, &desired).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert!(err.to_string().contains("import"));
    }

    #[test]
    fn test_create_conflict_on_grouped_kind_names_scope() {
        let api = MemoryApi::default();
        api.insert("identity", Some("prod-gvc"), json!({"name": "worker"}));
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let desired = tree(&[("name", json!("worker")), ("gvc", json!("prod-gvc"))]);

        let err = controller.create(&IDENTITY, &desired).unwrap_err();
        assert!(
            err.to_string()
                .contains("`cplnform import identity worker --scope prod-gvc`")
        );
    }

    #[test]
    fn test_read_missing_is_absent() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "ghost");
        assert_eq!(controller.read(&WIDGET, &address, None).unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_success() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "ghost");
        assert!(controller.delete(&WIDGET, &address).is_ok());
    }

    #[test]
    fn test_backend_errors_surface_verbatim() {
        let api = MemoryApi::default();
        api.fail_next(500, "status: 500, body: boom");
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "prod");

        let err = controller.read(&WIDGET, &address, None).unwrap_err();
        assert_eq!(err.to_string(), "status: 500, body: boom");
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_update_sends_only_changed_fields() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let before = tree(&[
            ("name", json!("prod")),
            ("domain", json!("a.example")),
            ("tags", json!({"a": "1", "b": "2"})),
        ]);
        let observed = controller.create(&WIDGET, &before).unwrap();

        let after = tree(&[
            ("name", json!("prod")),
            ("domain", json!("a.example")),
            ("tags", json!({"b": "3", "c": "4"})),
        ]);
        let updated = controller.update(&WIDGET, &observed.config, &after).unwrap().unwrap();
        assert_eq!(updated.config, after);

        let patch = api.last_patch().unwrap();
        assert_eq!(
            patch,
            json!({"tags": {"a": null, "b": "3", "c": "4", "cpln/managedByCplnform": "true"}})
        );
    }

    #[test]
    fn test_update_noop_makes_no_call() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let t = tree(&[("name", json!("prod"))]);
        assert_eq!(controller.update(&WIDGET, &t, &t).unwrap(), None);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_update_refuses_replacement() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let old = tree(&[("name", json!("w")), ("gvc", json!("a"))]);
        let new = tree(&[("name", json!("w")), ("gvc", json!("b"))]);
        assert!(matches!(
            controller.update(&IDENTITY, &old, &new),
            Err(Error::ReplaceRequired { .. })
        ));
    }

    #[test]
    fn test_replace_deletes_then_creates() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let aws = ConfigTree::new().with_str("role_arn", "arn:aws:iam::1:role/x");
        let gcp = ConfigTree::new().with_str("project_id", "my-project");
        let old = tree(&[("name", json!("c"))]).with("aws", Leaf::Blocks(vec![aws]));
        let new = tree(&[("name", json!("c"))]).with("gcp", Leaf::Blocks(vec![gcp]));

        controller.create(&CLOUD_ACCOUNT, &old).unwrap();
        let address = Address::new("cloudaccount", None, "c");
        let replaced = controller.replace(&CLOUD_ACCOUNT, &address, &new).unwrap();
        assert_eq!(replaced.config, new);

        let calls = api.calls();
        assert_eq!(calls, vec!["create cloudaccount/c", "delete cloudaccount/c", "create cloudaccount/c"]);
    }

    #[test]
    fn test_invalid_config_never_reaches_the_api() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let aws = ConfigTree::new().with_str("role_arn", "arn:aws:iam::1:role/x");
        let gcp = ConfigTree::new().with_str("project_id", "my-project");
        let both = tree(&[("name", json!("c"))])
            .with("aws", Leaf::Blocks(vec![aws]))
            .with("gcp", Leaf::Blocks(vec![gcp]));

        assert!(matches!(
            controller.create(&CLOUD_ACCOUNT, &both),
            Err(Error::VariantSelection { .. })
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_import_adopts_existing_object() {
        let api = MemoryApi::default();
        api.insert(
            "identity",
            Some("prod"),
            json!({
                "name": "worker",
                "aws": {"cloudAccountLink": "/org/acme/cloudaccount/main"},
            }),
        );
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);

        let address = Address::new("identity", Some("prod"), "worker");
        let observed = controller.import(&IDENTITY, &address).unwrap();
        assert_eq!(observed.config.str("gvc"), Some("prod"));
        assert_eq!(observed.config.str("cloud_account_link"), Some("main"));

        let missing = Address::new("identity", Some("prod"), "ghost");
        assert!(matches!(
            controller.import(&IDENTITY, &missing),
            Err(Error::Missing { .. })
        ));
    }

    #[test]
    fn test_update_clears_dropped_block_field() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let lb = |block: ConfigTree| tree(&[("name", json!("prod"))]).with("load_balancer", Leaf::Blocks(vec![block]));
        let before = lb(ConfigTree::new()
            .with("dedicated", Leaf::Bool(true))
            .with("trusted_proxies", Leaf::Int(2)));
        let after = lb(ConfigTree::new().with("dedicated", Leaf::Bool(true)));

        let observed = controller.create(&WIDGET, &before).unwrap();
        let updated = controller.update(&WIDGET, &observed.config, &after).unwrap().unwrap();
        assert_eq!(
            api.last_patch().unwrap()["spec"],
            json!({"loadBalancer": {"dedicated": true, "trustedProxies": null}})
        );
        assert_eq!(updated.config, after);
        assert_eq!(classify(&WIDGET, &updated.config, &after), Change::NoOp);
    }

    #[test]
    fn test_update_clears_dropped_dictionary_key() {
        let api = MemoryApi::default();
        let ctx = ctx();
        let controller = Controller::new(&api, &ctx);
        let dictionary = |pairs: &[(&str, &str)]| {
            let map = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
            tree(&[("name", json!("env"))]).with("dictionary", Leaf::Map(map))
        };
        let before = dictionary(&[("PORT", "8080"), ("DEBUG", "true")]);
        let after = dictionary(&[("PORT", "8080")]);

        let observed = controller.create(&SECRET, &before).unwrap();
        let updated = controller.update(&SECRET, &observed.config, &after).unwrap().unwrap();
        assert_eq!(
            api.last_patch().unwrap()["data"],
            json!({"PORT": "8080", "DEBUG": null})
        );
        assert_eq!(updated.config, after);
        assert_eq!(classify(&SECRET, &updated.config, &after), Change::NoOp);
    }
}
