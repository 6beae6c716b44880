//! Declared configuration (`cpln.toml`)
//!
//! ```toml
//! [provider]
//! org = "acme"
//!
//! [[resource]]
//! kind = "gvc"
//! name = "prod"
//! locations = ["aws-us-west-2"]
//!
//! [[resource]]
//! kind = "identity"
//! gvc = "prod"
//! name = "worker"
//! ```

use anyhow::{Context, Result, bail};
use reconcile::{Address, ConfigTree, KindSchema, tree};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::resource;

/// Key naming the kind of a `[[resource]]` table
const KIND_KEY: &str = "kind";

/// Optional `[provider]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub org: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    provider: ProviderConfig,
    #[serde(default)]
    resource: Vec<toml::Table>,
}

/// One declared instance
#[derive(Debug, Clone)]
pub struct Declared {
    pub address: Address,
    pub schema: &'static KindSchema,
    pub tree: ConfigTree,
}

/// The whole declared configuration, in file order
#[derive(Debug, Clone, Default)]
pub struct DeclaredConfig {
    pub provider: ProviderConfig,
    pub resources: Vec<Declared>,
}

impl DeclaredConfig {
    /// Load and validate the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse configuration text
    ///
    /// Every resource table is typed against its kind; unknown kinds,
    /// unknown attributes and duplicate addresses are rejected.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut seen = BTreeSet::new();
        let mut resources = Vec::with_capacity(raw.resource.len());
        for (index, table) in raw.resource.into_iter().enumerate() {
            let declared = declared(index + 1, table)?;
            if !seen.insert(declared.address.clone()) {
                bail!("resource #{}: {} is declared more than once", index + 1, declared.address);
            }
            resources.push(declared);
        }

        log::debug!("Parsed {} declared resources", resources.len());
        Ok(Self {
            provider: raw.provider,
            resources,
        })
    }

    pub fn get(&self, address: &Address) -> Option<&Declared> {
        self.resources.iter().find(|d| &d.address == address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.get(address).is_some()
    }
}

fn declared(index: usize, table: toml::Table) -> Result<Declared> {
    let mut object = match serde_json::to_value(table)? {
        Value::Object(object) => object,
        _ => bail!("resource #{index} is not a table"),
    };

    let kind = match object.remove(KIND_KEY) {
        Some(Value::String(kind)) => kind,
        Some(other) => bail!("resource #{index}: 'kind' must be a string, found {other}"),
        None => bail!("resource #{index} has no 'kind'"),
    };
    let schema = resource::lookup(&kind).with_context(|| format!("resource #{index}"))?;

    let tree = tree::parse(schema, &object).with_context(|| format!("resource #{index} ({kind})"))?;
    let address = Address::of(schema, &tree).with_context(|| format!("resource #{index} ({kind})"))?;

    Ok(Declared {
        address,
        schema,
        tree,
    })
}

// ============================================================================
// Tests
// ============================================================================
