//! Local state: the last observed record of every managed instance
//!
//! The file maps resource addresses to the declared-form configuration and
//! the server-computed attributes seen after the last successful operation.
//! It is what lets `plan` notice instances removed from the configuration.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reconcile::{Address, Computed, ExecutionReport, KindSchema, Observed, tree};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::resource;

/// Current state file format
const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Everything cplnform manages for one org
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    pub version: u32,

    /// Org the records belong to; set on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Records keyed by address
    #[serde(default)]
    pub resources: BTreeMap<String, StateRecord>,

    /// Last time the state was saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Last observed record of one instance
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateRecord {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    pub name: String,

    /// Declared-form attributes as flattened from the backend
    #[serde(default)]
    pub config: Map<String, Value>,

    #[serde(default)]
    pub computed: Computed,

    pub updated_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn address(&self) -> Address {
        Address::new(&self.kind, self.scope.as_deref(), &self.name)
    }

    /// Parse the record back into an observation of `schema`
    pub fn observed(&self, schema: &KindSchema) -> Result<Observed> {
        let config = tree::parse(schema, &self.config)
            .with_context(|| format!("Corrupt state record for {}", self.address()))?;
        Ok(Observed {
            config,
            computed: self.computed.clone(),
        })
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            org: None,
            resources: BTreeMap::new(),
            last_updated: None,
        }
    }
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!("Loaded {} records from {}", state.resources.len(), path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Some(Utc::now());
        let content = serde_json::to_string_pretty(&self).context("Failed to serialize state")?;

        fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Bind the state to an org, refusing to mix orgs in one file
    pub fn bind_org(&mut self, org: &str) -> Result<()> {
        match &self.org {
            Some(existing) if existing != org && !self.resources.is_empty() => bail!(
                "State belongs to org '{existing}', not '{org}'. Use a different --state file."
            ),
            _ => {
                self.org = Some(org.to_string());
                Ok(())
            }
        }
    }

    pub fn get(&self, address: &Address) -> Option<&StateRecord> {
        self.resources.get(&address.to_string())
    }

    pub fn records(&self) -> impl Iterator<Item = &StateRecord> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Store the latest observation of an instance
    pub fn record(&mut self, address: &Address, schema: &KindSchema, observed: &Observed) {
        let record = StateRecord {
            kind: address.kind.clone(),
            scope: address.scope.clone(),
            name: address.name.clone(),
            config: tree::render(schema, &observed.config),
            computed: observed.computed.clone(),
            updated_at: Utc::now(),
        };
        self.resources.insert(address.to_string(), record);
    }

    pub fn remove(&mut self, address: &Address) -> Option<StateRecord> {
        self.resources.remove(&address.to_string())
    }

    /// Fold an execution report into the state
    ///
    /// Instances with a record are stored, instances without one are
    /// forgotten. Returns the number of records touched.
    pub fn apply_report(&mut self, report: &ExecutionReport) -> Result<usize> {
        let mut touched = 0;
        for outcome in &report.outcomes {
            match &outcome.record {
                Some(observed) => {
                    let schema = resource::lookup(&outcome.address.kind)?;
                    self.record(&outcome.address, schema, observed);
                }
                None => {
                    self.remove(&outcome.address);
                }
            }
            touched += 1;
        }
        Ok(touched)
    }
}

// ============================================================================
// Tests
// ============================================================================
