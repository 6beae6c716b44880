//! Subcommand implementations
//!
//! Every command that talks to the API opens a [`Session`]: resolved
//! provider settings, the declared configuration, the local state file and
//! a backend bound to one org.

pub mod apply;
pub mod destroy;
pub mod import;
pub mod kinds;
pub mod plan;
pub mod show;

use anyhow::{Context as AnyhowContext, Result, bail};
use cplnkit::{ClientConfig, DEFAULT_ENDPOINT};
use reconcile::{Controller, ExecuteSummary, ExecutionReport, ReconcileContext};
use std::path::PathBuf;

use crate::Context;
use crate::backend::CplnBackend;
use crate::config::{DeclaredConfig, ProviderConfig};
use crate::engine::print_summary;
use crate::paths;
use crate::state::State;
use crate::ui;

/// Provider settings after precedence is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub org: String,
    pub endpoint: String,
    pub token: String,
}

impl Settings {
    /// Resolve settings: flag or environment, then `[provider]`, then default
    pub fn resolve(ctx: &Context, provider: &ProviderConfig) -> Result<Self> {
        let org = ctx
            .org
            .clone()
            .or_else(|| provider.org.clone())
            .filter(|org| !org.is_empty())
            .context("No org configured. Pass --org, set CPLN_ORG or add org to [provider]")?;
        let endpoint = ctx
            .endpoint
            .clone()
            .or_else(|| provider.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let token = ctx
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .context("No API token. Pass --token or set CPLN_TOKEN")?;
        Ok(Self { org, endpoint, token })
    }
}

/// Everything a command needs to reconcile one org
pub struct Session {
    pub settings: Settings,
    pub config: DeclaredConfig,
    pub state: State,
    state_path: PathBuf,
    quiet: bool,
    backend: CplnBackend,
    reconcile: ReconcileContext,
}

impl Session {
    /// Open a session
    ///
    /// With `require_config` a missing configuration file is an error;
    /// otherwise it is only read for its `[provider]` table when present.
    pub fn open(ctx: &Context, require_config: bool) -> Result<Self> {
        let config_path = paths::expand(&ctx.config);
        let config = if require_config || config_path.exists() {
            DeclaredConfig::load(&config_path)?
        } else {
            DeclaredConfig::default()
        };

        let settings = Settings::resolve(ctx, &config.provider)?;
        log::debug!("Using org {} at {}", settings.org, settings.endpoint);

        let state_path = paths::expand(&ctx.state);
        let mut state = State::load(&state_path)?;
        state.bind_org(&settings.org)?;

        let client_config =
            ClientConfig::new(&settings.org, &settings.token).with_endpoint(&settings.endpoint);
        Ok(Self {
            backend: CplnBackend::new(client_config),
            reconcile: ReconcileContext::new(&settings.org),
            settings,
            config,
            state,
            state_path,
            quiet: ctx.quiet,
        })
    }

    pub fn controller(&self) -> Controller<'_> {
        Controller::new(&self.backend, &self.reconcile)
    }

    pub fn save_state(&mut self) -> Result<()> {
        self.state.save(&self.state_path)
    }

    /// Record a report in state, print the summary and fail on errors
    pub fn finish(&mut self, report: &ExecutionReport, dry_run: bool) -> Result<()> {
        if !dry_run {
            let touched = self.state.apply_report(report)?;
            self.save_state()?;
            log::debug!("Recorded {touched} instances in {}", self.state_path.display());
        }

        if !self.quiet && has_activity(&report.summary) {
            print_summary(&report.summary, dry_run);
        }
        if !report.summary.is_success() {
            bail!("{} failed", ui::count(report.summary.failed, "resource"));
        }
        Ok(())
    }
}

fn has_activity(summary: &ExecuteSummary) -> bool {
    summary.total_changes() + summary.skipped + summary.failed > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        Context {
            verbose: 0,
            quiet: false,
            org: None,
            endpoint: None,
            token: Some("secret".into()),
            config: paths::DEFAULT_CONFIG_FILE.into(),
            state: paths::DEFAULT_STATE_FILE.into(),
        }
    }

    #[test]
    fn test_flags_win_over_provider_table() {
        let provider = ProviderConfig {
            org: Some("from-file".into()),
            endpoint: Some("https://file.example".into()),
        };
        let ctx = Context {
            org: Some("from-flag".into()),
            ..context()
        };
        let settings = Settings::resolve(&ctx, &provider).unwrap();
        assert_eq!(settings.org, "from-flag");
        assert_eq!(settings.endpoint, "https://file.example");
    }

    #[test]
    fn test_defaults_and_missing_values() {
        let provider = ProviderConfig {
            org: Some("acme".into()),
            endpoint: None,
        };
        let settings = Settings::resolve(&context(), &provider).unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);

        let err = Settings::resolve(&context(), &ProviderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No org"));

        let ctx = Context {
            token: None,
            ..context()
        };
        assert!(Settings::resolve(&ctx, &provider).unwrap_err().to_string().contains("token"));
    }

    #[test]
    fn test_open_binds_state_to_org() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("cpln.toml");
        std::fs::write(&config, "[provider]\norg = \"acme\"\n\n[[resource]]\nkind = \"group\"\nname = \"ops\"\n").unwrap();
        let ctx = Context {
            config: config.display().to_string(),
            state: dir.path().join("state.json").display().to_string(),
            ..context()
        };

        let session = Session::open(&ctx, true).unwrap();
        assert_eq!(session.settings.org, "acme");
        assert_eq!(session.config.resources.len(), 1);
        assert_eq!(session.state.org.as_deref(), Some("acme"));
    }

    #[test]
    fn test_missing_config_is_optional_for_state_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            org: Some("acme".into()),
            config: dir.path().join("absent.toml").display().to_string(),
            state: dir.path().join("state.json").display().to_string(),
            ..context()
        };
        assert!(Session::open(&ctx, true).is_err());
        assert!(Session::open(&ctx, false).unwrap().config.resources.is_empty());
    }
}
