use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::paths::{DEFAULT_CONFIG_FILE, DEFAULT_STATE_FILE, ENV_ENDPOINT, ENV_ORG, ENV_TOKEN};

#[derive(Parser)]
#[command(name = "cplnform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative reconciler for Control Plane resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Org to manage (overrides [provider] org)
    #[arg(long, env = ENV_ORG, global = true)]
    pub org: Option<String>,

    /// Management API endpoint (overrides [provider] endpoint)
    #[arg(long, env = ENV_ENDPOINT, global = true)]
    pub endpoint: Option<String>,

    /// API token
    #[arg(long, env = ENV_TOKEN, global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Declared configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: String,

    /// Local state file
    #[arg(long, default_value = DEFAULT_STATE_FILE, global = true)]
    pub state: String,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the org match the declared configuration
    Apply(ApplyArgs),

    /// Delete every instance recorded in state
    Destroy(DestroyArgs),

    /// Adopt an existing instance into state
    Import(ImportArgs),

    /// Show recorded state
    Show(ShowArgs),

    /// List supported resource kinds and their attributes
    Kinds {
        /// Show attributes of one kind only
        kind: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan matching addresses: kind, kind.name or kind.scope.name
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply matching addresses: kind, kind.name or kind.scope.name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel API jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy matching addresses
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel API jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Resource kind, e.g. gvc or identity
    pub kind: String,

    /// Name of the existing instance
    pub name: String,

    /// Gvc holding the instance, for gvc-scoped kinds
    #[arg(short, long)]
    pub scope: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Address to show; all records when omitted
    pub address: Option<String>,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "cplnform", "apply", "--yes", "--dry-run", "--jobs", "8", "--target", "gvc.prod", "--org", "acme",
        ])
        .unwrap();
        assert_eq!(cli.org.as_deref(), Some("acme"));
        match cli.command {
            Command::Apply(args) => {
                assert!(args.yes && args.dry_run);
                assert_eq!(args.jobs, 8);
                assert_eq!(args.target.as_deref(), Some("gvc.prod"));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_import_with_scope() {
        let cli = Cli::try_parse_from(["cplnform", "import", "identity", "worker", "--scope", "prod"]).unwrap();
        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.kind, "identity");
                assert_eq!(args.scope.as_deref(), Some("prod"));
            }
            _ => panic!("expected import"),
        }
        assert_eq!(cli.config, DEFAULT_CONFIG_FILE);
        assert_eq!(cli.state, DEFAULT_STATE_FILE);
    }
}
