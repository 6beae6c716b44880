mod backend;
mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub org: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    /// Declared configuration file, before `~` expansion
    pub config: String,
    /// Local state file, before `~` expansion
    pub state: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        org: cli.org,
        endpoint: cli.endpoint,
        token: cli.token,
        config: cli.config,
        state: cli.state,
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Destroy(args) => commands::destroy::run(&ctx, args),
        Command::Import(args) => commands::import::run(&ctx, args),
        Command::Show(args) => commands::show::run(&ctx, args),
        Command::Kinds { kind } => commands::kinds::run(kind.as_deref()),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cplnform", &mut io::stdout());
            Ok(())
        }
    }
}
