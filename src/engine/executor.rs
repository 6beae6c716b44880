//! Execution engine - cplnform executor with UI integration

use anyhow::Result;
use colored::Colorize;
use reconcile::{
    Action, AutoConfirm, AutoDecline, ConfirmCallback, Controller, ExecuteOptions, ExecuteSummary,
    ExecutionPlan, ExecutionReport, PlannedChange, execute,
};
use std::collections::BTreeMap;

use crate::progress::ApplyProgress;
use crate::resource;
use crate::ui;

/// Options for apply and destroy (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Number of parallel API jobs
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            yes: false,
            jobs: 4,
            verbose: false,
        }
    }
}

/// Interactive confirmation on the terminal
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new().with_prompt(prompt).default(true).interact()?;
        Ok(confirmed)
    }
}

/// Apply a plan in dependency waves
///
/// Creates, updates and replacements run first, link targets before the
/// kinds that reference them. Deletions run last in the reverse order.
/// Changes within one wave run in parallel. Confirmation is asked once for
/// the whole plan.
pub fn apply<C: ConfirmCallback>(
    plan: &ExecutionPlan,
    controller: &Controller<'_>,
    opts: &ApplyOptions,
    confirm: &mut C,
) -> Result<ExecutionReport> {
    let mut report = ExecutionReport::default();
    for failure in &plan.failures {
        report.summary.add_result(&reconcile::ApplyResult::Failed {
            error: failure.error.clone(),
        });
    }

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs.max(1),
        verbose: opts.verbose,
    };
    let changes_only = ExecutionPlan {
        changes: plan.changes.clone(),
        failures: Vec::new(),
    };

    let declined = plan.has_changes()
        && !opts.dry_run
        && !opts.yes
        && !confirm.confirm("Apply these changes?")?;
    if !plan.has_changes() || opts.dry_run || declined {
        // Nothing to run: the engine reports no-ops and skips
        let mut progress = ApplyProgress::new(opts.verbose);
        let skipped = execute(&changes_only, controller, &exec_opts, &mut progress, &mut AutoDecline)?;
        merge(&mut report, skipped);
        if declined {
            println!();
            println!("  {} Aborted", "✗".red());
        }
        return Ok(report);
    }

    let waves = split_waves(&plan.changes);
    log::debug!("Applying {} changes in {} waves", plan.pending().count(), waves.len());
    for wave in waves {
        let wave_plan = ExecutionPlan {
            changes: wave,
            failures: Vec::new(),
        };
        let mut progress = ApplyProgress::new(opts.verbose);
        let wave_report = execute(&wave_plan, controller, &exec_opts, &mut progress, &mut AutoConfirm)?;
        merge(&mut report, wave_report);
    }

    Ok(report)
}

fn merge(report: &mut ExecutionReport, other: ExecutionReport) {
    report.summary.merge(&other.summary);
    report.outcomes.extend(other.outcomes);
}

/// Group changes into ordered waves
fn split_waves(changes: &[PlannedChange]) -> Vec<Vec<PlannedChange>> {
    let mut waves: BTreeMap<(bool, usize), Vec<PlannedChange>> = BTreeMap::new();
    for change in changes {
        let rank = resource::rank(&change.address.kind);
        let key = match change.action {
            Action::Delete => (true, usize::MAX - rank),
            _ => (false, rank),
        };
        waves.entry(key).or_default().push(change.clone());
    }
    waves.into_values().collect()
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Configuration applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Configuration applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", ui::count(summary.created, "resource"));
    }
    if summary.modified > 0 {
        println!("    • {} modified", ui::count(summary.modified, "resource"));
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", ui::count(summary.replaced, "resource"));
    }
    if summary.removed > 0 {
        println!("    • {} removed", ui::count(summary.removed, "resource"));
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::count(summary.skipped, "resource"));
    }
    if summary.failed > 0 {
        println!("    • {} failed", ui::count(summary.failed, "resource").red());
    }
}
