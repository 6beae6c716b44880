//! Execution engine - applies planned changes with bounded parallelism

use crate::address::Address;
use crate::context::{ConfirmCallback, ProgressCallback};
use crate::lifecycle::Controller;
use crate::planner::{Action, ExecutionPlan, PlannedChange};
use crate::transform::Observed;
use crate::tree::ConfigTree;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// What happened to one instance, and the record to keep for it
#[derive(Debug, Clone)]
pub struct Outcome {
    pub address: Address,
    pub result: ApplyResult,
    /// State to record; `None` means the instance no longer exists
    pub record: Option<Observed>,
}

/// Outcomes for a whole plan
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<Outcome>,
}

impl ExecutionReport {
    fn push(&mut self, outcome: Outcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }
}

/// Execute a plan with the given options and callbacks
///
/// Unchanged instances are reported with their refreshed state so the host
/// can persist it. Failures are recorded per instance; other instances
/// continue.
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    controller: &Controller<'_>,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecutionReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let mut report = ExecutionReport::default();

    for change in plan.changes.iter().filter(|c| !c.action.is_change()) {
        report.push(Outcome {
            address: change.address.clone(),
            result: ApplyResult::NoChange,
            record: change.current.clone(),
        });
    }
    for failure in &plan.failures {
        report.summary.add_result(&ApplyResult::Failed {
            error: failure.error.clone(),
        });
    }

    let pending: Vec<&PlannedChange> = plan.pending().collect();
    if pending.is_empty() {
        return Ok(report);
    }

    let skip_reason = if opts.dry_run {
        Some("Dry run")
    } else if !confirm.confirm("Apply changes?")? {
        Some("Declined")
    } else {
        None
    };
    if let Some(reason) = skip_reason {
        for change in pending {
            report.push(Outcome {
                address: change.address.clone(),
                result: ApplyResult::Skipped {
                    reason: reason.to_string(),
                },
                record: change.current.clone(),
            });
        }
        return Ok(report);
    }

    progress.on_batch_start(pending.len());
    for outcome in execute_batch(&pending, controller, opts.jobs, progress)? {
        report.push(outcome);
    }
    progress.on_batch_complete();

    Ok(report)
}

/// Execute a batch of changes
fn execute_batch<P: ProgressCallback>(
    changes: &[&PlannedChange],
    controller: &Controller<'_>,
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    if jobs <= 1 || changes.len() == 1 {
        // Sequential execution
        let mut outcomes = Vec::with_capacity(changes.len());
        for change in changes {
            let id = change.address.to_string();
            progress.on_resource_start(&id, &change.description());
            let outcome = apply_change(controller, change);
            progress.on_resource_complete(&id, &outcome.result);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    } else {
        execute_parallel(changes, controller, jobs, progress)
    }
}

/// Execute changes in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    changes: &[&PlannedChange],
    controller: &Controller<'_>,
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create thread pool")?;

    // Progress is not thread-safe; report once everything has finished
    let outcomes: Vec<Outcome> = pool.install(|| {
        changes
            .par_iter()
            .map(|change| apply_change(controller, change))
            .collect()
    });

    for outcome in &outcomes {
        progress.on_resource_complete(&outcome.address.to_string(), &outcome.result);
    }

    Ok(outcomes)
}

/// Apply a single change, turning errors into a failed outcome
fn apply_change(controller: &Controller<'_>, change: &PlannedChange) -> Outcome {
    let (result, record) = match try_apply(controller, change) {
        Ok(applied) => applied,
        Err(e) => {
            log::warn!("{} failed: {e:#}", change.address);
            (
                ApplyResult::Failed {
                    error: format!("{e:#}"),
                },
                change.current.clone(),
            )
        }
    };
    Outcome {
        address: change.address.clone(),
        result,
        record,
    }
}

fn try_apply(controller: &Controller<'_>, change: &PlannedChange) -> Result<(ApplyResult, Option<Observed>)> {
    let schema = change.schema;
    match &change.action {
        Action::Create => {
            let observed = controller.create(schema, desired(change)?)?;
            Ok((ApplyResult::Created, Some(observed)))
        }
        Action::Update(_) => {
            let current = change
                .current
                .as_ref()
                .with_context(|| format!("{} has no current state to update", change.address))?;
            match controller.update(schema, &current.config, desired(change)?)? {
                Some(observed) => Ok((ApplyResult::Modified, Some(observed))),
                None => Ok((ApplyResult::NoChange, Some(current.clone()))),
            }
        }
        Action::Replace(_) => {
            let observed = controller.replace(schema, &change.address, desired(change)?)?;
            Ok((ApplyResult::Replaced, Some(observed)))
        }
        Action::Delete => {
            controller.delete(schema, &change.address)?;
            Ok((ApplyResult::Removed, None))
        }
        Action::NoOp => Ok((ApplyResult::NoChange, change.current.clone())),
    }
}

fn desired(change: &PlannedChange) -> Result<&ConfigTree> {
    change
        .desired
        .as_ref()
        .with_context(|| format!("{} has no declared state", change.address))
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(
    plan: &ExecutionPlan,
    controller: &Controller<'_>,
    opts: &ExecuteOptions,
) -> Result<ExecutionReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, controller, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress, ReconcileContext};
    use crate::planner::plan_change;
    use crate::testing::{MemoryApi, WIDGET, tree};
    use serde_json::json;

    fn plan_for(controller: &Controller<'_>, names: &[&str]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for name in names {
            let address = Address::new("gvc", None, *name);
            let desired = tree(&[("name", json!(name))]);
            plan.push(plan_change(controller, &WIDGET, address, None, Some(desired)).unwrap());
        }
        plan
    }

    #[test]
    fn test_execute_empty_plan() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let report = execute_simple(&ExecutionPlan::new(), &controller, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_with_changes_in_parallel() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let plan = plan_for(&controller, &["a", "b", "c"]);

        let report = execute_simple(&plan, &controller, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.created, 3);
        assert!(report.outcomes.iter().all(|o| o.record.is_some()));
        assert_eq!(api.len(), 3);
    }

    #[test]
    fn test_execute_no_changes() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let desired = tree(&[("name", json!("prod"))]);
        let observed = controller.create(&WIDGET, &desired).unwrap();

        let mut plan = ExecutionPlan::new();
        let address = Address::new("gvc", None, "prod");
        plan.push(plan_change(&controller, &WIDGET, address, Some(&observed), Some(desired)).unwrap());

        let report = execute_simple(&plan, &controller, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.no_change, 1);
        assert_eq!(report.summary.total_changes(), 0);
        assert!(report.outcomes[0].record.is_some());
    }

    #[test]
    fn test_declined_and_dry_run_skip() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let plan = plan_for(&controller, &["a"]);

        let declined = execute(
            &plan,
            &controller,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(declined.summary.skipped, 1);

        let dry = ExecuteOptions {
            dry_run: true,
            ..ExecuteOptions::default()
        };
        let report = execute(&plan, &controller, &dry, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(api.len(), 0);
    }

    #[test]
    fn test_failure_does_not_stop_others() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let plan = plan_for(&controller, &["a", "b"]);
        api.insert("gvc", None, json!({"name": "a"}));

        let sequential = ExecuteOptions {
            jobs: 1,
            ..ExecuteOptions::default()
        };
        let report = execute_simple(&plan, &controller, &sequential).unwrap();
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.failed, 1);
        let failed = report
            .outcomes
            .iter()
            .find(|o| !o.result.is_success())
            .unwrap();
        assert_eq!(failed.address.name, "a");
        assert!(matches!(&failed.result, ApplyResult::Failed { error } if error.contains("import")));
    }

    #[test]
    fn test_delete_clears_record() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let desired = tree(&[("name", json!("prod"))]);
        let observed = controller.create(&WIDGET, &desired).unwrap();

        let mut plan = ExecutionPlan::new();
        let address = Address::new("gvc", None, "prod");
        plan.push(plan_change(&controller, &WIDGET, address, Some(&observed), None).unwrap());

        let report = execute_simple(&plan, &controller, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.removed, 1);
        assert!(report.outcomes[0].record.is_none());
        assert_eq!(api.len(), 0);
    }
}
