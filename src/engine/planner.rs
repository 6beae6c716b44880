//! Plan construction - declared configuration and local state to a plan

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{Address, Controller, ExecutionPlan, KindSchema, Observed, plan_change};
use std::time::Duration;

use crate::config::DeclaredConfig;
use crate::resource;
use crate::state::{State, StateRecord};

/// Build the plan for declared resources plus records no longer declared
///
/// Every instance is refreshed from the backend first. Instances that cannot
/// be planned (invalid configuration, API errors) become plan failures; the
/// rest of the plan is unaffected.
pub fn build_plan(
    controller: &Controller<'_>,
    config: &DeclaredConfig,
    state: &State,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();
    let spinner = refresh_spinner(config.resources.len() + state.len());

    for declared in &config.resources {
        spinner.set_message(declared.address.to_string());
        let prior = match prior_of(state.get(&declared.address), declared.schema) {
            Ok(prior) => prior,
            Err(e) => {
                plan.push_failure(declared.address.clone(), format!("{e:#}"));
                spinner.inc(1);
                continue;
            }
        };
        plan_one(
            &mut plan,
            controller,
            declared.schema,
            declared.address.clone(),
            prior.as_ref(),
            Some(&declared.tree),
        );
        spinner.inc(1);
    }

    for record in state.records() {
        let address = record.address();
        if config.contains(&address) {
            continue;
        }
        spinner.set_message(address.to_string());
        let planned = resource::lookup(&record.kind)
            .map_err(anyhow::Error::from)
            .and_then(|schema| Ok((schema, record.observed(schema)?)));
        match planned {
            Ok((schema, prior)) => plan_one(&mut plan, controller, schema, address, Some(&prior), None),
            Err(e) => plan.push_failure(address, format!("{e:#}")),
        }
        spinner.inc(1);
    }

    spinner.finish_and_clear();
    Ok(plan.filter_by_target(target))
}

/// Plan the deletion of every recorded instance
pub fn build_destroy_plan(controller: &Controller<'_>, state: &State, target: Option<&str>) -> Result<ExecutionPlan> {
    build_plan(controller, &DeclaredConfig::default(), state, target)
}

fn plan_one(
    plan: &mut ExecutionPlan,
    controller: &Controller<'_>,
    schema: &'static KindSchema,
    address: Address,
    prior: Option<&Observed>,
    desired: Option<&reconcile::ConfigTree>,
) {
    match plan_change(controller, schema, address.clone(), prior, desired.cloned()) {
        Ok(change) => plan.push(change),
        Err(e) => {
            log::debug!("planning {address} failed: {e}");
            plan.push_failure(address, e);
        }
    }
}

fn prior_of(record: Option<&StateRecord>, schema: &KindSchema) -> Result<Option<Observed>> {
    record.map(|r| r.observed(schema)).transpose()
}

fn refresh_spinner(total: usize) -> ProgressBar {
    let spinner = ProgressBar::new(total as u64);
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Refreshing {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
