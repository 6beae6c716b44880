use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::Address;
use serde_json::Value;

use crate::Context;
use crate::cli::ShowArgs;
use crate::paths;
use crate::state::{State, StateRecord};
use crate::ui;

/// Print recorded state; never touches the API
pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let state = State::load(&paths::expand(&ctx.state))?;

    let records: Vec<&StateRecord> = match &args.address {
        Some(address) => {
            let address: Address = address.parse()?;
            let record = state
                .get(&address)
                .with_context(|| format!("{address} is not in state"))?;
            vec![record]
        }
        None => state.records().collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        ui::info("No resources in state");
        return Ok(());
    }

    let org = state.org.as_deref().unwrap_or("(unbound)");
    ui::header(&format!("State for {org} ({})", ui::count(records.len(), "resource")));
    for record in records {
        show_record(record);
    }
    println!();
    Ok(())
}

fn show_record(record: &StateRecord) {
    ui::section(&record.address().to_string());
    if let Some(link) = &record.computed.self_link {
        ui::kv("self_link", link);
    }
    if let Some(version) = record.computed.version {
        ui::kv("version", &version.to_string());
    }
    ui::kv("updated", &record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    for (key, value) in &record.config {
        ui::kv(key, &compact(value));
    }
    for (key, value) in &record.computed.status {
        ui::kv(key, &compact(value).dimmed().to_string());
    }
}

/// One-line rendering of a recorded value
fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
