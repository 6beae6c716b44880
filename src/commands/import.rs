//! Adopt an existing instance into state
//!
//! Import is what a create conflict points the operator to: the instance
//! already exists remotely, so it is read once and recorded as managed.

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use reconcile::{Address, KindSchema, Observed, Scope, tree};
use serde_json::{Map, Value, json};

use crate::Context;
use crate::cli::ImportArgs;
use crate::resource;
use crate::ui;

use super::Session;

pub fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    let schema = resource::lookup(&args.kind)?;
    let address = import_address(schema, &args.name, args.scope.as_deref())?;

    let mut session = Session::open(ctx, false)?;
    if session.state.get(&address).is_some() {
        bail!("{address} is already managed");
    }

    let observed = session
        .controller()
        .import(schema, &address)
        .with_context(|| format!("Could not import {address}"))?;
    session.state.record(&address, schema, &observed);
    session.save_state()?;
    ui::success(&format!("Imported {}", address.to_string().bold()));

    if !session.config.contains(&address) {
        println!();
        ui::warn(&format!(
            "{address} is not declared; the next apply would delete it. Declare it as:"
        ));
        println!();
        println!("{}", declaration(schema, &observed)?.dimmed());
    }
    Ok(())
}

/// Address of an instance to import, checking the scope matches the kind
fn import_address(schema: &KindSchema, name: &str, scope: Option<&str>) -> Result<Address> {
    match (schema.scope, scope) {
        (Scope::Grouped { key, .. }, None) => {
            bail!("{} instances live in a {key}; pass --scope <{key}>", schema.kind)
        }
        (Scope::Org, Some(_)) => bail!("{} instances are not scoped; drop --scope", schema.kind),
        _ => Ok(Address::new(schema.kind, scope, name)),
    }
}

/// `[[resource]]` table declaring an observed instance
fn declaration(schema: &KindSchema, observed: &Observed) -> Result<String> {
    let mut table = Map::new();
    table.insert("kind".to_string(), json!(schema.kind));
    table.extend(tree::render(schema, &observed.config));
    let document = json!({ "resource": [Value::Object(table)] });
    toml::to_string(&document).context("Could not render declaration")
}
