//! Describe the supported resource kinds

use anyhow::Result;
use colored::Colorize;
use reconcile::{FieldSpec, FieldType, KindSchema, Payload, Presence, Scope, UpdatePolicy};

use crate::resource::{self, KINDS};
use crate::ui;

pub fn run(kind: Option<&str>) -> Result<()> {
    match kind {
        Some(kind) => describe(resource::lookup(kind)?),
        None => {
            ui::header("Resource Kinds");
            for schema in KINDS {
                println!("  {:<14} {}", schema.kind.bold(), schema.description.dimmed());
            }
            println!();
            ui::dim("Run `cplnform kinds <kind>` for its attributes");
        }
    }
    Ok(())
}

fn describe(schema: &KindSchema) {
    ui::header(&format!("{} - {}", schema.kind, schema.description));

    if let Scope::Grouped { key, parent_kind } = schema.scope {
        ui::kv("scope", &format!("`{key}` names the parent {parent_kind}"));
    }

    ui::section("Attributes");
    for field in schema.all_fields() {
        print_field(field, 1);
    }

    for group in schema.one_of {
        ui::section(&format!("Exactly one of ({})", group.group));
        for variant in group.variants {
            println!("  {:<24} {}", variant.key, type_label(&variant.field_type()).dimmed());
            if let Payload::Fields(fields) = variant.payload {
                for field in fields {
                    print_field(field, 2);
                }
            }
        }
        if group.policy == UpdatePolicy::Replace {
            ui::dim("changing the payload forces replacement");
        }
    }

    if !schema.computed.is_empty() {
        ui::section("Computed");
        for (key, path) in schema.computed {
            println!("  {:<24} {}", key, path.dimmed());
        }
    }
    println!();
}

fn print_field(field: &FieldSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    let width = 26 - indent.len();
    println!(
        "{indent}{:<width$} {} {}",
        field.key,
        type_label(&field.ty).dimmed(),
        flags(field).yellow()
    );
    if let FieldType::Block { fields, .. } = field.ty {
        for nested in fields {
            print_field(nested, depth + 1);
        }
    }
}

fn type_label(ty: &FieldType) -> String {
    match ty {
        FieldType::String => "string".to_string(),
        FieldType::Int => "int".to_string(),
        FieldType::Float => "float".to_string(),
        FieldType::Bool => "bool".to_string(),
        FieldType::StringMap => "map".to_string(),
        FieldType::StringSet => "set".to_string(),
        FieldType::StringList => "list".to_string(),
        FieldType::Tags => "tags".to_string(),
        FieldType::Link(target) => format!("link({})", target.kind),
        FieldType::LinkSet(target) => format!("links({})", target.kind),
        FieldType::Block { max_items: Some(1), .. } => "block".to_string(),
        FieldType::Block { ordered: true, .. } => "blocks".to_string(),
        FieldType::Block { ordered: false, .. } => "blocks (unordered)".to_string(),
    }
}

fn flags(field: &FieldSpec) -> String {
    let mut flags = Vec::new();
    match field.presence {
        Presence::Required => flags.push("required"),
        Presence::OptionalComputed => flags.push("computed default"),
        Presence::Optional => {}
    }
    if field.policy == UpdatePolicy::Replace {
        flags.push("forces replacement");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!("[{}]", flags.join(", "))
    }
}
