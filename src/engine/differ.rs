//! Plan display - what apply or destroy will change

use colored::{ColoredString, Colorize};
use reconcile::{Action, DiffSummary, ExecutionPlan, PlannedChange, group_by_kind};

use crate::resource;
use crate::ui;

/// Display a plan in a bordered panel
pub fn display_plan(plan: &ExecutionPlan) {
    for line in plan_lines(plan) {
        println!("{line}");
    }
}

/// Lines of the plan panel, without a trailing newline
pub fn plan_lines(plan: &ExecutionPlan) -> Vec<String> {
    let mut lines = vec![String::new()];

    if !plan.has_changes() && plan.failures.is_empty() {
        lines.push(format!(
            "  {} No changes. {} up to date",
            "✓".green(),
            ui::count(plan.total_resources(), "resource")
        ));
        return lines;
    }

    lines.push(format!("┌─ {} ─────────────────────────────────────────┐", "Plan".bold()));
    lines.push("│".to_string());

    let mut groups: Vec<_> = group_by_kind(&plan.changes).into_iter().collect();
    groups.sort_by_key(|(kind, _)| resource::rank(kind));
    for (kind, changes) in groups {
        let title = resource::lookup(&kind)
            .map(|schema| schema.description.to_string())
            .unwrap_or_else(|_| kind.clone());
        lines.push(format!("│ {}", title.bold()));
        for change in changes {
            lines.push(format!("│   {} {}", symbol(&change.action), change.address));
            lines.extend(field_lines(change));
        }
        lines.push("│".to_string());
    }

    if !plan.failures.is_empty() {
        lines.push(format!("│ {}", "Could not plan".red().bold()));
        for failure in &plan.failures {
            lines.push(format!("│   {} {}: {}", "✗".red(), failure.address, failure.error.dimmed()));
        }
        lines.push("│".to_string());
    }

    let summary = DiffSummary::from_changes(&plan.changes);
    lines.push("├─────────────────────────────────────────────────────┤".to_string());
    lines.push(format!(
        "│ Plan: {} to create, {} to update, {} to replace, {} to delete",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    ));
    lines.push("└─────────────────────────────────────────────────────┘".to_string());
    lines
}

fn symbol(action: &Action) -> ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Update(_) => "~".yellow(),
        Action::Replace(_) => "-/+".magenta(),
        Action::Delete => "-".red(),
        Action::NoOp => " ".normal(),
    }
}

fn field_lines(change: &PlannedChange) -> Vec<String> {
    let (Some(current), Some(desired)) = (&change.current, &change.desired) else {
        return Vec::new();
    };
    let forces = matches!(change.action, Action::Replace(_));
    change
        .action
        .fields()
        .iter()
        .map(|field| {
            let line = format!(
                "│       {field}: {} → {}",
                current.config.get(field).summary(),
                desired.get(field).summary()
            );
            if forces {
                format!("{} {}", line, "(forces replacement)".red())
            } else {
                line
            }
        })
        .collect()
}
