//! Progress reporting for apply and destroy.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyResult, ProgressCallback};

/// Progress bar over one batch of API changes
pub struct ApplyProgress {
    bar: Option<ProgressBar>,
    verbose: bool,
}

impl ApplyProgress {
    pub fn new(verbose: bool) -> Self {
        Self { bar: None, verbose }
    }
}

/// Symbol printed for a finished change
pub fn result_symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Replaced | ApplyResult::Removed => {
            "✓".green()
        }
        ApplyResult::Failed { .. } => "✗".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&mut self, count: usize) {
        let bar = ProgressBar::new(count as u64);
        bar.set_style(bar_style());
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, _id: &str, description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(description.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let Some(bar) = &self.bar else {
            return;
        };
        let line = match result {
            ApplyResult::Failed { error } => format!("  {} {id}: {}", result_symbol(result), error.red()),
            _ if self.verbose => format!("  {} {id}", result_symbol(result)),
            _ => String::new(),
        };
        if !line.is_empty() {
            bar.println(line);
        }
        bar.set_message(format!("{} {id}", result_symbol(result)));
        bar.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_lifecycle_without_terminal() {
        let mut progress = ApplyProgress::new(true);
        progress.on_resource_complete("gvc.prod", &ApplyResult::Created);
        progress.on_batch_start(2);
        progress.on_resource_start("gvc.prod", "create gvc.prod");
        progress.on_resource_complete("gvc.prod", &ApplyResult::Created);
        progress.on_resource_complete(
            "gvc.old",
            &ApplyResult::Failed {
                error: "status: 500, body: boom".into(),
            },
        );
        assert_eq!(progress.bar.as_ref().map(ProgressBar::position), Some(2));
        progress.on_batch_complete();
        assert!(progress.bar.is_none());
    }

    #[test]
    fn test_result_symbols() {
        colored::control::set_override(false);
        assert_eq!(result_symbol(&ApplyResult::Created).to_string(), "✓");
        assert_eq!(
            result_symbol(&ApplyResult::Skipped {
                reason: "Dry run".into()
            })
            .to_string(),
            "⊘"
        );
    }
}
