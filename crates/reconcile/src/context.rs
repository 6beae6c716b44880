//! Reconcile context and provider traits
//!
//! These traits allow the reconcile crate to be used without
//! depending on specific implementations of progress or prompts.

use crate::link::LinkResolver;
use crate::types::ApplyResult;
use anyhow::Result;

/// Read-only settings shared by every reconciliation in a run
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    org: String,
}

impl ReconcileContext {
    pub fn new(org: impl Into<String>) -> Self {
        Self { org: org.into() }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// Link resolver bound to this org
    pub fn links(&self) -> LinkResolver<'_> {
        LinkResolver::new(&self.org)
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when starting to apply a batch of changes
    fn on_batch_start(&mut self, count: usize);

    /// Called when starting to apply a single change
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a change completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_links_use_org() {
        let ctx = ReconcileContext::new("acme");
        assert_eq!(ctx.org(), "acme");
        assert_eq!(ctx.links().self_link("gvc", None, "prod"), "/org/acme/gvc/prod");
    }

    #[test]
    fn test_auto_callbacks() {
        assert!(AutoConfirm.confirm("go?").unwrap());
        assert!(!AutoDecline.confirm("go?").unwrap());
    }
}
