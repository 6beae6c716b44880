//! Execution planner - refreshes state and decides what to do per instance

use crate::address::Address;
use crate::diff::{Change, classify};
use crate::error::Result;
use crate::lifecycle::Controller;
use crate::schema::KindSchema;
use crate::transform::{Observed, build};
use crate::tree::ConfigTree;

/// What the executor will do with one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Update(Vec<String>),
    Replace(Vec<String>),
    Delete,
    NoOp,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update(_) => "update",
            Self::Replace(_) => "replace",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        }
    }

    /// Fields driving an update or replacement
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Update(fields) | Self::Replace(fields) => fields,
            Self::Create | Self::Delete | Self::NoOp => &[],
        }
    }
}

/// One instance's planned change
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub address: Address,
    pub schema: &'static KindSchema,
    pub action: Action,
    /// Refreshed remote state, if the object exists
    pub current: Option<Observed>,
    /// Declared state, if the instance is still declared
    pub desired: Option<ConfigTree>,
}

impl PlannedChange {
    /// Human-readable description
    pub fn description(&self) -> String {
        format!("{} {}", self.action.label(), self.address)
    }
}

/// An instance that could not be planned
#[derive(Debug, Clone)]
pub struct PlanFailure {
    pub address: Address,
    pub error: String,
}

/// Planned changes for a whole run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
    pub failures: Vec<PlanFailure>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: PlannedChange) {
        self.changes.push(change);
    }

    pub fn push_failure(&mut self, address: Address, error: impl ToString) {
        self.failures.push(PlanFailure {
            address,
            error: error.to_string(),
        });
    }

    /// Filter plan to only include changes matching a predicate
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Address) -> bool,
    {
        Self {
            changes: self
                .changes
                .into_iter()
                .filter(|c| predicate(&c.address))
                .collect(),
            failures: self
                .failures
                .into_iter()
                .filter(|f| predicate(&f.address))
                .collect(),
        }
    }

    /// Filter plan to only include changes matching a target pattern
    ///
    /// Target format: "kind", "kind.name" or "kind.scope.name"
    #[must_use]
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let target = parse_target(t);
                self.filter(|address| target.matches(address))
            }
        }
    }

    /// Changes that will touch the backend
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    /// Total number of instances in the plan
    pub fn total_resources(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.failures.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.pending().next().is_some()
    }
}

/// Plan one instance
///
/// `prior` is the last recorded state, `desired` the declared tree (absent
/// when the instance was removed from configuration). The prior record is
/// refreshed from the backend before classification; a record that vanished
/// remotely plans a create.
pub fn plan_change(
    controller: &Controller<'_>,
    schema: &'static KindSchema,
    address: Address,
    prior: Option<&Observed>,
    desired: Option<ConfigTree>,
) -> Result<PlannedChange> {
    if let Some(tree) = &desired {
        build(schema, tree, &controller.context().links())?;
    }

    let current = match prior {
        Some(prior) => {
            let hint = desired.as_ref().unwrap_or(&prior.config);
            controller.read(schema, &address, Some(hint))?
        }
        None => None,
    };

    let action = match (&current, &desired) {
        (None, Some(_)) => Action::Create,
        (Some(current), Some(desired)) => match classify(schema, &current.config, desired) {
            Change::NoOp => Action::NoOp,
            Change::InPlaceUpdate(fields) => Action::Update(fields),
            Change::Replace(fields) => Action::Replace(fields),
        },
        (Some(_), None) => Action::Delete,
        (None, None) => Action::NoOp,
    };
    log::debug!("{address}: {}", action.label());

    Ok(PlannedChange {
        address,
        schema,
        action,
        current,
        desired,
    })
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Target {
    kind: Option<String>,
    scope: Option<String>,
    name: Option<String>,
}

impl Target {
    fn matches(&self, address: &Address) -> bool {
        if let Some(kind) = &self.kind
            && *kind != address.kind
        {
            return false;
        }
        if let Some(scope) = &self.scope
            && address.scope.as_ref() != Some(scope)
        {
            return false;
        }
        if let Some(name) = &self.name
            && *name != address.name
        {
            return false;
        }
        true
    }
}

/// Parse a target string like "kind.name" into its parts
fn parse_target(target: &str) -> Target {
    let parts: Vec<&str> = target.split('.').collect();
    let owned = |s: &str| Some(s.to_string());
    match parts.as_slice() {
        [kind] => Target {
            kind: owned(kind),
            ..Target::default()
        },
        [kind, name] => Target {
            kind: owned(kind),
            scope: None,
            name: owned(name),
        },
        [kind, scope, name] => Target {
            kind: owned(kind),
            scope: owned(scope),
            name: owned(name),
        },
        _ => Target {
            name: owned(target),
            ..Target::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReconcileContext;
    use crate::testing::{MemoryApi, WIDGET, tree};
    use serde_json::json;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("gvc"),
            Target {
                kind: Some("gvc".to_string()),
                ..Target::default()
            }
        );
        assert_eq!(
            parse_target("gvc.prod"),
            Target {
                kind: Some("gvc".to_string()),
                scope: None,
                name: Some("prod".to_string()),
            }
        );
        assert_eq!(
            parse_target("identity.prod.worker").scope.as_deref(),
            Some("prod")
        );
        assert_eq!(parse_target("a.b.c.d").name.as_deref(), Some("a.b.c.d"));
    }

    #[test]
    fn test_filter_by_target() {
        let change = |address: Address| PlannedChange {
            address,
            schema: &WIDGET,
            action: Action::Create,
            current: None,
            desired: None,
        };
        let mut plan = ExecutionPlan::new();
        plan.push(change(Address::new("gvc", None, "prod")));
        plan.push(change(Address::new("gvc", None, "dev")));
        plan.push(change(Address::new("identity", Some("prod"), "worker")));

        assert_eq!(plan.clone().filter_by_target(Some("gvc")).total_resources(), 2);
        assert_eq!(plan.clone().filter_by_target(Some("gvc.dev")).total_resources(), 1);
        assert_eq!(
            plan.clone()
                .filter_by_target(Some("identity.prod.worker"))
                .total_resources(),
            1
        );
        assert_eq!(plan.filter_by_target(None).total_resources(), 3);
    }

    #[test]
    fn test_plan_create_update_delete() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "prod");
        let v1 = tree(&[("name", json!("prod")), ("domain", json!("a.example"))]);

        let create = plan_change(&controller, &WIDGET, address.clone(), None, Some(v1.clone())).unwrap();
        assert_eq!(create.action, Action::Create);

        let observed = controller.create(&WIDGET, &v1).unwrap();
        let v2 = tree(&[("name", json!("prod")), ("domain", json!("b.example"))]);
        let update = plan_change(&controller, &WIDGET, address.clone(), Some(&observed), Some(v2)).unwrap();
        assert_eq!(update.action, Action::Update(vec!["domain".to_string()]));

        let same = plan_change(&controller, &WIDGET, address.clone(), Some(&observed), Some(v1)).unwrap();
        assert_eq!(same.action, Action::NoOp);

        let delete = plan_change(&controller, &WIDGET, address, Some(&observed), None).unwrap();
        assert_eq!(delete.action, Action::Delete);
    }

    #[test]
    fn test_vanished_object_plans_create() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "prod");
        let declared = tree(&[("name", json!("prod"))]);
        let stale = Observed {
            config: declared.clone(),
            ..Observed::default()
        };

        let planned = plan_change(&controller, &WIDGET, address, Some(&stale), Some(declared)).unwrap();
        assert_eq!(planned.action, Action::Create);
        assert!(planned.current.is_none());
    }

    #[test]
    fn test_invalid_config_fails_planning() {
        let api = MemoryApi::default();
        let ctx = ReconcileContext::new("acme");
        let controller = Controller::new(&api, &ctx);
        let address = Address::new("gvc", None, "Bad");
        let declared = tree(&[("name", json!("Bad"))]);

        assert!(plan_change(&controller, &WIDGET, address, None, Some(declared)).is_err());
        assert!(api.calls().is_empty());
    }
}
