//! Change classification
//!
//! Compares the observed tree against the desired one and decides whether
//! nothing happens, a partial update is enough, or the object must be
//! replaced.

use crate::planner::{Action, PlannedChange};
use crate::schema::{KindSchema, OneOfSpec, Presence, UpdatePolicy};
use crate::tree::ConfigTree;
use std::collections::BTreeMap;

/// Outcome of comparing two trees of the same kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    NoOp,
    /// Top-level fields that can be patched
    InPlaceUpdate(Vec<String>),
    /// Top-level fields that force delete and re-create
    Replace(Vec<String>),
}

/// Top-level fields that differ, with the policy each carries
///
/// One-of groups are reported under their group name.
pub fn changed_fields(schema: &KindSchema, old: &ConfigTree, new: &ConfigTree) -> Vec<(String, UpdatePolicy)> {
    let mut changed = Vec::new();

    for spec in schema.all_fields() {
        let after = new.get(spec.key);
        if spec.presence == Presence::OptionalComputed && !after.is_set() {
            continue;
        }
        if old.get(spec.key) != after {
            changed.push((spec.key.to_string(), spec.policy));
        }
    }

    if let Some(key) = schema.scope_key()
        && old.get(key) != new.get(key)
    {
        changed.push((key.to_string(), UpdatePolicy::Replace));
    }

    for group in schema.one_of {
        let before = selected_variant(group, old);
        let after = selected_variant(group, new);
        if before != after {
            changed.push((group.group.to_string(), UpdatePolicy::Replace));
        } else if let Some(key) = after
            && old.get(key) != new.get(key)
        {
            changed.push((group.group.to_string(), group.policy));
        }
    }

    changed
}

fn selected_variant(group: &OneOfSpec, tree: &ConfigTree) -> Option<&'static str> {
    group
        .variants
        .iter()
        .find(|v| tree.get(v.key).is_set())
        .map(|v| v.key)
}

/// Classify the change from `old` to `new`
///
/// Any replace-triggering difference wins over mutable ones.
pub fn classify(schema: &KindSchema, old: &ConfigTree, new: &ConfigTree) -> Change {
    let changed = changed_fields(schema, old, new);
    let replace: Vec<String> = changed
        .iter()
        .filter(|(_, policy)| *policy == UpdatePolicy::Replace)
        .map(|(key, _)| key.clone())
        .collect();

    if !replace.is_empty() {
        Change::Replace(replace)
    } else if changed.is_empty() {
        Change::NoOp
    } else {
        Change::InPlaceUpdate(changed.into_iter().map(|(key, _)| key).collect())
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to delete
    pub removals: usize,
    /// Number of resources to update in place
    pub modifications: usize,
    /// Number of resources to replace
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from planned changes
    pub fn from_changes(changes: &[PlannedChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update(_) => summary.modifications += 1,
                Action::Replace(_) => summary.replacements += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group pending changes by resource kind
pub fn group_by_kind(changes: &[PlannedChange]) -> BTreeMap<String, Vec<&PlannedChange>> {
    let mut groups: BTreeMap<String, Vec<&PlannedChange>> = BTreeMap::new();
    for change in changes.iter().filter(|c| c.action.is_change()) {
        groups
            .entry(change.address.kind.clone())
            .or_default()
            .push(change);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::testing::{CLOUD_ACCOUNT, IDENTITY, WIDGET, tree};
    use crate::tree::Leaf;
    use serde_json::json;

    #[test]
    fn test_identical_trees_are_noop() {
        let t = tree(&[("name", json!("prod")), ("domain", json!("a.example"))]);
        assert_eq!(classify(&WIDGET, &t, &t.clone()), Change::NoOp);
    }

    #[test]
    fn test_mutable_field_is_in_place() {
        let old = tree(&[("name", json!("prod")), ("domain", json!("a.example"))]);
        let new = tree(&[("name", json!("prod")), ("domain", json!("b.example"))]);
        assert_eq!(
            classify(&WIDGET, &old, &new),
            Change::InPlaceUpdate(vec!["domain".to_string()])
        );
    }

    #[test]
    fn test_name_change_replaces_regardless_of_others() {
        let old = tree(&[("name", json!("prod")), ("domain", json!("a.example"))]);
        let new = tree(&[("name", json!("prod-2")), ("domain", json!("b.example"))]);
        assert_eq!(
            classify(&WIDGET, &old, &new),
            Change::Replace(vec!["name".to_string()])
        );
    }

    #[test]
    fn test_unset_optional_computed_is_not_a_change() {
        let old = tree(&[("name", json!("prod")), ("description", json!("prod"))]);
        let new = tree(&[("name", json!("prod"))]);
        assert_eq!(classify(&WIDGET, &old, &new), Change::NoOp);

        let cleared = tree(&[("name", json!("prod")), ("description", json!(""))]);
        assert_eq!(
            classify(&WIDGET, &old, &cleared),
            Change::InPlaceUpdate(vec!["description".to_string()])
        );
    }

    #[test]
    fn test_removed_optional_field_is_a_change() {
        let old = tree(&[("name", json!("prod")), ("domain", json!("a.example"))]);
        let new = tree(&[("name", json!("prod"))]);
        assert_eq!(
            classify(&WIDGET, &old, &new),
            Change::InPlaceUpdate(vec!["domain".to_string()])
        );
    }

    #[test]
    fn test_empty_differs_from_unset() {
        let old = tree(&[("name", json!("prod"))]);
        let new = tree(&[("name", json!("prod")), ("domain", json!(""))]);
        assert!(matches!(classify(&WIDGET, &old, &new), Change::InPlaceUpdate(_)));
    }

    #[test]
    fn test_scope_change_replaces() {
        let old = tree(&[("name", json!("w")), ("gvc", json!("a"))]);
        let new = tree(&[("name", json!("w")), ("gvc", json!("b"))]);
        assert_eq!(classify(&IDENTITY, &old, &new), Change::Replace(vec!["gvc".to_string()]));
    }

    #[test]
    fn test_variant_switch_replaces() {
        let aws = ConfigTree::new().with_str("role_arn", "arn:aws:iam::1:role/x");
        let gcp = ConfigTree::new().with_str("project_id", "my-project");
        let old = tree(&[("name", json!("c"))]).with("aws", Leaf::Blocks(vec![aws.clone()]));
        let new = tree(&[("name", json!("c"))]).with("gcp", Leaf::Blocks(vec![gcp]));
        assert_eq!(
            classify(&CLOUD_ACCOUNT, &old, &new),
            Change::Replace(vec!["provider".to_string()])
        );

        let same = tree(&[("name", json!("c"))]).with("aws", Leaf::Blocks(vec![aws]));
        assert_eq!(classify(&CLOUD_ACCOUNT, &old, &same), Change::NoOp);
    }

    #[test]
    fn test_summary_and_grouping() {
        let change = |kind: &str, name: &str, action: Action| PlannedChange {
            address: Address::new(kind, None, name),
            schema: &WIDGET,
            action,
            current: None,
            desired: None,
        };
        let changes = vec![
            change("gvc", "a", Action::Create),
            change("gvc", "b", Action::Update(vec!["domain".into()])),
            change("secret", "c", Action::Delete),
            change("secret", "d", Action::NoOp),
        ];

        let summary = DiffSummary::from_changes(&changes);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.total(), 3);

        let groups = group_by_kind(&changes);
        assert_eq!(groups["gvc"].len(), 2);
        assert_eq!(groups["secret"].len(), 1);
    }
}
