//! Field-policy tables for every supported resource kind
//!
//! Each kind is plain data: a [`KindSchema`] that the generic engine in the
//! `reconcile` crate interprets. Adding a kind means adding a table here.

pub mod cloud_account;
pub mod group;
pub mod gvc;
pub mod identity;
pub mod policy;
pub mod secret;

use reconcile::{Error, KindSchema, Result};

/// All supported kinds, link targets and parents before the kinds that
/// reference them
pub static KINDS: [&KindSchema; 6] = [
    &cloud_account::CLOUD_ACCOUNT,
    &secret::SECRET,
    &gvc::GVC,
    &identity::IDENTITY,
    &group::GROUP,
    &policy::POLICY,
];

/// Look up a kind's table by its API name
pub fn lookup(kind: &str) -> Result<&'static KindSchema> {
    KINDS
        .iter()
        .copied()
        .find(|schema| schema.kind == kind)
        .ok_or_else(|| Error::UnknownKind(kind.to_string()))
}

/// Position of a kind in [`KINDS`]; used to order creates before dependents
pub fn rank(kind: &str) -> usize {
    KINDS
        .iter()
        .position(|schema| schema.kind == kind)
        .unwrap_or(KINDS.len())
}
