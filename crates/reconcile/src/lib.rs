//! # Reconcile
//!
//! A declarative reconcile engine for control-plane resources.
//!
//! An operator declares what should exist; this crate turns each declared
//! instance into the object a management API expects, reads objects back into
//! declared form, decides between no-op, in-place update and replacement, and
//! drives the create/read/update/delete lifecycle through a pluggable client.
//!
//! ## Core Concepts
//!
//! - **KindSchema**: A static field-policy table describing one resource kind
//! - **ConfigTree**: One instance's declared attributes, each tri-state
//!   (unset, explicitly empty, or set)
//! - **build / flatten**: The two directions of the transformation
//! - **classify**: No-op, in-place update, or replace
//! - **Controller**: The lifecycle against an [`ApiClient`]
//! - **ExecutionPlan / execute**: Planning and parallel application of many
//!   instances
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{Controller, ReconcileContext, build, tree};
//!
//! let ctx = ReconcileContext::new("acme");
//! let desired = tree::parse(&GVC, config_table)?;
//!
//! // Validate and build without touching the network
//! let object = build(&GVC, &desired, &ctx.links())?;
//!
//! // Reconcile against a backend
//! let controller = Controller::new(&client, &ctx);
//! let observed = controller.create(&GVC, &desired)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`ApiClient`]: The remote management API
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific HTTP clients or UI frameworks.

pub mod address;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod link;
pub mod object;
pub mod planner;
pub mod schema;
pub mod tags;
pub mod transform;
pub mod tree;
pub mod types;
pub mod validate;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types at crate root
pub use address::Address;
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback, ReconcileContext};
pub use diff::{Change, DiffSummary, changed_fields, classify, group_by_kind};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{ExecutionReport, Outcome, execute, execute_simple};
pub use lifecycle::{ApiClient, ApiError, Controller};
pub use link::LinkResolver;
pub use object::{Base, DomainObject, Link};
pub use planner::{Action, ExecutionPlan, PlanFailure, PlannedChange, plan_change};
pub use schema::{
    FieldSpec, FieldType, KindSchema, LinkTarget, OneOfSpec, Payload, Presence, Rule, Scope,
    UpdatePolicy, Variant,
};
pub use transform::{Computed, Observed, build, build_patch, flatten};
pub use tree::{Attr, ConfigTree, Leaf};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary};
pub use value::{Scalar, Tristate};
