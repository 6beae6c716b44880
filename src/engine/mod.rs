//! Execution engine for cplnform
//!
//! The engine orchestrates:
//! 1. Planning - Refresh declared and recorded instances into a plan
//! 2. Diffing - Render what the plan will change
//! 3. Executing - Apply changes in dependency waves with bounded parallelism

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::display_plan;
pub use executor::{ApplyOptions, PromptConfirm, apply, print_summary};
pub use planner::{build_destroy_plan, build_plan};
