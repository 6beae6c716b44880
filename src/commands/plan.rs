use anyhow::{Result, bail};

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{build_plan, display_plan};
use crate::ui;

use super::Session;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let session = Session::open(ctx, true)?;
    let plan = build_plan(&session.controller(), &session.config, &session.state, args.target.as_deref())?;
    display_plan(&plan);

    if !plan.failures.is_empty() {
        bail!("{} could not be planned", ui::count(plan.failures.len(), "resource"));
    }
    Ok(())
}
