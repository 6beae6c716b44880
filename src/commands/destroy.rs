use anyhow::Result;

use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{ApplyOptions, PromptConfirm, apply, build_destroy_plan, display_plan};
use crate::ui;

use super::Session;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let mut session = Session::open(ctx, false)?;
    if session.state.is_empty() {
        ui::info("No resources in state, nothing to destroy");
        return Ok(());
    }
    let controller = session.controller();

    let plan = build_destroy_plan(&controller, &session.state, args.target.as_deref())?;
    display_plan(&plan);

    let opts = ApplyOptions {
        dry_run: false,
        yes: args.yes,
        jobs: args.jobs,
        verbose: ctx.verbose > 0,
    };
    let report = apply(&plan, &controller, &opts, &mut PromptConfirm)?;

    session.finish(&report, false)
}
