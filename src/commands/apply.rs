use anyhow::Result;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{ApplyOptions, PromptConfirm, apply, build_plan, display_plan};

use super::Session;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let mut session = Session::open(ctx, true)?;
    let controller = session.controller();

    let plan = build_plan(&controller, &session.config, &session.state, args.target.as_deref())?;
    display_plan(&plan);

    let opts = ApplyOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        jobs: args.jobs,
        verbose: ctx.verbose > 0,
    };
    let report = apply(&plan, &controller, &opts, &mut PromptConfirm)?;

    session.finish(&report, args.dry_run)
}
