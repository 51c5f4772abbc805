//! Check commands - refresh expired tokens

use crate::cacher::{Cacher, CheckOutcome};
use crate::cli::args::CheckArgs;
use crate::config::Config;
use crate::error::ArtcacheResult;
use crate::token::Token;
use crate::ui::{self, Status, UiContext};

/// Execute the check command
pub fn execute(args: CheckArgs, config: &Config) -> ArtcacheResult<()> {
    let ctx = UiContext::detect();
    let token = Token::parse(&args.token)?;
    let mut cacher = Cacher::from_config(config)?;

    match cacher.check(&token, true)? {
        CheckOutcome::Fresh => ui::step(&ctx, Status::Info, &format!("Not expired: {}", token)),
        CheckOutcome::Refreshed { historical } => ui::step_detail(
            &ctx,
            Status::Ok,
            &format!("Refreshed {}", token),
            &format!("previous version at {}", historical.short()),
        ),
    }
    Ok(())
}

/// Execute the check-all command
pub fn execute_all(config: &Config) -> ArtcacheResult<()> {
    let ctx = UiContext::detect();
    let mut cacher = Cacher::from_config(config)?;

    if cacher.index().is_empty() {
        ui::step(&ctx, Status::Info, "No tokens registered");
        return Ok(());
    }

    let refreshed = cacher.check_all(true)?;
    ui::step(&ctx, Status::Ok, &format!("Refreshed {} token(s)", refreshed));
    Ok(())
}
