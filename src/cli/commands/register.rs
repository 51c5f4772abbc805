//! Register command - fetch and record a token

use crate::cacher::Cacher;
use crate::cli::args::RegisterArgs;
use crate::config::Config;
use crate::error::ArtcacheResult;
use crate::token::Token;
use crate::ui::{self, Status, UiContext};

/// Execute the register command
pub fn execute(args: RegisterArgs, config: &Config) -> ArtcacheResult<()> {
    let ctx = UiContext::detect();
    let token = Token::parse(&args.token)?;
    let mut cacher = Cacher::from_config(config)?;

    let lifetime = args.lifetime.or(config.cache.default_lifetime_secs);
    if cacher.register(&token, lifetime, None)? {
        cacher.index_mut().save()?;
        let thash = cacher.index().hash(&token);
        ui::step_detail(&ctx, Status::Ok, &format!("Registered {}", token), thash.short());
        if lifetime.is_none() {
            ui::step(&ctx, Status::Warn, "No lifetime set, token will never be refreshed");
        }
    } else {
        ui::step(&ctx, Status::Info, &format!("Already registered: {}", token));
    }
    Ok(())
}
