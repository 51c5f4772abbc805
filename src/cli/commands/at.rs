//! At command - resolve a token to local files

use crate::cacher::{AtOptions, Cacher, Materialize};
use crate::cli::args::AtArgs;
use crate::config::Config;
use crate::error::ArtcacheResult;
use crate::token::Token;

/// Execute the at command
///
/// Prints one path per line: blob paths, or the written copies with `--save`.
pub fn execute(args: AtArgs, config: &Config) -> ArtcacheResult<()> {
    let token = Token::parse(&args.token)?;
    let mut cacher = Cacher::from_config(config)?;

    let save = match args.save {
        None => Materialize::No,
        Some(names) if names.is_empty() => Materialize::DefaultNames,
        Some(names) => Materialize::To(names),
    };

    let paths = cacher.at(
        &token,
        AtOptions {
            lifetime: args.lifetime.or(config.cache.default_lifetime_secs),
            vars: None,
            save,
            cwd: args.cwd,
        },
    )?;

    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}
