//! artcache - local cache for remote artifacts
//!
//! CLI entry point that dispatches to subcommands.

use artcache::cli::{Cli, Commands};
use artcache::config::ConfigManager;
use artcache::error::ArtcacheResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> ArtcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load()?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("artcache=warn"),
        1 => EnvFilter::new("artcache=info"),
        _ => EnvFilter::new("artcache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    if let Some(dir) = cli.dir {
        debug!("Cache directory overridden: {}", dir.display());
        config.cache.dir = Some(dir);
    }

    match cli.command {
        Commands::At(args) => artcache::cli::commands::at(args, &config),
        Commands::Register(args) => artcache::cli::commands::register(args, &config),
        Commands::Check(args) => artcache::cli::commands::check(args, &config),
        Commands::CheckAll => artcache::cli::commands::check_all(&config),
        Commands::List(args) => artcache::cli::commands::list(args, &config),
        Commands::Config(args) => {
            artcache::cli::commands::config(args, &config, &config_manager)
        }
    }
}
