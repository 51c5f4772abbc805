//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::ArtcacheResult;
use crate::ui::{self, Status, UiContext};

/// Execute the config command
pub fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> ArtcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force)?,
    }

    Ok(())
}

fn show_config(config: &Config) {
    let toml =
        toml::to_string_pretty(config).unwrap_or_else(|_| "Error serializing config".to_string());
    println!("{}", toml);

    let ctx = UiContext::detect();
    ui::key_value(
        &ctx,
        "effective cache dir",
        &config.cache.base_dir().display().to_string(),
    );
}

fn init_config(manager: &ConfigManager, force: bool) -> ArtcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_detail(
            &ctx,
            Status::Warn,
            &format!("Config already exists at {}", path.display()),
            "use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default())?;

    ui::step_detail(
        &ctx,
        Status::Ok,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}
