//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, StyledObject};

/// Outcome shown in front of a step line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Info,
    Warn,
}

impl Status {
    fn label(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("[OK]").green(),
            Self::Info => style("[INFO]").cyan(),
            Self::Warn => style("[WARN]").yellow(),
        }
    }
}

/// Display a title line
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Display one step line
pub fn step(ctx: &UiContext, status: Status, message: &str) {
    if ctx.use_fancy_output() {
        let _ = match status {
            Status::Ok => cliclack::log::success(message),
            Status::Info => cliclack::log::info(message),
            Status::Warn => cliclack::log::warning(message),
        };
    } else {
        println!("  {} {}", status.label(), message);
    }
}

/// Display a step line with a dimmed detail, e.g. a short token hash
pub fn step_detail(ctx: &UiContext, status: Status, message: &str, detail: &str) {
    let detail = if ctx.use_fancy_output() {
        style(detail).dim().to_string()
    } else {
        detail.to_string()
    };
    step(ctx, status, &format!("{} ({})", message, detail));
}

/// Print a key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}
