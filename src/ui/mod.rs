//! Terminal output helpers for the `artcache` binary
//!
//! Uses `cliclack` styling on interactive terminals and plain prefixed lines
//! everywhere else, so output stays grep-friendly in scripts and CI.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, step, step_detail, Status};
