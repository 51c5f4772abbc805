//! CLI command implementations

pub mod at;
pub mod check;
pub mod config;
pub mod list;
pub mod register;

pub use at::execute as at;
pub use check::execute as check;
pub use check::execute_all as check_all;
pub use config::execute as config;
pub use list::execute as list;
pub use register::execute as register;
