//! Fetch adapters, one per artifact variant
//!
//! - [`FetchAdapter`]: the per-variant interface the core calls into
//! - [`Adapters`]: typed registry selecting an adapter by variant
//! - [`GithubRawAdapter`]: built-in adapter for repo files

mod fetcher;
pub mod github;
mod registry;

pub use fetcher::FetchAdapter;
pub use github::GithubRawAdapter;
pub use registry::{create_adapters, Adapters};
