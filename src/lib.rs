//! artcache - local persistent cache for remote artifacts
//!
//! Artifacts are named by [`Token`]s, fetched once through a per-variant
//! [`FetchAdapter`], and stored in a deduplicating content-addressed store.
//! Refreshing an expired token keeps the previous file set reachable as a
//! history record.
//!
//! ```rust,no_run
//! use artcache::{create_adapters, AtOptions, Cacher, Config, Token};
//!
//! let config = Config::default();
//! let mut cacher = Cacher::open("/tmp/artcache", create_adapters(&config))?;
//! let token = Token::repo_file("rust-lang", "rust", "README.md");
//! let paths = cacher.at(&token, AtOptions { lifetime: Some(3600), ..Default::default() })?;
//! # Ok::<(), artcache::ArtcacheError>(())
//! ```

pub mod adapter;
pub mod cacher;
pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod index;
pub mod store;
pub mod token;
pub mod ui;

pub use adapter::{create_adapters, Adapters, FetchAdapter};
pub use cacher::{AtOptions, Cacher, CheckOutcome, Materialize};
pub use config::Config;
pub use error::{ArtcacheError, ArtcacheResult};
pub use hasher::TokenHasher;
pub use index::{Index, Vars};
pub use store::{ContentHash, ContentStore};
pub use token::{Artifact, ArtifactKind, Gist, Release, RepoFile, Token, TokenHash};
