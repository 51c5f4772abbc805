//! Fetch adapter abstraction
//!
//! One adapter per artifact variant. The core never talks to the network
//! itself; it hands an adapter a scratch directory and stores whatever files
//! come back.

use crate::error::ArtcacheResult;
use crate::index::Vars;
use std::path::{Path, PathBuf};

/// Retrieves one kind of artifact into local files
///
/// Adapter calls are opaque and blocking. Timeouts, retries and
/// cancellation are the adapter's business; errors are returned to the
/// caller of the core unchanged.
pub trait FetchAdapter<T>: Send + Sync {
    /// Materialize the artifact as files under `scratch`.
    ///
    /// The returned order is the order the index records content hashes in.
    fn fetch(&self, artifact: &T, scratch: &Path) -> ArtcacheResult<Vec<PathBuf>>;

    /// Destination names used when materializing without explicit names
    fn default_filenames(&self, artifact: &T) -> ArtcacheResult<Vec<PathBuf>>;

    /// Extra staleness probe, consulted only while the lifetime has not
    /// elapsed. Returning `true` forces a refresh.
    fn check_expired(&self, _artifact: &T, _vars: &Vars) -> ArtcacheResult<bool> {
        Ok(false)
    }

    /// Human-readable adapter name for logs
    fn name(&self) -> &'static str;
}
