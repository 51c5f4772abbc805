//! Adapter registry and factory
//!
//! Dispatch is an explicit match on the artifact variant, so every variant
//! has exactly one typed slot.

use crate::adapter::github::GithubRawAdapter;
use crate::adapter::FetchAdapter;
use crate::config::Config;
use crate::error::{ArtcacheError, ArtcacheResult};
use crate::index::Vars;
use crate::token::{Artifact, ArtifactKind, Gist, Release, RepoFile};
use std::path::{Path, PathBuf};
use tracing::debug;

type Slot<T> = Option<Box<dyn FetchAdapter<T>>>;

/// One optional adapter per artifact variant
#[derive(Default)]
pub struct Adapters {
    repo_file: Slot<RepoFile>,
    gist: Slot<Gist>,
    release: Slot<Release>,
}

impl Adapters {
    /// Registry with no adapters at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_repo_file(mut self, adapter: impl FetchAdapter<RepoFile> + 'static) -> Self {
        self.repo_file = Some(Box::new(adapter));
        self
    }

    pub fn with_gist(mut self, adapter: impl FetchAdapter<Gist> + 'static) -> Self {
        self.gist = Some(Box::new(adapter));
        self
    }

    pub fn with_release(mut self, adapter: impl FetchAdapter<Release> + 'static) -> Self {
        self.release = Some(Box::new(adapter));
        self
    }

    /// Whether an adapter is registered for `kind`
    pub fn supports(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::RepoFile => self.repo_file.is_some(),
            ArtifactKind::Gist => self.gist.is_some(),
            ArtifactKind::Release => self.release.is_some(),
        }
    }

    pub fn fetch(&self, artifact: &Artifact, scratch: &Path) -> ArtcacheResult<Vec<PathBuf>> {
        match artifact {
            Artifact::RepoFile(a) => fetch_with(&self.repo_file, artifact.kind(), a, scratch),
            Artifact::Gist(a) => fetch_with(&self.gist, artifact.kind(), a, scratch),
            Artifact::Release(a) => fetch_with(&self.release, artifact.kind(), a, scratch),
        }
    }

    pub fn default_filenames(&self, artifact: &Artifact) -> ArtcacheResult<Vec<PathBuf>> {
        match artifact {
            Artifact::RepoFile(a) => slot(&self.repo_file, artifact.kind())?.default_filenames(a),
            Artifact::Gist(a) => slot(&self.gist, artifact.kind())?.default_filenames(a),
            Artifact::Release(a) => slot(&self.release, artifact.kind())?.default_filenames(a),
        }
    }

    /// Variant-specific staleness probe; `false` when no adapter is registered
    pub fn check_expired(&self, artifact: &Artifact, vars: &Vars) -> ArtcacheResult<bool> {
        match artifact {
            Artifact::RepoFile(a) => probe(&self.repo_file, a, vars),
            Artifact::Gist(a) => probe(&self.gist, a, vars),
            Artifact::Release(a) => probe(&self.release, a, vars),
        }
    }
}

fn slot<T>(slot: &Slot<T>, kind: ArtifactKind) -> ArtcacheResult<&dyn FetchAdapter<T>> {
    slot.as_deref().ok_or(ArtcacheError::NoAdapter(kind))
}

fn fetch_with<T>(
    slot_ref: &Slot<T>,
    kind: ArtifactKind,
    artifact: &T,
    scratch: &Path,
) -> ArtcacheResult<Vec<PathBuf>> {
    let adapter = slot(slot_ref, kind)?;
    debug!("Fetching {} artifact with {} adapter", kind, adapter.name());
    adapter.fetch(artifact, scratch)
}

fn probe<T>(slot: &Slot<T>, artifact: &T, vars: &Vars) -> ArtcacheResult<bool> {
    match slot {
        Some(adapter) => adapter.check_expired(artifact, vars),
        None => Ok(false),
    }
}

/// Create the registry of built-in adapters
///
/// Only repo files ship with an adapter; gists and releases must be
/// registered by the embedding application.
pub fn create_adapters(config: &Config) -> Adapters {
    Adapters::empty().with_repo_file(GithubRawAdapter::new(&config.github))
}
