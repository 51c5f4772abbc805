//! Built-in adapter for repository files served as raw content

use crate::adapter::FetchAdapter;
use crate::config::schema::GithubConfig;
use crate::error::{ArtcacheError, ArtcacheResult};
use crate::token::RepoFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Downloads `<base>/<org>/<repo>/<branch>/<path>` over HTTP(S)
pub struct GithubRawAdapter {
    base_url: String,
    default_branch: String,
    agent: ureq::Agent,
}

impl GithubRawAdapter {
    pub fn new(config: &GithubConfig) -> Self {
        Self {
            base_url: config.raw_base_url.trim_end_matches('/').to_string(),
            default_branch: config.default_branch.clone(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Raw content URL for a repo file
    pub fn url(&self, file: &RepoFile) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.base_url,
            file.org,
            file.repo,
            file.branch.as_deref().unwrap_or(&self.default_branch),
            file.path.trim_start_matches('/')
        )
    }
}

impl FetchAdapter<RepoFile> for GithubRawAdapter {
    fn fetch(&self, file: &RepoFile, scratch: &Path) -> ArtcacheResult<Vec<PathBuf>> {
        let name = Path::new(&file.path).file_name().ok_or_else(|| {
            ArtcacheError::fetch(&file.path, "path does not name a file")
        })?;
        let dest = scratch.join(name);
        let url = self.url(file);

        debug!("Downloading {}", url);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ArtcacheError::http(&url, e))?;

        let mut reader = response.into_body().into_reader();
        let mut out = fs::File::create(&dest)
            .map_err(|e| ArtcacheError::io(format!("creating {}", dest.display()), e))?;
        let bytes = io::copy(&mut reader, &mut out)
            .map_err(|e| ArtcacheError::io(format!("downloading {}", url), e))?;

        debug!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(vec![dest])
    }

    fn default_filenames(&self, file: &RepoFile) -> ArtcacheResult<Vec<PathBuf>> {
        Ok(vec![PathBuf::from(file.path.trim_start_matches('/'))])
    }

    fn name(&self) -> &'static str {
        "github-raw"
    }
}
