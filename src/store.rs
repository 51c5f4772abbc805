//! Content-addressed blob storage
//!
//! Blobs live at `<root>/<first 2 hex>/<remaining hex>` of the SHA-256 of
//! their bytes. Identical content always maps to the same path, so storing it
//! twice is a no-op.

use crate::error::{ArtcacheError, ArtcacheResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hex SHA-256 of a blob's bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into shard directory and file name
    fn shard(&self) -> (&str, &str) {
        match (self.0.get(..2), self.0.get(2..)) {
            (Some(shard), Some(name)) => (shard, name),
            _ => ("", &self.0),
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Hash a file's contents using SHA-256
pub fn hash_file(path: &Path) -> ArtcacheResult<ContentHash> {
    let mut file = fs::File::open(path)
        .map_err(|e| ArtcacheError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| ArtcacheError::io(format!("reading {}", path.display()), e))?;

    Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Sharded blob store rooted at one directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// The root is made absolute so resolved paths stay valid regardless of
    /// the caller's working directory.
    pub fn open(root: impl AsRef<Path>) -> ArtcacheResult<Self> {
        let root = std::path::absolute(root.as_ref()).map_err(|e| {
            ArtcacheError::io(format!("resolving {}", root.as_ref().display()), e)
        })?;
        fs::create_dir_all(&root)
            .map_err(|e| ArtcacheError::io(format!("creating {}", root.display()), e))?;
        Ok(Self { root })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the blob for `hash`
    pub fn resolve(&self, hash: &ContentHash) -> PathBuf {
        let (shard, name) = hash.shard();
        self.root.join(shard).join(name)
    }

    /// Whether a blob for `hash` exists
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.resolve(hash).is_file()
    }

    /// Copy a file into the store, returning its content hash.
    ///
    /// Existing blobs are left untouched. New blobs are written to a temp file
    /// in the shard directory and renamed into place, so a blob path never
    /// holds partial content.
    pub fn put(&self, path: &Path) -> ArtcacheResult<ContentHash> {
        let hash = hash_file(path)?;
        let dest = self.resolve(&hash);

        if dest.exists() {
            debug!("Blob {} already stored", hash);
            return Ok(hash);
        }

        let shard_dir = dest.parent().unwrap_or(&self.root);
        fs::create_dir_all(shard_dir)
            .map_err(|e| ArtcacheError::io(format!("creating {}", shard_dir.display()), e))?;

        let mut staged = tempfile::NamedTempFile::new_in(shard_dir)
            .map_err(|e| ArtcacheError::io("creating staging file", e))?;
        let mut source = fs::File::open(path)
            .map_err(|e| ArtcacheError::io(format!("opening {}", path.display()), e))?;
        io::copy(&mut source, staged.as_file_mut())
            .map_err(|e| ArtcacheError::io(format!("copying {}", path.display()), e))?;

        // Staging files are created 0600; blobs are plain readable files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o644);
            fs::set_permissions(staged.path(), perms)
                .map_err(|e| ArtcacheError::io("setting blob permissions", e))?;
        }

        match staged.persist_noclobber(&dest) {
            Ok(_) => {}
            // Another store of the same content won the race
            Err(e) if dest.exists() => drop(e),
            Err(e) => {
                return Err(ArtcacheError::io(
                    format!("writing blob {}", dest.display()),
                    e.error,
                ))
            }
        }

        debug!("Stored blob {} from {}", hash, path.display());
        Ok(hash)
    }
}
