//! Cache orchestration
//!
//! Ties the index, the content store and the fetch adapters together:
//!
//! 1. Unknown token: fetch, store blobs, insert a record (`register`)
//! 2. Known token: decide freshness; if stale, fetch, snapshot the old state
//!    into history, then point the record at the new blobs (`check`)
//! 3. Resolve the record to blob paths, optionally copying them out (`at`)
//!
//! The index is only touched after every fetched file has been hashed and
//! stored, so a failed fetch leaves the record exactly as it was.

use crate::adapter::{create_adapters, Adapters};
use crate::config::Config;
use crate::error::{ArtcacheError, ArtcacheResult};
use crate::hasher::TokenHasher;
use crate::index::{Index, Vars};
use crate::store::ContentHash;
use crate::token::{Token, TokenHash};
use chrono::{TimeDelta, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Where `at` should put the resolved files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Materialize {
    /// Leave them in the store and return the blob paths
    #[default]
    No,
    /// Copy them to the adapter's default file names
    DefaultNames,
    /// Copy them to these names, one per file
    To(Vec<PathBuf>),
}

/// Options for [`Cacher::at`]
#[derive(Debug, Clone, Default)]
pub struct AtOptions {
    /// Lifetime for a token registered by this call
    pub lifetime: Option<u64>,
    /// Variables for a token registered by this call
    pub vars: Option<Vars>,
    pub save: Materialize,
    /// Directory relative destination names are resolved against
    pub cwd: Option<PathBuf>,
}

/// Result of [`Cacher::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Not expired, nothing fetched
    Fresh,
    /// Refetched; the previous state now lives at `historical`
    Refreshed { historical: TokenHash },
}

/// Resolves tokens to local files, fetching when needed
pub struct Cacher {
    index: Index,
    adapters: Adapters,
}

impl Cacher {
    pub fn new(index: Index, adapters: Adapters) -> Self {
        Self { index, adapters }
    }

    /// Open the index under `base` with the given adapters
    pub fn open(base: impl AsRef<Path>, adapters: Adapters) -> ArtcacheResult<Self> {
        Ok(Self::new(Index::open(base)?, adapters))
    }

    /// Open the configured cache with the built-in adapters
    pub fn from_config(config: &Config) -> ArtcacheResult<Self> {
        let index = Index::open(config.cache.base_dir())?
            .with_hasher(TokenHasher::with_capacity(config.cache.hash_memo_capacity))
            .with_max_history(config.cache.max_history);
        Ok(Self::new(index, create_adapters(config)))
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    /// Whether a registered token is due for a refresh
    pub fn check_expired(&self, token: &Token) -> ArtcacheResult<bool> {
        let vars = self.index.get_vars(token)?;

        let Some(lifetime) = vars.lifetime else {
            return Ok(false);
        };
        let Some(last_checked) = vars.last_checked else {
            return Ok(true);
        };

        // A lifetime too large to represent never elapses
        let deadline = i64::try_from(lifetime)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| last_checked.checked_add_signed(ttl));
        if deadline.is_some_and(|deadline| Utc::now() > deadline) {
            return Ok(true);
        }

        self.adapters.check_expired(&token.artifact, &vars)
    }

    /// Fetch the artifact and store every produced file, in adapter order
    pub fn fetch(&self, token: &Token) -> ArtcacheResult<Vec<ContentHash>> {
        let scratch = tempfile::Builder::new()
            .prefix("artcache-")
            .tempdir()
            .map_err(|e| ArtcacheError::io("creating scratch directory", e))?;

        let paths = self.adapters.fetch(&token.artifact, scratch.path())?;
        let hashes = paths
            .iter()
            .map(|path| self.index.store().put(path))
            .collect::<ArtcacheResult<Vec<_>>>()?;

        debug!("Fetched {} file(s) for {}", hashes.len(), token);
        Ok(hashes)
    }

    /// Fetch and record a new token. Returns `false` if it was already known.
    pub fn register(
        &mut self,
        token: &Token,
        lifetime: Option<u64>,
        vars: Option<Vars>,
    ) -> ArtcacheResult<bool> {
        if self.index.exists(token) {
            debug!("Token {} already registered", self.index.hash(token).short());
            return Ok(false);
        }

        let hashes = self.fetch(token)?;
        let thash = self.index.add_new(token.clone(), hashes, lifetime, vars);
        info!("Registered {} as {}", token, thash.short());
        Ok(true)
    }

    /// Refresh a registered token if it has expired
    pub fn check(&mut self, token: &Token, save: bool) -> ArtcacheResult<CheckOutcome> {
        let thash = self.index.hash(token);
        if !self.index.exists(&thash) {
            return Err(ArtcacheError::TokenNotFound(thash));
        }

        if !self.check_expired(token)? {
            info!("Token {} is not expired", thash.short());
            return Ok(CheckOutcome::Fresh);
        }
        info!("Token {} is expired", thash.short());

        let hashes = self.fetch(token)?;
        let historical = self.index.historize(&thash)?;
        self.index.update_hashes(&thash, hashes)?;
        self.index.update_last_checked(&thash)?;

        if save {
            self.index.save()?;
        }
        Ok(CheckOutcome::Refreshed { historical })
    }

    /// Check every current token, persisting once at the end.
    ///
    /// Returns the number of tokens refreshed.
    pub fn check_all(&mut self, save: bool) -> ArtcacheResult<usize> {
        let tokens: Vec<Token> = self
            .index
            .current_tokens()
            .map(|(_, token)| token.clone())
            .collect();

        let mut refreshed = 0;
        for token in &tokens {
            if let CheckOutcome::Refreshed { .. } = self.check(token, false)? {
                refreshed += 1;
            }
        }

        if save {
            self.index.save()?;
        }
        info!("Checked {} token(s), refreshed {}", tokens.len(), refreshed);
        Ok(refreshed)
    }

    /// Make sure a token is cached and fresh, then resolve its files.
    ///
    /// Returns the blob paths, or the destination paths when materializing.
    pub fn at(&mut self, token: &Token, options: AtOptions) -> ArtcacheResult<Vec<PathBuf>> {
        if self.index.exists(token) {
            self.check(token, true)?;
        } else {
            self.register(token, options.lifetime, options.vars)?;
        }
        self.index.save()?;

        let blobs = self.index.get_files(token)?;
        let names = match options.save {
            Materialize::No => return Ok(blobs),
            Materialize::DefaultNames => {
                let names = self.adapters.default_filenames(&token.artifact)?;
                if let Some(name) = names.iter().find(|name| !is_contained(name)) {
                    return Err(ArtcacheError::fetch(
                        name.display().to_string(),
                        "default file name must stay inside the destination directory",
                    ));
                }
                names
            }
            Materialize::To(names) => names,
        };

        if names.len() != blobs.len() {
            return Err(ArtcacheError::DestinationMismatch {
                expected: blobs.len(),
                got: names.len(),
            });
        }

        let base = match options.cwd {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| ArtcacheError::io("getting current directory", e))?,
        };

        let mut written = Vec::with_capacity(blobs.len());
        for (blob, name) in blobs.iter().zip(names) {
            let dest = base.join(name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| ArtcacheError::io(format!("creating {}", parent.display()), e))?;
            }
            fs::copy(blob, &dest)
                .map_err(|e| ArtcacheError::io(format!("copying to {}", dest.display()), e))?;
            debug!("Copied {} to {}", blob.display(), dest.display());
            written.push(dest);
        }
        Ok(written)
    }
}

/// Relative path with no `..` or root components
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::FakeAdapter;
    use crate::index::DEFAULT_MAX_HISTORY;
    use crate::store::hash_file;
    use crate::token::{ArtifactKind, Gist};
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_cacher(fake: &FakeAdapter) -> (Cacher, TempDir) {
        let temp = TempDir::new().unwrap();
        let adapters = Adapters::empty()
            .with_repo_file(fake.clone())
            .with_gist(fake.clone());
        let cacher = Cacher::open(temp.path().join("base"), adapters).unwrap();
        (cacher, temp)
    }

    fn token() -> Token {
        Token::repo_file("a", "b", "f.txt")
    }

    fn content_hash(body: &str) -> ContentHash {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x");
        fs::write(&path, body).unwrap();
        hash_file(&path).unwrap()
    }

    fn backdate(cacher: &mut Cacher, token: &Token, secs: i64) {
        cacher
            .index_mut()
            .set_last_checked(token, Utc::now() - Duration::seconds(secs))
            .unwrap();
    }

    #[test]
    fn register_records_lifetime_and_files() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);

        assert!(cacher.register(&token(), Some(3600), None).unwrap());

        let index = cacher.index();
        assert_eq!(index.len(), 1);
        let vars = index.get_vars(&token()).unwrap();
        assert_eq!(vars.lifetime, Some(3600));
        assert!(vars.last_checked.is_none());
        assert_eq!(index.get_hashes(&token()).unwrap(), &[content_hash("v1")]);
    }

    #[test]
    fn register_is_idempotent() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);

        assert!(cacher.register(&token(), Some(3600), None).unwrap());
        fake.set_files(&[("f.txt", "v2")]);
        assert!(!cacher.register(&token(), Some(3600), None).unwrap());

        assert_eq!(fake.fetches(), 1);
        assert_eq!(
            cacher.index().get_hashes(&token()).unwrap(),
            &[content_hash("v1")]
        );
    }

    #[test]
    fn no_lifetime_never_expires() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), None, None).unwrap();
        fake.set_stale(true);

        assert!(!cacher.check_expired(&token()).unwrap());
    }

    #[test]
    fn lifetime_without_check_is_expired() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();

        assert!(cacher.check_expired(&token()).unwrap());
    }

    #[test]
    fn ttl_decides_expiry() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();

        backdate(&mut cacher, &token(), 60);
        assert!(!cacher.check_expired(&token()).unwrap());

        backdate(&mut cacher, &token(), 7200);
        assert!(cacher.check_expired(&token()).unwrap());
    }

    #[test]
    fn freshness_probe_overrides_unexpired_ttl() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();
        backdate(&mut cacher, &token(), 60);

        fake.set_stale(true);
        assert!(cacher.check_expired(&token()).unwrap());
    }

    #[test]
    fn huge_lifetime_does_not_overflow() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(u64::MAX), None).unwrap();
        backdate(&mut cacher, &token(), 7200);

        assert!(!cacher.check_expired(&token()).unwrap());
    }

    #[test]
    fn check_refreshes_and_historizes() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();
        backdate(&mut cacher, &token(), 7200);
        assert!(cacher.check_expired(&token()).unwrap());

        fake.set_files(&[("f.txt", "v2")]);
        let outcome = cacher.check(&token(), true).unwrap();

        let CheckOutcome::Refreshed { historical } = outcome else {
            panic!("expected a refresh");
        };
        let index = cacher.index();
        let current = index.hash(&token());

        assert_eq!(index.get_hashes(&historical).unwrap(), &[content_hash("v1")]);
        assert_eq!(index.get_hashes(&current).unwrap(), &[content_hash("v2")]);
        assert_eq!(
            index.get_token(&historical).unwrap().newer.as_ref(),
            Some(&current)
        );
        assert!(index.get_token(&current).unwrap().newer.is_none());
        assert!(index.is_current(&current));
        assert!(!index.is_current(&historical));
        assert!(!cacher.check_expired(&token()).unwrap());
        assert!(index.path().is_file());
    }

    #[test]
    fn repeated_refreshes_keep_bounded_history() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(1), None).unwrap();

        for _ in 0..50 {
            backdate(&mut cacher, &token(), 7200);
            cacher.check(&token(), false).unwrap();
        }

        assert_eq!(fake.fetches(), 51);
        assert_eq!(cacher.index().len(), 1 + DEFAULT_MAX_HISTORY);
        assert_eq!(
            cacher.index().history(&token()).unwrap().len(),
            DEFAULT_MAX_HISTORY
        );
    }

    #[test]
    fn check_fresh_token_does_nothing() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), None, None).unwrap();

        assert_eq!(cacher.check(&token(), true).unwrap(), CheckOutcome::Fresh);
        assert_eq!(fake.fetches(), 1);
        assert_eq!(cacher.index().len(), 1);
    }

    #[test]
    fn check_unknown_token_is_not_found() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);

        let err = cacher.check(&token(), true).unwrap_err();
        assert!(matches!(err, ArtcacheError::TokenNotFound(_)));
        assert!(!cacher.index().path().exists());
        assert_eq!(fake.fetches(), 0);
    }

    #[test]
    fn failed_fetch_leaves_record_intact() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();

        fake.set_files(&[("f.txt", "v2"), ("g.txt", "v2b")]);
        fake.set_fail(true);
        let err = cacher.check(&token(), true).unwrap_err();

        assert!(matches!(err, ArtcacheError::Fetch { .. }));
        assert_eq!(cacher.index().len(), 1);
        assert_eq!(
            cacher.index().get_hashes(&token()).unwrap(),
            &[content_hash("v1")]
        );
        assert!(cacher
            .index()
            .get_vars(&token())
            .unwrap()
            .last_checked
            .is_none());
    }

    #[test]
    fn scratch_dirs_are_removed() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(1), None).unwrap();

        fake.set_fail(true);
        assert!(cacher.check(&token(), false).is_err());

        let dirs = fake.scratch_dirs();
        assert_eq!(dirs.len(), 2);
        assert!(dirs.iter().all(|d| !d.exists()));
    }

    #[test]
    fn fetch_keeps_adapter_order() {
        let fake = FakeAdapter::serving(&[("b.txt", "second"), ("a.txt", "first")]);
        let (cacher, _temp) = test_cacher(&fake);

        let hashes = cacher.fetch(&token()).unwrap();
        assert_eq!(hashes, vec![content_hash("second"), content_hash("first")]);
        assert!(hashes.iter().all(|h| cacher.index().store().contains(h)));
        assert!(cacher.index().is_empty());
    }

    #[test]
    fn missing_adapter_surfaces() {
        let temp = TempDir::new().unwrap();
        let mut cacher = Cacher::open(temp.path(), Adapters::empty()).unwrap();
        let gist = Token::new(Gist {
            id: "abc".to_string(),
            filename: None,
        });

        let err = cacher.register(&gist, None, None).unwrap_err();
        assert!(matches!(err, ArtcacheError::NoAdapter(ArtifactKind::Gist)));
        assert!(cacher.index().is_empty());
    }

    #[test]
    fn check_all_saves_once() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        let other = Token::repo_file("a", "b", "g.txt");
        let gist = Token::parse(r#"{"id":"abc"}"#).unwrap();
        for t in [&token(), &other, &gist] {
            cacher.register(t, Some(3600), None).unwrap();
        }

        fake.set_files(&[("f.txt", "v2")]);
        assert_eq!(cacher.check_all(true).unwrap(), 3);
        assert_eq!(cacher.index().writes(), 1);
        assert_eq!(cacher.index().len(), 6);

        assert_eq!(cacher.check_all(false).unwrap(), 0);
        assert_eq!(cacher.index().writes(), 1);
    }

    #[test]
    fn check_all_skips_history() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        cacher.register(&token(), Some(3600), None).unwrap();
        fake.set_files(&[("f.txt", "v2")]);
        cacher.check(&token(), false).unwrap();

        // The snapshot carries the lifetime but no fresh check stamp
        backdate(&mut cacher, &token(), 7200);
        assert_eq!(cacher.check_all(false).unwrap(), 1);
        assert_eq!(fake.fetches(), 3);
    }

    #[test]
    fn at_returns_blob_paths() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1"), ("g.txt", "v1b")]);
        let (mut cacher, _temp) = test_cacher(&fake);

        let paths = cacher.at(&token(), AtOptions::default()).unwrap();

        assert_eq!(paths.len(), 2);
        let recorded = cacher.index().get_hashes(&token()).unwrap().to_vec();
        for (path, hash) in paths.iter().zip(&recorded) {
            assert!(path.is_absolute() && path.is_file());
            assert_eq!(&hash_file(path).unwrap(), hash);
        }
        assert!(cacher.index().path().is_file());
    }

    #[test]
    fn at_registers_once_then_checks() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, _temp) = test_cacher(&fake);
        let options = AtOptions {
            lifetime: Some(3600),
            ..Default::default()
        };

        cacher.at(&token(), options.clone()).unwrap();
        assert_eq!(cacher.index().get_lifetime(&token()), Some(3600));

        // Registered without a check stamp, so the next call refreshes
        cacher.at(&token(), options.clone()).unwrap();
        cacher.at(&token(), options).unwrap();
        assert_eq!(fake.fetches(), 2);
        assert_eq!(cacher.index().len(), 2);
    }

    #[test]
    fn at_copies_to_default_names() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, temp) = test_cacher(&fake);
        let out = temp.path().join("out");

        let written = cacher
            .at(
                &token(),
                AtOptions {
                    save: Materialize::DefaultNames,
                    cwd: Some(out.clone()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(written, vec![out.join("f.txt")]);
        assert_eq!(fs::read_to_string(out.join("f.txt")).unwrap(), "v1");
    }

    #[test]
    fn at_rejects_default_names_outside_cwd() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, temp) = test_cacher(&fake);
        let out = temp.path().join("out");
        let outside = temp.path().join("escaped.txt");

        for name in [outside.to_str().unwrap(), "../escaped.txt", "a/../../escaped.txt"] {
            fake.set_default_names(&[name]);
            let err = cacher
                .at(
                    &token(),
                    AtOptions {
                        save: Materialize::DefaultNames,
                        cwd: Some(out.clone()),
                        ..Default::default()
                    },
                )
                .unwrap_err();
            assert!(matches!(err, ArtcacheError::Fetch { .. }), "{}", name);
        }

        assert!(!outside.exists());
        assert!(!out.exists());
    }

    #[test]
    fn contained_names() {
        assert!(is_contained(Path::new("f.txt")));
        assert!(is_contained(Path::new("./dir/f.txt")));
        assert!(!is_contained(Path::new("/f.txt")));
        assert!(!is_contained(Path::new("dir/../../f.txt")));
    }

    #[test]
    fn at_copies_to_explicit_names() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, temp) = test_cacher(&fake);
        let dest = temp.path().join("nested/dir/renamed.txt");

        cacher
            .at(
                &token(),
                AtOptions {
                    save: Materialize::To(vec![dest.clone()]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(fs::read_to_string(dest).unwrap(), "v1");
    }

    #[test]
    fn at_rejects_wrong_destination_count() {
        let fake = FakeAdapter::serving(&[("f.txt", "v1")]);
        let (mut cacher, temp) = test_cacher(&fake);

        let err = cacher
            .at(
                &token(),
                AtOptions {
                    save: Materialize::To(vec![
                        temp.path().join("one"),
                        temp.path().join("two"),
                    ]),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ArtcacheError::DestinationMismatch {
                expected: 1,
                got: 2
            }
        ));
        assert!(!temp.path().join("one").exists());
    }
}
