//! Persistent token index
//!
//! Three parallel maps keyed by token hash, persisted together as one JSON
//! file at `<base>/index`:
//!
//! | Map | Value |
//! |-----|-------|
//! | `vars` | lifetime, last check time, caller-supplied extras |
//! | `tokens` | the token itself |
//! | `files` | ordered content hashes of the artifact's current file set |
//!
//! Blobs referenced from `files` live in the [`ContentStore`] at `<base>/cache`.
//!
//! # Persistence
//!
//! `save` rewrites the whole file through a temp file and rename, so a crash
//! mid-write never leaves a truncated index. There is no locking: two
//! processes saving the same index will lose one another's updates.

use crate::error::{ArtcacheError, ArtcacheResult};
use crate::hasher::TokenHasher;
use crate::store::{ContentHash, ContentStore};
use crate::token::{Token, TokenHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default number of history snapshots kept per token
pub const DEFAULT_MAX_HISTORY: usize = 5;

/// Per-token variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vars {
    /// Seconds after a check before the record is eligible for refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<u64>,

    /// When the record was last refreshed
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub last_checked: Option<DateTime<Utc>>,

    /// Caller-supplied values carried alongside the record
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// On-disk index layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexData {
    #[serde(default)]
    pub vars: BTreeMap<TokenHash, Vars>,
    #[serde(default)]
    pub tokens: BTreeMap<TokenHash, Token>,
    #[serde(default)]
    pub files: BTreeMap<TokenHash, Vec<ContentHash>>,
}

/// Anything that identifies an index record: a token or its hash
pub trait IndexKey {
    fn token_hash(&self, hasher: &TokenHasher) -> TokenHash;
}

impl IndexKey for Token {
    fn token_hash(&self, hasher: &TokenHasher) -> TokenHash {
        hasher.hash(self)
    }
}

impl IndexKey for TokenHash {
    fn token_hash(&self, _hasher: &TokenHasher) -> TokenHash {
        self.clone()
    }
}

/// Token index backed by a JSON file
#[derive(Debug)]
pub struct Index {
    index_path: PathBuf,
    store: ContentStore,
    hasher: TokenHasher,
    data: IndexData,
    max_history: usize,
    writes: u64,
}

impl Index {
    /// Open the index under `base`, loading `<base>/index` if present
    pub fn open(base: impl AsRef<Path>) -> ArtcacheResult<Self> {
        let base = base.as_ref();
        Self::with_paths(base.join("cache"), base.join("index"))
    }

    /// Open an index whose blob store and index file live apart
    pub fn with_paths(
        cache_dir: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
    ) -> ArtcacheResult<Self> {
        let store = ContentStore::open(cache_dir)?;
        let index_path = std::path::absolute(index_path.as_ref()).map_err(|e| {
            ArtcacheError::io(format!("resolving {}", index_path.as_ref().display()), e)
        })?;

        let mut index = Self {
            index_path,
            store,
            hasher: TokenHasher::new(),
            data: IndexData::default(),
            max_history: DEFAULT_MAX_HISTORY,
            writes: 0,
        };
        index.load()?;
        Ok(index)
    }

    /// Replace the token hasher (e.g. to change its memo capacity)
    pub fn with_hasher(mut self, hasher: TokenHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Keep at most `max` snapshots per token (at least one)
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max.max(1);
        self
    }

    /// Reload from disk; a missing file yields an empty index
    pub fn load(&mut self) -> ArtcacheResult<()> {
        if !self.index_path.exists() {
            debug!("Index {} not found, starting empty", self.index_path.display());
            self.data = IndexData::default();
            return Ok(());
        }

        let content = fs::read_to_string(&self.index_path).map_err(|e| {
            ArtcacheError::io(format!("reading index {}", self.index_path.display()), e)
        })?;
        self.data = serde_json::from_str(&content)?;

        debug!(
            "Loaded index {} ({} records)",
            self.index_path.display(),
            self.data.tokens.len()
        );
        Ok(())
    }

    /// Write all maps back to the index file
    pub fn save(&mut self) -> ArtcacheResult<()> {
        let dir = self.index_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| ArtcacheError::io(format!("creating {}", dir.display()), e))?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| ArtcacheError::io("creating staging file for index", e))?;
        serde_json::to_writer_pretty(&mut staged, &self.data)?;
        staged
            .flush()
            .map_err(|e| ArtcacheError::io("flushing index", e))?;
        staged.persist(&self.index_path).map_err(|e| {
            ArtcacheError::io(format!("writing index {}", self.index_path.display()), e.error)
        })?;

        self.writes += 1;
        debug!("Saved index {}", self.index_path.display());
        Ok(())
    }

    /// Index file path
    pub fn path(&self) -> &Path {
        &self.index_path
    }

    /// Blob store backing this index
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Identity hash of a token
    pub fn hash(&self, token: &Token) -> TokenHash {
        self.hasher.hash(token)
    }

    /// Number of records, history included
    pub fn len(&self) -> usize {
        self.data.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.tokens.is_empty()
    }

    /// Number of successful saves since this index was opened
    pub(crate) fn writes(&self) -> u64 {
        self.writes
    }

    pub fn exists(&self, key: &impl IndexKey) -> bool {
        self.data
            .tokens
            .contains_key(&key.token_hash(&self.hasher))
    }

    /// Insert a new record, returning its hash
    pub fn add_new(
        &mut self,
        token: Token,
        hashes: Vec<ContentHash>,
        lifetime: Option<u64>,
        vars: Option<Vars>,
    ) -> TokenHash {
        let thash = self.hasher.hash(&token);

        let mut vars = vars.unwrap_or_default();
        if lifetime.is_some() {
            vars.lifetime = lifetime;
        }

        self.data.tokens.insert(thash.clone(), token);
        self.data.vars.insert(thash.clone(), vars);
        self.data.files.insert(thash.clone(), hashes);
        thash
    }

    /// Hash of `key`, failing if no such record exists
    fn require(&self, key: &impl IndexKey) -> ArtcacheResult<TokenHash> {
        let thash = key.token_hash(&self.hasher);
        if self.data.tokens.contains_key(&thash) {
            Ok(thash)
        } else {
            Err(ArtcacheError::TokenNotFound(thash))
        }
    }

    pub fn get_token(&self, key: &impl IndexKey) -> ArtcacheResult<&Token> {
        let thash = key.token_hash(&self.hasher);
        self.data
            .tokens
            .get(&thash)
            .ok_or(ArtcacheError::TokenNotFound(thash))
    }

    pub fn get_vars(&self, key: &impl IndexKey) -> ArtcacheResult<Vars> {
        let thash = self.require(key)?;
        Ok(self.data.vars.get(&thash).cloned().unwrap_or_default())
    }

    /// Content hashes of the record's file set, in fetch order
    pub fn get_hashes(&self, key: &impl IndexKey) -> ArtcacheResult<&[ContentHash]> {
        let thash = self.require(key)?;
        Ok(self
            .data
            .files
            .get(&thash)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Absolute blob paths of the record's file set, in fetch order
    pub fn get_files(&self, key: &impl IndexKey) -> ArtcacheResult<Vec<PathBuf>> {
        self.get_hashes(key)?
            .iter()
            .map(|hash| {
                let path = self.store.resolve(hash);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ArtcacheError::BlobMissing(hash.clone()))
                }
            })
            .collect()
    }

    /// Configured lifetime, `None` for unknown records too
    pub fn get_lifetime(&self, key: &impl IndexKey) -> Option<u64> {
        let thash = key.token_hash(&self.hasher);
        self.data.vars.get(&thash).and_then(|v| v.lifetime)
    }

    /// Stamp the record as checked now
    pub fn update_last_checked(&mut self, key: &impl IndexKey) -> ArtcacheResult<()> {
        self.set_last_checked(key, Utc::now())
    }

    /// Stamp the record as checked at `at`
    pub fn set_last_checked(
        &mut self,
        key: &impl IndexKey,
        at: DateTime<Utc>,
    ) -> ArtcacheResult<()> {
        let thash = self.require(key)?;
        self.data.vars.entry(thash).or_default().last_checked = Some(at);
        Ok(())
    }

    /// Set or clear the record's lifetime
    pub fn update_lifetime(
        &mut self,
        key: &impl IndexKey,
        lifetime: Option<u64>,
    ) -> ArtcacheResult<()> {
        let thash = self.require(key)?;
        self.data.vars.entry(thash).or_default().lifetime = lifetime;
        Ok(())
    }

    /// Overwrite the record's current file set
    pub fn update_hashes(
        &mut self,
        key: &impl IndexKey,
        hashes: Vec<ContentHash>,
    ) -> ArtcacheResult<()> {
        let thash = self.require(key)?;
        self.data.files.insert(thash, hashes);
        Ok(())
    }

    /// True if the record exists and is not history
    pub fn is_current(&self, key: &impl IndexKey) -> bool {
        self.get_token(key).is_ok_and(Token::is_current)
    }

    /// Snapshot the record's current state into a history record.
    ///
    /// The snapshot's token is the current token with `newer` pointing back
    /// at the current hash; its vars and files are copies of the current
    /// ones. Returns the snapshot's hash. The caller then overwrites the
    /// current record with fresh values.
    ///
    /// A token refreshed more than once would map every snapshot to the same
    /// slot, so any history already there is shifted one step further back
    /// first. Each history record's `newer` points at the slot that replaced
    /// it, forming a chain from the current record to the oldest snapshot.
    /// The chain holds at most `max_history` snapshots; older ones are
    /// removed from the index (their blobs stay in the store).
    pub fn historize(&mut self, key: &impl IndexKey) -> ArtcacheResult<TokenHash> {
        let current = self.require(key)?;
        let token = self.data.tokens[&current].clone();

        // slots[0] is the current record; the last slot is free
        let mut slots = vec![current];
        loop {
            let next = self.hasher.hash(&token.superseded_by(&slots[slots.len() - 1]));
            let occupied = self.data.tokens.contains_key(&next);
            slots.push(next);
            if !occupied {
                break;
            }
        }

        let keep = (slots.len() - 1).min(self.max_history);
        for stale in slots.drain(keep + 1..) {
            self.remove_record(&stale);
        }

        for k in (0..keep).rev() {
            let snapshot = token.superseded_by(&slots[k]);
            self.copy_record(&slots[k], &slots[k + 1], snapshot);
        }

        debug!(
            "Historized {} as {} ({} snapshot(s))",
            slots[0].short(),
            slots[1].short(),
            keep
        );
        Ok(slots.swap_remove(1))
    }

    fn remove_record(&mut self, thash: &TokenHash) {
        if self.data.tokens.remove(thash).is_some() {
            debug!("Dropped history record {}", thash.short());
        }
        self.data.vars.remove(thash);
        self.data.files.remove(thash);
    }

    fn copy_record(&mut self, from: &TokenHash, to: &TokenHash, token: Token) {
        let vars = self.data.vars.get(from).cloned().unwrap_or_default();
        let files = self.data.files.get(from).cloned().unwrap_or_default();

        self.data.tokens.insert(to.clone(), token);
        self.data.vars.insert(to.clone(), vars);
        self.data.files.insert(to.clone(), files);
    }

    /// History of a record, newest snapshot first
    pub fn history(&self, key: &impl IndexKey) -> ArtcacheResult<Vec<TokenHash>> {
        let current = self.require(key)?;
        let token = &self.data.tokens[&current];

        let mut history = Vec::new();
        let mut newer = current;
        loop {
            let slot = self.hasher.hash(&token.superseded_by(&newer));
            if !self.data.tokens.contains_key(&slot) {
                break;
            }
            history.push(slot.clone());
            newer = slot;
        }
        Ok(history)
    }

    /// First token whose fields equal every `(field, value)` filter
    pub fn match_token(&self, filters: &[(&str, &str)], current_only: bool) -> Option<&Token> {
        self.data.tokens.values().find(|token| {
            if current_only && !token.is_current() {
                return false;
            }
            filters
                .iter()
                .all(|(field, value)| token.field(field) == Some(*value))
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&TokenHash, &Token)> {
        self.data.tokens.iter()
    }

    /// Tokens that are not history
    pub fn current_tokens(&self) -> impl Iterator<Item = (&TokenHash, &Token)> {
        self.data.tokens.iter().filter(|(_, t)| t.is_current())
    }

    pub fn vars(&self) -> impl Iterator<Item = (&TokenHash, &Vars)> {
        self.data.vars.iter()
    }

    pub fn files(&self) -> impl Iterator<Item = (&TokenHash, &Vec<ContentHash>)> {
        self.data.files.iter()
    }
}
