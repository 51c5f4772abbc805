//! Token model for remote artifacts
//!
//! A token describes one remote artifact. The variant is carried as an
//! explicit `kind` tag when persisted; untagged input is still accepted by
//! [`Token::parse`], which infers the kind from the discriminating field.

use crate::error::{ArtcacheError, ArtcacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity digest of a token (hex SHA-256 over its canonical form)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TokenHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TokenHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Supported artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A file inside a repository branch
    RepoFile,
    /// A gist, optionally narrowed to one file
    Gist,
    /// A release asset
    Release,
}

impl ArtifactKind {
    /// Tag value used in persisted tokens
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::RepoFile => "repo_file",
            Self::Gist => "gist",
            Self::Release => "release",
        }
    }

    /// Infer the kind of an untagged token from its discriminating field.
    ///
    /// Precedence is `path`, then `id`, then `tag`; the field sets of the
    /// variants must stay disjoint for this to be unambiguous.
    fn infer(map: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        if map.contains_key("path") {
            Some(Self::RepoFile)
        } else if map.contains_key("id") {
            Some(Self::Gist)
        } else if map.contains_key("tag") {
            Some(Self::Release)
        } else {
            None
        }
    }

    /// Field names a token of this kind may carry, besides `kind` and `newer`
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Self::RepoFile => &["org", "repo", "branch", "path"],
            Self::Gist => &["id", "filename"],
            Self::Release => &["org", "repo", "tag", "filename"],
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// File at `path` in `branch` of `org/repo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    pub org: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub path: String,
}

impl RepoFile {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            branch: None,
            path: path.into(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Gist `id`, optionally a single `filename` from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Asset `filename` of release `tag` in `org/repo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub org: String,
    pub repo: String,
    pub tag: String,
    pub filename: String,
}

/// The remote artifact a token points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    RepoFile(RepoFile),
    Gist(Gist),
    Release(Release),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::RepoFile(_) => ArtifactKind::RepoFile,
            Self::Gist(_) => ArtifactKind::Gist,
            Self::Release(_) => ArtifactKind::Release,
        }
    }

    /// All present fields as `(name, value)` pairs, including the kind tag
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("kind", self.kind().as_tag())];
        match self {
            Self::RepoFile(f) => {
                fields.push(("org", f.org.as_str()));
                fields.push(("repo", f.repo.as_str()));
                if let Some(branch) = &f.branch {
                    fields.push(("branch", branch.as_str()));
                }
                fields.push(("path", f.path.as_str()));
            }
            Self::Gist(g) => {
                fields.push(("id", g.id.as_str()));
                if let Some(filename) = &g.filename {
                    fields.push(("filename", filename.as_str()));
                }
            }
            Self::Release(r) => {
                fields.push(("org", r.org.as_str()));
                fields.push(("repo", r.repo.as_str()));
                fields.push(("tag", r.tag.as_str()));
                fields.push(("filename", r.filename.as_str()));
            }
        }
        fields
    }
}

impl From<RepoFile> for Artifact {
    fn from(f: RepoFile) -> Self {
        Self::RepoFile(f)
    }
}

impl From<Gist> for Artifact {
    fn from(g: Gist) -> Self {
        Self::Gist(g)
    }
}

impl From<Release> for Artifact {
    fn from(r: Release) -> Self {
        Self::Release(r)
    }
}

/// A token: an artifact plus an optional link to the record that superseded it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(flatten)]
    pub artifact: Artifact,

    /// Hash of the record that replaced this one; present only on history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newer: Option<TokenHash>,
}

impl Token {
    pub fn new(artifact: impl Into<Artifact>) -> Self {
        Self {
            artifact: artifact.into(),
            newer: None,
        }
    }

    /// Shorthand for a repo file token on the default branch
    pub fn repo_file(
        org: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(RepoFile::new(org, repo, path))
    }

    /// Parse a token from JSON, tagged or untagged
    pub fn parse(input: &str) -> ArtcacheResult<Self> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| ArtcacheError::InvalidVariant(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Build a token from a JSON object, inferring `kind` when absent
    pub fn from_value(value: serde_json::Value) -> ArtcacheResult<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(ArtcacheError::InvalidVariant(
                "token must be a JSON object".to_string(),
            ));
        };

        let kind = match map.get("kind").cloned() {
            Some(tag) => ArtifactKind::deserialize(tag)
                .map_err(|e| ArtcacheError::InvalidVariant(format!("unknown kind: {}", e)))?,
            None => {
                let kind = ArtifactKind::infer(&map).ok_or_else(|| {
                    ArtcacheError::InvalidVariant(
                        "token has none of the fields path, id, tag".to_string(),
                    )
                })?;
                map.insert("kind".to_string(), kind.as_tag().into());
                kind
            }
        };

        // Extra keys would be dropped silently and not reach the hash
        let allowed = kind.field_names();
        let foreign = map.keys().find(|key| {
            let key = key.as_str();
            !matches!(key, "kind" | "newer") && !allowed.contains(&key)
        });
        if let Some(key) = foreign {
            return Err(ArtcacheError::InvalidVariant(format!(
                "field `{}` is not allowed on {} tokens",
                key, kind
            )));
        }

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| ArtcacheError::InvalidVariant(e.to_string()))
    }

    pub fn kind(&self) -> ArtifactKind {
        self.artifact.kind()
    }

    /// Whether this token is the live version (not history)
    pub fn is_current(&self) -> bool {
        self.newer.is_none()
    }

    /// Copy of this token marked as superseded by `newer`
    pub fn superseded_by(&self, newer: &TokenHash) -> Self {
        Self {
            artifact: self.artifact.clone(),
            newer: Some(newer.clone()),
        }
    }

    /// All present fields as `(name, value)` pairs
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = self.artifact.fields();
        if let Some(newer) = &self.newer {
            fields.push(("newer", newer.as_str()));
        }
        fields
    }

    /// Value of a single field, if present
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artifact {
            Artifact::RepoFile(r) => write!(
                f,
                "{}/{}@{}:{}",
                r.org,
                r.repo,
                r.branch.as_deref().unwrap_or("-"),
                r.path
            ),
            Artifact::Gist(g) => match &g.filename {
                Some(name) => write!(f, "gist:{}/{}", g.id, name),
                None => write!(f, "gist:{}", g.id),
            },
            Artifact::Release(r) => {
                write!(f, "{}/{}@{}:{}", r.org, r.repo, r.tag, r.filename)
            }
        }
    }
}
