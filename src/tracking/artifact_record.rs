//! Artifact Record - content-addressed run outputs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A file written by a run.
///
/// The `cas_hash` has the form `algorithm:hex_digest`, e.g.
/// `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    key: String,
    path: PathBuf,
    cas_hash: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create an artifact record stamped with the current time.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        path: impl Into<PathBuf>,
        cas_hash: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            cas_hash: cas_hash.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Get the artifact key (file name).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the path the artifact was written to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the content-addressable hash.
    #[must_use]
    pub fn cas_hash(&self) -> &str {
        &self.cas_hash
    }

    /// Get the artifact size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Format a finished SHA-256 digest as a content address.
#[must_use]
pub fn sha256_address(hasher: Sha256) -> String {
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
