//! Write-once audio file storage.
//!
//! Every synthesis produces a new uniquely named file, even for identical
//! text — no caching, no dedup. Nothing deletes these files; retention is
//! outside the relay's scope, so long-running deployments accumulate them.

use std::path::{Path, PathBuf};

use ringback_core::error::Result;
use tracing::debug;

pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// Open the store, creating the directory if absent.
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist synthesized audio under a fresh unique filename.
    pub async fn save(&self, bytes: &[u8]) -> Result<String> {
        let filename = format!("{}.mp3", uuid::Uuid::new_v4());
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Saved audio file");
        Ok(filename)
    }

    /// Publicly reachable URL for a stored file, relative to `base_url`.
    pub fn public_url(&self, base_url: &str, filename: &str) -> String {
        format!("{}/audio/{}", base_url.trim_end_matches('/'), filename)
    }
}
