//! Single-slot file mailboxes.
//!
//! Each mailbox is one plain UTF-8 file that is overwritten, never appended.
//! The command side is drained with [`Mailbox::take`], which truncates the
//! file so a payload is delivered at most once. The response side is written
//! through a temp file and an atomic rename so readers never observe a
//! partially written document.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct Mailbox {
    path: PathBuf,
}

impl Mailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates the file to zero length, creating it if needed.
    pub async fn clear(&self) -> io::Result<()> {
        fs::write(&self.path, "").await
    }

    /// Last modification time, or `None` when the file does not exist yet.
    pub async fn modified(&self) -> Option<SystemTime> {
        let metadata = fs::metadata(&self.path).await.ok()?;
        metadata.modified().ok()
    }

    /// Reads and strips the current content. Non-empty content is truncated
    /// away immediately so it cannot be delivered twice.
    pub async fn take(&self) -> io::Result<Option<String>> {
        let content = fs::read_to_string(&self.path).await?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let payload = trimmed.to_string();
        self.clear().await?;
        Ok(Some(payload))
    }

    /// Replaces the file with pretty-printed JSON for `value`.
    pub async fn write_pretty<T: Serialize>(&self, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await
    }
}
