//! Interrupt-safe JSON persistence.
//!
//! Every write is bracketed by [`InFlightSlot::begin`] and [`InFlightGuard::finish`].
//! While a write is open the slot names its path, so an interrupt handler can
//! remove the half-written file with [`InFlightSlot::discard`]. The pipeline
//! writes one file at a time, so a single slot is enough.

use crate::errors::{AppError, AppResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct InFlightSlot {
    inner: Arc<Mutex<Option<PathBuf>>>,
}

impl InFlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PathBuf>> {
        // Poisoning only means a writer panicked; the path is still meaningful.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks `path` as being written. Dropping the guard without calling
    /// [`InFlightGuard::finish`] removes the partial file.
    pub fn begin(&self, path: &Path) -> InFlightGuard {
        let mut slot = self.lock();
        if let Some(stale) = slot.as_ref() {
            warn!(stale = %stale.display(), "in-flight slot was not cleared");
        }
        *slot = Some(path.to_path_buf());
        debug!(path = %path.display(), "write begin");
        InFlightGuard {
            slot: self.clone(),
            path: path.to_path_buf(),
            finished: false,
        }
    }

    fn end(&self) {
        self.lock().take();
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    /// Empties the slot and deletes the file it named. Returns the deleted path.
    pub fn discard(&self) -> Option<PathBuf> {
        let path = self.lock().take()?;
        remove_partial(&path);
        Some(path)
    }
}

/// Open write on the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    slot: InFlightSlot,
    path: PathBuf,
    finished: bool,
}

impl InFlightGuard {
    pub fn finish(mut self) {
        self.finished = true;
        self.slot.end();
        debug!(path = %self.path.display(), "write end");
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Abandoned mid-write: either an error or the future was dropped.
        let mut slot = self.slot.lock();
        if slot.as_deref() == Some(self.path.as_path()) {
            slot.take();
            drop(slot);
            remove_partial(&self.path);
        }
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}

/// Serializes `data` compactly and writes it to `fpath` under the slot.
pub async fn write_json(slot: &InFlightSlot, fpath: &Path, data: &Value) -> AppResult<()> {
    let bytes = serde_json::to_vec(data)?;
    if let Some(parent) = fpath.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::filesystem(parent, e))?;
    }

    let guard = slot.begin(fpath);
    write_bytes(fpath, &bytes)
        .await
        .map_err(|e| AppError::filesystem(fpath, e))?;
    guard.finish();
    Ok(())
}

async fn write_bytes(fpath: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(fpath).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn discard_removes_partial_file_and_clears_slot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("440000.json");
        let slot = InFlightSlot::new();

        let guard = slot.begin(&path);
        std::fs::write(&path, b"{\"type\":\"Feature").unwrap();
        assert_eq!(slot.current().as_deref(), Some(path.as_path()));

        assert_eq!(slot.discard(), Some(path.clone()));
        assert!(!path.exists());
        assert!(slot.is_empty());

        // Guard dropped after discard must not touch anything else.
        drop(guard);
        assert!(slot.is_empty());
    }

    #[test]
    fn abandoned_guard_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        let slot = InFlightSlot::new();
        {
            let _guard = slot.begin(&path);
            std::fs::write(&path, b"[1,2").unwrap();
        }
        assert!(!path.exists());
        assert!(slot.is_empty());
    }

    #[test]
    fn discard_on_empty_slot_is_noop() {
        let slot = InFlightSlot::new();
        assert_eq!(slot.discard(), None);
    }

    #[tokio::test]
    async fn write_json_leaves_slot_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("province").join("110000.json");
        let slot = InFlightSlot::new();
        let data = json!({"type": "FeatureCollection", "features": []});

        write_json(&slot, &path, &data).await.unwrap();

        assert!(slot.is_empty());
        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, data);
    }

    #[tokio::test]
    async fn failed_write_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should go.
        let path = dir.path().join("blocked.json");
        std::fs::create_dir(&path).unwrap();
        let slot = InFlightSlot::new();

        let err = write_json(&slot, &path, &json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Filesystem { .. }));
        assert!(slot.is_empty());
    }
}
