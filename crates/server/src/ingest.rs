//! Spool ingestor.
//!
//! Hands each delivered payload to the external query engine by dropping it
//! into a spool directory. Files are named by the SHA-256 of the dataset URL,
//! so reloading a URL replaces its file. Writes go to a temp file first and
//! are renamed into place, so the engine never observes a partial payload.

use async_trait::async_trait;
use bytes::Bytes;
use dsync_core::{Error, IngestOutcome, Ingestor};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct SpoolIngestor {
    dir: PathBuf,
    seq: AtomicU64,
}

impl SpoolIngestor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), seq: AtomicU64::new(0) }
    }

    /// Final location of the payload for `url`.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.bin", hex::encode(digest)))
    }

    fn temp_path(&self, target: &Path) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        target.with_extension(format!("tmp-{}-{seq}", std::process::id()))
    }
}

fn ingest_failed(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::IngestFailed(format!("{action} {}: {err}", path.display()))
}

#[async_trait]
impl Ingestor for SpoolIngestor {
    async fn ingest(&self, url: &str, payload: Bytes) -> Result<IngestOutcome, Error> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ingest_failed("create", &self.dir, e))?;

        let target = self.path_for(url);
        let temp = self.temp_path(&target);

        if let Err(e) = tokio::fs::write(&temp, &payload).await {
            tokio::fs::remove_file(&temp).await.ok();
            return Err(ingest_failed("write", &temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            tokio::fs::remove_file(&temp).await.ok();
            return Err(ingest_failed("rename", &target, e));
        }

        tracing::debug!(url, path = %target.display(), size = payload.len(), "payload spooled");
        Ok(IngestOutcome::Ingested)
    }
}
