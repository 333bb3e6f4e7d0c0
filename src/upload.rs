//! Blob upload sink
//!
//! [`Uploader`] is the seam to the storage service. [`LocalBlobStore`]
//! maps containers to directories under a root and blobs to files, with
//! the same create-if-absent precondition as a conditional blob write.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{MigrateError, Result};

/// Read buffer size for uploads
const CHUNK_SIZE: usize = 64 * 1024;

/// Called with the cumulative number of bytes written
pub type Progress<'a> = &'a (dyn Fn(u64) + Send + Sync);

/// Source of a server-side copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub container: String,
    pub blob: String,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Write `content` to `container/blob`, returning the bytes written.
    ///
    /// Fails with [`MigrateError::BlobExists`] when the blob exists and
    /// overwriting is not enabled.
    async fn upload(
        &self,
        container: &str,
        blob: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
        progress: Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    /// Copy an existing blob to `container/blob` without going through the caller
    async fn copy_blob(
        &self,
        container: &str,
        blob: &str,
        source: &BlobLocation,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    /// Names of all blobs in a container, sorted
    async fn list_blobs(&self, container: &str) -> Result<Vec<String>>;
}

/// Filesystem-backed blob store: `root/<container>/<blob>`
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    overwrite: bool,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, container: &str, blob: &str) -> Result<PathBuf> {
        let is_plain = |name: &str| {
            !name.is_empty()
                && Path::new(name)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        };
        if !is_plain(container) || container.contains('/') || !is_plain(blob) {
            return Err(MigrateError::Upload {
                container: container.to_string(),
                blob: blob.to_string(),
                reason: "container and blob names must be relative paths".to_string(),
            });
        }
        Ok(self.root.join(container).join(blob))
    }

    async fn open_target(&self, container: &str, blob: &str, path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if self.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        options.open(path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => MigrateError::BlobExists {
                container: container.to_string(),
                blob: blob.to_string(),
            },
            _ => MigrateError::Upload {
                container: container.to_string(),
                blob: blob.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

#[async_trait]
impl Uploader for LocalBlobStore {
    async fn upload(
        &self,
        container: &str,
        blob: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
        progress: Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let path = self.blob_path(container, blob)?;
        trace!(container, blob, root = %self.root.display(), "uploading blob");
        let mut target = self.open_target(container, blob, &path).await?;

        let copied = async {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let mut written = 0u64;
            loop {
                if cancel.is_cancelled() {
                    return Err(MigrateError::Cancelled);
                }
                let n = content.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                target.write_all(&buf[..n]).await?;
                written += n as u64;
                progress(written);
            }
            target.flush().await?;
            Ok::<_, MigrateError>(written)
        }
        .await;

        let written = match copied {
            Ok(written) => written,
            Err(e) => {
                drop(target);
                // a partial blob must not block the next create-if-absent write
                let _ = fs::remove_file(&path).await;
                return Err(e);
            }
        };

        debug!(container, blob, bytes = written, "uploaded blob");
        Ok(written)
    }

    async fn copy_blob(
        &self,
        container: &str,
        blob: &str,
        source: &BlobLocation,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let source_path = self.blob_path(&source.container, &source.blob)?;
        let mut reader = File::open(&source_path).await.map_err(|e| MigrateError::Upload {
            container: source.container.clone(),
            blob: source.blob.clone(),
            reason: format!("copy source unavailable: {}", e),
        })?;
        debug!(
            from = %format!("{}/{}", source.container, source.blob),
            to = %format!("{}/{}", container, blob),
            "copying blob"
        );
        self.upload(container, blob, &mut reader, &|_: u64| {}, cancel).await
    }

    async fn list_blobs(&self, container: &str) -> Result<Vec<String>> {
        let dir = self.root.join(container);
        if !fs::try_exists(&dir).await? {
            return Ok(vec![]);
        }

        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let mut blobs = Vec::new();
            for entry in WalkDir::new(&dir).sort_by_file_name() {
                let entry = entry.map_err(|e| MigrateError::Io(e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&dir) {
                    blobs.push(to_blob_name(relative));
                }
            }
            blobs.sort();
            Ok(blobs)
        })
        .await
        .map_err(|e| MigrateError::Io(std::io::Error::other(e)))?
    }
}

/// Relative filesystem path as a `/`-separated blob name
pub fn to_blob_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    async fn upload_bytes(store: &LocalBlobStore, container: &str, blob: &str, data: &[u8]) -> Result<u64> {
        let mut reader = data;
        store
            .upload(container, blob, &mut reader, &|_: u64| {}, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_upload_writes_blob_and_reports_progress() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let seen = AtomicU64::new(0);
        let data = vec![7u8; CHUNK_SIZE + 10];

        let mut reader = data.as_slice();
        let written = store
            .upload(
                "media",
                "clips/a.bin",
                &mut reader,
                &|n: u64| seen.store(n, Ordering::SeqCst),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(written, data.len() as u64);
        assert_eq!(seen.load(Ordering::SeqCst), data.len() as u64);
        let stored = std::fs::read(dir.path().join("media/clips/a.bin")).unwrap();
        assert_eq!(stored, data);
    }

    #[tokio::test]
    async fn test_existing_blob_is_not_overwritten_by_default() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        upload_bytes(&store, "media", "a.txt", b"first").await.unwrap();

        let err = upload_bytes(&store, "media", "a.txt", b"second").await.unwrap_err();
        assert!(matches!(err, MigrateError::BlobExists { .. }));
        assert_eq!(std::fs::read(dir.path().join("media/a.txt")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_blob() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path()).with_overwrite(true);
        upload_bytes(&store, "media", "a.txt", b"first-long").await.unwrap();
        upload_bytes(&store, "media", "a.txt", b"second").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("media/a.txt")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_cancelled_upload_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut reader: &[u8] = b"data";
        let err = store
            .upload("media", "a.txt", &mut reader, &|_: u64| {}, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
        assert!(!dir.path().join("media/a.txt").exists());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        for (container, blob) in [("media", "../x"), ("..", "x"), ("media", "/etc/x"), ("", "x")] {
            let err = upload_bytes(&store, container, blob, b"x").await.unwrap_err();
            assert!(matches!(err, MigrateError::Upload { .. }), "{}/{}", container, blob);
        }
    }

    #[tokio::test]
    async fn test_copy_and_list_blobs() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        upload_bytes(&store, "source", "b/two.txt", b"2").await.unwrap();
        upload_bytes(&store, "source", "one.txt", b"1").await.unwrap();

        assert_eq!(store.list_blobs("source").await.unwrap(), vec!["b/two.txt", "one.txt"]);
        assert!(store.list_blobs("missing").await.unwrap().is_empty());

        let source = BlobLocation {
            container: "source".to_string(),
            blob: "one.txt".to_string(),
        };
        let copied = store
            .copy_blob("target", "moved/one.txt", &source, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(copied, 1);
        assert_eq!(std::fs::read(dir.path().join("target/moved/one.txt")).unwrap(), b"1");
    }

    /// Yields some bytes, then fails like a dropped connection
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(std::io::Error::new(
                    ErrorKind::ConnectionReset,
                    "connection reset",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_upload_removes_partial_blob() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let mut reader = FailingReader { sent: false };
        let err = store
            .upload("media", "a.bin", &mut reader, &|_: u64| {}, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
        assert!(!dir.path().join("media/a.bin").exists());

        // retry is not blocked by the failed attempt
        assert_eq!(upload_bytes(&store, "media", "a.bin", b"whole").await.unwrap(), 5);
        assert_eq!(std::fs::read(dir.path().join("media/a.bin")).unwrap(), b"whole");
    }
}
