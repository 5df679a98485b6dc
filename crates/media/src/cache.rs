//! Per-message attachment cache.
//!
//! A cache is created once per inbound message and shared by every
//! capability run for that message, so each attachment is read or
//! downloaded at most once. URL attachments that need a filesystem path are
//! spooled into temp files owned by the cache; [`MediaAttachmentCache::cleanup`]
//! releases them.

use std::{collections::HashMap, future::Future, io::Write, path::PathBuf, sync::Arc};

use {
    bytes::Bytes,
    tempfile::TempPath,
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use clawline_metrics::{counter, labels, media as media_metrics};

use crate::{
    attachments::{AttachmentSource, MediaAttachment},
    error::{Context, Error, Result},
    fetch::{FetchPolicy, fetch_url},
    mime::{extension_for_mime, mime_from_extension, sniff_mime},
};

/// Default ceiling for [`MediaAttachmentCache::get_path`] downloads.
pub const DEFAULT_MAX_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub fetch_policy: FetchPolicy,
    /// Size ceiling used when a caller does not pass its own.
    pub max_bytes: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::default(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// An attachment's bytes plus what we know about them.
#[derive(Debug, Clone)]
pub struct AttachmentBuffer {
    pub index: usize,
    pub data: Bytes,
    pub mime: Option<String>,
    pub file_name: Option<String>,
    pub size: u64,
}

pub struct MediaAttachmentCache {
    attachments: Vec<MediaAttachment>,
    options: CacheOptions,
    buffers: Mutex<HashMap<usize, AttachmentBuffer>>,
    downloaded: Mutex<HashMap<usize, PathBuf>>,
    temp_paths: Mutex<Vec<TempPath>>,
}

impl MediaAttachmentCache {
    #[must_use]
    pub fn new(attachments: Vec<MediaAttachment>, options: CacheOptions) -> Self {
        Self {
            attachments,
            options,
            buffers: Mutex::new(HashMap::new()),
            downloaded: Mutex::new(HashMap::new()),
            temp_paths: Mutex::new(Vec::new()),
        }
    }

    fn attachment(&self, index: usize) -> Result<&MediaAttachment> {
        self.attachments
            .get(index)
            .ok_or(Error::AttachmentNotFound { index })
    }

    /// Load an attachment's bytes, refusing anything over `max_bytes`.
    pub async fn get_buffer(&self, index: usize, max_bytes: u64) -> Result<AttachmentBuffer> {
        let attachment = self.attachment(index)?;

        if let Some(cached) = self.buffers.lock().await.get(&index) {
            if cached.size > max_bytes {
                return Err(Error::TooLarge {
                    size: cached.size,
                    max: max_bytes,
                });
            }
            return Ok(cached.clone());
        }

        let (data, content_type) = match &attachment.source {
            AttachmentSource::Path(path) => {
                let size = tokio::fs::metadata(path).await?.len();
                if size > max_bytes {
                    return Err(Error::TooLarge { size, max: max_bytes });
                }
                (Bytes::from(tokio::fs::read(path).await?), None)
            },
            AttachmentSource::Url(url) => {
                let fetched = fetch_url(url, &self.options.fetch_policy, max_bytes).await?;
                (fetched.bytes, fetched.content_type)
            },
        };

        let location = attachment.location();
        let mime = attachment
            .mime
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| sniff_mime(&data).map(str::to_string))
            .or(content_type)
            .or_else(|| mime_from_extension(&location).map(str::to_string));
        let file_name = location
            .split(['?', '#'])
            .next()
            .and_then(|p| p.rsplit('/').next())
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let size = data.len() as u64;

        debug!(index, location = %location, size, mime = ?mime, "loaded attachment");

        #[cfg(feature = "metrics")]
        counter!(
            media_metrics::BYTES_LOADED_TOTAL,
            labels::SOURCE => if attachment.source.is_url() { "url" } else { "path" }
        )
        .increment(size);

        let buffer = AttachmentBuffer {
            index,
            data,
            mime,
            file_name,
            size,
        };
        self.buffers.lock().await.insert(index, buffer.clone());
        Ok(buffer)
    }

    /// A filesystem path for the attachment. Local paths are returned as-is;
    /// URLs are downloaded into a temp file that lives until [`Self::cleanup`].
    pub async fn get_path(&self, index: usize) -> Result<PathBuf> {
        let attachment = self.attachment(index)?;
        if let AttachmentSource::Path(path) = &attachment.source {
            tokio::fs::metadata(path)
                .await
                .with_context(|| format!("attachment {index} at {}", path.display()))?;
            return Ok(path.clone());
        }

        if let Some(path) = self.downloaded.lock().await.get(&index) {
            return Ok(path.clone());
        }

        let buffer = self.get_buffer(index, self.options.max_bytes).await?;
        self.store_temp_file(&buffer).await
    }

    async fn store_temp_file(&self, buffer: &AttachmentBuffer) -> Result<PathBuf> {
        let suffix = buffer
            .mime
            .as_deref()
            .and_then(extension_for_mime)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let data = buffer.data.clone();
        let temp = tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix("clawline-media-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(|e| Error::external("temp file task failed", e))??;

        let path = temp.to_path_buf();
        debug!(index = buffer.index, path = %path.display(), "spooled attachment to temp file");
        self.temp_paths.lock().await.push(temp);
        self.downloaded.lock().await.insert(buffer.index, path.clone());
        Ok(path)
    }

    /// Release every temp file and drop cached buffers.
    ///
    /// Safe to call more than once. All temp files are attempted; the first
    /// failure is returned.
    pub async fn cleanup(&self) -> Result<()> {
        let temps = std::mem::take(&mut *self.temp_paths.lock().await);
        self.downloaded.lock().await.clear();
        self.buffers.lock().await.clear();

        let mut first_error = None;
        for temp in temps {
            let path = temp.to_path_buf();
            let outcome = tokio::task::spawn_blocking(move || temp.close())
                .await
                .map_err(|e| Error::external("temp file cleanup task failed", e))
                .and_then(|r| r.map_err(Error::from));
            if let Err(e) = outcome {
                warn!(path = %path.display(), error = %e, "failed to remove attachment temp file");
                #[cfg(feature = "metrics")]
                counter!(media_metrics::CLEANUP_ERRORS_TOTAL).increment(1);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Outcome of a scoped cache run: the closure's value and the cache release
/// result, reported side by side.
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    pub cleanup: Result<()>,
}

/// Create a cache, run `f` with it, then always await [`MediaAttachmentCache::cleanup`].
pub async fn with_media_attachment_cache<T, F, Fut>(
    attachments: Vec<MediaAttachment>,
    options: CacheOptions,
    f: F,
) -> Scoped<T>
where
    F: FnOnce(Arc<MediaAttachmentCache>) -> Fut,
    Fut: Future<Output = T>,
{
    let cache = Arc::new(MediaAttachmentCache::new(attachments, options));
    let value = f(Arc::clone(&cache)).await;
    let cleanup = cache.cleanup().await;
    Scoped { value, cleanup }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn local(index: usize, path: PathBuf, mime: Option<&str>) -> MediaAttachment {
        MediaAttachment {
            index,
            source: AttachmentSource::Path(path),
            mime: mime.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn reads_local_file_and_sniffs_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        std::fs::write(&path, PNG_HEADER).unwrap();

        let cache = MediaAttachmentCache::new(vec![local(0, path.clone(), None)], CacheOptions::default());
        let buffer = cache.get_buffer(0, 1024).await.unwrap();
        assert_eq!(buffer.size, PNG_HEADER.len() as u64);
        assert_eq!(buffer.mime.as_deref(), Some("image/png"));
        assert_eq!(buffer.file_name.as_deref(), Some("upload.bin"));

        assert_eq!(cache.get_path(0).await.unwrap(), path);
    }

    #[tokio::test]
    async fn missing_local_path_names_the_attachment() {
        let cache = MediaAttachmentCache::new(
            vec![local(0, PathBuf::from("/nonexistent/clawline/a.jpg"), None)],
            CacheOptions::default(),
        );
        let err = cache.get_path(0).await.unwrap_err().to_string();
        assert!(err.starts_with("attachment 0 at /nonexistent/clawline/a.jpg: "), "{err}");
    }

    #[tokio::test]
    async fn declared_mime_wins_over_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, PNG_HEADER).unwrap();
        let cache = MediaAttachmentCache::new(vec![local(0, path, Some("image/x-custom"))], CacheOptions::default());
        let buffer = cache.get_buffer(0, 1024).await.unwrap();
        assert_eq!(buffer.mime.as_deref(), Some("image/x-custom"));
    }

    #[tokio::test]
    async fn rejects_oversize_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, PNG_HEADER).unwrap();
        let cache = MediaAttachmentCache::new(vec![local(0, path, None)], CacheOptions::default());

        assert!(matches!(cache.get_buffer(0, 4).await, Err(Error::TooLarge { max: 4, .. })));
        // A cached buffer still honours a smaller ceiling.
        cache.get_buffer(0, 1024).await.unwrap();
        assert!(matches!(cache.get_buffer(0, 4).await, Err(Error::TooLarge { .. })));
        assert!(matches!(
            cache.get_buffer(3, 1024).await,
            Err(Error::AttachmentNotFound { index: 3 })
        ));
    }

    #[tokio::test]
    async fn cleanup_removes_temp_files_and_is_idempotent() {
        let cache = MediaAttachmentCache::new(Vec::new(), CacheOptions::default());
        let buffer = AttachmentBuffer {
            index: 0,
            data: Bytes::from_static(PNG_HEADER),
            mime: Some("image/png".into()),
            file_name: None,
            size: PNG_HEADER.len() as u64,
        };
        let path = cache.store_temp_file(&buffer).await.unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

        cache.cleanup().await.unwrap();
        assert!(!path.exists());
        cache.cleanup().await.unwrap();
    }

    fn spooled(data: &'static [u8]) -> AttachmentBuffer {
        AttachmentBuffer {
            index: 0,
            data: Bytes::from_static(data),
            mime: None,
            file_name: None,
            size: data.len() as u64,
        }
    }

    #[tokio::test]
    async fn cleanup_reports_missing_temp_file_once() {
        let cache = MediaAttachmentCache::new(Vec::new(), CacheOptions::default());
        let path = cache.store_temp_file(&spooled(b"hello")).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = cache.cleanup().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{err}");
        cache.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn scoped_cleanup_failure_keeps_value() {
        let scoped = with_media_attachment_cache(Vec::new(), CacheOptions::default(), |cache| async move {
            let path = cache.store_temp_file(&spooled(b"hello")).await.unwrap();
            std::fs::remove_file(&path).unwrap();
            "decided"
        })
        .await;
        assert_eq!(scoped.value, "decided");
        assert!(matches!(scoped.cleanup, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn scoped_cache_always_cleans_up() {
        let scoped = with_media_attachment_cache(Vec::new(), CacheOptions::default(), |cache| async move {
            let buffer = AttachmentBuffer {
                index: 0,
                data: Bytes::from_static(b"hello"),
                mime: None,
                file_name: None,
                size: 5,
            };
            cache.store_temp_file(&buffer).await.unwrap()
        })
        .await;
        assert!(scoped.cleanup.is_ok());
        assert!(!scoped.value.exists());
    }
}
