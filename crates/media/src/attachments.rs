//! Flatten the raw attachment fields of a [`MsgContext`] into an ordered list.

use std::path::PathBuf;

use clawline_common::types::MsgContext;

use crate::mime::{MediaKind, mime_from_extension};

/// Where an attachment's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    Path(PathBuf),
    Url(String),
}

impl AttachmentSource {
    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

/// One normalized media attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    /// Position in the normalized list; stable for the lifetime of a cache.
    pub index: usize,
    pub source: AttachmentSource,
    /// MIME type declared by the channel adapter, if any.
    pub mime: Option<String>,
}

impl MediaAttachment {
    /// Path or URL, for logs and diagnostics.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.source {
            AttachmentSource::Path(p) => p.display().to_string(),
            AttachmentSource::Url(u) => u.clone(),
        }
    }

    /// Best-effort kind: declared MIME first, then file extension.
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        if let Some(mime) = self.mime.as_deref().filter(|m| !m.trim().is_empty()) {
            return Some(MediaKind::from_mime(mime));
        }
        mime_from_extension(&self.location()).map(MediaKind::from_mime)
    }
}

/// Build the attachment list from `MediaPath`, then `MediaPaths`, then
/// `MediaUrls`. Entries are kept in order and never deduplicated; blank
/// entries are skipped.
///
/// `MediaType` describes a single attachment, so it is only carried as the
/// declared MIME when the message has exactly one. Otherwise each
/// attachment's type comes from its bytes or extension.
#[must_use]
pub fn normalize_media_attachments(ctx: &MsgContext) -> Vec<MediaAttachment> {
    let paths = ctx
        .media_path
        .iter()
        .chain(ctx.media_paths.iter().flatten())
        .filter(|p| !p.trim().is_empty())
        .map(|p| AttachmentSource::Path(PathBuf::from(p)));
    let urls = ctx
        .media_urls
        .iter()
        .flatten()
        .filter(|u| !u.trim().is_empty())
        .map(|u| AttachmentSource::Url(u.clone()));

    let mut attachments: Vec<MediaAttachment> = paths
        .chain(urls)
        .enumerate()
        .map(|(index, source)| MediaAttachment {
            index,
            source,
            mime: None,
        })
        .collect();
    if let [only] = attachments.as_mut_slice() {
        only.mime = ctx.media_type.clone();
    }
    attachments
}
