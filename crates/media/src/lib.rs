//! Media attachments: normalization, MIME detection, SSRF-guarded download
//! and the per-message attachment cache.

pub mod attachments;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod mime;

pub use {
    attachments::{AttachmentSource, MediaAttachment, normalize_media_attachments},
    cache::{AttachmentBuffer, CacheOptions, MediaAttachmentCache, Scoped, with_media_attachment_cache},
    error::{Error, Result},
    fetch::FetchPolicy,
    mime::MediaKind,
};

/// Create the attachment cache for one inbound message.
#[must_use]
pub fn create_media_attachment_cache(attachments: Vec<MediaAttachment>, options: CacheOptions) -> MediaAttachmentCache {
    MediaAttachmentCache::new(attachments, options)
}
