//! Message types shared between channel adapters and the preprocessing pipeline.

use serde::{Deserialize, Serialize};

/// Kind of conversation a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Direct,
    Group,
    Channel,
}

/// One inbound message as produced by a channel adapter.
///
/// Every field is optional: adapters fill in what they know, and the media
/// pipeline mutates the record in place (fields are cleared, `body` is
/// rewritten). Cleared fields serialize as absent keys, not as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsgContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    /// MIME-like type declared by the adapter (e.g. `image/jpeg`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Audio transcript filled in by media understanding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<ChatType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

impl MsgContext {
    /// Returns `true` if any of the raw attachment fields is present.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.media_path.is_some() || self.media_paths.is_some() || self.media_urls.is_some()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_pascal_case_keys() {
        let json = r#"{
            "Body": "Hello <media:image>",
            "MediaPath": "/tmp/photo.jpg",
            "MediaPaths": ["/tmp/photo.jpg"],
            "MediaType": "image/jpeg",
            "ChatType": "group"
        }"#;
        let ctx: MsgContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.body.as_deref(), Some("Hello <media:image>"));
        assert_eq!(ctx.media_paths, Some(vec!["/tmp/photo.jpg".to_string()]));
        assert_eq!(ctx.chat_type, Some(ChatType::Group));
        assert!(ctx.media_urls.is_none());
        assert!(ctx.has_media());
    }

    #[test]
    fn cleared_fields_are_absent_when_serialized() {
        let ctx = MsgContext {
            body: Some("hi".into()),
            media_type: Some("image/png".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&ctx).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("Body"));
        assert!(!obj.contains_key("MediaPath"));
        assert!(!obj.contains_key("MediaPaths"));
        assert!(!obj.contains_key("MediaUrls"));
        assert!(!ctx.has_media());
    }
}
