use std::{fmt, str::FromStr};

use {
    clawline_config::{ClawlineConfig, MediaCapabilityConfig},
    clawline_media::MediaKind,
    serde::{Deserialize, Serialize},
};

use crate::error::Error;

/// A kind of media the pipeline can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCapability {
    Image,
    Audio,
    Video,
}

impl MediaCapability {
    /// Processing order used by the apply pipeline.
    pub const ALL: [Self; 3] = [Self::Image, Self::Audio, Self::Video];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Word used in the "received - not processed" notice.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Section header used when folding outputs into the body.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Audio => "Audio",
            Self::Video => "Video",
        }
    }

    #[must_use]
    pub fn kind(self) -> MediaKind {
        match self {
            Self::Image => MediaKind::Image,
            Self::Audio => MediaKind::Audio,
            Self::Video => MediaKind::Video,
        }
    }

    /// `<media:image>` etc.
    #[must_use]
    pub fn placeholder(self) -> String {
        format!("<media:{}>", self.id())
    }

    #[must_use]
    pub fn unprocessed_notice(self) -> String {
        format!("[{} received - not processed]", self.label())
    }

    #[must_use]
    pub fn config(self, cfg: &ClawlineConfig) -> &MediaCapabilityConfig {
        let media = &cfg.tools.media;
        match self {
            Self::Image => &media.image,
            Self::Audio => &media.audio,
            Self::Video => &media.video,
        }
    }

    #[must_use]
    pub fn default_max_bytes(self) -> u64 {
        match self {
            Self::Image => 10 * 1024 * 1024,
            Self::Audio => 20 * 1024 * 1024,
            Self::Video => 50 * 1024 * 1024,
        }
    }

    #[must_use]
    pub fn default_timeout_seconds(self) -> u64 {
        match self {
            Self::Image | Self::Audio => 60,
            Self::Video => 120,
        }
    }

    #[must_use]
    pub fn default_prompt(self) -> &'static str {
        match self {
            Self::Image => "Describe the image.",
            Self::Audio => "Transcribe the audio.",
            Self::Video => "Describe the video.",
        }
    }
}

impl fmt::Display for MediaCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for MediaCapability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(Error::UnknownCapability {
                name: other.to_string(),
            }),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_ids_only() {
        for capability in MediaCapability::ALL {
            assert_eq!(capability.id().parse::<MediaCapability>().unwrap(), capability);
        }
        assert!(matches!(
            "Image".parse::<MediaCapability>(),
            Err(Error::UnknownCapability { name }) if name == "Image"
        ));
    }

    #[test]
    fn placeholder_and_notice() {
        assert_eq!(MediaCapability::Image.placeholder(), "<media:image>");
        assert_eq!(
            MediaCapability::Audio.unprocessed_notice(),
            "[audio received - not processed]"
        );
    }

    #[test]
    fn config_lookup_follows_capability() {
        let mut cfg = ClawlineConfig::default();
        cfg.tools.media.video.enabled = Some(false);
        assert_eq!(MediaCapability::Video.config(&cfg).enabled, Some(false));
        assert_eq!(MediaCapability::Image.config(&cfg).enabled, None);
    }
}
