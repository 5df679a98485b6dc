//! Full media understanding pass over one message.

use {
    clawline_common::types::MsgContext,
    clawline_config::ClawlineConfig,
    clawline_media::{CacheOptions, FetchPolicy, normalize_media_attachments, with_media_attachment_cache},
    tracing::warn,
};

use crate::{
    capability::MediaCapability,
    decision::{Decision, MediaUnderstandingOutput, Outcome},
    provider::ProviderRegistry,
    runner::{RunCapabilityParams, run_capability},
};

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub cache: CacheOptions,
}

impl ApplyOptions {
    /// Attachment download policy of the default telegram account.
    #[must_use]
    pub fn from_config(cfg: &ClawlineConfig) -> Self {
        Self::for_account(cfg, None)
    }

    /// Attachment download policy for a telegram account.
    ///
    /// Fields set on `channels.telegram.accounts.<id>` win over the
    /// top-level account; an unknown id falls back to the top level.
    #[must_use]
    pub fn for_account(cfg: &ClawlineConfig, account_id: Option<&str>) -> Self {
        let telegram = &cfg.channels.telegram;
        let base = &telegram.account;
        let account = account_id.and_then(|id| telegram.accounts.get(id));

        let base_ssrf = &base.network.ssrf;
        let ssrf = account.map(|a| &a.network.ssrf);
        let allowed_hostnames = ssrf
            .map(|s| &s.allowed_hostnames)
            .filter(|hosts| !hosts.is_empty())
            .unwrap_or(&base_ssrf.allowed_hostnames)
            .clone();
        let allow_private_network = ssrf
            .and_then(|s| s.allow_private_network)
            .or(base_ssrf.allow_private_network)
            .unwrap_or(false);

        let mut cache = CacheOptions {
            fetch_policy: FetchPolicy {
                allow_private_network,
                allowed_hostnames,
                ..FetchPolicy::default()
            },
            ..CacheOptions::default()
        };
        let media_max_mb = account.and_then(|a| a.media_max_mb).or(base.media_max_mb);
        if let Some(mb) = media_max_mb.filter(|mb| *mb > 0.0) {
            cache.max_bytes = (mb * 1024.0 * 1024.0) as u64;
        }
        Self { cache }
    }
}

#[derive(Debug)]
pub struct ApplyMediaUnderstandingResult {
    /// One decision per capability, in processing order.
    pub decisions: Vec<Decision>,
    pub outputs: Vec<MediaUnderstandingOutput>,
    /// Set when releasing the attachment cache failed.
    pub cleanup_error: Option<clawline_media::Error>,
}

impl ApplyMediaUnderstandingResult {
    #[must_use]
    pub fn applied(&self, capability: MediaCapability) -> bool {
        self.decisions
            .iter()
            .any(|d| d.capability == capability && d.outcome == Outcome::Processed)
    }
}

/// Run image, audio and video understanding over `ctx` and fold the results
/// back into it.
///
/// Audio transcripts land in `Transcript`. When anything was produced,
/// `Body` is rewritten into `[Image]`/`[Audio]`/`[Video]` sections followed
/// by the user's own text.
pub async fn apply_media_understanding(
    ctx: &mut MsgContext,
    cfg: &ClawlineConfig,
    registry: &ProviderRegistry,
    options: ApplyOptions,
) -> ApplyMediaUnderstandingResult {
    let media = normalize_media_attachments(ctx);
    let run_ctx = &mut *ctx;
    let scoped = with_media_attachment_cache(media.clone(), options.cache, |cache| async move {
        let mut results = Vec::with_capacity(MediaCapability::ALL.len());
        for capability in MediaCapability::ALL {
            let result = run_capability(RunCapabilityParams {
                capability,
                cfg,
                ctx: &mut *run_ctx,
                attachments: &cache,
                media: &media,
                provider_registry: registry,
            })
            .await;
            results.push(result);
        }
        results
    })
    .await;

    let cleanup_error = scoped.cleanup.err();
    if let Some(e) = &cleanup_error {
        warn!(error = %e, "media attachment cleanup failed");
    }

    let mut decisions = Vec::with_capacity(scoped.value.len());
    let mut outputs = Vec::new();
    for result in scoped.value {
        decisions.push(result.decision);
        outputs.extend(result.outputs);
    }

    if !outputs.is_empty() {
        fold_outputs(ctx, &outputs);
    }

    ApplyMediaUnderstandingResult {
        decisions,
        outputs,
        cleanup_error,
    }
}

fn fold_outputs(ctx: &mut MsgContext, outputs: &[MediaUnderstandingOutput]) {
    let transcripts: Vec<&str> = outputs
        .iter()
        .filter(|o| o.kind == MediaCapability::Audio)
        .map(|o| o.text.as_str())
        .collect();
    if !transcripts.is_empty() {
        ctx.transcript = Some(transcripts.join("\n\n"));
    }

    let mut user_text = ctx.body.clone().unwrap_or_default();
    for capability in MediaCapability::ALL {
        if outputs.iter().any(|o| o.kind == capability) {
            user_text = user_text.replace(&capability.placeholder(), "");
        }
    }
    ctx.body = Some(format_body(outputs, user_text.trim()));
}

/// Sectioned body: one block per output, then the user's text.
#[must_use]
pub fn format_body(outputs: &[MediaUnderstandingOutput], user_text: &str) -> String {
    let mut sections = Vec::with_capacity(outputs.len() + 1);
    for capability in MediaCapability::ALL {
        let of_kind: Vec<&MediaUnderstandingOutput> =
            outputs.iter().filter(|o| o.kind == capability).collect();
        let total = of_kind.len();
        for (i, output) in of_kind.into_iter().enumerate() {
            let header = if total > 1 {
                format!("[{} {}/{}]", capability.title(), i + 1, total)
            } else {
                format!("[{}]", capability.title())
            };
            let label = match capability {
                MediaCapability::Audio => "Transcript",
                MediaCapability::Image | MediaCapability::Video => "Description",
            };
            sections.push(format!("{header}\n{label}:\n{}", output.text));
        }
    }
    if !user_text.is_empty() {
        sections.push(format!("User text:\n{user_text}"));
    }
    sections.join("\n\n")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn output(kind: MediaCapability, index: usize, text: &str) -> MediaUnderstandingOutput {
        MediaUnderstandingOutput {
            kind,
            attachment_index: index,
            text: text.to_string(),
            provider: "test".to_string(),
            model: None,
        }
    }

    #[test]
    fn formats_sections_in_capability_order() {
        let outputs = vec![
            output(MediaCapability::Audio, 1, "hello there"),
            output(MediaCapability::Image, 0, "a cat"),
        ];
        assert_eq!(
            format_body(&outputs, "what is this?"),
            "[Image]\nDescription:\na cat\n\n[Audio]\nTranscript:\nhello there\n\nUser text:\nwhat is this?"
        );
    }

    #[test]
    fn numbers_repeated_kinds() {
        let outputs = vec![
            output(MediaCapability::Image, 0, "first"),
            output(MediaCapability::Image, 1, "second"),
        ];
        assert_eq!(
            format_body(&outputs, ""),
            "[Image 1/2]\nDescription:\nfirst\n\n[Image 2/2]\nDescription:\nsecond"
        );
    }

    #[test]
    fn fold_sets_transcript_and_removes_consumed_placeholders() {
        let mut ctx = MsgContext {
            body: Some("<media:audio> <media:image>".into()),
            ..Default::default()
        };
        fold_outputs(&mut ctx, &[output(MediaCapability::Audio, 0, "hi")]);
        assert_eq!(ctx.transcript.as_deref(), Some("hi"));
        assert_eq!(
            ctx.body.as_deref(),
            Some("[Audio]\nTranscript:\nhi\n\nUser text:\n<media:image>")
        );
    }

    #[test]
    fn account_overrides_win_over_top_level() {
        let cfg: ClawlineConfig = serde_json::from_value(serde_json::json!({
            "channels": { "telegram": {
                "mediaMaxMb": 5,
                "network": { "ssrf": { "allowedHostnames": ["cdn.example.com"] } },
                "accounts": {
                    "work": {
                        "mediaMaxMb": 2,
                        "network": { "ssrf": { "allowPrivateNetwork": true } }
                    }
                }
            } }
        }))
        .unwrap();

        let work = ApplyOptions::for_account(&cfg, Some("work"));
        assert!(work.cache.fetch_policy.allow_private_network);
        assert_eq!(work.cache.fetch_policy.allowed_hostnames, vec!["cdn.example.com"]);
        assert_eq!(work.cache.max_bytes, 2 * 1024 * 1024);

        let unknown = ApplyOptions::for_account(&cfg, Some("missing"));
        assert!(!unknown.cache.fetch_policy.allow_private_network);
        assert_eq!(unknown.cache.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn options_follow_telegram_ssrf_policy() {
        let mut cfg = ClawlineConfig::default();
        cfg.channels.telegram.account.network.ssrf.allow_private_network = Some(true);
        cfg.channels.telegram.account.network.ssrf.allowed_hostnames = vec!["minio.internal".into()];
        cfg.channels.telegram.account.media_max_mb = Some(1.0);
        let options = ApplyOptions::from_config(&cfg);
        assert!(options.cache.fetch_policy.allow_private_network);
        assert_eq!(options.cache.fetch_policy.allowed_hostnames, vec!["minio.internal"]);
        assert_eq!(options.cache.max_bytes, 1024 * 1024);
    }
}
