//! Run one media capability against a message.

use std::time::Duration;

use {
    clawline_common::types::MsgContext,
    clawline_config::{
        AttachmentMode, AttachmentPolicyConfig, AttachmentPrefer, ClawlineConfig,
        MediaCapabilityConfig, MediaModelEntry,
    },
    clawline_media::{MediaAttachment, MediaAttachmentCache},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use clawline_metrics::{counter, histogram, labels, media_understanding as mu_metrics};

use crate::{
    capability::MediaCapability,
    decision::{
        AttachmentDecision, AttemptOutcome, Decision, MediaUnderstandingOutput, ModelAttempt,
        Outcome, REASON_DISABLED, REASON_NO_ATTACHMENT, REASON_NO_PROVIDER, RunCapabilityResult,
    },
    provider::{MediaRequest, ProviderRegistry},
    strip::strip_media_from_prompt,
};

pub struct RunCapabilityParams<'a> {
    pub capability: MediaCapability,
    pub cfg: &'a ClawlineConfig,
    /// Mutated in place when the capability strips attachments from the prompt.
    pub ctx: &'a mut MsgContext,
    pub attachments: &'a MediaAttachmentCache,
    pub media: &'a [MediaAttachment],
    pub provider_registry: &'a ProviderRegistry,
}

/// Decide and run one capability.
///
/// A capability with `enabled: false` is never run; if it also sets
/// `stripFromPrompt: true`, `MediaPath`, `MediaPaths` and `MediaUrls` are
/// cleared from `ctx` and its `<media:…>` placeholders in `Body` are
/// replaced with a "not processed" notice. Otherwise matching attachments
/// are offered to each configured provider in turn until one succeeds.
pub async fn run_capability(params: RunCapabilityParams<'_>) -> RunCapabilityResult {
    #[cfg(feature = "metrics")]
    let started = std::time::Instant::now();

    let capability = params.capability;
    let result = run_inner(params).await;

    info!(
        capability = %capability,
        outcome = result.decision.outcome.as_str(),
        reason = result.decision.reason.as_deref().unwrap_or(""),
        outputs = result.outputs.len(),
        "media capability decided"
    );

    #[cfg(feature = "metrics")]
    {
        counter!(
            mu_metrics::RUNS_TOTAL,
            labels::CAPABILITY => capability.id(),
            labels::OUTCOME => result.decision.outcome.as_str()
        )
        .increment(1);
        histogram!(mu_metrics::RUN_DURATION_SECONDS, labels::CAPABILITY => capability.id())
            .record(started.elapsed().as_secs_f64());
    }

    result
}

async fn run_inner(params: RunCapabilityParams<'_>) -> RunCapabilityResult {
    let RunCapabilityParams {
        capability,
        cfg,
        ctx,
        attachments,
        media,
        provider_registry,
    } = params;
    let cap_cfg = capability.config(cfg);

    if cap_cfg.enabled == Some(false) {
        if cap_cfg.strip_from_prompt == Some(true) {
            strip_media_from_prompt(ctx, capability);
            debug!(capability = %capability, "stripped attachment references from prompt");
            #[cfg(feature = "metrics")]
            counter!(mu_metrics::STRIPPED_TOTAL, labels::CAPABILITY => capability.id()).increment(1);
        }
        return RunCapabilityResult {
            decision: Decision::terminal(capability, Outcome::Disabled, REASON_DISABLED),
            outputs: Vec::new(),
        };
    }

    let selected = select_attachments(media, capability, &cap_cfg.attachments);
    if selected.is_empty() {
        return skipped(capability, REASON_NO_ATTACHMENT);
    }

    let entries = resolve_entries(capability, cap_cfg, provider_registry);
    if entries.is_empty() {
        return skipped(capability, REASON_NO_PROVIDER);
    }

    let mut decisions = Vec::with_capacity(selected.len());
    let mut outputs = Vec::new();
    for attachment in selected {
        let mut attempts = Vec::new();
        for entry in &entries {
            let (attempt, output) =
                try_entry(capability, cap_cfg, entry, attachment, attachments, provider_registry).await;
            attempts.push(attempt);
            if let Some(output) = output {
                outputs.push(output);
                break;
            }
        }
        decisions.push(AttachmentDecision {
            attachment_index: attachment.index,
            attempts,
        });
    }

    let outcome = if !outputs.is_empty() {
        Outcome::Processed
    } else if decisions
        .iter()
        .flat_map(|d| &d.attempts)
        .any(|a| a.outcome == AttemptOutcome::Failed)
    {
        Outcome::Error
    } else {
        Outcome::Skipped
    };

    RunCapabilityResult {
        decision: Decision {
            capability,
            outcome,
            attachments: decisions,
            reason: None,
        },
        outputs,
    }
}

fn skipped(capability: MediaCapability, reason: &str) -> RunCapabilityResult {
    RunCapabilityResult {
        decision: Decision::terminal(capability, Outcome::Skipped, reason),
        outputs: Vec::new(),
    }
}

/// Attachments of the capability's kind, ordered and limited by `policy`.
fn select_attachments<'a>(
    media: &'a [MediaAttachment],
    capability: MediaCapability,
    policy: &AttachmentPolicyConfig,
) -> Vec<&'a MediaAttachment> {
    let mut matching: Vec<&MediaAttachment> = media
        .iter()
        .filter(|a| a.kind() == Some(capability.kind()))
        .collect();

    match policy.prefer.unwrap_or_default() {
        AttachmentPrefer::First => {},
        AttachmentPrefer::Last => matching.reverse(),
        AttachmentPrefer::Path => matching.sort_by_key(|a| a.source.is_url()),
        AttachmentPrefer::Url => matching.sort_by_key(|a| !a.source.is_url()),
    }

    let limit = match policy.mode.unwrap_or_default() {
        AttachmentMode::First => 1,
        AttachmentMode::All => policy.max_attachments.unwrap_or(matching.len()),
    };
    matching.truncate(limit);
    matching
}

/// Configured entries, or one entry per registered provider that supports
/// the capability.
fn resolve_entries(
    capability: MediaCapability,
    cap_cfg: &MediaCapabilityConfig,
    registry: &ProviderRegistry,
) -> Vec<MediaModelEntry> {
    if !cap_cfg.models.is_empty() {
        return cap_cfg.models.clone();
    }
    registry
        .supporting(capability)
        .iter()
        .map(|p| MediaModelEntry {
            provider: p.id().to_string(),
            ..Default::default()
        })
        .collect()
}

async fn try_entry(
    capability: MediaCapability,
    cap_cfg: &MediaCapabilityConfig,
    entry: &MediaModelEntry,
    attachment: &MediaAttachment,
    cache: &MediaAttachmentCache,
    registry: &ProviderRegistry,
) -> (ModelAttempt, Option<MediaUnderstandingOutput>) {
    let attempt = |outcome: AttemptOutcome, reason: Option<String>| ModelAttempt {
        provider: entry.provider.clone(),
        model: entry.model.clone(),
        outcome,
        reason,
    };

    let Some(provider) = registry.get(&entry.provider) else {
        debug!(capability = %capability, provider = %entry.provider, "provider not registered");
        return (attempt(AttemptOutcome::Skipped, Some("provider not registered".into())), None);
    };
    if !provider.supports(capability) {
        return (
            attempt(AttemptOutcome::Skipped, Some(format!("provider does not support {capability}"))),
            None,
        );
    }

    let max_bytes = entry
        .max_bytes
        .or(cap_cfg.max_bytes)
        .unwrap_or_else(|| capability.default_max_bytes());
    let buffer = match cache.get_buffer(attachment.index, max_bytes).await {
        Ok(buffer) => buffer,
        Err(e @ clawline_media::Error::TooLarge { .. }) => {
            debug!(capability = %capability, index = attachment.index, error = %e, "attachment skipped");
            return (attempt(AttemptOutcome::Skipped, Some(e.to_string())), None);
        },
        Err(e) => {
            warn!(capability = %capability, index = attachment.index, error = %e, "failed to load attachment");
            return (attempt(AttemptOutcome::Failed, Some(e.to_string())), None);
        },
    };

    let max_chars = entry.max_chars.or(cap_cfg.max_chars);
    let request = MediaRequest {
        capability,
        attachment_index: attachment.index,
        data: buffer.data,
        mime: buffer.mime,
        file_name: buffer.file_name,
        model: entry.model.clone(),
        prompt: entry
            .prompt
            .clone()
            .or_else(|| cap_cfg.prompt.clone())
            .unwrap_or_else(|| capability.default_prompt().to_string()),
        language: cap_cfg.language.clone(),
        max_chars,
    };

    let seconds = entry
        .timeout_seconds
        .or(cap_cfg.timeout_seconds)
        .unwrap_or_else(|| capability.default_timeout_seconds());
    let failure = match tokio::time::timeout(Duration::from_secs(seconds), provider.understand(request)).await {
        Ok(Ok(response)) => {
            let text = response.text.trim();
            if text.is_empty() {
                return (attempt(AttemptOutcome::Skipped, Some("empty response".into())), None);
            }
            let text = match max_chars {
                Some(max) => truncate_chars(text, max),
                None => text.to_string(),
            };
            let output = MediaUnderstandingOutput {
                kind: capability,
                attachment_index: attachment.index,
                text,
                provider: entry.provider.clone(),
                model: response.model.or_else(|| entry.model.clone()),
            };
            return (attempt(AttemptOutcome::Success, None), Some(output));
        },
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {seconds}s"),
    };

    warn!(
        capability = %capability,
        provider = %entry.provider,
        index = attachment.index,
        error = %failure,
        "media provider attempt failed"
    );
    #[cfg(feature = "metrics")]
    counter!(
        mu_metrics::PROVIDER_ERRORS_TOTAL,
        labels::CAPABILITY => capability.id(),
        labels::PROVIDER => entry.provider.clone()
    )
    .increment(1);
    (attempt(AttemptOutcome::Failed, Some(failure)), None)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}
