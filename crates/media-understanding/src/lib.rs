//! Media understanding: turn message attachments into text before the
//! message reaches the agent.
//!
//! Each [`MediaCapability`] is decided independently by [`run_capability`];
//! [`apply_media_understanding`] runs all of them over one message with a
//! shared, scoped attachment cache.

pub mod apply;
pub mod capability;
pub mod decision;
pub mod error;
pub mod provider;
pub mod runner;
pub mod strip;

pub use {
    apply::{ApplyMediaUnderstandingResult, ApplyOptions, apply_media_understanding, format_body},
    capability::MediaCapability,
    clawline_media::{create_media_attachment_cache, normalize_media_attachments},
    decision::{
        AttachmentDecision, AttemptOutcome, Decision, MediaUnderstandingOutput, ModelAttempt,
        Outcome, RunCapabilityResult,
    },
    error::{Error, Result},
    provider::{
        MediaRequest, MediaResponse, MediaUnderstandingProvider, ProviderRegistry,
        build_provider_registry, build_provider_registry_with,
    },
    runner::{RunCapabilityParams, run_capability},
    strip::strip_media_from_prompt,
};
