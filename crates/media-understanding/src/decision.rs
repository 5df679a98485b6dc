//! What a capability run decided, and what it produced.

use serde::Serialize;

use crate::capability::MediaCapability;

/// Reason recorded when the capability is switched off in config.
pub const REASON_DISABLED: &str = "disabled";
/// Reason recorded when no attachment matches the capability.
pub const REASON_NO_ATTACHMENT: &str = "no-attachment";
/// Reason recorded when no provider could be resolved.
pub const REASON_NO_PROVIDER: &str = "no-provider";

/// Terminal state of one capability run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Processed,
    Disabled,
    Skipped,
    Error,
}

impl Outcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Disabled => "disabled",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Skipped,
    Failed,
}

/// One provider/model tried against one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAttempt {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDecision {
    pub attachment_index: usize,
    pub attempts: Vec<ModelAttempt>,
}

impl AttachmentDecision {
    /// The attempt that produced output, if any.
    #[must_use]
    pub fn chosen(&self) -> Option<&ModelAttempt> {
        self.attempts
            .iter()
            .find(|a| a.outcome == AttemptOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub capability: MediaCapability,
    pub outcome: Outcome,
    pub attachments: Vec<AttachmentDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub(crate) fn terminal(capability: MediaCapability, outcome: Outcome, reason: &str) -> Self {
        Self {
            capability,
            outcome,
            attachments: Vec::new(),
            reason: Some(reason.to_string()),
        }
    }
}

/// Text extracted from one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUnderstandingOutput {
    pub kind: MediaCapability,
    pub attachment_index: usize,
    pub text: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunCapabilityResult {
    pub decision: Decision,
    /// Empty unless the decision is [`Outcome::Processed`].
    pub outputs: Vec<MediaUnderstandingOutput>,
}
