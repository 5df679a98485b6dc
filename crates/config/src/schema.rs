/// Config schema types (agents, channels, tools, logging).
///
/// Every struct is `#[serde(default)]` so any subtree may be omitted. Keys are
/// camelCase to match the persisted `clawline.json` layout.
use std::collections::HashMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClawlineConfig {
    pub agents: AgentsConfig,
    pub channels: ChannelsConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

// ── agents ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

/// `agents.defaults`: global agent defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentDefaults {
    pub model: AgentModelConfig,
    pub workspace: Option<String>,
    pub user_timezone: Option<String>,
    pub memory_search: MemorySearchConfig,
}

/// Model selection: `{primary, fallbacks}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentModelConfig {
    pub primary: Option<String>,
    pub fallbacks: Vec<String>,
}

/// Embedding backend used for memory search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySearchProvider {
    Openai,
    Gemini,
    Local,
    Voyage,
}

/// Backend tried when the primary memory-search provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySearchFallback {
    Openai,
    Gemini,
    Local,
    Voyage,
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemorySearchConfig {
    pub enabled: Option<bool>,
    pub provider: Option<MemorySearchProvider>,
    pub fallback: Option<MemorySearchFallback>,
    pub model: Option<String>,
    pub remote: RemoteEndpointConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteEndpointConfig {
    pub base_url: Option<String>,
    #[serde(serialize_with = "serialize_option_secret")]
    pub api_key: Option<Secret<String>>,
}

impl std::fmt::Debug for RemoteEndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpointConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── channels ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelsConfig {
    pub telegram: TelegramConfig,
}

/// DM access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    /// Unknown senders get a pairing code that the owner approves.
    Pairing,
    /// Only peers on `allowFrom`.
    Allowlist,
    /// Anyone can DM the bot.
    Open,
    Disabled,
}

/// Group access policy. Applies per account, per group and per topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    Open,
    Allowlist,
    Disabled,
}

/// How streaming replies are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    Off,
    Partial,
    Block,
}

/// Which replies quote the triggering message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyToMode {
    Off,
    First,
    All,
}

/// Peer or chat identifier; Telegram IDs may be written as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Telegram channel config: a default account plus optional named accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramConfig {
    #[serde(flatten)]
    pub account: TelegramAccountConfig,
    /// Named accounts: `channels.telegram.accounts.<id>`.
    pub accounts: HashMap<String, TelegramAccountConfig>,
}

/// Settings for one Telegram bot account.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramAccountConfig {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    #[serde(serialize_with = "serialize_option_secret")]
    pub bot_token: Option<Secret<String>>,
    pub token_file: Option<String>,
    pub dm_policy: Option<DmPolicy>,
    pub group_policy: Option<GroupPolicy>,
    pub allow_from: Vec<PeerId>,
    pub group_allow_from: Vec<PeerId>,
    pub stream_mode: Option<StreamMode>,
    pub reply_to_mode: Option<ReplyToMode>,
    pub text_chunk_limit: Option<u32>,
    pub media_max_mb: Option<f64>,
    pub history_limit: Option<u32>,
    pub proxy: Option<String>,
    pub webhook_url: Option<String>,
    #[serde(serialize_with = "serialize_option_secret")]
    pub webhook_secret: Option<Secret<String>>,
    pub network: TelegramNetworkConfig,
    /// Per-group overrides keyed by chat ID (e.g. `"-1001234567890"`).
    pub groups: HashMap<String, TelegramGroupConfig>,
}

impl std::fmt::Debug for TelegramAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccountConfig")
            .field("name", &self.name)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("dm_policy", &self.dm_policy)
            .field("group_policy", &self.group_policy)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramNetworkConfig {
    pub auto_select_family: Option<bool>,
    pub ssrf: SsrfPolicyConfig,
}

/// Outbound fetch policy for media URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SsrfPolicyConfig {
    /// Hostnames exempt from the private-address check.
    pub allowed_hostnames: Vec<String>,
    /// Allow fetching from private, loopback and link-local addresses.
    pub allow_private_network: Option<bool>,
}

/// Per-group override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramGroupConfig {
    pub enabled: Option<bool>,
    pub require_mention: Option<bool>,
    pub group_policy: Option<GroupPolicy>,
    pub allow_from: Vec<PeerId>,
    pub skills: Vec<String>,
    pub system_prompt: Option<String>,
    /// Forum topic overrides keyed by thread ID.
    pub topics: HashMap<String, TelegramTopicConfig>,
}

/// Per-topic override inside a forum group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramTopicConfig {
    pub enabled: Option<bool>,
    pub require_mention: Option<bool>,
    pub group_policy: Option<GroupPolicy>,
    pub allow_from: Vec<PeerId>,
    pub skills: Vec<String>,
    pub system_prompt: Option<String>,
}

impl TelegramConfig {
    /// Resolve the effective group policy for a chat / topic.
    ///
    /// The most specific override wins: topic, then group, then account.
    #[must_use]
    pub fn effective_group_policy(&self, chat_id: &str, topic_id: Option<&str>) -> GroupPolicy {
        let group = self.account.groups.get(chat_id);
        let topic = group.zip(topic_id).and_then(|(g, t)| g.topics.get(t));
        topic
            .and_then(|t| t.group_policy)
            .or_else(|| group.and_then(|g| g.group_policy))
            .or(self.account.group_policy)
            .unwrap_or(GroupPolicy::Open)
    }
}

// ── tools ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolsConfig {
    pub media: MediaToolsConfig,
}

/// `tools.media`: media understanding settings per capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaToolsConfig {
    /// Max capabilities processed concurrently per message.
    pub concurrency: Option<u32>,
    pub image: MediaCapabilityConfig,
    pub audio: MediaCapabilityConfig,
    pub video: MediaCapabilityConfig,
}

/// Settings for one media capability (`tools.media.image`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaCapabilityConfig {
    /// `Some(false)` disables the capability; `None` means auto.
    pub enabled: Option<bool>,
    /// Remove raw attachment references from the prompt when the capability
    /// does not consume them.
    pub strip_from_prompt: Option<bool>,
    pub prompt: Option<String>,
    pub max_bytes: Option<u64>,
    pub max_chars: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub language: Option<String>,
    /// Ordered provider/model entries; the first successful one wins.
    pub models: Vec<MediaModelEntry>,
    pub attachments: AttachmentPolicyConfig,
}

/// A provider/model pair tried for a capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaModelEntry {
    pub provider: String,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub max_chars: Option<usize>,
    pub max_bytes: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// Whether one or all matching attachments are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentMode {
    #[default]
    First,
    All,
}

/// Which matching attachment is preferred when only some are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentPrefer {
    #[default]
    First,
    Last,
    Path,
    Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttachmentPolicyConfig {
    pub mode: Option<AttachmentMode>,
    pub max_attachments: Option<usize>,
    pub prefer: Option<AttachmentPrefer>,
}

// ── logging ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: Option<LogLevel>,
    /// Emit JSON log lines instead of human-readable output.
    pub json: Option<bool>,
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
