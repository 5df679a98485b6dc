//! Configuration validation engine.
//!
//! Validates a configuration tree against the known schema. Validation is
//! closed-world: every key must be known at its nesting level and every leaf
//! must have the declared type, otherwise the whole tree is rejected. Invalid
//! input is an ordinary result carried in [`ValidationResult`], never an `Err`.

use std::{collections::HashMap, path::Path};

use serde_json::Value;

#[cfg(feature = "metrics")]
use clawline_metrics::{config as config_metrics, counter};

use crate::{loader, schema::ClawlineConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "security",
    /// "policy", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "channels.telegram.network.ssrf.bogusKey"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` when the tree was accepted (warnings allowed).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.has_errors()
    }

    /// Error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree ─────────────────────────────────────────────────────────────

/// Declared type of a scalar value.
#[derive(Debug, Clone, Copy)]
enum LeafKind {
    Bool,
    Text,
    Integer,
    Number,
    /// Telegram peer/chat ID: string or integer.
    PeerId,
    /// String restricted to a fixed set of values.
    Enum(&'static [&'static str]),
}

impl LeafKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Text => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::PeerId => value.is_string() || value.is_i64(),
            Self::Enum(allowed) => value.as_str().is_some_and(|s| allowed.contains(&s)),
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Bool => "a boolean".into(),
            Self::Text => "a string".into(),
            Self::Integer => "an integer".into(),
            Self::Number => "a number".into(),
            Self::PeerId => "a string or integer ID".into(),
            Self::Enum(allowed) => format!("one of: {}", allowed.join(", ")),
        }
    }
}

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// An object with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// An object with dynamic keys (group IDs, account names) whose values
    /// have a known shape.
    Map(Box<KnownKeys>),
    /// An array of typed items.
    Array(Box<KnownKeys>),
    /// Scalar value with a declared type.
    Leaf(LeafKind),
}

const DM_POLICIES: &[&str] = &["pairing", "allowlist", "open", "disabled"];
const GROUP_POLICIES: &[&str] = &["open", "allowlist", "disabled"];
const STREAM_MODES: &[&str] = &["off", "partial", "block"];
const REPLY_TO_MODES: &[&str] = &["off", "first", "all"];
const MEMORY_SEARCH_PROVIDERS: &[&str] = &["openai", "gemini", "local", "voyage"];
const MEMORY_SEARCH_FALLBACKS: &[&str] = &["openai", "gemini", "local", "voyage", "none"];
const ATTACHMENT_MODES: &[&str] = &["first", "all"];
const ATTACHMENT_PREFER: &[&str] = &["first", "last", "path", "url"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Map, Struct};
    use LeafKind::{Bool, Enum, Integer, Number, PeerId, Text};

    let string_list = || Array(Box::new(Leaf(Text)));
    let peer_list = || Array(Box::new(Leaf(PeerId)));

    let topic_fields = || {
        HashMap::from([
            ("enabled", Leaf(Bool)),
            ("requireMention", Leaf(Bool)),
            ("groupPolicy", Leaf(Enum(GROUP_POLICIES))),
            ("allowFrom", peer_list()),
            ("skills", string_list()),
            ("systemPrompt", Leaf(Text)),
        ])
    };

    let group = || {
        let mut fields = topic_fields();
        fields.insert("topics", Map(Box::new(Struct(topic_fields()))));
        Struct(fields)
    };

    let network = || {
        Struct(HashMap::from([
            ("autoSelectFamily", Leaf(Bool)),
            (
                "ssrf",
                Struct(HashMap::from([
                    ("allowedHostnames", string_list()),
                    ("allowPrivateNetwork", Leaf(Bool)),
                ])),
            ),
        ]))
    };

    let telegram_account_fields = || {
        HashMap::from([
            ("enabled", Leaf(Bool)),
            ("name", Leaf(Text)),
            ("botToken", Leaf(Text)),
            ("tokenFile", Leaf(Text)),
            ("dmPolicy", Leaf(Enum(DM_POLICIES))),
            ("groupPolicy", Leaf(Enum(GROUP_POLICIES))),
            ("allowFrom", peer_list()),
            ("groupAllowFrom", peer_list()),
            ("streamMode", Leaf(Enum(STREAM_MODES))),
            ("replyToMode", Leaf(Enum(REPLY_TO_MODES))),
            ("textChunkLimit", Leaf(Integer)),
            ("mediaMaxMb", Leaf(Number)),
            ("historyLimit", Leaf(Integer)),
            ("proxy", Leaf(Text)),
            ("webhookUrl", Leaf(Text)),
            ("webhookSecret", Leaf(Text)),
            ("network", network()),
            ("groups", Map(Box::new(group()))),
        ])
    };

    let telegram = || {
        let mut fields = telegram_account_fields();
        fields.insert(
            "accounts",
            Map(Box::new(Struct(telegram_account_fields()))),
        );
        Struct(fields)
    };

    let model_entry = || {
        Struct(HashMap::from([
            ("provider", Leaf(Text)),
            ("model", Leaf(Text)),
            ("prompt", Leaf(Text)),
            ("maxChars", Leaf(Integer)),
            ("maxBytes", Leaf(Integer)),
            ("timeoutSeconds", Leaf(Integer)),
        ]))
    };

    let media_capability = || {
        Struct(HashMap::from([
            ("enabled", Leaf(Bool)),
            ("stripFromPrompt", Leaf(Bool)),
            ("prompt", Leaf(Text)),
            ("maxBytes", Leaf(Integer)),
            ("maxChars", Leaf(Integer)),
            ("timeoutSeconds", Leaf(Integer)),
            ("language", Leaf(Text)),
            ("models", Array(Box::new(model_entry()))),
            (
                "attachments",
                Struct(HashMap::from([
                    ("mode", Leaf(Enum(ATTACHMENT_MODES))),
                    ("maxAttachments", Leaf(Integer)),
                    ("prefer", Leaf(Enum(ATTACHMENT_PREFER))),
                ])),
            ),
        ]))
    };

    let agent_defaults = || {
        Struct(HashMap::from([
            (
                "model",
                Struct(HashMap::from([
                    ("primary", Leaf(Text)),
                    ("fallbacks", string_list()),
                ])),
            ),
            ("workspace", Leaf(Text)),
            ("userTimezone", Leaf(Text)),
            (
                "memorySearch",
                Struct(HashMap::from([
                    ("enabled", Leaf(Bool)),
                    ("provider", Leaf(Enum(MEMORY_SEARCH_PROVIDERS))),
                    ("fallback", Leaf(Enum(MEMORY_SEARCH_FALLBACKS))),
                    ("model", Leaf(Text)),
                    (
                        "remote",
                        Struct(HashMap::from([
                            ("baseUrl", Leaf(Text)),
                            ("apiKey", Leaf(Text)),
                        ])),
                    ),
                ])),
            ),
        ]))
    };

    Struct(HashMap::from([
        (
            "agents",
            Struct(HashMap::from([("defaults", agent_defaults())])),
        ),
        (
            "channels",
            Struct(HashMap::from([("telegram", telegram())])),
        ),
        (
            "tools",
            Struct(HashMap::from([(
                "media",
                Struct(HashMap::from([
                    ("concurrency", Leaf(Integer)),
                    ("image", media_capability()),
                    ("audio", media_capability()),
                    ("video", media_capability()),
                ])),
            )])),
        ),
        (
            "logging",
            Struct(HashMap::from([
                ("level", Leaf(Enum(LOG_LEVELS))),
                ("json", Leaf(Bool)),
            ])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Find the best match for `needle` among `candidates`. Returns `Some(best)`
/// if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match loader::load_config_value(actual_path) {
        Ok(value) => validate_config_object(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: e.to_string(),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path.clone());
    result
}

/// Validate a JSON/JSON5 string without file-system side effects.
#[must_use]
pub fn validate_json_str(raw: &str) -> ValidationResult {
    match json5::from_str::<Value>(raw) {
        Ok(value) => validate_config_object(&value),
        Err(e) => syntax_error(format!("JSON syntax error: {e}")),
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(raw: &str) -> ValidationResult {
    let parsed = toml::from_str::<toml::Value>(raw)
        .map_err(|e| e.to_string())
        .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string()));
    match parsed {
        Ok(value) => validate_config_object(&value),
        Err(e) => syntax_error(format!("TOML syntax error: {e}")),
    }
}

fn syntax_error(message: String) -> ValidationResult {
    ValidationResult {
        diagnostics: vec![Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message,
        }],
        config_path: None,
    }
}

/// Validate an already-parsed configuration tree.
///
/// Any subtree may be omitted; `{}` is valid. Unknown keys at any depth and
/// leaves of the wrong type reject the tree.
#[must_use]
pub fn validate_config_object(value: &Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Unknown fields and leaf types: walk the tree against KnownKeys
    let schema = build_schema_map();
    check_fields(value, &schema, "", &mut diagnostics);

    // 2. Type check: full deserialization, only once the shape is accepted
    let config = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        None
    } else {
        match serde_json::from_value::<ClawlineConfig>(value.clone()) {
            Ok(config) => Some(config),
            Err(e) => {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "type-error",
                    path: String::new(),
                    message: format!("type error: {e}"),
                });
                None
            },
        }
    };

    // 3. Semantic warnings on parsed config
    if let Some(ref config) = config {
        check_semantic_warnings(config, &mut diagnostics);
    }

    let result = ValidationResult {
        diagnostics,
        config_path: None,
    };

    #[cfg(feature = "metrics")]
    counter!(
        config_metrics::VALIDATIONS_TOTAL,
        "result" => if result.is_ok() { "ok" } else { "rejected" }
    )
    .increment(1);

    result
}

/// Validate and deserialize in one step.
///
/// Returns the typed config when the tree is accepted, otherwise the
/// rejecting [`ValidationResult`].
pub fn parse_config_object(value: &Value) -> Result<ClawlineConfig, ValidationResult> {
    let result = validate_config_object(value);
    if result.has_errors() {
        return Err(result);
    }
    serde_json::from_value(value.clone()).map_err(|e| ValidationResult {
        diagnostics: vec![Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }],
        config_path: None,
    })
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        category: "type-error",
        path: path.to_string(),
        message: format!("expected {expected}, got {}", type_name(value)),
    }
}

/// Walk the value tree against the schema tree, flagging unknown keys and
/// mistyped leaves.
fn check_fields(value: &Value, schema: &KnownKeys, prefix: &str, diagnostics: &mut Vec<Diagnostic>) {
    match (value, schema) {
        (Value::Object(object), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in object {
                let path = join_path(prefix, key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_fields(child_value, child_schema, &path, diagnostics);
                } else {
                    let level = if prefix.is_empty() {
                        "at top level "
                    } else {
                        ""
                    };
                    let msg = match suggest(key, &known_keys, 3) {
                        Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
                        None => format!("unknown field {level}"),
                    };
                    diagnostics.push(Diagnostic {
                        severity: Severity::Error,
                        category: "unknown-field",
                        path,
                        message: msg.trim().to_string(),
                    });
                }
            }
        },
        (Value::Object(object), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in object {
                let path = join_path(prefix, key);
                check_fields(child_value, value_schema, &path, diagnostics);
            }
        },
        (Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                let path = format!("{prefix}[{i}]");
                check_fields(item, item_schema, &path, diagnostics);
            }
        },
        (value, KnownKeys::Leaf(kind)) => {
            if !kind.accepts(value) {
                let mut diagnostic = type_mismatch(prefix, &kind.describe(), value);
                if let (LeafKind::Enum(_), Some(s)) = (kind, value.as_str()) {
                    diagnostic.message = format!("invalid value \"{s}\"; expected {}", kind.describe());
                }
                diagnostics.push(diagnostic);
            }
        },
        (value, KnownKeys::Struct(_) | KnownKeys::Map(_)) => {
            diagnostics.push(type_mismatch(prefix, "an object", value));
        },
        (value, KnownKeys::Array(_)) => {
            diagnostics.push(type_mismatch(prefix, "an array", value));
        },
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic_warnings(config: &ClawlineConfig, diagnostics: &mut Vec<Diagnostic>) {
    let telegram = &config.channels.telegram;
    let accounts = std::iter::once(("channels.telegram".to_string(), &telegram.account)).chain(
        telegram
            .accounts
            .iter()
            .map(|(id, account)| (format!("channels.telegram.accounts.{id}"), account)),
    );

    for (path, account) in accounts {
        if account.bot_token.is_some() && account.token_file.is_some() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "security",
                path: path.clone(),
                message: "both botToken and tokenFile are set; botToken takes precedence".into(),
            });
        }

        if account.network.ssrf.allow_private_network == Some(true) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "security",
                path: format!("{path}.network.ssrf.allowPrivateNetwork"),
                message: "media fetches may reach private and loopback addresses".into(),
            });
        }

        // An allowlist with no allowed groups silently drops every group message.
        if account.group_policy == Some(crate::schema::GroupPolicy::Allowlist)
            && account.group_allow_from.is_empty()
            && account.groups.is_empty()
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "policy",
                path: format!("{path}.groupPolicy"),
                message: "groupPolicy is \"allowlist\" but neither groupAllowFrom nor groups \
                          lists any group"
                    .into(),
            });
        }
    }

    let memory = &config.agents.defaults.memory_search;
    if let (Some(provider), Some(fallback)) = (memory.provider, memory.fallback) {
        let same = serde_json::to_value(provider).ok() == serde_json::to_value(fallback).ok();
        if same {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                category: "policy",
                path: "agents.defaults.memorySearch.fallback".into(),
                message: "fallback is the same as provider and will never change the outcome"
                    .into(),
            });
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn find<'a>(result: &'a ValidationResult, category: &str, path: &str) -> Option<&'a Diagnostic> {
        result
            .diagnostics
            .iter()
            .find(|d| d.category == category && d.path == path)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("groupPolicy", "grupPolicy"), 1);
        assert_eq!(levenshtein("ssrf", "srf"), 1);
    }

    #[test]
    fn empty_object_is_valid() {
        let result = validate_config_object(&json!({}));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn accepts_nested_telegram_group_policy_overrides() {
        let result = validate_config_object(&json!({
            "channels": {
                "telegram": {
                    "groups": {
                        "-1001234567890": {
                            "groupPolicy": "open",
                            "topics": {
                                "42": { "groupPolicy": "disabled" }
                            }
                        }
                    }
                }
            }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn accepts_memory_search_fallback_voyage() {
        let result = validate_config_object(&json!({
            "agents": { "defaults": { "memorySearch": { "fallback": "voyage" } } }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn accepts_ssrf_allowed_hostnames() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "network": { "ssrf": {
                "allowedHostnames": ["minio.internal.example.com"]
            } } } }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn accepts_ssrf_allow_private_network_with_warning() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "network": { "ssrf": { "allowPrivateNetwork": true } } } }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
        let warning = find(
            &result,
            "security",
            "channels.telegram.network.ssrf.allowPrivateNetwork",
        );
        assert_eq!(warning.map(|d| d.severity), Some(Severity::Warning));
    }

    #[test]
    fn rejects_unknown_key_inside_ssrf() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "network": { "ssrf": {
                "allowedHostnames": ["example.com"],
                "bogusKey": true
            } } } }
        }));
        assert!(!result.is_ok());
        let unknown = find(
            &result,
            "unknown-field",
            "channels.telegram.network.ssrf.bogusKey",
        );
        assert!(unknown.is_some(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_config_object(&json!({ "chanels": {} }));
        let d = find(&result, "unknown-field", "chanels").expect("unknown-field diagnostic");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.message.contains("at top level"));
        assert!(d.message.contains("channels"), "message: {}", d.message);
    }

    #[test]
    fn unknown_key_deep_in_topic_rejected() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "groups": { "-100": { "topics": { "7": {
                "requireMentoin": true
            } } } } } }
        }));
        let d = find(
            &result,
            "unknown-field",
            "channels.telegram.groups.-100.topics.7.requireMentoin",
        )
        .expect("unknown-field diagnostic");
        assert!(d.message.contains("requireMention"));
    }

    #[test]
    fn named_accounts_share_the_account_shape() {
        let ok = validate_config_object(&json!({
            "channels": { "telegram": { "accounts": { "work": {
                "dmPolicy": "pairing",
                "groups": { "-100": { "topics": { "1": { "groupPolicy": "allowlist" } } } }
            } } } }
        }));
        assert!(ok.is_ok(), "got: {:?}", ok.diagnostics);

        let nested = validate_config_object(&json!({
            "channels": { "telegram": { "accounts": { "work": { "accounts": {} } } } }
        }));
        assert!(find(&nested, "unknown-field", "channels.telegram.accounts.work.accounts").is_some());
    }

    #[rstest]
    #[case(json!({"channels": {"telegram": {"groupPolicy": "sometimes"}}}), "channels.telegram.groupPolicy")]
    #[case(json!({"channels": {"telegram": {"enabled": "true"}}}), "channels.telegram.enabled")]
    #[case(json!({"channels": {"telegram": {"network": {"ssrf": {"allowedHostnames": ["a", 1]}}}}}), "channels.telegram.network.ssrf.allowedHostnames[1]")]
    #[case(json!({"channels": {"telegram": {"network": {"ssrf": {"allowedHostnames": "a"}}}}}), "channels.telegram.network.ssrf.allowedHostnames")]
    #[case(json!({"channels": {"telegram": {"groups": []}}}), "channels.telegram.groups")]
    #[case(json!({"tools": {"media": {"image": {"stripFromPrompt": 1}}}}), "tools.media.image.stripFromPrompt")]
    #[case(json!({"agents": {"defaults": {"memorySearch": {"fallback": "pinecone"}}}}), "agents.defaults.memorySearch.fallback")]
    #[case(json!({"logging": {"level": null}}), "logging.level")]
    fn wrong_leaf_type_rejected(#[case] tree: Value, #[case] path: &str) {
        let result = validate_config_object(&tree);
        assert!(result.has_errors());
        assert!(
            find(&result, "type-error", path).is_some(),
            "expected type-error at {path}, got: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn enum_error_lists_allowed_values() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "dmPolicy": "everyone" } }
        }));
        let d = find(&result, "type-error", "channels.telegram.dmPolicy").unwrap();
        assert!(d.message.contains("pairing, allowlist, open, disabled"));
    }

    #[test]
    fn non_object_root_rejected() {
        assert!(validate_config_object(&json!([1, 2])).has_errors());
        assert!(validate_config_object(&json!("config")).has_errors());
    }

    #[test]
    fn allow_from_accepts_mixed_ids() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "allowFrom": [123456, "@alice"], "groupAllowFrom": [-100] } }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn negative_integer_caught_by_type_check() {
        let result = validate_config_object(&json!({
            "tools": { "media": { "image": { "maxBytes": -5 } } }
        }));
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn full_media_capability_block_accepted() {
        let result = validate_config_object(&json!({
            "tools": { "media": {
                "concurrency": 2,
                "image": {
                    "enabled": false,
                    "stripFromPrompt": true,
                    "maxBytes": 10485760,
                    "models": [{ "provider": "openai", "model": "gpt-4.1-mini" }],
                    "attachments": { "mode": "all", "maxAttachments": 4, "prefer": "path" }
                },
                "audio": { "language": "en", "timeoutSeconds": 30 }
            } }
        }));
        assert!(result.is_ok(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn unknown_field_in_model_entry_rejected() {
        let result = validate_config_object(&json!({
            "tools": { "media": { "audio": { "models": [{ "provider": "groq", "modle": "x" }] } } }
        }));
        assert!(find(&result, "unknown-field", "tools.media.audio.models[0].modle").is_some());
    }

    #[test]
    fn allowlist_without_groups_warns() {
        let result = validate_config_object(&json!({
            "channels": { "telegram": { "groupPolicy": "allowlist" } }
        }));
        assert!(result.is_ok());
        assert!(find(&result, "policy", "channels.telegram.groupPolicy").is_some());
    }

    #[test]
    fn json5_and_toml_entry_points() {
        let json5 = r#"{
            // comments are fine
            channels: { telegram: { groupPolicy: "open", } },
        }"#;
        assert!(validate_json_str(json5).is_ok());

        let toml = r#"
[channels.telegram.network.ssrf]
allowedHostnames = ["example.com"]
bogusKey = true
"#;
        let result = validate_toml_str(toml);
        assert!(find(&result, "unknown-field", "channels.telegram.network.ssrf.bogusKey").is_some());
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_json_str("{ not json");
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.category == "syntax"));
    }

    #[test]
    fn parse_config_object_returns_typed_config() {
        let cfg = parse_config_object(&json!({
            "tools": { "media": { "image": { "enabled": false, "stripFromPrompt": true } } }
        }))
        .unwrap();
        assert_eq!(cfg.tools.media.image.enabled, Some(false));
        assert_eq!(cfg.tools.media.image.strip_from_prompt, Some(true));

        let rejected = parse_config_object(&json!({ "tools": { "bogus": 1 } })).unwrap_err();
        assert!(rejected.has_errors());
    }

    #[test]
    fn validate_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clawline.json");
        std::fs::write(&path, r#"{"logging": {"level": "debug", "colour": true}}"#).unwrap();
        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(find(&result, "unknown-field", "logging.colour").is_some());
    }

    /// Schema drift guard: verify every key from `ClawlineConfig::default()` is
    /// represented in `build_schema_map()`.
    #[test]
    fn schema_drift_guard() {
        let config = ClawlineConfig::default();
        let value = serde_json::to_value(&config).expect("serialize default config");
        let schema = build_schema_map();
        let mut missing = Vec::new();
        collect_missing_keys(&value, &schema, "", &mut missing);
        assert!(
            missing.is_empty(),
            "schema map is missing keys present in ClawlineConfig::default(): {missing:?}\n\
             Update build_schema_map() in validate.rs to include these fields."
        );
    }

    fn collect_missing_keys(
        value: &Value,
        schema: &KnownKeys,
        prefix: &str,
        missing: &mut Vec<String>,
    ) {
        match (value, schema) {
            (Value::Object(object), KnownKeys::Struct(fields)) => {
                for (key, child_value) in object {
                    let path = join_path(prefix, key);
                    match fields.get(key.as_str()) {
                        Some(child_schema) => {
                            collect_missing_keys(child_value, child_schema, &path, missing);
                        },
                        None => missing.push(path),
                    }
                }
            },
            (Value::Object(object), KnownKeys::Map(value_schema)) => {
                for (key, child_value) in object {
                    let path = join_path(prefix, key);
                    collect_missing_keys(child_value, value_schema, &path, missing);
                }
            },
            (Value::Array(items), KnownKeys::Array(item_schema)) => {
                for (i, item) in items.iter().enumerate() {
                    collect_missing_keys(item, item_schema, &format!("{prefix}[{i}]"), missing);
                }
            },
            _ => {},
        }
    }

    #[test]
    fn suggest_finds_close_match() {
        let candidates = &["allowedHostnames", "allowPrivateNetwork"];
        assert_eq!(suggest("allowedHostname", candidates, 3), Some("allowedHostnames"));
        assert_eq!(suggest("bogusKey", candidates, 3), None);
    }
}
