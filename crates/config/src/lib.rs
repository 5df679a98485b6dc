//! Configuration loading, validation and env substitution.
//!
//! Config files: `clawline.json`, `clawline.json5`, `clawline.toml` or
//! `clawline.yaml`, searched in `./` then `~/.config/clawline/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        clear_config_dir, config_dir, discover_and_load, load_config, load_config_value,
        set_config_dir,
    },
    schema::{
        AttachmentMode, AttachmentPolicyConfig, AttachmentPrefer, ClawlineConfig, GroupPolicy,
        LogLevel, MediaCapabilityConfig, MediaModelEntry, MediaToolsConfig, SsrfPolicyConfig,
        TelegramConfig,
    },
    validate::{
        Diagnostic, Severity, ValidationResult, parse_config_object, validate_config_object,
    },
};
