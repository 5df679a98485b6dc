use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    clawline_common::types::MsgContext,
    clawline_config::ClawlineConfig,
    clawline_media_understanding::{
        ApplyOptions, MediaCapability, apply_media_understanding, build_provider_registry,
    },
};

#[derive(Subcommand)]
pub enum MediaAction {
    /// Run media understanding over a message context (JSON) and print the
    /// decisions and the resulting context.
    Inspect {
        /// Path to a JSON file holding one message context (PascalCase keys).
        ctx: PathBuf,
    },
    /// Show how each media capability is configured.
    Capabilities,
}

pub async fn handle_media(action: MediaAction, config: &ClawlineConfig) -> Result<()> {
    match action {
        MediaAction::Inspect { ctx } => inspect(&ctx, config).await,
        MediaAction::Capabilities => {
            for capability in MediaCapability::ALL {
                println!("{}", describe_capability(capability, config));
            }
            Ok(())
        },
    }
}

async fn inspect(path: &Path, config: &ClawlineConfig) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut ctx: MsgContext = serde_json::from_str(&raw)
        .with_context(|| format!("invalid message context in {}", path.display()))?;

    let registry = build_provider_registry();
    let result =
        apply_media_understanding(&mut ctx, config, &registry, ApplyOptions::from_config(config)).await;

    let report = serde_json::json!({
        "decisions": result.decisions,
        "outputs": result.outputs,
        "cleanupError": result.cleanup_error.as_ref().map(ToString::to_string),
        "context": ctx,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe_capability(capability: MediaCapability, config: &ClawlineConfig) -> String {
    let cfg = capability.config(config);
    let state = match cfg.enabled {
        Some(false) => "disabled",
        Some(true) => "enabled",
        None => "auto",
    };
    let strip = if cfg.strip_from_prompt == Some(true) {
        ", strips from prompt"
    } else {
        ""
    };
    let models = if cfg.models.is_empty() {
        "registered providers".to_string()
    } else {
        cfg.models
            .iter()
            .map(|m| match &m.model {
                Some(model) => format!("{}/{model}", m.provider),
                None => m.provider.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{capability}: {state}{strip} ({models})")
}
