use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ClawlineConfig, validate};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "clawline.json",
    "clawline.json5",
    "clawline.toml",
    "clawline.yaml",
    "clawline.yml",
];

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user-global config directory (e.g. from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Clear a previous [`set_config_dir`] override.
pub fn clear_config_dir() {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

/// Returns the user-global config directory (`~/.config/clawline/`), or the
/// override set with [`set_config_dir`].
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE.read().ok().and_then(|g| g.clone()) {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "clawline").map(|d| d.config_dir().to_path_buf())
}

/// Load, substitute `${ENV}` and parse a config file into a raw tree.
pub fn load_config_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Load a config file, reject it unless it validates, and deserialize it.
pub fn load_config(path: &Path) -> anyhow::Result<ClawlineConfig> {
    let value = load_config_value(path)?;
    validate::parse_config_object(&value).map_err(|result| {
        let details: Vec<String> = result
            .errors()
            .map(|d| {
                if d.path.is_empty() {
                    d.message.clone()
                } else {
                    format!("{}: {}", d.path, d.message)
                }
            })
            .collect();
        anyhow::anyhow!("invalid config {}: {}", path.display(), details.join("; "))
    })
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./clawline.{json,json5,toml,yaml,yml}` (project-local)
/// 2. `~/.config/clawline/clawline.{json,json5,toml,yaml,yml}` (user-global)
///
/// Returns `ClawlineConfig::default()` if no config file is found or the file
/// is rejected.
pub fn discover_and_load() -> ClawlineConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ClawlineConfig::default()
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match ext {
        "json" => Ok(serde_json::from_str(raw)?),
        "json5" => Ok(json5::from_str(raw)?),
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
