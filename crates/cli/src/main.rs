mod config_commands;
mod media_commands;

use {
    clap::{Parser, Subcommand},
    clawline_config::ClawlineConfig,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "clawline", about = "Clawline: config checks and media preprocessing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to
    /// `logging.level` from config, then `info`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/clawline/).
    #[arg(long, global = true, env = "CLAWLINE_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Media understanding tools.
    Media {
        #[command(subcommand)]
        action: media_commands::MediaAction,
    },
}

/// Resolve the log filter: `RUST_LOG`, then `--log-level`, then config.
fn log_filter(cli: &Cli, config: &ClawlineConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cli
            .log_level
            .as_deref()
            .or_else(|| config.logging.level.map(|l| l.as_str()))
            .unwrap_or("info");
        EnvFilter::new(level)
    })
}

fn init_telemetry(cli: &Cli, config: &ClawlineConfig) {
    let registry = tracing_subscriber::registry().with(log_filter(cli, config));

    if cli.json_logs || config.logging.json == Some(true) {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(ref dir) = cli.config_dir {
        clawline_config::set_config_dir(dir.clone());
    }
    let config = clawline_config::discover_and_load();

    init_telemetry(&cli, &config);
    debug!(version = env!("CARGO_PKG_VERSION"), "clawline starting");

    match cli.command {
        Commands::Config { action } => config_commands::handle_config(action),
        Commands::Media { action } => media_commands::handle_media(action, &config).await,
    }
}
