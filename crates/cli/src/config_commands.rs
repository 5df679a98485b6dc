use std::path::PathBuf;

use {anyhow::Result, clap::Subcommand};

use clawline_config::{
    ValidationResult,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Config file to check (defaults to the discovered one).
        path: Option<PathBuf>,
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the directory searched for the user-global config file.
    Dir,
}

pub fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { path, verbose } => check(path, verbose),
        ConfigAction::Dir => {
            match clawline_config::config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => eprintln!("no config directory available on this platform"),
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let result = validate::validate(path.as_deref());

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let lines = render(&result, verbose);
    for line in &lines {
        eprintln!("  {line}");
    }
    if !lines.is_empty() {
        eprintln!();
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn render(result: &ValidationResult, verbose: bool) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .map(|d| {
            let (color, label) = match d.severity {
                Severity::Error => (RED, "error"),
                Severity::Warning => (YELLOW, "warning"),
                Severity::Info => (CYAN, "info"),
            };
            if d.path.is_empty() {
                format!("{BOLD}{color}{label}{RESET} {}", d.message)
            } else {
                format!("{BOLD}{color}{label}{RESET} {}: {}", d.path, d.message)
            }
        })
        .collect()
}
