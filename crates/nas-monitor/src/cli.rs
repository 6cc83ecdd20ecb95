//! Command-line arguments and configuration resolution.

use std::path::PathBuf;

use clap::Parser;
use nas_monitor_core::{ClientConfig, Result};

/// Watch a storage host's lifecycle state over its management socket.
///
/// `RUST_LOG` overrides the configured log level.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "nas-monitor")]
#[command(about = "Watch a storage host's lifecycle state over its management socket")]
#[command(version)]
pub struct CliArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host URL (overrides host.url)
    #[arg(long, env = "NAS_MONITOR_URL")]
    pub url: Option<String>,

    /// API key (overrides host.api_key)
    #[arg(long, env = "NAS_MONITOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Resolve the effective configuration.
///
/// Precedence, lowest first: built-in defaults, the config file, then the
/// parsed arguments (flags win over their environment variables).
pub fn load_config(args: &CliArgs) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    if let Some(url) = args.url.as_ref().filter(|v| !v.is_empty()) {
        config.host.url = Some(url.clone());
    }
    if let Some(key) = args.api_key.as_ref().filter(|v| !v.is_empty()) {
        config.host.api_key = Some(key.clone());
    }

    config.validate()?;
    Ok(config)
}
