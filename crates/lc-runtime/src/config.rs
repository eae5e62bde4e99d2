//! Startup configuration loading.

use crate::catalog::demo_config;
use lc_gateway::domain::config::ConfigError;
use lc_gateway::GatewayConfig;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "LC_CONFIG";

/// Load from `LC_CONFIG`, apply env overrides and validate.
///
/// Without `LC_CONFIG`, or when the named file does not exist, the demo
/// configuration is used.
pub fn load_config() -> Result<GatewayConfig, ConfigError> {
    let path = std::env::var(CONFIG_ENV).ok();
    load_config_from(path.as_deref().map(Path::new))
}

pub fn load_config_from(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading configuration");
            GatewayConfig::from_file(path)?
        }
        Some(path) => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            demo_config()
        }
        None => demo_config(),
    };

    config.apply_env()?;
    config.validate()?;
    Ok(config)
}
