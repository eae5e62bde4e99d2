//! # Lightcone Runtime
//!
//! Process wiring for the gateway binary.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, then `LC_LOG_LEVEL`, then `info`)
//! 2. Load configuration (`LC_CONFIG` file, env overrides, validation)
//! 3. Build the demo catalog
//! 4. Start the HTTP service
//! 5. Wait for Ctrl+C, then shut down gracefully

pub mod catalog;
pub mod commands;
pub mod config;
pub mod pipes;

use lc_gateway::{GatewayConfig, GatewayError, GatewayService};
use std::sync::Arc;

pub use catalog::{build_catalog, demo_config};
pub use config::load_config;

/// Gateway service over the demo catalog
pub fn build_service(config: GatewayConfig) -> Result<GatewayService, GatewayError> {
    GatewayService::new(config, Arc::new(build_catalog()))
}
