//! Gateway configuration with validation.
//!
//! The whole tree is plain data, loaded once at startup and shared read-only
//! by the gate and adapters.

use crate::domain::handler::Protocol;
use crate::domain::pipe::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Pipe-table key whose chains apply to handlers without their own entry
pub const DEFAULT_PIPE_KEY: &str = "default";

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Request and stream limits
    pub limits: LimitsConfig,
    /// Call deadlines
    pub timeouts: TimeoutConfig,
    /// Mount paths
    pub routes: RoutesConfig,
    /// Reserved parameter keys
    pub params: ParamKeys,
    /// Handler registry: handler id to implementation
    pub handlers: HashMap<String, HandlerBinding>,
    /// Pipe chains per handler id, plus the `default` fallback
    pub pipes: PipeTable,
}

impl GatewayConfig {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse from a JSON document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `LC_HTTP_HOST` / `LC_HTTP_PORT` overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("LC_HTTP_HOST") {
            self.http.host = host
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("LC_HTTP_HOST: {host}")))?;
        }
        if let Ok(port) = std::env::var("LC_HTTP_PORT") {
            self.http.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("LC_HTTP_PORT: {port}")))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit("max_body_size cannot be 0".into()));
        }

        if self.limits.stream_buffer == 0 {
            return Err(ConfigError::InvalidLimit("stream_buffer cannot be 0".into()));
        }

        if self.timeouts.call.is_zero() {
            return Err(ConfigError::InvalidTimeout("call timeout cannot be 0".into()));
        }

        if self.params.command_id == self.params.method
            || self.params.stream_command_id == self.params.stream_method
        {
            return Err(ConfigError::Invalid(
                "handler id and verb keys must differ".into(),
            ));
        }

        for (id, binding) in &self.handlers {
            if let Some(protocols) = &binding.protocols {
                if protocols.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "handler '{id}' lists no protocols"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8001)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8001,
            enabled: true,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string(), "X-Request-Id".to_string()],
            max_age: 86400,
        }
    }
}

/// Request and stream limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_body_size: usize,
    /// Frames buffered between a streaming handler and the socket
    pub stream_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            stream_buffer: 64,
        }
    }
}

/// Call deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline applied to every gateway call
    #[serde(with = "humantime_serde")]
    pub call: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(30),
        }
    }
}

/// Mount paths of the HTTP routes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub command: String,
    pub rpc: String,
    pub stream: String,
    pub action: String,
    pub health: String,
    pub metrics: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            command: "/command".to_string(),
            rpc: "/rpc".to_string(),
            stream: "/stream".to_string(),
            action: "/action".to_string(),
            health: "/health".to_string(),
            metrics: "/metrics".to_string(),
        }
    }
}

/// Reserved parameter keys stripped before parameters reach a handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamKeys {
    pub command_id: String,
    pub method: String,
    pub stream_command_id: String,
    pub stream_method: String,
    pub action: String,
}

impl Default for ParamKeys {
    fn default() -> Self {
        Self {
            command_id: "__command_id".to_string(),
            method: "__method".to_string(),
            stream_command_id: "command_id".to_string(),
            stream_method: "method".to_string(),
            action: "__action".to_string(),
        }
    }
}

/// Registry entry naming the implementation of a handler id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerBinding {
    pub module: String,
    pub class: String,
    /// Protocols the handler accepts; `None` accepts all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<Protocol>>,
}

impl HandlerBinding {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: class.into(),
            protocols: None,
        }
    }

    /// Restrict the binding to the given protocols
    pub fn with_protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.protocols = Some(protocols.into_iter().collect());
        self
    }

    /// Catalog path, `module.class`
    pub fn path(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }

    pub fn is_complete(&self) -> bool {
        !self.module.is_empty() && !self.class.is_empty()
    }

    pub fn accepts(&self, protocol: Protocol) -> bool {
        self.protocols
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&protocol))
    }
}

/// Before/after pipe names of one pipe-table entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseChains {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<String>>,
}

impl PhaseChains {
    fn get(&self, phase: Phase) -> Option<&[String]> {
        match phase {
            Phase::Before => self.before.as_deref(),
            Phase::After => self.after.as_deref(),
        }
    }
}

/// Pipe chains keyed by handler id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipeTable(HashMap<String, PhaseChains>);

impl PipeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain for one handler and phase
    pub fn set(&mut self, handler_id: impl Into<String>, phase: Phase, names: Vec<String>) {
        let entry = self.0.entry(handler_id.into()).or_default();
        match phase {
            Phase::Before => entry.before = Some(names),
            Phase::After => entry.after = Some(names),
        }
    }

    /// Ordered pipe names for `(handler_id, phase)`.
    ///
    /// Falls back per phase to the `default` entry, then to an empty chain.
    pub fn chain_for(&self, handler_id: &str, phase: Phase) -> &[String] {
        self.0
            .get(handler_id)
            .and_then(|chains| chains.get(phase))
            .or_else(|| self.0.get(DEFAULT_PIPE_KEY).and_then(|c| c.get(phase)))
            .unwrap_or(&[])
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Read(String),
    /// Config file is not valid JSON for this schema
    #[error("cannot parse config: {0}")]
    Parse(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s", or "500ms" would parse as "500m" seconds
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
