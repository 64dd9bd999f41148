use crate::logic_module::{LogicModule, LogicModuleModel};
use crate::relationship::{JoinRecord, Relationship};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Top-level configuration for the Tessera gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Inbound HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Request engine configuration
    #[serde(default)]
    pub gateway: EngineConfig,

    /// Registry contents for the in-memory backend
    #[serde(default)]
    pub registry: RegistrySeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener address
    #[serde(default = "default_listen_addr")]
    pub addr: SocketAddr,

    /// Inbound request body limit (bytes)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Join fan-out strategy
    #[serde(default)]
    pub execution: ExecutionMode,

    /// Upstream connection timeout (milliseconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Total per-call upstream timeout (milliseconds)
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_ms: u64,
}

/// How join sub-requests are scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One sub-request at a time, in plan order
    Sequential,
    /// Spec warm-up then full fan-out, awaited together
    #[default]
    Concurrent,
}

/// Declarative registry contents, loaded into a MemoryRegistry at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrySeed {
    #[serde(default)]
    pub modules: Vec<LogicModule>,
    #[serde(default)]
    pub models: Vec<LogicModuleModel>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub join_records: Vec<JoinRecord>,
}

impl TesseraConfig {
    /// Load configuration from YAML file + environment variables.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        } else {
            for default_path in &["tessera.yaml", "/etc/tessera/tessera.yaml", "config/tessera.yaml"] {
                if Path::new(default_path).exists() {
                    figment = figment.merge(Yaml::file(default_path));
                    break;
                }
            }
        }

        // Environment variables override: TESSERA_SERVER__ADDR, etc.
        figment = figment.merge(Env::prefixed("TESSERA_").split("__"));

        let config: Self = figment.extract()?;
        Ok(config)
    }
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            gateway: EngineConfig::default(),
            registry: RegistrySeed::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_listen_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionMode::Concurrent,
            connect_timeout_ms: default_connect_timeout(),
            upstream_timeout_ms: default_upstream_timeout(),
        }
    }
}

// Serde default functions

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8005".parse().unwrap()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_connect_timeout() -> u64 {
    6000
}

fn default_upstream_timeout() -> u64 {
    15000
}
