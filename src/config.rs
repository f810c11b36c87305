//! Configuration management for coinmesh nodes
//!
//! Values come from an optional TOML file; every field has a default, so a
//! missing file is not an error. Command-line flags override file values.

use crate::storage::StorageBackend;
use crate::sync::PeerAddress;
use crate::transport::{TransportConfig, TransportError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default listen port for both primary and peer nodes
pub const DEFAULT_PORT: u16 = 5762;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid primary address {0:?}, expected host:port")]
    InvalidPrimary(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identifier announced to the primary; defaults to `host:port`
    pub node_id: Option<String>,
    /// Host other nodes should use to reach this one
    pub host: String,
    /// Port to listen on and announce
    pub port: u16,
    /// Interface the listener binds to
    pub bind_address: String,
    /// Directory holding the persisted collections
    pub data_dir: PathBuf,
    /// Primary registry as `host:port`
    pub primary: Option<String>,
    pub storage: StorageBackend,
    pub transport: TransportConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".to_string(),
            data_dir: PathBuf::from("./data"),
            primary: None,
            storage: StorageBackend::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_node_id(mut self, id: &str) -> Self {
        self.node_id = Some(id.to_string());
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_primary(mut self, primary: &str) -> Self {
        self.primary = Some(primary.to_string());
        self
    }

    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// The configured node id, or `host:port`
    pub fn node_id(&self) -> String {
        match &self.node_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    /// Parse the primary address, if one is configured
    pub fn primary_address(&self) -> Result<Option<PeerAddress>, ConfigError> {
        let Some(primary) = &self.primary else {
            return Ok(None);
        };
        let (host, port) = primary
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidPrimary(primary.clone()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidPrimary(primary.clone()))?;
        if host.is_empty() || port == 0 {
            return Err(ConfigError::InvalidPrimary(primary.clone()));
        }
        Ok(Some(PeerAddress::new(host, port)))
    }

    /// Validate critical values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must be set".to_string()));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must be set".to_string()));
        }
        self.primary_address()?;
        self.transport.validate()?;
        Ok(())
    }
}
