//! Configuration loading and management
//!
//! Settings come from a YAML file, then environment variables override
//! individual values:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 3000
//! database:
//!   uri: mongodb+srv://user:<PASSWORD>@cluster.example.net
//!   name: natours
//! query:
//!   max_limit: 100
//! log:
//!   filter: info,tours=debug
//! ```

use crate::core::query::{DEFAULT_LIMIT, MAX_LIMIT, PageLimits};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "TOURS_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/tours.yaml";

/// Placeholder in the database URI replaced by `TOURS_DATABASE_PASSWORD`
pub const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for `TcpListener::bind`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Document database settings
///
/// Without a `uri` the server runs on the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub uri: Option<String>,
    pub name: String,
    pub collection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            name: "natours".to_string(),
            collection: "tours".to_string(),
        }
    }
}

/// Page-size settings for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration the server starts with.
    ///
    /// Reads the file named by `TOURS_CONFIG`, or `config/tours.yaml` when it
    /// exists, or falls back to defaults; then applies environment overrides.
    pub fn load() -> Result<Self> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_yaml_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TOURS_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TOURS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TOURS_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("TOURS_PORT is not a valid port: {}", port))?;
        }
        if let Some(uri) = lookup("TOURS_DATABASE_URI") {
            self.database.uri = Some(uri);
        }
        if let Some(name) = lookup("TOURS_DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(max) = lookup("TOURS_MAX_LIMIT") {
            self.query.max_limit = max
                .parse()
                .with_context(|| format!("TOURS_MAX_LIMIT is not a number: {}", max))?;
        }
        if let (Some(uri), Some(password)) =
            (self.database.uri.as_mut(), lookup("TOURS_DATABASE_PASSWORD"))
        {
            *uri = uri.replace(PASSWORD_PLACEHOLDER, &password);
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.query.max_limit > 0, "query.max_limit must be positive");
        anyhow::ensure!(
            self.query.default_limit > 0,
            "query.default_limit must be positive"
        );
        Ok(())
    }

    /// Page limits for the query builder; the default never exceeds the cap
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.query.default_limit.min(self.query.max_limit),
            max_limit: self.query.max_limit,
        }
    }
}
