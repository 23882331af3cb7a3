//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via
//! `-f` or `NUMLEASE_CONFIG`.
//!
//! ## Loading priority
//!
//! Later sources override earlier ones:
//!
//! 1. **YAML config file** (missing file is fine, defaults apply)
//! 2. **Environment variables** prefixed with `NUMLEASE_`, with `__` as the
//!    nesting separator (e.g. `NUMLEASE_PROVIDER__TIMEOUT=5s`)
//! 3. **DATABASE_URL**: special case, overrides `database.url` if set
//!
//! The database defaults to an embedded SQLite file next to the process, so
//! a bare `numlease` invocation works without any external services.

use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "NUMLEASE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g. "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Operator account created (or promoted) on startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminSeedConfig>,
    /// Delivery provider endpoint configuration
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database: DatabaseConfig::default(),
            admin: None,
            provider: ProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// How long a contending write waits for the lock before erroring
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://numlease.db".to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// The initial admin user, ensured idempotently at startup. Admin status is
/// only ever granted through this seed (or by hand in the database); the API
/// cannot mint administrators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSeedConfig {
    pub external_id: String,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the code delivery endpoint
    pub base_url: Url,
    /// Bound on each outbound delivery request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://ca.irbots.com:27/").expect("default provider url is valid"),
            timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("NUMLEASE_").split("__"));

        // DATABASE_URL wins over everything, matching deployment convention.
        if let Ok(url) = std::env::var("DATABASE_URL") {
            figment = figment.merge(Serialized::default("database.url", url));
        }

        figment.extract()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
