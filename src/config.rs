use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_LLM_TIMEOUT_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

/// Settings for connections opened against user databases
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub default_port: u16,
    pub query_timeout_secs: u64,
    pub pool_size: usize,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: i64,
    pub api_key: Option<String>,
}

impl LlmConfig {
    /// Translation deadline; non-positive values fall back to the default
    pub fn timeout(&self) -> Duration {
        let secs = if self.timeout_secs > 0 {
            self.timeout_secs
        } else {
            DEFAULT_LLM_TIMEOUT_SECS
        };
        Duration::from_secs(secs as u64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Environment variables layered over the defaults, with the key each one sets
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("DB_DEFAULT_PORT", "database.default_port"),
    ("DB_QUERY_TIMEOUT_SECS", "database.query_timeout_secs"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("LLM_BASE_URL", "llm.base_url"),
    ("LLM_MODEL", "llm.model"),
    ("LLM_TIMEOUT_SECS", "llm.timeout_secs"),
    ("LLM_API_KEY", "llm.api_key"),
    ("RUST_LOG", "logging.level"),
];

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file before reading overrides
        let _ = dotenv::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from defaults plus whatever `lookup` returns for each override
    /// variable. Values are passed through as strings, so a malformed number
    /// fails deserialization instead of silently becoming the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("database.default_port", 5432)?
            .set_default("database.query_timeout_secs", 30)?
            .set_default("database.pool_size", 4)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("llm.base_url", "http://localhost:11434")?
            .set_default("llm.model", "llama3.2")?
            .set_default("llm.timeout_secs", DEFAULT_LLM_TIMEOUT_SECS)?
            .set_default("logging.level", "info")?;

        for &(var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let address = self.server_address();
        address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server address '{}'", address))
    }
}
