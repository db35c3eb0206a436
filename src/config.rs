//! Configuration management for Bookshelf server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest request body the access log middleware will buffer
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Append-only log file; empty disables the file sink
    pub file: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from defaults, optional files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let server = ServerConfig::default();
        let logging = LoggingConfig::default();

        let config = Config::builder()
            .set_default("server.host", server.host)?
            .set_default("server.port", i64::from(server.port))?
            .set_default("server.max_body_bytes", server.max_body_bytes as i64)?
            .set_default("logging.level", logging.level)?
            .set_default("logging.format", logging.format)?
            .set_default("logging.file", logging.file)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables (with prefix BOOKSHELF_), e.g. BOOKSHELF_SERVER__PORT
            .add_source(
                Environment::with_prefix("BOOKSHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Address string the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: "api.log".to_string(),
        }
    }
}
