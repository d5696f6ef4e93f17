use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Process-wide limits copied into every queue at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// Buffer capacity per queue (MaxQueueSize)
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Concurrently waiting consumers per queue (MaxQueueReaders)
    #[serde(default = "default_max_readers")]
    pub max_readers: usize,
    /// Sustained operations per second per queue (QueueRPS)
    #[serde(default = "default_rps")]
    pub rps: u32,
    /// Token bucket burst capacity per queue
    #[serde(default = "default_burst")]
    pub burst: u32,
}

/// Optional side listener for health, stats and metrics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    pub port: Option<u16>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_size() -> usize {
    100
}

fn default_max_readers() -> usize {
    100
}

fn default_rps() -> u32 {
    10
}

fn default_burst() -> u32 {
    100
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("queue.max_size", default_max_size() as i64)?
            .set_default("queue.max_readers", default_max_readers() as i64)?
            .set_default("queue.rps", i64::from(default_rps()))?
            .set_default("queue.burst", i64::from(default_burst()))?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // MQ_SERVER__PORT, MQ_QUEUE__MAX_SIZE, MQ_ADMIN__PORT, etc.
            .add_source(
                Environment::with_prefix("MQ")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject limits that would make every queue unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.queue;
        for (key, value) in [
            ("queue.max_size", q.max_size as u64),
            ("queue.max_readers", q.max_readers as u64),
            ("queue.rps", u64::from(q.rps)),
            ("queue.burst", u64::from(q.burst)),
        ] {
            if value == 0 {
                return Err(ConfigError::Message(format!("{key} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn admin_addr(&self) -> Option<String> {
        self.admin
            .port
            .map(|port| format!("{}:{}", self.server.host, port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_readers: default_max_readers(),
            rps: default_rps(),
            burst: default_burst(),
        }
    }
}
