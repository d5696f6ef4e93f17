//! Command-line overrides applied on top of layered settings

use clap::Parser;

use super::Settings;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "longpoll-mq", version, about = "In-memory long-polling message queue")]
pub struct Cli {
    /// Port of the queue service
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port for the health, stats and metrics listener
    #[arg(long = "admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_parser = ["text", "json"])]
    pub log_format: Option<String>,
}

impl Cli {
    /// Flags win over files and environment
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.admin_port {
            settings.admin.port = Some(port);
        }
    }

    pub fn json_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some(format) => format == "json",
            None => std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false),
        }
    }
}
