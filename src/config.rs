use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConsoleError, Result};

/// Main configuration for the line console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote host to connect to
    #[serde(default = "default_host")]
    pub host: String,
    /// Remote TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prompt shown before each operator line
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Upper bound on the wait for a reply line (None = wait forever)
    #[serde(default)]
    pub reply_timeout_ms: Option<u64>,
}

fn default_host() -> String {
    "192.168.1.100".to_string()
}

fn default_port() -> u16 {
    23
}

fn default_prompt() -> String {
    "Command to send: ".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            prompt: default_prompt(),
            reply_timeout_ms: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConsoleError::ConfigError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConsoleError::ConfigError(e.to_string()))
    }

    /// Merge CLI arguments into this configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_cli_args(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        reply_timeout_ms: Option<u64>,
    ) {
        if let Some(h) = host {
            self.host = h;
        }
        if let Some(p) = port {
            self.port = p;
        }
        if reply_timeout_ms.is_some() {
            self.reply_timeout_ms = reply_timeout_ms;
        }
    }

    /// The `host:port` string the transport connects to
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }
}
