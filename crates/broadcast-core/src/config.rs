//! Stream configuration, as handed in by the configuration collaborator.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Default segment-buffer capacity when a stream config omits `buffer_size`.
pub const DEFAULT_BUFFER_SIZE: usize = 3;

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_enabled() -> bool {
    true
}

/// One configured channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// Unique slug, `[a-z0-9_-]+`.
    pub id: String,
    pub name: String,
    pub hls_input_url: String,
    pub multicast_group_ip: Ipv4Addr,
    pub multicast_port: u16,
    #[serde(default)]
    pub interface: Option<Ipv4Addr>,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl StreamConfig {
    /// Whether `id` is a valid slug per the external-interface contract.
    pub fn is_valid_id(id: &str) -> bool {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    }

    /// Validate this config well-formed enough to attempt `start_stream`.
    pub fn validate(&self) -> Result<(), String> {
        if !Self::is_valid_id(&self.id) {
            return Err(format!("invalid stream id '{}': must match [a-z0-9_-]+", self.id));
        }
        if !self.multicast_group_ip.is_multicast() {
            return Err(format!(
                "multicast_group_ip {} is not in 224.0.0.0/4",
                self.multicast_group_ip
            ));
        }
        if self.buffer_size == 0 {
            return Err("buffer_size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub worker_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub path: String,
    pub rotation_bytes: u64,
    pub max_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub file: FileLoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRetentionConfig {
    pub info_s: u64,
    pub warning_s: u64,
    pub error_s: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertsConfig {
    pub retention: AlertRetentionConfig,
}

/// Top-level configuration document, matching the external-interface schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub alerts: AlertsConfig,
    pub streams: Vec<StreamConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_multicast_destination() {
        let config = StreamConfig {
            id: "chan1".into(),
            name: "Channel 1".into(),
            hls_input_url: "http://example.com/live.m3u8".into(),
            multicast_group_ip: Ipv4Addr::new(192, 168, 1, 1),
            multicast_port: 1234,
            interface: None,
            buffer_size: 3,
            enabled: true,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_invalid_slug() {
        assert!(!StreamConfig::is_valid_id("Channel One"));
        assert!(StreamConfig::is_valid_id("channel-1_hd"));
    }
}
