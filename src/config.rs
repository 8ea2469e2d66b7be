use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::labels::DEFAULT_LABEL_PREFIX;

/// Top-level configuration for the exporter.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listen address for the metrics server. Default: ":9112".
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// HTTP path serving the exposition format. Default: "/metrics".
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Mount point of procfs. Default: "/proc".
    #[serde(default = "default_proc_path")]
    pub proc_path: String,

    /// Also read `net/tcp6`. Default: false.
    #[serde(default)]
    pub include_ipv6: bool,

    /// Append "_total" to the exported family names. Default: false.
    #[serde(default)]
    pub total_suffix: bool,

    /// Environment variable prefix for static label dimensions.
    /// Default: "EXPORTER_LABEL_".
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
}

// --- Default value functions ---

fn default_listen_addr() -> String {
    ":9112".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_proc_path() -> String {
    "/proc".to_string()
}

fn default_label_prefix() -> String {
    DEFAULT_LABEL_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            metrics_path: default_metrics_path(),
            proc_path: default_proc_path(),
            include_ipv6: false,
            total_suffix: false,
            label_prefix: default_label_prefix(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            bail!("listen_addr is required");
        }

        if !self.metrics_path.starts_with('/') {
            bail!("metrics_path must start with '/': {}", self.metrics_path);
        }

        if self.metrics_path == "/healthz" {
            bail!("metrics_path must not shadow /healthz");
        }

        if self.proc_path.is_empty() {
            bail!("proc_path is required");
        }

        if self.label_prefix.is_empty() {
            bail!("label_prefix must not be empty");
        }

        Ok(())
    }

    /// Replace the port of `listen_addr`, keeping its host part.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.listen_addr.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.listen_addr.as_str(),
        };
        let addr = format!("{host}:{port}");
        self.listen_addr = addr;
    }

    /// Family name settings for the collector.
    pub fn collector(&self) -> CollectorConfig {
        CollectorConfig {
            total_suffix: self.total_suffix,
        }
    }
}

/// Settings that shape the exported metric families.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectorConfig {
    pub total_suffix: bool,
}

impl CollectorConfig {
    pub fn connections_name(&self) -> String {
        self.family_name("tcp_connections")
    }

    pub fn listening_name(&self) -> String {
        self.family_name("tcp_listening_ports")
    }

    fn family_name(&self, base: &str) -> String {
        if self.total_suffix {
            format!("{base}_total")
        } else {
            base.to_string()
        }
    }
}
