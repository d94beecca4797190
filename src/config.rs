use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::limits::CounterMode;

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub files: FilesConfig,
    pub limits: LimitsConfig,
    pub counter: CounterConfig,
    pub simulated_work: Option<SimulatedWorkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections handled at the same time; further ones wait in the backlog.
    pub max_workers: usize,
    pub bind_attempts: u32,
    pub bind_retry_delay_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_workers: 1000,
            bind_attempts: 4,
            bind_retry_delay_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bind_retry_delay(&self) -> Duration {
        Duration::from_secs(self.bind_retry_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub root: PathBuf,
    pub allowed_extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("served"),
            allowed_extensions: [".html", ".htm", ".pdf", ".png"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub requests_per_second: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub synchronized: bool,
    /// Pause between read and write of an unsynchronized hit.
    pub race_delay_ms: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            synchronized: true,
            race_delay_ms: 0,
        }
    }
}

impl CounterConfig {
    pub fn mode(&self) -> CounterMode {
        if self.synchronized {
            CounterMode::Synchronized
        } else {
            CounterMode::Unsynchronized {
                delay: Duration::from_millis(self.race_delay_ms),
            }
        }
    }
}

/// Artificial pause between admission and reading the request, so that
/// concurrent connections overlap visibly.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct SimulatedWorkConfig {
    pub base_ms: u64,
    pub jitter_ms: u64,
}

impl Config {
    /// Loads defaults, the YAML file named by `WARDEN_CONFIG` if set, then
    /// `WARDEN_HOST`, `WARDEN_PORT`, `WARDEN_ROOT` and `WARDEN_RATE_LIMIT`.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(host) = std::env::var("WARDEN_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WARDEN_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("WARDEN_PORT={} is not a port number", port))?;
        }
        if let Some(root) = std::env::var_os("WARDEN_ROOT") {
            self.files.root = PathBuf::from(root);
        }
        if let Ok(limit) = std::env::var("WARDEN_RATE_LIMIT") {
            self.limits.requests_per_second = limit
                .parse()
                .with_context(|| format!("WARDEN_RATE_LIMIT={} is not a number", limit))?;
        }
        Ok(())
    }
}
