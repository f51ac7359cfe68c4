//! Monitor configuration.
//!
//! Configuration is layered:
//! - TOML file (`codestorm.toml`, `/etc/codestorm/codestorm.toml`,
//!   `~/.config/codestorm/codestorm.toml`, or an explicit path)
//! - Environment variables (`CODESTORM_<SECTION>__<KEY>`, e.g.
//!   `CODESTORM_CHANNEL__ORIGIN`)

use anyhow::{bail, Context, Result};
use codestorm_client::ChannelConfig;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file locations, searched in order.
const CONFIG_PATHS: [&str; 3] = [
    "codestorm.toml",
    "/etc/codestorm/codestorm.toml",
    "~/.config/codestorm/codestorm.toml",
];

/// Environment variable prefix.
const ENV_PREFIX: &str = "CODESTORM";

/// Monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Realtime channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Who to connect as and what to watch.
    #[serde(default)]
    pub session: SessionConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identity to authenticate as. Unset connects anonymously.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Contest topic to join once authenticated.
    #[serde(default)]
    pub contest_id: Option<String>,

    /// Route manifest (JSON) used to report the landing route.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Exporter port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9095
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `path`, or from the first default location
    /// that exists, with environment overrides applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path does not exist, or if the file or
    /// environment cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => find_default_config(),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = &file {
            tracing::debug!(path = %file.display(), "Loading config file");
            builder = builder.add_source(File::from(file.as_path()).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to load configuration")?;
        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Parse configuration from TOML text, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

fn find_default_config() -> Option<PathBuf> {
    CONFIG_PATHS.iter().find_map(|path| {
        let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
        expanded.exists().then_some(expanded)
    })
}
