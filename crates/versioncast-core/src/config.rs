//! Configuration loading and typed config structures for versioncast.
//!
//! The configuration lives in `versioncast-config.yaml` in the working
//! directory. Every field has a default, so an empty file (or no file at
//! all) yields a working setup: a 250ms tick, the body template
//! `"body updated {version}"`, and a listener on `0.0.0.0:8080`.
//!
//! Configuration is read once at startup; there is no runtime reload.

use std::path::Path;

use serde::Deserialize;

use crate::source::VERSION_PLACEHOLDER;

/// Environment variable overriding [`ListenConfig::host`].
pub const HOST_ENV: &str = "VERSIONCAST_HOST";

/// Environment variable overriding [`ListenConfig::port`].
pub const PORT_ENV: &str = "VERSIONCAST_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersioncastConfig {
    /// Producer settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub listen: ListenConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VersioncastConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `VERSIONCAST_HOST` and `VERSIONCAST_PORT` override the listener
    /// address from the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.listen.apply_env_overrides();
        Ok(config)
    }

    fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects a document with no content; treat it as defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Check values that parse but cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the body template is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast.body_template.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "broadcast.body_template must not be empty".to_owned(),
            });
        }
        if !self.broadcast.body_template.contains(VERSION_PLACEHOLDER) {
            tracing::warn!(
                template = self.broadcast.body_template,
                "Body template has no {{version}} placeholder; every snapshot body will be identical"
            );
        }
        Ok(())
    }
}

/// Producer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Milliseconds between publishes. `0` publishes as fast as the
    /// runtime allows.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Body of the version-0 snapshot the cell starts with.
    #[serde(default = "default_initial_body")]
    pub initial_body: String,

    /// Template for every later body; `{version}` is substituted.
    #[serde(default = "default_body_template")]
    pub body_template: String,

    /// Stop after this many publishes (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            initial_body: default_initial_body(),
            body_template: default_body_template(),
            max_ticks: 0,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ListenConfig {
    /// `host:port` string suitable for parsing into a socket address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply `VERSIONCAST_HOST` / `VERSIONCAST_PORT` if set.
    ///
    /// An unparseable port is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(HOST_ENV) {
            self.host = host;
        }
        if let Ok(raw) = std::env::var(PORT_ENV) {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!(value = raw, error = %e, "Ignoring invalid {PORT_ENV}"),
            }
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    250
}

fn default_initial_body() -> String {
    "Hello hello!".to_owned()
}

fn default_body_template() -> String {
    "body updated {version}".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = VersioncastConfig::default();
        assert_eq!(config.broadcast.tick_interval_ms, 250);
        assert_eq!(config.broadcast.initial_body, "Hello hello!");
        assert_eq!(config.broadcast.body_template, "body updated {version}");
        assert_eq!(config.broadcast.max_ticks, 0);
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
broadcast:
  tick_interval_ms: 100
  initial_body: "boot"
  body_template: "v={version}"
  max_ticks: 10

listen:
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"
  json: true
"#;

        let config = VersioncastConfig::parse_without_env(yaml).unwrap();
        assert_eq!(config.broadcast.tick_interval_ms, 100);
        assert_eq!(config.broadcast.initial_body, "boot");
        assert_eq!(config.broadcast.body_template, "v={version}");
        assert_eq!(config.broadcast.max_ticks, 10);
        assert_eq!(config.listen.host, "127.0.0.1");
        assert_eq!(config.listen.port, 9090);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "broadcast:\n  tick_interval_ms: 0\n";
        let config = VersioncastConfig::parse_without_env(yaml).unwrap();

        assert_eq!(config.broadcast.tick_interval_ms, 0);
        // Everything else uses defaults
        assert_eq!(config.broadcast.initial_body, "Hello hello!");
        assert_eq!(config.listen.port, 8080);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = VersioncastConfig::parse_without_env("").unwrap();
        assert_eq!(config, VersioncastConfig::default());
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        let result = VersioncastConfig::parse_without_env("broadcast: [1, 2");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn validate_rejects_empty_template() {
        let mut config = VersioncastConfig::default();
        config.broadcast.body_template = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(VersioncastConfig::default().validate().is_ok());
    }

    #[test]
    fn listen_address_joins_host_and_port() {
        let listen = ListenConfig {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        };
        assert_eq!(listen.address(), "127.0.0.1:3000");
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("versioncast-config.yaml");
        if path.exists() {
            let config = VersioncastConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
