//! Service configuration
//!
//! Loaded from the TOML file named by `MEDCALC_CONFIG_PATH` (default `medcalc.toml`),
//! falling back to a built-in document when the file does not exist, then adjusted by
//! `MEDCALC_*` environment variables.

use medcalc_core::EvaluationLimits;
use medcalc_types::Locale;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "medcalc.toml";

const DEFAULT_CONFIG: &str = r#"[server]
host = "127.0.0.1"
port = 3000
[limits]
max_body_size_kb = 256
[evaluation]
max_expression_length = 10000
max_expression_depth = 50
[catalog]
include_builtins = true
[store]
max_records = 10000
[logging]
format = "json"
[locale]
default = "en"
"#;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_body_size_kb: default_max_body_size_kb() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct EvaluationConfig {
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,
    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_expression_length: default_max_expression_length(),
            max_expression_depth: default_max_expression_depth(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    /// Extra JSON definitions loaded after the built-ins
    pub definitions_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub include_builtins: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { definitions_path: None, include_builtins: true }
    }
}

/// Retention of calculation records; the oldest are dropped beyond `max_records`
#[derive(Deserialize, Debug, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_records: default_max_records() }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LocaleConfig {
    #[serde(rename = "default", default)]
    pub default_locale: Locale,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MedcalcConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

impl MedcalcConfig {
    /// Load the configuration file, or the built-in defaults when it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("MEDCALC_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config_str = match std::fs::read_to_string(&config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Configuration file '{}' not found. Using default configuration.",
                    config_path
                );
                DEFAULT_CONFIG.to_string()
            }
            Err(source) => return Err(ConfigError::Io { path: config_path, source }),
        };

        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    /// Apply `MEDCALC_*` environment overrides; unparsable values are ignored
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("MEDCALC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env::<u16>("MEDCALC_PORT") {
            self.server.port = port;
        }
        if let Ok(path) = std::env::var("MEDCALC_DEFINITIONS_PATH") {
            self.catalog.definitions_path = Some(PathBuf::from(path));
        }
        if let Some(format) = parse_env::<LogFormat>("MEDCALC_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(locale) = parse_env::<Locale>("MEDCALC_DEFAULT_LOCALE") {
            self.locale.default_locale = locale;
        }
        if let Some(depth) = parse_env::<usize>("MEDCALC_MAX_EXPRESSION_DEPTH") {
            self.evaluation.max_expression_depth = depth;
        }
        if let Some(max_records) = parse_env::<usize>("MEDCALC_MAX_RECORDS") {
            self.store.max_records = max_records;
        }

        info!(
            host = %self.server.host,
            port = self.server.port,
            locale = %self.locale.default_locale,
            "Configuration loaded"
        );
        self
    }

    pub fn evaluation_limits(&self) -> EvaluationLimits {
        EvaluationLimits {
            max_expression_length: self.evaluation.max_expression_length,
            max_expression_depth: self.evaluation.max_expression_depth,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.limits.max_body_size_kb.saturating_mul(1024)
    }
}

fn parse_env<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = name, value = %raw, error = %e, "Ignoring invalid environment override");
            None
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_body_size_kb() -> usize {
    256
}
fn default_max_expression_length() -> usize {
    medcalc_core::expression::DEFAULT_MAX_EXPRESSION_LENGTH
}
fn default_max_expression_depth() -> usize {
    medcalc_core::expression::DEFAULT_MAX_EXPRESSION_DEPTH
}
fn default_max_records() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}
