use config::{
    builder::DefaultState, Config as RawConfig, ConfigError, Environment, File, Value, ValueKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Environment variable prefix (`KDISC_DISCOVERY__TYPE`, ...)
const ENV_PREFIX: &str = "KDISC";

/// Immutable configuration bundle handed to discovery backends.
///
/// Keys are dotted paths (`discovery.type`, `cloud.kubernetes.namespace`).
/// Cloning is cheap; every clone observes the same values.
#[derive(Debug, Clone)]
pub struct Settings {
    inner: Arc<RawConfig>,
}

impl Settings {
    /// Load settings from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided and present)
    /// 3. Option defaults (applied at read time)
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        Self::layered(config_file, environment())
    }

    fn layered(config_file: Option<&str>, env: Environment) -> Result<Self> {
        let mut builder = RawConfig::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        Ok(Self::from_config(builder.add_source(env).build()?))
    }

    /// Start an in-memory bundle, for hosts that assemble settings themselves
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder {
            inner: RawConfig::builder(),
        }
    }

    /// Build a bundle from `(key, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .try_fold(Self::builder(), |builder, (key, value)| builder.set(key, value))?
            .build()
    }

    #[must_use]
    pub fn from_config(config: RawConfig) -> Self {
        Self {
            inner: Arc::new(config),
        }
    }

    /// Raw text value of `key`.
    ///
    /// Absent keys and keys written without a value (YAML `key:`) yield
    /// `Ok(None)`. A value that cannot be read as text (a table or an array)
    /// is a malformed bundle and is returned as an error.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = match self.inner.get::<Value>(key) {
            Ok(value) => value,
            Err(ConfigError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match value.kind {
            ValueKind::Nil => Ok(None),
            ValueKind::Table(_) | ValueKind::Array(_) => Err(ConfigError::Message(format!(
                "expected text for key '{key}', found {value}"
            ))
            .into()),
            _ => Ok(Some(value.into_string()?)),
        }
    }

    /// Logging section (`logging.level`, `logging.format`, `logging.file_path`)
    pub fn logging(&self) -> Result<LoggingConfig> {
        match self.inner.get::<LoggingConfig>("logging") {
            Ok(logging) => Ok(logging),
            Err(ConfigError::NotFound(_)) => Ok(LoggingConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `KDISC_CLOUD__KUBERNETES__SERVICE_NAME` -> `cloud.kubernetes.service_name`
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Builder for in-memory [`Settings`]
pub struct SettingsBuilder {
    inner: config::ConfigBuilder<DefaultState>,
}

impl SettingsBuilder {
    /// Set `key` to `value`, replacing any earlier value
    pub fn set<K, V>(self, key: K, value: V) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        Ok(Self {
            inner: self.inner.set_override(key, value)?,
        })
    }

    pub fn build(self) -> Result<Settings> {
        Ok(Settings::from_config(self.inner.build()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}
