//! Configuration loading shared by rowcast components

use config::{Config, ConfigError, Environment, File};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Load a typed configuration section.
///
/// Layering: type defaults, then `ROWCAST__`-prefixed environment variables,
/// then the file at `path` when it exists.
pub fn load<T>(path: impl AsRef<Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Serialize + Default,
{
    let mut builder = Config::builder()
        .add_source(Config::try_from(&T::default())?)
        .add_source(Environment::with_prefix("ROWCAST").separator("__"));

    if path.as_ref().exists() {
        builder = builder.add_source(File::from(path.as_ref()));
    }

    builder.build()?.try_deserialize()
}
