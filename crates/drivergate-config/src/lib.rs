//! Shared configuration for the drivergate workspace.
//!
//! Two kinds of configuration live here. [`Config`] is the host tool's own
//! layered configuration, merged by `ortho_config` from defaults, an optional
//! TOML file, `DRIVERGATE_*` environment variables, and command-line flags.
//! The settings types ([`SettingKey`], [`SettingsBundle`],
//! [`ConfigSnapshot`], [`ListPolicy`]) model the device settings store that
//! the driver selection policy reads once per process launch.

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod keys;
mod lists;
mod logging;
mod snapshot;

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_filter_string, default_log_format,
};
pub use keys::SettingKey;
pub use lists::{LIST_DELIMITER, ListPolicy, WILDCARD_ALL};
pub use logging::{LogFormat, LogFormatParseError};
pub use snapshot::{ConfigSnapshot, SettingValue, SettingsBundle, SettingsError, SettingsProvider};

/// Host configuration for the drivergate binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DRIVERGATE")]
pub struct Config {
    /// Tracing filter expression, e.g. `info` or `drivergate=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
