//! Read-only settings view for a single setup call.
//!
//! Settings arrive either from a live [`SettingsProvider`] or from a
//! pre-fetched [`SettingsBundle`]. Both are flattened into a
//! [`ConfigSnapshot`] keyed by [`SettingKey`] so that policy code never learns
//! which source was used.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::warn;

use crate::keys::SettingKey;
use crate::lists::ListPolicy;

/// Errors raised by a live settings source.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// The settings store could not be queried.
    #[error("failed to read setting '{key}': {message}")]
    Unavailable {
        /// Key being read.
        key: SettingKey,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },
}

/// Live settings store queried once per key while building a snapshot.
pub trait SettingsProvider {
    /// Returns the raw value stored under `key`, or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Unavailable`] when the store cannot be read.
    fn get_string(&self, key: SettingKey) -> Result<Option<String>, SettingsError>;
}

impl<T> SettingsProvider for &T
where
    T: SettingsProvider + ?Sized,
{
    fn get_string(&self, key: SettingKey) -> Result<Option<String>, SettingsError> {
        (**self).get_string(key)
    }
}

/// A single value inside a pre-fetched bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Integer value.
    Int(i64),
    /// String value, including delimited lists.
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Text(value) => formatter.write_str(value),
        }
    }
}

/// Pre-fetched settings handed to setup by the process launcher.
///
/// Keys are kept as raw strings; unknown keys are ignored when the bundle is
/// turned into a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SettingsBundle {
    values: BTreeMap<String, SettingValue>,
}

impl SettingsBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: SettingKey, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn insert(&mut self, key: SettingKey, value: impl Into<SettingValue>) {
        self.values.insert(key.as_str().to_owned(), value.into());
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: SettingKey) -> Option<&SettingValue> {
        self.values.get(key.as_str())
    }

    /// Returns the number of stored values, recognised or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the bundle holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Immutable, source-independent view of the recognised settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    values: BTreeMap<SettingKey, String>,
}

impl ConfigSnapshot {
    /// Reads every recognised key from a live provider.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] reported by the provider. No
    /// partial snapshot is produced.
    pub fn from_provider<P>(provider: &P) -> Result<Self, SettingsError>
    where
        P: SettingsProvider + ?Sized,
    {
        let mut values = BTreeMap::new();
        for key in SettingKey::iter() {
            if let Some(value) = provider.get_string(key)? {
                values.insert(key, value);
            }
        }
        Ok(Self { values })
    }

    /// Copies the recognised keys out of a pre-fetched bundle.
    #[must_use]
    pub fn from_bundle(bundle: &SettingsBundle) -> Self {
        let values = SettingKey::iter()
            .filter_map(|key| bundle.get(key).map(|value| (key, value.to_string())))
            .collect();
        Self { values }
    }

    /// Returns the raw string stored under `key`.
    #[must_use]
    pub fn get_string(&self, key: SettingKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Returns the integer stored under `key`, or `default` when the key is
    /// unset or its value does not parse.
    #[must_use]
    pub fn get_int(&self, key: SettingKey, default: i64) -> i64 {
        let Some(raw) = self.get_string(key) else {
            return default;
        };
        raw.trim().parse::<i64>().unwrap_or_else(|error| {
            warn!(
                target: "drivergate::settings",
                key = %key,
                value = raw,
                %error,
                "ignoring unparsable integer setting"
            );
            default
        })
    }

    /// Returns the comma-delimited list stored under `key`.
    #[must_use]
    pub fn get_list(&self, key: SettingKey) -> ListPolicy {
        ListPolicy::parse(self.get_string(key))
    }
}

impl SettingsProvider for SettingsBundle {
    fn get_string(&self, key: SettingKey) -> Result<Option<String>, SettingsError> {
        Ok(self.get(key).map(SettingValue::to_string))
    }
}
