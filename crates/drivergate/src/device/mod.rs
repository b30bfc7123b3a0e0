//! Device-level facts read from system properties.
//!
//! Which updatable driver images the device ships, and where a developer has
//! placed a temporary ANGLE rules file, are published as read-only system
//! properties. The [`SystemProperties`] trait abstracts the property store so
//! tests can supply fixed values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Property naming the game driver package shipped with the device.
pub const PROPERTY_GFX_DRIVER: &str = "ro.gfx.driver.0";

/// Property naming the prerelease driver package shipped with the device.
pub const PROPERTY_GFX_DRIVER_PRERELEASE: &str = "ro.gfx.driver.1";

/// Property recording when the system driver was built, in Unix seconds.
pub const PROPERTY_GFX_DRIVER_BUILD_TIME: &str = "ro.gfx.driver_build_time";

/// Property pointing at a temporary ANGLE rules file on debuggable builds.
pub const PROPERTY_ANGLE_TEMP_RULES: &str = "debug.angle.rules";

/// Read-only system property store.
pub trait SystemProperties {
    /// Returns the value of `name`, or `None` when unset.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns `name` parsed as an integer, or `default` when unset or
    /// unparsable.
    fn get_long(&self, name: &str, default: i64) -> i64 {
        let Some(raw) = self.get(name) else {
            return default;
        };
        raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                target: "drivergate::device",
                property = name,
                value = %raw,
                "ignoring unparsable integer property"
            );
            default
        })
    }
}

impl<T> SystemProperties for &T
where
    T: SystemProperties + ?Sized,
{
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// Fixed property values, as loaded from a dry-run scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticProperties {
    values: BTreeMap<String, String>,
}

impl StaticProperties {
    /// Creates an empty property store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SystemProperties for StaticProperties {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Driver images and debug state of the device, read once per setup call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    game_driver: Option<String>,
    prerelease_driver: Option<String>,
    debuggable: bool,
}

impl DeviceProfile {
    /// Reads driver image properties; empty values count as absent.
    #[must_use]
    pub fn probe<S>(properties: &S, debuggable: bool) -> Self
    where
        S: SystemProperties + ?Sized,
    {
        let non_empty = |name: &str| properties.get(name).filter(|value| !value.is_empty());
        Self {
            game_driver: non_empty(PROPERTY_GFX_DRIVER),
            prerelease_driver: non_empty(PROPERTY_GFX_DRIVER_PRERELEASE),
            debuggable,
        }
    }

    /// Builds a profile from explicit values.
    #[must_use]
    pub fn new(
        game_driver: Option<&str>,
        prerelease_driver: Option<&str>,
        debuggable: bool,
    ) -> Self {
        Self {
            game_driver: game_driver.map(str::to_owned),
            prerelease_driver: prerelease_driver.map(str::to_owned),
            debuggable,
        }
    }

    /// Returns the game driver package name, if the device ships one.
    #[must_use]
    pub fn game_driver(&self) -> Option<&str> {
        self.game_driver.as_deref()
    }

    /// Returns the prerelease driver package name, if the device ships one.
    #[must_use]
    pub fn prerelease_driver(&self) -> Option<&str> {
        self.prerelease_driver.as_deref()
    }

    /// Returns `true` when the process may load debug code.
    #[must_use]
    pub const fn debuggable(&self) -> bool {
        self.debuggable
    }
}
