//! GPU statistics handed to the loader once per setup call.

use serde::{Deserialize, Serialize};

use drivergate_packages::{FEATURE_VULKAN_HARDWARE_VERSION, PackageInfoProvider};

/// Driver name recorded when no updatable driver is chosen.
pub const SYSTEM_DRIVER_NAME: &str = "system";

/// Encoded Vulkan 1.0 hardware version.
pub const VULKAN_1_0: u32 = 0x0040_0000;

/// Encoded Vulkan 1.1 hardware version.
pub const VULKAN_1_1: u32 = 0x0040_1000;

/// Which driver a process loads, and for which app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Driver package name, or `system`.
    pub driver_package: String,
    /// Driver version name; empty for the system driver.
    pub driver_version_name: String,
    /// Driver version code; 0 for the system driver.
    pub driver_version_code: i64,
    /// Driver build time in Unix seconds.
    pub driver_build_time: i64,
    /// Package of the app whose process is starting.
    pub app_package: String,
    /// Encoded Vulkan hardware version, or 0 when unknown.
    pub vulkan_version: u32,
}

impl TelemetryRecord {
    /// Builds the record emitted when the system driver is used.
    #[must_use]
    pub fn system(app_package: &str, build_time: i64, vulkan_version: u32) -> Self {
        Self {
            driver_package: SYSTEM_DRIVER_NAME.to_owned(),
            driver_version_name: String::new(),
            driver_version_code: 0,
            driver_build_time: build_time,
            app_package: app_package.to_owned(),
            vulkan_version,
        }
    }

    /// Returns `true` when the record describes the system driver.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.driver_package == SYSTEM_DRIVER_NAME
    }
}

/// Returns the highest Vulkan version the device declares, or 0.
#[must_use]
pub fn detect_vulkan_version<P>(packages: &P) -> u32
where
    P: PackageInfoProvider + ?Sized,
{
    [VULKAN_1_1, VULKAN_1_0]
        .into_iter()
        .find(|version| packages.has_system_feature(FEATURE_VULKAN_HARDWARE_VERSION, *version))
        .unwrap_or(0)
}
