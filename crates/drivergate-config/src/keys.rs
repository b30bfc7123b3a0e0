//! Recognised settings keys.
//!
//! The settings store is an untyped string map. Every key the selection
//! policy reads is enumerated here so snapshots only ever carry keys the
//! policy understands.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Settings keys consulted while choosing a graphics driver.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettingKey {
    /// Device-wide opt-in tier for updatable drivers.
    GameDriverAllApps,
    /// Packages that never use an updatable driver.
    GameDriverOptOutApps,
    /// Packages that opt in to the prerelease driver.
    GameDriverPrereleaseOptInApps,
    /// Packages that opt in to the game driver.
    GameDriverOptInApps,
    /// Packages excluded from the game driver unless opted in.
    GameDriverDenylist,
    /// Packages eligible for the game driver; `*` first means every package.
    GameDriverAllowlist,
    /// Packages that use ANGLE because its rules mention them.
    AngleAllowlist,
    /// When exactly `"1"`, every package is forced onto ANGLE.
    AngleGlDriverAllAngle,
    /// Package half of the per-app ANGLE developer override.
    AngleGlDriverSelectionPkgs,
    /// Value half of the per-app ANGLE developer override.
    AngleGlDriverSelectionValues,
    /// ANGLE package to load instead of the system one on debuggable builds.
    AngleDebugPackage,
    /// Non-zero enables GPU debug layers for [`SettingKey::GpuDebugApp`].
    EnableGpuDebugLayers,
    /// Package that receives GPU debug layers.
    GpuDebugApp,
    /// Colon-separated packages that ship debug layer libraries.
    GpuDebugLayerApp,
    /// Vulkan debug layer list forwarded to the loader.
    GpuDebugLayers,
    /// GLES debug layer list forwarded to the loader.
    GpuDebugLayersGles,
    /// When 1, a notice is shown while ANGLE is in use.
    ShowAngleInUseDialogBox,
}

impl SettingKey {
    /// Returns the settings-store name of the key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case(SettingKey::GameDriverAllApps, "game_driver_all_apps")]
    #[case(SettingKey::AngleGlDriverAllAngle, "angle_gl_driver_all_angle")]
    #[case(SettingKey::GpuDebugLayersGles, "gpu_debug_layers_gles")]
    fn keys_use_settings_store_names(#[case] key: SettingKey, #[case] name: &str) {
        assert_eq!(key.as_str(), name);
        assert_eq!(key.to_string(), name);
        assert_eq!(SettingKey::from_str(name).expect("key parses"), key);
    }

    #[test]
    fn unknown_names_are_not_keys() {
        assert!(SettingKey::from_str("window_animation_scale").is_err());
    }

    #[test]
    fn every_key_round_trips_through_its_name() {
        for key in SettingKey::iter() {
            assert_eq!(SettingKey::from_str(key.as_str()).ok(), Some(key));
        }
    }
}
