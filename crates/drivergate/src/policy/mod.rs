//! Updatable driver precedence rules.
//!
//! [`choose_driver`] walks the settings layers from most to least
//! authoritative and names the driver image a process should load, or `None`
//! for the system driver. It only decides; the chosen package is validated
//! afterwards by [`crate::driver`].
//!
//! Precedence, highest first:
//!
//! 1. device-wide opt-in tier (`game_driver_all_apps`)
//! 2. opt-out list
//! 3. prerelease opt-in list
//! 4. opt-in list
//! 5. denylist
//! 6. allowlist

use serde::Serialize;
use tracing::debug;

use drivergate_config::{ConfigSnapshot, SettingKey};
use drivergate_packages::AppIdentity;

use crate::device::DeviceProfile;

const TARGET: &str = "drivergate::policy";

/// Device-wide opt-in tier for updatable drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptInTier {
    /// Per-app lists decide.
    #[default]
    Default,
    /// Every eligible app uses the game driver.
    AllGameDriver,
    /// Every eligible app uses the prerelease driver.
    AllPrereleaseDriver,
    /// Every app uses the system driver.
    Off,
}

impl OptInTier {
    /// Maps a raw setting value to a tier; unrecognised values mean
    /// [`OptInTier::Default`].
    #[must_use]
    pub const fn from_setting(value: i64) -> Self {
        match value {
            1 => Self::AllGameDriver,
            2 => Self::AllPrereleaseDriver,
            3 => Self::Off,
            _ => Self::Default,
        }
    }
}

/// Which of the device's updatable driver images was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// The production game driver image.
    GameDriver,
    /// The prerelease driver image.
    PrereleaseDriver,
}

/// Driver image picked by the precedence rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSelection {
    /// Which image was picked.
    pub kind: DriverKind,
    /// Package providing the image.
    pub package: String,
}

impl DriverSelection {
    fn game(package: &str) -> Self {
        Self {
            kind: DriverKind::GameDriver,
            package: package.to_owned(),
        }
    }

    fn prerelease(package: &str) -> Self {
        Self {
            kind: DriverKind::PrereleaseDriver,
            package: package.to_owned(),
        }
    }
}

/// Picks the updatable driver for `app`, or `None` for the system driver.
///
/// # Example
///
/// ```
/// use drivergate::{DeviceProfile, DriverKind, choose_driver};
/// use drivergate_config::{ConfigSnapshot, SettingKey, SettingsBundle};
/// use drivergate_packages::AppIdentity;
///
/// let bundle = SettingsBundle::new().with(SettingKey::GameDriverAllowlist, "*");
/// let config = ConfigSnapshot::from_bundle(&bundle);
/// let device = DeviceProfile::new(Some("com.vendor.gamedriver"), None, false);
///
/// let selection = choose_driver(&config, &device, &AppIdentity::new("com.example.game"))
///     .expect("allowlisted app gets the game driver");
/// assert_eq!(selection.kind, DriverKind::GameDriver);
/// ```
#[must_use]
pub fn choose_driver(
    config: &ConfigSnapshot,
    device: &DeviceProfile,
    app: &AppIdentity,
) -> Option<DriverSelection> {
    let game = device.game_driver();
    let prerelease = device.prerelease_driver();
    if game.is_none() && prerelease.is_none() {
        debug!(target: TARGET, "device ships no updatable driver");
        return None;
    }

    if app.is_pinned_to_system_driver() {
        debug!(
            target: TARGET,
            package = app.package_name(),
            privilege = %app.privilege(),
            "privileged or stock system app stays on the system driver"
        );
        return None;
    }

    let enable_prerelease = app.developer_driver_enabled() || device.debuggable();
    let pick_prerelease = || {
        prerelease
            .filter(|_| enable_prerelease)
            .map(DriverSelection::prerelease)
    };

    match OptInTier::from_setting(config.get_int(SettingKey::GameDriverAllApps, 0)) {
        OptInTier::Off => {
            debug!(target: TARGET, "updatable drivers turned off device-wide");
            return None;
        }
        OptInTier::AllGameDriver => {
            debug!(target: TARGET, "all apps opted in to the game driver");
            return game.map(DriverSelection::game);
        }
        OptInTier::AllPrereleaseDriver => {
            debug!(target: TARGET, "all apps opted in to the prerelease driver");
            return pick_prerelease();
        }
        OptInTier::Default => {}
    }

    let package = app.package_name();
    if config
        .get_list(SettingKey::GameDriverOptOutApps)
        .contains(package)
    {
        debug!(target: TARGET, package, "app opted out of updatable drivers");
        return None;
    }

    if config
        .get_list(SettingKey::GameDriverPrereleaseOptInApps)
        .contains(package)
    {
        debug!(target: TARGET, package, "app opted in to the prerelease driver");
        return pick_prerelease();
    }

    let Some(game_driver) = game else {
        debug!(target: TARGET, "device ships no game driver");
        return None;
    };

    let opted_in = config
        .get_list(SettingKey::GameDriverOptInApps)
        .contains(package);
    let allowlist = config.get_list(SettingKey::GameDriverAllowlist);
    if !opted_in && !allowlist.is_wildcard_all() && !allowlist.contains(package) {
        debug!(target: TARGET, package, "app is not on the game driver allowlist");
        return None;
    }

    if !opted_in
        && config
            .get_list(SettingKey::GameDriverDenylist)
            .contains(package)
    {
        debug!(target: TARGET, package, "app is on the game driver denylist");
        return None;
    }

    Some(DriverSelection::game(game_driver))
}
