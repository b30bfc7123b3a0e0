//! ANGLE arbitration.
//!
//! Decides whether a process should render GLES through ANGLE, finds the
//! package providing ANGLE, and hands its library path and rules file to the
//! loader. Every failure here is recoverable: setup simply moves on to the
//! updatable driver rules.

mod notice;

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use drivergate_config::{ConfigSnapshot, SettingKey};
use drivergate_packages::{
    ACTION_ANGLE_FOR_ANDROID, ApplicationInfo, AssetDescriptor, MatchScope, PackageError,
    PackageInfoProvider,
};

use crate::device::{PROPERTY_ANGLE_TEMP_RULES, SystemProperties};
use crate::loader::NativeLoader;
use crate::paths::{build_search_path, choose_abi};

pub use notice::{InUseNotifier, NoticeError};

const TARGET: &str = "drivergate::angle";

/// Rules asset shipped inside the ANGLE package.
pub const ANGLE_RULES_ASSET: &str = "a4a_rules.json";

/// Value of `angle_gl_driver_all_angle` that forces every app onto ANGLE.
pub const FORCE_ALL_ANGLE: &str = "1";

/// Per-app GLES driver override values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AngleDriverChoice {
    /// No override; rules decide.
    #[default]
    Default,
    /// Always use the native GLES driver.
    Native,
    /// Always use ANGLE.
    Angle,
}

impl AngleDriverChoice {
    /// Returns the settings value for the choice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Native => "native",
            Self::Angle => "angle",
        }
    }
}

/// Where the ANGLE rules handed to the loader came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RulesSource {
    /// Developer-supplied file named by `debug.angle.rules`.
    TemporaryFile {
        /// File path.
        path: PathBuf,
    },
    /// Rules asset packaged inside the ANGLE package.
    Packaged,
}

/// Outcome of a successful ANGLE setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AngleSelection {
    /// Package providing ANGLE.
    pub package: String,
    /// ABI of the ANGLE libraries.
    pub abi: String,
    /// Loader search path for the ANGLE libraries.
    pub search_path: String,
    /// Per-app override value handed to the loader.
    pub override_value: String,
    /// Origin of the rules handed to the loader.
    pub rules: RulesSource,
}

/// Reasons ANGLE could not be set up for a process that asked for it.
#[derive(Debug, Clone, Error)]
pub enum AngleSetupError {
    /// The debug package named in settings is not installed.
    #[error("ANGLE debug package '{package}' not installed: {source}")]
    DebugPackageMissing {
        /// Package named by `angle_debug_package`.
        package: String,
        /// Lookup failure.
        #[source]
        source: PackageError,
    },
    /// The system does not have exactly one ANGLE package.
    #[error("expected exactly one ANGLE package, found {}", .found.len())]
    PackageCount {
        /// Every system package handling the ANGLE action.
        found: Vec<String>,
    },
    /// Querying handlers of the ANGLE action failed.
    #[error("failed to query ANGLE packages: {source}")]
    HandlerQuery {
        /// Lookup failure.
        #[source]
        source: PackageError,
    },
    /// The ANGLE package vanished between discovery and lookup.
    #[error("ANGLE package '{package}' not installed: {source}")]
    PackageMissing {
        /// Package handling the ANGLE action.
        package: String,
        /// Lookup failure.
        #[source]
        source: PackageError,
    },
    /// The ANGLE package has no libraries for the running instruction set.
    #[error("ANGLE package '{package}' has no libraries for {instruction_set}")]
    NoCompatibleAbi {
        /// ANGLE package.
        package: String,
        /// Instruction set of the process.
        instruction_set: String,
    },
    /// Neither a temporary nor a packaged rules file could be opened.
    #[error("no ANGLE rules available from '{package}'")]
    RulesUnavailable {
        /// ANGLE package.
        package: String,
    },
}

/// Returns the GLES driver override recorded for `package`.
///
/// The force-all flag wins over per-app values. Per-app values are stored as
/// two parallel lists correlated by index; lists of different lengths are
/// treated as corrupt and every package reads as `default`.
#[must_use]
pub fn resolve_override(config: &ConfigSnapshot, package: &str) -> String {
    if config.get_string(SettingKey::AngleGlDriverAllAngle) == Some(FORCE_ALL_ANGLE) {
        return AngleDriverChoice::Angle.as_str().to_owned();
    }

    let packages = config.get_list(SettingKey::AngleGlDriverSelectionPkgs);
    let values = config.get_list(SettingKey::AngleGlDriverSelectionValues);
    let default = AngleDriverChoice::Default.as_str();
    if package.is_empty() {
        return default.to_owned();
    }
    if packages.len() != values.len() {
        warn!(
            target: TARGET,
            packages = packages.len(),
            values = values.len(),
            "ANGLE override lists differ in length"
        );
        return default.to_owned();
    }

    packages
        .index_of(package)
        .and_then(|index| values.get(index))
        .unwrap_or(default)
        .to_owned()
}

/// Returns `true` when `package` is on the ANGLE allowlist or its override
/// asks for ANGLE.
#[must_use]
pub fn should_use_backend(config: &ConfigSnapshot, package: &str) -> bool {
    if package.is_empty() {
        debug!(target: TARGET, "no package name yet; ANGLE not used");
        return false;
    }

    let override_value = resolve_override(config, package);
    let allowlisted = config.get_list(SettingKey::AngleAllowlist).contains(package);
    let requested = override_value == AngleDriverChoice::Angle.as_str();
    if allowlisted {
        debug!(target: TARGET, package, "ANGLE allowlist includes package");
    }
    if requested {
        debug!(target: TARGET, package, override_value = %override_value, "ANGLE requested by override");
    }
    allowlisted || requested
}

/// Locates ANGLE and hands it to the loader.
pub struct BackendSelector<'a, P: ?Sized, L: ?Sized, S: ?Sized> {
    packages: &'a P,
    loader: &'a L,
    properties: &'a S,
    instruction_set: &'a str,
}

impl<'a, P, L, S> BackendSelector<'a, P, L, S>
where
    P: PackageInfoProvider + ?Sized,
    L: NativeLoader + ?Sized,
    S: SystemProperties + ?Sized,
{
    /// Creates a selector over the given collaborators.
    #[must_use]
    pub const fn new(
        packages: &'a P,
        loader: &'a L,
        properties: &'a S,
        instruction_set: &'a str,
    ) -> Self {
        Self {
            packages,
            loader,
            properties,
            instruction_set,
        }
    }

    /// Sets up ANGLE for `package` when settings ask for it.
    ///
    /// Returns `Ok(None)` when ANGLE is not wanted.
    ///
    /// # Errors
    ///
    /// Returns an [`AngleSetupError`] when ANGLE is wanted but its package or
    /// rules cannot be found.
    pub fn setup(
        &self,
        config: &ConfigSnapshot,
        package: &str,
    ) -> Result<Option<AngleSelection>, AngleSetupError> {
        if !should_use_backend(config, package) {
            return Ok(None);
        }

        let angle_info = self.locate_package(config)?;
        let angle_package = angle_info.package_name();
        let abi = choose_abi(&angle_info, self.instruction_set).ok_or_else(|| {
            AngleSetupError::NoCompatibleAbi {
                package: angle_package.to_owned(),
                instruction_set: self.instruction_set.to_owned(),
            }
        })?;
        let search_path = build_search_path(&angle_info, abi);
        let override_value = resolve_override(config, package);
        debug!(target: TARGET, angle_package, search_path = %search_path, "ANGLE package libraries");

        let handoff = Handoff {
            search_path: &search_path,
            app_package: package,
            override_value: &override_value,
        };
        let rules = self
            .hand_over_temporary_rules(&handoff)
            .or_else(|| self.hand_over_packaged_rules(angle_package, &handoff))
            .ok_or_else(|| AngleSetupError::RulesUnavailable {
                package: angle_package.to_owned(),
            })?;

        Ok(Some(AngleSelection {
            package: angle_package.to_owned(),
            abi: abi.to_owned(),
            search_path,
            override_value,
            rules,
        }))
    }

    /// Finds the ANGLE package: the debug package on debuggable builds, or
    /// the single system package handling the ANGLE action.
    ///
    /// # Errors
    ///
    /// Returns an [`AngleSetupError`] when the named debug package is missing
    /// or the system ANGLE package is missing or ambiguous.
    pub fn locate_package(
        &self,
        config: &ConfigSnapshot,
    ) -> Result<ApplicationInfo, AngleSetupError> {
        if let Some(debug_package) = self.debug_package(config) {
            info!(target: TARGET, package = debug_package, "ANGLE debug package enabled");
            // The debug package need not be pre-installed.
            return self
                .packages
                .application_info(debug_package, MatchScope::Any)
                .map_err(|source| AngleSetupError::DebugPackageMissing {
                    package: debug_package.to_owned(),
                    source,
                });
        }

        let angle_package = self.system_package_name()?;
        info!(target: TARGET, package = %angle_package, "ANGLE package enabled");
        self.packages
            .application_info(&angle_package, MatchScope::SystemOnly)
            .map_err(|source| AngleSetupError::PackageMissing {
                package: angle_package.clone(),
                source,
            })
    }

    /// Returns the single system package handling the ANGLE action.
    ///
    /// # Errors
    ///
    /// Returns [`AngleSetupError::PackageCount`] unless exactly one package
    /// matches, or [`AngleSetupError::HandlerQuery`] if the query fails.
    pub fn system_package_name(&self) -> Result<String, AngleSetupError> {
        let found = self
            .packages
            .packages_handling(ACTION_ANGLE_FOR_ANDROID, MatchScope::SystemOnly)
            .map_err(|source| AngleSetupError::HandlerQuery { source })?;
        if let [only] = found.as_slice() {
            return Ok(only.clone());
        }
        for candidate in &found {
            error!(target: TARGET, package = %candidate, "found ANGLE package");
        }
        Err(AngleSetupError::PackageCount { found })
    }

    fn debug_package<'c>(&self, config: &'c ConfigSnapshot) -> Option<&'c str> {
        if !self.loader.is_debuggable() {
            return None;
        }
        config
            .get_string(SettingKey::AngleDebugPackage)
            .filter(|name| !name.is_empty())
    }

    fn hand_over_temporary_rules(&self, handoff: &Handoff<'_>) -> Option<RulesSource> {
        if !self.loader.is_debuggable() {
            debug!(target: TARGET, "skipping temporary rules file");
            return None;
        }
        let Some(raw_path) = self
            .properties
            .get(PROPERTY_ANGLE_TEMP_RULES)
            .filter(|value| !value.is_empty())
        else {
            debug!(
                target: TARGET,
                property = PROPERTY_ANGLE_TEMP_RULES,
                "temporary rules property unset"
            );
            return None;
        };

        let path = Path::new(&raw_path);
        if !path.exists() {
            return None;
        }
        info!(target: TARGET, path = %path.display(), "loading temporary ANGLE rules");
        AssetDescriptor::open(path)
            .inspect_err(|error| {
                warn!(
                    target: TARGET,
                    path = %path.display(),
                    %error,
                    "temporary rules file unreadable"
                );
            })
            .ok()
            .map(|rules| {
                handoff.apply(self.loader, &rules);
                RulesSource::TemporaryFile {
                    path: path.to_path_buf(),
                }
            })
    }

    fn hand_over_packaged_rules(
        &self,
        angle_package: &str,
        handoff: &Handoff<'_>,
    ) -> Option<RulesSource> {
        self.packages
            .open_asset(angle_package, ANGLE_RULES_ASSET)
            .inspect_err(|error| {
                warn!(
                    target: TARGET,
                    package = angle_package,
                    asset = ANGLE_RULES_ASSET,
                    %error,
                    "failed to open packaged ANGLE rules"
                );
            })
            .ok()
            .map(|rules| {
                handoff.apply(self.loader, &rules);
                RulesSource::Packaged
            })
    }
}

struct Handoff<'a> {
    search_path: &'a str,
    app_package: &'a str,
    override_value: &'a str,
}

impl Handoff<'_> {
    fn apply<L: NativeLoader + ?Sized>(&self, loader: &L, rules: &AssetDescriptor) {
        loader.set_angle_info(
            self.search_path,
            self.app_package,
            self.override_value,
            rules,
        );
    }
}

#[cfg(test)]
mod tests;
