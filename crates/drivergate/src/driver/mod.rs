//! Validation of the driver package picked by the precedence rules.
//!
//! A package named by a system property still has to prove it is usable: it
//! must be installed from the system image, target a platform level whose
//! drivers live in the sphal namespace, ship native code for the running
//! instruction set, and declare when it was built. Only the last check is
//! fatal; a trusted driver package without a build time is broken.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use drivergate_packages::{
    METADATA_DRIVER_BUILD_TIME, MatchScope, PackageInfoProvider, PrivilegeClass,
};

use crate::paths::{build_search_path, choose_abi, collect_helper_libraries};
use crate::policy::{DriverKind, DriverSelection};
use crate::setup::SetupError;
use crate::stats::TelemetryRecord;

const TARGET: &str = "drivergate::driver";

/// First platform level whose drivers are restricted to the sphal namespace.
pub const MIN_TARGET_SDK_VERSION: u32 = 26;

/// A validated updatable driver, ready to be handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDriver {
    /// Which image this is.
    pub kind: DriverKind,
    /// Driver package name.
    pub package: String,
    /// Extracted native library directory.
    pub native_library_dir: PathBuf,
    /// Installed archive path.
    pub source_dir: PathBuf,
    /// ABI matching the running instruction set.
    pub abi: String,
    /// Loader search path for the driver libraries.
    pub search_path: String,
    /// Colon-separated vendor libraries the driver needs.
    pub sphal_libraries: String,
    /// Build time from the manifest, in Unix seconds.
    pub build_time: i64,
    /// Human-readable version.
    pub version_name: String,
    /// Version code.
    pub version_code: i64,
}

impl ResolvedDriver {
    /// Builds the statistics record for `app_package` using this driver.
    #[must_use]
    pub fn telemetry_record(&self, app_package: &str) -> TelemetryRecord {
        TelemetryRecord {
            driver_package: self.package.clone(),
            driver_version_name: self.version_name.clone(),
            driver_version_code: self.version_code,
            driver_build_time: self.build_time,
            app_package: app_package.to_owned(),
            vulkan_version: 0,
        }
    }
}

/// Parses a manifest build time in `L<unix-seconds>` form.
///
/// The first character is a type marker and is skipped without inspection.
///
/// # Errors
///
/// Returns [`SetupError::DriverMetadata`] when the value is missing, empty,
/// or not an integer after the marker.
pub fn parse_build_time(package: &str, raw: Option<&str>) -> Result<i64, SetupError> {
    let value = raw
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SetupError::DriverMetadata {
            package: package.to_owned(),
            message: format!("{METADATA_DRIVER_BUILD_TIME} is not set"),
        })?;
    let mut chars = value.chars();
    chars.next();
    chars
        .as_str()
        .parse::<i64>()
        .map_err(|error| SetupError::DriverMetadata {
            package: package.to_owned(),
            message: format!("{METADATA_DRIVER_BUILD_TIME} '{value}' is malformed: {error}"),
        })
}

/// Validates `selection` and resolves its install metadata.
///
/// Returns `Ok(None)` when the package is unusable and the system driver
/// should be used instead.
///
/// # Errors
///
/// Returns [`SetupError::DriverMetadata`] when the package passes every other
/// check but its build time is missing or malformed.
pub fn resolve_driver<P>(
    packages: &P,
    selection: &DriverSelection,
    instruction_set: &str,
) -> Result<Option<ResolvedDriver>, SetupError>
where
    P: PackageInfoProvider + ?Sized,
{
    let package = selection.package.as_str();
    let info = match packages.package_info(package, MatchScope::SystemOnly) {
        Ok(info) => info,
        Err(error) => {
            warn!(target: TARGET, package, %error, "driver package not installed");
            return Ok(None);
        }
    };
    let application = info.application();

    if application.target_sdk_version() < MIN_TARGET_SDK_VERSION {
        debug!(
            target: TARGET,
            package,
            target_sdk_version = application.target_sdk_version(),
            "driver package predates the sphal namespace"
        );
        return Ok(None);
    }

    let Some(abi) = choose_abi(application, instruction_set) else {
        // The stock pre-installed driver package ships no native code.
        if application.privilege() == PrivilegeClass::UpdatedSystem {
            warn!(
                target: TARGET,
                package,
                instruction_set,
                "updated driver package has no compatible native libraries"
            );
        }
        return Ok(None);
    };

    let build_time = parse_build_time(
        package,
        application.metadata().get_string(METADATA_DRIVER_BUILD_TIME),
    )?;
    let search_path = build_search_path(application, abi);
    let sphal_libraries = collect_helper_libraries(packages, package);
    debug!(
        target: TARGET,
        package,
        search_path = %search_path,
        sphal_libraries = %sphal_libraries,
        "resolved driver package"
    );

    Ok(Some(ResolvedDriver {
        kind: selection.kind,
        package: package.to_owned(),
        native_library_dir: application.native_library_dir().to_path_buf(),
        source_dir: application.source_dir().to_path_buf(),
        abi: abi.to_owned(),
        search_path,
        sphal_libraries,
        build_time,
        version_name: info.version_name().to_owned(),
        version_code: info.version_code(),
    }))
}
