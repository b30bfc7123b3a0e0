//! Package metadata lookup boundary.
//!
//! The [`PackageInfoProvider`] trait is the only way the selection engine
//! learns about installed packages. Production hosts wrap their package
//! service; tests and the dry-run binary use the in-memory
//! [`PackageRegistry`](crate::PackageRegistry).

use serde::{Deserialize, Serialize};

use crate::asset::AssetDescriptor;
use crate::error::PackageError;
use crate::info::{ApplicationInfo, PackageInfo};

/// Intent action handled by the system ANGLE package.
pub const ACTION_ANGLE_FOR_ANDROID: &str = "android.app.action.ANGLE_FOR_ANDROID";

/// System feature advertising the Vulkan hardware version.
pub const FEATURE_VULKAN_HARDWARE_VERSION: &str = "android.hardware.vulkan.version";

/// Which installed packages a lookup may match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    /// Any installed package.
    #[default]
    Any,
    /// Only packages shipped on the system image, updated or not.
    SystemOnly,
}

/// Trait abstracting package metadata queries for testability.
///
/// Every call is synchronous and fallible. Callers treat
/// [`PackageError::is_not_found`] failures as "package unavailable" and move
/// on to their next fallback.
///
/// # Example
///
/// ```
/// use drivergate_packages::{
///     ApplicationInfo, AssetDescriptor, MatchScope, PackageError, PackageInfo,
///     PackageInfoProvider,
/// };
///
/// struct NothingInstalled;
///
/// impl PackageInfoProvider for NothingInstalled {
///     fn application_info(
///         &self,
///         package: &str,
///         _scope: MatchScope,
///     ) -> Result<ApplicationInfo, PackageError> {
///         Err(PackageError::NotFound { name: package.to_owned() })
///     }
///
///     fn package_info(&self, package: &str, _scope: MatchScope) -> Result<PackageInfo, PackageError> {
///         Err(PackageError::NotFound { name: package.to_owned() })
///     }
///
///     fn packages_handling(
///         &self,
///         _action: &str,
///         _scope: MatchScope,
///     ) -> Result<Vec<String>, PackageError> {
///         Ok(Vec::new())
///     }
///
///     fn open_asset(&self, package: &str, asset: &str) -> Result<AssetDescriptor, PackageError> {
///         Err(PackageError::AssetNotFound { package: package.to_owned(), asset: asset.to_owned() })
///     }
///
///     fn has_system_feature(&self, _feature: &str, _version: u32) -> bool {
///         false
///     }
/// }
///
/// assert!(NothingInstalled.application_info("a", MatchScope::Any).is_err());
/// ```
pub trait PackageInfoProvider {
    /// Returns install metadata, including manifest metadata, for `package`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::NotFound`] if no package matches in `scope`.
    fn application_info(
        &self,
        package: &str,
        scope: MatchScope,
    ) -> Result<ApplicationInfo, PackageError>;

    /// Returns install metadata plus version information for `package`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::NotFound`] if no package matches in `scope`.
    fn package_info(&self, package: &str, scope: MatchScope) -> Result<PackageInfo, PackageError>;

    /// Returns the names of packages declaring a handler for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Lookup`] if the package service cannot answer.
    fn packages_handling(&self, action: &str, scope: MatchScope)
    -> Result<Vec<String>, PackageError>;

    /// Opens a named asset shipped inside `package`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::AssetNotFound`] if the package does not ship
    /// the asset, or [`PackageError::Io`] if it cannot be opened.
    fn open_asset(&self, package: &str, asset: &str) -> Result<AssetDescriptor, PackageError>;

    /// Returns `true` if the device declares `feature` at `version` or newer.
    fn has_system_feature(&self, feature: &str, version: u32) -> bool;
}

impl<T> PackageInfoProvider for &T
where
    T: PackageInfoProvider + ?Sized,
{
    fn application_info(
        &self,
        package: &str,
        scope: MatchScope,
    ) -> Result<ApplicationInfo, PackageError> {
        (**self).application_info(package, scope)
    }

    fn package_info(&self, package: &str, scope: MatchScope) -> Result<PackageInfo, PackageError> {
        (**self).package_info(package, scope)
    }

    fn packages_handling(
        &self,
        action: &str,
        scope: MatchScope,
    ) -> Result<Vec<String>, PackageError> {
        (**self).packages_handling(action, scope)
    }

    fn open_asset(&self, package: &str, asset: &str) -> Result<AssetDescriptor, PackageError> {
        (**self).open_asset(package, asset)
    }

    fn has_system_feature(&self, feature: &str, version: u32) -> bool {
        (**self).has_system_feature(feature, version)
    }
}
