//! In-memory package registry.
//!
//! The [`PackageRegistry`] stores validated package records keyed by name and
//! answers [`PackageInfoProvider`] queries from them. Duplicate registrations
//! for the same package name are rejected. It backs the dry-run binary and the
//! behaviour tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset::AssetDescriptor;
use crate::error::PackageError;
use crate::info::{ApplicationInfo, PackageInfo};
use crate::provider::{MatchScope, PackageInfoProvider};

/// An installed package as recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    #[serde(flatten)]
    info: PackageInfo,
    #[serde(default)]
    handled_actions: Vec<String>,
    #[serde(default)]
    assets: BTreeMap<String, PathBuf>,
}

impl InstalledPackage {
    /// Creates a record with no handled actions and no assets.
    #[must_use]
    pub const fn new(info: PackageInfo) -> Self {
        Self {
            info,
            handled_actions: Vec::new(),
            assets: BTreeMap::new(),
        }
    }

    /// Declares that the package handles `action`.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.handled_actions.push(action.into());
        self
    }

    /// Maps asset `name` to a file on disk.
    #[must_use]
    pub fn with_asset(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.assets.insert(name.into(), path.into());
        self
    }

    /// Resolves relative asset paths against `base`.
    ///
    /// Absolute paths are left untouched.
    #[must_use]
    pub fn with_asset_root(mut self, base: &Path) -> Self {
        for path in self.assets.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Returns the package metadata.
    #[must_use]
    pub const fn info(&self) -> &PackageInfo {
        &self.info
    }

    const fn name(&self) -> &str {
        self.info.package_name()
    }

    const fn in_scope(&self, scope: MatchScope) -> bool {
        match scope {
            MatchScope::Any => true,
            MatchScope::SystemOnly => self.info.application().privilege().is_system_image(),
        }
    }
}

/// Registry of installed packages and declared device features.
///
/// # Example
///
/// ```
/// use drivergate_packages::{
///     ApplicationInfo, InstalledPackage, MatchScope, PackageInfo, PackageInfoProvider,
///     PackageRegistry, PrivilegeClass,
/// };
///
/// let info = ApplicationInfo::new("com.example.driver", "/data/app/driver")
///     .with_privilege(PrivilegeClass::UpdatedSystem);
/// let mut registry = PackageRegistry::new();
/// registry
///     .register(InstalledPackage::new(PackageInfo::new(info, "1.0", 1)))
///     .expect("registration succeeds");
///
/// assert!(registry.application_info("com.example.driver", MatchScope::SystemOnly).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: BTreeMap<String, InstalledPackage>,
    features: BTreeMap<String, u32>,
}

impl PackageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a package after validation.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Invalid`] if validation fails or if a package
    /// with the same name is already registered.
    pub fn register(&mut self, package: InstalledPackage) -> Result<(), PackageError> {
        package.info.application().validate()?;
        let name = package.name().to_owned();
        if self.packages.contains_key(&name) {
            return Err(PackageError::Invalid {
                message: format!("package '{name}' is already registered"),
            });
        }
        self.packages.insert(name, package);
        Ok(())
    }

    /// Declares a device feature at the given version.
    pub fn declare_feature(&mut self, feature: impl Into<String>, version: u32) {
        self.features.insert(feature.into(), version);
    }

    /// Looks up a package by name regardless of scope.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    /// Returns the number of registered packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns `true` when no packages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn find(&self, name: &str, scope: MatchScope) -> Result<&InstalledPackage, PackageError> {
        self.packages
            .get(name)
            .filter(|package| package.in_scope(scope))
            .ok_or_else(|| PackageError::NotFound {
                name: name.to_owned(),
            })
    }
}

impl PackageInfoProvider for PackageRegistry {
    fn application_info(
        &self,
        package: &str,
        scope: MatchScope,
    ) -> Result<ApplicationInfo, PackageError> {
        self.find(package, scope)
            .map(|found| found.info.application().clone())
    }

    fn package_info(&self, package: &str, scope: MatchScope) -> Result<PackageInfo, PackageError> {
        self.find(package, scope).map(|found| found.info.clone())
    }

    fn packages_handling(
        &self,
        action: &str,
        scope: MatchScope,
    ) -> Result<Vec<String>, PackageError> {
        Ok(self
            .packages
            .values()
            .filter(|package| package.in_scope(scope))
            .filter(|package| package.handled_actions.iter().any(|a| a == action))
            .map(|package| package.name().to_owned())
            .collect())
    }

    fn open_asset(&self, package: &str, asset: &str) -> Result<AssetDescriptor, PackageError> {
        let found = self.find(package, MatchScope::Any)?;
        let path = found
            .assets
            .get(asset)
            .ok_or_else(|| PackageError::AssetNotFound {
                package: package.to_owned(),
                asset: asset.to_owned(),
            })?;
        debug!(
            target: "drivergate::packages",
            package,
            asset,
            path = %path.display(),
            "opening package asset"
        );
        AssetDescriptor::open(path).map_err(|source| PackageError::Io {
            package: package.to_owned(),
            name: asset.to_owned(),
            source: Arc::new(source),
        })
    }

    fn has_system_feature(&self, feature: &str, version: u32) -> bool {
        self.features
            .get(feature)
            .is_some_and(|declared| *declared >= version)
    }
}
