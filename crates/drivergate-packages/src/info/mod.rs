//! Installed package metadata.
//!
//! An [`ApplicationInfo`] describes where a package is installed, which native
//! ABIs it ships, how trusted it is, and the key/value metadata declared in its
//! manifest. [`AppIdentity`] is the subset the selection policy needs about
//! the app whose process is starting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PackageError;

/// Manifest flag letting an app use the prerelease driver on user builds.
pub const METADATA_DEVELOPER_DRIVER_ENABLE: &str = "com.android.graphics.developerdriver.enable";

/// Manifest flag letting an app accept injected GPU debug layers.
pub const METADATA_INJECT_LAYERS_ENABLE: &str = "com.android.graphics.injectLayers.enable";

/// Manifest value recording when a driver package was built, as `L<seconds>`.
pub const METADATA_DRIVER_BUILD_TIME: &str = "com.android.gamedriver.build_time";

/// How much the platform trusts an installed package.
///
/// # Example
///
/// ```
/// use drivergate_packages::PrivilegeClass;
///
/// assert!(PrivilegeClass::Privileged.is_system_image());
/// assert!(!PrivilegeClass::Ordinary.is_system_image());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeClass {
    /// Installed by the user.
    #[default]
    Ordinary,
    /// Pre-installed on the system image and never updated.
    System,
    /// Pre-installed on the system image and since updated.
    UpdatedSystem,
    /// Pre-installed with privileged permissions.
    Privileged,
}

impl PrivilegeClass {
    /// Returns `true` for packages that ship on the system image.
    #[must_use]
    pub const fn is_system_image(self) -> bool {
        !matches!(self, Self::Ordinary)
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::System => "system",
            Self::UpdatedSystem => "updated_system",
            Self::Privileged => "privileged",
        }
    }
}

impl std::fmt::Display for PrivilegeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value declared in a manifest's metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Text(String),
}

/// Key/value metadata declared in a package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestMetadata {
    values: BTreeMap<String, MetadataValue>,
}

impl ManifestMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Returns the boolean stored under `key`; anything else reads as `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(MetadataValue::Bool(true)))
    }

    /// Returns the string stored under `key`, if it is a string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(MetadataValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns `true` when no metadata is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Install metadata for a single package.
///
/// # Example
///
/// ```
/// use drivergate_packages::{ApplicationInfo, PrivilegeClass};
///
/// let info = ApplicationInfo::new("com.example.driver", "/data/app/driver")
///     .with_privilege(PrivilegeClass::UpdatedSystem)
///     .with_abis(Some("arm64-v8a"), Some("armeabi-v7a"));
///
/// assert_eq!(info.package_name(), "com.example.driver");
/// assert_eq!(info.primary_abi(), Some("arm64-v8a"));
/// assert!(info.native_library_dir().ends_with("lib"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    package_name: String,
    #[serde(default)]
    privilege: PrivilegeClass,
    native_library_dir: PathBuf,
    source_dir: PathBuf,
    #[serde(default)]
    primary_abi: Option<String>,
    #[serde(default)]
    secondary_abi: Option<String>,
    #[serde(default)]
    target_sdk_version: u32,
    #[serde(default)]
    metadata: ManifestMetadata,
}

impl ApplicationInfo {
    /// Creates install metadata for a package rooted at `install_dir`.
    ///
    /// The native library directory defaults to `<install_dir>/lib` and the
    /// archive to `<install_dir>/base.apk`.
    #[must_use]
    pub fn new(package_name: impl Into<String>, install_dir: impl AsRef<Path>) -> Self {
        let root = install_dir.as_ref();
        Self {
            package_name: package_name.into(),
            privilege: PrivilegeClass::Ordinary,
            native_library_dir: root.join("lib"),
            source_dir: root.join("base.apk"),
            primary_abi: None,
            secondary_abi: None,
            target_sdk_version: 0,
            metadata: ManifestMetadata::new(),
        }
    }

    /// Sets the privilege class.
    #[must_use]
    pub const fn with_privilege(mut self, privilege: PrivilegeClass) -> Self {
        self.privilege = privilege;
        self
    }

    /// Sets the primary and secondary native ABIs.
    #[must_use]
    pub fn with_abis(mut self, primary: Option<&str>, secondary: Option<&str>) -> Self {
        self.primary_abi = primary.map(str::to_owned);
        self.secondary_abi = secondary.map(str::to_owned);
        self
    }

    /// Sets the declared target platform level.
    #[must_use]
    pub const fn with_target_sdk_version(mut self, version: u32) -> Self {
        self.target_sdk_version = version;
        self
    }

    /// Replaces the manifest metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ManifestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Overrides the on-disk native library directory.
    #[must_use]
    pub fn with_native_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.native_library_dir = dir.into();
        self
    }

    /// Validates the metadata, returning an error if it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Invalid`] if the package name is empty.
    pub fn validate(&self) -> Result<(), PackageError> {
        if self.package_name.trim().is_empty() {
            return Err(PackageError::Invalid {
                message: String::from("package name must not be empty"),
            });
        }
        Ok(())
    }

    /// Returns the package name.
    #[must_use]
    pub const fn package_name(&self) -> &str {
        self.package_name.as_str()
    }

    /// Returns the privilege class.
    #[must_use]
    pub const fn privilege(&self) -> PrivilegeClass {
        self.privilege
    }

    /// Returns the directory holding extracted native libraries.
    #[must_use]
    pub fn native_library_dir(&self) -> &Path {
        &self.native_library_dir
    }

    /// Returns the installed archive path.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Returns the primary native ABI tag.
    #[must_use]
    pub fn primary_abi(&self) -> Option<&str> {
        self.primary_abi.as_deref()
    }

    /// Returns the secondary native ABI tag.
    #[must_use]
    pub fn secondary_abi(&self) -> Option<&str> {
        self.secondary_abi.as_deref()
    }

    /// Returns the declared target platform level.
    #[must_use]
    pub const fn target_sdk_version(&self) -> u32 {
        self.target_sdk_version
    }

    /// Returns the manifest metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }
}

/// Install metadata plus version information for a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(flatten)]
    application: ApplicationInfo,
    #[serde(default)]
    version_name: String,
    #[serde(default)]
    version_code: i64,
}

impl PackageInfo {
    /// Wraps install metadata with version information.
    #[must_use]
    pub fn new(
        application: ApplicationInfo,
        version_name: impl Into<String>,
        version_code: i64,
    ) -> Self {
        Self {
            application,
            version_name: version_name.into(),
            version_code,
        }
    }

    /// Returns the install metadata.
    #[must_use]
    pub const fn application(&self) -> &ApplicationInfo {
        &self.application
    }

    /// Returns the package name.
    #[must_use]
    pub const fn package_name(&self) -> &str {
        self.application.package_name()
    }

    /// Returns the human-readable version.
    #[must_use]
    pub const fn version_name(&self) -> &str {
        self.version_name.as_str()
    }

    /// Returns the monotonically increasing version code.
    #[must_use]
    pub const fn version_code(&self) -> i64 {
        self.version_code
    }
}

/// What the selection policy knows about the app whose process is starting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppIdentity {
    package_name: String,
    primary_abi: Option<String>,
    secondary_abi: Option<String>,
    privilege: PrivilegeClass,
    developer_driver_enabled: bool,
    inject_layers_enabled: bool,
}

impl AppIdentity {
    /// Creates an identity for an ordinary app with no manifest flags.
    #[must_use]
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            primary_abi: None,
            secondary_abi: None,
            privilege: PrivilegeClass::Ordinary,
            developer_driver_enabled: false,
            inject_layers_enabled: false,
        }
    }

    /// Derives the identity from an app's install metadata.
    #[must_use]
    pub fn from_application(info: &ApplicationInfo) -> Self {
        let metadata = info.metadata();
        Self {
            package_name: info.package_name().to_owned(),
            primary_abi: info.primary_abi().map(str::to_owned),
            secondary_abi: info.secondary_abi().map(str::to_owned),
            privilege: info.privilege(),
            developer_driver_enabled: metadata.get_bool(METADATA_DEVELOPER_DRIVER_ENABLE),
            inject_layers_enabled: metadata.get_bool(METADATA_INJECT_LAYERS_ENABLE),
        }
    }

    /// Sets the privilege class.
    #[must_use]
    pub const fn with_privilege(mut self, privilege: PrivilegeClass) -> Self {
        self.privilege = privilege;
        self
    }

    /// Sets the developer-driver manifest flag.
    #[must_use]
    pub const fn with_developer_driver(mut self, enabled: bool) -> Self {
        self.developer_driver_enabled = enabled;
        self
    }

    /// Sets the layer-injection manifest flag.
    #[must_use]
    pub const fn with_inject_layers(mut self, enabled: bool) -> Self {
        self.inject_layers_enabled = enabled;
        self
    }

    /// Returns the package name.
    #[must_use]
    pub const fn package_name(&self) -> &str {
        self.package_name.as_str()
    }

    /// Returns the primary native ABI tag.
    #[must_use]
    pub fn primary_abi(&self) -> Option<&str> {
        self.primary_abi.as_deref()
    }

    /// Returns the secondary native ABI tag.
    #[must_use]
    pub fn secondary_abi(&self) -> Option<&str> {
        self.secondary_abi.as_deref()
    }

    /// Returns the privilege class.
    #[must_use]
    pub const fn privilege(&self) -> PrivilegeClass {
        self.privilege
    }

    /// Returns `true` when the manifest enables the developer driver.
    #[must_use]
    pub const fn developer_driver_enabled(&self) -> bool {
        self.developer_driver_enabled
    }

    /// Returns `true` when the manifest accepts injected debug layers.
    #[must_use]
    pub const fn inject_layers_enabled(&self) -> bool {
        self.inject_layers_enabled
    }

    /// Returns `true` for apps that must always run on the system driver.
    ///
    /// Privileged apps and pre-installed apps that were never updated were
    /// tested against the driver on the system image.
    #[must_use]
    pub const fn is_pinned_to_system_driver(&self) -> bool {
        matches!(
            self.privilege,
            PrivilegeClass::Privileged | PrivilegeClass::System
        )
    }
}
