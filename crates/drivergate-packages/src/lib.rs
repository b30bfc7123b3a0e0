//! Installed package metadata for driver selection.
//!
//! The `drivergate-packages` crate models what the selection engine needs to
//! know about installed packages: where their native libraries live, which
//! ABIs they ship, how trusted they are, and what their manifests declare. All
//! lookups go through the [`PackageInfoProvider`] trait so the engine never
//! talks to a package service directly.
//!
//! # Example
//!
//! ```
//! use drivergate_packages::{
//!     ApplicationInfo, InstalledPackage, MatchScope, PackageInfo, PackageInfoProvider,
//!     PackageRegistry, PrivilegeClass, ACTION_ANGLE_FOR_ANDROID,
//! };
//!
//! let angle = ApplicationInfo::new("org.chromium.angle", "/system/app/angle")
//!     .with_privilege(PrivilegeClass::System)
//!     .with_abis(Some("arm64-v8a"), None);
//!
//! let mut registry = PackageRegistry::new();
//! registry
//!     .register(
//!         InstalledPackage::new(PackageInfo::new(angle, "1.0", 1))
//!             .with_action(ACTION_ANGLE_FOR_ANDROID),
//!     )
//!     .expect("registration succeeds");
//!
//! let handlers = registry
//!     .packages_handling(ACTION_ANGLE_FOR_ANDROID, MatchScope::SystemOnly)
//!     .expect("query succeeds");
//! assert_eq!(handlers, vec![String::from("org.chromium.angle")]);
//! ```

pub mod asset;
pub mod error;
pub mod info;
pub mod provider;
pub mod registry;

pub use asset::AssetDescriptor;
pub use error::PackageError;
pub use info::{
    AppIdentity, ApplicationInfo, METADATA_DEVELOPER_DRIVER_ENABLE, METADATA_DRIVER_BUILD_TIME,
    METADATA_INJECT_LAYERS_ENABLE, ManifestMetadata, MetadataValue, PackageInfo, PrivilegeClass,
};
pub use provider::{
    ACTION_ANGLE_FOR_ANDROID, FEATURE_VULKAN_HARDWARE_VERSION, MatchScope, PackageInfoProvider,
};
pub use registry::{InstalledPackage, PackageRegistry};
