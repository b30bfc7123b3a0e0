//! Test harness utilities shared by unit and behavioural suites.

mod reporter;
mod world;

use mockall::mock;

use drivergate_packages::{
    ApplicationInfo, AssetDescriptor, MatchScope, PackageError, PackageInfo, PackageInfoProvider,
};

use crate::angle::{InUseNotifier, NoticeError};
use crate::loader::NativeLoader;
use crate::stats::TelemetryRecord;

pub use reporter::{RecordingSetupReporter, SetupEvent};
pub use world::{TestWorld, world};

mock! {
    pub Loader {}
    impl NativeLoader for Loader {
        fn is_debuggable(&self) -> bool;
        fn make_process_dumpable(&self) -> bool;
        fn set_layer_paths(&self, paths: &str);
        fn set_debug_layers(&self, layers: &str);
        fn set_debug_layers_gles(&self, layers: &str);
        fn set_driver_path_and_sphal_libraries(&self, path: &str, sphal_libraries: &str);
        fn set_angle_info(
            &self,
            library_path: &str,
            app_package: &str,
            override_value: &str,
            rules: &AssetDescriptor,
        );
        fn set_gpu_stats(&self, record: &TelemetryRecord);
        fn should_use_angle(&self, package: &str) -> bool;
    }
}

mock! {
    pub Packages {}
    impl PackageInfoProvider for Packages {
        fn application_info(
            &self,
            package: &str,
            scope: MatchScope,
        ) -> Result<ApplicationInfo, PackageError>;
        fn package_info(&self, package: &str, scope: MatchScope) -> Result<PackageInfo, PackageError>;
        fn packages_handling(
            &self,
            action: &str,
            scope: MatchScope,
        ) -> Result<Vec<String>, PackageError>;
        fn open_asset(&self, package: &str, asset: &str) -> Result<AssetDescriptor, PackageError>;
        fn has_system_feature(&self, feature: &str, version: u32) -> bool;
    }
}

mock! {
    pub Notifier {}
    impl InUseNotifier for Notifier {
        fn notify_angle_in_use(&self, angle_package: &str) -> Result<(), NoticeError>;
    }
}

/// Builds the `NotFound` error a provider returns for a missing package.
pub fn not_found(package: &str) -> PackageError {
    PackageError::NotFound {
        name: package.to_owned(),
    }
}
