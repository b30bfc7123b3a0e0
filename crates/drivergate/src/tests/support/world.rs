//! BDD test world: a device with installed packages, settings, and a
//! recording loader that setup programs.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use drivergate_config::{SettingKey, SettingsBundle};
use drivergate_packages::{
    ACTION_ANGLE_FOR_ANDROID, ApplicationInfo, InstalledPackage, METADATA_DRIVER_BUILD_TIME,
    ManifestMetadata, MetadataValue, PackageInfo, PackageRegistry, PrivilegeClass,
};

use crate::angle::ANGLE_RULES_ASSET;
use crate::device::{PROPERTY_ANGLE_TEMP_RULES, PROPERTY_GFX_DRIVER, StaticProperties};
use crate::loader::{LoaderState, RecordingLoader};
use crate::paths::SPHAL_LIBRARIES_ASSET;
use crate::setup::{ProcessContext, SetupCoordinator, SetupError, SetupOutcome};

use super::reporter::RecordingSetupReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    dir: TempDir,
    registry: PackageRegistry,
    properties: StaticProperties,
    settings: SettingsBundle,
    debuggable: bool,
    app: ApplicationInfo,
    loader: Option<RecordingLoader>,
    pub reporter: Arc<RecordingSetupReporter>,
    pub outcomes: Vec<Result<SetupOutcome, SetupError>>,
    pub loader_states: Vec<LoaderState>,
    pub temporary_rules: Option<PathBuf>,
}

impl TestWorld {
    /// Builds an empty device running an ordinary app.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let app = ApplicationInfo::new("com.example.app", dir.path().join("app"))
            .with_abis(Some("arm64-v8a"), None);
        Self {
            dir,
            registry: PackageRegistry::new(),
            properties: StaticProperties::new(),
            settings: SettingsBundle::new(),
            debuggable: false,
            app,
            loader: None,
            reporter: Arc::new(RecordingSetupReporter::default()),
            outcomes: Vec::new(),
            loader_states: Vec::new(),
            temporary_rules: None,
        }
    }

    /// Marks the process as debuggable.
    pub const fn make_debuggable(&mut self) {
        self.debuggable = true;
    }

    /// Stores a settings value.
    pub fn set(&mut self, key: SettingKey, value: &str) {
        self.settings.insert(key, value);
    }

    /// Installs an updated system driver package and advertises it as the
    /// device's game driver image.
    pub fn install_game_driver(&mut self, package: &str, build_time: &str) {
        let metadata = ManifestMetadata::new().with(
            METADATA_DRIVER_BUILD_TIME,
            MetadataValue::Text(build_time.to_owned()),
        );
        let info = ApplicationInfo::new(package, self.dir.path().join(package))
            .with_privilege(PrivilegeClass::UpdatedSystem)
            .with_target_sdk_version(29)
            .with_abis(Some("arm64-v8a"), None)
            .with_metadata(metadata);
        let sphal = self.write_file(&format!("{package}-sphal.txt"), "libvndk_a.so\n");
        self.install(
            InstalledPackage::new(PackageInfo::new(info, "1.2.3", 123))
                .with_asset(SPHAL_LIBRARIES_ASSET, sphal),
        );
        self.properties = self.properties.clone().with(PROPERTY_GFX_DRIVER, package);
    }

    /// Installs the system ANGLE package with packaged rules.
    pub fn install_angle(&mut self, package: &str) {
        let info = ApplicationInfo::new(package, self.dir.path().join(package))
            .with_privilege(PrivilegeClass::System)
            .with_abis(Some("arm64-v8a"), None);
        let rules = self.write_file(&format!("{package}-{ANGLE_RULES_ASSET}"), "{}");
        self.install(
            InstalledPackage::new(PackageInfo::new(info, "1", 1))
                .with_action(ACTION_ANGLE_FOR_ANDROID)
                .with_asset(ANGLE_RULES_ASSET, rules),
        );
    }

    /// Writes a temporary rules file and points the debug property at it.
    pub fn place_temporary_rules(&mut self) {
        let path = self.write_file("temporary-rules.json", "{\"Rules\":[]}");
        self.properties = self
            .properties
            .clone()
            .with(PROPERTY_ANGLE_TEMP_RULES, path.display().to_string());
        self.temporary_rules = Some(path);
    }

    /// Runs setup once and records its outcome and the loader state.
    pub fn run_setup(&mut self) {
        let debuggable = self.debuggable;
        let loader = self
            .loader
            .get_or_insert_with(|| RecordingLoader::new(debuggable, false));
        let process = ProcessContext::new("/data/app/lib/arm64", "/system/lib64:", "arm64");
        let coordinator =
            SetupCoordinator::new(&self.registry, &*loader, &self.properties, &self.settings, process)
                .with_reporter(Arc::clone(&self.reporter));
        let outcome = coordinator.setup(&self.app, Some(&self.settings));
        self.outcomes.push(outcome);
        self.loader_states.push(loader.state());
    }

    /// Returns the last setup outcome.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&Result<SetupOutcome, SetupError>> {
        self.outcomes.last()
    }

    fn install(&mut self, package: InstalledPackage) {
        self.registry.register(package).expect("register package");
    }

    fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructing a fresh world.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
