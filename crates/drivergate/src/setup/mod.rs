//! Per-process setup orchestration.
//!
//! [`SetupCoordinator`] runs once when an app process starts. It programs the
//! layer search path, then tries ANGLE, then the updatable driver rules, and
//! always leaves exactly one GPU statistics record with the loader. ANGLE and
//! the updatable drivers are mutually exclusive: once ANGLE is set up the
//! driver rules are not consulted.

mod error;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use drivergate_config::{ConfigSnapshot, SettingKey, SettingsBundle, SettingsProvider};
use drivergate_packages::{AppIdentity, ApplicationInfo, MatchScope, PackageInfoProvider};

use crate::angle::{AngleSelection, BackendSelector, InUseNotifier};
use crate::device::{DeviceProfile, PROPERTY_GFX_DRIVER_BUILD_TIME, SystemProperties};
use crate::driver::{ResolvedDriver, resolve_driver};
use crate::layers::{debug_layer_paths_from_settings, setup_gpu_layers};
use crate::loader::NativeLoader;
use crate::policy::{DriverKind, choose_driver};
use crate::report::{SetupReporter, StructuredSetupReporter};
use crate::stats::{TelemetryRecord, detect_vulkan_version};

pub use error::SetupError;

const TARGET: &str = "drivergate::setup";

/// Library paths and instruction set of the process being set up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessContext {
    /// The app's own native library search path.
    pub library_search_paths: String,
    /// Paths the app's class loader namespace is permitted to load from.
    pub library_permitted_paths: String,
    /// Instruction set the process runs on, e.g. `arm64`.
    pub instruction_set: String,
}

impl ProcessContext {
    /// Creates a process context.
    #[must_use]
    pub fn new(
        library_search_paths: impl Into<String>,
        library_permitted_paths: impl Into<String>,
        instruction_set: impl Into<String>,
    ) -> Self {
        Self {
            library_search_paths: library_search_paths.into(),
            library_permitted_paths: library_permitted_paths.into(),
            instruction_set: instruction_set.into(),
        }
    }
}

/// The rendering backend chosen for a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum DriverChoice {
    /// The driver built into the system image.
    SystemDriver,
    /// The production updatable driver.
    GameDriver(ResolvedDriver),
    /// The prerelease updatable driver.
    PrereleaseDriver(ResolvedDriver),
    /// GLES translated through ANGLE.
    Angle(AngleSelection),
}

impl DriverChoice {
    fn from_driver(driver: ResolvedDriver) -> Self {
        match driver.kind {
            DriverKind::GameDriver => Self::GameDriver(driver),
            DriverKind::PrereleaseDriver => Self::PrereleaseDriver(driver),
        }
    }

    /// Returns the package providing the backend, or `None` for the system
    /// driver.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::SystemDriver => None,
            Self::GameDriver(driver) | Self::PrereleaseDriver(driver) => Some(&driver.package),
            Self::Angle(selection) => Some(&selection.package),
        }
    }

    /// Returns `true` for [`DriverChoice::SystemDriver`].
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::SystemDriver)
    }
}

/// Everything setup decided for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupOutcome {
    /// Chosen rendering backend.
    pub choice: DriverChoice,
    /// Layer search path handed to the loader.
    pub layer_paths: String,
    /// GPU statistics record handed to the loader.
    pub telemetry: TelemetryRecord,
}

/// Orchestrates driver setup for one process.
///
/// Collaborators are held by value; pass references to share them, since
/// every collaborator trait is implemented for `&T`.
pub struct SetupCoordinator<P, L, Y, S, R = StructuredSetupReporter> {
    packages: P,
    loader: L,
    properties: Y,
    settings: S,
    process: ProcessContext,
    reporter: R,
}

impl<P, L, Y, S> SetupCoordinator<P, L, Y, S>
where
    P: PackageInfoProvider,
    L: NativeLoader,
    Y: SystemProperties,
    S: SettingsProvider,
{
    /// Creates a coordinator that reports through `tracing`.
    #[must_use]
    pub const fn new(
        packages: P,
        loader: L,
        properties: Y,
        settings: S,
        process: ProcessContext,
    ) -> Self {
        Self {
            packages,
            loader,
            properties,
            settings,
            process,
            reporter: StructuredSetupReporter::new(),
        }
    }
}

impl<P, L, Y, S, R> SetupCoordinator<P, L, Y, S, R>
where
    P: PackageInfoProvider,
    L: NativeLoader,
    Y: SystemProperties,
    S: SettingsProvider,
    R: SetupReporter,
{
    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter<R2: SetupReporter>(self, reporter: R2) -> SetupCoordinator<P, L, Y, S, R2> {
        SetupCoordinator {
            packages: self.packages,
            loader: self.loader,
            properties: self.properties,
            settings: self.settings,
            process: self.process,
            reporter,
        }
    }

    /// Returns the loader boundary.
    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the process context.
    #[must_use]
    pub const fn process(&self) -> &ProcessContext {
        &self.process
    }

    /// Chooses and programs the graphics driver for `app`.
    ///
    /// Settings come from `bundle` when given, otherwise from the live
    /// settings provider. Running setup again with the same inputs reaches
    /// the same choice and overwrites the loader state.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DriverMetadata`] when the chosen driver package
    /// is trusted but its build time is missing or malformed. The loader's
    /// driver path is left untouched in that case.
    pub fn setup(
        &self,
        app: &ApplicationInfo,
        bundle: Option<&SettingsBundle>,
    ) -> Result<SetupOutcome, SetupError> {
        let package = app.package_name();
        self.reporter.setup_starting(package);

        let info = self.application_with_metadata(app);
        let identity = AppIdentity::from_application(&info);
        let config = self.snapshot(bundle);

        let layer_paths = setup_gpu_layers(&config, &identity, &self.loader, &self.process);
        let (choice, telemetry) = self
            .choose(&config, &identity)
            .inspect_err(|error| self.reporter.setup_failed(error))?;

        Ok(SetupOutcome {
            choice,
            layer_paths,
            telemetry,
        })
    }

    /// Returns the library paths of the debug layer apps for `app`, or
    /// `None` when debug layers are not enabled for it.
    #[must_use]
    pub fn debug_layer_paths_from_settings(
        &self,
        app: &ApplicationInfo,
        bundle: Option<&SettingsBundle>,
    ) -> Option<String> {
        let identity = AppIdentity::from_application(&self.application_with_metadata(app));
        debug_layer_paths_from_settings(
            &self.snapshot(bundle),
            &identity,
            &self.loader,
            &self.packages,
            &self.process.instruction_set,
        )
    }

    /// Sends the "ANGLE in use" notice for `package` when developer settings
    /// ask for it and the process really renders through ANGLE.
    ///
    /// ANGLE setup is rerun against live settings. The notice is addressed
    /// to the system ANGLE package. Delivery is best effort; returns `true`
    /// only when the notice was sent.
    #[must_use]
    pub fn show_angle_in_use_notice<N>(&self, package: &str, notifier: &N) -> bool
    where
        N: InUseNotifier + ?Sized,
    {
        let config = self.snapshot(None);
        if config.get_int(SettingKey::ShowAngleInUseDialogBox, 0) != 1 {
            debug!(target: TARGET, "ANGLE in-use notice disabled");
            return false;
        }

        let selector = self.angle_selector();
        match selector.setup(&config, package) {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(error) => {
                debug!(target: TARGET, %error, "ANGLE unavailable; no notice");
                return false;
            }
        }
        if !self.loader.should_use_angle(package) {
            debug!(target: TARGET, package, "loader will not use ANGLE; no notice");
            return false;
        }
        // The notice always goes to the system ANGLE package, even when a
        // debug package supplied the libraries.
        let receiver = match selector.system_package_name() {
            Ok(name) => name,
            Err(error) => {
                debug!(target: TARGET, %error, "no system ANGLE package; no notice");
                return false;
            }
        };

        notifier
            .notify_angle_in_use(&receiver)
            .inspect_err(|error| {
                warn!(target: TARGET, %error, "failed to show ANGLE in-use notice");
            })
            .is_ok()
    }

    fn choose(
        &self,
        config: &ConfigSnapshot,
        identity: &AppIdentity,
    ) -> Result<(DriverChoice, TelemetryRecord), SetupError> {
        let package = identity.package_name();
        match self.angle_selector().setup(config, package) {
            Ok(Some(selection)) => {
                self.reporter.angle_selected(&selection);
                // ANGLE still runs on the system Vulkan driver.
                let record = self.system_record(package);
                self.loader.set_gpu_stats(&record);
                return Ok((DriverChoice::Angle(selection), record));
            }
            Ok(None) => {}
            Err(error) => self.reporter.angle_failed(&error),
        }

        let device = DeviceProfile::probe(&self.properties, self.loader.is_debuggable());
        let resolved = choose_driver(config, &device, identity)
            .map(|selection| {
                resolve_driver(&self.packages, &selection, &self.process.instruction_set)
            })
            .transpose()?
            .flatten();

        if let Some(driver) = resolved {
            self.loader
                .set_driver_path_and_sphal_libraries(&driver.search_path, &driver.sphal_libraries);
            let record = driver.telemetry_record(package);
            self.loader.set_gpu_stats(&record);
            self.reporter.driver_selected(&driver);
            return Ok((DriverChoice::from_driver(driver), record));
        }

        let record = self.system_record(package);
        self.loader.set_gpu_stats(&record);
        self.reporter.system_driver_selected(&record);
        Ok((DriverChoice::SystemDriver, record))
    }

    fn angle_selector(&self) -> BackendSelector<'_, P, L, Y> {
        BackendSelector::new(
            &self.packages,
            &self.loader,
            &self.properties,
            &self.process.instruction_set,
        )
    }

    fn system_record(&self, package: &str) -> TelemetryRecord {
        TelemetryRecord::system(
            package,
            self.properties.get_long(PROPERTY_GFX_DRIVER_BUILD_TIME, 0),
            detect_vulkan_version(&self.packages),
        )
    }

    fn application_with_metadata(&self, app: &ApplicationInfo) -> ApplicationInfo {
        self.packages
            .application_info(app.package_name(), MatchScope::Any)
            .unwrap_or_else(|error| {
                debug!(
                    target: TARGET,
                    package = app.package_name(),
                    %error,
                    "metadata lookup failed; using caller-supplied application info"
                );
                app.clone()
            })
    }

    fn snapshot(&self, bundle: Option<&SettingsBundle>) -> ConfigSnapshot {
        bundle.map_or_else(
            || {
                ConfigSnapshot::from_provider(&self.settings).unwrap_or_else(|error| {
                    warn!(target: TARGET, %error, "settings unavailable; using defaults");
                    ConfigSnapshot::default()
                })
            },
            ConfigSnapshot::from_bundle,
        )
    }
}
