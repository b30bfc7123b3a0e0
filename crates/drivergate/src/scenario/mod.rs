//! Dry-run scenarios.
//!
//! A scenario is a JSON description of a device at process start: its
//! properties, installed packages, settings, and the app being launched.
//! [`run_scenario`] runs setup against a [`RecordingLoader`] and reports what
//! the loader was told.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use drivergate_config::SettingsBundle;
use drivergate_packages::{
    ApplicationInfo, InstalledPackage, MatchScope, PackageError, PackageInfoProvider,
    PackageRegistry,
};

use crate::angle::{InUseNotifier, NoticeError};
use crate::device::StaticProperties;
use crate::loader::{LoaderState, RecordingLoader};
use crate::setup::{ProcessContext, SetupCoordinator, SetupError, SetupOutcome};

const TARGET: &str = "drivergate::scenario";

/// Errors raised while loading or running a scenario.
#[derive(Debug, Clone, Error)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario '{}': {source}", .path.display())]
    Read {
        /// Scenario path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The scenario file is not valid scenario JSON.
    #[error("failed to parse scenario '{}': {source}", .path.display())]
    Parse {
        /// Scenario path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// A package in the scenario was rejected by the registry.
    #[error("invalid scenario package: {source}")]
    Package {
        /// Registration failure.
        #[source]
        source: PackageError,
    },
    /// Setup aborted.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Where setup reads settings from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    /// Settings are handed to setup as a pre-fetched bundle.
    #[default]
    Bundle,
    /// Setup queries the live settings store.
    Live,
}

/// A device and app launch to run setup against.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// System property values.
    pub properties: StaticProperties,
    /// Whether the process may load debug code.
    pub debuggable: bool,
    /// Whether the process may be made dumpable.
    pub allow_dumpable: bool,
    /// Library paths and instruction set of the process.
    pub process: ProcessContext,
    /// Device settings.
    pub settings: SettingsBundle,
    /// How settings reach setup.
    pub settings_source: SettingsSource,
    /// Installed packages.
    pub packages: Vec<InstalledPackage>,
    /// Declared device features and their versions.
    pub features: BTreeMap<String, u32>,
    /// Package name of the app being launched.
    pub app: String,
}

impl Scenario {
    /// Reads a scenario from `path`.
    ///
    /// Relative asset paths are resolved against the scenario's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Read`] or [`ScenarioError::Parse`] when the
    /// file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let parsed: Self = serde_json::from_str(&raw).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(parsed.with_asset_root(base))
    }

    fn with_asset_root(mut self, base: &Path) -> Self {
        self.packages = self
            .packages
            .into_iter()
            .map(|package| package.with_asset_root(base))
            .collect();
        self
    }

    fn registry(&self) -> Result<PackageRegistry, ScenarioError> {
        let mut registry = PackageRegistry::new();
        for package in &self.packages {
            registry
                .register(package.clone())
                .map_err(|source| ScenarioError::Package { source })?;
        }
        for (feature, version) in &self.features {
            registry.declare_feature(feature.as_str(), *version);
        }
        Ok(registry)
    }
}

/// What setup did for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Setup decision.
    pub outcome: SetupOutcome,
    /// Everything programmed into the loader.
    pub loader: LoaderState,
    /// ANGLE packages named by in-use notices, when notices were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notices: Option<Vec<String>>,
}

/// Notifier that records the packages it was asked to announce.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Returns the recorded notices.
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl InUseNotifier for RecordingNotifier {
    fn notify_angle_in_use(&self, angle_package: &str) -> Result<(), NoticeError> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(angle_package.to_owned());
        Ok(())
    }
}

/// Runs setup for `scenario`, then the in-use notice path when
/// `show_in_use_notice` is set.
///
/// # Errors
///
/// Returns [`ScenarioError::Package`] for invalid packages and
/// [`ScenarioError::Setup`] when setup aborts.
pub fn run_scenario(
    scenario: &Scenario,
    show_in_use_notice: bool,
) -> Result<ScenarioReport, ScenarioError> {
    let registry = scenario.registry()?;
    let loader = RecordingLoader::new(scenario.debuggable, scenario.allow_dumpable);
    let coordinator = SetupCoordinator::new(
        &registry,
        &loader,
        &scenario.properties,
        &scenario.settings,
        scenario.process.clone(),
    );

    let app = registry
        .application_info(&scenario.app, MatchScope::Any)
        .unwrap_or_else(|_| {
            ApplicationInfo::new(scenario.app.as_str(), Path::new("/data/app").join(&scenario.app))
        });
    let bundle = match scenario.settings_source {
        SettingsSource::Bundle => Some(&scenario.settings),
        SettingsSource::Live => None,
    };
    info!(
        target: TARGET,
        app = %scenario.app,
        packages = registry.len(),
        settings_source = ?scenario.settings_source,
        "running scenario"
    );
    let outcome = coordinator.setup(&app, bundle)?;
    info!(
        target: TARGET,
        app = %scenario.app,
        system_driver = outcome.choice.is_system(),
        driver_package = outcome.choice.package(),
        "scenario complete"
    );

    let notices = show_in_use_notice.then(|| {
        let notifier = RecordingNotifier::default();
        let _sent = coordinator.show_angle_in_use_notice(&scenario.app, &notifier);
        notifier.notices()
    });

    Ok(ScenarioReport {
        outcome,
        loader: loader.state(),
        notices,
    })
}
