//! Structured reporting for setup lifecycle events.

use std::sync::Arc;

use crate::angle::{AngleSelection, AngleSetupError};
use crate::driver::ResolvedDriver;
use crate::setup::SetupError;
use crate::stats::TelemetryRecord;

const TARGET: &str = "drivergate::setup";

/// Observer trait used to surface setup decisions to telemetry sinks.
pub trait SetupReporter: Send + Sync {
    /// Invoked before any decision is made for `package`.
    fn setup_starting(&self, package: &str);

    /// Invoked when ANGLE was set up for the process.
    fn angle_selected(&self, selection: &AngleSelection);

    /// Invoked when ANGLE was wanted but could not be set up.
    fn angle_failed(&self, error: &AngleSetupError);

    /// Invoked when an updatable driver was handed to the loader.
    fn driver_selected(&self, driver: &ResolvedDriver);

    /// Invoked when the process falls back to the system driver.
    fn system_driver_selected(&self, record: &TelemetryRecord);

    /// Invoked when setup aborts.
    fn setup_failed(&self, error: &SetupError);
}

impl<T> SetupReporter for Arc<T>
where
    T: SetupReporter + ?Sized,
{
    fn setup_starting(&self, package: &str) {
        (**self).setup_starting(package);
    }

    fn angle_selected(&self, selection: &AngleSelection) {
        (**self).angle_selected(selection);
    }

    fn angle_failed(&self, error: &AngleSetupError) {
        (**self).angle_failed(error);
    }

    fn driver_selected(&self, driver: &ResolvedDriver) {
        (**self).driver_selected(driver);
    }

    fn system_driver_selected(&self, record: &TelemetryRecord) {
        (**self).system_driver_selected(record);
    }

    fn setup_failed(&self, error: &SetupError) {
        (**self).setup_failed(error);
    }
}

/// Default reporter that records setup events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredSetupReporter;

impl StructuredSetupReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SetupReporter for StructuredSetupReporter {
    fn setup_starting(&self, package: &str) {
        tracing::info!(
            target: TARGET,
            event = "setup_starting",
            package,
            "starting graphics driver setup"
        );
    }

    fn angle_selected(&self, selection: &AngleSelection) {
        tracing::info!(
            target: TARGET,
            event = "angle_selected",
            angle_package = %selection.package,
            abi = %selection.abi,
            override_value = %selection.override_value,
            rules = ?selection.rules,
            "ANGLE selected"
        );
    }

    fn angle_failed(&self, error: &AngleSetupError) {
        tracing::warn!(
            target: TARGET,
            event = "angle_failed",
            error = %error,
            "ANGLE requested but unavailable"
        );
    }

    fn driver_selected(&self, driver: &ResolvedDriver) {
        tracing::info!(
            target: TARGET,
            event = "driver_selected",
            kind = ?driver.kind,
            driver_package = %driver.package,
            abi = %driver.abi,
            build_time = driver.build_time,
            "updatable driver selected"
        );
    }

    fn system_driver_selected(&self, record: &TelemetryRecord) {
        tracing::info!(
            target: TARGET,
            event = "system_driver_selected",
            package = %record.app_package,
            build_time = record.driver_build_time,
            vulkan_version = record.vulkan_version,
            "system driver selected"
        );
    }

    fn setup_failed(&self, error: &SetupError) {
        tracing::error!(
            target: TARGET,
            event = "setup_failed",
            error = %error,
            "graphics driver setup failed"
        );
    }
}
