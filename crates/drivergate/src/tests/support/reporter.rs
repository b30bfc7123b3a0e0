//! Test double for [`SetupReporter`] that records lifecycle events for
//! assertions.

use std::sync::Mutex;

use crate::angle::{AngleSelection, AngleSetupError};
use crate::driver::ResolvedDriver;
use crate::report::SetupReporter;
use crate::setup::SetupError;
use crate::stats::TelemetryRecord;

/// Setup events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupEvent {
    /// Setup started for a package.
    Starting(String),
    /// ANGLE was set up from the named package.
    AngleSelected(String),
    /// ANGLE was wanted but unavailable.
    AngleFailed(String),
    /// An updatable driver package was selected.
    DriverSelected(String),
    /// The system driver was selected.
    SystemDriverSelected,
    /// Setup aborted.
    Failed(String),
}

/// Records setup events for assertions.
#[derive(Debug, Default)]
pub struct RecordingSetupReporter {
    events: Mutex<Vec<SetupEvent>>,
}

impl RecordingSetupReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<SetupEvent> {
        self.events
            .lock()
            .expect("setup reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: SetupEvent) {
        self.events
            .lock()
            .expect("setup reporter mutex poisoned")
            .push(event);
    }
}

impl SetupReporter for RecordingSetupReporter {
    fn setup_starting(&self, package: &str) {
        self.record(SetupEvent::Starting(package.to_owned()));
    }

    fn angle_selected(&self, selection: &AngleSelection) {
        self.record(SetupEvent::AngleSelected(selection.package.clone()));
    }

    fn angle_failed(&self, error: &AngleSetupError) {
        self.record(SetupEvent::AngleFailed(error.to_string()));
    }

    fn driver_selected(&self, driver: &ResolvedDriver) {
        self.record(SetupEvent::DriverSelected(driver.package.clone()));
    }

    fn system_driver_selected(&self, _record: &TelemetryRecord) {
        self.record(SetupEvent::SystemDriverSelected);
    }

    fn setup_failed(&self, error: &SetupError) {
        self.record(SetupEvent::Failed(error.to_string()));
    }
}
