//! Boundary to the native graphics loader.
//!
//! Setup computes what the process should load and where; the loader does the
//! loading. Every decision crosses into the loader through [`NativeLoader`].
//! Setting a value replaces whatever was set before, so rerunning setup for
//! the same process leaves the loader in the same state.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use drivergate_packages::AssetDescriptor;

use crate::angle::AngleDriverChoice;
use crate::stats::TelemetryRecord;

/// Native loader entry points used during setup.
pub trait NativeLoader {
    /// Returns `true` when the process may load debug code.
    fn is_debuggable(&self) -> bool;

    /// Marks the process dumpable so injected layers can attach; returns
    /// `true` on success.
    fn make_process_dumpable(&self) -> bool;

    /// Programs the search path used to find layer libraries.
    fn set_layer_paths(&self, paths: &str);

    /// Programs the Vulkan debug layer list.
    fn set_debug_layers(&self, layers: &str);

    /// Programs the GLES debug layer list.
    fn set_debug_layers_gles(&self, layers: &str);

    /// Programs the updatable driver search path and the vendor libraries it
    /// needs from the sphal namespace.
    fn set_driver_path_and_sphal_libraries(&self, path: &str, sphal_libraries: &str);

    /// Hands the ANGLE library path, the per-app override, and the rules file
    /// to the loader.
    fn set_angle_info(
        &self,
        library_path: &str,
        app_package: &str,
        override_value: &str,
        rules: &AssetDescriptor,
    );

    /// Records which driver the process uses.
    fn set_gpu_stats(&self, record: &TelemetryRecord);

    /// Returns the loader's final verdict on whether `package` uses ANGLE.
    fn should_use_angle(&self, package: &str) -> bool;
}

impl<T> NativeLoader for &T
where
    T: NativeLoader + ?Sized,
{
    fn is_debuggable(&self) -> bool {
        (**self).is_debuggable()
    }

    fn make_process_dumpable(&self) -> bool {
        (**self).make_process_dumpable()
    }

    fn set_layer_paths(&self, paths: &str) {
        (**self).set_layer_paths(paths);
    }

    fn set_debug_layers(&self, layers: &str) {
        (**self).set_debug_layers(layers);
    }

    fn set_debug_layers_gles(&self, layers: &str) {
        (**self).set_debug_layers_gles(layers);
    }

    fn set_driver_path_and_sphal_libraries(&self, path: &str, sphal_libraries: &str) {
        (**self).set_driver_path_and_sphal_libraries(path, sphal_libraries);
    }

    fn set_angle_info(
        &self,
        library_path: &str,
        app_package: &str,
        override_value: &str,
        rules: &AssetDescriptor,
    ) {
        (**self).set_angle_info(library_path, app_package, override_value, rules);
    }

    fn set_gpu_stats(&self, record: &TelemetryRecord) {
        (**self).set_gpu_stats(record);
    }

    fn should_use_angle(&self, package: &str) -> bool {
        (**self).should_use_angle(package)
    }
}

/// ANGLE configuration as last handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AngleState {
    /// ANGLE library search path.
    pub library_path: String,
    /// Package the configuration applies to.
    pub app_package: String,
    /// Per-app developer override value.
    pub override_value: String,
    /// File holding the rules.
    pub rules_path: PathBuf,
    /// Start of the rules within the file.
    pub rules_offset: u64,
    /// Length of the rules in bytes.
    pub rules_length: u64,
}

/// Everything programmed into a [`RecordingLoader`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderState {
    /// Whether the process was made dumpable.
    pub dumpable: bool,
    /// Layer search path.
    pub layer_paths: Option<String>,
    /// Vulkan debug layers.
    pub debug_layers: Option<String>,
    /// GLES debug layers.
    pub debug_layers_gles: Option<String>,
    /// Updatable driver search path.
    pub driver_path: Option<String>,
    /// Vendor libraries required by the updatable driver.
    pub sphal_libraries: Option<String>,
    /// ANGLE configuration.
    pub angle: Option<AngleState>,
    /// Last GPU statistics record.
    pub gpu_stats: Option<TelemetryRecord>,
}

/// In-memory loader that records what setup programs into it.
///
/// Used by the dry-run binary and tests. ANGLE is reported as in use for a
/// package when ANGLE information was handed over for it and its override is
/// not `native`.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    debuggable: bool,
    allow_dumpable: bool,
    state: Mutex<LoaderState>,
}

impl RecordingLoader {
    /// Creates a loader for a process with the given debug capabilities.
    #[must_use]
    pub fn new(debuggable: bool, allow_dumpable: bool) -> Self {
        Self {
            debuggable,
            allow_dumpable,
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Returns a copy of the recorded state.
    #[must_use]
    pub fn state(&self) -> LoaderState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeLoader for RecordingLoader {
    fn is_debuggable(&self) -> bool {
        self.debuggable
    }

    fn make_process_dumpable(&self) -> bool {
        if self.allow_dumpable {
            self.lock().dumpable = true;
        }
        self.allow_dumpable
    }

    fn set_layer_paths(&self, paths: &str) {
        self.lock().layer_paths = Some(paths.to_owned());
    }

    fn set_debug_layers(&self, layers: &str) {
        self.lock().debug_layers = Some(layers.to_owned());
    }

    fn set_debug_layers_gles(&self, layers: &str) {
        self.lock().debug_layers_gles = Some(layers.to_owned());
    }

    fn set_driver_path_and_sphal_libraries(&self, path: &str, sphal_libraries: &str) {
        let mut state = self.lock();
        state.driver_path = Some(path.to_owned());
        state.sphal_libraries = Some(sphal_libraries.to_owned());
    }

    fn set_angle_info(
        &self,
        library_path: &str,
        app_package: &str,
        override_value: &str,
        rules: &AssetDescriptor,
    ) {
        self.lock().angle = Some(AngleState {
            library_path: library_path.to_owned(),
            app_package: app_package.to_owned(),
            override_value: override_value.to_owned(),
            rules_path: rules.path().to_path_buf(),
            rules_offset: rules.offset(),
            rules_length: rules.length(),
        });
    }

    fn set_gpu_stats(&self, record: &TelemetryRecord) {
        self.lock().gpu_stats = Some(record.clone());
    }

    fn should_use_angle(&self, package: &str) -> bool {
        self.lock().angle.as_ref().is_some_and(|angle| {
            angle.app_package == package
                && angle.override_value != AngleDriverChoice::Native.as_str()
        })
    }
}

#[cfg(test)]
mod tests;
