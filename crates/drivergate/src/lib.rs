//! GPU driver and ANGLE selection for app processes.
//!
//! When an app process starts, something has to decide which GLES and Vulkan
//! implementation it loads: the system driver baked into the image, an
//! updatable driver package (the game driver or its prerelease sibling), or
//! ANGLE layered over Vulkan. That decision is made here from three inputs:
//! read-only system properties describing the device, the device settings
//! store, and the installed package catalogue.
//!
//! [`SetupCoordinator`] runs the whole sequence once per process. It programs
//! the debug layer search path, offers ANGLE first, falls back to the
//! updatable driver precedence rules in [`choose_driver`], and always hands
//! exactly one [`TelemetryRecord`] to the [`NativeLoader`]. Failures in the
//! ANGLE path are recoverable; a driver package with unusable metadata aborts
//! setup with a [`SetupError`].
//!
//! The crate also ships a dry-run binary. [`run`] reads a JSON [`Scenario`]
//! describing a device, runs setup against a [`RecordingLoader`], and prints
//! a [`ScenarioReport`] of everything the loader was told.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod angle;
mod cli;
mod config;
mod device;
mod driver;
mod errors;
mod layers;
mod loader;
mod paths;
mod policy;
mod report;
mod scenario;
mod setup;
mod stats;
pub mod telemetry;

pub use angle::{
    ANGLE_RULES_ASSET, AngleDriverChoice, AngleSelection, AngleSetupError, BackendSelector,
    FORCE_ALL_ANGLE, InUseNotifier, NoticeError, RulesSource, resolve_override,
    should_use_backend,
};
pub use device::{
    DeviceProfile, PROPERTY_ANGLE_TEMP_RULES, PROPERTY_GFX_DRIVER,
    PROPERTY_GFX_DRIVER_BUILD_TIME, PROPERTY_GFX_DRIVER_PRERELEASE, StaticProperties,
    SystemProperties,
};
pub use driver::{MIN_TARGET_SDK_VERSION, ResolvedDriver, parse_build_time, resolve_driver};
pub use layers::{debug_layer_paths_from_settings, debug_layers_enabled, setup_gpu_layers};
pub use loader::{AngleState, LoaderState, NativeLoader, RecordingLoader};
pub use paths::{
    PATH_SEPARATOR, SPHAL_LIBRARIES_ASSET, build_search_path, choose_abi,
    collect_helper_libraries, instruction_set_for_abi,
};
pub use policy::{DriverKind, DriverSelection, OptInTier, choose_driver};
pub use report::{SetupReporter, StructuredSetupReporter};
pub use scenario::{
    RecordingNotifier, Scenario, ScenarioError, ScenarioReport, SettingsSource, run_scenario,
};
pub use setup::{DriverChoice, ProcessContext, SetupCoordinator, SetupError, SetupOutcome};
pub use stats::{SYSTEM_DRIVER_NAME, TelemetryRecord, VULKAN_1_0, VULKAN_1_1, detect_vulkan_version};
pub use telemetry::{TelemetryError, TelemetryHandle};

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// Runs the dry-run binary using the provided arguments and IO handles.
///
/// The setup report is written to `stdout` as pretty-printed JSON. Errors are
/// written to `stderr` and produce a failing exit code.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let result = Cli::try_parse_from(split.command_arguments.iter())
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| {
            let _telemetry = telemetry::initialise(&config)?;
            let scenario = Scenario::load(cli.scenario.as_std_path())?;
            let report = run_scenario(&scenario, cli.show_in_use_notice)?;
            emit_report(&report, &mut *stdout)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // Help and version requests are not failures.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn emit_report<W: Write>(report: &ScenarioReport, stdout: &mut W) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *stdout, report).map_err(AppError::SerialiseReport)?;
    writeln!(stdout).map_err(AppError::EmitReport)?;
    stdout.flush().map_err(AppError::EmitReport)
}

#[cfg(test)]
mod tests;
