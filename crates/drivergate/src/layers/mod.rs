//! GPU debug layer injection.
//!
//! Layers are only ever loaded into a single app chosen in developer
//! settings, and only when that app may load debug code. The layer search
//! path is programmed for every process regardless, because the app's own
//! library directories always take part in layer discovery.

use tracing::{debug, info, warn};

use drivergate_config::{ConfigSnapshot, SettingKey};
use drivergate_packages::{AppIdentity, MatchScope, PackageInfoProvider};

use crate::loader::NativeLoader;
use crate::paths::{PATH_SEPARATOR, build_search_path, choose_abi};
use crate::setup::ProcessContext;

const TARGET: &str = "drivergate::layers";

/// Returns `true` when debug layers may be injected into `app`.
///
/// The process must be debuggable, or the app must opt into layer injection
/// and the loader must succeed in making the process dumpable. Developer
/// settings must enable debug layers and name `app` as the debug app.
#[must_use]
pub fn debug_layers_enabled<L>(config: &ConfigSnapshot, app: &AppIdentity, loader: &L) -> bool
where
    L: NativeLoader + ?Sized,
{
    let injectable = loader.is_debuggable()
        || (app.inject_layers_enabled() && loader.make_process_dumpable());
    if !injectable {
        return false;
    }
    if config.get_int(SettingKey::EnableGpuDebugLayers, 0) == 0 {
        return false;
    }
    let package = app.package_name();
    config
        .get_string(SettingKey::GpuDebugApp)
        .is_some_and(|debug_app| !debug_app.is_empty() && !package.is_empty() && debug_app == package)
}

/// Returns the library paths of every installed layer app named in
/// `gpu_debug_layer_app`, each followed by `:`.
///
/// Returns `None` when debug layers are not enabled for `app`. Layer apps
/// that are not installed or ship no code for `instruction_set` are skipped.
#[must_use]
pub fn debug_layer_paths_from_settings<L, P>(
    config: &ConfigSnapshot,
    app: &AppIdentity,
    loader: &L,
    packages: &P,
    instruction_set: &str,
) -> Option<String>
where
    L: NativeLoader + ?Sized,
    P: PackageInfoProvider + ?Sized,
{
    if !debug_layers_enabled(config, app, loader) {
        return None;
    }
    info!(target: TARGET, package = app.package_name(), "GPU debug layers enabled");

    let layer_apps = config
        .get_string(SettingKey::GpuDebugLayerApp)
        .unwrap_or_default();
    if layer_apps.is_empty() {
        return Some(String::new());
    }
    info!(target: TARGET, layer_apps, "GPU debug layer apps");

    // Several apps may be named so Vulkan and GLES layers can come from
    // different packages.
    let paths = layer_apps
        .split(PATH_SEPARATOR)
        .filter_map(|layer_app| layer_app_paths(packages, layer_app, instruction_set))
        .fold(String::new(), |mut acc, paths| {
            acc.push_str(&paths);
            acc.push_str(PATH_SEPARATOR);
            acc
        });
    Some(paths)
}

fn layer_app_paths<P>(packages: &P, layer_app: &str, instruction_set: &str) -> Option<String>
where
    P: PackageInfoProvider + ?Sized,
{
    let info = packages
        .application_info(layer_app, MatchScope::Any)
        .inspect_err(|error| {
            warn!(target: TARGET, layer_app, %error, "debug layer app not installed");
        })
        .ok()?;
    let Some(abi) = choose_abi(&info, instruction_set) else {
        warn!(target: TARGET, layer_app, instruction_set, "debug layer app has no compatible ABI");
        return None;
    };
    let paths = build_search_path(&info, abi);
    debug!(target: TARGET, layer_app, paths = %paths, "debug layer app libraries");
    Some(paths)
}

/// Programs the layer search path and, when enabled, the debug layer lists.
///
/// Returns the layer search path handed to the loader.
#[must_use]
pub fn setup_gpu_layers<L>(
    config: &ConfigSnapshot,
    app: &AppIdentity,
    loader: &L,
    process: &ProcessContext,
) -> String
where
    L: NativeLoader + ?Sized,
{
    let mut layer_paths = String::new();
    if debug_layers_enabled(config, app, loader) {
        layer_paths.push_str(&process.library_permitted_paths);

        let vulkan = config.get_string(SettingKey::GpuDebugLayers);
        info!(target: TARGET, layers = vulkan.unwrap_or_default(), "Vulkan debug layer list");
        if let Some(layers) = vulkan.filter(|layers| !layers.is_empty()) {
            loader.set_debug_layers(layers);
        }

        let gles = config.get_string(SettingKey::GpuDebugLayersGles);
        info!(target: TARGET, layers = gles.unwrap_or_default(), "GLES debug layer list");
        if let Some(layers) = gles.filter(|layers| !layers.is_empty()) {
            loader.set_debug_layers_gles(layers);
        }
    }

    // The app's own library directories take part in every process.
    layer_paths.push_str(&process.library_search_paths);
    loader.set_layer_paths(&layer_paths);
    layer_paths
}
