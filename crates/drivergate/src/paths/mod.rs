//! Native library path assembly.
//!
//! Turns a chosen package into the search path the loader uses: the
//! extracted native library directory followed by the library directory
//! inside the package archive for the ABI that matches the running process.

use tracing::warn;

use drivergate_packages::{ApplicationInfo, PackageInfoProvider};

/// Asset listing the vendor libraries a driver needs from the sphal namespace.
pub const SPHAL_LIBRARIES_ASSET: &str = "sphal_libraries.txt";

/// Separator between entries of a search path or library list.
pub const PATH_SEPARATOR: &str = ":";

/// Returns the instruction set an ABI tag runs on.
///
/// # Example
///
/// ```
/// use drivergate::instruction_set_for_abi;
///
/// assert_eq!(instruction_set_for_abi("armeabi-v7a"), Some("arm"));
/// assert_eq!(instruction_set_for_abi("sparc"), None);
/// ```
#[must_use]
pub fn instruction_set_for_abi(abi: &str) -> Option<&'static str> {
    match abi {
        "armeabi" | "armeabi-v7a" => Some("arm"),
        "arm64-v8a" => Some("arm64"),
        "x86" => Some("x86"),
        "x86_64" => Some("x86_64"),
        "riscv64" => Some("riscv64"),
        "mips" => Some("mips"),
        "mips64" => Some("mips64"),
        _ => None,
    }
}

/// Picks the package ABI that runs on `instruction_set`, primary first.
#[must_use]
pub fn choose_abi<'a>(info: &'a ApplicationInfo, instruction_set: &str) -> Option<&'a str> {
    [info.primary_abi(), info.secondary_abi()]
        .into_iter()
        .flatten()
        .find(|abi| instruction_set_for_abi(abi) == Some(instruction_set))
}

/// Builds `<nativeLibraryDir>:<sourceDir>!/lib/<abi>`.
#[must_use]
pub fn build_search_path(info: &ApplicationInfo, abi: &str) -> String {
    format!(
        "{}{PATH_SEPARATOR}{}!/lib/{abi}",
        info.native_library_dir().display(),
        info.source_dir().display()
    )
}

/// Reads the driver's sphal library list and joins it with `:`.
///
/// Any failure yields an empty list.
#[must_use]
pub fn collect_helper_libraries<P>(packages: &P, package: &str) -> String
where
    P: PackageInfoProvider + ?Sized,
{
    packages
        .open_asset(package, SPHAL_LIBRARIES_ASSET)
        .map_err(|error| error.to_string())
        .and_then(|asset| asset.read_lines().map_err(|error| error.to_string()))
        .map(|names| names.join(PATH_SEPARATOR))
        .unwrap_or_else(|error| {
            warn!(
                target: "drivergate::paths",
                package,
                asset = SPHAL_LIBRARIES_ASSET,
                %error,
                "failed to load sphal library list"
            );
            String::new()
        })
}
