//! CLI argument definitions for the dry-run binary.

use camino::Utf8PathBuf;
use clap::Parser;

/// Runs GPU driver and ANGLE setup for a described device and prints what
/// the loader was told.
#[derive(Parser, Debug)]
#[command(name = "drivergate", version)]
pub(crate) struct Cli {
    /// JSON file describing the device, its packages, and the app to launch.
    #[arg(long, value_name = "FILE")]
    pub(crate) scenario: Utf8PathBuf,
    /// Runs the ANGLE in-use notice path after setup.
    #[arg(long)]
    pub(crate) show_in_use_notice: bool,
}
