//! Integration tests for the `drivergate` binary entry point.
//!
//! Runs the bundled demo scenarios and checks user-facing error handling.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

const GAME_DRIVER_DEMO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/game_driver.json");
const ANGLE_DEMO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/angle.json");

#[test]
fn game_driver_demo_selects_the_game_driver() {
    let mut command = cargo_bin_cmd!("drivergate");
    command.env("DRIVERGATE_LOG_FILTER", "off");
    command.args(["--scenario", GAME_DRIVER_DEMO]);
    command
        .assert()
        .success()
        .stdout(contains("\"choice\": \"game_driver\""))
        .stdout(contains("libvndksupport.so:libgpu_helper.so"));
}

#[test]
fn angle_demo_reports_the_in_use_notice() {
    let mut command = cargo_bin_cmd!("drivergate");
    command.env("DRIVERGATE_LOG_FILTER", "off");
    command.args(["--scenario", ANGLE_DEMO, "--show-in-use-notice"]);
    command
        .assert()
        .success()
        .stdout(contains("\"choice\": \"angle\""))
        .stdout(contains("\"org.chromium.angle\""));
}

#[test]
fn missing_scenario_file_exits_with_failure() {
    let mut command = cargo_bin_cmd!("drivergate");
    command.args(["--scenario", "does-not-exist.json"]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to read scenario"));
}

#[test]
fn missing_scenario_flag_exits_with_failure() {
    let mut command = cargo_bin_cmd!("drivergate");
    command.assert().failure().stderr(contains("--scenario"));
}
