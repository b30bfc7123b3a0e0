//! Unit tests for the recording loader.

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn rules() -> (TempDir, AssetDescriptor) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("a4a_rules.json");
    fs::write(&path, "{\"Rules\":[]}").expect("write rules");
    let descriptor = AssetDescriptor::open(path).expect("open rules");
    (dir, descriptor)
}

#[test]
fn dumpable_request_follows_capability() {
    let refusing = RecordingLoader::new(false, false);
    assert!(!refusing.make_process_dumpable());
    assert!(!refusing.state().dumpable);

    let accepting = RecordingLoader::new(false, true);
    assert!(accepting.make_process_dumpable());
    assert!(accepting.state().dumpable);
}

#[test]
fn later_calls_overwrite_earlier_ones() {
    let loader = RecordingLoader::new(true, true);
    loader.set_layer_paths("/first");
    loader.set_driver_path_and_sphal_libraries("/a", "liba.so");
    loader.set_layer_paths("/second");
    loader.set_driver_path_and_sphal_libraries("/b", "");

    let state = loader.state();
    assert_eq!(state.layer_paths.as_deref(), Some("/second"));
    assert_eq!(state.driver_path.as_deref(), Some("/b"));
    assert_eq!(state.sphal_libraries.as_deref(), Some(""));
}

#[rstest]
#[case::angle("angle", "com.example.game", true)]
#[case::default_override("default", "com.example.game", true)]
#[case::native("native", "com.example.game", false)]
#[case::other_package("angle", "com.example.other", false)]
fn angle_verdict_follows_recorded_info(
    rules: (TempDir, AssetDescriptor),
    #[case] override_value: &str,
    #[case] queried: &str,
    #[case] expected: bool,
) {
    let (_dir, descriptor) = rules;
    let loader = RecordingLoader::new(true, false);
    loader.set_angle_info("/angle/lib", "com.example.game", override_value, &descriptor);
    assert_eq!(loader.should_use_angle(queried), expected);
}

#[rstest]
fn angle_state_records_rules_range(rules: (TempDir, AssetDescriptor)) {
    let (_dir, descriptor) = rules;
    let loader = RecordingLoader::default();
    loader.set_angle_info("/angle/lib", "com.example.game", "angle", &descriptor);

    let angle = loader.state().angle.expect("angle recorded");
    assert_eq!(angle.rules_offset, 0);
    assert_eq!(angle.rules_length, 12);
    assert_eq!(angle.rules_path, descriptor.path());
}

#[test]
fn no_angle_info_means_no_angle() {
    let loader = RecordingLoader::default();
    assert!(!loader.should_use_angle("com.example.game"));
}
