//! Unit tests for ANGLE arbitration.

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use drivergate_config::SettingsBundle;
use drivergate_packages::{InstalledPackage, PackageInfo, PackageRegistry, PrivilegeClass};

use super::*;
use crate::device::StaticProperties;
use crate::loader::RecordingLoader;

const APP: &str = "com.example.game";
const ANGLE: &str = "org.chromium.angle";
const DEBUG_ANGLE: &str = "org.chromium.angle.dev";

fn snapshot(entries: &[(SettingKey, &str)]) -> ConfigSnapshot {
    let bundle = entries
        .iter()
        .fold(SettingsBundle::new(), |bundle, (key, value)| {
            bundle.with(*key, *value)
        });
    ConfigSnapshot::from_bundle(&bundle)
}

struct AngleWorld {
    dir: TempDir,
    registry: PackageRegistry,
    properties: StaticProperties,
}

impl AngleWorld {
    fn angle_package(&self, name: &str, privilege: PrivilegeClass, rules: bool) -> InstalledPackage {
        let info = ApplicationInfo::new(name, self.dir.path().join(name))
            .with_privilege(privilege)
            .with_abis(Some("arm64-v8a"), Some("armeabi-v7a"));
        let mut package = InstalledPackage::new(PackageInfo::new(info, "1.0", 1))
            .with_action(ACTION_ANGLE_FOR_ANDROID);
        if rules {
            let path = self.dir.path().join(format!("{name}-rules.json"));
            fs::write(&path, "{\"Rules\":[]}").expect("write packaged rules");
            package = package.with_asset(ANGLE_RULES_ASSET, path);
        }
        package
    }

    fn install(&mut self, package: InstalledPackage) {
        self.registry.register(package).expect("register package");
    }

    fn write_temporary_rules(&mut self) -> PathBuf {
        let path = self.dir.path().join("temp-rules.json");
        fs::write(&path, "{\"Rules\":[{\"Rule\":\"dev\"}]}").expect("write temporary rules");
        self.properties = self
            .properties
            .clone()
            .with(PROPERTY_ANGLE_TEMP_RULES, path.display().to_string());
        path
    }

    fn setup(
        &self,
        loader: &RecordingLoader,
        config: &ConfigSnapshot,
    ) -> Result<Option<AngleSelection>, AngleSetupError> {
        BackendSelector::new(&self.registry, loader, &self.properties, "arm64").setup(config, APP)
    }
}

#[fixture]
fn world() -> AngleWorld {
    let mut world = AngleWorld {
        dir: TempDir::new().expect("temp dir"),
        registry: PackageRegistry::new(),
        properties: StaticProperties::new(),
    };
    let angle = world.angle_package(ANGLE, PrivilegeClass::System, true);
    world.install(angle);
    world
}

#[rstest]
#[case::force_all(&[(SettingKey::AngleGlDriverAllAngle, "1")], "angle")]
#[case::force_all_needs_exact_value(&[(SettingKey::AngleGlDriverAllAngle, "true")], "default")]
#[case::per_app(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.other,com.example.game"),
        (SettingKey::AngleGlDriverSelectionValues, "native,angle"),
    ],
    "angle"
)]
#[case::first_match_wins(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.example.game,com.example.game"),
        (SettingKey::AngleGlDriverSelectionValues, "native,angle"),
    ],
    "native"
)]
#[case::mismatched_lengths(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.example.game"),
        (SettingKey::AngleGlDriverSelectionValues, "angle,native"),
    ],
    "default"
)]
#[case::absent_package(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.other"),
        (SettingKey::AngleGlDriverSelectionValues, "angle"),
    ],
    "default"
)]
#[case::unset(&[], "default")]
fn override_resolution(#[case] entries: &[(SettingKey, &str)], #[case] expected: &str) {
    assert_eq!(resolve_override(&snapshot(entries), APP), expected);
}

#[test]
fn empty_package_never_uses_angle() {
    let config = snapshot(&[(SettingKey::AngleGlDriverAllAngle, "1")]);
    assert_eq!(resolve_override(&config, ""), "angle");
    assert!(!should_use_backend(&config, ""));
}

#[rstest]
#[case::allowlisted(&[(SettingKey::AngleAllowlist, "com.example.game")], true)]
#[case::requested(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.example.game"),
        (SettingKey::AngleGlDriverSelectionValues, "angle"),
    ],
    true
)]
#[case::native_override(
    &[
        (SettingKey::AngleGlDriverSelectionPkgs, "com.example.game"),
        (SettingKey::AngleGlDriverSelectionValues, "native"),
    ],
    false
)]
#[case::nothing(&[], false)]
fn backend_wanted_when_allowlisted_or_requested(
    #[case] entries: &[(SettingKey, &str)],
    #[case] expected: bool,
) {
    assert_eq!(should_use_backend(&snapshot(entries), APP), expected);
}

#[rstest]
fn not_wanted_touches_nothing(world: AngleWorld) {
    let loader = RecordingLoader::new(true, false);
    assert_eq!(world.setup(&loader, &snapshot(&[])).expect("no error"), None);
    assert_eq!(loader.state().angle, None);
}

#[rstest]
fn packaged_rules_hand_over(world: AngleWorld) {
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);

    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");

    assert_eq!(selection.package, ANGLE);
    assert_eq!(selection.abi, "arm64-v8a");
    assert_eq!(selection.override_value, "default");
    assert_eq!(selection.rules, RulesSource::Packaged);
    let angle = loader.state().angle.expect("angle info handed over");
    assert_eq!(angle.app_package, APP);
    assert_eq!(angle.library_path, selection.search_path);
    assert!(loader.should_use_angle(APP));
}

#[rstest]
fn temporary_rules_win_on_debuggable_builds(mut world: AngleWorld) {
    let temp = world.write_temporary_rules();
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);

    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");

    assert_eq!(
        selection.rules,
        RulesSource::TemporaryFile { path: temp.clone() }
    );
    let angle = loader.state().angle.expect("angle info handed over");
    assert_eq!(angle.rules_path, temp);
    assert_eq!(angle.rules_offset, 0);
}

#[rstest]
fn temporary_rules_ignored_when_not_debuggable(mut world: AngleWorld) {
    world.write_temporary_rules();
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);
    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");
    assert_eq!(selection.rules, RulesSource::Packaged);
}

#[rstest]
fn missing_temporary_file_falls_back_to_package(mut world: AngleWorld) {
    world.properties = StaticProperties::new().with(PROPERTY_ANGLE_TEMP_RULES, "/nonexistent/rules");
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);
    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");
    assert_eq!(selection.rules, RulesSource::Packaged);
}

#[rstest]
fn temporary_rules_directory_falls_back_to_package(mut world: AngleWorld) {
    let nested = world.dir.path().join("rules.d");
    fs::create_dir(&nested).expect("create rules directory");
    world.properties =
        StaticProperties::new().with(PROPERTY_ANGLE_TEMP_RULES, nested.display().to_string());
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);

    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");

    assert_eq!(selection.rules, RulesSource::Packaged);
    let angle = loader.state().angle.expect("angle info handed over");
    assert_eq!(angle.rules_path, world.dir.path().join(format!("{ANGLE}-rules.json")));
}

#[rstest]
fn no_rules_anywhere_fails(mut world: AngleWorld) {
    world.registry = PackageRegistry::new();
    let bare = world.angle_package(ANGLE, PrivilegeClass::System, false);
    world.install(bare);
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);

    let error = world.setup(&loader, &config).expect_err("no rules");
    assert!(matches!(error, AngleSetupError::RulesUnavailable { .. }));
    assert_eq!(loader.state().angle, None);
}

#[rstest]
#[case::none_installed(0)]
#[case::ambiguous(2)]
fn system_package_must_be_unique(#[case] count: usize) {
    let mut world = AngleWorld {
        dir: TempDir::new().expect("temp dir"),
        registry: PackageRegistry::new(),
        properties: StaticProperties::new(),
    };
    for index in 0..count {
        let package = world.angle_package(&format!("{ANGLE}{index}"), PrivilegeClass::System, true);
        world.install(package);
    }
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);

    let error = world.setup(&loader, &config).expect_err("ANGLE package ambiguous");
    match error {
        AngleSetupError::PackageCount { found } => assert_eq!(found.len(), count),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn user_installed_handler_is_not_the_system_package() {
    let mut world = AngleWorld {
        dir: TempDir::new().expect("temp dir"),
        registry: PackageRegistry::new(),
        properties: StaticProperties::new(),
    };
    let sideloaded = world.angle_package(ANGLE, PrivilegeClass::Ordinary, true);
    world.install(sideloaded);
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);
    assert!(matches!(
        world.setup(&loader, &config),
        Err(AngleSetupError::PackageCount { .. })
    ));
}

#[rstest]
fn debug_package_used_on_debuggable_builds(mut world: AngleWorld) {
    let debug = world.angle_package(DEBUG_ANGLE, PrivilegeClass::Ordinary, true);
    world.install(debug);
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[
        (SettingKey::AngleAllowlist, APP),
        (SettingKey::AngleDebugPackage, DEBUG_ANGLE),
    ]);

    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");
    assert_eq!(selection.package, DEBUG_ANGLE);
}

#[rstest]
fn debug_package_ignored_when_not_debuggable(mut world: AngleWorld) {
    let debug = world.angle_package(DEBUG_ANGLE, PrivilegeClass::Ordinary, true);
    world.install(debug);
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[
        (SettingKey::AngleAllowlist, APP),
        (SettingKey::AngleDebugPackage, DEBUG_ANGLE),
    ]);

    let selection = world
        .setup(&loader, &config)
        .expect("setup succeeds")
        .expect("ANGLE selected");
    assert_eq!(selection.package, ANGLE);
}

#[rstest]
fn missing_debug_package_fails_without_fallback(world: AngleWorld) {
    let loader = RecordingLoader::new(true, false);
    let config = snapshot(&[
        (SettingKey::AngleAllowlist, APP),
        (SettingKey::AngleDebugPackage, DEBUG_ANGLE),
    ]);
    let error = world.setup(&loader, &config).expect_err("debug package missing");
    assert!(matches!(error, AngleSetupError::DebugPackageMissing { .. }));
}

#[rstest]
fn incompatible_abi_fails(world: AngleWorld) {
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);
    let error = BackendSelector::new(&world.registry, &loader, &world.properties, "x86_64")
        .setup(&config, APP)
        .expect_err("no x86_64 libraries");
    assert!(matches!(error, AngleSetupError::NoCompatibleAbi { .. }));
}

#[rstest]
fn repeated_setup_is_idempotent(world: AngleWorld) {
    let loader = RecordingLoader::new(false, false);
    let config = snapshot(&[(SettingKey::AngleAllowlist, APP)]);
    let first = world.setup(&loader, &config).expect("first run");
    let state_after_first = loader.state();
    let second = world.setup(&loader, &config).expect("second run");
    assert_eq!(first, second);
    assert_eq!(loader.state(), state_after_first);
}

#[rstest]
#[case::default(AngleDriverChoice::Default, "default")]
#[case::native(AngleDriverChoice::Native, "native")]
#[case::angle(AngleDriverChoice::Angle, "angle")]
fn driver_choice_names(#[case] choice: AngleDriverChoice, #[case] name: &str) {
    assert_eq!(choice.as_str(), name);
    assert_eq!(choice.to_string(), name);
    assert_eq!(name.parse::<AngleDriverChoice>().expect("parses"), choice);
}
