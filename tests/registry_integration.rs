/*
 *  tests/registry_integration.rs
 *
 *  Integration tests for the platform plugin layer
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 */

use std::sync::Arc;

use ledmond::config;
use ledmond::manager::EntityManager;
use ledmond::platform::backends::mock::MockPlatform;
use ledmond::platform::registry::PluginRegistry;
use ledmond::platform::{LedState, PlatformPlugin};

#[cfg(feature = "backend-sysfs")]
mod sysfs_end_to_end {
    use super::*;
    use ledmond::hw::sensors::{SensorAccess, SysfsSensors};
    use ledmond::platform::backends::sysfs::SysfsPlugin;
    use std::fs;
    use std::path::Path;

    fn fake_hwmon_tree(root: &Path) {
        let chip = root.join("hwmon0");
        fs::create_dir_all(&chip).unwrap();
        fs::write(chip.join("name"), "switch_cpld\n").unwrap();
        fs::write(chip.join("led1_label"), "led_psu\n").unwrap();
        fs::write(chip.join("led1_output"), "none\n").unwrap();
    }

    fn daemon_config() -> ledmond::Config {
        config::from_yaml_str(
            r#"
led_types:
  - name: status
    settings:
      good_on: "green"
      bad_on: "red"
      good_flashing: "green_blink"
      bad_flashing: "red_blink"
      off: "none"
subsystems:
  - name: base
    platform_type: sysfs
    leds:
      - name: psu
        device: led_psu
        type: status
"#,
        )
        .unwrap()
    }

    /// Full daemon flow against a fake hwmon tree: register, init,
    /// build, drive, read back, tear down.
    #[test]
    fn test_sysfs_platform_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        fake_hwmon_tree(root.path());

        let hwmon = root.path().to_path_buf();
        let plugin = SysfsPlugin::with_detector(Box::new(move || {
            SysfsSensors::detect_at(&hwmon).map(|s| Arc::new(s) as Arc<dyn SensorAccess>)
        }));

        let mut registry = PluginRegistry::new();
        registry.register(SysfsPlugin::PLATFORM_TYPE, Arc::new(plugin));
        registry.init_all();

        let manager = EntityManager::build(&registry, &daemon_config());
        assert_eq!(manager.led_count(), 1);

        manager
            .set_state("base", "psu", LedState::On, Some(false))
            .unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("hwmon0/led1_output")).unwrap(),
            "red"
        );
        assert_eq!(
            manager.get_state("base", "psu").unwrap(),
            (LedState::On, false)
        );

        manager
            .set_state("base", "psu", LedState::Flashing, None)
            .unwrap();
        assert_eq!(
            manager.get_state("base", "psu").unwrap(),
            (LedState::Flashing, true)
        );

        manager.shutdown();
        registry.deinit_all();
        registry.unload();
    }

    /// A LED whose device name matches nothing must not enter the
    /// active set, while its siblings still do.
    #[test]
    fn test_unresolvable_led_is_excluded() {
        let root = tempfile::tempdir().unwrap();
        fake_hwmon_tree(root.path());

        let hwmon = root.path().to_path_buf();
        let plugin = SysfsPlugin::with_detector(Box::new(move || {
            SysfsSensors::detect_at(&hwmon).map(|s| Arc::new(s) as Arc<dyn SensorAccess>)
        }));

        let mut registry = PluginRegistry::new();
        registry.register(SysfsPlugin::PLATFORM_TYPE, Arc::new(plugin));
        registry.init_all();

        let cfg = config::from_yaml_str(
            r#"
led_types:
  - name: status
    settings:
      good_on: "green"
      off: "none"
subsystems:
  - name: base
    platform_type: sysfs
    leds:
      - name: psu
        device: led_psu
        type: status
      - name: ghost
        device: led_ghost
        type: status
"#,
        )
        .unwrap();

        let manager = EntityManager::build(&registry, &cfg);
        assert_eq!(manager.led_count(), 1);
        assert!(manager.get_state("base", "ghost").is_err());
    }
}

#[cfg(feature = "plugin-system")]
mod plugin_loading {
    use super::*;
    use std::fs;

    /// Files that do not satisfy the plugin contract are skipped and
    /// the load still succeeds with zero entries.
    #[test]
    fn test_non_plugin_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libother_daemon.so"), b"\x7fELF-junk").unwrap();
        fs::write(dir.path().join("README"), b"not a plugin at all").unwrap();

        let mut registry = PluginRegistry::new();
        let count = registry.load(dir.path()).unwrap();
        assert_eq!(count, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_plugin_directory_fails_load() {
        let mut registry = PluginRegistry::new();
        assert!(registry
            .load(std::path::Path::new("/nonexistent/ledmond/plugins"))
            .is_err());
    }
}

/// Registry lookups hand back the exact capability tables a plugin
/// supplied, across multiple registered platform types.
#[test]
fn test_lookup_identity_across_platform_types() {
    let first = Arc::new(MockPlatform::new());
    let second = Arc::new(MockPlatform::new());
    let first_led = first.led_class();
    let second_led = second.led_class();

    let mut registry = PluginRegistry::new();
    registry.register("alpha", first);
    registry.register("beta", second);

    assert!(Arc::ptr_eq(&registry.led_class("alpha").unwrap(), &first_led));
    assert!(Arc::ptr_eq(&registry.led_class("beta").unwrap(), &second_led));
    assert!(registry.led_class("gamma").is_none());
    assert!(registry.subsystem_class("gamma").is_none());
}

/// The manager only keeps what constructs, and teardown destructs each
/// constructed LED exactly once.
#[test]
fn test_manager_lifecycle_with_mock_platform() {
    let plugin = Arc::new(MockPlatform::new());
    let state = plugin.state.clone();

    let mut registry = PluginRegistry::new();
    registry.register("mock", plugin);
    registry.init_all();

    let cfg = config::from_yaml_str(
        r#"
led_types:
  - name: plain
    settings:
      on: "1"
      off: "0"
subsystems:
  - name: base
    platform_type: mock
    leds:
      - name: status
        type: plain
        initial_state: flashing
"#,
    )
    .unwrap();

    let manager = EntityManager::build(&registry, &cfg);
    manager.apply_initial_states();

    {
        let s = state.lock().unwrap();
        assert_eq!(s.constructed_leds, 1);
        assert_eq!(
            s.last_set,
            Some(("status".to_string(), LedState::Flashing, None))
        );
    }

    manager.shutdown();
    registry.deinit_all();

    let s = state.lock().unwrap();
    assert_eq!(s.destructed_leds, 1);
    assert_eq!(s.init_count, 1);
    assert_eq!(s.deinit_count, 1);
}
