/*
 *  manager.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Entity manager - builds subsystems and LEDs from configuration
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Builds the daemon's active entity set from the hardware description.
//!
//! Policy lives here, not in the plugins: a subsystem whose platform
//! type has no registered plugin is skipped with a warning, and an
//! entity whose construct fails is deallocated and never enters the
//! active set. The daemon keeps running with whatever did construct.

use std::sync::Arc;

use log::{info, warn};

use crate::config::Config;
use crate::platform::error::PlatformError;
use crate::platform::registry::PluginRegistry;
use crate::platform::traits::{LedClass, SubsystemClass};
use crate::platform::types::{Led, LedDesc, LedState, Subsystem};

struct ManagedLed {
    led: Box<Led>,
    class: Arc<dyn LedClass>,
    initial: Option<(LedState, Option<bool>)>,
}

struct ManagedSubsystem {
    subsystem: Box<Subsystem>,
    class: Arc<dyn SubsystemClass>,
    leds: Vec<ManagedLed>,
}

/// The constructed entity set, with lifecycle-ordered teardown.
#[derive(Default)]
pub struct EntityManager {
    subsystems: Vec<ManagedSubsystem>,
}

impl EntityManager {
    /// Construct every subsystem and LED the configuration names
    /// through the registry's capability tables. Failures skip the
    /// entity and keep going.
    pub fn build(registry: &PluginRegistry, config: &Config) -> Self {
        let mut manager = Self::default();

        for sub_cfg in &config.subsystems {
            let (Some(sub_class), Some(led_class)) = (
                registry.subsystem_class(&sub_cfg.platform_type),
                registry.led_class(&sub_cfg.platform_type),
            ) else {
                warn!(
                    "no plugin registered for platform type {}; skipping subsystem {}",
                    sub_cfg.platform_type, sub_cfg.name
                );
                continue;
            };

            let mut subsystem = sub_class.alloc();
            subsystem.name = sub_cfg.name.clone();
            subsystem.desc.bus = sub_cfg.bus.clone();
            if let Err(e) = sub_class.construct(&mut subsystem) {
                warn!("failed to construct subsystem {}: {e}", sub_cfg.name);
                sub_class.dealloc(subsystem);
                continue;
            }

            let mut managed = ManagedSubsystem {
                subsystem,
                class: sub_class,
                leds: Vec::new(),
            };

            for led_cfg in &sub_cfg.leds {
                let Some(settings) = config.led_settings(led_cfg) else {
                    warn!(
                        "led {}/{} has no usable settings; skipping",
                        sub_cfg.name, led_cfg.name
                    );
                    continue;
                };

                let mut led = led_class.alloc();
                led.name = led_cfg.name.clone();
                led.subsystem = sub_cfg.name.clone();
                led.desc = LedDesc {
                    device: led_cfg.device.clone(),
                    access: led_cfg.access.clone(),
                    settings,
                };

                if let Err(e) = led_class.construct(&mut led, &managed.subsystem) {
                    warn!(
                        "failed to construct led {}/{}: {e}; led will not be managed",
                        sub_cfg.name, led_cfg.name
                    );
                    led_class.dealloc(led);
                    continue;
                }

                managed.leds.push(ManagedLed {
                    led,
                    class: led_class.clone(),
                    initial: led_cfg
                        .initial_state
                        .map(|s| (s, led_cfg.initial_good)),
                });
            }

            info!(
                "subsystem {} up with {} led(s) on platform {}",
                sub_cfg.name,
                managed.leds.len(),
                sub_cfg.platform_type
            );
            manager.subsystems.push(managed);
        }

        manager
    }

    pub fn subsystem_count(&self) -> usize {
        self.subsystems.len()
    }

    pub fn led_count(&self) -> usize {
        self.subsystems.iter().map(|s| s.leds.len()).sum()
    }

    /// Drive every LED with a configured initial state. Failures are
    /// logged and the LED keeps its hardware default.
    pub fn apply_initial_states(&self) {
        for sub in &self.subsystems {
            for managed in &sub.leds {
                let Some((state, good)) = managed.initial else {
                    continue;
                };
                if let Err(e) = managed.class.state_set(&managed.led, state, good) {
                    warn!(
                        "initial state for {}/{} not applied: {e}",
                        sub.subsystem.name, managed.led.name
                    );
                }
            }
        }
    }

    fn find(&self, subsystem: &str, led: &str) -> Option<&ManagedLed> {
        self.subsystems
            .iter()
            .find(|s| s.subsystem.name == subsystem)
            .and_then(|s| s.leds.iter().find(|l| l.led.name == led))
    }

    /// Dispatch one state write to a managed LED.
    pub fn set_state(
        &self,
        subsystem: &str,
        led: &str,
        state: LedState,
        is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        let managed = self.find(subsystem, led).ok_or_else(|| {
            PlatformError::Construction(format!("no managed led {subsystem}/{led}"))
        })?;
        managed.class.state_set(&managed.led, state, is_good)
    }

    /// Read one managed LED's state back from hardware.
    pub fn get_state(&self, subsystem: &str, led: &str) -> Result<(LedState, bool), PlatformError> {
        let managed = self.find(subsystem, led).ok_or_else(|| {
            PlatformError::Construction(format!("no managed led {subsystem}/{led}"))
        })?;
        managed.class.state_get(&managed.led)
    }

    /// Tear the active set down in lifecycle order: every constructed
    /// entity is destructed exactly once, then deallocated.
    pub fn shutdown(mut self) {
        for mut sub in self.subsystems.drain(..) {
            for mut managed in sub.leds.drain(..) {
                managed.class.destruct(&mut managed.led);
                managed.class.dealloc(managed.led);
            }
            sub.class.destruct(&mut sub.subsystem);
            sub.class.dealloc(sub.subsystem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::platform::backends::mock::MockPlatform;

    fn test_config() -> Config {
        config::from_yaml_str(
            r#"
led_types:
  - name: status
    settings:
      good_on: "green"
      bad_on: "red"
      off: "none"
subsystems:
  - name: base
    platform_type: mock
    leds:
      - name: psu
        device: led_psu
        type: status
        initial_state: "on"
        initial_good: false
      - name: fan
        device: led_fan
        type: status
"#,
        )
        .unwrap()
    }

    fn registry_with_mock() -> (PluginRegistry, Arc<MockPlatform>) {
        let plugin = Arc::new(MockPlatform::new());
        let mut registry = PluginRegistry::new();
        registry.register("mock", plugin.clone());
        (registry, plugin)
    }

    #[test]
    fn test_build_constructs_configured_entities() {
        let (registry, plugin) = registry_with_mock();
        let manager = EntityManager::build(&registry, &test_config());

        assert_eq!(manager.subsystem_count(), 1);
        assert_eq!(manager.led_count(), 2);
        let state = plugin.state.lock().unwrap();
        assert_eq!(state.constructed_subsystems, 1);
        assert_eq!(state.constructed_leds, 2);
    }

    #[test]
    fn test_unknown_platform_type_skips_subsystem() {
        let registry = PluginRegistry::new();
        let manager = EntityManager::build(&registry, &test_config());
        assert_eq!(manager.subsystem_count(), 0);
    }

    #[test]
    fn test_failed_led_construct_is_excluded() {
        let (registry, plugin) = registry_with_mock();
        plugin.state.lock().unwrap().fail_led_construct = true;

        let manager = EntityManager::build(&registry, &test_config());
        assert_eq!(manager.subsystem_count(), 1);
        assert_eq!(manager.led_count(), 0);
    }

    #[test]
    fn test_initial_state_applied() {
        let (registry, plugin) = registry_with_mock();
        let manager = EntityManager::build(&registry, &test_config());

        manager.apply_initial_states();
        let state = plugin.state.lock().unwrap();
        assert_eq!(
            state.last_set,
            Some(("psu".to_string(), LedState::On, Some(false)))
        );
    }

    #[test]
    fn test_set_state_dispatches_to_led() {
        let (registry, plugin) = registry_with_mock();
        let manager = EntityManager::build(&registry, &test_config());

        manager
            .set_state("base", "fan", LedState::Flashing, None)
            .unwrap();
        assert_eq!(
            plugin.state.lock().unwrap().last_set,
            Some(("fan".to_string(), LedState::Flashing, None))
        );

        assert!(manager
            .set_state("base", "nope", LedState::On, None)
            .is_err());
    }

    #[test]
    fn test_shutdown_destructs_each_led_once() {
        let (registry, plugin) = registry_with_mock();
        let manager = EntityManager::build(&registry, &test_config());

        manager.shutdown();
        assert_eq!(plugin.state.lock().unwrap().destructed_leds, 2);
    }
}
