/*
 *  platform/backends/sysfs.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Built-in backend for LEDs exposed as sensor chip features
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

//! The sysfs platform drives LEDs through hwmon chip features. LEDs are
//! resolved at construction time by matching the configured device name
//! against the LED-category features of every detected chip; states
//! travel as human-readable strings in both directions.

use std::sync::{Arc, Mutex};

use log::{error, warn};

use crate::config::StateSettings;
use crate::hw::sensors::{FeatureKind, SensorAccess, SubfeatureKind};
use crate::hw::HwError;
use crate::platform::error::PlatformError;
use crate::platform::traits::{LedClass, PlatformPlugin, SubsystemClass};
use crate::platform::types::{Led, LedState, Subsystem};

type SharedSensors = Arc<Mutex<Option<Arc<dyn SensorAccess>>>>;

/// Produces the sensors handle at plugin init time.
pub type SensorDetector = dyn Fn() -> Result<Arc<dyn SensorAccess>, HwError> + Send + Sync;

/// Built-in backend for sensor-feature LEDs.
///
/// The sensors handle is opened in `init` and shared with the LED
/// class. A detection failure leaves the backend degraded: it logs, and
/// every LED construction afterwards fails with
/// [`PlatformError::SensorsUnavailable`].
pub struct SysfsPlugin {
    sensors: SharedSensors,
    detector: Box<SensorDetector>,
    subsystem_class: Arc<SysfsSubsystemClass>,
    led_class: Arc<SysfsLedClass>,
}

impl SysfsPlugin {
    pub const PLATFORM_TYPE: &'static str = "sysfs";

    /// Backend over a `/sys/class/hwmon` scan.
    pub fn new() -> Self {
        Self::with_detector(Box::new(|| {
            crate::hw::sensors::SysfsSensors::detect()
                .map(|s| Arc::new(s) as Arc<dyn SensorAccess>)
        }))
    }

    /// Backend with a caller-supplied detector; the test seam.
    pub fn with_detector(detector: Box<SensorDetector>) -> Self {
        let sensors: SharedSensors = Arc::new(Mutex::new(None));
        Self {
            subsystem_class: Arc::new(SysfsSubsystemClass),
            led_class: Arc::new(SysfsLedClass {
                sensors: sensors.clone(),
            }),
            sensors,
            detector,
        }
    }
}

impl Default for SysfsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformPlugin for SysfsPlugin {
    fn init(&self) {
        match (self.detector)() {
            Ok(handle) => {
                *self.sensors.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            }
            Err(e) => error!("failed to initialize sensors facility: {e}"),
        }
    }

    fn deinit(&self) {
        *self.sensors.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn run(&self) {}

    fn wait(&self) {}

    fn subsystem_class(&self) -> Arc<dyn SubsystemClass> {
        self.subsystem_class.clone()
    }

    fn led_class(&self) -> Arc<dyn LedClass> {
        self.led_class.clone()
    }
}

pub struct SysfsSubsystemClass;

impl SubsystemClass for SysfsSubsystemClass {
    fn alloc(&self) -> Box<Subsystem> {
        Box::new(Subsystem::new())
    }

    fn construct(&self, _subsystem: &mut Subsystem) -> Result<(), PlatformError> {
        Ok(())
    }

    fn destruct(&self, _subsystem: &mut Subsystem) {}
}

/// LED payload: the resolved chip and its output control point.
struct SysfsLed {
    sensors: Arc<dyn SensorAccess>,
    chip: usize,
    output: u32,
}

pub struct SysfsLedClass {
    sensors: SharedSensors,
}

impl SysfsLedClass {
    fn sensors_handle(&self) -> Result<Arc<dyn SensorAccess>, PlatformError> {
        self.sensors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(PlatformError::SensorsUnavailable)
    }
}

impl LedClass for SysfsLedClass {
    fn alloc(&self) -> Box<Led> {
        Box::new(Led::new())
    }

    /// Walk every detected chip and bind the first LED-category feature
    /// whose name equals the configured device name. A LED with no
    /// match, or a match without an output subfeature, stays
    /// unconstructed.
    fn construct(&self, led: &mut Led, _subsystem: &Subsystem) -> Result<(), PlatformError> {
        let device = led
            .desc
            .device
            .as_deref()
            .ok_or(PlatformError::MissingDeviceName)?;
        let sensors = self.sensors_handle()?;

        let mut binding = None;
        'chips: for chip in sensors.chips() {
            for feature in &chip.features {
                if feature.kind == FeatureKind::Led && feature.name == device {
                    binding = Some((
                        chip.index,
                        feature.subfeature(SubfeatureKind::Output).map(|s| s.number),
                        feature.name.clone(),
                    ));
                    break 'chips;
                }
            }
        }

        let Some((chip, output, feature_name)) = binding else {
            error!(
                "unable to find chip in sysfs for led {} for subsystem {}",
                led.name, led.subsystem
            );
            return Err(PlatformError::NoMatchingChip(device.to_string()));
        };
        let Some(output) = output else {
            error!("{} does not have an output subfeature", led.name);
            return Err(PlatformError::NoOutputSubfeature(feature_name));
        };

        led.set_payload(Box::new(SysfsLed {
            sensors,
            chip,
            output,
        }));
        Ok(())
    }

    fn destruct(&self, led: &mut Led) {
        led.clear_payload();
    }

    fn has_state_get(&self) -> bool {
        true
    }

    fn has_state_set(&self) -> bool {
        true
    }

    fn state_get(&self, led: &Led) -> Result<(LedState, bool), PlatformError> {
        let payload = led.payload_ref::<SysfsLed>().ok_or_else(|| {
            PlatformError::Construction(format!("led {} was not constructed", led.name))
        })?;
        let chips = payload.sensors.chips();
        let chip = &chips[payload.chip];

        let raw = payload
            .sensors
            .get_value(chip, payload.output)
            .inspect_err(|e| error!("led state get for {} failed: {e}", led.name))?;

        value_to_state(&led.desc.settings, &raw).inspect_err(|e| {
            warn!(
                "bad state \"{raw}\" for {} while getting sysfs led state: {e}",
                led.name
            );
        })
    }

    fn state_set(
        &self,
        led: &Led,
        state: LedState,
        is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        let payload = led.payload_ref::<SysfsLed>().ok_or_else(|| {
            PlatformError::Construction(format!("led {} was not constructed", led.name))
        })?;

        let Some(value) = state_to_value(&led.desc.settings, state, is_good) else {
            warn!(
                "failed to set unsupported sysfs led state {state:?}(good={is_good:?}) \
                 for subsystem {}, LED {}",
                led.subsystem, led.name
            );
            return Err(PlatformError::UnsupportedState {
                state,
                good: is_good,
            });
        };

        let chips = payload.sensors.chips();
        let chip = &chips[payload.chip];
        payload
            .sensors
            .set_value(chip, payload.output, value)
            .inspect_err(|e| error!("led sysfs state set {value} for {} failed: {e}", led.name))?;
        Ok(())
    }
}

/// Forward mapper: good/bad selection for ON and FLASHING (absent
/// qualifier means healthy), single value for OFF. `None` when the
/// configuration carries no value for the combination.
fn state_to_value(
    settings: &StateSettings,
    state: LedState,
    is_good: Option<bool>,
) -> Option<&str> {
    let good = is_good.unwrap_or(true);
    match state {
        LedState::On if good => settings.good_on.as_deref(),
        LedState::On => settings.bad_on.as_deref(),
        LedState::Flashing if good => settings.good_flashing.as_deref(),
        LedState::Flashing => settings.bad_flashing.as_deref(),
        LedState::Off => settings.off.as_deref(),
    }
}

/// Reverse mapper: match the hardware-reported string against the five
/// configured literals. OFF reports the qualifier as `false`; it has no
/// health meaning there.
fn value_to_state(settings: &StateSettings, value: &str) -> Result<(LedState, bool), PlatformError> {
    let v = Some(value);
    if settings.good_on.as_deref() == v {
        Ok((LedState::On, true))
    } else if settings.good_flashing.as_deref() == v {
        Ok((LedState::Flashing, true))
    } else if settings.bad_on.as_deref() == v {
        Ok((LedState::On, false))
    } else if settings.bad_flashing.as_deref() == v {
        Ok((LedState::Flashing, false))
    } else if settings.off.as_deref() == v {
        Ok((LedState::Off, false))
    } else {
        Err(PlatformError::UnknownStateValue(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::backends::mock::MockSensors;

    fn settings() -> StateSettings {
        StateSettings {
            off: Some("none".into()),
            good_on: Some("green".into()),
            bad_on: Some("red".into()),
            good_flashing: Some("green_blink".into()),
            bad_flashing: Some("red_blink".into()),
            ..Default::default()
        }
    }

    fn plugin_with_chip(chip: MockSensors) -> SysfsPlugin {
        let sensors = Arc::new(chip);
        let plugin = SysfsPlugin::with_detector(Box::new(move || {
            Ok(sensors.clone() as Arc<dyn SensorAccess>)
        }));
        plugin.init();
        plugin
    }

    fn constructed_led(plugin: &SysfsPlugin, device: &str) -> Result<Box<Led>, PlatformError> {
        let led_class = plugin.led_class();
        let sub = Subsystem::new();
        let mut led = led_class.alloc();
        led.name = "psu".into();
        led.subsystem = "base".into();
        led.desc.device = Some(device.into());
        led.desc.settings = settings();
        led_class.construct(&mut led, &sub).map(|_| led)
    }

    #[test]
    fn test_construct_binds_matching_feature() {
        let plugin =
            plugin_with_chip(MockSensors::with_led_feature("switch_cpld", "led_psu", "none"));
        let led = constructed_led(&plugin, "led_psu").unwrap();
        assert_eq!(
            plugin.led_class().state_get(&led).unwrap(),
            (LedState::Off, false)
        );
    }

    #[test]
    fn test_construct_fails_without_matching_chip() {
        let plugin =
            plugin_with_chip(MockSensors::with_led_feature("switch_cpld", "led_fan", "none"));
        assert!(matches!(
            constructed_led(&plugin, "led_psu"),
            Err(PlatformError::NoMatchingChip(_))
        ));
    }

    #[test]
    fn test_construct_fails_without_output_subfeature() {
        let plugin = plugin_with_chip(MockSensors::with_output_less_led("cpld", "led_psu"));
        assert!(matches!(
            constructed_led(&plugin, "led_psu"),
            Err(PlatformError::NoOutputSubfeature(_))
        ));
    }

    #[test]
    fn test_construct_fails_when_sensors_unavailable() {
        // Detector fails: backend must degrade, not panic.
        let plugin = SysfsPlugin::with_detector(Box::new(|| {
            Err(HwError::Open {
                path: "/sys/class/hwmon".into(),
                msg: "gone".into(),
            })
        }));
        plugin.init();
        assert!(matches!(
            constructed_led(&plugin, "led_psu"),
            Err(PlatformError::SensorsUnavailable)
        ));
    }

    #[test]
    fn test_state_set_writes_selected_string() {
        let mock = MockSensors::with_led_feature("cpld", "led_psu", "none");
        let values = mock.values_handle();
        let plugin = plugin_with_chip(mock);
        let led = constructed_led(&plugin, "led_psu").unwrap();
        let class = plugin.led_class();

        class.state_set(&led, LedState::On, Some(false)).unwrap();
        assert_eq!(values.lock().unwrap()[0], "red");

        class.state_set(&led, LedState::Flashing, None).unwrap();
        assert_eq!(values.lock().unwrap()[0], "green_blink");
    }

    #[test]
    fn test_state_get_reads_good_on() {
        let plugin =
            plugin_with_chip(MockSensors::with_led_feature("cpld", "led_psu", "green"));
        let led = constructed_led(&plugin, "led_psu").unwrap();
        assert_eq!(
            plugin.led_class().state_get(&led).unwrap(),
            (LedState::On, true)
        );
    }

    #[test]
    fn test_state_get_rejects_unknown_value() {
        let plugin =
            plugin_with_chip(MockSensors::with_led_feature("cpld", "led_psu", "purple"));
        let led = constructed_led(&plugin, "led_psu").unwrap();
        assert!(matches!(
            plugin.led_class().state_get(&led),
            Err(PlatformError::UnknownStateValue(_))
        ));
    }

    #[test]
    fn test_mapper_round_trip() {
        let s = settings();
        let pairs = [
            (LedState::On, Some(true)),
            (LedState::On, Some(false)),
            (LedState::Flashing, Some(true)),
            (LedState::Flashing, Some(false)),
        ];
        for (state, good) in pairs {
            let encoded = state_to_value(&s, state, good).unwrap();
            let (decoded, decoded_good) = value_to_state(&s, encoded).unwrap();
            assert_eq!((decoded, Some(decoded_good)), (state, good));
        }
        // OFF has no qualifier; only the state survives the trip.
        let encoded = state_to_value(&s, LedState::Off, None).unwrap();
        assert_eq!(value_to_state(&s, encoded).unwrap().0, LedState::Off);
    }

    #[test]
    fn test_unsupported_combination_is_an_error() {
        let partial = StateSettings {
            good_on: Some("green".into()),
            ..Default::default()
        };
        assert!(state_to_value(&partial, LedState::On, Some(false)).is_none());
        assert!(state_to_value(&partial, LedState::Off, None).is_none());
    }
}
