/*
 *  platform/backends/i2c.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Built-in backend for register-mapped LEDs behind an i2c bus
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

//! The i2c platform drives LEDs by writing small integers into CPLD
//! registers described in the hardware description file. It is
//! write-only: there is no reliable way to read a state back out of the
//! shared registers, so the class provides no `state_get`.

use std::sync::Arc;

use log::{error, warn};

use crate::config::StateSettings;
use crate::hw::i2c::{RegisterAccess, RegisterOp};
use crate::hw::HwError;
use crate::platform::error::PlatformError;
use crate::platform::traits::{LedClass, PlatformPlugin, SubsystemClass};
use crate::platform::types::{Led, LedState, Subsystem};

/// Opens a register-access handle for a subsystem's bus path.
pub type BusOpener =
    dyn Fn(&str) -> Result<Arc<dyn RegisterAccess>, HwError> + Send + Sync;

/// Built-in backend for register-mapped LEDs.
pub struct I2cPlugin {
    subsystem_class: Arc<I2cSubsystemClass>,
    led_class: Arc<I2cLedClass>,
}

impl I2cPlugin {
    pub const PLATFORM_TYPE: &'static str = "i2c";

    /// Backend over real `/dev/i2c-*` devices.
    pub fn new() -> Self {
        Self::with_opener(Arc::new(|path: &str| {
            crate::hw::i2c::I2cRegisterBus::open(path)
                .map(|bus| Arc::new(bus) as Arc<dyn RegisterAccess>)
        }))
    }

    /// Backend with a caller-supplied register-access opener. This is
    /// the seam tests hang a recording mock on.
    pub fn with_opener(opener: Arc<BusOpener>) -> Self {
        Self {
            subsystem_class: Arc::new(I2cSubsystemClass { opener }),
            led_class: Arc::new(I2cLedClass),
        }
    }
}

impl Default for I2cPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformPlugin for I2cPlugin {
    fn init(&self) {}

    fn deinit(&self) {}

    fn run(&self) {}

    fn wait(&self) {}

    fn subsystem_class(&self) -> Arc<dyn SubsystemClass> {
        self.subsystem_class.clone()
    }

    fn led_class(&self) -> Arc<dyn LedClass> {
        self.led_class.clone()
    }
}

/// Subsystem payload: the opened bus handle.
struct I2cSubsystem {
    bus: Arc<dyn RegisterAccess>,
}

pub struct I2cSubsystemClass {
    opener: Arc<BusOpener>,
}

impl SubsystemClass for I2cSubsystemClass {
    fn alloc(&self) -> Box<Subsystem> {
        Box::new(Subsystem::new())
    }

    fn construct(&self, subsystem: &mut Subsystem) -> Result<(), PlatformError> {
        let bus_path = subsystem.desc.bus.as_deref().ok_or_else(|| {
            PlatformError::Construction(format!(
                "subsystem {} has no bus path",
                subsystem.name
            ))
        })?;
        let bus = (self.opener)(bus_path)?;
        subsystem.set_payload(Box::new(I2cSubsystem { bus }));
        Ok(())
    }

    fn destruct(&self, subsystem: &mut Subsystem) {
        subsystem.clear_payload();
    }
}

/// LED payload: the subsystem's bus handle, cloned at construction.
struct I2cLed {
    bus: Arc<dyn RegisterAccess>,
}

pub struct I2cLedClass;

impl LedClass for I2cLedClass {
    fn alloc(&self) -> Box<Led> {
        Box::new(Led::new())
    }

    fn construct(&self, led: &mut Led, subsystem: &Subsystem) -> Result<(), PlatformError> {
        let sub = subsystem.payload_ref::<I2cSubsystem>().ok_or_else(|| {
            PlatformError::Construction(format!(
                "subsystem {} is not an i2c subsystem",
                subsystem.name
            ))
        })?;
        led.set_payload(Box::new(I2cLed {
            bus: sub.bus.clone(),
        }));
        Ok(())
    }

    fn destruct(&self, led: &mut Led) {
        led.clear_payload();
    }

    fn has_state_set(&self) -> bool {
        true
    }

    fn state_set(
        &self,
        led: &Led,
        state: LedState,
        is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        let value = if led.desc.settings.is_qualified() {
            qualified_register_value(&led.desc.settings, state, is_good)
        } else {
            register_value(&led.desc.settings, state)
        }
        .inspect_err(|_| {
            warn!(
                "unsupported i2c led state {state:?}(good={is_good:?}) for \
                 subsystem {}, LED {}",
                led.subsystem, led.name
            );
        })?;

        let op = led
            .desc
            .access
            .as_ref()
            .ok_or(PlatformError::MissingRegisterDescriptor)?;
        let payload = led.payload_ref::<I2cLed>().ok_or_else(|| {
            PlatformError::Construction(format!("led {} was not constructed", led.name))
        })?;

        payload
            .bus
            .write(&led.subsystem, op, value)
            .inspect_err(|e| {
                error!(
                    "led state set {value} for {} via i2c failed: {e}",
                    led.name
                );
            })?;
        Ok(())
    }
}

/// Simple mapper: one configured value per state, parsed as an integer.
/// A state with no configured value is unsupported on this platform.
fn register_value(settings: &StateSettings, state: LedState) -> Result<i64, PlatformError> {
    let value = match state {
        LedState::On => settings.on.as_deref(),
        LedState::Off => settings.off.as_deref(),
        LedState::Flashing => settings.flashing.as_deref(),
    };
    let value = value.ok_or(PlatformError::UnsupportedState { state, good: None })?;
    parse_register_value(value)
}

/// Good/bad mapper: ON and FLASHING carry healthy/faulty variants,
/// selected by the qualifier (absent means healthy); OFF has a single
/// value.
fn qualified_register_value(
    settings: &StateSettings,
    state: LedState,
    is_good: Option<bool>,
) -> Result<i64, PlatformError> {
    let good = is_good.unwrap_or(true);
    let value = match state {
        LedState::On if good => settings.good_on.as_deref(),
        LedState::On => settings.bad_on.as_deref(),
        LedState::Flashing if good => settings.good_flashing.as_deref(),
        LedState::Flashing => settings.bad_flashing.as_deref(),
        LedState::Off => settings.off.as_deref(),
    };
    let value = value.ok_or(PlatformError::UnsupportedState {
        state,
        good: is_good,
    })?;
    parse_register_value(value)
}

/// Integer parsing with strtol(3) base-0 semantics: `0x` prefix is hex,
/// a leading `0` is octal, anything else decimal.
fn parse_register_value(s: &str) -> Result<i64, PlatformError> {
    let t = s.trim();
    let (neg, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if t.len() > 1 && t.starts_with('0') {
        i64::from_str_radix(&t[1..], 8)
    } else {
        t.parse::<i64>()
    };
    parsed
        .map(|v| if neg { -v } else { v })
        .map_err(|_| PlatformError::BadRegisterValue(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::backends::mock::MockRegisterAccess;

    fn plain_settings() -> StateSettings {
        StateSettings {
            on: Some("1".into()),
            off: Some("0".into()),
            flashing: Some("5".into()),
            ..Default::default()
        }
    }

    fn qualified_settings() -> StateSettings {
        StateSettings {
            off: Some("0".into()),
            good_on: Some("0x2".into()),
            bad_on: Some("0x3".into()),
            good_flashing: Some("4".into()),
            bad_flashing: Some("5".into()),
            ..Default::default()
        }
    }

    fn constructed_led(settings: StateSettings) -> (Box<Led>, Arc<MockRegisterAccess>) {
        let mock = Arc::new(MockRegisterAccess::default());
        let bus = mock.clone();
        let plugin = I2cPlugin::with_opener(Arc::new(move |_: &str| {
            Ok(bus.clone() as Arc<dyn RegisterAccess>)
        }));
        let sub_class = plugin.subsystem_class();
        let led_class = plugin.led_class();

        let mut sub = sub_class.alloc();
        sub.name = "base".into();
        sub.desc.bus = Some("/dev/i2c-7".into());
        sub_class.construct(&mut sub).unwrap();

        let mut led = led_class.alloc();
        led.name = "fan".into();
        led.subsystem = "base".into();
        led.desc.access = Some(RegisterOp {
            dev_addr: 0x20,
            register: 0x10,
            num_bytes: 1,
            bit_mask: None,
        });
        led.desc.settings = settings;
        led_class.construct(&mut led, &sub).unwrap();
        (led, mock)
    }

    #[test]
    fn test_parse_register_value_bases() {
        assert_eq!(parse_register_value("5").unwrap(), 5);
        assert_eq!(parse_register_value("0x10").unwrap(), 16);
        assert_eq!(parse_register_value("010").unwrap(), 8);
        assert_eq!(parse_register_value("0").unwrap(), 0);
        assert!(parse_register_value("green").is_err());
    }

    #[test]
    fn test_simple_flashing_writes_five() {
        let (led, mock) = constructed_led(plain_settings());
        let class = I2cLedClass;

        class.state_set(&led, LedState::Flashing, None).unwrap();
        assert_eq!(mock.writes(), vec![("base".to_string(), 5)]);
    }

    #[test]
    fn test_simple_unconfigured_state_writes_nothing() {
        let settings = StateSettings {
            on: Some("1".into()),
            off: Some("0".into()),
            ..Default::default()
        };
        let (led, mock) = constructed_led(settings);
        let class = I2cLedClass;

        let err = class.state_set(&led, LedState::Flashing, None).unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedState { .. }));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_qualified_selects_bad_on() {
        let (led, mock) = constructed_led(qualified_settings());
        let class = I2cLedClass;

        class.state_set(&led, LedState::On, Some(false)).unwrap();
        assert_eq!(mock.writes(), vec![("base".to_string(), 3)]);
    }

    #[test]
    fn test_qualified_defaults_to_good() {
        let (led, mock) = constructed_led(qualified_settings());
        let class = I2cLedClass;

        class.state_set(&led, LedState::On, None).unwrap();
        assert_eq!(mock.writes(), vec![("base".to_string(), 2)]);
    }

    #[test]
    fn test_led_class_is_write_only() {
        let class = I2cLedClass;
        assert!(!class.has_state_get());
        assert!(class.has_state_set());
        let (led, _) = constructed_led(plain_settings());
        assert!(matches!(
            class.state_get(&led),
            Err(PlatformError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_construct_requires_i2c_subsystem() {
        let class = I2cLedClass;
        let sub = Subsystem::new(); // never constructed, no payload
        let mut led = Led::new();
        assert!(class.construct(&mut led, &sub).is_err());
    }
}
