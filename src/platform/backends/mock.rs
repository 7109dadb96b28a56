/*
 *  platform/backends/mock.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Recording mock backend and hardware seams for tests
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

//! Test doubles for the platform layer: a recording register-access
//! handle, a canned sensors handle, and a full mock platform plugin
//! with counters and failure injection. Kept as a regular module so the
//! integration suite can use them too.

use std::sync::{Arc, Mutex};

use crate::hw::i2c::{RegisterAccess, RegisterOp};
use crate::hw::sensors::{
    Chip, Feature, FeatureKind, SensorAccess, Subfeature, SubfeatureKind,
};
use crate::hw::HwError;
use crate::platform::error::PlatformError;
use crate::platform::traits::{LedClass, PlatformPlugin, SubsystemClass};
use crate::platform::types::{Led, LedState, Subsystem};

/// Records every register write instead of touching a bus.
#[derive(Default)]
pub struct MockRegisterAccess {
    writes: Mutex<Vec<(String, i64)>>,
    pub fail_writes: bool,
}

impl MockRegisterAccess {
    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    /// (subsystem, value) pairs in write order.
    pub fn writes(&self) -> Vec<(String, i64)> {
        self.writes.lock().unwrap().clone()
    }
}

impl RegisterAccess for MockRegisterAccess {
    fn write(&self, subsystem: &str, _op: &RegisterOp, value: i64) -> Result<(), HwError> {
        if self.fail_writes {
            return Err(HwError::I2c {
                addr: 0,
                msg: "injected failure".into(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((subsystem.to_string(), value));
        Ok(())
    }
}

/// Canned single-chip sensors handle. Subfeature numbers index into the
/// shared value vector.
pub struct MockSensors {
    chips: Vec<Chip>,
    values: Arc<Mutex<Vec<String>>>,
}

impl MockSensors {
    /// One chip exposing one LED feature with an output subfeature
    /// holding `initial`, plus an unrelated fan feature.
    pub fn with_led_feature(chip_name: &str, feature_name: &str, initial: &str) -> Self {
        let features = vec![
            Feature {
                name: "fan1".into(),
                kind: FeatureKind::Fan,
                subfeatures: vec![Subfeature {
                    kind: SubfeatureKind::Input,
                    number: 1,
                }],
            },
            Feature {
                name: feature_name.into(),
                kind: FeatureKind::Led,
                subfeatures: vec![Subfeature {
                    kind: SubfeatureKind::Output,
                    number: 0,
                }],
            },
        ];
        Self {
            chips: vec![Chip {
                name: chip_name.into(),
                features,
                index: 0,
            }],
            values: Arc::new(Mutex::new(vec![initial.to_string(), "4800".to_string()])),
        }
    }

    /// One chip whose LED feature has no output control point.
    pub fn with_output_less_led(chip_name: &str, feature_name: &str) -> Self {
        Self {
            chips: vec![Chip {
                name: chip_name.into(),
                features: vec![Feature {
                    name: feature_name.into(),
                    kind: FeatureKind::Led,
                    subfeatures: Vec::new(),
                }],
                index: 0,
            }],
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the backing values, for asserting writes.
    pub fn values_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.values.clone()
    }
}

impl SensorAccess for MockSensors {
    fn chips(&self) -> &[Chip] {
        &self.chips
    }

    fn get_value(&self, chip: &Chip, subfeature: u32) -> Result<String, HwError> {
        self.values
            .lock()
            .unwrap()
            .get(subfeature as usize)
            .cloned()
            .ok_or(HwError::UnknownSubfeature {
                chip: chip.name.clone(),
                number: subfeature,
            })
    }

    fn set_value(&self, chip: &Chip, subfeature: u32, value: &str) -> Result<(), HwError> {
        let mut values = self.values.lock().unwrap();
        match values.get_mut(subfeature as usize) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(HwError::UnknownSubfeature {
                chip: chip.name.clone(),
                number: subfeature,
            }),
        }
    }
}

/// Shared observable state of a [`MockPlatform`].
#[derive(Debug)]
pub struct MockPlatformState {
    pub init_count: usize,
    pub deinit_count: usize,
    pub run_count: usize,
    pub wait_count: usize,
    pub constructed_subsystems: usize,
    pub constructed_leds: usize,
    pub destructed_leds: usize,
    pub last_set: Option<(String, LedState, Option<bool>)>,

    /// Failure injection.
    pub fail_led_construct: bool,
    /// Value returned by `state_get`.
    pub reported: (LedState, bool),
}

impl Default for MockPlatformState {
    fn default() -> Self {
        Self {
            init_count: 0,
            deinit_count: 0,
            run_count: 0,
            wait_count: 0,
            constructed_subsystems: 0,
            constructed_leds: 0,
            destructed_leds: 0,
            last_set: None,
            fail_led_construct: false,
            reported: (LedState::Off, false),
        }
    }
}

/// A complete in-memory platform plugin for registry and manager tests.
pub struct MockPlatform {
    pub state: Arc<Mutex<MockPlatformState>>,
    subsystem_class: Arc<MockSubsystemClass>,
    led_class: Arc<MockLedClass>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(MockPlatformState::default()));
        Self {
            subsystem_class: Arc::new(MockSubsystemClass {
                state: state.clone(),
            }),
            led_class: Arc::new(MockLedClass {
                state: state.clone(),
            }),
            state,
        }
    }
}

impl PlatformPlugin for MockPlatform {
    fn init(&self) {
        self.state.lock().unwrap().init_count += 1;
    }

    fn deinit(&self) {
        self.state.lock().unwrap().deinit_count += 1;
    }

    fn run(&self) {
        self.state.lock().unwrap().run_count += 1;
    }

    fn wait(&self) {
        self.state.lock().unwrap().wait_count += 1;
    }

    fn subsystem_class(&self) -> Arc<dyn SubsystemClass> {
        self.subsystem_class.clone()
    }

    fn led_class(&self) -> Arc<dyn LedClass> {
        self.led_class.clone()
    }
}

pub struct MockSubsystemClass {
    state: Arc<Mutex<MockPlatformState>>,
}

impl SubsystemClass for MockSubsystemClass {
    fn alloc(&self) -> Box<Subsystem> {
        Box::new(Subsystem::new())
    }

    fn construct(&self, _subsystem: &mut Subsystem) -> Result<(), PlatformError> {
        self.state.lock().unwrap().constructed_subsystems += 1;
        Ok(())
    }

    fn destruct(&self, _subsystem: &mut Subsystem) {}
}

pub struct MockLedClass {
    state: Arc<Mutex<MockPlatformState>>,
}

impl LedClass for MockLedClass {
    fn alloc(&self) -> Box<Led> {
        Box::new(Led::new())
    }

    fn construct(&self, led: &mut Led, _subsystem: &Subsystem) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_led_construct {
            return Err(PlatformError::Construction(format!(
                "injected construct failure for {}",
                led.name
            )));
        }
        state.constructed_leds += 1;
        Ok(())
    }

    fn destruct(&self, _led: &mut Led) {
        self.state.lock().unwrap().destructed_leds += 1;
    }

    fn has_state_get(&self) -> bool {
        true
    }

    fn has_state_set(&self) -> bool {
        true
    }

    fn state_get(&self, _led: &Led) -> Result<(LedState, bool), PlatformError> {
        Ok(self.state.lock().unwrap().reported)
    }

    fn state_set(
        &self,
        led: &Led,
        state: LedState,
        is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        self.state.lock().unwrap().last_set = Some((led.name.clone(), state, is_good));
        Ok(())
    }
}
