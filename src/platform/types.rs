/*
 *  platform/types.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Common entity records shared by every platform backend
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

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::config::StateSettings;
use crate::hw::i2c::RegisterOp;

/// Visible state of one status LED.
///
/// ON and FLASHING additionally carry a good/bad qualifier at the call
/// sites that need it; OFF has no healthy/faulty variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedState {
    On,
    Off,
    Flashing,
}

/// Configuration slice a backend needs to drive one LED, populated from
/// the hardware description before construction.
#[derive(Debug, Clone, Default)]
pub struct LedDesc {
    /// Sensor feature name to resolve against (sysfs platforms).
    pub device: Option<String>,

    /// Register descriptor (i2c platforms).
    pub access: Option<RegisterOp>,

    /// Per-state hardware values.
    pub settings: StateSettings,
}

/// Configuration slice for one hardware subsystem.
#[derive(Debug, Clone, Default)]
pub struct SubsystemDesc {
    /// Bus device path for platforms that need one (e.g. "/dev/i2c-7").
    pub bus: Option<String>,
}

/// One status LED.
///
/// The record itself is plugin-agnostic. Whatever a backend binds at
/// construction time (a bus handle, a resolved chip reference) lives in
/// the opaque payload and is only ever downcast by the owning backend.
#[derive(Default)]
pub struct Led {
    pub name: String,
    /// Name of the owning subsystem.
    pub subsystem: String,
    pub desc: LedDesc,
    payload: Option<Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Led {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Led")
            .field("name", &self.name)
            .field("subsystem", &self.subsystem)
            .field("desc", &self.desc)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

impl Led {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_payload(&mut self, payload: Box<dyn Any + Send + Sync>) {
        self.payload = Some(payload);
    }

    pub fn payload_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref())
    }

    pub fn payload_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.payload.as_mut().and_then(|p| p.downcast_mut())
    }

    pub fn clear_payload(&mut self) {
        self.payload = None;
    }
}

/// One hardware subsystem (a board, a fan tray, a PSU bank) whose LEDs
/// are governed by a single platform type.
#[derive(Default)]
pub struct Subsystem {
    pub name: String,
    pub desc: SubsystemDesc,
    payload: Option<Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subsystem")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

impl Subsystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_payload(&mut self, payload: Box<dyn Any + Send + Sync>) {
        self.payload = Some(payload);
    }

    pub fn payload_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref())
    }

    pub fn payload_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.payload.as_mut().and_then(|p| p.downcast_mut())
    }

    pub fn clear_payload(&mut self) {
        self.payload = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_state_yaml_names() {
        let s: LedState = serde_yaml::from_str("flashing").unwrap();
        assert_eq!(s, LedState::Flashing);
        assert_eq!(serde_yaml::to_string(&LedState::On).unwrap().trim(), "on");
    }

    #[test]
    fn test_payload_roundtrip() {
        let mut led = Led::new();
        led.set_payload(Box::new(42u32));
        assert_eq!(led.payload_ref::<u32>(), Some(&42));
        assert_eq!(led.payload_ref::<String>(), None);
        led.clear_payload();
        assert_eq!(led.payload_ref::<u32>(), None);
    }
}
