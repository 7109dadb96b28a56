/*
 *  platform/plugin/ffi.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  C ABI types for the plugin interface
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

//! FFI types for the ledmond plugin system.
//!
//! This module defines C-compatible types that form the stable ABI
//! between the daemon and out-of-tree plugins. All types use `#[repr(C)]`
//! to ensure consistent memory layout across compilation units.
//!
//! A loadable image must export six symbols:
//!
//! - `ledmond_plugin_init` / `ledmond_plugin_deinit`
//! - `ledmond_plugin_run` / `ledmond_plugin_wait`
//! - `ledmond_subsystem_class_get` -> [`LedmondSubsystemClass`]
//! - `ledmond_led_class_get` -> [`LedmondLedClass`]
//!
//! An image missing any of the six is not a ledmond plugin and is
//! skipped by the loader.

use std::ffi::c_char;
use std::os::raw::c_int;

use crate::platform::types::{Led, LedState, Subsystem};

/// Maximum length for names crossing the ABI (entities, devices).
pub const LEDMOND_NAME_SIZE: usize = 64;

/// Maximum length for one configured state value string.
pub const LEDMOND_VALUE_SIZE: usize = 32;

/// Maximum length for a bus device path.
pub const LEDMOND_PATH_SIZE: usize = 256;

/// Exported symbol names, NUL-terminated for direct symbol lookup.
pub const SYM_PLUGIN_INIT: &[u8] = b"ledmond_plugin_init\0";
pub const SYM_PLUGIN_DEINIT: &[u8] = b"ledmond_plugin_deinit\0";
pub const SYM_PLUGIN_RUN: &[u8] = b"ledmond_plugin_run\0";
pub const SYM_PLUGIN_WAIT: &[u8] = b"ledmond_plugin_wait\0";
pub const SYM_SUBSYSTEM_CLASS_GET: &[u8] = b"ledmond_subsystem_class_get\0";
pub const SYM_LED_CLASS_GET: &[u8] = b"ledmond_led_class_get\0";

/// Opaque handle to a plugin-allocated subsystem instance.
#[repr(C)]
pub struct LedmondSubsystemHandle {
    _private: [u8; 0],
}

/// Opaque handle to a plugin-allocated LED instance.
#[repr(C)]
pub struct LedmondLedHandle {
    _private: [u8; 0],
}

/// LED state across the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedmondLedState {
    On = 0,
    Off = 1,
    Flashing = 2,
}

impl From<LedState> for LedmondLedState {
    fn from(state: LedState) -> Self {
        match state {
            LedState::On => LedmondLedState::On,
            LedState::Off => LedmondLedState::Off,
            LedState::Flashing => LedmondLedState::Flashing,
        }
    }
}

impl From<LedmondLedState> for LedState {
    fn from(state: LedmondLedState) -> Self {
        match state {
            LedmondLedState::On => LedState::On,
            LedmondLedState::Off => LedState::Off,
            LedmondLedState::Flashing => LedState::Flashing,
        }
    }
}

/// Register descriptor across the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LedmondRegisterOp {
    pub dev_addr: u8,
    pub register: u8,
    pub num_bytes: u8,
    pub has_bit_mask: bool,
    pub bit_mask: u32,
}

/// Per-state value strings. An empty buffer means the state (or
/// variant) is not configured; configured values are never empty.
#[repr(C)]
pub struct LedmondStateSettings {
    pub on: [c_char; LEDMOND_VALUE_SIZE],
    pub off: [c_char; LEDMOND_VALUE_SIZE],
    pub flashing: [c_char; LEDMOND_VALUE_SIZE],
    pub good_on: [c_char; LEDMOND_VALUE_SIZE],
    pub bad_on: [c_char; LEDMOND_VALUE_SIZE],
    pub good_flashing: [c_char; LEDMOND_VALUE_SIZE],
    pub bad_flashing: [c_char; LEDMOND_VALUE_SIZE],
}

/// Subsystem configuration passed to the plugin's construct.
#[repr(C)]
pub struct LedmondSubsystemDesc {
    pub name: [c_char; LEDMOND_NAME_SIZE],
    /// Empty when the subsystem has no bus path.
    pub bus: [c_char; LEDMOND_PATH_SIZE],
}

/// LED configuration passed to the plugin's construct.
#[repr(C)]
pub struct LedmondLedDesc {
    pub name: [c_char; LEDMOND_NAME_SIZE],
    pub subsystem: [c_char; LEDMOND_NAME_SIZE],
    /// Empty when the LED has no device name.
    pub device: [c_char; LEDMOND_NAME_SIZE],
    pub has_access: bool,
    pub access: LedmondRegisterOp,
    pub settings: LedmondStateSettings,
}

/// Subsystem capability table. All four slots are required.
#[repr(C)]
pub struct LedmondSubsystemClass {
    pub alloc: extern "C" fn() -> *mut LedmondSubsystemHandle,
    pub construct: extern "C" fn(
        handle: *mut LedmondSubsystemHandle,
        desc: *const LedmondSubsystemDesc,
    ) -> c_int,
    pub destruct: extern "C" fn(handle: *mut LedmondSubsystemHandle),
    pub dealloc: extern "C" fn(handle: *mut LedmondSubsystemHandle),
}

/// LED capability table. The lifecycle quadruple is required;
/// `state_get`/`state_set` are null for platforms that do not provide
/// them.
#[repr(C)]
pub struct LedmondLedClass {
    pub alloc: extern "C" fn() -> *mut LedmondLedHandle,
    pub construct: extern "C" fn(
        handle: *mut LedmondLedHandle,
        desc: *const LedmondLedDesc,
        subsystem: *const LedmondSubsystemHandle,
    ) -> c_int,
    pub destruct: extern "C" fn(handle: *mut LedmondLedHandle),
    pub dealloc: extern "C" fn(handle: *mut LedmondLedHandle),
    pub state_get: Option<
        extern "C" fn(
            handle: *const LedmondLedHandle,
            state: *mut LedmondLedState,
            is_good: *mut bool,
        ) -> c_int,
    >,
    pub state_set: Option<
        extern "C" fn(
            handle: *const LedmondLedHandle,
            state: LedmondLedState,
            is_good: *const bool,
        ) -> c_int,
    >,
}

/// Entry point signatures resolved by the loader.
pub type PluginHookFn = unsafe extern "C" fn();
pub type SubsystemClassGetFn = unsafe extern "C" fn() -> *const LedmondSubsystemClass;
pub type LedClassGetFn = unsafe extern "C" fn() -> *const LedmondLedClass;

/// Copy a Rust string into a fixed NUL-terminated buffer, truncating if
/// needed.
pub fn copy_str(dst: &mut [c_char], src: &str) {
    let bytes = src.as_bytes();
    let len = bytes.len().min(dst.len().saturating_sub(1));
    for (i, &byte) in bytes.iter().take(len).enumerate() {
        dst[i] = byte as c_char;
    }
    for slot in dst.iter_mut().skip(len) {
        *slot = 0;
    }
}

/// Extract a NUL-terminated string from a fixed buffer.
pub fn buffer_str(src: &[c_char]) -> String {
    let len = src.iter().position(|&c| c == 0).unwrap_or(src.len());
    let bytes: Vec<u8> = src[..len].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// `None` for an empty buffer, the extracted string otherwise.
pub fn buffer_opt_str(src: &[c_char]) -> Option<String> {
    let s = buffer_str(src);
    if s.is_empty() { None } else { Some(s) }
}

fn opt_value(dst: &mut [c_char], src: &Option<String>) {
    copy_str(dst, src.as_deref().unwrap_or(""));
}

/// Convert a populated subsystem record to its ABI view.
pub fn subsystem_desc_to_ffi(subsystem: &Subsystem) -> LedmondSubsystemDesc {
    let mut desc = LedmondSubsystemDesc {
        name: [0; LEDMOND_NAME_SIZE],
        bus: [0; LEDMOND_PATH_SIZE],
    };
    copy_str(&mut desc.name, &subsystem.name);
    opt_value(&mut desc.bus, &subsystem.desc.bus);
    desc
}

/// Convert a populated LED record to its ABI view.
pub fn led_desc_to_ffi(led: &Led) -> LedmondLedDesc {
    let mut desc = LedmondLedDesc {
        name: [0; LEDMOND_NAME_SIZE],
        subsystem: [0; LEDMOND_NAME_SIZE],
        device: [0; LEDMOND_NAME_SIZE],
        has_access: false,
        access: LedmondRegisterOp {
            dev_addr: 0,
            register: 0,
            num_bytes: 0,
            has_bit_mask: false,
            bit_mask: 0,
        },
        settings: LedmondStateSettings {
            on: [0; LEDMOND_VALUE_SIZE],
            off: [0; LEDMOND_VALUE_SIZE],
            flashing: [0; LEDMOND_VALUE_SIZE],
            good_on: [0; LEDMOND_VALUE_SIZE],
            bad_on: [0; LEDMOND_VALUE_SIZE],
            good_flashing: [0; LEDMOND_VALUE_SIZE],
            bad_flashing: [0; LEDMOND_VALUE_SIZE],
        },
    };

    copy_str(&mut desc.name, &led.name);
    copy_str(&mut desc.subsystem, &led.subsystem);
    opt_value(&mut desc.device, &led.desc.device);

    if let Some(op) = &led.desc.access {
        desc.has_access = true;
        desc.access = LedmondRegisterOp {
            dev_addr: op.dev_addr,
            register: op.register,
            num_bytes: op.num_bytes,
            has_bit_mask: op.bit_mask.is_some(),
            bit_mask: op.bit_mask.unwrap_or(0),
        };
    }

    let s = &led.desc.settings;
    opt_value(&mut desc.settings.on, &s.on);
    opt_value(&mut desc.settings.off, &s.off);
    opt_value(&mut desc.settings.flashing, &s.flashing);
    opt_value(&mut desc.settings.good_on, &s.good_on);
    opt_value(&mut desc.settings.bad_on, &s.bad_on);
    opt_value(&mut desc.settings.good_flashing, &s.good_flashing);
    opt_value(&mut desc.settings.bad_flashing, &s.bad_flashing);

    desc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateSettings;
    use crate::hw::i2c::RegisterOp;

    #[test]
    fn test_copy_and_extract_roundtrip() {
        let mut buf = [0 as c_char; 16];
        copy_str(&mut buf, "led_psu");
        assert_eq!(buffer_str(&buf), "led_psu");
        assert_eq!(buffer_opt_str(&buf).as_deref(), Some("led_psu"));
    }

    #[test]
    fn test_copy_truncates_and_terminates() {
        let mut buf = [0 as c_char; 4];
        copy_str(&mut buf, "abcdef");
        assert_eq!(buffer_str(&buf), "abc");
    }

    #[test]
    fn test_empty_buffer_is_none() {
        let buf = [0 as c_char; 8];
        assert_eq!(buffer_opt_str(&buf), None);
    }

    #[test]
    fn test_led_desc_conversion() {
        let mut led = Led::new();
        led.name = "psu".into();
        led.subsystem = "base".into();
        led.desc.device = Some("led_psu".into());
        led.desc.access = Some(RegisterOp {
            dev_addr: 0x20,
            register: 0x10,
            num_bytes: 1,
            bit_mask: Some(0x0f),
        });
        led.desc.settings = StateSettings {
            good_on: Some("green".into()),
            ..Default::default()
        };

        let desc = led_desc_to_ffi(&led);
        assert_eq!(buffer_str(&desc.name), "psu");
        assert_eq!(buffer_str(&desc.subsystem), "base");
        assert_eq!(buffer_str(&desc.device), "led_psu");
        assert!(desc.has_access);
        assert!(desc.access.has_bit_mask);
        assert_eq!(desc.access.bit_mask, 0x0f);
        assert_eq!(buffer_str(&desc.settings.good_on), "green");
        assert_eq!(buffer_opt_str(&desc.settings.bad_on), None);
    }

    #[test]
    fn test_state_conversions() {
        for state in [LedState::On, LedState::Off, LedState::Flashing] {
            let ffi: LedmondLedState = state.into();
            assert_eq!(LedState::from(ffi), state);
        }
    }
}
