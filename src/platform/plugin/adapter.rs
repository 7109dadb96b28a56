/*
 *  platform/plugin/adapter.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Plugin adapter - wraps C ABI plugins as Rust trait objects
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

//! Bridges one loaded image to the [`PlatformPlugin`] trait family so
//! the registry dispatches built-in and dynamic plugins identically.
//!
//! Entity instances handed out by a plugin live behind opaque handles;
//! the handle travels in the common record's payload slot, and only the
//! adapter created by the owning image ever dereferences it. Panic
//! isolation is the plugin's job: the exported wrappers are expected to
//! catch unwinds before they cross the ABI.

use std::sync::Arc;

use crate::platform::error::PlatformError;
use crate::platform::plugin::ffi::{
    led_desc_to_ffi, subsystem_desc_to_ffi, LedmondLedHandle, LedmondLedState,
    LedmondSubsystemHandle,
};
use crate::platform::plugin::loader::PluginImage;
use crate::platform::traits::{LedClass, PlatformPlugin, SubsystemClass};
use crate::platform::types::{Led, LedState, Subsystem};

/// Payload stored on subsystems owned by a dynamic plugin.
struct RawSubsystemHandle(*mut LedmondSubsystemHandle);

// SAFETY: handles are only dereferenced by the owning plugin through
// its vtable, and the daemon model is single-threaded; the payload
// merely carries the pointer between calls.
unsafe impl Send for RawSubsystemHandle {}
unsafe impl Sync for RawSubsystemHandle {}

/// Payload stored on LEDs owned by a dynamic plugin.
struct RawLedHandle(*mut LedmondLedHandle);

// SAFETY: as for RawSubsystemHandle.
unsafe impl Send for RawLedHandle {}
unsafe impl Sync for RawLedHandle {}

/// [`PlatformPlugin`] over one loaded image.
pub struct LoadedPluginAdapter {
    image: Arc<PluginImage>,
    subsystem_class: Arc<FfiSubsystemClass>,
    led_class: Arc<FfiLedClass>,
}

impl LoadedPluginAdapter {
    pub fn new(image: PluginImage) -> Self {
        let image = Arc::new(image);
        Self {
            subsystem_class: Arc::new(FfiSubsystemClass {
                image: image.clone(),
            }),
            led_class: Arc::new(FfiLedClass {
                image: image.clone(),
            }),
            image,
        }
    }

    pub fn platform_type(&self) -> &str {
        &self.image.platform_type
    }
}

impl PlatformPlugin for LoadedPluginAdapter {
    fn init(&self) {
        unsafe { (self.image.init)() }
    }

    fn deinit(&self) {
        unsafe { (self.image.deinit)() }
    }

    fn run(&self) {
        unsafe { (self.image.run)() }
    }

    fn wait(&self) {
        unsafe { (self.image.wait)() }
    }

    fn subsystem_class(&self) -> Arc<dyn SubsystemClass> {
        self.subsystem_class.clone()
    }

    fn led_class(&self) -> Arc<dyn LedClass> {
        self.led_class.clone()
    }
}

struct FfiSubsystemClass {
    image: Arc<PluginImage>,
}

impl FfiSubsystemClass {
    fn handle(&self, subsystem: &Subsystem) -> Result<*mut LedmondSubsystemHandle, PlatformError> {
        subsystem
            .payload_ref::<RawSubsystemHandle>()
            .map(|h| h.0)
            .filter(|h| !h.is_null())
            .ok_or_else(|| {
                PlatformError::Construction(format!(
                    "subsystem {} does not belong to plugin {}",
                    subsystem.name, self.image.platform_type
                ))
            })
    }
}

impl SubsystemClass for FfiSubsystemClass {
    fn alloc(&self) -> Box<Subsystem> {
        let handle = (self.image.subsystem_class.alloc)();
        let mut subsystem = Subsystem::new();
        subsystem.set_payload(Box::new(RawSubsystemHandle(handle)));
        Box::new(subsystem)
    }

    fn construct(&self, subsystem: &mut Subsystem) -> Result<(), PlatformError> {
        let handle = self.handle(subsystem)?;
        let desc = subsystem_desc_to_ffi(subsystem);
        let rc = (self.image.subsystem_class.construct)(handle, &desc);
        if rc != 0 {
            return Err(PlatformError::PluginCall {
                op: "subsystem_construct",
                code: rc,
            });
        }
        Ok(())
    }

    fn destruct(&self, subsystem: &mut Subsystem) {
        if let Ok(handle) = self.handle(subsystem) {
            (self.image.subsystem_class.destruct)(handle);
        }
    }

    fn dealloc(&self, mut subsystem: Box<Subsystem>) {
        if let Ok(handle) = self.handle(&subsystem) {
            subsystem.clear_payload();
            (self.image.subsystem_class.dealloc)(handle);
        }
    }
}

struct FfiLedClass {
    image: Arc<PluginImage>,
}

impl FfiLedClass {
    fn handle(&self, led: &Led) -> Result<*mut LedmondLedHandle, PlatformError> {
        led.payload_ref::<RawLedHandle>()
            .map(|h| h.0)
            .filter(|h| !h.is_null())
            .ok_or_else(|| {
                PlatformError::Construction(format!(
                    "led {} does not belong to plugin {}",
                    led.name, self.image.platform_type
                ))
            })
    }
}

impl LedClass for FfiLedClass {
    fn alloc(&self) -> Box<Led> {
        let handle = (self.image.led_class.alloc)();
        let mut led = Led::new();
        led.set_payload(Box::new(RawLedHandle(handle)));
        Box::new(led)
    }

    fn construct(&self, led: &mut Led, subsystem: &Subsystem) -> Result<(), PlatformError> {
        let handle = self.handle(led)?;
        let sub_handle = subsystem
            .payload_ref::<RawSubsystemHandle>()
            .map(|h| h.0)
            .ok_or_else(|| {
                PlatformError::Construction(format!(
                    "subsystem {} does not belong to plugin {}",
                    subsystem.name, self.image.platform_type
                ))
            })?;
        let desc = led_desc_to_ffi(led);
        let rc = (self.image.led_class.construct)(handle, &desc, sub_handle);
        if rc != 0 {
            return Err(PlatformError::PluginCall {
                op: "led_construct",
                code: rc,
            });
        }
        Ok(())
    }

    fn destruct(&self, led: &mut Led) {
        if let Ok(handle) = self.handle(led) {
            (self.image.led_class.destruct)(handle);
        }
    }

    fn dealloc(&self, mut led: Box<Led>) {
        if let Ok(handle) = self.handle(&led) {
            led.clear_payload();
            (self.image.led_class.dealloc)(handle);
        }
    }

    fn has_state_get(&self) -> bool {
        self.image.led_class.state_get.is_some()
    }

    fn has_state_set(&self) -> bool {
        self.image.led_class.state_set.is_some()
    }

    fn state_get(&self, led: &Led) -> Result<(LedState, bool), PlatformError> {
        let get = self
            .image
            .led_class
            .state_get
            .ok_or(PlatformError::NotImplemented("state_get"))?;
        let handle = self.handle(led)?;

        let mut state = LedmondLedState::Off;
        let mut is_good = false;
        let rc = get(handle, &mut state, &mut is_good);
        if rc != 0 {
            return Err(PlatformError::PluginCall {
                op: "led_state_get",
                code: rc,
            });
        }
        Ok((state.into(), is_good))
    }

    fn state_set(
        &self,
        led: &Led,
        state: LedState,
        is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        let set = self
            .image
            .led_class
            .state_set
            .ok_or(PlatformError::NotImplemented("state_set"))?;
        let handle = self.handle(led)?;

        let qualifier = is_good;
        let rc = set(
            handle,
            state.into(),
            qualifier
                .as_ref()
                .map(|g| g as *const bool)
                .unwrap_or(std::ptr::null()),
        );
        if rc != 0 {
            return Err(PlatformError::PluginCall {
                op: "led_state_set",
                code: rc,
            });
        }
        Ok(())
    }
}
