/*
 *  lib.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
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

//! ledmond - the platform LED plugin layer for switch status daemons.
//!
//! The daemon translates abstract LED states (on/off/flashing, with a
//! good/bad health qualifier) into platform-specific hardware writes.
//! Each platform is a *plugin*: either a built-in backend (i2c register
//! writes, sysfs sensor features) or an out-of-tree shared object
//! loaded at startup. The [`platform::PluginRegistry`] keys plugins by
//! platform-type name and dispatches lifecycle and state calls; the
//! [`manager::EntityManager`] builds the active LED set from the
//! hardware description and owns entity teardown.

pub mod config;
pub mod hw;
pub mod manager;
pub mod platform;

pub use config::{Config, ConfigError, StateSettings};
pub use manager::EntityManager;
pub use platform::{
    Led, LedClass, LedState, PlatformError, PlatformPlugin, PluginRegistry, Subsystem,
    SubsystemClass,
};
