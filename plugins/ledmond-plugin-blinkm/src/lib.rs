/*
 *  ledmond BlinkM Plugin
 *
 *  An out-of-tree platform plugin for ledmond that drives BlinkM
 *  smart LEDs over the subsystem's i2c bus.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 */

//! # ledmond BlinkM Platform Plugin
//!
//! Drives BlinkM smart LEDs as ledmond status LEDs.
//!
//! ## Behavior
//!
//! - ON maps to a solid color: green when healthy, red when faulty
//! - FLASHING maps to the BlinkM's canned flash scripts (green/red)
//! - OFF stops any running script and blanks the LED
//! - The plugin is write-only: no `state_get` is exported
//!
//! ## Hardware Support
//!
//! - BlinkM / BlinkM MinM on any `/dev/i2c-*` bus
//! - Device address taken from the LED's register descriptor
//!   (`dev_addr`), default 0x09
//!
//! ## Usage
//!
//! Install the built object into the daemon's plugin directory; the
//! platform type is the file name:
//!
//! ```yaml
//! subsystems:
//!   - name: beacon
//!     platform_type: libledmond_plugin_blinkm.so
//!     bus: /dev/i2c-1
//!     leds:
//!       - name: status
//!         type: status
//! ```

mod plugin;

pub use plugin::{
    ledmond_led_class_get, ledmond_plugin_deinit, ledmond_plugin_init, ledmond_plugin_run,
    ledmond_plugin_wait, ledmond_subsystem_class_get,
};
