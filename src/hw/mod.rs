/*
 *  hw/mod.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Hardware access seams consumed by the platform backends
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

//! Hardware access facilities.
//!
//! The platform backends never touch a bus or a sysfs file directly.
//! They go through two narrow seams defined here:
//!
//! - [`i2c::RegisterAccess`] - one masked register write, scoped to a
//!   subsystem's bus handle.
//! - [`sensors::SensorAccess`] - chip/feature/subfeature enumeration and
//!   string-valued get/set, modeled on the sensors-library view of
//!   `/sys/class/hwmon`.
//!
//! Both seams have a real Linux implementation and are small enough to
//! mock in tests.

pub mod i2c;
pub mod sensors;

use thiserror::Error;

/// Error type for hardware access failures.
///
/// Bus errors carry the failure as text: the underlying HAL error types
/// do not implement `std::error::Error`, so they are formatted at the
/// point of failure.
#[derive(Debug, Error)]
pub enum HwError {
    #[error("failed to open {path}: {msg}")]
    Open { path: String, msg: String },

    #[error("i2c transfer to 0x{addr:02x} failed: {msg}")]
    I2c { addr: u8, msg: String },

    #[error("register value {value} does not fit descriptor {descriptor}")]
    ValueOutOfRange { value: i64, descriptor: String },

    #[error("unknown sensor chip \"{0}\"")]
    UnknownChip(String),

    #[error("chip \"{chip}\" has no subfeature #{number}")]
    UnknownSubfeature { chip: String, number: u32 },

    #[error("sensor read {path}: {msg}")]
    SensorRead { path: String, msg: String },

    #[error("sensor write {path}: {msg}")]
    SensorWrite { path: String, msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
