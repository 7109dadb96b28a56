/*
 *  platform/error.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Error types for the platform plugin layer
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

use std::path::PathBuf;

use thiserror::Error;

use crate::hw::HwError;
use crate::platform::types::LedState;

/// Failures surfaced by platform backends during entity construction
/// and state access. None of these are fatal to the daemon; the caller
/// decides whether to drop the entity or retry next cycle.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The configuration carries no value for this state (state
    /// unsupported on this platform).
    #[error("state {state:?} (good={good:?}) is not supported by this configuration")]
    UnsupportedState {
        state: LedState,
        good: Option<bool>,
    },

    /// The hardware reported a string matching none of the configured
    /// state values.
    #[error("unrecognized hardware state value \"{0}\"")]
    UnknownStateValue(String),

    /// A configured state value failed integer parsing.
    #[error("configured register value \"{0}\" is not an integer")]
    BadRegisterValue(String),

    #[error("led has no register descriptor")]
    MissingRegisterDescriptor,

    #[error("led has no device name")]
    MissingDeviceName,

    /// Sysfs construction: no detected chip exposes a matching LED
    /// feature.
    #[error("no sensor chip exposes an led feature named \"{0}\"")]
    NoMatchingChip(String),

    /// Sysfs construction: the matched feature has no output control
    /// point.
    #[error("led feature \"{0}\" has no output subfeature")]
    NoOutputSubfeature(String),

    /// The sensors facility failed to initialize; the backend runs
    /// degraded and constructs nothing.
    #[error("sensors facility is not initialized")]
    SensorsUnavailable,

    /// Write-only (or read-only) capability table.
    #[error("{0} is not provided by this platform")]
    NotImplemented(&'static str),

    #[error("construction failed: {0}")]
    Construction(String),

    /// A dynamically loaded plugin returned a non-zero status.
    #[error("plugin call {op} failed with status {code}")]
    PluginCall { op: &'static str, code: i32 },

    #[error(transparent)]
    Hw(#[from] HwError),
}

/// Infrastructure failures from [`PluginRegistry::load`]. Per-image
/// problems are skips, never errors; only the surrounding machinery can
/// fail the whole load.
///
/// [`PluginRegistry::load`]: crate::platform::registry::PluginRegistry::load
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin search path {path}: {source}")]
    SearchPath {
        path: PathBuf,
        source: std::io::Error,
    },
}
