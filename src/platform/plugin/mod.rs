/*
 *  platform/plugin/mod.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Dynamic plugin system for platform backends
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

//! Dynamic plugin system for ledmond platform backends.
//!
//! Out-of-tree platforms ship as shared objects exporting a fixed
//! six-symbol contract. The system has three layers:
//!
//! 1. **FFI layer** (`ffi.rs`) - C ABI types for the stable interface
//! 2. **Loader** (`loader.rs`) - discovers images, resolves the symbols
//! 3. **Adapter** (`adapter.rs`) - wraps images as the same trait
//!    objects the built-in backends implement
//!
//! An image missing any required symbol is treated as belonging to some
//! other daemon and skipped without error; the platform-type key for a
//! loaded image is its base filename, verbatim.

pub mod ffi;

#[cfg(feature = "plugin-system")]
pub mod adapter;
#[cfg(feature = "plugin-system")]
pub mod loader;

#[cfg(feature = "plugin-system")]
pub use adapter::LoadedPluginAdapter;
#[cfg(feature = "plugin-system")]
pub use loader::{PluginImage, PluginLoader};
