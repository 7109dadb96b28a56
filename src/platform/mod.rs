/*
 *  platform/mod.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Platform plugin layer - registry, capability traits, backends
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

// Core trait definitions and entity records
pub mod error;
pub mod traits;
pub mod types;

// Plugin registry and dispatch
pub mod registry;

// Built-in backends (conditionally compiled based on features)
pub mod backends;

// Dynamic plugin system (loader/adapter require the plugin-system feature)
pub mod plugin;

// Re-exports for convenience
pub use error::{PlatformError, RegistryError};
pub use registry::PluginRegistry;
pub use traits::{LedClass, PlatformPlugin, SubsystemClass};
pub use types::{Led, LedDesc, LedState, Subsystem, SubsystemDesc};
