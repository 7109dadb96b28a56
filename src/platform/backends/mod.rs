/*
 *  platform/backends/mod.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Built-in platform backend implementations
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

// Conditionally compile each backend based on feature flags
#[cfg(feature = "backend-i2c")]
pub mod i2c;

#[cfg(feature = "backend-sysfs")]
pub mod sysfs;

// Recording mock backend, shared by unit and integration tests
pub mod mock;
