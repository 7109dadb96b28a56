/*
 *  platform/traits.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Capability traits every platform backend implements
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

use std::sync::Arc;

use crate::platform::error::PlatformError;
use crate::platform::types::{Led, LedState, Subsystem};

/// Lifecycle operations for one hardware subsystem.
///
/// The quadruple is asymmetric on purpose: `alloc`/`dealloc` always
/// succeed, `construct` can fail (the caller must then `dealloc` the
/// unusable instance), `destruct` cannot and is called exactly once per
/// constructed instance.
pub trait SubsystemClass: Send + Sync {
    /// Produce a fresh subsystem record. The caller fills in `name` and
    /// `desc` before constructing.
    fn alloc(&self) -> Box<Subsystem>;

    /// Bind the subsystem to its hardware (open a bus, resolve
    /// handles). On error the instance is unusable.
    fn construct(&self, subsystem: &mut Subsystem) -> Result<(), PlatformError>;

    /// Release runtime-bound state.
    fn destruct(&self, subsystem: &mut Subsystem);

    /// Release storage. Never fails.
    fn dealloc(&self, subsystem: Box<Subsystem>) {
        drop(subsystem);
    }
}

/// Lifecycle plus state access for one LED.
///
/// `state_get`/`state_set` are optional capabilities: a write-only
/// platform leaves `state_get` at its default, which reports the
/// operation as not provided. [`has_state_get`]/[`has_state_set`]
/// advertise what the table actually implements.
///
/// [`has_state_get`]: LedClass::has_state_get
/// [`has_state_set`]: LedClass::has_state_set
pub trait LedClass: Send + Sync {
    fn alloc(&self) -> Box<Led>;

    /// Bind the LED against its subsystem's hardware. A failure means
    /// the LED must not enter the daemon's active set.
    fn construct(&self, led: &mut Led, subsystem: &Subsystem) -> Result<(), PlatformError>;

    fn destruct(&self, led: &mut Led);

    fn dealloc(&self, led: Box<Led>) {
        drop(led);
    }

    fn has_state_get(&self) -> bool {
        false
    }

    fn has_state_set(&self) -> bool {
        false
    }

    /// Read the LED state back from hardware, with its good/bad
    /// qualifier. OFF reports the qualifier as `false`; it carries no
    /// health meaning there.
    fn state_get(&self, _led: &Led) -> Result<(LedState, bool), PlatformError> {
        Err(PlatformError::NotImplemented("state_get"))
    }

    /// Drive the LED. `is_good` selects the healthy/faulty variant for
    /// ON and FLASHING; `None` means healthy.
    fn state_set(
        &self,
        _led: &Led,
        _state: LedState,
        _is_good: Option<bool>,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented("state_set"))
    }
}

/// One platform backend as the registry sees it: the four daemon hooks
/// plus the two capability-table accessors.
///
/// The accessors must hand out the same table on every call; lookups
/// through the registry return exactly the `Arc` the backend supplied.
pub trait PlatformPlugin: Send + Sync {
    /// Called once after registration. Failures stay inside the plugin:
    /// log and continue degraded, never abort the daemon.
    fn init(&self);

    /// Called once at shutdown.
    fn deinit(&self);

    /// Per-cycle work, invoked from the daemon's poll loop. Must not
    /// block indefinitely.
    fn run(&self);

    /// Per-cycle wait hook, invoked after `run` each cycle.
    fn wait(&self);

    fn subsystem_class(&self) -> Arc<dyn SubsystemClass>;

    fn led_class(&self) -> Arc<dyn LedClass>;
}
