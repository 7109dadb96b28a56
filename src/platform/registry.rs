/*
 *  platform/registry.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Name-indexed plugin registry and dispatch
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

//! The plugin table: every platform backend the daemon can dispatch to,
//! keyed by platform-type string.
//!
//! The registry is an explicit object, built once at startup and passed
//! by reference to whoever needs lookups - there is no ambient global.
//! Built-in backends register directly; out-of-tree images arrive
//! through [`load`](PluginRegistry::load). Lookup is a linear scan and
//! the first exact match wins, so a duplicate key shadows rather than
//! replaces.

use std::sync::Arc;

use log::{info, warn};

use crate::platform::traits::{LedClass, PlatformPlugin, SubsystemClass};

#[cfg(feature = "plugin-system")]
use std::path::Path;

#[cfg(feature = "plugin-system")]
use crate::platform::error::RegistryError;
#[cfg(feature = "plugin-system")]
use crate::platform::plugin::{LoadedPluginAdapter, PluginLoader};

struct PluginRecord {
    platform_type: String,
    plugin: Arc<dyn PlatformPlugin>,
}

/// Registry of platform plugins, keyed by platform-type name.
#[derive(Default)]
pub struct PluginRegistry {
    records: Vec<PluginRecord>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in backends the crate was
    /// compiled with.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "backend-i2c")]
        registry.register(
            crate::platform::backends::i2c::I2cPlugin::PLATFORM_TYPE,
            Arc::new(crate::platform::backends::i2c::I2cPlugin::new()),
        );

        #[cfg(feature = "backend-sysfs")]
        registry.register(
            crate::platform::backends::sysfs::SysfsPlugin::PLATFORM_TYPE,
            Arc::new(crate::platform::backends::sysfs::SysfsPlugin::new()),
        );

        registry
    }

    /// Add one backend under `platform_type`. Duplicate keys are not
    /// rejected; the earlier record shadows the later one on lookup.
    pub fn register(&mut self, platform_type: impl Into<String>, plugin: Arc<dyn PlatformPlugin>) {
        let platform_type = platform_type.into();
        if self.records.iter().any(|r| r.platform_type == platform_type) {
            warn!("platform type {platform_type} registered twice; first one wins on lookup");
        }
        info!("registered platform plugin {platform_type}");
        self.records.push(PluginRecord {
            platform_type,
            plugin,
        });
    }

    /// Scan `dir` and register every image that satisfies the symbol
    /// contract. Unsuitable images are skipped; only an unreadable
    /// directory is an error, and no image from a failed scan is kept.
    ///
    /// Returns the number of plugins loaded.
    #[cfg(feature = "plugin-system")]
    pub fn load(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        let images = PluginLoader::scan(dir)?;
        let count = images.len();
        for image in images {
            let adapter = LoadedPluginAdapter::new(image);
            let platform_type = adapter.platform_type().to_string();
            self.register(platform_type, Arc::new(adapter));
        }
        Ok(count)
    }

    /// Drop every record, releasing loaded images. Call once at
    /// shutdown, after `deinit_all`.
    pub fn unload(&mut self) {
        self.records.clear();
    }

    /// Invoke `init` on every plugin, in registration order. Plugin
    /// failures stay inside the plugin (log and degrade); nothing is
    /// reported upward.
    pub fn init_all(&self) {
        for record in &self.records {
            record.plugin.init();
        }
    }

    pub fn deinit_all(&self) {
        for record in &self.records {
            record.plugin.deinit();
        }
    }

    /// One poll-cycle `run` across all plugins.
    pub fn run_all(&self) {
        for record in &self.records {
            record.plugin.run();
        }
    }

    /// One poll-cycle `wait` across all plugins.
    pub fn wait_all(&self) {
        for record in &self.records {
            record.plugin.wait();
        }
    }

    /// Capability table lookup; first exact match wins.
    pub fn subsystem_class(&self, platform_type: &str) -> Option<Arc<dyn SubsystemClass>> {
        self.records
            .iter()
            .find(|r| r.platform_type == platform_type)
            .map(|r| r.plugin.subsystem_class())
    }

    /// Capability table lookup; first exact match wins.
    pub fn led_class(&self, platform_type: &str) -> Option<Arc<dyn LedClass>> {
        self.records
            .iter()
            .find(|r| r.platform_type == platform_type)
            .map(|r| r.plugin.led_class())
    }

    pub fn platform_types(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.platform_type.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::backends::mock::MockPlatform;

    #[test]
    fn test_lookup_returns_registered_tables() {
        let plugin = Arc::new(MockPlatform::new());
        let expected_sub = plugin.subsystem_class();
        let expected_led = plugin.led_class();

        let mut registry = PluginRegistry::new();
        registry.register("mock", plugin);

        let sub = registry.subsystem_class("mock").unwrap();
        let led = registry.led_class("mock").unwrap();
        assert!(Arc::ptr_eq(&sub, &expected_sub));
        assert!(Arc::ptr_eq(&led, &expected_led));
    }

    #[test]
    fn test_lookup_unknown_platform_type() {
        let mut registry = PluginRegistry::new();
        registry.register("mock", Arc::new(MockPlatform::new()));

        assert!(registry.subsystem_class("pci").is_none());
        assert!(registry.led_class("pci").is_none());
        // Match is exact, not prefix.
        assert!(registry.led_class("moc").is_none());
        assert!(registry.led_class("mock2").is_none());
    }

    #[test]
    fn test_dispatch_reaches_every_plugin() {
        let a = Arc::new(MockPlatform::new());
        let b = Arc::new(MockPlatform::new());
        let state_a = a.state.clone();
        let state_b = b.state.clone();

        let mut registry = PluginRegistry::new();
        registry.register("a", a);
        registry.register("b", b);

        registry.init_all();
        registry.run_all();
        registry.run_all();
        registry.wait_all();
        registry.deinit_all();

        for state in [state_a, state_b] {
            let s = state.lock().unwrap();
            assert_eq!(s.init_count, 1);
            assert_eq!(s.run_count, 2);
            assert_eq!(s.wait_count, 1);
            assert_eq!(s.deinit_count, 1);
        }
    }

    #[test]
    fn test_duplicate_key_first_wins() {
        let first = Arc::new(MockPlatform::new());
        let expected = first.led_class();

        let mut registry = PluginRegistry::new();
        registry.register("mock", first);
        registry.register("mock", Arc::new(MockPlatform::new()));

        assert_eq!(registry.len(), 2);
        let led = registry.led_class("mock").unwrap();
        assert!(Arc::ptr_eq(&led, &expected));
    }

    #[test]
    fn test_unload_clears_records() {
        let mut registry = PluginRegistry::new();
        registry.register("mock", Arc::new(MockPlatform::new()));
        assert!(!registry.is_empty());

        registry.unload();
        assert!(registry.is_empty());
        assert!(registry.led_class("mock").is_none());
    }
}
