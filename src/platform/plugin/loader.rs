/*
 *  platform/plugin/loader.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Plugin loader - discovers images and resolves the symbol contract
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

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use log::{debug, info};

use super::ffi::{
    LedClassGetFn, LedmondLedClass, LedmondSubsystemClass, PluginHookFn, SubsystemClassGetFn,
    SYM_LED_CLASS_GET, SYM_PLUGIN_DEINIT, SYM_PLUGIN_INIT, SYM_PLUGIN_RUN, SYM_PLUGIN_WAIT,
    SYM_SUBSYSTEM_CLASS_GET,
};
use crate::platform::error::RegistryError;

/// One successfully opened plugin image: the library (kept alive for
/// the life of the record) plus the resolved entry points.
///
/// The vtable references are valid for as long as `library` is; the
/// registry keeps both together and drops them together.
pub struct PluginImage {
    #[allow(dead_code)]
    library: Library,

    /// Image base filename, verbatim - this is the platform-type key.
    pub platform_type: String,

    pub init: PluginHookFn,
    pub deinit: PluginHookFn,
    pub run: PluginHookFn,
    pub wait: PluginHookFn,
    pub subsystem_class: &'static LedmondSubsystemClass,
    pub led_class: &'static LedmondLedClass,
}

impl std::fmt::Debug for PluginImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginImage")
            .field("platform_type", &self.platform_type)
            .finish_non_exhaustive()
    }
}

/// Plugin loader - searches for and opens plugin images.
pub struct PluginLoader;

impl PluginLoader {
    /// Plugin directories in priority order: environment override,
    /// configured directory, system locations.
    pub fn search_paths(configured: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var("LEDMOND_PLUGIN_PATH") {
            paths.push(PathBuf::from(path));
        }

        if let Some(dir) = configured {
            paths.push(dir.to_path_buf());
        }

        paths.push(PathBuf::from("/usr/local/lib/ledmond/plugins"));
        paths.push(PathBuf::from("/usr/lib/ledmond/plugins"));

        paths
    }

    /// Scan one directory for plugin images.
    ///
    /// Files that fail to open or are missing any of the six required
    /// symbols belong to some other daemon and are skipped silently
    /// (logged at debug). Only an unreadable directory fails the scan.
    pub fn scan(dir: &Path) -> Result<Vec<PluginImage>, RegistryError> {
        let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::SearchPath {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut images = Vec::new();
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        candidates.sort();

        for path in candidates {
            match Self::open(&path) {
                Ok(image) => {
                    info!(
                        "loaded plugin {} from {}",
                        image.platform_type,
                        path.display()
                    );
                    images.push(image);
                }
                Err(reason) => {
                    debug!("skipping {}: {reason}", path.display());
                }
            }
        }

        Ok(images)
    }

    /// Open one candidate image and resolve the full symbol contract.
    ///
    /// The returned error is a skip reason, never a load failure.
    pub fn open(path: &Path) -> Result<PluginImage, String> {
        let platform_type = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| "no file name".to_string())?;

        debug!("loading symbols from {}", path.display());

        let library = unsafe {
            Library::new(path).map_err(|e| format!("failed to load library: {e}"))?
        };

        // All six entry points are required; a missing one means this
        // image is not a ledmond plugin.
        let init = Self::hook(&library, SYM_PLUGIN_INIT)?;
        let deinit = Self::hook(&library, SYM_PLUGIN_DEINIT)?;
        let run = Self::hook(&library, SYM_PLUGIN_RUN)?;
        let wait = Self::hook(&library, SYM_PLUGIN_WAIT)?;

        let subsystem_class_get: SubsystemClassGetFn = unsafe {
            let sym: Symbol<SubsystemClassGetFn> = library
                .get(SYM_SUBSYSTEM_CLASS_GET)
                .map_err(|e| format!("missing ledmond_subsystem_class_get: {e}"))?;
            *sym
        };
        let led_class_get: LedClassGetFn = unsafe {
            let sym: Symbol<LedClassGetFn> = library
                .get(SYM_LED_CLASS_GET)
                .map_err(|e| format!("missing ledmond_led_class_get: {e}"))?;
            *sym
        };

        let subsystem_class_ptr = unsafe { subsystem_class_get() };
        if subsystem_class_ptr.is_null() {
            return Err("subsystem class getter returned null".to_string());
        }
        let led_class_ptr = unsafe { led_class_get() };
        if led_class_ptr.is_null() {
            return Err("led class getter returned null".to_string());
        }

        // SAFETY: the vtables are static data inside the image; they
        // live as long as `library`, which this struct owns.
        let subsystem_class: &'static LedmondSubsystemClass = unsafe { &*subsystem_class_ptr };
        let led_class: &'static LedmondLedClass = unsafe { &*led_class_ptr };

        Ok(PluginImage {
            library,
            platform_type,
            init,
            deinit,
            run,
            wait,
            subsystem_class,
            led_class,
        })
    }

    fn hook(library: &Library, symbol: &[u8]) -> Result<PluginHookFn, String> {
        unsafe {
            let sym: Symbol<PluginHookFn> = library.get(symbol).map_err(|e| {
                format!("missing {}: {e}", String::from_utf8_lossy(&symbol[..symbol.len() - 1]))
            })?;
            Ok(*sym)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_search_paths_include_configured_dir() {
        let paths = PluginLoader::search_paths(Some(Path::new("/opt/ledmond/plugins")));
        assert!(paths.iter().any(|p| p == Path::new("/opt/ledmond/plugins")));
        assert!(paths
            .iter()
            .any(|p| p == Path::new("/usr/lib/ledmond/plugins")));
    }

    #[test]
    fn test_scan_missing_directory_is_fatal() {
        let err = PluginLoader::scan(Path::new("/nonexistent/plugins")).unwrap_err();
        assert!(matches!(err, RegistryError::SearchPath { .. }));
    }

    #[test]
    fn test_scan_skips_non_plugin_files() {
        // A directory holding a file that is not a loadable image must
        // scan cleanly to zero plugins.
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("not-a-plugin.so"), b"junk").unwrap();

        let images = PluginLoader::scan(dir.path()).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_open_reports_skip_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.so");
        fs::write(&path, b"junk").unwrap();
        assert!(PluginLoader::open(&path).is_err());
    }
}
