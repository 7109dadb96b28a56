/*
 *  main.rs
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use log::info;

use ledmond::config;
use ledmond::manager::EntityManager;
use ledmond::platform::PluginRegistry;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signum: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    // Flag-only handler; the poll loop notices on its next cycle.
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as usize);
        libc::signal(libc::SIGTERM, handle_signal as usize);
    }
}

/// Load out-of-tree plugins. An explicitly configured directory must be
/// readable; the default locations are optional.
#[cfg(feature = "plugin-system")]
fn load_plugins(registry: &mut PluginRegistry, cfg: &ledmond::Config) -> anyhow::Result<()> {
    use ledmond::platform::plugin::PluginLoader;
    use log::debug;

    let explicit = std::env::var_os("LEDMOND_PLUGIN_PATH").is_some() || cfg.plugin_path.is_some();
    for dir in PluginLoader::search_paths(cfg.plugin_path.as_deref()) {
        // When a directory was explicitly named it is the head of the
        // list, and an unreadable path must propagate as an error.
        if !dir.exists() && !explicit {
            debug!("plugin path {} does not exist, skipping", dir.display());
            continue;
        }
        let count = registry
            .load(&dir)
            .with_context(|| format!("loading plugins from {}", dir.display()))?;
        debug!("loaded {count} plugin(s) from {}", dir.display());
        // First usable directory wins; platform types are keyed by
        // filename and scanning multiple roots invites shadowing.
        break;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    let level = cfg.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!(
        "ledmond {} (built {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_DATE
    );

    let mut registry = PluginRegistry::with_builtins();

    #[cfg(feature = "plugin-system")]
    load_plugins(&mut registry, &cfg)?;

    if registry.is_empty() {
        anyhow::bail!("no platform plugins available");
    }
    info!(
        "platform plugins: {}",
        registry.platform_types().collect::<Vec<_>>().join(", ")
    );

    registry.init_all();

    let manager = EntityManager::build(&registry, &cfg);
    info!(
        "managing {} led(s) across {} subsystem(s)",
        manager.led_count(),
        manager.subsystem_count()
    );
    manager.apply_initial_states();

    install_signal_handlers();

    // Single-threaded cooperative poll loop: one run/wait pair per
    // cycle across all plugins.
    let interval = Duration::from_millis(cfg.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS));
    while !SHUTDOWN.load(Ordering::SeqCst) {
        registry.run_all();
        registry.wait_all();
        std::thread::sleep(interval);
    }

    info!("shutting down");
    manager.shutdown();
    registry.deinit_all();
    registry.unload();

    Ok(())
}
