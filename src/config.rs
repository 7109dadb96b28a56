use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::hw::i2c::RegisterOp;
use crate::platform::types::LedState;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Per-state hardware values for one LED type, verbatim from the
/// hardware description. Unset means the state (or variant) is not
/// supported on this platform.
///
/// The plain trio drives the simple mapper; the good/bad quartet, when
/// present, switches the mapper to qualified selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSettings {
    pub on: Option<String>,
    pub off: Option<String>,
    pub flashing: Option<String>,
    pub good_on: Option<String>,
    pub bad_on: Option<String>,
    pub good_flashing: Option<String>,
    pub bad_flashing: Option<String>,
}

impl StateSettings {
    /// Whether this type carries healthy/faulty variants.
    pub fn is_qualified(&self) -> bool {
        self.good_on.is_some()
            || self.bad_on.is_some()
            || self.good_flashing.is_some()
            || self.bad_flashing.is_some()
    }
}

/// Named LED type: a reusable settings block LEDs refer to by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedTypeConfig {
    pub name: String,
    pub settings: StateSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    pub name: String,
    /// Sensor feature name (sysfs platforms).
    pub device: Option<String>,
    /// Reference into `led_types`.
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Inline settings, overriding the type reference.
    pub settings: Option<StateSettings>,
    /// Register descriptor (i2c platforms).
    pub access: Option<RegisterOp>,
    /// State applied once at startup.
    pub initial_state: Option<LedState>,
    pub initial_good: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub name: String,
    /// Registry key selecting the governing plugin.
    pub platform_type: String,
    /// Bus device path for platforms that need one.
    pub bus: Option<String>,
    #[serde(default)]
    pub leds: Vec<LedConfig>,
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub log_level: Option<String>, // e.g., "info" | "debug"
    pub poll_interval_ms: Option<u64>,
    /// Directory scanned for out-of-tree plugin images.
    pub plugin_path: Option<PathBuf>,
    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,
    #[serde(default)]
    pub led_types: Vec<LedTypeConfig>,
}

impl Config {
    pub fn led_type(&self, name: &str) -> Option<&LedTypeConfig> {
        self.led_types.iter().find(|t| t.name == name)
    }

    /// Effective settings for one LED: inline block first, then the
    /// type reference.
    pub fn led_settings(&self, led: &LedConfig) -> Option<StateSettings> {
        if let Some(s) = &led.settings {
            return Some(s.clone());
        }
        led.type_name
            .as_deref()
            .and_then(|n| self.led_type(n))
            .map(|t| t.settings.clone())
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "ledmond", about = "ledmond - status LEDs for switch platforms")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    /// Directory scanned for plugin images
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub plugin_path: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();

    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, &cli);

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Parse a YAML document directly; used by tests and tools.
pub fn from_yaml_str(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/ledmond/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/ledmond/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/ledmond.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    // system-wide
    let p = PathBuf::from("/etc/ledmond/config.yaml");
    if p.exists() {
        return Some(p);
    }
    // project local
    for candidate in &["ledmond.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option. Entity lists
/// replace wholesale; merging individual LEDs across layers is not
/// worth the ambiguity.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() {
        dst.log_level = src.log_level;
    }
    if src.poll_interval_ms.is_some() {
        dst.poll_interval_ms = src.poll_interval_ms;
    }
    if src.plugin_path.is_some() {
        dst.plugin_path = src.plugin_path;
    }
    if !src.subsystems.is_empty() {
        dst.subsystems = src.subsystems;
    }
    if !src.led_types.is_empty() {
        dst.led_types = src.led_types;
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.poll_interval_ms.is_some() {
        cfg.poll_interval_ms = cli.poll_interval_ms;
    }
    if cli.plugin_path.is_some() {
        cfg.plugin_path = cli.plugin_path.clone();
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    for sub in &cfg.subsystems {
        if sub.name.is_empty() {
            return Err(ConfigError::Validation("subsystem with empty name".into()));
        }
        if sub.platform_type.is_empty() {
            return Err(ConfigError::Validation(format!(
                "subsystem {} has no platform_type",
                sub.name
            )));
        }
        for led in &sub.leds {
            if led.name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "led with empty name in subsystem {}",
                    sub.name
                )));
            }
            if let Some(t) = led.type_name.as_deref() {
                if cfg.led_type(t).is_none() {
                    return Err(ConfigError::Validation(format!(
                        "led {}/{} references unknown type {}",
                        sub.name, led.name, t
                    )));
                }
            }
            if led.settings.is_none() && led.type_name.is_none() {
                return Err(ConfigError::Validation(format!(
                    "led {}/{} has neither a type nor inline settings",
                    sub.name, led.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_level: debug
poll_interval_ms: 2000
led_types:
  - name: status
    settings:
      good_on: "green"
      bad_on: "red"
      good_flashing: "green_blink"
      bad_flashing: "red_blink"
      off: "none"
subsystems:
  - name: base
    platform_type: sysfs
    leds:
      - name: psu
        device: led_psu
        type: status
        initial_state: "on"
"#;

    #[test]
    fn test_sample_roundtrip() {
        let cfg = from_yaml_str(SAMPLE).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.subsystems.len(), 1);
        let led = &cfg.subsystems[0].leds[0];
        assert_eq!(led.initial_state, Some(LedState::On));
        let settings = cfg.led_settings(led).unwrap();
        assert!(settings.is_qualified());
        assert_eq!(settings.good_on.as_deref(), Some("green"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let bad = r#"
subsystems:
  - name: base
    platform_type: i2c
    leds:
      - name: fan
        type: nonexistent
"#;
        assert!(matches!(
            from_yaml_str(bad),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_led_without_settings_rejected() {
        let bad = r#"
subsystems:
  - name: base
    platform_type: i2c
    leds:
      - name: fan
"#;
        assert!(from_yaml_str(bad).is_err());
    }

    #[test]
    fn test_inline_settings_override_type() {
        let yaml = r#"
led_types:
  - name: t
    settings:
      on: "1"
subsystems:
  - name: base
    platform_type: i2c
    leds:
      - name: fan
        type: t
        settings:
          on: "2"
"#;
        let cfg = from_yaml_str(yaml).unwrap();
        let led = &cfg.subsystems[0].leds[0];
        assert_eq!(cfg.led_settings(led).unwrap().on.as_deref(), Some("2"));
    }

    #[test]
    fn test_qualified_detection() {
        let plain = StateSettings {
            on: Some("1".into()),
            off: Some("0".into()),
            flashing: Some("5".into()),
            ..Default::default()
        };
        assert!(!plain.is_qualified());

        let qualified = StateSettings {
            good_on: Some("green".into()),
            ..Default::default()
        };
        assert!(qualified.is_qualified());
    }
}
