/*
 *  hw/sensors.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Sensor-detection primitive over /sys/class/hwmon
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

//! Chip/feature/subfeature enumeration the sysfs backend resolves LEDs
//! against.
//!
//! The model follows the sensors-library view of the world: a *chip* is
//! one hwmon device, a *feature* is one named data point group on it
//! (`led1`, `fan2`, ...), and a *subfeature* is one attribute file of a
//! feature addressed by a number the implementation hands out during
//! detection. Values cross the seam as strings; interpretation belongs
//! to the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::hw::HwError;

/// Default detection root on a running switch.
pub const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Feature category, derived from the attribute name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Led,
    Fan,
    Temp,
    Other,
}

/// Role of one attribute file within its feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubfeatureKind {
    /// Writable control point (`*_output`).
    Output,
    /// Measured input (`*_input`).
    Input,
    Other,
}

#[derive(Debug, Clone)]
pub struct Subfeature {
    pub kind: SubfeatureKind,
    /// Access number for [`SensorAccess::get_value`]/[`set_value`],
    /// assigned by the detecting implementation.
    pub number: u32,
}

#[derive(Debug, Clone)]
pub struct Feature {
    /// Label contents when the feature carries a `*_label` attribute,
    /// the raw attribute prefix (`led1`) otherwise.
    pub name: String,
    pub kind: FeatureKind,
    pub subfeatures: Vec<Subfeature>,
}

impl Feature {
    pub fn subfeature(&self, kind: SubfeatureKind) -> Option<&Subfeature> {
        self.subfeatures.iter().find(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub struct Chip {
    pub name: String,
    pub features: Vec<Feature>,
    /// Index into the detecting implementation's chip table.
    pub(crate) index: usize,
}

/// Enumeration + string-valued access, as the sysfs backend consumes it.
pub trait SensorAccess: Send + Sync {
    /// All chips detected when the handle was created.
    fn chips(&self) -> &[Chip];

    /// Read a subfeature value as a trimmed string.
    fn get_value(&self, chip: &Chip, subfeature: u32) -> Result<String, HwError>;

    /// Write a subfeature value.
    fn set_value(&self, chip: &Chip, subfeature: u32, value: &str) -> Result<(), HwError>;
}

/// [`SensorAccess`] over a scan of `/sys/class/hwmon`.
///
/// Detection happens once at construction; the chip table is frozen
/// afterwards, matching the sensors-library init-then-iterate model.
pub struct SysfsSensors {
    chips: Vec<Chip>,
    /// Per chip, subfeature number -> attribute path.
    attrs: Vec<Vec<PathBuf>>,
}

impl SysfsSensors {
    pub fn detect() -> Result<Self, HwError> {
        Self::detect_at(Path::new(DEFAULT_HWMON_ROOT))
    }

    /// Scan `root` for hwmon device directories. The root must be
    /// readable; an empty root yields an empty chip table.
    pub fn detect_at(root: &Path) -> Result<Self, HwError> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut chips = Vec::new();
        let mut attrs = Vec::new();
        for dir in dirs {
            let index = chips.len();
            match Self::scan_chip(&dir, index) {
                Ok((chip, files)) => {
                    debug!(
                        "detected chip {} with {} feature(s)",
                        chip.name,
                        chip.features.len()
                    );
                    chips.push(chip);
                    attrs.push(files);
                }
                Err(e) => warn!("skipping hwmon entry {}: {e}", dir.display()),
            }
        }

        Ok(Self { chips, attrs })
    }

    fn scan_chip(dir: &Path, index: usize) -> Result<(Chip, Vec<PathBuf>), HwError> {
        let chip_name = fs::read_to_string(dir.join("name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        // Group attribute files by their feature prefix: "led1_output"
        // belongs to feature "led1".
        let mut groups: BTreeMap<String, Vec<(String, PathBuf)>> = BTreeMap::new();
        for path in files {
            let Some(stem) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let Some((prefix, suffix)) = stem.split_once('_') else {
                continue;
            };
            if !prefix.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            groups
                .entry(prefix.to_string())
                .or_default()
                .push((suffix.to_string(), path));
        }

        let mut features = Vec::new();
        let mut attr_table = Vec::new();
        for (prefix, members) in groups {
            let kind = feature_kind(&prefix);
            let mut name = prefix.clone();
            let mut subfeatures = Vec::new();
            for (suffix, path) in members {
                if suffix == "label" {
                    if let Ok(label) = fs::read_to_string(&path) {
                        let label = label.trim();
                        if !label.is_empty() {
                            name = label.to_string();
                        }
                    }
                    continue;
                }
                let number = attr_table.len() as u32;
                attr_table.push(path);
                subfeatures.push(Subfeature {
                    kind: subfeature_kind(&suffix),
                    number,
                });
            }
            features.push(Feature {
                name,
                kind,
                subfeatures,
            });
        }

        Ok((
            Chip {
                name: chip_name,
                features,
                index,
            },
            attr_table,
        ))
    }

    fn attr_path(&self, chip: &Chip, subfeature: u32) -> Result<&Path, HwError> {
        let table = self
            .attrs
            .get(chip.index)
            .ok_or_else(|| HwError::UnknownChip(chip.name.clone()))?;
        table
            .get(subfeature as usize)
            .map(|p| p.as_path())
            .ok_or_else(|| HwError::UnknownSubfeature {
                chip: chip.name.clone(),
                number: subfeature,
            })
    }
}

impl SensorAccess for SysfsSensors {
    fn chips(&self) -> &[Chip] {
        &self.chips
    }

    fn get_value(&self, chip: &Chip, subfeature: u32) -> Result<String, HwError> {
        let path = self.attr_path(chip, subfeature)?;
        fs::read_to_string(path)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| HwError::SensorRead {
                path: path.display().to_string(),
                msg: e.to_string(),
            })
    }

    fn set_value(&self, chip: &Chip, subfeature: u32, value: &str) -> Result<(), HwError> {
        let path = self.attr_path(chip, subfeature)?;
        fs::write(path, value).map_err(|e| HwError::SensorWrite {
            path: path.display().to_string(),
            msg: e.to_string(),
        })
    }
}

fn feature_kind(prefix: &str) -> FeatureKind {
    let alpha: String = prefix.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match alpha.as_str() {
        "led" => FeatureKind::Led,
        "fan" | "pwm" => FeatureKind::Fan,
        "temp" => FeatureKind::Temp,
        _ => FeatureKind::Other,
    }
}

fn subfeature_kind(suffix: &str) -> SubfeatureKind {
    match suffix {
        "output" => SubfeatureKind::Output,
        "input" => SubfeatureKind::Input,
        _ => SubfeatureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_chip(dir: &Path, name: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("name"), format!("{name}\n")).unwrap();
        for (file, contents) in files {
            fs::write(dir.join(file), contents).unwrap();
        }
    }

    #[test]
    fn test_detect_leds_and_labels() {
        let root = tempfile::tempdir().unwrap();
        fake_chip(
            &root.path().join("hwmon0"),
            "switch_cpld",
            &[
                ("led1_label", "led_psu\n"),
                ("led1_output", "off\n"),
                ("fan1_input", "4800\n"),
            ],
        );

        let sensors = SysfsSensors::detect_at(root.path()).unwrap();
        assert_eq!(sensors.chips().len(), 1);

        let chip = &sensors.chips()[0];
        assert_eq!(chip.name, "switch_cpld");

        let led = chip
            .features
            .iter()
            .find(|f| f.kind == FeatureKind::Led)
            .unwrap();
        assert_eq!(led.name, "led_psu");
        assert!(led.subfeature(SubfeatureKind::Output).is_some());

        let fan = chip
            .features
            .iter()
            .find(|f| f.kind == FeatureKind::Fan)
            .unwrap();
        assert_eq!(fan.name, "fan1");
    }

    #[test]
    fn test_get_and_set_value() {
        let root = tempfile::tempdir().unwrap();
        fake_chip(
            &root.path().join("hwmon0"),
            "switch_cpld",
            &[("led1_output", "off\n")],
        );

        let sensors = SysfsSensors::detect_at(root.path()).unwrap();
        let chip = &sensors.chips()[0];
        let output = chip.features[0].subfeature(SubfeatureKind::Output).unwrap();

        assert_eq!(sensors.get_value(chip, output.number).unwrap(), "off");
        sensors.set_value(chip, output.number, "green").unwrap();
        assert_eq!(sensors.get_value(chip, output.number).unwrap(), "green");
    }

    #[test]
    fn test_unknown_subfeature_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        fake_chip(&root.path().join("hwmon0"), "c", &[("led1_output", "off")]);

        let sensors = SysfsSensors::detect_at(root.path()).unwrap();
        let chip = &sensors.chips()[0];
        assert!(matches!(
            sensors.get_value(chip, 99),
            Err(HwError::UnknownSubfeature { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        assert!(SysfsSensors::detect_at(Path::new("/nonexistent/hwmon")).is_err());
    }
}
