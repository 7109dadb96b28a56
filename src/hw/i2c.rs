/*
 *  hw/i2c.rs
 *
 *  ledmond - status LEDs for switch platforms
 *  (c) 2024-26 The ledmond authors
 *
 *  Register-access primitive for i2c-attached LED logic
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

use serde::{Deserialize, Serialize};

use crate::hw::HwError;

/// Static description of one writable register slice, taken from the
/// platform's hardware description file.
///
/// `bit_mask` selects the bits within the register that belong to this
/// LED; `None` means the whole register is owned by it. Multi-byte
/// registers are big-endian on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOp {
    /// 7-bit device address on the subsystem's bus.
    pub dev_addr: u8,

    /// Register offset within the device.
    pub register: u8,

    /// Register width in bytes (1..=4).
    #[serde(default = "default_num_bytes")]
    pub num_bytes: u8,

    /// Bits owned by this LED, `None` for the whole register.
    #[serde(default)]
    pub bit_mask: Option<u32>,
}

fn default_num_bytes() -> u8 {
    1
}

impl RegisterOp {
    /// Largest value this descriptor can carry.
    pub fn max_value(&self) -> u32 {
        match self.bit_mask {
            Some(mask) => mask >> mask.trailing_zeros(),
            None => {
                if self.num_bytes >= 4 {
                    u32::MAX
                } else {
                    (1u32 << (self.num_bytes as u32 * 8)) - 1
                }
            }
        }
    }
}

/// The register write primitive the i2c backend issues state changes
/// through. One call maps to one logical register update.
///
/// `subsystem` is carried for diagnostics only; the implementation is
/// already scoped to a single bus.
pub trait RegisterAccess: Send + Sync {
    fn write(&self, subsystem: &str, op: &RegisterOp, value: i64) -> Result<(), HwError>;
}

/// Merge `value` into `current` under `mask`, shifting the value to the
/// mask's lowest set bit.
pub(crate) fn apply_mask(current: u32, mask: u32, value: u32) -> u32 {
    let shift = mask.trailing_zeros();
    (current & !mask) | ((value << shift) & mask)
}

#[cfg(feature = "backend-i2c")]
pub use bus::I2cRegisterBus;

#[cfg(feature = "backend-i2c")]
mod bus {
    use std::sync::Mutex;

    use embedded_hal::i2c::I2c;
    use linux_embedded_hal::I2cdev;
    use log::{debug, warn};

    use super::{apply_mask, RegisterAccess, RegisterOp};
    use crate::hw::HwError;

    /// [`RegisterAccess`] over a Linux i2c character device.
    ///
    /// The device handle is behind a mutex only to satisfy the `Sync`
    /// bound on the seam; the daemon model is single-threaded and the
    /// lock is never contended.
    pub struct I2cRegisterBus {
        path: String,
        dev: Mutex<I2cdev>,
    }

    impl I2cRegisterBus {
        pub fn open(path: &str) -> Result<Self, HwError> {
            let dev = I2cdev::new(path).map_err(|e| HwError::Open {
                path: path.to_string(),
                msg: format!("{e:?}"),
            })?;
            debug!("opened i2c bus {path}");
            Ok(Self {
                path: path.to_string(),
                dev: Mutex::new(dev),
            })
        }

        pub fn path(&self) -> &str {
            &self.path
        }

        fn read_register(
            dev: &mut I2cdev,
            op: &RegisterOp,
            addr: u8,
        ) -> Result<u32, HwError> {
            let mut buf = [0u8; 4];
            let n = op.num_bytes as usize;
            dev.write_read(addr, &[op.register], &mut buf[..n])
                .map_err(|e| HwError::I2c {
                    addr,
                    msg: format!("{e:?}"),
                })?;
            let mut current = 0u32;
            for b in &buf[..n] {
                current = (current << 8) | *b as u32;
            }
            Ok(current)
        }
    }

    impl RegisterAccess for I2cRegisterBus {
        fn write(&self, subsystem: &str, op: &RegisterOp, value: i64) -> Result<(), HwError> {
            if value < 0 || value as u64 > op.max_value() as u64 {
                warn!(
                    "register value {value} out of range for subsystem {subsystem} \
                     (reg 0x{:02x})",
                    op.register
                );
                return Err(HwError::ValueOutOfRange {
                    value,
                    descriptor: format!("0x{:02x}/0x{:02x}", op.dev_addr, op.register),
                });
            }

            let mut dev = self.dev.lock().unwrap_or_else(|e| e.into_inner());

            // Partial-register ops read-modify-write; whole-register ops
            // go straight out.
            let raw = match op.bit_mask {
                Some(mask) => {
                    let current = Self::read_register(&mut dev, op, op.dev_addr)?;
                    apply_mask(current, mask, value as u32)
                }
                None => value as u32,
            };

            let n = op.num_bytes as usize;
            let mut out = [0u8; 5];
            out[0] = op.register;
            for i in 0..n {
                out[1 + i] = (raw >> (8 * (n - 1 - i))) as u8;
            }
            dev.write(op.dev_addr, &out[..=n]).map_err(|e| HwError::I2c {
                addr: op.dev_addr,
                msg: format!("{e:?}"),
            })?;

            debug!(
                "subsystem {subsystem}: wrote 0x{raw:x} to 0x{:02x}/0x{:02x} on {}",
                op.dev_addr, op.register, self.path
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mask_low_bits() {
        assert_eq!(apply_mask(0b1111_0000, 0b0000_0111, 0b101), 0b1111_0101);
    }

    #[test]
    fn test_apply_mask_shifted_field() {
        // Value lands at the mask's lowest set bit.
        assert_eq!(apply_mask(0x00, 0b0011_0000, 0b10), 0b0010_0000);
    }

    #[test]
    fn test_apply_mask_preserves_neighbours() {
        assert_eq!(apply_mask(0b1010_1010, 0b0000_1100, 0b11), 0b1010_1110);
    }

    #[test]
    fn test_max_value_masked() {
        let op = RegisterOp {
            dev_addr: 0x20,
            register: 0x10,
            num_bytes: 1,
            bit_mask: Some(0b0011_1000),
        };
        assert_eq!(op.max_value(), 0b111);
    }

    #[test]
    fn test_max_value_whole_register() {
        let op = RegisterOp {
            dev_addr: 0x20,
            register: 0x10,
            num_bytes: 2,
            bit_mask: None,
        };
        assert_eq!(op.max_value(), 0xffff);
    }

    #[test]
    fn test_register_op_yaml_defaults() {
        let op: RegisterOp = serde_yaml::from_str("dev_addr: 0x20\nregister: 4\n").unwrap();
        assert_eq!(op.num_bytes, 1);
        assert_eq!(op.bit_mask, None);
    }
}
