/*
 *  ledmond BlinkM Plugin - implementation and C ABI exports
 */

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;

use ledmond::platform::plugin::ffi::{
    buffer_opt_str, LedmondLedClass, LedmondLedDesc, LedmondLedHandle, LedmondLedState,
    LedmondSubsystemClass, LedmondSubsystemDesc, LedmondSubsystemHandle,
};

/// Returned status codes, errno-flavored.
const OK: i32 = 0;
const EIO: i32 = 5;
const EFAULT: i32 = 14;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;

/// Factory default BlinkM address.
const DEFAULT_ADDR: u8 = 0x09;

/// BlinkM command set (datasheet section "Command Overview").
const CMD_GO_TO_COLOR: u8 = b'c';
const CMD_PLAY_SCRIPT: u8 = b'p';
const CMD_STOP_SCRIPT: u8 = b'o';

/// Canned light scripts.
const SCRIPT_RED_FLASH: u8 = 3;
const SCRIPT_GREEN_FLASH: u8 = 4;

struct BlinkmSubsystem {
    bus: Option<Mutex<I2cdev>>,
}

struct BlinkmLed {
    addr: u8,
    subsystem: *const BlinkmSubsystem,
}

impl BlinkmLed {
    fn send(&self, payload: &[u8]) -> i32 {
        // The subsystem outlives its LEDs; the daemon destructs LEDs
        // first.
        let subsystem = unsafe {
            match self.subsystem.as_ref() {
                Some(s) => s,
                None => return EFAULT,
            }
        };
        let Some(bus) = subsystem.bus.as_ref() else {
            return ENODEV;
        };
        let mut dev = bus.lock().unwrap_or_else(|e| e.into_inner());
        match dev.write(self.addr, payload) {
            Ok(()) => OK,
            Err(_) => EIO,
        }
    }

    fn apply(&self, state: LedmondLedState, good: bool) -> i32 {
        match state {
            LedmondLedState::On => {
                let rc = self.send(&[CMD_STOP_SCRIPT]);
                if rc != OK {
                    return rc;
                }
                let (r, g, b) = if good { (0, 0xff, 0) } else { (0xff, 0, 0) };
                self.send(&[CMD_GO_TO_COLOR, r, g, b])
            }
            LedmondLedState::Off => {
                let rc = self.send(&[CMD_STOP_SCRIPT]);
                if rc != OK {
                    return rc;
                }
                self.send(&[CMD_GO_TO_COLOR, 0, 0, 0])
            }
            LedmondLedState::Flashing => {
                let script = if good { SCRIPT_GREEN_FLASH } else { SCRIPT_RED_FLASH };
                // 0 repeats = loop forever, start at line 0.
                self.send(&[CMD_PLAY_SCRIPT, script, 0, 0])
            }
        }
    }
}

macro_rules! catch_panic {
    ($code:block) => {
        match catch_unwind(AssertUnwindSafe(|| $code)) {
            Ok(rc) => rc,
            Err(_) => EFAULT,
        }
    };
}

extern "C" fn subsystem_alloc() -> *mut LedmondSubsystemHandle {
    let subsystem = Box::new(BlinkmSubsystem { bus: None });
    Box::into_raw(subsystem) as *mut LedmondSubsystemHandle
}

extern "C" fn subsystem_construct(
    handle: *mut LedmondSubsystemHandle,
    desc: *const LedmondSubsystemDesc,
) -> i32 {
    catch_panic!({
        if handle.is_null() || desc.is_null() {
            return EFAULT;
        }
        let subsystem = unsafe { &mut *(handle as *mut BlinkmSubsystem) };
        let desc = unsafe { &*desc };

        let Some(bus_path) = buffer_opt_str(&desc.bus) else {
            return EINVAL;
        };
        match I2cdev::new(&bus_path) {
            Ok(dev) => {
                subsystem.bus = Some(Mutex::new(dev));
                OK
            }
            Err(_) => ENODEV,
        }
    })
}

extern "C" fn subsystem_destruct(handle: *mut LedmondSubsystemHandle) {
    if !handle.is_null() {
        let subsystem = unsafe { &mut *(handle as *mut BlinkmSubsystem) };
        subsystem.bus = None;
    }
}

extern "C" fn subsystem_dealloc(handle: *mut LedmondSubsystemHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle as *mut BlinkmSubsystem));
        }
    }
}

extern "C" fn led_alloc() -> *mut LedmondLedHandle {
    let led = Box::new(BlinkmLed {
        addr: DEFAULT_ADDR,
        subsystem: std::ptr::null(),
    });
    Box::into_raw(led) as *mut LedmondLedHandle
}

extern "C" fn led_construct(
    handle: *mut LedmondLedHandle,
    desc: *const LedmondLedDesc,
    subsystem: *const LedmondSubsystemHandle,
) -> i32 {
    catch_panic!({
        if handle.is_null() || desc.is_null() || subsystem.is_null() {
            return EFAULT;
        }
        let led = unsafe { &mut *(handle as *mut BlinkmLed) };
        let desc = unsafe { &*desc };

        led.addr = if desc.has_access {
            desc.access.dev_addr
        } else {
            DEFAULT_ADDR
        };
        led.subsystem = subsystem as *const BlinkmSubsystem;

        // The bus must already be up; a LED on an unconstructed
        // subsystem is unusable.
        let sub = unsafe { &*led.subsystem };
        if sub.bus.is_none() {
            return ENODEV;
        }
        OK
    })
}

extern "C" fn led_destruct(handle: *mut LedmondLedHandle) {
    if !handle.is_null() {
        let led = unsafe { &mut *(handle as *mut BlinkmLed) };
        led.subsystem = std::ptr::null();
    }
}

extern "C" fn led_dealloc(handle: *mut LedmondLedHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle as *mut BlinkmLed));
        }
    }
}

extern "C" fn led_state_set(
    handle: *const LedmondLedHandle,
    state: LedmondLedState,
    is_good: *const bool,
) -> i32 {
    catch_panic!({
        if handle.is_null() {
            return EFAULT;
        }
        let led = unsafe { &*(handle as *const BlinkmLed) };
        // Absent qualifier means healthy.
        let good = if is_good.is_null() {
            true
        } else {
            unsafe { *is_good }
        };
        led.apply(state, good)
    })
}

static SUBSYSTEM_CLASS: LedmondSubsystemClass = LedmondSubsystemClass {
    alloc: subsystem_alloc,
    construct: subsystem_construct,
    destruct: subsystem_destruct,
    dealloc: subsystem_dealloc,
};

// Write-only platform: state_get stays null.
static LED_CLASS: LedmondLedClass = LedmondLedClass {
    alloc: led_alloc,
    construct: led_construct,
    destruct: led_destruct,
    dealloc: led_dealloc,
    state_get: None,
    state_set: Some(led_state_set),
};

#[no_mangle]
pub extern "C" fn ledmond_plugin_init() {
    #[cfg(feature = "debug-logging")]
    log::debug!("blinkm plugin initialized");
}

#[no_mangle]
pub extern "C" fn ledmond_plugin_deinit() {}

#[no_mangle]
pub extern "C" fn ledmond_plugin_run() {}

#[no_mangle]
pub extern "C" fn ledmond_plugin_wait() {}

#[no_mangle]
pub extern "C" fn ledmond_subsystem_class_get() -> *const LedmondSubsystemClass {
    &SUBSYSTEM_CLASS
}

#[no_mangle]
pub extern "C" fn ledmond_led_class_get() -> *const LedmondLedClass {
    &LED_CLASS
}
