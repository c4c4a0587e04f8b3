//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "hidcap";
pub const USB_PRODUCT: &str = "HID Injector + Serial Logger";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Max packet size of the CDC-ACM bulk endpoints.
pub const CDC_MAX_PACKET_SIZE: u16 = 64;

/// Longest wait for the host to take one CDC packet before console
/// output is dropped (ms).
pub const CDC_WRITE_TIMEOUT_MS: u64 = 50;

// Keystroke timing

/// Settle delay after every HID report so the host poll picks it up (ms).
///
/// Dropping this below the host polling interval loses keystrokes.
pub const REPORT_SETTLE_MS: u64 = 10;

/// Pacing between two injected characters (ms). Must exceed the settle delay.
pub const CHAR_PACING_MS: u64 = 20;

/// Pause between script steps that wait for the host UI (ms).
pub const SCRIPT_STEP_DELAY_MS: u64 = 1000;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Trigger button → P0.11 (active-low, internal pull-up)
//   Status LED     → P0.13 (active-low)

// Serial line capture

/// Size of the line buffer including the reserved terminator slot.
pub const MAX_LINE_LENGTH: usize = 128;

/// Bytes read from storage per chunk when replaying a file.
pub const CHUNK_SIZE: usize = 128;

/// Capacity of a single formatted console message.
pub const LOG_MESSAGE_CAPACITY: usize = 128;

// Files

/// Operational log written by the trigger self-test.
pub const LOG_FILE: &str = "log.txt";

/// Destination for lines captured from the serial console.
pub const CAPTURE_FILE: &str = "input.txt";

// Status LED blink intervals (ms)

pub const BLINK_NOT_MOUNTED_MS: u32 = 250;
pub const BLINK_MOUNTED_MS: u32 = 1000;
pub const BLINK_SUSPENDED_MS: u32 = 2500;

// File storage

/// Flash page index where file storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for each named file.
pub const STORAGE_PAGES_PER_FILE: u32 = 8;
