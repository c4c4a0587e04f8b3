//! Host-testable core of the hidcap firmware.
//!
//! Everything that decides *what* the device does lives here: ASCII →
//! HID mapping, the keystroke sequencer, the trigger script, serial
//! line capture, the mount-per-operation log store and the USB status
//! mirror.  Hardware is reached only through small traits
//! ([`hid::KeyboardSink`], [`scheduler::Scheduler`],
//! [`storage::FileSystem`], [`console::Serial`]) which the embedded
//! binary implements on top of Embassy.
//!
//! Usage: `cargo test --lib` on the host.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is only built with `--features embedded`.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod capture;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod hid;
pub mod scheduler;
pub mod status;
pub mod storage;
pub mod trigger;

pub use device::Device;
pub use error::{FsCode, StorageError, StorageOp};
