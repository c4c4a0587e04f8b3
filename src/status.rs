//! USB connection state → status LED blink pattern.
//!
//! - 250 ms  : device not mounted
//! - 1000 ms : device mounted
//! - 2500 ms : bus suspended
//! - steady on while the host reports Caps Lock

use crate::config::{BLINK_MOUNTED_MS, BLINK_NOT_MOUNTED_MS, BLINK_SUSPENDED_MS};
use crate::hid::keyboard::KeyboardLeds;

/// USB device lifecycle as seen by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    NotMounted,
    Mounted,
    Suspended,
}

/// Notifications from the USB stack, applied from the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    Mounted,
    Unmounted,
    Suspended,
    /// Bus resumed; `configured` is whether the host still has us configured.
    Resumed { configured: bool },
    /// LED output report from the host.
    KeyboardLeds(KeyboardLeds),
}

/// Connection state plus the indicator it drives.
#[derive(Debug)]
pub struct StatusLed {
    state: ConnectionState,
    blink_interval_ms: u32,
    steady_on: bool,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::NotMounted,
            blink_interval_ms: BLINK_NOT_MOUNTED_MS,
            steady_on: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current blink interval; `0` means blinking is disabled.
    pub fn blink_interval_ms(&self) -> u32 {
        self.blink_interval_ms
    }

    pub fn apply(&mut self, event: UsbEvent) {
        match event {
            UsbEvent::Mounted => self.set(ConnectionState::Mounted, BLINK_MOUNTED_MS),
            UsbEvent::Unmounted => self.set(ConnectionState::NotMounted, BLINK_NOT_MOUNTED_MS),
            UsbEvent::Suspended => self.set(ConnectionState::Suspended, BLINK_SUSPENDED_MS),
            UsbEvent::Resumed { configured: true } => {
                self.set(ConnectionState::Mounted, BLINK_MOUNTED_MS)
            }
            UsbEvent::Resumed { configured: false } => {
                self.set(ConnectionState::NotMounted, BLINK_NOT_MOUNTED_MS)
            }
            UsbEvent::KeyboardLeds(leds) => {
                if leds.caps_lock() {
                    self.blink_interval_ms = 0;
                    self.steady_on = true;
                } else {
                    self.steady_on = false;
                    self.blink_interval_ms = BLINK_MOUNTED_MS;
                }
            }
        }
    }

    /// Rebuild from current bus levels when queued events were lost.
    /// The LED byte only matters while Caps Lock is on; otherwise the
    /// lifecycle state alone picks the interval.
    pub fn resync(&mut self, configured: bool, suspended: bool, leds: KeyboardLeds) {
        let lifecycle = if suspended {
            UsbEvent::Suspended
        } else if configured {
            UsbEvent::Mounted
        } else {
            UsbEvent::Unmounted
        };
        self.apply(lifecycle);
        self.steady_on = false;
        if leds.caps_lock() {
            self.apply(UsbEvent::KeyboardLeds(leds));
        }
    }

    fn set(&mut self, state: ConnectionState, interval_ms: u32) {
        if self.state != state {
            info!("USB: {} -> {}", self.state, state);
        }
        self.state = state;
        self.blink_interval_ms = interval_ms;
    }

    /// LED level at `now_ms`: toggles every interval, steady when disabled.
    pub fn led_on(&self, now_ms: u64) -> bool {
        if self.blink_interval_ms == 0 {
            return self.steady_on;
        }
        (now_ms / u64::from(self.blink_interval_ms)) % 2 == 1
    }
}
