//! USB Device subsystem - presents a composite device to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  We create a **composite device** with:
//!
//! - Interface 0: Keyboard (boot protocol, with LED output report)
//! - Interfaces 1-2: CDC-ACM serial console
//!
//! Bus lifecycle callbacks and LED reports are turned into
//! [`UsbEvent`]s and queued here; the main loop drains the queue so the
//! device state is only ever mutated from one place.  The same state is
//! also kept as levels, so an overflowing queue can be recovered from.

pub mod hid_device;
pub mod serial;

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use defmt::warn;
use embassy_nrf::peripherals;
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use hidcap::hid::KeyboardLeds;
use hidcap::status::UsbEvent;

/// Concrete USB driver type for this board.
pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

const USB_EVENT_QUEUE: usize = 8;

static USB_EVENTS: Channel<CriticalSectionRawMutex, UsbEvent, USB_EVENT_QUEUE> = Channel::new();
static CONFIGURED: AtomicBool = AtomicBool::new(false);
static SUSPENDED: AtomicBool = AtomicBool::new(false);
static LEDS: AtomicU8 = AtomicU8::new(0);
/// Set when an event was dropped; the queue no longer tells the whole story.
static RESYNC: AtomicBool = AtomicBool::new(false);

/// Receiving end of the USB event queue, drained by the main loop.
pub fn events() -> Receiver<'static, CriticalSectionRawMutex, UsbEvent, USB_EVENT_QUEUE> {
    USB_EVENTS.receiver()
}

/// Host has configured the device and the bus is not suspended.
pub fn host_ready() -> bool {
    CONFIGURED.load(Ordering::Acquire) && !SUSPENDED.load(Ordering::Acquire)
}

/// Bus levels `(configured, suspended, leds)` if events were lost since
/// the last call.  Apply after draining [`events`].
pub fn take_resync() -> Option<(bool, bool, KeyboardLeds)> {
    if !RESYNC.swap(false, Ordering::AcqRel) {
        return None;
    }
    Some((
        CONFIGURED.load(Ordering::Acquire),
        SUSPENDED.load(Ordering::Acquire),
        KeyboardLeds(LEDS.load(Ordering::Acquire)),
    ))
}

fn publish(event: UsbEvent) {
    if let UsbEvent::KeyboardLeds(leds) = event {
        LEDS.store(leds.0, Ordering::Release);
    }
    if USB_EVENTS.try_send(event).is_err() {
        warn!("USB event queue full, dropping {}", event);
        RESYNC.store(true, Ordering::Release);
    }
}

/// Mirrors bus state into atomics and the event queue.
struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        CONFIGURED.store(configured, Ordering::Release);
        publish(if configured {
            UsbEvent::Mounted
        } else {
            UsbEvent::Unmounted
        });
    }

    fn suspended(&mut self, suspended: bool) {
        SUSPENDED.store(suspended, Ordering::Release);
        publish(if suspended {
            UsbEvent::Suspended
        } else {
            UsbEvent::Resumed {
                configured: CONFIGURED.load(Ordering::Acquire),
            }
        });
    }
}
