//! Top-level controller: owns every piece of mutable state and runs one
//! iteration of the cooperative main loop at a time.
//!
//! USB callbacks never reach in here directly.  They are queued as
//! [`UsbEvent`]s by the firmware and handed over through
//! [`Device::handle_usb_event`] from the same loop that calls
//! [`Device::poll`], so nothing in this struct is ever touched from two
//! contexts.

use crate::capture::{LineCapture, LineEvent};
use crate::config::CAPTURE_FILE;
use crate::console::{self, Serial};
use crate::hid::keyboard::KeyboardLeds;
use crate::hid::sequencer::KeyboardSink;
use crate::scheduler::Scheduler;
use crate::status::{StatusLed, UsbEvent};
use crate::storage::{FileSystem, LogStore};
use crate::trigger::{ScriptIo, Step, TriggerController, DEFAULT_SCRIPT};

pub struct Device<K, S, F, C> {
    keyboard: K,
    sched: S,
    store: LogStore<F>,
    serial: C,
    trigger: TriggerController,
    capture: LineCapture,
    status: StatusLed,
}

impl<K, S, F, C> Device<K, S, F, C>
where
    K: KeyboardSink,
    S: Scheduler,
    F: FileSystem,
    C: Serial,
{
    pub fn new(keyboard: K, sched: S, fs: F, serial: C) -> Self {
        Self::with_script(keyboard, sched, fs, serial, DEFAULT_SCRIPT)
    }

    pub fn with_script(keyboard: K, sched: S, fs: F, serial: C, script: &'static [Step]) -> Self {
        Self {
            keyboard,
            sched,
            store: LogStore::new(fs),
            serial,
            trigger: TriggerController::new(script),
            capture: LineCapture::new(),
            status: StatusLed::new(),
        }
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    pub fn scheduler(&self) -> &S {
        &self.sched
    }

    pub fn store(&self) -> &LogStore<F> {
        &self.store
    }

    pub fn serial(&self) -> &C {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut C {
        &mut self.serial
    }

    pub fn status(&self) -> &StatusLed {
        &self.status
    }

    pub fn trigger(&self) -> &TriggerController {
        &self.trigger
    }

    /// Apply a queued USB lifecycle or LED notification.
    pub fn handle_usb_event(&mut self, event: UsbEvent) {
        self.status.apply(event);
    }

    /// Replace queued-event state with a snapshot of the bus levels.
    pub fn resync_usb(&mut self, configured: bool, suspended: bool, leds: KeyboardLeds) {
        self.status.resync(configured, suspended, leds);
    }

    /// Status LED level right now.
    pub fn led_on(&self) -> bool {
        self.status.led_on(self.sched.now_ms())
    }

    /// One loop iteration: service USB, poll the trigger, service the
    /// serial channel.
    pub async fn poll(&mut self, trigger_asserted: bool) {
        self.sched.step().await;

        let mut io = ScriptIo {
            keyboard: &mut self.keyboard,
            sched: &mut self.sched,
            store: &mut self.store,
            console: &mut self.serial,
        };
        self.trigger.poll(trigger_asserted, &mut io).await;

        self.service_serial().await;
    }

    /// Feed at most one inbound byte to the line buffer and act on it.
    async fn service_serial(&mut self) {
        self.sched.step().await;

        if !self.serial.connected() {
            return;
        }
        let Some(byte) = self.serial.try_read() else {
            return;
        };

        let event = self.capture.feed(byte);
        let echo = event.echo();
        if !echo.is_empty() {
            self.serial.write(echo).await;
        }

        match event {
            LineEvent::LineReady(line) => {
                match self.store.append(&mut self.serial, CAPTURE_FILE, line).await {
                    Ok(()) => console::log(&mut self.serial, "\r\n[OK] Saved to file\r\n").await,
                    Err(_) => {
                        console::log(&mut self.serial, "\r\n[ERR] Storage write failed\r\n").await
                    }
                }
            }
            LineEvent::LineEmpty => console::log(&mut self.serial, "\r\n[!] Empty line\r\n").await,
            LineEvent::None | LineEvent::Echoed(_) | LineEvent::Erased => {}
        }

        self.serial.flush().await;
    }
}
