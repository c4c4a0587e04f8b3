//! Text → timed press/release report stream.
//!
//! Every mapped character becomes exactly one press report followed by
//! exactly one all-zero release report, so the host never sees a key
//! held into the next keystroke.  Each report is followed by
//! [`REPORT_SETTLE_MS`] and each character by [`CHAR_PACING_MS`], both
//! spent servicing USB.  Emission is fire-and-forget: the sink never
//! reports failure back here and nothing is retried.

use crate::config::{CHAR_PACING_MS, REPORT_SETTLE_MS};
use crate::hid::keyboard::{modifier, KeyboardReport};
use crate::hid::keycode::{self, key, KeyMapping};
use crate::scheduler::{wait_ms, wait_until, Scheduler};

/// Destination for keyboard input reports (the HID IN endpoint).
#[allow(async_fn_in_trait)]
pub trait KeyboardSink {
    /// Host has configured the device and can take reports.
    fn ready(&self) -> bool;

    /// Queue one report for the host.
    async fn send(&mut self, report: &KeyboardReport);
}

/// How `\n` is typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Newline {
    /// Plain ENTER (submits in most host applications).
    Enter,
    /// Shift+ENTER (inserts a line break in chat boxes and editors).
    ShiftEnter,
}

/// Type `text` as plain keystrokes.
pub async fn inject<K: KeyboardSink, S: Scheduler>(keyboard: &mut K, sched: &mut S, text: &str) {
    type_bytes(keyboard, sched, text.as_bytes(), Newline::Enter).await
}

/// Type `text`, sending every `\n` as Shift+ENTER.
pub async fn inject_shift_enter<K: KeyboardSink, S: Scheduler>(
    keyboard: &mut K,
    sched: &mut S,
    text: &str,
) {
    type_bytes(keyboard, sched, text.as_bytes(), Newline::ShiftEnter).await
}

/// Press and release a single key with `modifiers` held, e.g. GUI+R.
pub async fn press_combo<K: KeyboardSink, S: Scheduler>(
    keyboard: &mut K,
    sched: &mut S,
    modifiers: u8,
    keycode: u8,
) {
    wait_until(sched, || keyboard.ready()).await;
    sched.step().await;
    tap(keyboard, sched, KeyboardReport::press(modifiers, keycode)).await;
}

/// Type raw bytes with the given newline handling.
pub async fn type_bytes<K: KeyboardSink, S: Scheduler>(
    keyboard: &mut K,
    sched: &mut S,
    text: &[u8],
    newline: Newline,
) {
    wait_until(sched, || keyboard.ready()).await;
    debug!("Typing {} bytes", text.len());

    for &c in text {
        sched.step().await;

        let mapping = resolve(c, newline);
        if !mapping.is_none() {
            let modifiers = if mapping.shift { modifier::LEFT_SHIFT } else { 0 };
            tap(keyboard, sched, KeyboardReport::press(modifiers, mapping.keycode)).await;
        }

        wait_ms(sched, CHAR_PACING_MS).await;
    }
}

fn resolve(c: u8, newline: Newline) -> KeyMapping {
    match (c, newline) {
        (b'\n', Newline::ShiftEnter) => KeyMapping {
            keycode: key::ENTER,
            shift: true,
        },
        _ => keycode::lookup(c),
    }
}

/// Press report, settle, release report, settle.
async fn tap<K: KeyboardSink, S: Scheduler>(keyboard: &mut K, sched: &mut S, press: KeyboardReport) {
    keyboard.send(&press).await;
    wait_ms(sched, REPORT_SETTLE_MS).await;
    keyboard.send(&KeyboardReport::release()).await;
    wait_ms(sched, REPORT_SETTLE_MS).await;
}
