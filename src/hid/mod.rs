//! HID keyboard: report layout, ASCII mapping and the keystroke sequencer.

pub mod keyboard;
pub mod keycode;
pub mod sequencer;


pub use keyboard::{KeyboardLeds, KeyboardReport};
pub use keycode::{lookup, KeyMapping};
pub use sequencer::{inject, inject_shift_enter, press_combo, KeyboardSink, Newline};
