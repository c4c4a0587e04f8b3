//! Trigger button → injection script.
//!
//! Two states.  A poll that sees the (already inverted, active-low)
//! trigger asserted while idle runs the whole script before returning,
//! so the input is simply not looked at again until the script is done.

use crate::config::{LOG_FILE, SCRIPT_STEP_DELAY_MS};
use crate::console::{self, Serial};
use crate::hid::keyboard::modifier;
use crate::hid::keycode::key;
use crate::hid::sequencer::{self, KeyboardSink};
use crate::scheduler::{wait_ms, Scheduler};
use crate::storage::{FileSystem, LogStore};

/// One step of an injection script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Press and release `keycode` with `modifiers` held.
    Combo { modifiers: u8, keycode: u8 },
    /// Type literal text.
    Type(&'static str),
    /// Type literal text with Shift+ENTER newlines.
    TypeShiftEnter(&'static str),
    /// Busy-wait while servicing USB.
    Wait(u64),
    /// Message on the serial console.
    Log(&'static str),
    /// Append `message` to `file`, then log and type the matching result.
    SelfTest {
        file: &'static str,
        message: &'static str,
        on_success: &'static str,
        on_failure: &'static str,
    },
    /// Replay the whole of `file` to the console.
    ReadBack(&'static str),
}

/// Open a shell through the run dialog, type a few commands, and check
/// the log file round-trips.
pub static DEFAULT_SCRIPT: &[Step] = &[
    Step::Log("Trigger pressed\r\n"),
    Step::Combo {
        modifiers: modifier::LEFT_GUI,
        keycode: key::R,
    },
    Step::Wait(SCRIPT_STEP_DELAY_MS),
    Step::Type("powershell.exe\n"),
    Step::Wait(SCRIPT_STEP_DELAY_MS),
    Step::Type("echo 'Hello World'\n"),
    Step::Type("echo 'Writing to storage'\n"),
    Step::SelfTest {
        file: LOG_FILE,
        message: "Hello from the trigger self-test",
        on_success: "echo 'Writing successful!'\n",
        on_failure: "echo 'Write failed!'\n",
    },
    Step::Wait(SCRIPT_STEP_DELAY_MS),
    Step::Log("Reading log.txt from storage...\r\n"),
    Step::ReadBack(LOG_FILE),
    Step::Log("Script finished.\r\n"),
];

/// Everything a script touches, borrowed for the duration of one run.
pub struct ScriptIo<'a, K, S, F, C> {
    pub keyboard: &'a mut K,
    pub sched: &'a mut S,
    pub store: &'a mut LogStore<F>,
    pub console: &'a mut C,
}

/// Execute `script` in order.  Storage failures are reported by the
/// store and never abort the script.
pub async fn run_script<K, S, F, C>(script: &[Step], io: &mut ScriptIo<'_, K, S, F, C>)
where
    K: KeyboardSink,
    S: Scheduler,
    F: FileSystem,
    C: Serial,
{
    for step in script {
        match *step {
            Step::Combo { modifiers, keycode } => {
                sequencer::press_combo(io.keyboard, io.sched, modifiers, keycode).await
            }
            Step::Type(text) => sequencer::inject(io.keyboard, io.sched, text).await,
            Step::TypeShiftEnter(text) => {
                sequencer::inject_shift_enter(io.keyboard, io.sched, text).await
            }
            Step::Wait(ms) => wait_ms(io.sched, ms).await,
            Step::Log(msg) => console::log(io.console, msg).await,
            Step::SelfTest {
                file,
                message,
                on_success,
                on_failure,
            } => {
                let written = io.store.append(io.console, file, message.as_bytes()).await;
                let command = if written.is_ok() {
                    console::log(io.console, "Write successful!\r\n").await;
                    on_success
                } else {
                    console::log(io.console, "Write failed!\r\n").await;
                    on_failure
                };
                sequencer::inject(io.keyboard, io.sched, command).await;
            }
            Step::ReadBack(file) => {
                let _ = io.store.read_all(io.console, file).await;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerState {
    Idle,
    Running,
}

/// Idle/running state machine around one script.
pub struct TriggerController {
    state: TriggerState,
    script: &'static [Step],
    activations: u32,
}

impl Default for TriggerController {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT)
    }
}

impl TriggerController {
    pub const fn new(script: &'static [Step]) -> Self {
        Self {
            state: TriggerState::Idle,
            script,
            activations: 0,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Number of completed script runs.
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Run the script if idle and `asserted`.  Returns whether it ran.
    pub async fn poll<K, S, F, C>(&mut self, asserted: bool, io: &mut ScriptIo<'_, K, S, F, C>) -> bool
    where
        K: KeyboardSink,
        S: Scheduler,
        F: FileSystem,
        C: Serial,
    {
        if !asserted || self.state != TriggerState::Idle {
            return false;
        }

        self.state = TriggerState::Running;
        info!("Trigger: running script ({} steps)", self.script.len());
        run_script(self.script, io).await;
        self.activations += 1;
        self.state = TriggerState::Idle;
        info!("Trigger: script done");
        true
    }
}
