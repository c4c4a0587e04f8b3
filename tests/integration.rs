//! Integration tests for hidcap host-testable logic, driven only through
//! the public API with local stand-ins for the hardware.

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};

use embassy_futures::block_on;
use hidcap::console::Serial;
use hidcap::hid::keyboard::{modifier, KeyboardReport};
use hidcap::hid::keycode::key;
use hidcap::hid::{inject, lookup, KeyboardSink};
use hidcap::scheduler::Scheduler;
use hidcap::status::{ConnectionState, UsbEvent};
use hidcap::storage::{FileSystem, LogStore, OpenMode};
use hidcap::trigger::Step;
use hidcap::{Device, FsCode, StorageOp};

const KEY_C: u8 = key::A + 2;
const KEY_P: u8 = key::A + 15;

#[derive(Default)]
struct Keyboard {
    reports: Vec<KeyboardReport>,
    ready_checks: Cell<u32>,
}

impl KeyboardSink for Keyboard {
    fn ready(&self) -> bool {
        self.ready_checks.set(self.ready_checks.get() + 1);
        true
    }

    async fn send(&mut self, report: &KeyboardReport) {
        self.reports.push(*report);
    }
}

#[derive(Default)]
struct Clock {
    now: u64,
}

impl Scheduler for Clock {
    async fn step(&mut self) {
        self.now += 1;
    }

    fn now_ms(&self) -> u64 {
        self.now
    }
}

#[derive(Default)]
struct Disk {
    files: BTreeMap<String, Vec<u8>>,
    mounted: bool,
    mount_error: Option<FsCode>,
}

struct DiskFile {
    name: String,
    pos: usize,
}

impl FileSystem for Disk {
    type File = DiskFile;

    async fn mount(&mut self) -> Result<(), FsCode> {
        if let Some(code) = self.mount_error {
            return Err(code);
        }
        assert!(!self.mounted, "volume mounted twice");
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    async fn open(&mut self, name: &str, mode: OpenMode) -> Result<DiskFile, FsCode> {
        match mode {
            OpenMode::Read if !self.files.contains_key(name) => return Err(FsCode::NoFile),
            OpenMode::Read => {}
            OpenMode::Append => {
                self.files.entry(name.to_string()).or_default();
            }
        }
        Ok(DiskFile {
            name: name.to_string(),
            pos: 0,
        })
    }

    async fn write(&mut self, file: &mut DiskFile, data: &[u8]) -> Result<(), FsCode> {
        self.files
            .get_mut(&file.name)
            .ok_or(FsCode::InvalidObject)?
            .extend_from_slice(data);
        Ok(())
    }

    async fn read(&mut self, file: &mut DiskFile, buf: &mut [u8]) -> Result<usize, FsCode> {
        let data = self.files.get(&file.name).ok_or(FsCode::InvalidObject)?;
        let n = (data.len() - file.pos).min(buf.len());
        buf[..n].copy_from_slice(&data[file.pos..file.pos + n]);
        file.pos += n;
        Ok(n)
    }

    async fn close(&mut self, _file: DiskFile) -> Result<(), FsCode> {
        Ok(())
    }
}

struct Console {
    connected: bool,
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            connected: true,
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }
}

impl Console {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Serial for Console {
    fn connected(&self) -> bool {
        self.connected
    }

    fn try_read(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    async fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    async fn flush(&mut self) {}
}

#[test]
fn typing_a_shell_command() {
    let mut keyboard = Keyboard::default();
    let mut clock = Clock::default();

    block_on(inject(&mut keyboard, &mut clock, "powershell.exe\n"));

    let reports = &keyboard.reports;
    assert_eq!(reports.len(), 30);
    for pair in reports.chunks(2) {
        assert!(!pair[0].is_release());
        assert!(pair[1].is_release());
    }
    let keys: Vec<u8> = reports.iter().step_by(2).map(|r| r.active_key()).collect();
    assert_eq!(keys[0], KEY_P);
    assert_eq!(keys[10], key::PERIOD);
    assert_eq!(keys[14], key::ENTER);
    assert!(reports.iter().all(|r| r.modifier == 0));
    // One readiness check per call, not per character.
    assert_eq!(keyboard.ready_checks.get(), 1);
}

#[test]
fn appending_then_reading_back() {
    let mut store = LogStore::new(Disk::default());
    let mut console = Console::default();

    block_on(store.append(&mut console, "input.txt", b"hello world")).unwrap();
    assert_eq!(store.fs().files["input.txt"], b"hello world\n");
    assert!(!store.fs().mounted);

    block_on(store.read_all(&mut console, "input.txt")).unwrap();
    assert_eq!(
        console.text(),
        "Contents of input.txt:\r\nhello world\n\r\nFinished reading file.\r\n"
    );
}

#[test]
fn missing_medium_is_reported_with_code() {
    let disk = Disk {
        mount_error: Some(FsCode::NotReady),
        ..Disk::default()
    };
    let mut store = LogStore::new(disk);
    let mut console = Console::default();

    let err = block_on(store.append(&mut console, "input.txt", b"x")).unwrap_err();

    assert_eq!(err.op, StorageOp::Mount);
    assert_eq!(err.code, FsCode::NotReady);
    assert_eq!(console.text(), "mount error: not ready (3)\r\n");
    assert!(store.fs().files.is_empty());
}

#[test]
fn reading_a_missing_file() {
    let mut store = LogStore::new(Disk::default());
    let mut console = Console::default();

    let err = block_on(store.read_all(&mut console, "log.txt")).unwrap_err();

    assert_eq!(err.op, StorageOp::Open);
    assert_eq!(console.text(), "open(log.txt) error: no file (4)\r\n");
    assert!(!store.fs().mounted);
}

#[test]
fn serial_line_with_backspace_is_captured() {
    let mut device = Device::new(
        Keyboard::default(),
        Clock::default(),
        Disk::default(),
        Console::default(),
    );
    device.serial_mut().input.extend(b"abc\x08d\r");

    for _ in 0..6 {
        block_on(device.poll(false));
    }

    assert_eq!(device.store().fs().files["input.txt"], b"abd\n");
    assert_eq!(
        device.serial().text(),
        "abc\x08 \x08d\r\n[OK] Saved to file\r\n"
    );
    assert!(device.keyboard().reports.is_empty());
}

#[test]
fn trigger_runs_custom_script() {
    static SCRIPT: &[Step] = &[
        Step::Log("go\r\n"),
        Step::Combo {
            modifiers: modifier::LEFT_CTRL,
            keycode: KEY_C,
        },
        Step::Type("A"),
    ];
    let mut device = Device::with_script(
        Keyboard::default(),
        Clock::default(),
        Disk::default(),
        Console::default(),
        SCRIPT,
    );

    block_on(device.poll(true));
    block_on(device.poll(false));

    let presses: Vec<(u8, u8)> = device
        .keyboard()
        .reports
        .iter()
        .filter(|r| !r.is_release())
        .map(|r| (r.modifier, r.active_key()))
        .collect();
    assert_eq!(
        presses,
        vec![(modifier::LEFT_CTRL, KEY_C), (modifier::LEFT_SHIFT, key::A)]
    );
    assert_eq!(device.serial().text(), "go\r\n");
    assert_eq!(device.trigger().activations(), 1);
}

#[test]
fn usb_lifecycle_reaches_status() {
    let mut device = Device::new(
        Keyboard::default(),
        Clock::default(),
        Disk::default(),
        Console::default(),
    );
    assert_eq!(device.status().state(), ConnectionState::NotMounted);

    device.handle_usb_event(UsbEvent::Mounted);
    device.handle_usb_event(UsbEvent::Suspended);

    assert_eq!(device.status().state(), ConnectionState::Suspended);
    assert_eq!(device.status().blink_interval_ms(), 2500);
}

#[test]
fn printable_ascii_is_fully_mapped() {
    const SHIFTED: &[u8] = b"~!@#$%^&*()_+{}|:\"<>?";

    for c in 0x20u8..=0x7E {
        let mapping = lookup(c);
        assert!(!mapping.is_none(), "no keycode for {:?}", c as char);
        let expect_shift = c.is_ascii_uppercase() || SHIFTED.contains(&c);
        assert_eq!(mapping.shift, expect_shift, "shift for {:?}", c as char);
    }
    for c in 0x80u8..=0xFF {
        assert!(lookup(c).is_none());
    }
}
