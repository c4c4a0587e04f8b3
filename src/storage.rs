//! Persistent line log on a file-oriented storage volume.
//!
//! Every operation mounts the volume, does exactly one logical thing,
//! and unmounts again - on success and on every failure path.  Nothing
//! is held open between calls, so a stalled loop or power loss only
//! ever hits a volume that is either unmounted or in the middle of a
//! single append.
//!
//! Failures are reported once over the serial console with the reason
//! and numeric code, then returned to the caller.  There are no retries.

use crate::config::CHUNK_SIZE;
use crate::console::{self, Serial};
use crate::error::{FsCode, StorageError, StorageOp};
use core::ops::{Deref, DerefMut};
use heapless::Vec;

/// How a file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Existing file, read from the start.
    Read,
    /// Create if missing, writes go to the end.
    Append,
}

/// The block-storage driver, seen as a flat namespace of files.
#[allow(async_fn_in_trait)]
pub trait FileSystem {
    type File;

    async fn mount(&mut self) -> Result<(), FsCode>;

    /// Release the volume.  Must be safe to call after any failure.
    fn unmount(&mut self);

    async fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File, FsCode>;

    async fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<(), FsCode>;

    /// Read the next chunk; `Ok(0)` at end of file.
    async fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, FsCode>;

    async fn close(&mut self, file: Self::File) -> Result<(), FsCode>;
}

/// Mounted volume; unmounts when dropped.
struct Mounted<'a, F: FileSystem>(&'a mut F);

impl<'a, F: FileSystem> Mounted<'a, F> {
    async fn acquire(fs: &'a mut F) -> Result<Self, StorageError> {
        fs.mount()
            .await
            .map_err(|code| StorageError::new(StorageOp::Mount, code))?;
        Ok(Self(fs))
    }
}

impl<F: FileSystem> Deref for Mounted<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.0
    }
}

impl<F: FileSystem> DerefMut for Mounted<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.0
    }
}

impl<F: FileSystem> Drop for Mounted<'_, F> {
    fn drop(&mut self) {
        self.0.unmount();
    }
}

/// Append-only line store over a [`FileSystem`].
pub struct LogStore<F> {
    fs: F,
}

impl<F: FileSystem> LogStore<F> {
    pub const fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Append `line` plus a `\n` terminator to `name`, creating it if needed.
    pub async fn append<C: Serial>(
        &mut self,
        console: &mut C,
        name: &str,
        line: &[u8],
    ) -> Result<(), StorageError> {
        let result = self.try_append(name, line).await;
        match result {
            Ok(()) => debug!("Appended {} bytes to {}", line.len(), name),
            Err(e) => report(console, name, e).await,
        }
        result
    }

    /// Visit every line of `name` (without terminator).  Lines longer than
    /// one chunk are delivered in chunk-sized pieces.  Returns the number
    /// of lines visited.
    pub async fn read_lines<C: Serial>(
        &mut self,
        console: &mut C,
        name: &str,
        mut on_line: impl FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let result = self.try_read_lines(name, &mut on_line).await;
        if let Err(e) = result {
            report(console, name, e).await;
        }
        result
    }

    /// Replay the whole file to the console, chunk by chunk, verbatim.
    pub async fn read_all<C: Serial>(&mut self, console: &mut C, name: &str) -> Result<(), StorageError> {
        let result = self.try_read_all(console, name).await;
        match result {
            Ok(()) => console::log(console, "\r\nFinished reading file.\r\n").await,
            Err(e) => report(console, name, e).await,
        }
        result
    }

    async fn try_append(&mut self, name: &str, line: &[u8]) -> Result<(), StorageError> {
        let mut vol = Mounted::acquire(&mut self.fs).await?;
        let mut file = open(&mut vol, name, OpenMode::Append).await?;

        let written = match vol.write(&mut file, line).await {
            Ok(()) => vol.write(&mut file, b"\n").await,
            Err(code) => Err(code),
        };
        if let Err(code) = written {
            let _ = vol.close(file).await;
            return Err(StorageError::new(StorageOp::Write, code));
        }

        vol.close(file)
            .await
            .map_err(|code| StorageError::new(StorageOp::Close, code))
    }

    async fn try_read_lines(
        &mut self,
        name: &str,
        on_line: &mut impl FnMut(&[u8]),
    ) -> Result<usize, StorageError> {
        let mut vol = Mounted::acquire(&mut self.fs).await?;
        let mut file = open(&mut vol, name, OpenMode::Read).await?;

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut line: Vec<u8, CHUNK_SIZE> = Vec::new();
        let mut count = 0;

        loop {
            let n = match vol.read(&mut file, &mut chunk).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(code) => {
                    let _ = vol.close(file).await;
                    return Err(StorageError::new(StorageOp::Read, code));
                }
            };
            for &b in &chunk[..n] {
                if b == b'\n' {
                    on_line(&line);
                    line.clear();
                    count += 1;
                    continue;
                }
                if line.push(b).is_err() {
                    on_line(&line);
                    line.clear();
                    count += 1;
                    // Capacity is non-zero, so this cannot fail after clear().
                    let _ = line.push(b);
                }
            }
        }
        if !line.is_empty() {
            on_line(&line);
            count += 1;
        }

        vol.close(file)
            .await
            .map_err(|code| StorageError::new(StorageOp::Close, code))?;
        Ok(count)
    }

    async fn try_read_all<C: Serial>(&mut self, console: &mut C, name: &str) -> Result<(), StorageError> {
        let mut vol = Mounted::acquire(&mut self.fs).await?;
        let mut file = open(&mut vol, name, OpenMode::Read).await?;

        console::log_fmt(console, format_args!("Contents of {}:\r\n", name)).await;

        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match vol.read(&mut file, &mut chunk).await {
                Ok(0) => break,
                Ok(n) => console::log_bytes(console, &chunk[..n]).await,
                Err(code) => {
                    let _ = vol.close(file).await;
                    return Err(StorageError::new(StorageOp::Read, code));
                }
            }
        }

        vol.close(file)
            .await
            .map_err(|code| StorageError::new(StorageOp::Close, code))
    }
}

async fn open<F: FileSystem>(
    vol: &mut Mounted<'_, F>,
    name: &str,
    mode: OpenMode,
) -> Result<F::File, StorageError> {
    vol.open(name, mode)
        .await
        .map_err(|code| StorageError::new(StorageOp::Open, code))
}

/// Report a failed operation on the console and the debug log.
async fn report<C: Serial>(console: &mut C, name: &str, e: StorageError) {
    warn!("Storage {} on {} failed: {}", e.op, name, e.code);
    match e.op {
        StorageOp::Open => {
            console::log_fmt(console, format_args!("open({}) error: {}\r\n", name, e.code)).await
        }
        _ => console::log_fmt(console, format_args!("{}\r\n", e)).await,
    }
}


#[cfg(test)]
mod tests {
    use super::fake::RamDisk;
    use super::*;
    use crate::console::fake::FakeSerial;
    use embassy_futures::block_on;

    fn lines_of(store: &mut LogStore<RamDisk>, name: &str) -> Result<std::vec::Vec<String>, StorageError> {
        let mut serial = FakeSerial::default();
        let mut lines = std::vec::Vec::new();
        block_on(store.read_lines(&mut serial, name, |l| {
            lines.push(String::from_utf8(l.to_vec()).unwrap())
        }))?;
        Ok(lines)
    }

    #[test]
    fn append_creates_file_and_reads_back() {
        let mut store = LogStore::new(RamDisk::default());
        let mut serial = FakeSerial::default();

        assert!(block_on(store.append(&mut serial, "log.txt", b"hello")).is_ok());

        assert_eq!(store.fs().contents("log.txt"), Some(&b"hello\n"[..]));
        assert_eq!(lines_of(&mut store, "log.txt").unwrap(), vec!["hello"]);
        assert!(serial.output.is_empty());
    }

    #[test]
    fn every_operation_unmounts() {
        let mut store = LogStore::new(RamDisk::default());
        let mut serial = FakeSerial::default();

        block_on(store.append(&mut serial, "a.txt", b"1")).unwrap();
        block_on(store.read_all(&mut serial, "a.txt")).unwrap();
        let _ = block_on(store.read_all(&mut serial, "missing.txt"));

        let fs = store.fs();
        assert_eq!(fs.mounts, 3);
        assert_eq!(fs.unmounts, 3);
        assert!(!fs.mounted);
        assert_eq!(fs.open_files, 0);
    }

    #[test]
    fn mount_failure_reports_once_and_creates_nothing() {
        let mut disk = RamDisk::default();
        disk.fail_mount = Some(FsCode::NotReady);
        let mut store = LogStore::new(disk);
        let mut serial = FakeSerial::default();

        let err = block_on(store.append(&mut serial, "log.txt", b"hello")).unwrap_err();

        assert_eq!(err, StorageError::new(StorageOp::Mount, FsCode::NotReady));
        assert_eq!(serial.text(), "mount error: not ready (3)\r\n");
        assert_eq!(serial.flushes, 1);
        assert!(store.fs().files.is_empty());
    }

    #[test]
    fn open_failure_names_file_and_unmounts() {
        let mut disk = RamDisk::default();
        disk.fail_open = Some(FsCode::Denied);
        let mut store = LogStore::new(disk);
        let mut serial = FakeSerial::default();

        let err = block_on(store.append(&mut serial, "log.txt", b"x")).unwrap_err();

        assert_eq!(err.op, StorageOp::Open);
        assert_eq!(serial.text(), "open(log.txt) error: denied (7)\r\n");
        assert_eq!(store.fs().unmounts, 1);
        assert!(!store.fs().mounted);
    }

    #[test]
    fn write_failure_closes_and_unmounts() {
        let mut disk = RamDisk::default();
        disk.fail_write = Some(FsCode::Denied);
        let mut store = LogStore::new(disk);
        let mut serial = FakeSerial::default();

        let err = block_on(store.append(&mut serial, "log.txt", b"x")).unwrap_err();

        assert_eq!(err, StorageError::new(StorageOp::Write, FsCode::Denied));
        assert_eq!(store.fs().open_files, 0);
        assert!(!store.fs().mounted);
        assert_eq!(serial.text(), "write error: denied (7)\r\n");
    }

    #[test]
    fn close_failure_is_reported() {
        let mut disk = RamDisk::default();
        disk.fail_close = Some(FsCode::DiskError);
        let mut store = LogStore::new(disk);
        let mut serial = FakeSerial::default();

        let err = block_on(store.append(&mut serial, "log.txt", b"x")).unwrap_err();

        assert_eq!(err.op, StorageOp::Close);
        assert_eq!(serial.text(), "close error: disk error (1)\r\n");
        assert!(!store.fs().mounted);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let mut store = LogStore::new(RamDisk::default());
        let err = lines_of(&mut store, "nope.txt").unwrap_err();
        assert_eq!(err, StorageError::new(StorageOp::Open, FsCode::NoFile));
    }

    #[test]
    fn read_failure_closes_file() {
        let mut disk = RamDisk::with_file("log.txt", b"a\n");
        disk.fail_read = Some(FsCode::DiskError);
        let mut store = LogStore::new(disk);
        let mut serial = FakeSerial::default();

        let err = block_on(store.read_all(&mut serial, "log.txt")).unwrap_err();

        assert_eq!(err.op, StorageOp::Read);
        assert_eq!(store.fs().open_files, 0);
        assert!(!store.fs().mounted);
    }

    #[test]
    fn read_lines_is_repeatable() {
        let mut store = LogStore::new(RamDisk::with_file("log.txt", b"one\ntwo\nthree\n"));
        let first = lines_of(&mut store, "log.txt").unwrap();
        let second = lines_of(&mut store, "log.txt").unwrap();
        assert_eq!(first, vec!["one", "two", "three"]);
        assert_eq!(first, second);
    }

    #[test]
    fn read_lines_handles_lines_split_across_chunks() {
        let mut disk = RamDisk::with_file("log.txt", b"alpha\nbeta\ngamma");
        disk.read_chunk = Some(3);
        let mut store = LogStore::new(disk);
        assert_eq!(lines_of(&mut store, "log.txt").unwrap(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn read_lines_splits_overlong_lines() {
        let long = vec![b'z'; CHUNK_SIZE + 5];
        let mut contents = long.clone();
        contents.push(b'\n');
        let mut store = LogStore::new(RamDisk::with_file("log.txt", &contents));

        let lines = lines_of(&mut store, "log.txt").unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), CHUNK_SIZE);
        assert_eq!(lines[1].len(), 5);
    }

    #[test]
    fn read_all_replays_whole_history() {
        let mut store = LogStore::new(RamDisk::default());
        let mut serial = FakeSerial::default();
        block_on(store.append(&mut serial, "log.txt", b"first")).unwrap();
        block_on(store.append(&mut serial, "log.txt", b"second")).unwrap();

        block_on(store.read_all(&mut serial, "log.txt")).unwrap();

        assert_eq!(
            serial.text(),
            "Contents of log.txt:\r\nfirst\nsecond\n\r\nFinished reading file.\r\n"
        );
    }
}
