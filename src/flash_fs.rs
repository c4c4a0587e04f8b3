//! Line files on the nRF52840's internal flash.
//!
//! Each named file owns a fixed run of flash pages managed as a
//! `sequential-storage` queue.  One queue item is one committed write
//! session: everything written between `open(Append)` and `close` is
//! pushed as a single item when the file is closed.  When a partition
//! fills up the oldest items are erased to make room.
//!
//! Reading walks the queue front to back without popping, so the file
//! history survives any number of reads.

use core::ops::Range;
use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use heapless::Vec;
use hidcap::config::{
    CAPTURE_FILE, LOG_FILE, STORAGE_FLASH_PAGE_START, STORAGE_PAGES_PER_FILE,
};
use hidcap::storage::{FileSystem, OpenMode};
use hidcap::FsCode;
use sequential_storage::cache::NoCache;
use sequential_storage::queue;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Largest item one write session can produce.
const RECORD_MAX: usize = 256;

/// File name → partition, in page order.
const PARTITIONS: [&str; 2] = [LOG_FILE, CAPTURE_FILE];

fn partition(name: &str) -> Option<Range<u32>> {
    let index = PARTITIONS.iter().position(|p| *p == name)? as u32;
    let first = STORAGE_FLASH_PAGE_START + index * STORAGE_PAGES_PER_FILE;
    Some(first * FLASH_PAGE_SIZE..(first + STORAGE_PAGES_PER_FILE) * FLASH_PAGE_SIZE)
}

fn fs_code<E: core::fmt::Debug>(e: sequential_storage::Error<E>) -> FsCode {
    error!("Flash error: {:?}", defmt::Debug2Format(&e));
    match e {
        sequential_storage::Error::Storage { .. } => FsCode::DiskError,
        sequential_storage::Error::Corrupted { .. } => FsCode::NoFilesystem,
        sequential_storage::Error::FullStorage => FsCode::Denied,
        sequential_storage::Error::BufferTooSmall(_) | sequential_storage::Error::ItemTooBig => {
            FsCode::NotEnoughCore
        }
        _ => FsCode::InternalError,
    }
}

/// Open handle.  Append handles buffer, read handles stage one item.
pub struct FlashFile {
    range: Range<u32>,
    mode: OpenMode,
    pending: Vec<u8, RECORD_MAX>,
    next_record: usize,
    staged: Vec<u8, RECORD_MAX>,
    staged_pos: usize,
}

pub struct FlashFs<FL> {
    flash: FL,
    mounted: bool,
}

impl<FL: NorFlash> FlashFs<FL> {
    pub fn new(flash: FL) -> Self {
        Self {
            flash,
            mounted: false,
        }
    }

    /// Load item number `file.next_record` into the staging buffer.
    /// Returns `false` once past the last item.
    async fn stage_next(&mut self, file: &mut FlashFile) -> Result<bool, FsCode> {
        let mut cache = NoCache::new();
        let mut iter = queue::iter(&mut self.flash, file.range.clone(), &mut cache)
            .await
            .map_err(fs_code)?;
        let mut buf = [0u8; RECORD_MAX];
        let mut index = 0;
        loop {
            let Some(entry) = iter.next(&mut buf).await.map_err(fs_code)? else {
                return Ok(false);
            };
            if index == file.next_record {
                file.staged.clear();
                // Items are never larger than RECORD_MAX.
                let _ = file.staged.extend_from_slice(&entry);
                file.staged_pos = 0;
                file.next_record += 1;
                return Ok(true);
            }
            index += 1;
        }
    }
}

impl<FL: NorFlash> FileSystem for FlashFs<FL> {
    type File = FlashFile;

    async fn mount(&mut self) -> Result<(), FsCode> {
        if self.mounted {
            return Err(FsCode::InternalError);
        }
        self.mounted = true;
        debug!("Flash volume mounted");
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    async fn open(&mut self, name: &str, mode: OpenMode) -> Result<FlashFile, FsCode> {
        if !self.mounted {
            return Err(FsCode::NotReady);
        }
        let range = partition(name).ok_or(FsCode::InvalidName)?;
        let mut file = FlashFile {
            range,
            mode,
            pending: Vec::new(),
            next_record: 0,
            staged: Vec::new(),
            staged_pos: 0,
        };
        if mode == OpenMode::Read && !self.stage_next(&mut file).await? {
            return Err(FsCode::NoFile);
        }
        Ok(file)
    }

    async fn write(&mut self, file: &mut FlashFile, data: &[u8]) -> Result<(), FsCode> {
        if file.mode != OpenMode::Append {
            return Err(FsCode::Denied);
        }
        file.pending
            .extend_from_slice(data)
            .map_err(|_| FsCode::NotEnoughCore)
    }

    async fn read(&mut self, file: &mut FlashFile, buf: &mut [u8]) -> Result<usize, FsCode> {
        if file.mode != OpenMode::Read {
            return Err(FsCode::Denied);
        }
        if file.staged_pos >= file.staged.len() && !self.stage_next(file).await? {
            return Ok(0);
        }
        let rest = &file.staged[file.staged_pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        file.staged_pos += n;
        Ok(n)
    }

    async fn close(&mut self, file: FlashFile) -> Result<(), FsCode> {
        if file.mode != OpenMode::Append || file.pending.is_empty() {
            return Ok(());
        }
        let mut cache = NoCache::new();
        queue::push(&mut self.flash, file.range, &mut cache, &file.pending, true)
            .await
            .map_err(fs_code)?;
        info!("Flash: committed {} bytes", file.pending.len());
        Ok(())
    }
}
