//! Disk manager implementations.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use drift_common::types::PageId;
use parking_lot::Mutex;
use tracing::debug;

use super::error::{DiskError, DiskResult};

/// Page-granular block storage consumed by the buffer pool.
///
/// Implementations are internally synchronized; every method takes
/// `&self`. Page ids are chosen by the caller (the buffer pool allocates
/// them from a monotone counter) and map to fixed-size slots.
pub trait DiskManager: Send + Sync {
    /// Returns the page size in bytes.
    fn page_size(&self) -> usize;

    /// Reads page `page_id` into `buf`.
    ///
    /// `buf` must be exactly one page long. A page that was allocated but
    /// never written reads back as zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()>;

    /// Persists one page of `data` as page `page_id`.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()>;

    /// Reserves backing storage for a newly allocated page id.
    fn allocate_page(&self, page_id: PageId) -> DiskResult<()>;

    /// Releases the backing storage for `page_id`.
    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()>;
}

fn check_buffer(page_size: usize, len: usize) -> DiskResult<()> {
    if len != page_size {
        return Err(DiskError::BufferSizeMismatch {
            page_size,
            buffer_len: len,
        });
    }
    Ok(())
}

fn check_page_id(page_id: PageId) -> DiskResult<()> {
    if !page_id.is_valid() {
        return Err(DiskError::InvalidPageId);
    }
    Ok(())
}

/// File-backed disk manager.
///
/// All pages live in one data file at offset `page_id * page_size`. The
/// file handle sits behind a mutex; reads and writes seek under it, so
/// page operations are serialized.
pub struct FileDiskManager {
    file: Mutex<File>,
    path: PathBuf,
    page_size: usize,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl FileDiskManager {
    /// Opens (creating if necessary) the data file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        debug!(path = %path.display(), page_size, "opened data file");
        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of page reads served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Forces all written pages down to the device.
    pub fn sync(&self) -> DiskResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn offset_of(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }
}

impl DiskManager for FileDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        check_page_id(page_id)?;
        check_buffer(self.page_size, buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        // Reading past the current end of file yields a fresh page.
        buf[filled..].fill(0);

        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        check_page_id(page_id)?;
        check_buffer(self.page_size, data.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;
        let mut written = 0;
        while written < data.len() {
            match file.write(&data[written..]) {
                Ok(0) => return Err(DiskError::short_write(page_id, data.len(), written)),
                Ok(n) => written += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&self, page_id: PageId) -> DiskResult<()> {
        check_page_id(page_id)?;
        let needed = self.offset_of(page_id) + self.page_size as u64;
        let file = self.file.lock();
        if file.metadata()?.len() < needed {
            file.set_len(needed)?;
        }
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        check_page_id(page_id)?;
        // Slot reuse and space reclamation happen above this layer; the
        // slot simply becomes garbage until the id's storage is reused.
        debug!(%page_id, "deallocated page");
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}

/// Heap-backed disk manager for tests and ephemeral pools.
///
/// Stores pages in a hash map and counts physical reads and writes, which
/// lets tests assert exactly how much I/O the buffer pool performed.
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Vec<u8>>>,
    page_size: usize,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryDiskManager {
    /// Creates an empty in-memory disk.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Returns the number of page reads served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of pages currently stored.
    pub fn num_pages(&self) -> usize {
        self.pages.lock().len()
    }
}

impl DiskManager for MemoryDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        check_page_id(page_id)?;
        check_buffer(self.page_size, buf.len())?;

        let pages = self.pages.lock();
        match pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }

        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        check_page_id(page_id)?;
        check_buffer(self.page_size, data.len())?;

        self.pages.lock().insert(page_id, data.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&self, page_id: PageId) -> DiskResult<()> {
        check_page_id(page_id)?;
        self.pages
            .lock()
            .entry(page_id)
            .or_insert_with(|| vec![0u8; self.page_size]);
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        check_page_id(page_id)?;
        self.pages.lock().remove(&page_id);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDiskManager")
            .field("page_size", &self.page_size)
            .field("num_pages", &self.num_pages())
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}
