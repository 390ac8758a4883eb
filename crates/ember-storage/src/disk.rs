//! Disk manager for page-level file I/O.
//!
//! The database is one file of `PAGE_SIZE` pages. Page 0 is the header:
//!
//! ```text
//! offset  size  field
//! 0       8     magic "EMBERDB\0"
//! 8       4     format version (u32 LE)
//! 12      4     page size (u32 LE)
//! 16      4     page count including the header (u32 LE)
//! 20      4     free-list head page, u32::MAX when empty (u32 LE)
//! ```
//!
//! A freed page stores the next free page number in its first four bytes.
//! Freed pages are unreadable and unwritable until they are allocated again.

use ember_common::config::StorageConfig;
use ember_common::page::{PageId, PAGE_SIZE};
use ember_common::{EmberError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MAGIC: &[u8; 8] = b"EMBERDB\0";
const FORMAT_VERSION: u32 = 1;

/// Decoded contents of the header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    page_count: u32,
    free_head: PageId,
}

impl FileHeader {
    fn new() -> Self {
        Self {
            page_count: 1,
            free_head: PageId::INVALID,
        }
    }

    fn to_bytes(self) -> [u8; PAGE_SIZE] {
        let mut buf = [0u8; PAGE_SIZE];
        buf[0..8].copy_from_slice(MAGIC);
        buf[8..12].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[12..16].copy_from_slice(&(PAGE_SIZE as u32).to_le_bytes());
        buf[16..20].copy_from_slice(&self.page_count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.free_head.0.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; PAGE_SIZE]) -> Result<Self> {
        if &buf[0..8] != MAGIC {
            return Err(EmberError::InvalidFileHeader("bad magic".to_string()));
        }
        let version = read_u32(buf, 8);
        if version != FORMAT_VERSION {
            return Err(EmberError::InvalidFileHeader(format!(
                "unsupported format version {}",
                version
            )));
        }
        let page_size = read_u32(buf, 12);
        if page_size as usize != PAGE_SIZE {
            return Err(EmberError::InvalidFileHeader(format!(
                "page size {} does not match {}",
                page_size, PAGE_SIZE
            )));
        }
        let page_count = read_u32(buf, 16);
        if page_count == 0 {
            return Err(EmberError::InvalidFileHeader(
                "page count is zero".to_string(),
            ));
        }
        Ok(Self {
            page_count,
            free_head: PageId(read_u32(buf, 20)),
        })
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

/// Open file plus the cached header and the set of freed pages.
struct FileHandle {
    file: File,
    header: FileHeader,
    free: HashSet<PageId>,
}

impl FileHandle {
    fn read_at(&mut self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset()))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset()))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Writes `header` to page 0 and adopts it only once the write succeeded.
    fn commit_header(&mut self, header: FileHeader) -> Result<()> {
        self.write_at(PageId::HEADER, &header.to_bytes())?;
        self.header = header;
        Ok(())
    }

    fn in_range(&self, page_id: PageId) -> bool {
        page_id != PageId::HEADER && page_id.0 < self.header.page_count
    }

    /// Rejects the header page, pages past the end of the file and freed pages.
    fn check_data_page(&self, page_id: PageId) -> Result<()> {
        if !self.in_range(page_id) || self.free.contains(&page_id) {
            return Err(EmberError::PageNotFound { page_id: page_id.0 });
        }
        Ok(())
    }
}

/// Reads and writes pages of the single database file.
pub struct DiskManager {
    path: PathBuf,
    fsync_enabled: bool,
    /// None once closed.
    handle: Mutex<Option<FileHandle>>,
}

impl DiskManager {
    /// Opens the database file named by `config`, creating it if missing.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;
        let path = config.file_path();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let header = if file_len == 0 {
            let header = FileHeader::new();
            file.write_all(&header.to_bytes())?;
            if config.fsync_enabled {
                file.sync_all()?;
            }
            header
        } else {
            if file_len < PAGE_SIZE as u64 {
                return Err(EmberError::InvalidFileHeader(format!(
                    "file is {} bytes, shorter than one page",
                    file_len
                )));
            }
            let mut buf = [0u8; PAGE_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut buf)?;
            let header = FileHeader::from_bytes(&buf)?;
            if header.page_count as u64 * PAGE_SIZE as u64 > file_len {
                return Err(EmberError::InvalidFileHeader(format!(
                    "header claims {} pages but file holds {} bytes",
                    header.page_count, file_len
                )));
            }
            header
        };

        let mut handle = FileHandle {
            file,
            header,
            free: HashSet::new(),
        };
        handle.free = free_list(&mut handle)?.into_iter().collect();

        info!(
            path = %path.display(),
            pages = header.page_count,
            free = handle.free.len(),
            "opened database file"
        );

        Ok(Self {
            path,
            fsync_enabled: config.fsync_enabled,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_handle<T>(&self, f: impl FnOnce(&mut FileHandle) -> Result<T>) -> Result<T> {
        let mut guard = self.handle.lock();
        let handle = guard.as_mut().ok_or(EmberError::StorageClosed)?;
        f(handle)
    }

    /// Fails with `PageNotFound` unless `page_id` is an allocated data page.
    pub fn check_page(&self, page_id: PageId) -> Result<()> {
        self.with_handle(|h| h.check_data_page(page_id))
    }

    /// Reads a data page.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.with_handle(|h| {
            h.check_data_page(page_id)?;
            h.read_at(page_id, buf)
        })
    }

    /// Writes a data page.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        self.with_handle(|h| {
            h.check_data_page(page_id)?;
            h.write_at(page_id, data)
        })
    }

    /// Allocates a zeroed data page, reusing the free list before growing
    /// the file.
    pub fn allocate_page(&self) -> Result<PageId> {
        self.with_handle(|h| {
            let zero = [0u8; PAGE_SIZE];
            let mut header = h.header;
            let page_id = if header.free_head.is_valid() {
                let page_id = header.free_head;
                if !h.in_range(page_id) || !h.free.contains(&page_id) {
                    return Err(EmberError::PageCorrupted {
                        page_id: page_id.0,
                        reason: "free-list head is not a free page".to_string(),
                    });
                }
                let mut buf = [0u8; PAGE_SIZE];
                h.read_at(page_id, &mut buf)?;
                header.free_head = PageId(read_u32(&buf, 0));
                // The link must survive until the header no longer points here
                h.commit_header(header)?;
                h.free.remove(&page_id);
                h.write_at(page_id, &zero)?;
                page_id
            } else {
                let page_id = PageId(header.page_count);
                header.page_count = header.page_count.checked_add(1).ok_or_else(|| {
                    EmberError::Internal("database file page count overflow".to_string())
                })?;
                h.write_at(page_id, &zero)?;
                h.commit_header(header)?;
                page_id
            };
            debug!(page_id = %page_id, "allocated page");
            Ok(page_id)
        })
    }

    /// Returns a data page to the free list.
    pub fn free_page(&self, page_id: PageId) -> Result<()> {
        self.with_handle(|h| {
            if !h.in_range(page_id) {
                return Err(EmberError::PageNotFound { page_id: page_id.0 });
            }
            if h.free.contains(&page_id) {
                return Err(EmberError::InvalidParameter {
                    name: "page_id".to_string(),
                    value: format!("{} (already free)", page_id),
                });
            }
            let mut buf = [0u8; PAGE_SIZE];
            buf[0..4].copy_from_slice(&h.header.free_head.0.to_le_bytes());
            h.write_at(page_id, &buf)?;
            h.commit_header(FileHeader {
                free_head: page_id,
                ..h.header
            })?;
            h.free.insert(page_id);
            debug!(page_id = %page_id, "freed page");
            Ok(())
        })
    }

    /// Number of pages in the file, including the header page.
    pub fn num_pages(&self) -> Result<u32> {
        self.with_handle(|h| Ok(h.header.page_count))
    }

    /// Pages currently on the free list, most recently freed first.
    pub fn free_pages(&self) -> Result<Vec<PageId>> {
        self.with_handle(free_list)
    }

    /// Syncs the file to stable storage when fsync is enabled.
    pub fn flush(&self) -> Result<()> {
        let fsync = self.fsync_enabled;
        self.with_handle(|h| {
            h.file.flush()?;
            if fsync {
                h.file.sync_all()?;
            }
            Ok(())
        })
    }

    /// Flushes and closes the file. Later calls fail with `StorageClosed`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.handle.lock();
        let Some(mut handle) = guard.take() else {
            return Err(EmberError::StorageClosed);
        };
        handle.file.flush()?;
        if self.fsync_enabled {
            handle.file.sync_all()?;
        }
        info!(path = %self.path.display(), "closed database file");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.lock().is_none()
    }
}

fn free_list(h: &mut FileHandle) -> Result<Vec<PageId>> {
    let mut pages = Vec::new();
    let mut next = h.header.free_head;
    let mut buf = [0u8; PAGE_SIZE];
    while next.is_valid() {
        let in_range = next != PageId::HEADER && next.0 < h.header.page_count;
        if !in_range || pages.len() as u32 >= h.header.page_count {
            return Err(EmberError::PageCorrupted {
                page_id: next.0,
                reason: "bad free-list link".to_string(),
            });
        }
        pages.push(next);
        h.read_at(next, &mut buf)?;
        next = PageId(read_u32(&buf, 0));
    }
    Ok(pages)
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.lock().take() {
            let _ = handle.file.flush();
        }
    }
}
