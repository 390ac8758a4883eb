//! Cached page access over the database file.

use crate::disk::DiskManager;
use ember_buffer::{BufferPool, BufferPoolStats, EvictedPage};
use ember_common::config::StorageConfig;
use ember_common::page::{PageId, PAGE_SIZE};
use ember_common::{EmberError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Page store combining the disk manager with a buffer pool.
///
/// Reads are served from cache when possible, writes land in cache as
/// dirty frames and reach disk on eviction, `flush` or `close`.
pub struct Pager {
    disk: DiskManager,
    pool: BufferPool,
    closed: AtomicBool,
}

impl Pager {
    /// Opens (or creates) the database file and its cache.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let pool = BufferPool::from_config(config)?;
        let disk = DiskManager::open(config)?;
        Ok(Self {
            disk,
            pool,
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EmberError::StorageClosed);
        }
        Ok(())
    }

    fn write_back(&self, evicted: Option<EvictedPage>) -> Result<()> {
        if let Some(page) = evicted {
            debug!(page_id = %page.page_id, "writing back evicted page");
            self.disk.write_page(page.page_id, &page.data)?;
        }
        Ok(())
    }

    /// Allocates a zeroed page.
    pub fn allocate_page(&self) -> Result<PageId> {
        self.check_open()?;
        self.disk.allocate_page()
    }

    /// Frees a page, discarding any cached copy.
    pub fn free_page(&self, page_id: PageId) -> Result<()> {
        self.check_open()?;
        if self.pool.contains(page_id) && !self.pool.delete_page(page_id) {
            return Err(EmberError::Internal(format!(
                "page {} is pinned and cannot be freed",
                page_id
            )));
        }
        self.disk.free_page(page_id)
    }

    /// Copies a page into `buf`, loading it into the cache on a miss.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.check_open()?;
        if let Some(guard) = self.pool.read_page(page_id) {
            buf.copy_from_slice(&**guard.data());
            return Ok(());
        }

        self.disk.read_page(page_id, buf)?;
        let (_, evicted) = self.pool.load_page(page_id, buf)?;
        self.pool.unpin_page(page_id, false);
        self.write_back(evicted)
    }

    /// Replaces the contents of an allocated page. Shorter `data` is zero
    /// padded. Freed pages are `PageNotFound`.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        self.check_open()?;
        if data.len() > PAGE_SIZE {
            return Err(EmberError::InvalidParameter {
                name: "data.len".to_string(),
                value: data.len().to_string(),
            });
        }
        self.disk.check_page(page_id)?;

        if let Some(guard) = self.pool.write_page(page_id) {
            let mut page = guard.data_mut();
            page[..data.len()].copy_from_slice(data);
            page[data.len()..].fill(0);
            drop(page);
            guard.set_dirty();
            return Ok(());
        }

        let (_, evicted) = self.pool.load_page(page_id, data)?;
        self.pool.unpin_page(page_id, true);
        self.write_back(evicted)
    }

    /// Writes every dirty cached page to disk and syncs the file.
    pub fn flush(&self) -> Result<usize> {
        self.check_open()?;
        let flushed = self.pool.flush_all(|page_id, data| {
            let mut page = [0u8; PAGE_SIZE];
            page.copy_from_slice(data);
            self.disk.write_page(page_id, &page)
        })?;
        self.disk.flush()?;
        debug!(pages = flushed, "flushed dirty pages");
        Ok(flushed)
    }

    /// Flushes and closes. Every later call fails with `StorageClosed`.
    pub fn close(&self) -> Result<()> {
        self.flush()?;
        self.closed.store(true, Ordering::Release);
        self.disk.close()?;
        info!("pager closed");
        Ok(())
    }

    /// Number of pages in the file, including the header page.
    pub fn num_pages(&self) -> Result<u32> {
        self.check_open()?;
        self.disk.num_pages()
    }

    pub fn free_pages(&self) -> Result<Vec<PageId>> {
        self.check_open()?;
        self.disk.free_pages()
    }

    pub fn cache_stats(&self) -> BufferPoolStats {
        self.pool.stats()
    }
}
