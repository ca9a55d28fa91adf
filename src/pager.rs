use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::row;
use crate::{PAGE_SIZE, ROW_SIZE, ROWS_PER_PAGE, TABLE_MAX_PAGES};

/// One `PAGE_SIZE` block of the database file, split into `ROWS_PER_PAGE`
/// row slots. Bytes past the last slot are padding.
pub struct Page {
    buffer: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    fn new() -> Self {
        Self {
            buffer: Box::new([0u8; PAGE_SIZE]),
        }
    }

    pub fn row_slot(&self, row_offset: usize) -> &[u8] {
        let start = row_offset * ROW_SIZE;
        &self.buffer[start..start + ROW_SIZE]
    }

    pub fn row_slot_mut(&mut self, row_offset: usize) -> &mut [u8] {
        let start = row_offset * ROW_SIZE;
        &mut self.buffer[start..start + ROW_SIZE]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..]
    }
}

/// Page cache over the database file.
///
/// Pages are loaded lazily on first access and kept until the pager is
/// closed. Closing writes every loaded page back, changed or not.
pub struct Pager {
    file: Option<File>,
    file_length: u64,
    pages: HashMap<usize, Page>,
}

impl Pager {
    pub fn open<P>(filename: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(filename)?;
        let file_length = file.seek(SeekFrom::End(0))?;

        Ok(Pager {
            file: Some(file),
            file_length,
            pages: HashMap::new(),
        })
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Pages present in the file, counting a trailing partial page.
    pub fn num_pages_on_disk(&self) -> usize {
        self.file_length.div_ceil(PAGE_SIZE as u64) as usize
    }

    pub fn is_loaded(&self, page_num: usize) -> bool {
        self.pages.contains_key(&page_num)
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    pub fn get(&mut self, page_num: usize) -> Result<&mut Page> {
        check_bounds(page_num)?;
        let file = self.file.as_mut().ok_or(Error::PagerClosed)?;

        match self.pages.entry(page_num) {
            Entry::Occupied(o) => Ok(o.into_mut()),
            Entry::Vacant(v) => {
                let mut page = Page::new();
                let pages_on_disk = self.file_length.div_ceil(PAGE_SIZE as u64);

                if (page_num as u64) < pages_on_disk {
                    let bytes_read = read_page(file, page_num, &mut page)?;
                    debug!("loaded page {page_num} from disk ({bytes_read} bytes)");
                } else {
                    debug!("allocated new page {page_num}");
                }

                Ok(v.insert(page))
            }
        }
    }

    /// Writes one cached page back to its offset. Pages never loaded are skipped.
    pub fn flush(&mut self, page_num: usize) -> Result<()> {
        check_bounds(page_num)?;
        let Some(page) = self.pages.get(&page_num) else {
            return Ok(());
        };
        let file = self.file.as_mut().ok_or(Error::PagerClosed)?;

        let offset = (page_num * PAGE_SIZE) as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.as_bytes())?;
        self.file_length = self.file_length.max(offset + PAGE_SIZE as u64);

        debug!("flushed page {page_num} at offset {offset}");
        Ok(())
    }

    pub fn sync_to_disk(&mut self) -> Result<()> {
        for page_num in 0..TABLE_MAX_PAGES {
            self.flush(page_num)?;
        }
        Ok(())
    }

    /// Flushes all loaded pages and releases the file. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.sync_to_disk()?;

        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        self.pages.clear();
        Ok(())
    }

    /// Recovers the row count from the file: every page before the last one
    /// is full, and the last one is filled up to its first empty slot.
    pub fn num_rows_on_disk(&mut self) -> Result<usize> {
        if self.file_length == 0 {
            return Ok(0);
        }
        let last_page = self.num_pages_on_disk() - 1;
        let page = self.get(last_page)?;

        let rows_in_last_page = (0..ROWS_PER_PAGE)
            .take_while(|&i| !row::is_empty_slot(page.row_slot(i)))
            .count();
        let num_rows = last_page * ROWS_PER_PAGE + rows_in_last_page;

        info!(
            "recovered {num_rows} rows from {} bytes ({} pages)",
            self.file_length,
            last_page + 1
        );
        Ok(num_rows)
    }
}

fn check_bounds(page_num: usize) -> Result<()> {
    if page_num >= TABLE_MAX_PAGES {
        return Err(Error::PageOutOfBounds {
            page_num,
            max: TABLE_MAX_PAGES,
        });
    }
    Ok(())
}

/// Reads up to one page at its offset. A short read at end of file leaves
/// the tail of the page zeroed.
fn read_page(file: &mut File, page_num: usize, page: &mut Page) -> Result<usize> {
    file.seek(SeekFrom::Start((page_num * PAGE_SIZE) as u64))?;

    let mut bytes = Vec::with_capacity(PAGE_SIZE);
    file.take(PAGE_SIZE as u64).read_to_end(&mut bytes)?;
    page.buffer[..bytes.len()].copy_from_slice(&bytes);

    Ok(bytes.len())
}
