use std::path::Path;

use log::{error, info};

use crate::error::{Error, Result};
use crate::pager::Pager;
use crate::row::Row;
use crate::{ROWS_PER_PAGE, TABLE_MAX_ROWS};

/// The single table of the database: a row count over a pager.
///
/// Row `i` lives in page `i / ROWS_PER_PAGE` at slot `i % ROWS_PER_PAGE`.
pub struct Table {
    pager: Pager,
    num_rows: usize,
}

impl Table {
    pub fn open<P>(filename: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let filename = filename.as_ref();
        let mut pager = Pager::open(filename)?;
        let num_rows = pager.num_rows_on_disk()?;

        info!("opened {} with {num_rows} rows", filename.display());
        Ok(Table { pager, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_full(&self) -> bool {
        self.num_rows >= TABLE_MAX_ROWS
    }

    /// Byte slot of `row_num`, loading or allocating its page.
    pub fn row_slot(&mut self, row_num: usize) -> Result<&mut [u8]> {
        let page_num = row_num / ROWS_PER_PAGE;
        let row_offset = row_num % ROWS_PER_PAGE;
        let page = self.pager.get(page_num)?;
        Ok(page.row_slot_mut(row_offset))
    }

    /// Appends a row after the last one.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        if self.is_full() {
            return Err(Error::TableFull);
        }
        let mut cursor = self.cursor_at_end();
        row.serialize(cursor.value_mut()?);
        self.num_rows += 1;
        Ok(())
    }

    pub fn cursor_at_start(&mut self) -> Cursor<'_> {
        let end_of_table = self.num_rows == 0;
        Cursor {
            table: self,
            row_num: 0,
            end_of_table,
        }
    }

    pub fn cursor_at_end(&mut self) -> Cursor<'_> {
        let row_num = self.num_rows;
        Cursor {
            table: self,
            row_num,
            end_of_table: true,
        }
    }

    /// Flushes every loaded page and closes the file.
    pub fn close(&mut self) -> Result<()> {
        self.pager.close()
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to flush table on drop: {e}");
        }
    }
}

/// Forward-only position in a table.
pub struct Cursor<'table> {
    table: &'table mut Table,
    row_num: usize,
    end_of_table: bool,
}

impl Cursor<'_> {
    pub fn row_num(&self) -> usize {
        self.row_num
    }

    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }

    /// Slot under the cursor. Callers check `end_of_table` first.
    pub fn value(&mut self) -> Result<&[u8]> {
        Ok(&*self.table.row_slot(self.row_num)?)
    }

    pub fn value_mut(&mut self) -> Result<&mut [u8]> {
        self.table.row_slot(self.row_num)
    }

    pub fn advance(&mut self) {
        if self.end_of_table {
            return;
        }
        self.row_num += 1;
        if self.row_num >= self.table.num_rows {
            self.end_of_table = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PAGE_SIZE, TABLE_MAX_PAGES};
    use std::fs;
    use tempfile::TempDir;

    fn user_row(i: usize) -> Row {
        Row::new(i as u32, &format!("user{i}"), &format!("person{i}@example.com")).unwrap()
    }

    fn scan(table: &mut Table) -> Vec<String> {
        let mut rows = Vec::new();
        let mut cursor = table.cursor_at_start();
        while !cursor.end_of_table() {
            rows.push(Row::deserialize(cursor.value().unwrap()).to_string());
            cursor.advance();
        }
        rows
    }

    #[test]
    fn it_starts_empty() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();

        assert_eq!(table.num_rows(), 0);
        assert!(table.cursor_at_start().end_of_table());
        assert!(scan(&mut table).is_empty());
    }

    #[test]
    fn it_scans_in_insertion_order_across_pages() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();

        let count = ROWS_PER_PAGE * 2 + 1;
        for i in (0..count).rev() {
            table.insert(&user_row(i)).unwrap();
        }

        let expected: Vec<String> = (0..count).rev().map(|i| user_row(i).to_string()).collect();
        assert_eq!(scan(&mut table), expected);
    }

    #[test]
    fn it_positions_cursors() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        table.insert(&user_row(1)).unwrap();
        table.insert(&user_row(2)).unwrap();

        let start = table.cursor_at_start();
        assert_eq!(start.row_num(), 0);
        assert!(!start.end_of_table());

        let mut end = table.cursor_at_end();
        assert_eq!(end.row_num(), 2);
        assert!(end.end_of_table());
        end.advance();
        assert_eq!(end.row_num(), 2);
    }

    #[test]
    fn it_persists_rows_after_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        let before = {
            let mut table = Table::open(&path).unwrap();
            for i in 0..5 {
                table.insert(&user_row(i)).unwrap();
            }
            let rows = scan(&mut table);
            table.close().unwrap();
            rows
        };

        let mut table = Table::open(&path).unwrap();
        assert_eq!(table.num_rows(), 5);
        assert_eq!(scan(&mut table), before);
    }

    #[test]
    fn it_flushes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut table = Table::open(&path).unwrap();
            table.insert(&user_row(9)).unwrap();
        }

        assert_eq!(fs::metadata(&path).unwrap().len(), PAGE_SIZE as u64);
        let mut table = Table::open(&path).unwrap();
        assert_eq!(scan(&mut table), vec![user_row(9).to_string()]);
    }

    #[test]
    fn it_rejects_inserts_past_capacity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let mut table = Table::open(&path).unwrap();

        for i in 0..TABLE_MAX_ROWS {
            table.insert(&user_row(i)).unwrap();
        }
        assert!(table.is_full());
        assert!(matches!(
            table.insert(&user_row(TABLE_MAX_ROWS)),
            Err(Error::TableFull)
        ));
        assert_eq!(table.num_rows(), TABLE_MAX_ROWS);
        table.close().unwrap();

        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            (TABLE_MAX_PAGES * PAGE_SIZE) as u64
        );
        let mut table = Table::open(&path).unwrap();
        assert_eq!(table.num_rows(), TABLE_MAX_ROWS);
        let rows = scan(&mut table);
        assert_eq!(rows.last(), Some(&user_row(TABLE_MAX_ROWS - 1).to_string()));
    }

    #[test]
    fn it_appends_after_recovered_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let half = TABLE_MAX_ROWS / 2;

        {
            let mut table = Table::open(&path).unwrap();
            for i in 0..half {
                table.insert(&user_row(i)).unwrap();
            }
            table.close().unwrap();
        }

        let mut table = Table::open(&path).unwrap();
        assert_eq!(table.num_rows(), half);
        table.insert(&user_row(9999)).unwrap();

        let rows = scan(&mut table);
        assert_eq!(rows.len(), half + 1);
        assert_eq!(rows[0], user_row(0).to_string());
        assert_eq!(rows.last(), Some(&user_row(9999).to_string()));
    }

    #[test]
    fn it_reports_io_errors_from_a_closed_table() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        table.insert(&user_row(1)).unwrap();
        table.close().unwrap();
        table.close().unwrap();

        let mut cursor = table.cursor_at_start();
        assert!(matches!(cursor.value(), Err(Error::PagerClosed)));
    }

    #[test]
    fn it_fails_to_open_a_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Table::open(dir.path()), Err(Error::Io(_))));
    }
}
