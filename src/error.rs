use thiserror::Error;

/// Errors raised by the storage layer (pager and table).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tried to fetch page number out of bounds. {page_num} >= {max}")]
    PageOutOfBounds { page_num: usize, max: usize },

    #[error("Pager is closed")]
    PagerClosed,

    #[error("Table full.")]
    TableFull,
}

pub type Result<T> = std::result::Result<T, Error>;
