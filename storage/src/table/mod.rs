//! A file-backed sorted map from fixed-width keys to fixed-width rows.
//!
//! [Table] stores rows whose layout is fixed by a [Schema]: an ordered list of column
//! widths where the first column is the key. Rows are kept in equally sized slots of a
//! single [wordindex_runtime::Blob]; an in-memory ordered index maps each key to its slot
//! and is rebuilt from the blob when the table is opened.
//!
//! # Format
//!
//! The blob starts with a header describing the schema, followed by slots:
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! |     Magic     |Version|Columns|   Width 0     |...|    CRC32      |
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//!
//! +---+---+---+---+---+---+---+---+---+---+---+---+
//! |St.|  Column 0 (key)  |  ...  |    CRC32      |  (one slot)
//! +---+---+---+---+---+---+---+---+---+---+---+---+
//!
//! St. = Status (0 = free, 1 = occupied)
//! ```
//!
//! _The checksum of a slot covers the status byte and the row. A free slot is all zeros
//! and is reused by the next insert._
//!
//! # Consistency
//!
//! An occupied slot with a bad checksum, a slot with an unknown status, a duplicate key,
//! or a damaged header is reported as an [Error] when the table is opened or the slot is
//! read. A partially written trailing slot (from an unclean shutdown) is truncated on open.
//! Looking up a key that is not stored is not an error.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use wordindex_runtime::storage::memory;
//! use wordindex_storage::table::{Config, Row, Schema, Table};
//!
//! let storage = memory::Storage::default();
//! let config = Config {
//!     name: "table".to_string(),
//!     write_buffer: 1024,
//! };
//! let mut table = Table::create(storage, config, Schema::new(vec![2, 3])).unwrap();
//!
//! // Insert a row keyed by its first column
//! let row = Row::new(vec![Bytes::from_static(b"k1"), Bytes::from_static(b"abc")]);
//! assert!(table.put(&row).unwrap().is_none());
//!
//! // Read it back
//! assert_eq!(table.get(b"k1").unwrap(), Some(row));
//!
//! // Close the table (flushing the write buffer)
//! table.close().unwrap();
//! ```

mod keys;
mod row;
mod storage;

pub use keys::Keys;
pub use row::{Row, Schema};
pub use storage::Table;
use thiserror::Error;

/// Errors that can occur when interacting with a [Table].
#[derive(Debug, Error)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] wordindex_runtime::Error),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("invalid record at slot {0}")]
    InvalidRecord(u64),
    #[error("duplicate record at slot {0}")]
    DuplicateRecord(u64),
    #[error("row mismatch: expected widths {expected:?}, found {found:?}")]
    RowMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Configuration for [Table] storage.
#[derive(Clone)]
pub struct Config {
    /// The name of the [wordindex_runtime::Blob] holding the table.
    pub name: String,

    /// The number of bytes of mutations to buffer in memory before writing them to the blob.
    pub write_buffer: usize,
}
