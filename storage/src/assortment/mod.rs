//! Fixed-width storage for the occurrences of words seen in exactly `N` documents.
//!
//! An [Assortment] of capacity `N` holds one row per word, each row carrying exactly `N`
//! (document, attributes) pairs. Fixing the number of entries per row makes every row the
//! same size, so a word's occurrences can be located and rewritten without a variable-length
//! store. The price is that a word whose occurrence count changes must be removed from one
//! assortment and stored into another (see [crate::cluster]).
//!
//! # Format
//!
//! Each assortment is kept in its own [crate::table::Table] named by [blob_name]
//! (`indexAssortment007.db` for capacity 7). The columns of a row are described in [schema].
//!
//! # Recovery
//!
//! A storage failure (I/O error or inconsistent data) while storing, removing, or reading a
//! word is never repaired in place. The assortment discards its blob, starts over empty, and
//! reports the failure as [Error::StorageFailure]. The failed operation is not retried; callers
//! are expected to re-derive the lost words from elsewhere.
//!
//! # Example
//!
//! ```rust
//! use prometheus_client::registry::Registry;
//! use wordindex_runtime::storage::memory;
//! use wordindex_storage::assortment::{
//!     Assortment, Attributes, Config, Container, Entry, UrlHash, WordHash,
//! };
//!
//! let mut registry = Registry::default();
//! let mut assortment = Assortment::init(
//!     memory::Storage::default(),
//!     &mut registry,
//!     Config {
//!         capacity: 1,
//!         write_buffer: 4096,
//!     },
//! )
//! .unwrap();
//!
//! // Store a word seen in a single document
//! let word = WordHash::new([1; 12]);
//! let mut container = Container::new(word, 1_700_000_000_000);
//! container.add(Entry::new(UrlHash::new([2; 12]), Attributes::new([0; 18])));
//! assortment.store(&word, &container).unwrap();
//!
//! // Move it out again
//! assert_eq!(assortment.remove(&word).unwrap(), Some(container));
//! assortment.close().unwrap();
//! ```

mod container;
pub mod schema;
mod storage;

pub use container::{Attributes, Container, Entry, UrlHash, WordHash};
use prometheus_client::registry::Registry;
use std::path::PathBuf;
pub use storage::Assortment;
use thiserror::Error;
use wordindex_runtime::storage::fs;

/// Length of a [WordHash].
pub const WORD_HASH_LENGTH: usize = 12;

/// Length of the occurrence counter column.
pub const COUNTER_LENGTH: usize = 4;

/// Length of the update timestamp column.
pub const TIMESTAMP_LENGTH: usize = 8;

/// Length of a [UrlHash].
pub const URL_HASH_LENGTH: usize = 12;

/// Length of an [Attributes] block.
pub const ATTRIBUTES_LENGTH: usize = 18;

/// Largest supported capacity (blob names carry three digits).
pub const MAX_CAPACITY: usize = 999;

const BLOB_PREFIX: &str = "indexAssortment";

/// Name of the blob holding the assortment with `capacity` entries per word.
///
/// The capacity is padded to three digits. Assortments are limited to [MAX_CAPACITY] so that
/// every name has the same width.
pub fn blob_name(capacity: usize) -> String {
    format!("{BLOB_PREFIX}{capacity:03}.db")
}

/// Errors that can occur when interacting with an [Assortment].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid capacity: {0}")]
    InvalidCapacity(usize),
    #[error("size mismatch: expected {expected} entries, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("container for {found} stored as {expected}")]
    WordMismatch { expected: WordHash, found: WordHash },
    #[error("duplicate key: {0}")]
    DuplicateKey(WordHash),
    #[error("malformed row: expected {expected} columns, found {found}")]
    MalformedRow { expected: usize, found: usize },
    #[error("malformed column {column}: expected {expected} bytes, found {found}")]
    MalformedColumn {
        column: usize,
        expected: usize,
        found: usize,
    },
    #[error("storage failure, assortment reset: {0}")]
    StorageFailure(crate::table::Error),
    #[error("assortment unavailable: {0}")]
    Unavailable(crate::table::Error),
    #[error("assortment closed")]
    Closed,
    #[error("close failed: {0}")]
    CloseFailed(crate::table::Error),
    #[error("directory unavailable: {0}")]
    Directory(wordindex_runtime::Error),
}

/// Configuration for [Assortment] storage.
#[derive(Clone)]
pub struct Config {
    /// The number of entries of every stored word.
    pub capacity: usize,

    /// The number of bytes of writes to buffer before they are written to the blob.
    pub write_buffer: usize,
}

/// Open (or create) the assortment with `capacity` entries per word in `directory`.
///
/// The directory is created if it does not exist.
pub fn open_or_create(
    directory: impl Into<PathBuf>,
    capacity: usize,
    write_buffer: usize,
    registry: &mut Registry,
) -> Result<Assortment<fs::Storage>, Error> {
    let storage = fs::Storage::new(fs::Config::new(directory)).map_err(Error::Directory)?;
    Assortment::init(
        storage,
        registry,
        Config {
            capacity,
            write_buffer,
        },
    )
}
