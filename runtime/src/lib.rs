//! Read and write blobs through a pluggable, synchronous storage backend.
//!
//! Every store in `wordindex-storage` is written against the [Storage] and [Blob]
//! traits defined here rather than against the filesystem directly. This keeps
//! on-disk formats independent of where bytes end up and makes failure paths
//! testable: [storage::memory] keeps blobs in memory and [storage::faulty] wraps any
//! backend to inject I/O errors on demand.
//!
//! # Status
//!
//! `wordindex-runtime` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use std::io::Error as IoError;
use thiserror::Error;

pub mod storage;

/// Errors that can occur when interacting with [Storage] or a [Blob].
#[derive(Error, Debug)]
pub enum Error {
    #[error("blob name invalid, must only contain alphanumeric, dash ('-'), underscore ('_'), or dot ('.') characters: {0}")]
    NameInvalid(String),
    #[error("directory creation failed: {0} error: {1}")]
    DirectoryCreationFailed(String, IoError),
    #[error("blob open failed: {0} error: {1}")]
    BlobOpenFailed(String, IoError),
    #[error("blob missing: {0}")]
    BlobMissing(String),
    #[error("blob resize failed: {0} error: {1}")]
    BlobResizeFailed(String, IoError),
    #[error("blob sync failed: {0} error: {1}")]
    BlobSyncFailed(String, IoError),
    #[error("blob insufficient length")]
    BlobInsufficientLength,
    #[error("read failed")]
    ReadFailed,
    #[error("write failed")]
    WriteFailed,
    #[error("offset overflow")]
    OffsetOverflow,
    #[error("injected {0} fault: {1}")]
    Injected(&'static str, String),
    #[error("io error: {0}")]
    Io(#[from] IoError),
}

/// Interface to interact with storage.
///
/// To support storage implementations that enable concurrent reads and
/// writes, blobs are responsible for maintaining synchronization.
///
/// Storage can be backed by a local filesystem, cloud storage, etc.
pub trait Storage: Clone + Send + Sync + 'static {
    /// The readable/writeable storage buffer that can be opened by this Storage.
    type Blob: Blob;

    /// Open an existing blob or create a new one, returning the blob and its length.
    ///
    /// Multiple instances of the same blob can be opened, however, writing to the same
    /// blob through different instances may lead to undefined behavior.
    fn open(&self, name: &str) -> Result<(Self::Blob, u64), Error>;

    /// Check whether a blob with the given name exists.
    fn exists(&self, name: &str) -> Result<bool, Error>;

    /// Remove a blob.
    ///
    /// An Ok result indicates the blob is durably removed.
    fn remove(&self, name: &str) -> Result<(), Error>;
}

/// Interface to read and write to a blob.
///
/// Cloning a blob is similar to wrapping a single file descriptor in
/// a lock whereas opening a new blob (of the same name) is similar to
/// opening a new file descriptor.
///
/// When a blob is dropped, any unsynced changes may be discarded. Implementations
/// may attempt to sync during drop but errors will go unhandled. Call `sync`
/// before dropping to ensure all changes are durably persisted.
pub trait Blob: Clone + Send + Sync + 'static {
    /// Read from the blob at the given offset.
    ///
    /// `read_at` does not return the number of bytes read because it
    /// only returns once the entire buffer has been filled.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error>;

    /// Write `buf` to the blob at the given offset.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error>;

    /// Resize the blob to the given length.
    ///
    /// If the length is greater than the current length, the blob is extended with zeros.
    /// If the length is less than the current length, the blob is truncated.
    fn resize(&self, len: u64) -> Result<(), Error>;

    /// Ensure all pending data is durably persisted.
    fn sync(&self) -> Result<(), Error>;
}
