//! Implementations of the [crate::Storage] trait.

pub mod faulty;
pub mod fs;
pub mod memory;

/// Validate that a blob name contains only allowed characters.
///
/// Blob names must only contain alphanumeric characters, dashes ('-'),
/// underscores ('_'), or dots ('.') and may not be `.` or `..`.
pub fn validate_name(name: &str) -> Result<(), crate::Error> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || ['_', '-', '.'].contains(&c)))
    {
        return Err(crate::Error::NameInvalid(name.into()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{Blob, Error, Storage};

    /// Runs the shared suite of storage tests against the provided storage.
    pub(crate) fn run_storage_tests<S: Storage>(storage: S) {
        test_open_and_write(&storage);
        test_remove(&storage);
        test_exists(&storage);
        test_overwrite_data(&storage);
        test_read_beyond_bound(&storage);
        test_write_at_large_offset(&storage);
        test_resize_then_open(&storage);
        test_name_validation(&storage);
        test_read_empty_blob(&storage);
    }

    /// Test opening a blob, writing to it, and reading back the data.
    fn test_open_and_write<S: Storage>(storage: &S) {
        let (blob, len) = storage.open("test_blob").unwrap();
        assert_eq!(len, 0);

        blob.write_at(b"hello world", 0).unwrap();
        let mut read = [0u8; 11];
        blob.read_at(&mut read, 0).unwrap();
        assert_eq!(&read, b"hello world");
        blob.sync().unwrap();

        // Reopen and verify the synced data survived
        let (blob, len) = storage.open("test_blob").unwrap();
        assert_eq!(len, 11);
        let mut read = [0u8; 5];
        blob.read_at(&mut read, 6).unwrap();
        assert_eq!(&read, b"world");

        storage.remove("test_blob").unwrap();
    }

    /// Test removing a blob from storage.
    fn test_remove<S: Storage>(storage: &S) {
        let (blob, _) = storage.open("test_blob").unwrap();
        blob.sync().unwrap();
        storage.remove("test_blob").unwrap();
        assert!(!storage.exists("test_blob").unwrap());

        // Removing again reports the blob as missing
        let result = storage.remove("test_blob");
        assert!(matches!(result, Err(Error::BlobMissing(_))));
    }

    /// Test existence checks before and after creation.
    fn test_exists<S: Storage>(storage: &S) {
        assert!(!storage.exists("exists.db").unwrap());
        let (blob, _) = storage.open("exists.db").unwrap();
        blob.sync().unwrap();
        assert!(storage.exists("exists.db").unwrap());
        storage.remove("exists.db").unwrap();
    }

    /// Test overwriting existing data in a blob.
    fn test_overwrite_data<S: Storage>(storage: &S) {
        let (blob, _) = storage.open("test_overwrite_data").unwrap();
        blob.write_at(b"Hello, World!", 0).unwrap();
        blob.write_at(b"Universe", 7).unwrap();

        let mut buffer = [0u8; 15];
        blob.read_at(&mut buffer, 0).unwrap();
        assert_eq!(&buffer, b"Hello, Universe");
        blob.sync().unwrap();
        storage.remove("test_overwrite_data").unwrap();
    }

    /// Test reading past the end of a blob.
    fn test_read_beyond_bound<S: Storage>(storage: &S) {
        let (blob, _) = storage.open("test_read_beyond_bound").unwrap();
        blob.write_at(b"test", 0).unwrap();

        let mut buffer = [0u8; 10];
        let result = blob.read_at(&mut buffer, 0);
        assert!(matches!(result, Err(Error::BlobInsufficientLength)));
        blob.sync().unwrap();
        storage.remove("test_read_beyond_bound").unwrap();
    }

    /// Test writing at a large offset zero-fills the gap.
    fn test_write_at_large_offset<S: Storage>(storage: &S) {
        let (blob, _) = storage.open("test_write_at_large_offset").unwrap();
        blob.write_at(b"offset data", 10_000).unwrap();
        blob.sync().unwrap();

        let (blob, len) = storage.open("test_write_at_large_offset").unwrap();
        assert_eq!(len, 10_011);
        let mut gap = [0xffu8; 16];
        blob.read_at(&mut gap, 0).unwrap();
        assert_eq!(gap, [0u8; 16]);
        let mut buffer = [0u8; 11];
        blob.read_at(&mut buffer, 10_000).unwrap();
        assert_eq!(&buffer, b"offset data");
        storage.remove("test_write_at_large_offset").unwrap();
    }

    /// Test resizing a blob and reopening it.
    fn test_resize_then_open<S: Storage>(storage: &S) {
        let (blob, _) = storage.open("test_resize_then_open").unwrap();
        blob.write_at(b"hello world", 0).unwrap();
        blob.resize(5).unwrap();
        blob.sync().unwrap();

        let (blob, len) = storage.open("test_resize_then_open").unwrap();
        assert_eq!(len, 5);
        let mut buffer = [0u8; 5];
        blob.read_at(&mut buffer, 0).unwrap();
        assert_eq!(&buffer, b"hello");
        storage.remove("test_resize_then_open").unwrap();
    }

    /// Test that invalid names are rejected.
    fn test_name_validation<S: Storage>(storage: &S) {
        for name in ["", ".", "..", "a/b", "with space", "semi;colon"] {
            assert!(
                matches!(storage.open(name), Err(Error::NameInvalid(_))),
                "{name:?} should be rejected"
            );
        }
        let (blob, _) = storage.open("indexAssortment001.db").unwrap();
        blob.sync().unwrap();
        storage.remove("indexAssortment001.db").unwrap();
    }

    /// Test reading from an empty blob.
    fn test_read_empty_blob<S: Storage>(storage: &S) {
        let (blob, len) = storage.open("empty_blob").unwrap();
        assert_eq!(len, 0);
        let mut buffer = [0u8; 1];
        let result = blob.read_at(&mut buffer, 0);
        assert!(matches!(result, Err(Error::BlobInsufficientLength)));
        let mut nothing = [0u8; 0];
        blob.read_at(&mut nothing, 0).unwrap();
        blob.sync().unwrap();
        storage.remove("empty_blob").unwrap();
    }
}
