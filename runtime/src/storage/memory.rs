use crate::Error;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, RwLock},
};

/// In-memory implementation of [crate::Storage].
///
/// Writes to a [Blob] become visible to subsequent [crate::Storage::open] calls only
/// after [crate::Blob::sync], which mirrors what survives a restart on disk.
#[derive(Clone, Default)]
pub struct Storage {
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self, name: &str) -> Result<(Blob, u64), Error> {
        super::validate_name(name)?;

        let mut blobs = self.blobs.lock().unwrap();
        let content = blobs.entry(name.into()).or_default().clone();
        let len = content.len() as u64;
        Ok((Blob::new(self.blobs.clone(), name, content), len))
    }

    fn exists(&self, name: &str) -> Result<bool, Error> {
        super::validate_name(name)?;
        Ok(self.blobs.lock().unwrap().contains_key(name))
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        super::validate_name(name)?;
        self.blobs
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| Error::BlobMissing(name.into()))?;
        Ok(())
    }
}

/// Implementation of [crate::Blob] for the in-memory [Storage].
#[derive(Clone)]
pub struct Blob {
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    name: String,
    content: Arc<RwLock<Vec<u8>>>,
}

impl Blob {
    fn new(blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>, name: &str, content: Vec<u8>) -> Self {
        Self {
            blobs,
            name: name.into(),
            content: Arc::new(RwLock::new(content)),
        }
    }
}

impl crate::Blob for Blob {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        let offset: usize = offset.try_into().map_err(|_| Error::OffsetOverflow)?;
        let end = offset.checked_add(buf.len()).ok_or(Error::OffsetOverflow)?;
        let content = self.content.read().unwrap();
        if end > content.len() {
            return Err(Error::BlobInsufficientLength);
        }
        buf.copy_from_slice(&content[offset..end]);
        Ok(())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        let offset: usize = offset.try_into().map_err(|_| Error::OffsetOverflow)?;
        let end = offset.checked_add(buf.len()).ok_or(Error::OffsetOverflow)?;
        let mut content = self.content.write().unwrap();
        if end > content.len() {
            content.resize(end, 0);
        }
        content[offset..end].copy_from_slice(buf);
        Ok(())
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        let len: usize = len.try_into().map_err(|_| Error::OffsetOverflow)?;
        self.content.write().unwrap().resize(len, 0);
        Ok(())
    }

    fn sync(&self) -> Result<(), Error> {
        // Snapshot the content before taking the storage lock
        let new_content = self.content.read().unwrap().clone();

        let mut blobs = self.blobs.lock().unwrap();
        let content = blobs
            .get_mut(&self.name)
            .ok_or_else(|| Error::BlobMissing(self.name.clone()))?;
        *content = new_content;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Storage;
    use crate::{storage::tests::run_storage_tests, Blob as _, Error, Storage as _};
    use commonware_macros::test_traced;

    #[test_traced]
    fn test_storage() {
        run_storage_tests(Storage::default());
    }

    #[test_traced]
    fn test_unsynced_writes_invisible() {
        let storage = Storage::default();
        let (blob, _) = storage.open("blob").unwrap();
        blob.write_at(b"pending", 0).unwrap();

        // A fresh handle only sees synced content
        let (_, len) = storage.open("blob").unwrap();
        assert_eq!(len, 0);

        blob.sync().unwrap();
        let (_, len) = storage.open("blob").unwrap();
        assert_eq!(len, 7);
    }

    #[test_traced]
    fn test_sync_after_remove() {
        let storage = Storage::default();
        let (blob, _) = storage.open("blob").unwrap();
        storage.remove("blob").unwrap();
        blob.write_at(b"orphan", 0).unwrap();
        assert!(matches!(blob.sync(), Err(Error::BlobMissing(_))));
    }
}
