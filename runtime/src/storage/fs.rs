use crate::Error;
use std::{
    fs::{self, File},
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Configuration for the directory-backed [Storage].
#[derive(Clone)]
pub struct Config {
    /// Directory holding one file per blob. Created if it does not exist.
    pub storage_directory: PathBuf,
}

impl Config {
    pub fn new(storage_directory: impl Into<PathBuf>) -> Self {
        Self {
            storage_directory: storage_directory.into(),
        }
    }
}

/// Implementation of [crate::Storage] that stores each blob as a file in a single directory.
#[derive(Clone)]
pub struct Storage {
    lock: Arc<Mutex<()>>,
    cfg: Config,
}

impl Storage {
    /// Create a new [Storage], creating the storage directory if it is missing.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        fs::create_dir_all(&cfg.storage_directory).map_err(|e| {
            Error::DirectoryCreationFailed(cfg.storage_directory.display().to_string(), e)
        })?;
        Ok(Self {
            lock: Arc::new(Mutex::new(())),
            cfg,
        })
    }

    fn path(&self, name: &str) -> Result<PathBuf, Error> {
        super::validate_name(name)?;
        Ok(self.cfg.storage_directory.join(name))
    }
}

/// Implementation of [crate::Blob] backed by a file opened for positional I/O.
#[derive(Clone)]
pub struct Blob {
    name: String,
    file: Arc<File>,
}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self, name: &str) -> Result<(Blob, u64), Error> {
        // Acquire the filesystem lock
        let _guard = self.lock.lock().unwrap();

        // Open the file in read-write mode, create if it does not exist
        let path = self.path(name)?;
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::BlobOpenFailed(name.into(), e))?;

        // Get the file length
        let len = file.metadata().map_err(|_| Error::ReadFailed)?.len();
        debug!(name, len, "opened blob");

        Ok((
            Blob {
                name: name.into(),
                file: Arc::new(file),
            },
            len,
        ))
    }

    fn exists(&self, name: &str) -> Result<bool, Error> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.path(name)?.is_file())
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap();
        let path = self.path(name)?;
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(name, "removed blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobMissing(name.into())),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl crate::Blob for Blob {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    Error::BlobInsufficientLength
                } else {
                    Error::ReadFailed
                }
            })?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut read = 0;
            while read < buf.len() {
                let n = self
                    .file
                    .seek_read(&mut buf[read..], offset + read as u64)
                    .map_err(|_| Error::ReadFailed)?;
                if n == 0 {
                    return Err(Error::BlobInsufficientLength);
                }
                read += n;
            }
        }
        Ok(())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file
                .write_all_at(buf, offset)
                .map_err(|_| Error::WriteFailed)?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut written = 0;
            while written < buf.len() {
                let n = self
                    .file
                    .seek_write(&buf[written..], offset + written as u64)
                    .map_err(|_| Error::WriteFailed)?;
                written += n;
            }
        }
        Ok(())
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        self.file
            .set_len(len)
            .map_err(|e| Error::BlobResizeFailed(self.name.clone(), e))
    }

    fn sync(&self) -> Result<(), Error> {
        self.file
            .sync_all()
            .map_err(|e| Error::BlobSyncFailed(self.name.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Storage};
    use crate::{storage::tests::run_storage_tests, Blob as _, Storage as _};
    use commonware_macros::test_traced;
    use rand::{Rng as _, SeedableRng};
    use std::env;

    fn temp_directory(prefix: &str) -> std::path::PathBuf {
        let mut rng = rand::rngs::StdRng::from_entropy();
        env::temp_dir().join(format!("{prefix}_{}", rng.gen::<u64>()))
    }

    #[test_traced]
    fn test_storage() {
        let directory = temp_directory("storage_fs");
        let storage = Storage::new(Config::new(&directory)).unwrap();
        run_storage_tests(storage);
        std::fs::remove_dir_all(directory).unwrap();
    }

    #[test_traced]
    fn test_creates_nested_directory() {
        let root = temp_directory("storage_fs_nested");
        let directory = root.join("a").join("b");
        assert!(!directory.exists());
        let storage = Storage::new(Config::new(&directory)).unwrap();
        assert!(directory.is_dir());

        // Blobs are plain files named after the blob
        let (blob, _) = storage.open("indexAssortment007.db").unwrap();
        blob.write_at(b"abc", 0).unwrap();
        blob.sync().unwrap();
        assert!(directory.join("indexAssortment007.db").is_file());
        std::fs::remove_dir_all(root).unwrap();
    }
}
