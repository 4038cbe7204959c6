//! A [crate::Storage] wrapper that fails operations on demand.
//!
//! Faults are toggled through a shared [Faults] handle, so a test can hand the
//! wrapped storage to a store, flip a switch, and observe how the store reacts to
//! a failing disk without touching the store's internals.

use crate::{Blob as BlobTrait, Error, Storage as StorageTrait};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tracing::debug;

#[derive(Default)]
struct Switches {
    open: AtomicBool,
    remove: AtomicBool,
    read: AtomicBool,
    write: AtomicBool,
    sync: AtomicBool,
    next_write: AtomicBool,
    injected: AtomicU64,
}

/// Shared switches controlling which operations fail.
#[derive(Clone, Default)]
pub struct Faults {
    switches: Arc<Switches>,
}

impl Faults {
    pub fn fail_opens(&self, enabled: bool) {
        self.switches.open.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, enabled: bool) {
        self.switches.remove.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, enabled: bool) {
        self.switches.read.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, enabled: bool) {
        self.switches.write.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_syncs(&self, enabled: bool) {
        self.switches.sync.store(enabled, Ordering::SeqCst);
    }

    /// Fail only the next write (or resize).
    pub fn fail_next_write(&self) {
        self.switches.next_write.store(true, Ordering::SeqCst);
    }

    /// Disable all faults.
    pub fn clear(&self) {
        self.fail_opens(false);
        self.fail_removes(false);
        self.fail_reads(false);
        self.fail_writes(false);
        self.fail_syncs(false);
        self.switches.next_write.store(false, Ordering::SeqCst);
    }

    /// Number of operations that were failed so far.
    pub fn injected(&self) -> u64 {
        self.switches.injected.load(Ordering::SeqCst)
    }

    fn check(&self, switch: &AtomicBool, op: &'static str, name: &str) -> Result<(), Error> {
        if !switch.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.inject(op, name)
    }

    fn check_write(&self, op: &'static str, name: &str) -> Result<(), Error> {
        if self.switches.next_write.swap(false, Ordering::SeqCst) {
            return self.inject(op, name);
        }
        self.check(&self.switches.write, op, name)
    }

    fn inject(&self, op: &'static str, name: &str) -> Result<(), Error> {
        self.switches.injected.fetch_add(1, Ordering::SeqCst);
        debug!(op, name, "injecting fault");
        Err(Error::Injected(op, name.into()))
    }
}

/// Storage that delegates to `inner` unless a fault is enabled.
#[derive(Clone)]
pub struct Storage<S: StorageTrait> {
    inner: S,
    faults: Faults,
}

impl<S: StorageTrait> Storage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    /// The handle used to toggle faults for this storage and every blob it opens.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

impl<S: StorageTrait> StorageTrait for Storage<S> {
    type Blob = Blob<S::Blob>;

    fn open(&self, name: &str) -> Result<(Self::Blob, u64), Error> {
        self.faults.check(&self.faults.switches.open, "open", name)?;
        let (inner, len) = self.inner.open(name)?;
        Ok((
            Blob {
                inner,
                faults: self.faults.clone(),
                name: name.into(),
            },
            len,
        ))
    }

    fn exists(&self, name: &str) -> Result<bool, Error> {
        self.inner.exists(name)
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        self.faults.check(&self.faults.switches.remove, "remove", name)?;
        self.inner.remove(name)
    }
}

/// Blob that delegates to `inner` unless a fault is enabled.
#[derive(Clone)]
pub struct Blob<B: BlobTrait> {
    inner: B,
    faults: Faults,
    name: String,
}

impl<B: BlobTrait> BlobTrait for Blob<B> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        self.faults
            .check(&self.faults.switches.read, "read", &self.name)?;
        self.inner.read_at(buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        self.faults.check_write("write", &self.name)?;
        self.inner.write_at(buf, offset)
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        self.faults.check_write("resize", &self.name)?;
        self.inner.resize(len)
    }

    fn sync(&self) -> Result<(), Error> {
        self.faults
            .check(&self.faults.switches.sync, "sync", &self.name)?;
        self.inner.sync()
    }
}
