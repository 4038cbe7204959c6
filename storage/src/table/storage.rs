use super::{Config, Error, Keys, Row, Schema};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use commonware_utils::hex;
use std::{
    collections::{BTreeMap, BTreeSet},
    mem::take,
};
use tracing::{debug, warn};
use wordindex_runtime::{Blob, Storage};

/// Magic bytes identifying a table blob.
const MAGIC: [u8; 4] = *b"ATBL";

/// Current version of the table format.
const VERSION: u16 = 1;

/// Length of the fixed part of the header (magic, version, column count).
const HEADER_PREFIX: usize = 8;

/// Status byte of a slot that holds no row.
const FREE: u8 = 0;

/// Status byte of a slot that holds a row.
const OCCUPIED: u8 = 1;

/// Number of slots read at once when rebuilding the index.
const REPLAY_SLOTS: usize = 256;

/// Encode the header describing `schema`.
fn encode_header(schema: &Schema) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(header_len(schema));
    buf.put_slice(&MAGIC);
    buf.put_u16(VERSION);
    buf.put_u16(schema.columns() as u16);
    for width in schema.widths() {
        buf.put_u32(*width as u32);
    }
    let crc = crc32fast::hash(&buf);
    buf.put_u32(crc);
    buf.to_vec()
}

fn header_len(schema: &Schema) -> usize {
    HEADER_PREFIX + 4 * schema.columns() + 4
}

/// Length of a slot: status byte, row, checksum.
fn record_len(schema: &Schema) -> usize {
    1 + schema.row_width() + 4
}

/// A sorted map from fixed-width keys to fixed-width rows, persisted in a single [Blob].
///
/// The ordered index of keys is held in memory and rebuilt from the blob on [Table::open].
/// Mutations are staged in a write buffer and reach the blob once the buffer fills or on
/// [Table::sync]. A table that is dropped without being closed flushes and syncs any
/// unsynced writes on a best-effort basis.
///
/// A table assumes a single writer; it performs no internal locking.
pub struct Table<E: Storage> {
    storage: E,
    config: Config,
    schema: Schema,
    blob: E::Blob,

    // Layout
    header_len: u64,
    record_len: usize,
    slots: u64,

    // Ordered index of keys to slots
    index: BTreeMap<Bytes, u64>,
    free: BTreeSet<u64>,

    // Records staged in the write buffer
    pending: BTreeMap<u64, Vec<u8>>,
    pending_bytes: usize,

    // Whether records were written to the blob since the last sync
    dirty: bool,
}

impl<E: Storage> Table<E> {
    /// Whether a table blob named `name` exists in `storage`.
    pub fn exists(storage: &E, name: &str) -> Result<bool, Error> {
        Ok(storage.exists(name)?)
    }

    /// Create an empty table, overwriting any blob with the same name.
    pub fn create(storage: E, config: Config, schema: Schema) -> Result<Self, Error> {
        schema.validate()?;
        let (blob, len) = storage.open(&config.name)?;
        if len > 0 {
            warn!(name = %config.name, len, "overwriting existing blob");
            blob.resize(0)?;
        }
        let header = encode_header(&schema);
        blob.write_at(&header, 0)?;
        blob.sync()?;
        debug!(name = %config.name, columns = schema.columns(), "created table");

        Ok(Self::new(
            storage,
            config,
            schema,
            blob,
            header.len() as u64,
            0,
            BTreeMap::new(),
            BTreeSet::new(),
        ))
    }

    /// Open an existing table, reading its schema from the blob header and rebuilding
    /// the index from all occupied slots.
    pub fn open(storage: E, config: Config) -> Result<Self, Error> {
        let (blob, len) = storage.open(&config.name)?;

        // Read the header
        let schema = Self::read_header(&blob, len)?;
        let header_len = header_len(&schema) as u64;
        let record_len = record_len(&schema);

        // Drop any partially written trailing record
        let mut body = len - header_len;
        if body % record_len as u64 != 0 {
            warn!(
                name = %config.name,
                invalid_size = body,
                record_len,
                "blob size is not a multiple of record size, truncating"
            );
            body -= body % record_len as u64;
            blob.resize(header_len + body)?;
            blob.sync()?;
        }
        let slots = body / record_len as u64;

        // Rebuild the index
        let mut index = BTreeMap::new();
        let mut free = BTreeSet::new();
        let mut slot = 0;
        while slot < slots {
            let batch = std::cmp::min(REPLAY_SLOTS as u64, slots - slot);
            let mut buf = vec![0u8; batch as usize * record_len];
            blob.read_at(&mut buf, header_len + slot * record_len as u64)?;
            for record in buf.chunks_exact(record_len) {
                if Self::verify(record, slot)? {
                    let key = &record[1..1 + schema.key_width()];
                    if let Some(previous) = index.insert(Bytes::copy_from_slice(key), slot) {
                        warn!(slot, previous, key = %hex(key), "duplicate key");
                        return Err(Error::DuplicateRecord(slot));
                    }
                } else {
                    free.insert(slot);
                }
                slot += 1;
            }
        }
        debug!(
            name = %config.name,
            entries = index.len(),
            free = free.len(),
            "opened table"
        );

        Ok(Self::new(
            storage, config, schema, blob, header_len, slots, index, free,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        storage: E,
        config: Config,
        schema: Schema,
        blob: E::Blob,
        header_len: u64,
        slots: u64,
        index: BTreeMap<Bytes, u64>,
        free: BTreeSet<u64>,
    ) -> Self {
        let record_len = record_len(&schema);
        Self {
            storage,
            config,
            schema,
            blob,
            header_len,
            record_len,
            slots,
            index,
            free,
            pending: BTreeMap::new(),
            pending_bytes: 0,
            dirty: false,
        }
    }

    fn read_header(blob: &E::Blob, len: u64) -> Result<Schema, Error> {
        if len < HEADER_PREFIX as u64 {
            return Err(Error::InvalidHeader(format!("blob too short: {len}")));
        }
        let mut prefix = [0u8; HEADER_PREFIX];
        blob.read_at(&mut prefix, 0)?;
        let mut buf = &prefix[..];
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(Error::InvalidHeader(format!(
                "invalid magic: expected {MAGIC:?}, found {magic:?}"
            )));
        }
        let version = buf.get_u16();
        if version != VERSION {
            return Err(Error::InvalidHeader(format!(
                "unsupported version: expected {VERSION}, found {version}"
            )));
        }
        let columns = buf.get_u16() as usize;

        // Read column widths and checksum
        let total = HEADER_PREFIX + 4 * columns + 4;
        if len < total as u64 {
            return Err(Error::InvalidHeader(format!(
                "blob too short for {columns} columns: {len}"
            )));
        }
        let mut header = vec![0u8; total];
        blob.read_at(&mut header, 0)?;
        let stored = (&header[total - 4..]).get_u32();
        let computed = crc32fast::hash(&header[..total - 4]);
        if stored != computed {
            return Err(Error::InvalidHeader(format!(
                "checksum mismatch: stored {stored}, computed {computed}"
            )));
        }
        let mut buf = &header[HEADER_PREFIX..total - 4];
        let widths = (0..columns).map(|_| buf.get_u32() as usize).collect();
        let schema = Schema::new(widths);
        schema.validate()?;
        Ok(schema)
    }

    /// Verify a record read from `slot`, returning whether it holds a row.
    fn verify(record: &[u8], slot: u64) -> Result<bool, Error> {
        match record[0] {
            FREE => Ok(false),
            OCCUPIED => {
                let (body, crc) = record.split_at(record.len() - 4);
                let stored = (&crc[..]).get_u32();
                if stored != crc32fast::hash(body) {
                    return Err(Error::InvalidRecord(slot));
                }
                Ok(true)
            }
            _ => Err(Error::InvalidRecord(slot)),
        }
    }

    fn encode_record(&self, row: &Row) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.record_len);
        buf.put_u8(OCCUPIED);
        for column in row.columns() {
            buf.put_slice(column);
        }
        let crc = crc32fast::hash(&buf);
        buf.put_u32(crc);
        buf.to_vec()
    }

    fn offset(&self, slot: u64) -> u64 {
        self.header_len + slot * self.record_len as u64
    }

    /// Read the row stored at `slot`, preferring the write buffer over the blob.
    fn read(&self, slot: u64, key: &[u8]) -> Result<Row, Error> {
        let record = match self.pending.get(&slot) {
            Some(record) => record.clone(),
            None => {
                let mut record = vec![0u8; self.record_len];
                self.blob.read_at(&mut record, self.offset(slot))?;
                record
            }
        };
        if !Self::verify(&record, slot)? {
            return Err(Error::InvalidRecord(slot));
        }
        let row = Bytes::from(record).slice(1..1 + self.schema.row_width());
        let row = Row::split(row, &self.schema);
        if row.key() != key {
            return Err(Error::InvalidRecord(slot));
        }
        Ok(row)
    }

    /// Stage a record in the write buffer, flushing if the buffer is full.
    fn stage(&mut self, slot: u64, record: Vec<u8>) -> Result<(), Error> {
        self.pending_bytes += record.len();
        if let Some(previous) = self.pending.insert(slot, record) {
            self.pending_bytes -= previous.len();
        }
        if self.pending_bytes >= self.config.write_buffer {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all staged records to the blob (without syncing).
    fn flush(&mut self) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.dirty = true;
        self.pending_bytes = 0;
        for (slot, record) in take(&mut self.pending) {
            self.blob.write_at(&record, self.offset(slot))?;
        }
        Ok(())
    }

    /// Insert or replace the row keyed by its first column, returning the replaced row.
    pub fn put(&mut self, row: &Row) -> Result<Option<Row>, Error> {
        if !row.matches(&self.schema) {
            return Err(Error::RowMismatch {
                expected: self.schema.widths().to_vec(),
                found: row.widths(),
            });
        }
        let record = self.encode_record(row);

        // Replace in place
        if let Some(&slot) = self.index.get(row.key()) {
            let previous = self.read(slot, row.key())?;
            self.stage(slot, record)?;
            return Ok(Some(previous));
        }

        // Reuse the lowest free slot or append a new one
        let slot = match self.free.pop_first() {
            Some(slot) => slot,
            None => {
                self.slots += 1;
                self.slots - 1
            }
        };
        self.stage(slot, record)?;
        self.index.insert(Bytes::copy_from_slice(row.key()), slot);
        Ok(None)
    }

    /// Get the row stored for `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Row>, Error> {
        match self.index.get(key) {
            Some(&slot) => self.read(slot, key).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a row is stored for `key`.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Remove and return the row stored for `key`.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<Row>, Error> {
        let Some(&slot) = self.index.get(key) else {
            return Ok(None);
        };
        let row = self.read(slot, key)?;
        self.stage(slot, vec![FREE; self.record_len])?;
        self.index.remove(key);
        self.free.insert(slot);
        Ok(Some(row))
    }

    /// Iterate over keys starting at `start`. See [Keys].
    pub fn keys(&self, start: &[u8], ascending: bool, rotate: bool) -> Keys<'_> {
        Keys::new(&self.index, start, ascending, rotate)
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Flush the write buffer and durably persist the blob.
    pub fn sync(&mut self) -> Result<(), Error> {
        self.flush()?;
        self.blob.sync()?;
        self.dirty = false;
        Ok(())
    }

    /// Sync and close the table.
    pub fn close(mut self) -> Result<(), Error> {
        self.sync()
    }

    /// Discard all staged records and remove the table's blob.
    pub fn destroy(mut self) -> Result<(), Error> {
        self.pending.clear();
        self.pending_bytes = 0;
        self.dirty = false;
        self.storage.remove(&self.config.name)?;
        debug!(name = %self.config.name, "destroyed table");
        Ok(())
    }
}

impl<E: Storage> Drop for Table<E> {
    fn drop(&mut self) {
        if self.pending.is_empty() && !self.dirty {
            return;
        }
        if let Err(err) = self.sync() {
            warn!(name = %self.config.name, ?err, "failed to flush table on drop");
        }
    }
}
