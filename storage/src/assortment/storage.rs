use super::{blob_name, schema, Config, Container, Error, WordHash, MAX_CAPACITY};
use crate::table::{self, Schema, Table};
use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};
use tracing::{debug, error, info, warn};
use wordindex_runtime::Storage;

/// The words occurring in exactly `capacity` documents.
///
/// Each word is stored as one fixed-width row of a [Table] kept in the blob named by
/// [blob_name]. Any failure of the table while storing, removing, or reading a word
/// discards the blob and replaces it with an empty table (every stored word is lost)
/// before the failure is returned as [Error::StorageFailure]. If the empty table cannot be
/// created either, the assortment becomes unavailable ([Error::Unavailable]) and every
/// later operation first attempts the rebuild again.
///
/// An assortment has a single writer: mutating operations take `&mut self` and callers
/// sharing an assortment across threads must serialize access (for example with one
/// mutex per assortment). This also covers recovery, which is never observed half done.
pub struct Assortment<E: Storage> {
    storage: E,
    cfg: Config,
    name: String,
    schema: Schema,

    table: Option<Table<E>>,
    closed: bool,

    stores: Counter,
    removes: Counter,
    resets: Counter,
    entries: Gauge,
}

impl<E: Storage> Assortment<E> {
    /// Open the assortment stored in `storage`, creating it if it does not exist.
    ///
    /// If the table can be neither opened nor created, the failure is logged and the
    /// assortment is returned unavailable.
    pub fn init(storage: E, registry: &mut Registry, cfg: Config) -> Result<Self, Error> {
        if cfg.capacity == 0 || cfg.capacity > MAX_CAPACITY {
            return Err(Error::InvalidCapacity(cfg.capacity));
        }
        let name = blob_name(cfg.capacity);
        let schema = schema::derive(cfg.capacity);

        // Initialize metrics
        let stores = Counter::default();
        let removes = Counter::default();
        let resets = Counter::default();
        let entries = Gauge::default();
        {
            let registry =
                registry.sub_registry_with_prefix(format!("assortment_{:03}", cfg.capacity));
            registry.register("stores", "Number of words stored", stores.clone());
            registry.register("removes", "Number of words removed", removes.clone());
            registry.register(
                "resets",
                "Number of times the assortment was rebuilt empty after a storage failure",
                resets.clone(),
            );
            registry.register("entries", "Number of words held", entries.clone());
        }

        let mut assortment = Self {
            storage,
            cfg,
            name,
            schema,
            table: None,
            closed: false,
            stores,
            removes,
            resets,
            entries,
        };
        match assortment.load() {
            Ok(table) => {
                assortment.entries.set(table.len() as i64);
                assortment.table = Some(table);
            }
            Err(err) => error!(name = %assortment.name, ?err, "failed to open assortment"),
        }
        Ok(assortment)
    }

    fn table_config(&self) -> table::Config {
        table::Config {
            name: self.name.clone(),
            write_buffer: self.cfg.write_buffer,
        }
    }

    /// Open the existing table or create an empty one.
    fn load(&self) -> Result<Table<E>, table::Error> {
        if !Table::exists(&self.storage, &self.name)? {
            let table =
                Table::create(self.storage.clone(), self.table_config(), self.schema.clone())?;
            info!(name = %self.name, "created assortment");
            return Ok(table);
        }
        let table = Table::open(self.storage.clone(), self.table_config())?;
        if table.schema() != &self.schema {
            warn!(
                name = %self.name,
                expected = ?self.schema.widths(),
                found = ?table.schema().widths(),
                "stored schema does not match capacity"
            );
        }
        info!(name = %self.name, entries = table.len(), "opened assortment");
        Ok(table)
    }

    /// Discard the current table (without flushing) and create an empty one.
    fn rebuild(&mut self) -> Result<Table<E>, table::Error> {
        self.entries.set(0);
        if let Some(table) = self.table.take() {
            if let Err(err) = table.destroy() {
                warn!(name = %self.name, ?err, "failed to destroy table");
            }
        }
        let table =
            Table::create(self.storage.clone(), self.table_config(), self.schema.clone())?;
        self.resets.inc();
        info!(name = %self.name, "rebuilt assortment");
        Ok(table)
    }

    /// Reset the assortment after `err` was returned by the table during `op`.
    fn reset(&mut self, op: &'static str, err: table::Error) -> Error {
        warn!(name = %self.name, op, ?err, "storage failure, resetting assortment");
        match self.rebuild() {
            Ok(table) => {
                self.table = Some(table);
                Error::StorageFailure(err)
            }
            Err(err) => {
                error!(name = %self.name, ?err, "failed to rebuild assortment");
                Error::Unavailable(err)
            }
        }
    }

    /// The table, rebuilding it first if the assortment is unavailable.
    fn table(&mut self) -> Result<&mut Table<E>, Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        let table = match self.table.take() {
            Some(table) => table,
            None => self.rebuild().map_err(|err| {
                error!(name = %self.name, ?err, "assortment unavailable");
                Error::Unavailable(err)
            })?,
        };
        Ok(self.table.insert(table))
    }

    /// Store the occurrences of `word`.
    ///
    /// `container` must belong to `word` and hold exactly [Assortment::capacity] entries.
    /// Storing a word that is already present fails with [Error::DuplicateKey] and leaves
    /// the stored row untouched. A failed store is never retried.
    pub fn store(&mut self, word: &WordHash, container: &Container) -> Result<(), Error> {
        if container.word() != word {
            return Err(Error::WordMismatch {
                expected: *word,
                found: *container.word(),
            });
        }
        let row = schema::encode(container, self.cfg.capacity)?;
        let table = self.table()?;
        if table.contains(word.as_ref()) {
            return Err(Error::DuplicateKey(*word));
        }
        if let Err(err) = table.put(&row) {
            return Err(self.reset("store", err));
        }
        self.stores.inc();
        self.entries.inc();
        debug!(name = %self.name, %word, "stored word");
        Ok(())
    }

    /// Remove and return the occurrences of `word`.
    pub fn remove(&mut self, word: &WordHash) -> Result<Option<Container>, Error> {
        let result = self.table()?.remove(word.as_ref());
        let row = match result {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(err) => return Err(self.reset("remove", err)),
        };
        self.removes.inc();
        self.entries.dec();
        debug!(name = %self.name, %word, "removed word");
        schema::decode(&row, self.cfg.capacity).map(Some)
    }

    /// Get the occurrences of `word` without removing them.
    pub fn get(&mut self, word: &WordHash) -> Result<Option<Container>, Error> {
        let result = self.table()?.get(word.as_ref());
        let row = match result {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(err) => return Err(self.reset("get", err)),
        };
        schema::decode(&row, self.cfg.capacity).map(Some)
    }

    /// Whether `word` is stored.
    pub fn contains(&self, word: &WordHash) -> bool {
        self.table
            .as_ref()
            .is_some_and(|table| table.contains(word.as_ref()))
    }

    /// Iterate over stored words starting at `start`.
    ///
    /// Ascending iteration begins at the first word `>= start`, descending iteration at the
    /// first word `<= start`. With `rotate`, iteration wraps around once the end is reached
    /// and yields every stored word exactly once. Yields nothing if the assortment is
    /// unavailable and cannot be rebuilt.
    ///
    /// Keys that are not word hashes (a stored schema that does not match the capacity) are
    /// logged and skipped.
    pub fn hashes(
        &mut self,
        start: &WordHash,
        ascending: bool,
        rotate: bool,
    ) -> impl Iterator<Item = WordHash> + '_ {
        let name = self.name.clone();
        let keys = match self.table() {
            Ok(table) => Some(table.keys(start.as_ref(), ascending, rotate)),
            Err(err) => {
                warn!(%name, ?err, "cannot iterate over assortment");
                None
            }
        };
        keys.into_iter()
            .flatten()
            .filter_map(move |key| match WordHash::try_from(key) {
                Ok(word) => Some(word),
                Err(_) => {
                    warn!(%name, len = key.len(), "skipping key of unexpected width");
                    None
                }
            })
    }

    /// Number of stored words (zero while unavailable).
    pub fn size(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    pub fn capacity(&self) -> usize {
        self.cfg.capacity
    }

    /// The schema derived from the capacity.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Name of the blob holding the assortment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the assortment currently has a usable table.
    pub fn is_available(&self) -> bool {
        self.table.is_some()
    }

    /// Flush pending writes and release the table.
    ///
    /// Closing an already closed (or unavailable) assortment does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        let Some(table) = self.table.take() else {
            return Ok(());
        };
        table.close().map_err(Error::CloseFailed)?;
        debug!(name = %self.name, "closed assortment");
        Ok(())
    }
}
