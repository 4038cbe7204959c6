use super::{Config, Error};
use crate::assortment::{self, Assortment, Container, WordHash, MAX_CAPACITY};
use prometheus_client::registry::Registry;
use tracing::{debug, warn};
use wordindex_runtime::Storage;

/// The assortments with capacities `1..=max` of one word index.
///
/// A word lives in at most one assortment: the one whose capacity equals its number of
/// occurrences. Storing new occurrences for a word moves it to the assortment matching the
/// merged count. Words with more than `max` occurrences are handed back to the caller.
pub struct Cluster<E: Storage> {
    assortments: Vec<Assortment<E>>,
}

impl<E: Storage> Cluster<E> {
    /// Open (or create) every assortment of the cluster.
    pub fn init(storage: E, registry: &mut Registry, cfg: Config) -> Result<Self, Error> {
        if cfg.max == 0 || cfg.max > MAX_CAPACITY {
            return Err(Error::InvalidCapacity(cfg.max));
        }
        let mut assortments = Vec::with_capacity(cfg.max);
        for capacity in 1..=cfg.max {
            let assortment = Assortment::init(
                storage.clone(),
                registry,
                assortment::Config {
                    capacity,
                    write_buffer: cfg.write_buffer,
                },
            )?;
            assortments.push(assortment);
        }
        let cluster = Self { assortments };
        debug!(
            max = cfg.max,
            words = cluster.size_total(),
            "initialized cluster"
        );
        Ok(cluster)
    }

    /// Add the occurrences in `container` to `word`.
    ///
    /// Any occurrences already stored for `word` are removed and merged with `container`
    /// (entries of `container` win). The result is stored in the assortment matching its
    /// size. If it has more than [Cluster::max] entries, nothing is stored and the merged
    /// container is returned instead.
    ///
    /// The stored occurrences are removed before the merged container is written. If that
    /// write fails, the error is returned and the occurrences of `word` are lost.
    pub fn store(
        &mut self,
        word: &WordHash,
        container: Container,
    ) -> Result<Option<Container>, Error> {
        if container.word() != word {
            return Err(assortment::Error::WordMismatch {
                expected: *word,
                found: *container.word(),
            }
            .into());
        }
        let merged = match self.remove(word)? {
            Some(mut existing) => {
                existing.merge(container);
                existing
            }
            None => container,
        };
        if merged.is_empty() {
            return Ok(None);
        }
        if merged.len() > self.max() {
            debug!(%word, entries = merged.len(), "word exceeds cluster");
            return Ok(Some(merged));
        }
        let assortment = &mut self.assortments[merged.len() - 1];
        if let Err(err) = assortment.store(word, &merged) {
            warn!(%word, entries = merged.len(), ?err, "failed to store word");
            return Err(err.into());
        }
        Ok(None)
    }

    /// Remove `word` from whichever assortment holds it.
    pub fn remove(&mut self, word: &WordHash) -> Result<Option<Container>, Error> {
        for assortment in self.assortments.iter_mut() {
            if let Some(container) = assortment.remove(word)? {
                return Ok(Some(container));
            }
        }
        Ok(None)
    }

    /// Get the occurrences of `word`.
    pub fn get(&mut self, word: &WordHash) -> Result<Option<Container>, Error> {
        for assortment in self.assortments.iter_mut() {
            if let Some(container) = assortment.get(word)? {
                return Ok(Some(container));
            }
        }
        Ok(None)
    }

    /// Number of words in each assortment, by capacity (starting at 1).
    pub fn sizes(&self) -> Vec<usize> {
        self.assortments.iter().map(Assortment::size).collect()
    }

    /// Number of words in the cluster.
    pub fn size_total(&self) -> usize {
        self.assortments.iter().map(Assortment::size).sum()
    }

    /// Largest capacity of the cluster.
    pub fn max(&self) -> usize {
        self.assortments.len()
    }

    /// The assortment with `capacity` entries per word.
    pub fn assortment(&mut self, capacity: usize) -> Option<&mut Assortment<E>> {
        capacity
            .checked_sub(1)
            .and_then(|index| self.assortments.get_mut(index))
    }

    /// Close every assortment, returning the first failure.
    pub fn close(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for assortment in self.assortments.iter_mut() {
            if let Err(err) = assortment.close() {
                warn!(name = assortment.name(), ?err, "failed to close assortment");
                if result.is_ok() {
                    result = Err(err.into());
                }
            }
        }
        result
    }
}
