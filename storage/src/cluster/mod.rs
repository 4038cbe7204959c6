//! Move words between assortments as their number of occurrences changes.
//!
//! A [Cluster] opens the assortments with capacities `1..=max` over the same
//! [wordindex_runtime::Storage]. Storing occurrences for a word merges them with whatever
//! the cluster already holds for it and files the result under the matching capacity.
//!
//! # Example
//!
//! ```rust
//! use prometheus_client::registry::Registry;
//! use wordindex_runtime::storage::memory;
//! use wordindex_storage::{
//!     assortment::{Attributes, Container, Entry, UrlHash, WordHash},
//!     cluster::{Cluster, Config},
//! };
//!
//! let mut cluster = Cluster::init(
//!     memory::Storage::default(),
//!     &mut Registry::default(),
//!     Config {
//!         max: 4,
//!         write_buffer: 4096,
//!     },
//! )
//! .unwrap();
//!
//! // The word is seen in one document, then in another
//! let word = WordHash::new([1; 12]);
//! for url in [1, 2] {
//!     let mut container = Container::new(word, url as u64);
//!     container.add(Entry::new(UrlHash::new([url; 12]), Attributes::new([0; 18])));
//!     assert!(cluster.store(&word, container).unwrap().is_none());
//! }
//! assert_eq!(cluster.sizes(), vec![0, 1, 0, 0]);
//! cluster.close().unwrap();
//! ```

mod storage;

use crate::assortment;
pub use storage::Cluster;
use thiserror::Error;

/// Errors that can occur when interacting with a [Cluster].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid maximum capacity: {0}")]
    InvalidCapacity(usize),
    #[error("assortment error: {0}")]
    Assortment(#[from] assortment::Error),
}

/// Configuration for a [Cluster].
#[derive(Clone)]
pub struct Config {
    /// The largest capacity of the cluster.
    pub max: usize,

    /// The write buffer of each assortment.
    pub write_buffer: usize,
}
