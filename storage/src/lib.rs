//! Partition a word index into fixed-width assortments keyed by occurrence count.
//!
//! Words that appear on exactly `N` documents are stored in an [assortment] of
//! width `N`: a [table] whose rows hold the word hash, an occurrence counter, the
//! time of the last update, and exactly `N` (url hash, attributes) pairs. A
//! [cluster] groups the assortments `1..=max` of one index and migrates words
//! between them as their occurrence count changes.
//!
//! # Status
//!
//! `wordindex-storage` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

pub mod assortment;
pub mod cluster;
pub mod table;
