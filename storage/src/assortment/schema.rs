//! Row layout of an assortment and conversion between [Container]s and [Row]s.
//!
//! A row of an assortment with capacity `N` has `3 + 2N` columns:
//!
//! ```text
//! | word hash (12) | counter (4) | updated (8) | url hash (12) | attributes (18) | ... |
//!                                               \________ repeated N times _________/
//! ```
//!
//! The counter and the update time are big-endian integers. Entries are written in
//! container order and read back in the same order.

use super::{
    Attributes, Container, Entry, Error, UrlHash, WordHash, ATTRIBUTES_LENGTH, COUNTER_LENGTH,
    TIMESTAMP_LENGTH, URL_HASH_LENGTH, WORD_HASH_LENGTH,
};
use crate::table::{Row, Schema};
use bytes::Bytes;

/// Value written to the counter column of every row.
pub const COUNTER: u32 = 1;

/// Number of leading columns before the entries.
const PREFIX_COLUMNS: usize = 3;

/// Number of columns used by a row of an assortment with `capacity` entries.
pub fn columns(capacity: usize) -> usize {
    PREFIX_COLUMNS + 2 * capacity
}

/// Derive the column widths of an assortment with `capacity` entries.
pub fn derive(capacity: usize) -> Schema {
    let mut widths = Vec::with_capacity(columns(capacity));
    widths.extend([WORD_HASH_LENGTH, COUNTER_LENGTH, TIMESTAMP_LENGTH]);
    for _ in 0..capacity {
        widths.extend([URL_HASH_LENGTH, ATTRIBUTES_LENGTH]);
    }
    Schema::new(widths)
}

/// Encode `container` as a row of an assortment with `capacity` entries.
pub fn encode(container: &Container, capacity: usize) -> Result<Row, Error> {
    if container.len() != capacity {
        return Err(Error::SizeMismatch {
            expected: capacity,
            found: container.len(),
        });
    }
    let mut row = Vec::with_capacity(columns(capacity));
    row.push(Bytes::copy_from_slice(container.word().as_ref()));
    row.push(Bytes::copy_from_slice(&COUNTER.to_be_bytes()));
    row.push(Bytes::copy_from_slice(&container.updated().to_be_bytes()));
    for entry in container {
        row.push(Bytes::copy_from_slice(entry.url.as_ref()));
        row.push(Bytes::copy_from_slice(entry.attributes.as_ref()));
    }
    Ok(Row::new(row))
}

/// Decode a row of an assortment with `capacity` entries.
pub fn decode(row: &Row, capacity: usize) -> Result<Container, Error> {
    if row.len() != columns(capacity) {
        return Err(Error::MalformedRow {
            expected: columns(capacity),
            found: row.len(),
        });
    }
    let word = WordHash::new(fixed(row, 0)?);

    // The counter carries no information
    fixed::<COUNTER_LENGTH>(row, 1)?;
    let updated = u64::from_be_bytes(fixed(row, 2)?);

    let mut entries = Vec::with_capacity(capacity);
    for i in 0..capacity {
        let column = PREFIX_COLUMNS + 2 * i;
        let url = UrlHash::new(fixed(row, column)?);
        let attributes = Attributes::new(fixed(row, column + 1)?);
        entries.push(Entry::new(url, attributes));
    }
    Ok(Container::with_entries(word, updated, entries))
}

/// Read `column` of `row` as an array of exactly `N` bytes.
fn fixed<const N: usize>(row: &Row, column: usize) -> Result<[u8; N], Error> {
    let value = row.column(column).map(|value| &value[..]).unwrap_or_default();
    value.try_into().map_err(|_| Error::MalformedColumn {
        column,
        expected: N,
        found: value.len(),
    })
}
