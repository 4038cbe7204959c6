use bytes::Bytes;
use std::{
    collections::{btree_map::Range, BTreeMap},
    iter::FusedIterator,
    ops::Bound::{self, Excluded, Included, Unbounded},
};

/// Lazy iterator over the keys of a [super::Table] starting at an arbitrary key.
///
/// Ascending iteration begins at the first key `>= start`, descending iteration at the
/// first key `<= start`. When rotating, the iterator wraps to the opposite end of the
/// key space once the natural end is reached and stops just before returning to where
/// it began, so every key is yielded exactly once.
pub struct Keys<'a> {
    first: Range<'a, Bytes, u64>,
    second: Option<Range<'a, Bytes, u64>>,
    ascending: bool,
}

impl<'a> Keys<'a> {
    pub(super) fn new(
        index: &'a BTreeMap<Bytes, u64>,
        start: &[u8],
        ascending: bool,
        rotate: bool,
    ) -> Self {
        let (head, tail): ((Bound<&[u8]>, Bound<&[u8]>), (Bound<&[u8]>, Bound<&[u8]>)) =
            if ascending {
                ((Included(start), Unbounded), (Unbounded, Excluded(start)))
            } else {
                ((Unbounded, Included(start)), (Excluded(start), Unbounded))
            };
        Self {
            first: index.range::<[u8], _>(head),
            second: rotate.then(|| index.range::<[u8], _>(tail)),
            ascending,
        }
    }

    fn step(range: &mut Range<'a, Bytes, u64>, ascending: bool) -> Option<&'a [u8]> {
        let next = if ascending {
            range.next()
        } else {
            range.next_back()
        };
        next.map(|(key, _)| key.as_ref())
    }
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(key) = Self::step(&mut self.first, self.ascending) {
            return Some(key);
        }
        Self::step(self.second.as_mut()?, self.ascending)
    }
}

impl FusedIterator for Keys<'_> {}
