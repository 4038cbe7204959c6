use super::{ATTRIBUTES_LENGTH, URL_HASH_LENGTH, WORD_HASH_LENGTH};
use commonware_utils::hex;
use std::{array::TryFromSliceError, fmt};

macro_rules! fixed_bytes {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            pub const fn new(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = TryFromSliceError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                value.try_into().map(Self)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex(&self.0))
            }
        }
    };
}

fixed_bytes!(
    /// Identifier of a word. Keys every row of an assortment.
    WordHash,
    WORD_HASH_LENGTH
);

fixed_bytes!(
    /// Identifier of a document.
    UrlHash,
    URL_HASH_LENGTH
);

fixed_bytes!(
    /// Opaque per-occurrence attributes (position, frequency, flags, ...).
    Attributes,
    ATTRIBUTES_LENGTH
);

/// One occurrence of a word in a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    pub url: UrlHash,
    pub attributes: Attributes,
}

impl Entry {
    pub fn new(url: UrlHash, attributes: Attributes) -> Self {
        Self { url, attributes }
    }
}

/// The occurrences of a single word.
///
/// Entries are unique by [UrlHash] and keep the order in which they were first added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    word: WordHash,
    updated: u64,
    entries: Vec<Entry>,
}

impl Container {
    /// Create an empty container last updated at `updated` (milliseconds since the epoch).
    pub fn new(word: WordHash, updated: u64) -> Self {
        Self {
            word,
            updated,
            entries: Vec::new(),
        }
    }

    /// Create a container holding `entries`.
    ///
    /// Entries sharing a [UrlHash] are collapsed into the first position, keeping the last value.
    pub fn with_entries(word: WordHash, updated: u64, entries: Vec<Entry>) -> Self {
        let mut container = Self {
            word,
            updated,
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            container.add(entry);
        }
        container
    }

    /// Add an entry, replacing (in place) and returning any entry for the same document.
    pub fn add(&mut self, entry: Entry) -> Option<Entry> {
        match self.entries.iter_mut().find(|e| e.url == entry.url) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// Merge `other` into this container.
    ///
    /// Entries of `other` win and the newest update time is kept.
    pub fn merge(&mut self, other: Container) {
        self.updated = self.updated.max(other.updated);
        for entry in other.entries {
            self.add(entry);
        }
    }

    /// Remove the entry for `url`.
    pub fn remove(&mut self, url: &UrlHash) -> Option<Entry> {
        let position = self.entries.iter().position(|e| &e.url == url)?;
        Some(self.entries.remove(position))
    }

    pub fn get(&self, url: &UrlHash) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.url == url)
    }

    pub fn word(&self) -> &WordHash {
        &self.word
    }

    pub fn updated(&self) -> u64 {
        self.updated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;

    fn entry(url: u8, attributes: u8) -> Entry {
        Entry::new(
            UrlHash::new([url; URL_HASH_LENGTH]),
            Attributes::new([attributes; ATTRIBUTES_LENGTH]),
        )
    }

    #[test_traced]
    fn test_add_replaces_in_place() {
        let word = WordHash::new([1; WORD_HASH_LENGTH]);
        let mut container = Container::new(word, 10);
        assert!(container.add(entry(1, 0)).is_none());
        assert!(container.add(entry(2, 0)).is_none());
        assert_eq!(container.add(entry(1, 9)), Some(entry(1, 0)));
        assert_eq!(container.entries(), &[entry(1, 9), entry(2, 0)]);
    }

    #[test_traced]
    fn test_with_entries_dedups() {
        let word = WordHash::new([1; WORD_HASH_LENGTH]);
        let container =
            Container::with_entries(word, 10, vec![entry(3, 0), entry(4, 0), entry(3, 1)]);
        assert_eq!(container.len(), 2);
        assert_eq!(container.entries(), &[entry(3, 1), entry(4, 0)]);
    }

    #[test_traced]
    fn test_merge() {
        let word = WordHash::new([1; WORD_HASH_LENGTH]);
        let mut old = Container::with_entries(word, 20, vec![entry(1, 0), entry(2, 0)]);
        let new = Container::with_entries(word, 10, vec![entry(2, 5), entry(3, 5)]);
        old.merge(new);
        assert_eq!(old.updated(), 20);
        assert_eq!(old.entries(), &[entry(1, 0), entry(2, 5), entry(3, 5)]);

        assert_eq!(old.remove(&UrlHash::new([1; URL_HASH_LENGTH])), Some(entry(1, 0)));
        assert!(old.get(&UrlHash::new([1; URL_HASH_LENGTH])).is_none());
        assert_eq!(old.len(), 2);
    }

    #[test_traced]
    fn test_display() {
        let word = WordHash::new([0xab; WORD_HASH_LENGTH]);
        assert_eq!(word.to_string(), "ab".repeat(WORD_HASH_LENGTH));
        assert!(WordHash::try_from(&[0u8; 3][..]).is_err());
        assert_eq!(WordHash::try_from(word.as_ref()).unwrap(), word);
    }
}
