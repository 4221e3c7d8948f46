//! Identifier interning.
//!
//! Every identifier the parser touches is stored exactly once and handed
//! around as a `Name` index, so symbol-table keys and signature parameters
//! compare as integers. All interned text lives concatenated in a single
//! buffer: the emitter resolves thousands of names back to text when it
//! prints signatures, members, and scope dumps, and a resolution is then a
//! slice into one allocation instead of a pointer chase per identifier.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Index of an interned identifier.
///
/// Handed out in insertion order; a `Name` is only meaningful together with
/// the interner that produced it, and two names from the same interner are
/// equal exactly when their text is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Name(u32);

impl Name {
    /// The underlying index, for dumps and dense side tables.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Rebuild a Name from a stored index. Pair it only with the interner
    /// that issued the index.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// Deduplicating identifier store.
///
/// Layout: one concatenated text buffer, a span table indexed by `Name`,
/// and hash buckets whose candidates are confirmed against the buffer. No
/// identifier is ever stored twice, and no per-identifier allocation
/// survives interning.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    /// Concatenated identifier text.
    text: String,
    /// Half-open byte range into `text`, indexed by name.
    spans: Vec<(u32, u32)>,
    /// Identifier hash to the names sharing it; ties break by text compare.
    buckets: HashMap<u64, Vec<Name>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_of(identifier: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        identifier.hash(&mut hasher);
        hasher.finish()
    }

    fn span_text(&self, name: Name) -> &str {
        let (start, end) = self.spans[name.0 as usize];
        &self.text[start as usize..end as usize]
    }

    /// Store `identifier` once, returning its Name; interning the same text
    /// again hands back the original Name.
    pub fn intern(&mut self, identifier: &str) -> Name {
        let hash = Self::hash_of(identifier);
        if let Some(bucket) = self.buckets.get(&hash) {
            for &candidate in bucket {
                if self.span_text(candidate) == identifier {
                    return candidate;
                }
            }
        }

        let start = self.text.len() as u32;
        self.text.push_str(identifier);
        let name = Name(self.spans.len() as u32);
        self.spans.push((start, self.text.len() as u32));
        self.buckets.entry(hash).or_default().push(name);
        name
    }

    /// The text behind a Name.
    ///
    /// # Panics
    /// Panics when the name's index is out of range, i.e. it was issued by
    /// a different interner.
    #[inline]
    pub fn resolve(&self, name: Name) -> &str {
        self.span_text(name)
    }

    /// Fallible [`resolve`](Self::resolve), for indices of unknown origin
    /// (deserialized dumps and the like).
    pub fn try_resolve(&self, name: Name) -> Option<&str> {
        ((name.0 as usize) < self.spans.len()).then(|| self.span_text(name))
    }

    /// Look an identifier up without interning it.
    pub fn find(&self, identifier: &str) -> Option<Name> {
        let bucket = self.buckets.get(&Self::hash_of(identifier))?;
        bucket
            .iter()
            .copied()
            .find(|&name| self.span_text(name) == identifier)
    }

    /// Number of distinct identifiers stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Walk `(name, text)` pairs in insertion order.
    pub fn names(&self) -> impl Iterator<Item = (Name, &str)> {
        (0..self.spans.len() as u32)
            .map(Name)
            .map(|name| (name, self.span_text(name)))
    }
}
