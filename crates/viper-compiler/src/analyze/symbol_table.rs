//! Per-scope symbol storage: an insertion-ordered open-addressed hashmap.
//!
//! Elements live densely in insertion order; a separate lookup array of
//! signed indices (−1 empty) at twice the element capacity resolves keys by
//! XXH64 + linear probe. Duplicate puts are dropped: the first occurrence of
//! an identifier within a scope wins. After the owning scope is sealed the
//! table is finalized and further puts are a programming error.
//!
//! `get` returns element *indices*, not references; a resize moves elements,
//! so holding an index across puts is safe where holding a pointer was not.

use twox_hash::XxHash64;

use crate::analyze::types::TypeInfo;
use crate::pool::{ClassId, FuncId, VarId};
use viper_core::Name;

const HASH_SEED: u64 = 0;
const INITIAL_CAPACITY: usize = 8;
const LOOKUP_RATIO: usize = 2;

/// One resolved name in a scope.
#[derive(Clone, Debug)]
pub enum Symbol {
    Variable(VarId),
    /// Module-level variable seen from an inner scope.
    Global(VarId),
    Function(FuncId),
    Class(ClassId),
    /// Annotated class member: its name and declared type.
    Member(Name, TypeInfo),
}

#[derive(Debug)]
struct Entry {
    key: String,
    symbol: Symbol,
}

/// Insertion-ordered open-addressed symbol map, keyed by identifier text.
#[derive(Debug, Default)]
pub struct SymbolTable {
    elements: Vec<Entry>,
    /// Slot -> element index, −1 for empty. Sized `LOOKUP_RATIO` x capacity.
    lookup: Vec<i32>,
    capacity: usize,
    finalized: bool,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            lookup: vec![-1; INITIAL_CAPACITY * LOOKUP_RATIO],
            capacity: INITIAL_CAPACITY,
            finalized: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn hash(key: &str) -> u64 {
        XxHash64::oneshot(HASH_SEED, key.as_bytes())
    }

    /// Insert `symbol` under `key`. Returns `true` if the symbol was stored,
    /// `false` when the key was already present (first-insertion wins).
    ///
    /// # Panics
    /// Panics if called after [`finalize`](Self::finalize); the scope
    /// machinery never inserts into a sealed scope.
    pub fn put(&mut self, key: &str, symbol: Symbol) -> bool {
        assert!(!self.finalized, "symbol table insert after finalization");

        if self.elements.len() * 2 >= self.lookup.len() {
            self.grow();
        }

        let element_index = self.elements.len();
        if self.lookup_insert(element_index, key) {
            self.elements.push(Entry {
                key: key.to_owned(),
                symbol,
            });
            true
        } else {
            false
        }
    }

    /// Claim a lookup slot for `element_index` unless the key already owns
    /// one.
    fn lookup_insert(&mut self, element_index: usize, key: &str) -> bool {
        let mut probe = (Self::hash(key) % self.lookup.len() as u64) as usize;
        loop {
            let slot = self.lookup[probe];
            if slot < 0 {
                self.lookup[probe] = element_index as i32;
                return true;
            }
            if self.elements[slot as usize].key == key {
                return false;
            }
            probe = if probe == self.lookup.len() - 1 { 0 } else { probe + 1 };
        }
    }

    fn grow(&mut self) {
        self.capacity *= 2;
        self.lookup.clear();
        self.lookup.resize(self.capacity * LOOKUP_RATIO, -1);
        for i in 0..self.elements.len() {
            let key = std::mem::take(&mut self.elements[i].key);
            self.lookup_insert(i, &key);
            self.elements[i].key = key;
        }
    }

    /// Find the element index for `key`.
    pub fn get(&self, key: &str) -> Option<usize> {
        if self.elements.is_empty() {
            return None;
        }
        let mut probe = (Self::hash(key) % self.lookup.len() as u64) as usize;
        loop {
            let slot = self.lookup[probe];
            if slot < 0 {
                return None;
            }
            if self.elements[slot as usize].key == key {
                return Some(slot as usize);
            }
            probe = if probe == self.lookup.len() - 1 { 0 } else { probe + 1 };
        }
    }

    /// The symbol at an element index returned by [`get`](Self::get).
    #[inline]
    pub fn symbol(&self, index: usize) -> &Symbol {
        &self.elements[index].symbol
    }

    #[inline]
    pub fn symbol_mut(&mut self, index: usize) -> &mut Symbol {
        &mut self.elements[index].symbol
    }

    /// Iterate symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.elements.iter().map(|e| &e.symbol)
    }

    /// Iterate `(key, symbol)` in insertion order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.elements.iter().map(|e| (e.key.as_str(), &e.symbol))
    }

    /// Seal the table: shed growth slack and forbid further puts. Lookups
    /// keep working.
    pub fn finalize(&mut self) {
        self.elements.shrink_to_fit();
        self.finalized = true;
    }
}
