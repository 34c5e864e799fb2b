//! Symbol name interning.
//!
//! Symbols are assigned dense `SymbolId`s in first-seen order. Names are
//! interned by leaking the allocation, so the `&'static str` handed out
//! never moves: trades borrow it for the engine's lifetime and callers may
//! hold it across later `get_or_create` calls.
//!
//! The index is shared between the async producer (the only writer) and
//! the matcher worker, which reads a name only when it lazily creates a
//! book; the matching path itself never takes the lock.

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::order::SymbolId;

#[derive(Default)]
struct Inner {
    to_id: HashMap<&'static str, SymbolId>,
    names: Vec<&'static str>,
}

/// Bijection between symbol names and dense integer ids.
#[derive(Default)]
pub struct SymbolIndex {
    inner: RwLock<Inner>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, assigning the next dense id on first use.
    /// O(1) amortised.
    pub fn get_or_create(&self, name: &str) -> SymbolId {
        if let Some(&id) = self.inner.read().to_id.get(name) {
            return id;
        }
        let mut inner = self.inner.write();
        if let Some(&id) = inner.to_id.get(name) {
            return id;
        }
        let id = SymbolId(inner.names.len() as u32);
        let interned: &'static str = Box::leak(name.to_owned().into_boxed_str());
        inner.names.push(interned);
        inner.to_id.insert(interned, id);
        id
    }

    /// Non-mutating lookup.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.inner.read().to_id.get(name).copied()
    }

    /// The interned name for `id`.
    ///
    /// Panics if `id` was not assigned by this index.
    pub fn name(&self, id: SymbolId) -> &'static str {
        self.inner.read().names[id.index()]
    }

    /// Number of symbols assigned so far.
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
