//! Per-URI texture bookkeeping for a mounted gallery.
//!
//! Each unique URI is tracked independently as pending, loaded or failed, so
//! a single broken image never blocks the rest of the catalog. Handles are
//! generic so the cache can hold GPU textures in the viewer and plain values
//! in tests.

use std::collections::HashMap;

use crate::events::CatalogEntry;

#[derive(Debug)]
pub enum TextureState<H> {
    Pending,
    Loaded(H),
    Failed,
}

impl<H> TextureState<H> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Load progress counted per catalog entry, so a URI listed twice counts twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub settled: usize,
    pub loaded: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.settled >= self.total
    }
}

#[derive(Debug)]
pub struct TextureCache<H> {
    /// Catalog order, one URI per entry (duplicates allowed).
    order: Vec<String>,
    states: HashMap<String, TextureState<H>>,
}

impl<H> TextureCache<H> {
    pub fn new(entries: &[CatalogEntry]) -> Self {
        let states = entries
            .iter()
            .map(|entry| (entry.uri.clone(), TextureState::Pending))
            .collect();
        Self {
            order: entries.iter().map(|e| e.uri.clone()).collect(),
            states,
        }
    }

    /// Stores a loaded handle. Returns `false` for URIs outside the catalog.
    pub fn resolve(&mut self, uri: &str, handle: H) -> bool {
        match self.states.get_mut(uri) {
            Some(state) => {
                *state = TextureState::Loaded(handle);
                true
            }
            None => false,
        }
    }

    /// Marks a URI as failed. A loaded texture is never downgraded.
    pub fn fail(&mut self, uri: &str) -> bool {
        match self.states.get_mut(uri) {
            Some(state) if matches!(state, TextureState::Pending) => {
                *state = TextureState::Failed;
                true
            }
            _ => false,
        }
    }

    /// Fails every URI still pending and returns how many there were.
    pub fn fail_pending(&mut self) -> usize {
        let mut failed = 0;
        for state in self.states.values_mut() {
            if matches!(state, TextureState::Pending) {
                *state = TextureState::Failed;
                failed += 1;
            }
        }
        failed
    }

    /// Loaded handle for a catalog index; `None` while pending, after failure,
    /// or for an out-of-range index.
    pub fn get(&self, catalog_index: usize) -> Option<&H> {
        let uri = self.order.get(catalog_index)?;
        match self.states.get(uri)? {
            TextureState::Loaded(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn progress(&self) -> Progress {
        let mut settled = 0;
        let mut loaded = 0;
        for state in self.order.iter().filter_map(|uri| self.states.get(uri)) {
            if state.is_settled() {
                settled += 1;
            }
            if matches!(state, TextureState::Loaded(_)) {
                loaded += 1;
            }
        }
        Progress {
            settled,
            loaded,
            total: self.order.len(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.states.values().all(TextureState::is_settled)
    }
}
