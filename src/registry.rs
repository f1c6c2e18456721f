//! Shared-buffer id bookkeeping.
//!
//! Registering the same numeric buffer id for graphics interop from two different
//! rendering contexts corrupts driver state. Every context that registers buffers
//! checks its ids here first. The set only grows.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use bevy::prelude::*;
use tracing::warn;

use crate::error::{Result, TsdfError};

/// Process-wide set of shared-buffer ids already registered.
///
/// Cloning is cheap and yields a handle to the same set, so one registry can be
/// handed to several apps or windows.
#[derive(Resource, Clone, Default, Debug)]
pub struct ResourceIdRegistry {
    ids: Arc<Mutex<HashSet<u32>>>,
}

impl ResourceIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as used. Returns `true` if it was **already** in use.
    ///
    /// The check and the insert happen under one lock, so two concurrent callers
    /// with the same id never both see it as free.
    pub fn register_if_unused(&self, id: u32) -> bool {
        let newly_added = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        if !newly_added {
            warn!(id, "shared buffer id already registered by another context");
        }
        !newly_added
    }

    /// Like [`register_if_unused`](ResourceIdRegistry::register_if_unused), as a [`Result`].
    pub fn try_register(&self, id: u32) -> Result<()> {
        if self.register_if_unused(id) {
            return Err(TsdfError::ResourceIdInUse(id));
        }
        Ok(())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn second_registration_conflicts() {
        let registry = ResourceIdRegistry::new();
        assert!(!registry.register_if_unused(42));
        assert!(registry.register_if_unused(42));
        assert!(!registry.register_if_unused(43));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clones_share_one_set() {
        let a = ResourceIdRegistry::new();
        let b = a.clone();
        assert!(!a.register_if_unused(7));
        assert!(b.contains(7));
        assert_eq!(b.try_register(7), Err(TsdfError::ResourceIdInUse(7)));
        assert_eq!(b.try_register(8), Ok(()));
    }

    #[test]
    fn concurrent_registrants_see_one_winner() {
        let registry = ResourceIdRegistry::new();
        let fresh: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| (0..100).filter(|&id| !registry.register_if_unused(id)).count()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(fresh, 100);
    }
}
