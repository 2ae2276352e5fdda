//! Read-mostly cache of materialized entities keyed by primary key.

use hashbrown::HashMap;
use relmap_core::schema::Entity;
use relmap_core::value::{Key, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Entities of one type, loaded once and kept current by the writers that
/// mutate them.
#[derive(Debug)]
pub struct EntityCache<E> {
    entries: RwLock<HashMap<Key, Arc<E>>>,
}

impl<E> Default for EntityCache<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_of(entity: &E) -> Key {
        E::schema().primary_key_of(entity).key()
    }

    /// Replaces the whole content, e.g. with the result of a startup query.
    pub fn load(&self, entities: impl IntoIterator<Item = E>) {
        let fresh: HashMap<Key, Arc<E>> = entities
            .into_iter()
            .map(|e| (Self::key_of(&e), Arc::new(e)))
            .collect();
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// Adds `entity` unless its key is already cached. Returns whether it was added.
    pub fn insert(&self, entity: E) -> bool {
        let key = Self::key_of(&entity);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, Arc::new(entity));
        true
    }

    /// Swaps in a new version of a cached entity. Unknown keys are left alone.
    pub fn replace(&self, entity: E) -> bool {
        let key = Self::key_of(&entity);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&key) {
            Some(slot) => {
                *slot = Arc::new(entity);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: impl Into<Value>) -> Option<Arc<E>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.into().key())
    }

    pub fn get(&self, id: impl Into<Value>) -> Option<Arc<E>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.into().key())
            .cloned()
    }

    /// Snapshot of every cached entity, in no particular order.
    pub fn all(&self) -> Vec<Arc<E>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
