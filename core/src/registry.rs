//! Registry of JSON-encoded columns per entity type.

use crate::schema::Entity;
use hashbrown::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

/// Shared map from entity type name to its JSON column names.
///
/// Construct one at startup and hand it (usually as `Arc<SchemaRegistry>`) to
/// everything that builds change-sets or scans rows. Entries are only ever
/// added; an entity type appears once its first change-set is built or it is
/// registered explicitly.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    json: RwLock<HashMap<&'static str, HashSet<&'static str>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the JSON columns of `E` and of every entity reachable through its relations.
    pub fn register<E: Entity>(&self) {
        {
            let mut map = self.json.write().unwrap_or_else(PoisonError::into_inner);
            if map.contains_key(E::NAME) {
                return;
            }
            map.insert(E::NAME, E::schema().json_columns().collect());
        }

        for column in E::schema().columns() {
            if let Some(relation) = column.relation() {
                relation.register(self);
            }
        }
    }

    pub fn register_json(&self, entity: &'static str, column: &'static str) {
        self.json
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity)
            .or_default()
            .insert(column);
    }

    pub fn is_registered(&self, entity: &str) -> bool {
        self.json
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity)
    }

    pub fn is_json(&self, entity: &str, column: &str) -> bool {
        self.json
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .is_some_and(|columns| columns.contains(column))
    }

    /// JSON columns of `entity`, sorted.
    pub fn json_columns(&self, entity: &str) -> Vec<&'static str> {
        let map = self.json.read().unwrap_or_else(PoisonError::into_inner);
        let mut columns: Vec<_> = map
            .get(entity)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default();
        columns.sort_unstable();
        columns
    }
}
