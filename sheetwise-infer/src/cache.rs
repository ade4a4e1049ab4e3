use crate::table::InferredTable;
use moka::sync::Cache;
use std::{sync::Arc, time::Duration};

pub const DEFAULT_SCHEMA_TTL_SECS: u64 = 300;
const DEFAULT_CAPACITY: u64 = 256;

pub type CachedSchema = Arc<[InferredTable]>;

/// Short-lived per-resource schema cache. Writes must call [`SchemaCache::invalidate`].
#[derive(Clone)]
pub struct SchemaCache {
    inner: Cache<String, CachedSchema>,
}

impl SchemaCache {
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs.max(1)))
            .max_capacity(max_capacity.max(1))
            .build();
        Self { inner }
    }

    pub fn get(&self, resource_id: &str) -> Option<CachedSchema> {
        self.inner.get(resource_id)
    }

    pub fn insert(&self, resource_id: &str, tables: Vec<InferredTable>) -> CachedSchema {
        let schema: CachedSchema = tables.into();
        self.inner.insert(resource_id.to_string(), schema.clone());
        schema
    }

    pub fn invalidate(&self, resource_id: &str) {
        self.inner.invalidate(resource_id);
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_TTL_SECS, DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::info_table;

    #[test]
    fn insert_then_invalidate() {
        let cache = SchemaCache::default();
        assert!(cache.get("sheet-1").is_none());

        cache.insert("sheet-1", vec![info_table("sheet-1", Default::default())]);
        assert_eq!(cache.get("sheet-1").map(|s| s.len()), Some(1));

        cache.invalidate("sheet-1");
        assert!(cache.get("sheet-1").is_none());
    }
}
