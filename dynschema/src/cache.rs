//! TTL cache for table metadata.
//!
//! Keys are structured rather than concatenated strings; values are typed.
//! Reads are lock-free in the stale-but-safe sense: a TTL bounds staleness and
//! writes are idempotent upserts derived from the live catalog, so
//! last-writer-wins is fine.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::types::{ColumnMeta, ForeignKeyMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Columns,
    ForeignKeys,
    PrimaryKey,
    AutoIncrement,
    LabelColumn,
    IndexedColumns,
    /// Whole user-table set; keyed with empty database/table.
    UserTables,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub database: String,
    pub table: String,
    pub column: Option<String>,
    pub facet: Facet,
}

impl CacheKey {
    pub fn table_facet(database: &str, table: &str, facet: Facet) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            column: None,
            facet,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Columns(Vec<ColumnMeta>),
    ForeignKeys(HashMap<String, ForeignKeyMeta>),
    Name(String),
    Names(Vec<String>),
    Flag(bool),
}

#[derive(Clone)]
pub struct MetaCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<CacheKey, (Instant, CachedValue)>>>,
}

impl MetaCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let mut entries = self.entries.lock().ok()?;

        if let Some((stored_at, value)) = entries.get(key) {
            if stored_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }

        entries.remove(key);

        None
    }

    pub fn put(&self, key: CacheKey, value: CachedValue) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (Instant::now(), value));
        }
    }

    /// Drop every facet cached for one table.
    pub fn invalidate_table(&self, database: &str, table: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| key.database != database || key.table != table);
        }
    }
}

impl Default for MetaCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_expiry() {
        let cache = MetaCache::new(Duration::from_millis(0));
        let key = CacheKey::table_facet("main", "posts", Facet::PrimaryKey);
        cache.put(key.clone(), CachedValue::Name("id".into()));

        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_invalidate_table() {
        let cache = MetaCache::default();
        let posts = CacheKey::table_facet("main", "posts", Facet::PrimaryKey);
        let vendors = CacheKey::table_facet("main", "vendors", Facet::PrimaryKey);
        cache.put(posts.clone(), CachedValue::Name("id".into()));
        cache.put(vendors.clone(), CachedValue::Name("id".into()));

        cache.invalidate_table("main", "posts");

        assert!(cache.get(&posts).is_none());
        assert!(cache.get(&vendors).is_some());
    }
}
