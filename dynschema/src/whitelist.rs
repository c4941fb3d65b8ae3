use std::collections::BTreeSet;

use crate::{
    cache::{CacheKey, CachedValue, Facet, MetaCache},
    conn::Connection,
    ident::sanitize_identifier,
    meta_store::META_TABLE,
};

/// Internal tables never exposed to dynamic management.
pub const EXCLUDED_TABLES: &[&str] = &[
    "migrations",
    "cache",
    "cache_locks",
    "sessions",
    "jobs",
    "job_batches",
    "failed_jobs",
    "password_reset_tokens",
    "personal_access_tokens",
    "permissions",
    "roles",
    "model_has_permissions",
    "model_has_roles",
    "role_has_permissions",
    "audit_logs",
    "sqlite_sequence",
    META_TABLE,
];

/// The set of physical tables eligible for dynamic, generic management.
#[derive(Clone)]
pub struct TableWhitelist {
    conn: Connection,
    cache: MetaCache,
}

impl TableWhitelist {
    pub fn new(conn: Connection) -> Self {
        Self::with_cache(conn, MetaCache::default())
    }

    /// Share a cache with the metadata layer so the table set follows the
    /// same TTL.
    pub fn with_cache(conn: Connection, cache: MetaCache) -> Self {
        Self { conn, cache }
    }

    pub fn is_excluded(name: &str) -> bool {
        EXCLUDED_TABLES.contains(&name)
    }

    fn cache_key() -> CacheKey {
        CacheKey {
            database: String::new(),
            table: String::new(),
            column: None,
            facet: Facet::UserTables,
        }
    }

    /// Physical tables minus internal/system tables, cached under the
    /// metadata TTL. An introspection failure yields an empty set, never an
    /// error, and is not cached.
    pub async fn list_user_tables(&self) -> BTreeSet<String> {
        let key = Self::cache_key();
        if let Some(CachedValue::Names(names)) = self.cache.get(&key) {
            return names.into_iter().collect();
        }

        let tables = match self.conn.list_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                log::warn!("List tables failed: {}", e);
                return BTreeSet::new();
            }
        };

        let tables = tables
            .into_iter()
            .filter(|t| !Self::is_excluded(t.as_str()))
            .collect::<BTreeSet<_>>();

        self.cache
            .put(key, CachedValue::Names(tables.iter().cloned().collect()));

        tables
    }

    /// Normalize a raw table name and check it against the whitelist.
    ///
    /// Returns `None` for anything not manageable; callers decide how to
    /// react. Idempotent: re-sanitizing a returned name yields it unchanged.
    pub async fn sanitize_table(&self, raw: Option<&str>) -> Option<String> {
        let name = sanitize_identifier(raw?)?;

        if Self::is_excluded(&name) {
            return None;
        }

        if self.list_user_tables().await.contains(&name) {
            Some(name)
        } else {
            None
        }
    }
}
