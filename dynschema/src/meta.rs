//! Schema metadata service.
//!
//! Single source of truth for column/PK/FK/index metadata, backed by the TTL
//! cache. Every lookup re-validates the table against the whitelist before it
//! touches the catalog. Introspection failures are logged and treated as "no
//! data", falling through to the next heuristic; they never propagate.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    binding::{KeyKind, TableBinding},
    cache::{CacheKey, CachedValue, Facet, MetaCache},
    conn::{Connection, Value},
    error::Result,
    ident::{sanitize_identifier, singularize},
    meta_store::{MetaStore, TableMetaOverride},
    types::{parse_native_type, ColumnMeta, ForeignKeyMeta},
    whitelist::TableWhitelist,
};

/// Common human-readable column names, in priority order.
pub const COMMON_LABEL_COLUMNS: &[&str] = &[
    "name",
    "title",
    "label",
    "email",
    "code",
    "username",
    "description",
];

/// Tables whose label composition is known upfront.
const SPECIAL_LABEL_COLUMNS: &[(&str, &[&str])] = &[("users", &["name", "email"])];

#[derive(Clone)]
pub struct SchemaMetadata {
    conn: Connection,
    cache: MetaCache,
    store: MetaStore,
    whitelist: TableWhitelist,
    database: Arc<Mutex<Option<String>>>,
}

impl SchemaMetadata {
    pub fn new(conn: Connection) -> Self {
        Self::with_ttl(conn, MetaCache::DEFAULT_TTL)
    }

    pub fn with_ttl(conn: Connection, ttl: Duration) -> Self {
        let cache = MetaCache::new(ttl);

        Self {
            conn: conn.clone(),
            store: MetaStore::new(conn.clone()),
            whitelist: TableWhitelist::with_cache(conn, cache.clone()),
            cache,
            database: Arc::new(Mutex::new(None)),
        }
    }

    pub fn whitelist(&self) -> &TableWhitelist {
        &self.whitelist
    }

    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn database(&self) -> String {
        if let Ok(guard) = self.database.lock() {
            if let Some(name) = guard.as_ref() {
                return name.clone();
            }
        }

        let name = match self.conn.database_name().await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Database name lookup failed: {}", e);
                "default".to_string()
            }
        };

        if let Ok(mut guard) = self.database.lock() {
            *guard = Some(name.clone());
        }

        name
    }

    /// Column metadata in catalog order. Empty for non-whitelisted tables and
    /// on introspection failure.
    pub async fn columns(&self, table: &str) -> Vec<ColumnMeta> {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return vec![];
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::Columns);
        if let Some(CachedValue::Columns(cols)) = self.cache.get(&key) {
            return cols;
        }

        let descs = match self.conn.table_columns(&table).await {
            Ok(descs) => descs,
            Err(e) => {
                log::warn!("Column introspection failed for `{}`: {}", table, e);
                return vec![];
            }
        };

        let cols = descs
            .into_iter()
            .map(|desc| {
                let (kind, length, options) = parse_native_type(&desc.native_type);
                ColumnMeta {
                    name: desc.name,
                    kind,
                    nullable: desc.nullable,
                    length,
                    default: desc.default,
                    options,
                }
            })
            .collect::<Vec<_>>();

        self.cache.put(key, CachedValue::Columns(cols.clone()));

        cols
    }

    pub async fn column(&self, table: &str, name: &str) -> Option<ColumnMeta> {
        self.columns(table).await.into_iter().find(|c| c.name == name)
    }

    /// Primary key column name. Falls back through: declared constraint, a
    /// column literally named `id`, `{singular}_id`, first column in listing.
    /// Always returns some column name.
    pub async fn primary_key(&self, table: &str) -> String {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return "id".to_string();
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::PrimaryKey);
        if let Some(CachedValue::Name(name)) = self.cache.get(&key) {
            return name;
        }

        let declared = match self.conn.primary_key_columns(&table).await {
            Ok(keys) => keys.into_iter().next(),
            Err(e) => {
                log::warn!("Primary key introspection failed for `{}`: {}", table, e);
                None
            }
        };

        let name = match declared {
            Some(name) => name,
            None => {
                let cols = self.columns(&table).await;
                let singular_id = format!("{}_id", singularize(&table));

                if cols.iter().any(|c| c.name == "id") {
                    "id".to_string()
                } else if cols.iter().any(|c| c.name == singular_id) {
                    singular_id
                } else if let Some(first) = cols.first() {
                    first.name.clone()
                } else {
                    "id".to_string()
                }
            }
        };

        self.cache.put(key, CachedValue::Name(name.clone()));

        name
    }

    /// Whether the primary key auto-increments. Live catalog flag when
    /// available; otherwise the name-`id`-and-integer heuristic (which will
    /// misclassify a manually assigned integer `id`, kept for parity).
    pub async fn is_primary_auto_increment(&self, table: &str) -> bool {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return false;
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::AutoIncrement);
        if let Some(CachedValue::Flag(flag)) = self.cache.get(&key) {
            return flag;
        }

        let live = match self.conn.table_columns(&table).await {
            Ok(descs) => descs
                .iter()
                .find(|d| d.is_primary)
                .map(|d| d.is_auto_increment),
            Err(e) => {
                log::warn!("Auto-increment introspection failed for `{}`: {}", table, e);
                None
            }
        };

        let flag = match live {
            Some(flag) => flag,
            None => {
                let pk = self.primary_key(&table).await;
                pk == "id"
                    && self
                        .column(&table, &pk)
                        .await
                        .map(|c| c.kind.is_integer_family())
                        .unwrap_or(false)
            }
        };

        self.cache.put(key, CachedValue::Flag(flag));

        flag
    }

    /// Declared foreign key constraints keyed by column. Only real catalog
    /// constraints; empty when the driver has nothing to report.
    pub async fn foreign_keys(&self, table: &str) -> HashMap<String, ForeignKeyMeta> {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return HashMap::new();
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::ForeignKeys);
        if let Some(CachedValue::ForeignKeys(fks)) = self.cache.get(&key) {
            return fks;
        }

        let descs = match self.conn.foreign_keys(&table).await {
            Ok(descs) => descs,
            Err(e) => {
                log::warn!("Foreign key introspection failed for `{}`: {}", table, e);
                return HashMap::new();
            }
        };

        let fks = descs
            .into_iter()
            .map(|d| {
                (
                    d.column.clone(),
                    ForeignKeyMeta {
                        column: d.column,
                        referenced_table: d.referenced_table,
                        referenced_column: d.referenced_column,
                    },
                )
            })
            .collect::<HashMap<_, _>>();

        self.cache.put(key, CachedValue::ForeignKeys(fks.clone()));

        fks
    }

    pub async fn has_deleted_at(&self, table: &str) -> bool {
        self.columns(table)
            .await
            .iter()
            .any(|c| c.name == "deleted_at")
    }

    async fn indexed_columns(&self, table: &str) -> Vec<String> {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return vec![];
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::IndexedColumns);
        if let Some(CachedValue::Names(names)) = self.cache.get(&key) {
            return names;
        }

        let names = match self.conn.indexed_columns(&table).await {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Index introspection failed for `{}`: {}", table, e);
                return vec![];
            }
        };

        self.cache.put(key, CachedValue::Names(names.clone()));

        names
    }

    pub async fn is_indexed(&self, table: &str, column: &str) -> bool {
        self.indexed_columns(table).await.iter().any(|c| c == column)
    }

    /// Best single column for a human-readable row label. Priority: persisted
    /// override, override template columns, common names, first text-like
    /// column, primary key. Never returns a nonexistent column.
    pub async fn guess_label_column(&self, table: &str) -> String {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return "id".to_string();
        };

        let key = CacheKey::table_facet(&self.database().await, &table, Facet::LabelColumn);
        if let Some(CachedValue::Name(name)) = self.cache.get(&key) {
            return name;
        }

        let cols = self.columns(&table).await;
        let exists = |name: &str| cols.iter().any(|c| c.name == name);
        let overrides = self.overrides(&table).await;

        let mut candidates = Vec::<String>::new();
        if let Some(ov) = &overrides {
            if let Some(label) = &ov.label_column {
                candidates.push(label.clone());
            }
            if let Some(template) = &ov.display_template {
                candidates.extend(template.columns.first().cloned());
            }
        }
        candidates.extend(COMMON_LABEL_COLUMNS.iter().map(|s| s.to_string()));

        let name = match candidates.into_iter().find(|c| exists(c)) {
            Some(name) => name,
            None => match cols.iter().find(|c| c.kind.is_text_like()) {
                Some(col) => col.name.clone(),
                None => self.primary_key(&table).await,
            },
        };

        self.cache.put(key, CachedValue::Name(name.clone()));

        name
    }

    /// Best column to filter foreign-key candidate lookups by, preferring
    /// indexed columns.
    pub async fn best_search_column(&self, table: &str) -> String {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return "id".to_string();
        };

        let cols = self.columns(&table).await;
        let exists = |name: &str| cols.iter().any(|c| c.name == name);

        if let Some(ov) = self.overrides(&table).await {
            if let Some(search) = ov.search_column {
                if exists(&search) {
                    return search;
                }
            }
        }

        let label = self.guess_label_column(&table).await;
        if self.is_indexed(&table, &label).await {
            return label;
        }

        for name in COMMON_LABEL_COLUMNS {
            if exists(name) && self.is_indexed(&table, name).await {
                return name.to_string();
            }
        }

        if exists(&label) {
            return label;
        }

        self.primary_key(&table).await
    }

    /// Ordered columns for composite labels: override template columns,
    /// table-specific special cases, `*_name`-suffixed columns, common names,
    /// else singleton label-column fallback.
    pub async fn label_columns(&self, table: &str) -> Vec<String> {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return vec![];
        };

        let cols = self.columns(&table).await;
        let exists = |name: &str| cols.iter().any(|c| c.name == name);

        if let Some(ov) = self.overrides(&table).await {
            if let Some(template) = ov.display_template {
                let known = template
                    .columns
                    .iter()
                    .filter(|c| exists(c))
                    .cloned()
                    .collect::<Vec<_>>();
                if !known.is_empty() {
                    return known;
                }
            }
        }

        if let Some((_, special)) = SPECIAL_LABEL_COLUMNS.iter().find(|(t, _)| *t == table) {
            let known = special
                .iter()
                .filter(|c| exists(c))
                .map(|c| c.to_string())
                .collect::<Vec<_>>();
            if !known.is_empty() {
                return known;
            }
        }

        let suffixed = cols
            .iter()
            .filter(|c| c.name.ends_with("_name"))
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        if !suffixed.is_empty() {
            return suffixed;
        }

        if let Some(common) = COMMON_LABEL_COLUMNS.iter().find(|c| exists(c)) {
            return vec![common.to_string()];
        }

        vec![self.guess_label_column(&table).await]
    }

    /// Render a human-readable label for one row: override template when
    /// present, else label columns joined with `" - "`, else label/primary-key
    /// value stringified.
    pub async fn compose_label(&self, table: &str, row: &HashMap<String, Value>) -> String {
        if let Some(ov) = self.overrides(table).await {
            if let Some(template) = ov.display_template {
                if !template.template.trim().is_empty() {
                    let rendered = render_template(&template.template, row);
                    if !rendered.is_empty() {
                        return rendered;
                    }
                }
            }
        }

        let parts = self
            .label_columns(table)
            .await
            .iter()
            .filter_map(|c| row.get(c))
            .map(|v| v.to_string())
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>();
        if !parts.is_empty() {
            return parts.join(" - ");
        }

        let label = self.guess_label_column(table).await;
        if let Some(v) = row.get(&label) {
            if !v.is_null() {
                return v.to_string();
            }
        }

        let pk = self.primary_key(table).await;
        row.get(&pk).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Declared enum/set values of a column; empty when not applicable or the
    /// driver cannot report them.
    pub async fn enum_options(&self, table: &str, column: &str) -> Vec<String> {
        self.column(table, column)
            .await
            .map(|c| c.options)
            .unwrap_or_default()
    }

    /// Drop every cached facet for the table. Must run after any DDL change.
    pub async fn invalidate_table_cache(&self, table: &str) {
        let Some(table) = sanitize_identifier(table) else {
            return;
        };

        self.cache.invalidate_table(&self.database().await, &table);
    }

    /// Idempotent upsert filling `primary_key_column`/`label_column` on the
    /// override record, only where not already set by a human.
    pub async fn populate_meta_for_table(&self, table: &str) -> Result<()> {
        let Some(table) = self.whitelist.sanitize_table(Some(table)).await else {
            return Ok(());
        };

        let mut meta = self
            .store
            .get(&table)
            .await?
            .unwrap_or_else(|| TableMetaOverride {
                table_name: table.clone(),
                ..Default::default()
            });

        let mut changed = false;
        if meta.primary_key_column.is_none() {
            meta.primary_key_column = Some(self.primary_key(&table).await);
            changed = true;
        }
        if meta.label_column.is_none() {
            meta.label_column = Some(self.guess_label_column(&table).await);
            changed = true;
        }

        if changed {
            self.store.upsert(&meta).await?;
        }

        Ok(())
    }

    /// Runtime binding for generic record access; `None` when the table is not
    /// manageable.
    pub async fn binding(&self, table: &str) -> Option<TableBinding> {
        let table = self.whitelist.sanitize_table(Some(table)).await?;

        let cols = self.columns(&table).await;
        if cols.is_empty() {
            return None;
        }
        let has = |name: &str| cols.iter().any(|c| c.name == name);

        let primary_key = self.primary_key(&table).await;
        let key_kind = match cols.iter().find(|c| c.name == primary_key) {
            Some(col) if col.kind.is_integer_family() => KeyKind::Int,
            _ => KeyKind::Str,
        };

        Some(TableBinding {
            primary_key,
            key_kind,
            auto_increment: self.is_primary_auto_increment(&table).await,
            has_timestamps: has("created_at") && has("updated_at"),
            soft_delete: has("deleted_at"),
            table,
        })
    }

    async fn overrides(&self, table: &str) -> Option<TableMetaOverride> {
        match self.store.get(table).await {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Meta override lookup failed for `{}`: {}", table, e);
                None
            }
        }
    }
}

fn render_template(template: &str, row: &HashMap<String, Value>) -> String {
    let mut out = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(v) = row.get(name) {
                    if !v.is_null() {
                        out.push_str(&v.to_string());
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let mut row = HashMap::new();
        row.insert("vendor_code".to_string(), Value::Str("AC".into()));
        row.insert("vendor_name".to_string(), Value::Str("Acme".into()));

        assert_eq!(
            render_template("{{vendor_code}} - {{vendor_name}}", &row),
            "AC - Acme"
        );
        assert_eq!(render_template("{{missing}} - {{vendor_code}}", &row), "- AC");
        assert_eq!(render_template("no placeholders", &row), "no placeholders");
    }
}
