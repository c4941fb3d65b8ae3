//! Dynamic runtime records.
//!
//! Generic row persistence where the table, primary key and timestamp behavior
//! come from a [`TableBinding`] resolved at runtime instead of a compile-time
//! mapping. Every record materialized by a repository shares its originating
//! binding through an `Arc`, so the configuration propagates to everything
//! built from a result set.

use std::{collections::HashMap, sync::Arc};

use crate::{
    binding::{KeyKind, TableBinding},
    conn::{FromValue, Row, Value},
    error::Result,
    meta::SchemaMetadata,
    query::{eq, is_null, QueryBuilder, Where},
};

/// One persisted row plus the runtime binding it was materialized under.
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    binding: Arc<TableBinding>,
    values: HashMap<String, Value>,
}

impl DynamicRecord {
    pub fn new(binding: Arc<TableBinding>, values: HashMap<String, Value>) -> Self {
        Self { binding, values }
    }

    pub fn binding(&self) -> &TableBinding {
        &self.binding
    }

    pub fn key(&self) -> Option<&Value> {
        self.values.get(&self.binding.primary_key)
    }

    pub fn get<T: FromValue<Output = T>>(&self, column: &str) -> Result<T> {
        match self.values.get(column) {
            Some(value) => T::from_value(value),
            None => Err(dynschema_error::runtime!("Column `{}` not selected", column)),
        }
    }

    pub fn get_raw(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// List-query options: optional filter, ordering and paging.
#[derive(Default)]
pub struct ListOptions {
    pub filter: Option<Where>,
    pub order_bys: Vec<(String, bool)>,
    pub limit: Option<(u64, u64)>,
    /// Include soft-deleted rows. Off by default.
    pub with_deleted: bool,
}

/// Generic CRUD over whitelisted tables. All operations take an explicit
/// [`TableBinding`]; get one from [`SchemaMetadata::binding`].
pub struct DynamicRepository {
    meta: SchemaMetadata,
}

impl DynamicRepository {
    pub fn new(meta: SchemaMetadata) -> Self {
        Self { meta }
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        &self.meta
    }

    /// Convert a raw key string to a parameter value per the binding's key
    /// kind. Non-numeric input under an integer key falls back to string,
    /// letting the database reject it.
    pub fn key_value(binding: &TableBinding, raw: &str) -> Value {
        match binding.key_kind {
            KeyKind::Int => match raw.parse::<i64>() {
                Ok(n) => Value::I64(n),
                Err(_) => Value::Str(raw.to_string()),
            },
            KeyKind::Str => Value::Str(raw.to_string()),
        }
    }

    pub async fn find(
        &self,
        binding: &Arc<TableBinding>,
        id: Value,
    ) -> Result<Option<DynamicRecord>> {
        let mut cond = eq!(binding.primary_key.as_str(), "?");
        if binding.soft_delete {
            cond = Where::And(Box::new(cond), Box::new(is_null!("deleted_at")));
        }

        let sql = QueryBuilder::select(&binding.table)
            .column("*")
            .where_cond(cond)
            .build()?;

        let row = self.meta.connection().query_one(&sql, vec![id]).await?;

        Ok(row.map(|row| DynamicRecord::new(binding.clone(), row.into_map())))
    }

    pub async fn list(
        &self,
        binding: &Arc<TableBinding>,
        opts: ListOptions,
    ) -> Result<Vec<DynamicRecord>> {
        let mut builder = QueryBuilder::select(&binding.table);
        builder.column("*");

        let mut cond = opts.filter;
        if binding.soft_delete && !opts.with_deleted {
            let filter = is_null!("deleted_at");
            cond = Some(match cond {
                Some(prev) => Where::And(Box::new(prev), Box::new(filter)),
                None => filter,
            });
        }
        if let Some(cond) = cond {
            builder.where_cond(cond);
        }

        builder.order_bys(opts.order_bys);
        if let Some((limit, offset)) = opts.limit {
            builder.limit(limit, offset);
        }

        let rows = self
            .meta
            .connection()
            .query_many(&builder.build()?, vec![])
            .await?;

        Ok(rows
            .into_iter()
            .map(|row: Row| DynamicRecord::new(binding.clone(), row.into_map()))
            .collect())
    }

    /// Insert one row, returning the driver-reported insert id. The
    /// auto-increment primary key is stripped from the supplied values;
    /// `created_at`/`updated_at` are set by the database when the table
    /// carries timestamps and the caller did not supply them.
    pub async fn insert(
        &self,
        binding: &TableBinding,
        mut values: HashMap<String, Value>,
    ) -> Result<u64> {
        if binding.auto_increment {
            values.remove(&binding.primary_key);
        }
        let values = self.retain_known(binding, values).await;
        if values.is_empty() {
            return Err(dynschema_error::runtime!(
                "Insert into `{}` with no known columns",
                binding.table
            ));
        }

        let mut columns = Vec::<String>::new();
        let mut placeholders = Vec::<&str>::new();
        let mut params = Vec::<Value>::new();
        for (column, value) in values {
            columns.push(column);
            placeholders.push("?");
            params.push(value);
        }
        if binding.has_timestamps {
            for ts in ["created_at", "updated_at"] {
                if !columns.iter().any(|c| c == ts) {
                    columns.push(ts.to_string());
                    placeholders.push("CURRENT_TIMESTAMP");
                }
            }
        }

        let sql = QueryBuilder::insert(&binding.table)
            .columns(columns.iter().map(|c| c.as_str()))
            .values(placeholders)
            .build()?;

        self.meta.connection().execute_one(&sql, params).await
    }

    /// Update one row by key. Unknown and primary-key values are dropped; an
    /// update left with nothing to set is a no-op.
    pub async fn update(
        &self,
        binding: &TableBinding,
        id: Value,
        values: HashMap<String, Value>,
    ) -> Result<()> {
        let mut values = self.retain_known(binding, values).await;
        values.retain(|(column, _)| column != &binding.primary_key);
        if values.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::update(&binding.table);
        let mut params = Vec::<Value>::new();
        for (column, value) in values {
            builder.set(&column, "?");
            params.push(value);
        }
        if binding.has_timestamps {
            builder.set("updated_at", "CURRENT_TIMESTAMP");
        }
        builder.where_cond(eq!(binding.primary_key.as_str(), "?"));
        params.push(id);

        self.meta
            .connection()
            .execute_one(&builder.build()?, params)
            .await?;

        Ok(())
    }

    /// Delete one row by key. Soft-delete tables get `deleted_at` stamped
    /// instead of a physical delete.
    pub async fn delete(&self, binding: &TableBinding, id: Value) -> Result<()> {
        let sql = if binding.soft_delete {
            QueryBuilder::update(&binding.table)
                .set("deleted_at", "CURRENT_TIMESTAMP")
                .where_cond(eq!(binding.primary_key.as_str(), "?"))
                .build()?
        } else {
            QueryBuilder::delete(&binding.table)
                .where_cond(eq!(binding.primary_key.as_str(), "?"))
                .build()?
        };

        self.meta.connection().execute_one(&sql, vec![id]).await?;

        Ok(())
    }

    /// Drop values for columns the table does not have, so stray form keys
    /// never reach SQL. Ordering is made deterministic for stable statements.
    async fn retain_known(
        &self,
        binding: &TableBinding,
        values: HashMap<String, Value>,
    ) -> Vec<(String, Value)> {
        let columns = self.meta.columns(&binding.table).await;

        let mut known = values
            .into_iter()
            .filter(|(name, _)| columns.iter().any(|c| c.name == *name))
            .collect::<Vec<_>>();
        known.sort_by(|(a, _), (b, _)| a.cmp(b));

        known
    }
}
