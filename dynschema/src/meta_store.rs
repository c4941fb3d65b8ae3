//! Persisted per-table admin overrides.
//!
//! One row per managed table; overrides win over heuristics when present.
//! The backing table itself is excluded from the whitelist.

use serde::{Deserialize, Serialize};

use crate::{
    conn::{Connection, Value},
    error::Result,
    query::{eq, QueryBuilder},
};

pub const META_TABLE: &str = "table_meta";

/// Template used to compose a human-readable label for rows of a table:
/// `{{col}}` placeholders over an ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTemplate {
    pub template: String,
    pub columns: Vec<String>,
}

impl DisplayTemplate {
    /// Placeholder-join template over the given columns, `" - "` separated.
    pub fn from_columns(columns: &[String]) -> Self {
        let template = columns
            .iter()
            .map(|c| format!("{{{{{}}}}}", c))
            .collect::<Vec<_>>()
            .join(" - ");

        Self {
            template,
            columns: columns.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableMetaOverride {
    pub table_name: String,
    pub primary_key_column: Option<String>,
    pub label_column: Option<String>,
    pub search_column: Option<String>,
    pub display_template: Option<DisplayTemplate>,
}

#[derive(Clone)]
pub struct MetaStore {
    conn: Connection,
}

impl MetaStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute_ddl(&format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 table_name VARCHAR(191) NOT NULL, \
                 primary_key_column VARCHAR(255), \
                 label_column VARCHAR(255), \
                 search_column VARCHAR(255), \
                 display_template TEXT, \
                 PRIMARY KEY (table_name))",
                META_TABLE
            ))
            .await?;

        Ok(())
    }

    pub async fn get(&self, table: &str) -> Result<Option<TableMetaOverride>> {
        self.ensure_table().await?;

        let sql = QueryBuilder::select(META_TABLE)
            .columns([
                "table_name",
                "primary_key_column",
                "label_column",
                "search_column",
                "display_template",
            ])
            .where_cond(eq!("table_name", "?"))
            .build()?;

        let row = match self
            .conn
            .query_one(&sql, vec![Value::Str(table.into())])
            .await?
        {
            Some(row) => row,
            None => return Ok(None),
        };

        let template_json: Option<String> = row.get("display_template")?;
        let display_template = template_json.and_then(|json| {
            serde_json::from_str::<DisplayTemplate>(&json)
                .map_err(|e| log::warn!("Bad display_template for `{}`: {}", table, e))
                .ok()
        });

        Ok(Some(TableMetaOverride {
            table_name: row.get("table_name")?,
            primary_key_column: row.get("primary_key_column")?,
            label_column: row.get("label_column")?,
            search_column: row.get("search_column")?,
            display_template,
        }))
    }

    pub async fn upsert(&self, meta: &TableMetaOverride) -> Result<()> {
        self.ensure_table().await?;

        let template_json = match &meta.display_template {
            Some(template) => Some(Value::Str(serde_json::to_string(template).map_err(
                |e| dynschema_error::runtime!("Serialize display_template error: {}", e),
            )?)),
            None => None,
        };

        let delete_sql = QueryBuilder::delete(META_TABLE)
            .where_cond(eq!("table_name", "?"))
            .build()?;
        let insert_sql = QueryBuilder::insert(META_TABLE)
            .columns([
                "table_name",
                "primary_key_column",
                "label_column",
                "search_column",
                "display_template",
            ])
            .values(["?", "?", "?", "?", "?"])
            .build()?;

        // Delete-then-insert runs inside one driver transaction
        self.conn
            .execute_many(vec![
                (delete_sql, vec![vec![Value::Str(meta.table_name.clone())]]),
                (
                    insert_sql,
                    vec![vec![
                        Value::Str(meta.table_name.clone()),
                        opt_str(&meta.primary_key_column),
                        opt_str(&meta.label_column),
                        opt_str(&meta.search_column),
                        template_json.unwrap_or(Value::Null),
                    ]],
                ),
            ])
            .await?;

        Ok(())
    }
}

fn opt_str(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Str(s.clone()),
        None => Value::Null,
    }
}
