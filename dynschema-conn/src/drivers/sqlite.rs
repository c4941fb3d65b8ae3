//! # Sqlite driver
//!
//! Catalog introspection goes through the `pragma_*` table-valued functions so
//! table names stay bound parameters. Sqlite cannot `ALTER TABLE ... ADD
//! CONSTRAINT`, so `add_foreign_key`/`drop_foreign_key` report a database
//! error; the change planner handles that like any other constraint failure.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dynschema_error::Result;
use rusqlite::OptionalExtension;
use tokio::task::spawn_blocking;

use crate::{ColumnDesc, ColumnSpec, Driver, ForeignKeyDesc, ForeignKeySpec, Row, Value};

#[derive(Clone)]
pub struct SqliteConnProxy {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteConnProxy {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|e| dynschema_error::connection!("SqliteConnProxy lock error: {}", e))
    }
}

#[async_trait::async_trait]
impl Driver for SqliteConnProxy {
    async fn execute_many(&self, pairs: Vec<(String, Vec<Vec<Value>>)>) -> Result<Vec<u64>> {
        let proxy = self.clone();
        let ids = spawn_blocking(move || {
            let mut conn = proxy.lock()?;

            log::trace!("Start transaction");
            let tx = conn
                .transaction()
                .map_err(|e| dynschema_error::database!("Start transaction error: {}", e))?;

            let mut ids = Vec::<u64>::new();
            for (sql, params_list) in pairs {
                log::trace!("Prepare execute many `{}`", sql);
                let mut stmt = tx.prepare(&sql).map_err(|e| {
                    dynschema_error::database!("Prepare error: {}, sql: `{}`", e, sql)
                })?;

                for param in params_list {
                    log::trace!("Execute {:?}", param);

                    stmt.execute(&param_to_rusqlite_param(&param)[..])
                        .map_err(|e| dynschema_error::database!("Execute error: {}", e))?;

                    // Insert id
                    ids.push(tx.last_insert_rowid() as u64);
                }
            }

            log::trace!("Commit transaction");
            tx.commit()
                .map_err(|e| dynschema_error::database!("Commit error: {}", e))?;

            Result::Ok(ids)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(ids)
    }

    async fn query_many(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>> {
        let sql_string = sql.to_string();
        let proxy = self.clone();
        let rows = spawn_blocking(move || {
            let conn = proxy.lock()?;

            log::trace!("Prepare query many `{}`", sql_string);
            let mut stmt = conn.prepare(&sql_string).map_err(|e| {
                dynschema_error::database!("Prepare query many error: {}, sql: `{}`", e, sql_string)
            })?;

            log::trace!("Query many {:?}", params);
            let mut sql_rows = stmt
                .query(&param_to_rusqlite_param(&params)[..])
                .map_err(|e| dynschema_error::database!("Query error: {}", e))?;
            let mut rows = Vec::<Row>::new();
            while let Ok(Some(row)) = sql_rows.next() {
                let row = rusqlite_row_to_row(row)?;
                log::trace!("Append row: {:?}", row);
                rows.push(row);
            }

            Result::Ok(rows)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(rows)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        let sql_string = sql.to_string();
        let proxy = self.clone();
        spawn_blocking(move || {
            let conn = proxy.lock()?;

            log::trace!("Execute `{}`", sql_string);
            conn.execute_batch(&sql_string).map_err(|e| {
                dynschema_error::database!("Ddl error: {}, sql: `{}`", e, sql_string)
            })?;

            Result::Ok(())
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(())
    }

    async fn database_name(&self) -> Result<String> {
        Ok("main".into())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let proxy = self.clone();
        let tables = spawn_blocking(move || {
            let conn = proxy.lock()?;

            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .map_err(|e| dynschema_error::introspection!("List tables error: {}", e))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| dynschema_error::introspection!("List tables error: {}", e))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(|e| dynschema_error::introspection!("List tables error: {}", e))?;

            Result::Ok(names)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDesc>> {
        let table = table.to_string();
        let proxy = self.clone();
        let cols = spawn_blocking(move || {
            let conn = proxy.lock()?;

            // Create statement text is the only place sqlite records AUTOINCREMENT
            let create_sql: Option<String> = conn
                .query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [&table],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| dynschema_error::introspection!("Read create sql error: {}", e))?;
            let has_autoincrement = create_sql
                .map(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"))
                .unwrap_or(false);

            let mut stmt = conn
                .prepare(
                    "SELECT name, type, \"notnull\", dflt_value, pk \
                     FROM pragma_table_info(?1)",
                )
                .map_err(|e| dynschema_error::introspection!("Table info error: {}", e))?;
            let cols = stmt
                .query_map([&table], |row| {
                    let name: String = row.get(0)?;
                    let native_type: String = row.get(1)?;
                    let not_null: bool = row.get(2)?;
                    let default: Option<String> = row.get(3)?;
                    let pk: i64 = row.get(4)?;

                    // An INTEGER primary key aliases the rowid, which sqlite
                    // assigns automatically whether or not AUTOINCREMENT is set
                    let is_primary = pk > 0;
                    let is_auto_increment = is_primary
                        && (has_autoincrement || native_type.eq_ignore_ascii_case("integer"));

                    Ok(ColumnDesc {
                        name,
                        native_type,
                        nullable: !not_null && !is_primary,
                        default,
                        is_primary,
                        is_auto_increment,
                    })
                })
                .map_err(|e| dynschema_error::introspection!("Table info error: {}", e))?
                .collect::<rusqlite::Result<Vec<ColumnDesc>>>()
                .map_err(|e| dynschema_error::introspection!("Table info error: {}", e))?;

            Result::Ok(cols)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(cols)
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        let proxy = self.clone();
        let keys = spawn_blocking(move || {
            let conn = proxy.lock()?;

            let mut stmt = conn
                .prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")
                .map_err(|e| dynschema_error::introspection!("Primary key error: {}", e))?;
            let keys = stmt
                .query_map([&table], |row| row.get::<_, String>(0))
                .map_err(|e| dynschema_error::introspection!("Primary key error: {}", e))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(|e| dynschema_error::introspection!("Primary key error: {}", e))?;

            Result::Ok(keys)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDesc>> {
        let table = table.to_string();
        let proxy = self.clone();
        let fks = spawn_blocking(move || {
            let conn = proxy.lock()?;

            let mut stmt = conn
                .prepare(
                    "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1)",
                )
                .map_err(|e| dynschema_error::introspection!("Foreign key list error: {}", e))?;
            let fks = stmt
                .query_map([&table], |row| {
                    let column: String = row.get(0)?;
                    let referenced_table: String = row.get(1)?;
                    // `to` is null when the constraint references the implicit primary key
                    let referenced_column: Option<String> = row.get(2)?;

                    Ok(ForeignKeyDesc {
                        column,
                        referenced_table,
                        referenced_column: referenced_column.unwrap_or_else(|| "id".into()),
                    })
                })
                .map_err(|e| dynschema_error::introspection!("Foreign key list error: {}", e))?
                .collect::<rusqlite::Result<Vec<ForeignKeyDesc>>>()
                .map_err(|e| dynschema_error::introspection!("Foreign key list error: {}", e))?;

            Result::Ok(fks)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(fks)
    }

    async fn indexed_columns(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        let proxy = self.clone();
        let cols = spawn_blocking(move || {
            let conn = proxy.lock()?;

            let mut stmt = conn
                .prepare("SELECT name FROM pragma_index_list(?1)")
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?;
            let index_names = stmt
                .query_map([&table], |row| row.get::<_, String>(0))
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?;

            let mut cols = Vec::<String>::new();
            for index in index_names {
                let mut stmt = conn
                    .prepare("SELECT name FROM pragma_index_info(?1)")
                    .map_err(|e| dynschema_error::introspection!("Index info error: {}", e))?;
                let keys = stmt
                    .query_map([&index], |row| row.get::<_, String>(0))
                    .map_err(|e| dynschema_error::introspection!("Index info error: {}", e))?
                    .collect::<rusqlite::Result<Vec<String>>>()
                    .map_err(|e| dynschema_error::introspection!("Index info error: {}", e))?;
                cols.extend(keys);
            }

            // The primary key is backed by an index even when index_list omits it
            let mut stmt = conn
                .prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0")
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?;
            let pks = stmt
                .query_map([&table], |row| row.get::<_, String>(0))
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(|e| dynschema_error::introspection!("Index list error: {}", e))?;
            cols.extend(pks);

            cols.sort();
            cols.dedup();

            Result::Ok(cols)
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(cols)
    }

    async fn add_column(&self, table: &str, spec: &ColumnSpec) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            table, spec.name, spec.sql_type
        );
        if !spec.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(def) = &spec.default {
            sql.push_str(&format!(" DEFAULT {}", def));
        }

        self.execute_ddl(&sql).await?;

        // Sqlite rejects UNIQUE inside ADD COLUMN, a unique index is the
        // equivalent spelling
        if spec.unique {
            let index_sql = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_{col}_unique\" ON \"{table}\" (\"{col}\")",
                table = table,
                col = spec.name,
            );
            self.execute_ddl(&index_sql).await?;
        }

        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let sql = format!("ALTER TABLE \"{}\" DROP COLUMN \"{}\"", table, column);

        self.execute_ddl(&sql).await?;

        Ok(())
    }

    async fn add_foreign_key(&self, table: &str, spec: &ForeignKeySpec) -> Result<()> {
        Err(dynschema_error::database!(
            "Sqlite cannot add foreign key `{}` to existing table `{}`",
            spec.constraint_name,
            table
        ))
    }

    async fn drop_foreign_key(&self, table: &str, constraint: &str) -> Result<()> {
        Err(dynschema_error::database!(
            "Sqlite cannot drop foreign key `{}` from table `{}`",
            constraint,
            table
        ))
    }
}

fn param_to_rusqlite_param(params: &Vec<Value>) -> Vec<&'_ dyn rusqlite::ToSql> {
    params.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
}

fn rusqlite_row_to_row<'s>(src: &rusqlite::Row<'s>) -> Result<Row> {
    use rusqlite::types::ValueRef;

    let stmt = src.as_ref();

    let mut values = HashMap::new();
    for i in 0..stmt.column_count() {
        let column_name = stmt
            .column_name(i)
            .map_err(|e| dynschema_error::database!("Get column name error: {}", e))?
            .to_string();

        if let Ok(v) = src.get_ref(i) {
            let value = match v {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::I64(v),
                ValueRef::Real(v) => Value::F64(v),
                ValueRef::Text(v) => {
                    Value::Str(String::from_utf8(v.to_vec()).unwrap_or(String::new()))
                }
                ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
            };
            values.insert(column_name, value);
        } else {
            break;
        }
    }

    Ok(Row { values })
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match &self {
            Value::Null => <Option<u8> as rusqlite::ToSql>::to_sql(&None),
            Value::Bool(v) => <bool as rusqlite::ToSql>::to_sql(v),
            Value::U8(v) => <u8 as rusqlite::ToSql>::to_sql(v),
            Value::I8(v) => <i8 as rusqlite::ToSql>::to_sql(v),
            Value::U16(v) => <u16 as rusqlite::ToSql>::to_sql(v),
            Value::I16(v) => <i16 as rusqlite::ToSql>::to_sql(v),
            Value::U32(v) => <u32 as rusqlite::ToSql>::to_sql(v),
            Value::I32(v) => <i32 as rusqlite::ToSql>::to_sql(v),
            Value::U64(v) => Ok(rusqlite::types::ToSqlOutput::Owned(
                rusqlite::types::Value::Integer(*v as i64),
            )),
            Value::I64(v) => <i64 as rusqlite::ToSql>::to_sql(v),
            Value::F32(v) => <f32 as rusqlite::ToSql>::to_sql(v),
            Value::F64(v) => <f64 as rusqlite::ToSql>::to_sql(v),
            Value::Str(v) => <String as rusqlite::ToSql>::to_sql(v),
            Value::Bytes(v) => <Vec<u8> as rusqlite::ToSql>::to_sql(v),
        }
    }
}
