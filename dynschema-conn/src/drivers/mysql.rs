//! # Mysql driver
//!
//! Catalog introspection reads `information_schema` scoped to `DATABASE()`.
//! DDL uses the MySQL/MariaDB ALTER dialect, including `ADD CONSTRAINT ...
//! FOREIGN KEY` and `DROP FOREIGN KEY`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dynschema_error::Result;
use mysql_lib::prelude::Queryable;
use tokio::task::spawn_blocking;

use crate::{ColumnDesc, ColumnSpec, Driver, ForeignKeyDesc, ForeignKeySpec, Row, Value};

pub struct MysqlConnProxy {
    conn: Arc<Mutex<mysql_lib::Conn>>,
}

impl MysqlConnProxy {
    pub fn new(conn: mysql_lib::Conn) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait::async_trait]
impl Driver for MysqlConnProxy {
    async fn execute_many(&self, pairs: Vec<(String, Vec<Vec<Value>>)>) -> Result<Vec<u64>> {
        let conn = self.conn.clone();
        let ids = spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| dynschema_error::connection!("MysqlConnProxy lock error: {}", e))?;

            log::trace!("Start transaction");
            let mut tx = conn
                .start_transaction(mysql_lib::TxOpts::default())
                .map_err(|e| dynschema_error::database!("Start transaction error: {}", e))?;

            let mut ids = Vec::<u64>::new();
            for (sql, params_list) in pairs {
                log::trace!("Prepare execute many `{}`", sql);
                let stmt = tx.prep(&sql).map_err(|e| {
                    dynschema_error::database!("Prepare error: {}, sql: `{}`", e, sql)
                })?;

                for param in params_list {
                    log::trace!("Execute {:?}", param);

                    tx.exec_drop(&stmt, param)
                        .map_err(|e| dynschema_error::database!("Execute error: {}", e))?;

                    // Insert id
                    ids.push(tx.last_insert_id().unwrap_or_default() as u64);
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
        let conn = self.conn.clone();
        let rows = spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| dynschema_error::connection!("MysqlConnProxy lock error: {}", e))?;

            log::trace!("Prepare query many `{}`", sql_string);
            let stmt = conn.prep(&sql_string).map_err(|e| {
                dynschema_error::database!("Prepare query many error: {}, sql: `{}`", e, sql_string)
            })?;

            log::trace!("Query many {:?}", params);
            let sql_rows = conn
                .exec_iter(&stmt, params)
                .map_err(|e| dynschema_error::database!("Query error: {}", e))?;
            let mut rows = Vec::<Row>::new();
            for res in sql_rows {
                let mysql_row =
                    res.map_err(|e| dynschema_error::database!("Get row error: {}", e))?;
                let row = mysql_row_to_row(mysql_row)?;
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
        let conn = self.conn.clone();
        spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| dynschema_error::connection!("MysqlConnProxy lock error: {}", e))?;

            log::trace!("Execute `{}`", sql_string);
            conn.query_drop(&sql_string).map_err(|e| {
                dynschema_error::database!("Ddl error: {}, sql: `{}`", e, sql_string)
            })?;

            Result::Ok(())
        })
        .await
        .map_err(|e| dynschema_error::runtime!("Tokio join error: {}", e))??;

        Ok(())
    }

    async fn database_name(&self) -> Result<String> {
        let row = self
            .query_many("SELECT DATABASE() AS db", vec![])
            .await?
            .into_iter()
            .next()
            .ok_or(dynschema_error::introspection!("No current database"))?;

        Ok(row.get::<String>("db")?)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .query_many(
                "SELECT TABLE_NAME AS name FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
                 ORDER BY TABLE_NAME",
                vec![],
            )
            .await?;

        rows.iter().map(|row| row.get::<String>("name")).collect()
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDesc>> {
        let rows = self
            .query_many(
                "SELECT COLUMN_NAME AS name, COLUMN_TYPE AS native_type, \
                        IS_NULLABLE AS nullable, COLUMN_DEFAULT AS dflt, \
                        COLUMN_KEY AS col_key, EXTRA AS extra \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION",
                vec![Value::Str(table.into())],
            )
            .await?;

        let mut cols = Vec::<ColumnDesc>::new();
        for row in rows {
            let nullable: String = row.get("nullable")?;
            let col_key: String = row.get("col_key")?;
            let extra: String = row.get("extra")?;

            cols.push(ColumnDesc {
                name: row.get("name")?,
                native_type: row.get("native_type")?,
                nullable: nullable.eq_ignore_ascii_case("yes"),
                default: row.get::<Option<String>>("dflt")?,
                is_primary: col_key.eq_ignore_ascii_case("pri"),
                is_auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
            });
        }

        Ok(cols)
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = self
            .query_many(
                "SELECT COLUMN_NAME AS name FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND CONSTRAINT_NAME = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION",
                vec![Value::Str(table.into())],
            )
            .await?;

        rows.iter().map(|row| row.get::<String>("name")).collect()
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDesc>> {
        let rows = self
            .query_many(
                "SELECT COLUMN_NAME AS col, REFERENCED_TABLE_NAME AS ref_table, \
                        REFERENCED_COLUMN_NAME AS ref_col \
                 FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND REFERENCED_TABLE_NAME IS NOT NULL",
                vec![Value::Str(table.into())],
            )
            .await?;

        let mut fks = Vec::<ForeignKeyDesc>::new();
        for row in rows {
            fks.push(ForeignKeyDesc {
                column: row.get("col")?,
                referenced_table: row.get("ref_table")?,
                referenced_column: row.get("ref_col")?,
            });
        }

        Ok(fks)
    }

    async fn indexed_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = self
            .query_many(
                "SELECT DISTINCT COLUMN_NAME AS name FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                vec![Value::Str(table.into())],
            )
            .await?;

        rows.iter().map(|row| row.get::<String>("name")).collect()
    }

    async fn add_column(&self, table: &str, spec: &ColumnSpec) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE `{}` ADD COLUMN `{}` {}",
            table, spec.name, spec.sql_type
        );
        sql.push_str(if spec.nullable { " NULL" } else { " NOT NULL" });
        if let Some(def) = &spec.default {
            sql.push_str(&format!(" DEFAULT {}", def));
        }
        if spec.unique {
            sql.push_str(" UNIQUE");
        }

        self.execute_ddl(&sql).await?;

        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let sql = format!("ALTER TABLE `{}` DROP COLUMN `{}`", table, column);

        self.execute_ddl(&sql).await?;

        Ok(())
    }

    async fn add_foreign_key(&self, table: &str, spec: &ForeignKeySpec) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE `{}` ADD CONSTRAINT `{}` FOREIGN KEY (`{}`) REFERENCES `{}` (`{}`)",
            table, spec.constraint_name, spec.column, spec.references_table, spec.references_column
        );
        if let Some(action) = &spec.on_update {
            sql.push_str(&format!(" ON UPDATE {}", action));
        }
        if let Some(action) = &spec.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action));
        }

        self.execute_ddl(&sql).await?;

        Ok(())
    }

    async fn drop_foreign_key(&self, table: &str, constraint: &str) -> Result<()> {
        let sql = format!("ALTER TABLE `{}` DROP FOREIGN KEY `{}`", table, constraint);

        self.execute_ddl(&sql).await?;

        Ok(())
    }
}

fn mysql_row_to_row(src: mysql_lib::Row) -> Result<Row> {
    let mut values = HashMap::new();
    let cols = src.columns_ref();
    for i in 0..src.len() {
        let column_name = cols
            .get(i)
            .ok_or(dynschema_error::database!(
                "Cannot get column name of index {}",
                i
            ))?
            .name_str()
            .to_string();

        if let Some(mysql_value) = src.as_ref(i) {
            let value = match mysql_value {
                mysql_lib::Value::NULL => Value::Null,
                // Text-protocol results arrive as bytes, decode text columns
                mysql_lib::Value::Bytes(v) => match String::from_utf8(v.clone()) {
                    Ok(s) => Value::Str(s),
                    Err(_) => Value::Bytes(v.clone()),
                },
                mysql_lib::Value::Int(v) => Value::I64(*v),
                mysql_lib::Value::UInt(v) => Value::U64(*v),
                mysql_lib::Value::Float(v) => Value::F32(*v),
                mysql_lib::Value::Double(v) => Value::F64(*v),
                _ => {
                    return Err(dynschema_error::database!(
                        "Unsupported mysql value type: {:?}",
                        mysql_value
                    ))
                }
            };

            values.insert(column_name, value);
        }
    }

    Ok(Row { values })
}

impl From<Value> for mysql_lib::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::NULL,
            Value::Bool(v) => Self::Int(v as _),
            Value::U8(v) => Self::UInt(v as _),
            Value::I8(v) => Self::Int(v as _),
            Value::U16(v) => Self::UInt(v as _),
            Value::I16(v) => Self::Int(v as _),
            Value::U32(v) => Self::UInt(v as _),
            Value::I32(v) => Self::Int(v as _),
            Value::U64(v) => Self::UInt(v as _),
            Value::I64(v) => Self::Int(v as _),
            Value::F32(v) => Self::Float(v),
            Value::F64(v) => Self::Double(v),
            Value::Str(v) => Self::Bytes(v.into_bytes()),
            Value::Bytes(v) => Self::Bytes(v),
        }
    }
}
