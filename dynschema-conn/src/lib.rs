mod connection;
mod drivers;
mod info;
mod value;

use std::collections::HashMap;

pub use connection::Connection;
pub use info::{ColumnDesc, ColumnSpec, ForeignKeyDesc, ForeignKeySpec};
pub use value::{FromValue, ToValue, Value};

pub mod driver {
    #[cfg(feature = "sqlite")]
    pub use rusqlite;
}

use dynschema_error::Result;

/// Database driver contract.
///
/// Besides query/statement execution this carries the catalog introspection
/// surface the metadata layer is built on, and dialect-specific DDL for the
/// schema change planner. Introspection methods report what the engine
/// actually declares; they never guess.
#[async_trait::async_trait]
pub trait Driver: Sync + Send {
    async fn execute_many(&self, pairs: Vec<(String, Vec<Vec<Value>>)>) -> Result<Vec<u64>>; // Vec<(sql, params_list)>
    async fn query_many(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>>;
    async fn execute_ddl(&self, sql: &str) -> Result<()>;

    async fn database_name(&self) -> Result<String>;
    async fn list_tables(&self) -> Result<Vec<String>>;
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDesc>>;
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>>;
    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDesc>>;
    async fn indexed_columns(&self, table: &str) -> Result<Vec<String>>;

    async fn add_column(&self, table: &str, spec: &ColumnSpec) -> Result<()>;
    async fn drop_column(&self, table: &str, column: &str) -> Result<()>;
    async fn add_foreign_key(&self, table: &str, spec: &ForeignKeySpec) -> Result<()>;
    async fn drop_foreign_key(&self, table: &str, constraint: &str) -> Result<()>;
}

#[derive(Debug)]
pub struct Row {
    pub(crate) values: HashMap<String, Value>,
}

impl Row {
    pub fn get<T: FromValue<Output = T>>(&self, index: &str) -> Result<T> {
        if let Some(v) = self.values.get(index) {
            Ok(T::from_value(v)?)
        } else {
            Err(dynschema_error::out_of_range!(
                "Index out of range: index: {}, values length: {}",
                index,
                self.values.len()
            ))
        }
    }

    pub fn get_raw(&self, index: &str) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.values
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
