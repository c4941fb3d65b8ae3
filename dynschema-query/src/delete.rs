use dynschema_error::Result;

use crate::Where;

#[derive(Debug, Default)]
pub struct DeleteBuilder {
    table: String,
    where_cond: Option<Where>,
}

impl DeleteBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set where condition
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::{QueryBuilder, eq};
    ///
    /// let sql = QueryBuilder::delete("ta")
    ///     .where_cond(eq!("id", "?"))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "DELETE FROM ta WHERE (id = ?)");
    /// ```
    pub fn where_cond(&mut self, cond: Where) -> &mut Self {
        self.where_cond = Some(cond);
        self
    }

    /// Build sql
    pub fn build(&self) -> Result<String> {
        let mut parts = Vec::<String>::new();

        parts.push(format!("DELETE FROM {}", self.table));

        if let Some(whe) = &self.where_cond {
            parts.push("WHERE".into());
            parts.push(whe.to_string());
        }

        Ok(parts.join(" "))
    }
}
