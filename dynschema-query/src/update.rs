use dynschema_error::Result;

use crate::Where;

#[derive(Debug, Default)]
pub struct UpdateBuilder {
    table: String,
    kvs: Vec<(String, String)>,
    where_cond: Option<Where>,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Append a set pair; the value is raw SQL text, usually `?`
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::{QueryBuilder, eq};
    ///
    /// let sql = QueryBuilder::update("ta")
    ///     .set("a", "?")
    ///     .set("b", "CURRENT_TIMESTAMP")
    ///     .where_cond(eq!("id", "?"))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "UPDATE ta SET a = ?, b = CURRENT_TIMESTAMP WHERE (id = ?)");
    /// ```
    pub fn set(&mut self, col: &str, val: &str) -> &mut Self {
        self.kvs.push((col.into(), val.into()));
        self
    }

    /// Set where condition
    pub fn where_cond(&mut self, cond: Where) -> &mut Self {
        self.where_cond = Some(cond);
        self
    }

    /// Build sql
    pub fn build(&self) -> Result<String> {
        // Validate builder
        self.validate()?;

        let mut parts = Vec::<String>::new();

        // Build prefix
        parts.push(format!("UPDATE {}", self.table));

        // Build set pairs
        parts.push("SET".into());
        parts.push(
            self.kvs
                .iter()
                .map(|(col, val)| format!("{} = {}", col, val))
                .collect::<Vec<String>>()
                .join(", "),
        );

        // Build where
        if let Some(whe) = &self.where_cond {
            parts.push("WHERE".into());
            parts.push(whe.to_string());
        }

        Ok(parts.join(" "))
    }

    /// Validate builder
    fn validate(&self) -> Result<()> {
        if self.kvs.is_empty() {
            return Err(dynschema_error::query_builder!("Update empty set pairs"));
        }

        Ok(())
    }
}
