use dynschema_error::Result;

#[derive(Debug, Default)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values_list: Vec<Vec<String>>,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Append column
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::QueryBuilder;
    ///
    /// let sql = QueryBuilder::insert("ta")
    ///     .column("a")
    ///     .column("b")
    ///     .values(["?", "?"])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "INSERT INTO ta (a, b) VALUES (?, ?)");
    /// ```
    pub fn column(&mut self, col: &str) -> &mut Self {
        self.columns.push(col.into());
        self
    }

    /// Set columns
    pub fn columns<'a, T>(&mut self, cols: T) -> &mut Self
    where
        T: IntoIterator<Item = &'a str>,
    {
        self.columns = cols.into_iter().map(|s| s.to_string()).collect();
        self
    }

    /// Append a values row; each element is raw SQL text, usually `?`
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::QueryBuilder;
    ///
    /// let sql = QueryBuilder::insert("ta")
    ///     .columns(["a", "b"])
    ///     .values(["1", "'abc'"])
    ///     .values(["2", "'def'"])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "INSERT INTO ta (a, b) VALUES (1, 'abc'), (2, 'def')");
    /// ```
    pub fn values<'a, T>(&mut self, values: T) -> &mut Self
    where
        T: IntoIterator<Item = &'a str>,
    {
        self.values_list
            .push(values.into_iter().map(|v| v.to_string()).collect());
        self
    }

    /// Build sql
    pub fn build(&self) -> Result<String> {
        // Validate builder
        self.validate()?;

        let mut parts = Vec::<String>::new();

        // Build prefix
        parts.push(format!("INSERT INTO {}", self.table));

        // Build columns
        parts.push(format!("({})", self.columns.join(", ")));

        // Build values
        parts.push("VALUES".into());
        parts.push(
            self.values_list
                .iter()
                .map(|values| format!("({})", values.join(", ")))
                .collect::<Vec<String>>()
                .join(", "),
        );

        Ok(parts.join(" "))
    }

    /// Validate builder
    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(dynschema_error::query_builder!("Insert empty columns"));
        }

        if self.values_list.is_empty() {
            return Err(dynschema_error::query_builder!("Empty values list"));
        }

        for values in &self.values_list {
            if values.len() != self.columns.len() {
                return Err(dynschema_error::query_builder!(
                    "Columns and values length mismatch"
                ));
            }
        }

        Ok(())
    }
}
