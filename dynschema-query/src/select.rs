use dynschema_error::Result;

use crate::Where;

#[derive(Debug, Default)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    where_cond: Option<Where>,
    group_bys: Vec<String>,
    order_bys: Vec<(String, bool)>, // (column, is_asc)
    limit: Option<(u64, u64)>,      // (limit, offset)
}

#[derive(Debug)]
struct Join {
    table: String,
    alias: String,
    left: String,
    right: String,
}

impl SelectBuilder {
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
    /// let a = QueryBuilder::select("ta")
    ///     .column("a")
    ///     .column("b")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&a, "SELECT a, b FROM ta");
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

    /// Append a left join with an explicit alias
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::QueryBuilder;
    ///
    /// let sql = QueryBuilder::select("posts")
    ///     .column("posts.*")
    ///     .left_join("vendors", "vendors__vendor_id", "posts.vendor_id", "vendors__vendor_id.id")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     &sql,
    ///     "SELECT posts.* FROM posts LEFT JOIN vendors AS vendors__vendor_id ON posts.vendor_id = vendors__vendor_id.id"
    /// );
    /// ```
    pub fn left_join(&mut self, table: &str, alias: &str, left: &str, right: &str) -> &mut Self {
        self.joins.push(Join {
            table: table.into(),
            alias: alias.into(),
            left: left.into(),
            right: right.into(),
        });
        self
    }

    /// Set where condition
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::{QueryBuilder, and, lt, gt};
    ///
    /// let sql = QueryBuilder::select("ta")
    ///     .column("a")
    ///     .where_cond(and!(gt!("a", 1), lt!("b", 5)))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "SELECT a FROM ta WHERE ((a > 1) AND (b < 5))");
    /// ```
    pub fn where_cond(&mut self, cond: Where) -> &mut Self {
        self.where_cond = Some(cond);
        self
    }

    /// Append group by
    pub fn group_by(&mut self, col: &str) -> &mut Self {
        self.group_bys.push(col.into());
        self
    }

    /// Set group by list
    pub fn group_bys<T, S>(&mut self, list: T) -> &mut Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_bys = list.into_iter().map(|v| v.into()).collect();
        self
    }

    /// Append order by
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::QueryBuilder;
    ///
    /// let sql = QueryBuilder::select("ta")
    ///     .column("a")
    ///     .order_by("a", true)
    ///     .order_by("b", false)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "SELECT a FROM ta ORDER BY a ASC, b DESC");
    /// ```
    pub fn order_by(&mut self, col: &str, is_asc: bool) -> &mut Self {
        self.order_bys.push((col.into(), is_asc));
        self
    }

    /// Set order by list
    pub fn order_bys<T, S>(&mut self, list: T) -> &mut Self
    where
        T: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.order_bys = list
            .into_iter()
            .map(|(name, is_asc)| (name.into(), is_asc))
            .collect();
        self
    }

    /// Set limit and offset
    ///
    /// # Examples
    ///
    /// ```
    /// use dynschema_query::QueryBuilder;
    ///
    /// let sql = QueryBuilder::select("ta")
    ///     .column("a")
    ///     .limit(10, 20)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(&sql, "SELECT a FROM ta LIMIT 10 OFFSET 20");
    /// ```
    pub fn limit(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.limit = Some((limit, offset));
        self
    }

    /// Build sql
    pub fn build(&self) -> Result<String> {
        // Validate builder
        self.validate()?;

        let mut parts = Vec::<String>::new();

        // Build prefix
        parts.push("SELECT".into());

        // Build columns
        parts.push(self.columns.join(", "));

        // Build table
        parts.push("FROM".into());
        parts.push(self.table.clone());

        // Build joins
        for join in &self.joins {
            parts.push(format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                join.table, join.alias, join.left, join.right
            ));
        }

        // Build where
        if let Some(whe) = &self.where_cond {
            parts.push("WHERE".into());
            parts.push(whe.to_string());
        }

        // Build group by
        if !self.group_bys.is_empty() {
            parts.push("GROUP BY".into());
            parts.push(self.group_bys.join(", "));
        }

        // Build order by
        if !self.order_bys.is_empty() {
            parts.push("ORDER BY".into());
            parts.push(
                self.order_bys
                    .iter()
                    .map(|(name, is_asc)| {
                        format!("{} {}", name, if *is_asc { "ASC" } else { "DESC" })
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        }

        // Build limit
        if let Some((limit, offset)) = self.limit {
            parts.push(format!("LIMIT {} OFFSET {}", limit, offset));
        }

        Ok(parts.join(" "))
    }

    /// Validate builder
    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(dynschema_error::query_builder!("Select empty columns"));
        }

        Ok(())
    }
}
