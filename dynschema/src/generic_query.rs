//! Generic list-query builder.
//!
//! Builds `SELECT table.* ...` statements with FK-validated LEFT JOINs from
//! caller-supplied selected keys. A caller can only join through a declared
//! foreign key constraint; requested table/column pairs that do not match a
//! real constraint are skipped, never joined. Non-whitelisted tables yield a
//! query guaranteed to return zero rows.

use crate::{
    ident::sanitize_identifier,
    meta::SchemaMetadata,
    query::{QueryBuilder, Where},
};

/// Always-empty result set, used in place of any query we refuse to build.
/// The derived table keeps it valid on engines that require a FROM clause.
pub const EMPTY_QUERY: &str = "SELECT NULL AS missing FROM (SELECT 1) AS empty WHERE 1 = 0";

/// A parsed selected key: `self:<column>` or `fk:<fkColumn>:<refTable>:<refColumn>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedKey {
    SelfColumn(String),
    Fk {
        fk_column: String,
        ref_table: String,
        ref_column: String,
    },
}

impl SelectedKey {
    /// Parse a raw key, sanitizing every identifier segment. `None` for
    /// malformed keys and for segments that do not survive sanitization.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');

        match parts.next()? {
            "self" => {
                let column = sanitize_identifier(parts.next()?)?;
                match parts.next() {
                    None => Some(Self::SelfColumn(column)),
                    Some(_) => None,
                }
            }
            "fk" => {
                let fk_column = sanitize_identifier(parts.next()?)?;
                let ref_table = sanitize_identifier(parts.next()?)?;
                let ref_column = sanitize_identifier(parts.next()?)?;
                match parts.next() {
                    None => Some(Self::Fk {
                        fk_column,
                        ref_table,
                        ref_column,
                    }),
                    Some(_) => None,
                }
            }
            _ => None,
        }
    }
}

pub struct DynamicQueryBuilder {
    meta: SchemaMetadata,
}

impl DynamicQueryBuilder {
    pub fn new(meta: SchemaMetadata) -> Self {
        Self { meta }
    }

    /// Build the list query for `table` with the requested extra FK display
    /// columns. Infallible by contract: anything untrusted degrades to
    /// [`EMPTY_QUERY`] or a skipped key.
    pub async fn build(&self, table: &str, selected_keys: &[String]) -> String {
        let Some(table) = self.meta.whitelist().sanitize_table(Some(table)).await else {
            return EMPTY_QUERY.to_string();
        };

        let fks = self.meta.foreign_keys(&table).await;

        let mut builder = QueryBuilder::select(&table);
        builder.column(&format!("{}.*", table));

        let mut joined = Vec::<String>::new();
        for raw in selected_keys {
            let Some(SelectedKey::Fk {
                fk_column,
                ref_table,
                ref_column,
            }) = SelectedKey::parse(raw)
            else {
                // `self:` keys are informational; base select is already `table.*`
                continue;
            };

            // Anti-spoofing: the requested pair must match a declared constraint
            let Some(fk) = fks.get(&fk_column) else {
                continue;
            };
            if fk.referenced_table != ref_table {
                continue;
            }
            let ref_columns = self.meta.columns(&ref_table).await;
            if !ref_columns.iter().any(|c| c.name == ref_column) {
                continue;
            }

            let alias = format!("{}__{}", ref_table, fk_column);
            if !joined.contains(&alias) {
                builder.left_join(
                    &ref_table,
                    &alias,
                    &format!("{}.{}", table, fk_column),
                    &format!("{}.{}", alias, fk.referenced_column),
                );
                joined.push(alias.clone());
            }

            builder.column(&format!(
                "{}.{} AS fk_{}__{}__{}",
                alias, ref_column, fk_column, ref_table, ref_column
            ));
        }

        if self.meta.has_deleted_at(&table).await {
            builder.where_cond(Where::IsNull(Box::new(Where::Value(format!(
                "{}.deleted_at",
                table
            )))));
        }

        match builder.build() {
            Ok(sql) => sql,
            Err(e) => {
                log::warn!("Query build failed for `{}`: {}", table, e);
                EMPTY_QUERY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selected_key() {
        assert_eq!(
            SelectedKey::parse("self:title"),
            Some(SelectedKey::SelfColumn("title".into()))
        );
        assert_eq!(
            SelectedKey::parse("fk:vendor_id:vendors:vendor_name"),
            Some(SelectedKey::Fk {
                fk_column: "vendor_id".into(),
                ref_table: "vendors".into(),
                ref_column: "vendor_name".into(),
            })
        );
        assert_eq!(SelectedKey::parse("fk:vendor_id:vendors"), None);
        assert_eq!(SelectedKey::parse("self:title:extra"), None);
        assert_eq!(SelectedKey::parse("other:title"), None);
        assert_eq!(SelectedKey::parse("fk:vendor_id:vendors:1; DROP"), None);
    }
}
