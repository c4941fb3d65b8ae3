//! MySQL/MariaDB-flavoured DDL text.
//!
//! Used by the schema change planner to render estimated-SQL previews. The
//! drivers render their own dialect when a change is actually applied; these
//! strings are documentation artifacts shown to an operator, never parsed.

/// Column clause arguments for `alter_add_column`.
///
/// `sql_type` is rendered type text (`VARCHAR(100)`, `BIGINT UNSIGNED`, ...),
/// `default` a rendered literal (`0`, `'pending'`).
#[derive(Debug, Clone, Default)]
pub struct ColumnDdl<'a> {
    pub name: &'a str,
    pub sql_type: &'a str,
    pub nullable: bool,
    pub default: Option<&'a str>,
    pub unique: bool,
}

pub fn alter_add_column(table: &str, col: &ColumnDdl<'_>) -> String {
    let mut sql = format!(
        "ALTER TABLE `{}` ADD COLUMN `{}` {}",
        table, col.name, col.sql_type
    );
    sql.push_str(if col.nullable { " NULL" } else { " NOT NULL" });
    if let Some(def) = col.default {
        sql.push_str(&format!(" DEFAULT {}", def));
    }
    if col.unique {
        sql.push_str(" UNIQUE");
    }

    sql
}

pub fn alter_drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE `{}` DROP COLUMN `{}`", table, column)
}

pub fn alter_add_foreign_key(
    table: &str,
    constraint: &str,
    column: &str,
    references_table: &str,
    references_column: &str,
    on_update: Option<&str>,
    on_delete: Option<&str>,
) -> String {
    let mut sql = format!(
        "ALTER TABLE `{}` ADD CONSTRAINT `{}` FOREIGN KEY (`{}`) REFERENCES `{}` (`{}`)",
        table, constraint, column, references_table, references_column
    );
    if let Some(action) = on_update {
        sql.push_str(&format!(" ON UPDATE {}", action));
    }
    if let Some(action) = on_delete {
        sql.push_str(&format!(" ON DELETE {}", action));
    }

    sql
}

pub fn alter_drop_foreign_key(table: &str, constraint: &str) -> String {
    format!("ALTER TABLE `{}` DROP FOREIGN KEY `{}`", table, constraint)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Plain,
    Unique,
    Fulltext,
}

/// ```
/// use dynschema_query::ddl::{create_index, IndexKind};
///
/// assert_eq!(
///     create_index("posts", "title", IndexKind::Fulltext),
///     "CREATE FULLTEXT INDEX `posts_title_index` ON `posts` (`title`)"
/// );
/// ```
pub fn create_index(table: &str, column: &str, kind: IndexKind) -> String {
    let keyword = match kind {
        IndexKind::Plain => "",
        IndexKind::Unique => "UNIQUE ",
        IndexKind::Fulltext => "FULLTEXT ",
    };

    format!(
        "CREATE {}INDEX `{}_{}_index` ON `{}` (`{}`)",
        keyword, table, column, table, column
    )
}
