/// Catalog description of an existing column, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    pub name: String,
    /// Native type string, e.g. `varchar(255)`, `bigint unsigned`, `enum('a','b')`
    pub native_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_primary: bool,
    pub is_auto_increment: bool,
}

/// Declared foreign key constraint on a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDesc {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Column to add via DDL.
///
/// `sql_type` is rendered type text (`BIGINT UNSIGNED`, `VARCHAR(100)`, ...),
/// `default` is a rendered literal: number is `n`, string is `'n'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub unique: bool,
}

/// Foreign key constraint to add via DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub constraint_name: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}
