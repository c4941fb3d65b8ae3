//! Schema change planner.
//!
//! Analysis renders a side-effect-free risk report with preview DDL;
//! application executes the changes sequentially with per-item idempotency.
//! DDL commits implicitly, so apply is deliberately non-transactional: each
//! relation item moves through column-ensured then constraint-ensured states,
//! and a constraint failure rolls back only the column this call created.

use crate::{
    conn::{ColumnSpec, Connection, ForeignKeySpec},
    error::Result,
    meta::SchemaMetadata,
    meta_store::{DisplayTemplate, TableMetaOverride},
    query::ddl::{self, ColumnDdl, IndexKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Text,
    Integer,
    BigInteger,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Json,
    ForeignId,
}

impl FieldType {
    pub fn sql_type(&self, length: Option<u32>) -> String {
        match self {
            Self::String => format!("VARCHAR({})", length.unwrap_or(255)),
            Self::Text => "TEXT".to_string(),
            Self::Integer => "INT".to_string(),
            Self::BigInteger => "BIGINT".to_string(),
            Self::Decimal => "DECIMAL(10, 2)".to_string(),
            Self::Boolean => "TINYINT(1)".to_string(),
            Self::Date => "DATE".to_string(),
            Self::DateTime => "DATETIME".to_string(),
            Self::Json => "JSON".to_string(),
            Self::ForeignId => "BIGINT UNSIGNED".to_string(),
        }
    }
}

/// Column type for a relation's FK column, always unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    BigInteger,
    Integer,
    MediumInteger,
    SmallInteger,
    TinyInteger,
}

impl RelationType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::BigInteger => "BIGINT UNSIGNED",
            Self::Integer => "INT UNSIGNED",
            Self::MediumInteger => "MEDIUMINT UNSIGNED",
            Self::SmallInteger => "SMALLINT UNSIGNED",
            Self::TinyInteger => "TINYINT UNSIGNED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldAddition {
    pub name: String,
    pub field_type: FieldType,
    pub length: Option<u32>,
    pub nullable: bool,
    /// Rendered SQL literal (`0`, `'pending'`).
    pub default: Option<String>,
    pub unique: bool,
    pub index: bool,
    pub fulltext: bool,
}

#[derive(Debug, Clone)]
pub struct RelationAddition {
    pub name: String,
    pub references_table: String,
    pub references_column: String,
    pub relation_type: RelationType,
    pub nullable: bool,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
    /// Optional label/search overrides persisted for the referenced table.
    pub label_columns: Vec<String>,
    pub search_column: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SchemaChangeItem {
    Field(FieldAddition),
    Relation(RelationAddition),
}

impl SchemaChangeItem {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Relation(r) => &r.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Safe,
    Risky,
}

#[derive(Debug, Clone)]
pub struct ChangeAnalysis {
    pub migration_preview: Vec<String>,
    pub estimated_sql: Vec<String>,
    pub warnings: Vec<String>,
    pub impact: Impact,
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// True iff no per-item error occurred.
    pub success: bool,
    pub applied: Vec<String>,
    pub errors: Vec<String>,
}

pub struct SchemaPlanner {
    meta: SchemaMetadata,
}

impl SchemaPlanner {
    pub fn new(meta: SchemaMetadata) -> Self {
        Self { meta }
    }

    fn conn(&self) -> &Connection {
        self.meta.connection()
    }

    /// Side-effect-free risk analysis. Never fails outright: an unmanageable
    /// table yields a report whose warnings say so.
    pub async fn analyze(&self, table: &str, items: &[SchemaChangeItem]) -> ChangeAnalysis {
        let Some(table) = self.meta.whitelist().sanitize_table(Some(table)).await else {
            return ChangeAnalysis {
                migration_preview: vec![],
                estimated_sql: vec![],
                warnings: vec![format!("Table `{}` is not manageable", table)],
                impact: Impact::Risky,
            };
        };

        let row_count = self.row_count(&table).await;
        let mut analysis = ChangeAnalysis {
            migration_preview: vec![],
            estimated_sql: vec![],
            warnings: vec![],
            impact: Impact::Safe,
        };

        for item in items {
            match item {
                SchemaChangeItem::Field(field) => {
                    self.analyze_field(&table, field, row_count, &mut analysis)
                }
                SchemaChangeItem::Relation(relation) => {
                    self.analyze_relation(&table, relation, row_count, &mut analysis)
                }
            }
        }

        if !analysis.warnings.is_empty() {
            analysis.impact = Impact::Risky;
        }

        analysis
    }

    fn analyze_field(
        &self,
        table: &str,
        field: &FieldAddition,
        row_count: u64,
        out: &mut ChangeAnalysis,
    ) {
        let sql_type = field.field_type.sql_type(field.length);

        if !field.nullable && field.default.is_none() && row_count > 0 {
            out.warnings.push(format!(
                "Column `{}` is NOT NULL without a default; `{}` already has {} rows",
                field.name, table, row_count
            ));
        }
        if field.unique && field.default.is_some() && row_count > 1 {
            out.warnings.push(format!(
                "Unique column `{}` with a default collides across the {} existing rows of `{}`",
                field.name, row_count, table
            ));
        }
        if field.field_type == FieldType::ForeignId {
            out.warnings.push(format!(
                "Adding foreign id column `{}` can hold a long lock on large tables",
                field.name
            ));
        }

        out.migration_preview.push(format!(
            "Add column `{}` {}{}{} to `{}`",
            field.name,
            sql_type,
            if field.nullable { " NULL" } else { " NOT NULL" },
            match &field.default {
                Some(def) => format!(" DEFAULT {}", def),
                None => String::new(),
            },
            table
        ));

        out.estimated_sql.push(ddl::alter_add_column(
            table,
            &ColumnDdl {
                name: &field.name,
                sql_type: &sql_type,
                nullable: field.nullable,
                default: field.default.as_deref(),
                unique: field.unique,
            },
        ));
        if field.fulltext {
            out.estimated_sql
                .push(ddl::create_index(table, &field.name, IndexKind::Fulltext));
        } else if field.index && !field.unique {
            out.estimated_sql
                .push(ddl::create_index(table, &field.name, IndexKind::Plain));
        }
    }

    fn analyze_relation(
        &self,
        table: &str,
        relation: &RelationAddition,
        row_count: u64,
        out: &mut ChangeAnalysis,
    ) {
        // Column risk matches an equivalent foreignId field
        self.analyze_field(
            table,
            &FieldAddition {
                name: relation.name.clone(),
                field_type: FieldType::ForeignId,
                length: None,
                nullable: relation.nullable,
                default: None,
                unique: false,
                index: false,
                fulltext: false,
            },
            row_count,
            out,
        );

        // Replace the generic column preview/DDL with the relation's own type
        let sql_type = relation.relation_type.sql_type();
        if let Some(last) = out.migration_preview.last_mut() {
            *last = format!(
                "Add relation column `{}` {}{} to `{}`",
                relation.name,
                sql_type,
                if relation.nullable { " NULL" } else { " NOT NULL" },
                table
            );
        }
        if let Some(last) = out.estimated_sql.last_mut() {
            *last = ddl::alter_add_column(
                table,
                &ColumnDdl {
                    name: &relation.name,
                    sql_type,
                    nullable: relation.nullable,
                    default: None,
                    unique: false,
                },
            );
        }

        let constraint = constraint_name(table, &relation.name);
        out.migration_preview.push(format!(
            "Add foreign key `{}` on `{}`.`{}` referencing `{}`.`{}`",
            constraint, table, relation.name, relation.references_table, relation.references_column
        ));
        out.estimated_sql.push(ddl::alter_add_foreign_key(
            table,
            &constraint,
            &relation.name,
            &relation.references_table,
            &relation.references_column,
            relation.on_update.as_deref(),
            relation.on_delete.as_deref(),
        ));
    }

    /// Apply the change items sequentially. Partial success: a failing item is
    /// recorded and the rest still run. After the list completes the table's
    /// metadata cache is invalidated and its override record refreshed, both
    /// best-effort.
    pub async fn apply_direct_changes(
        &self,
        table: &str,
        items: &[SchemaChangeItem],
    ) -> ApplyReport {
        let Some(table) = self.meta.whitelist().sanitize_table(Some(table)).await else {
            return ApplyReport {
                success: false,
                applied: vec![],
                errors: vec![format!("Table `{}` is not manageable", table)],
            };
        };

        let mut report = ApplyReport {
            success: true,
            applied: vec![],
            errors: vec![],
        };

        for item in items {
            let res = match item {
                SchemaChangeItem::Field(field) => self.apply_field(&table, field).await,
                SchemaChangeItem::Relation(relation) => {
                    self.apply_relation(&table, relation).await
                }
            };

            match res {
                Ok(applied) => {
                    if let Some(applied) = applied {
                        report.applied.push(applied);
                    }
                }
                Err(e) => report.errors.push(format!("{}: {}", item.name(), e)),
            }
        }

        report.success = report.errors.is_empty();

        self.meta.invalidate_table_cache(&table).await;
        if let Err(e) = self.meta.populate_meta_for_table(&table).await {
            log::warn!("Populate meta for `{}` failed: {}", table, e);
        }

        report
    }

    /// Idempotent: a column that already exists is skipped silently.
    async fn apply_field(&self, table: &str, field: &FieldAddition) -> Result<Option<String>> {
        if self.column_exists(table, &field.name).await? {
            return Ok(None);
        }

        self.conn()
            .add_column(
                table,
                &ColumnSpec {
                    name: field.name.clone(),
                    sql_type: field.field_type.sql_type(field.length),
                    nullable: field.nullable,
                    default: field.default.clone(),
                    unique: field.unique,
                },
            )
            .await?;

        if field.fulltext {
            self.conn()
                .execute_ddl(&ddl::create_index(table, &field.name, IndexKind::Fulltext))
                .await?;
        } else if field.index && !field.unique {
            self.conn()
                .execute_ddl(&ddl::create_index(table, &field.name, IndexKind::Plain))
                .await?;
        }

        Ok(Some(format!("column {}", field.name)))
    }

    /// Two-phase: ensure the FK column, then ensure the constraint. A
    /// constraint failure drops the column again only when this call created
    /// it; pre-existing columns are left untouched. When both the column and
    /// the constraint already exist the item is skipped, like an existing
    /// field.
    async fn apply_relation(
        &self,
        table: &str,
        relation: &RelationAddition,
    ) -> Result<Option<String>> {
        let column_existed = self.column_exists(table, &relation.name).await?;

        if !column_existed {
            self.conn()
                .add_column(
                    table,
                    &ColumnSpec {
                        name: relation.name.clone(),
                        sql_type: relation.relation_type.sql_type().to_string(),
                        nullable: relation.nullable,
                        default: None,
                        unique: false,
                    },
                )
                .await?;
        }

        let constraint = constraint_name(table, &relation.name);
        let constraint_exists = self
            .conn()
            .foreign_keys(table)
            .await?
            .iter()
            .any(|fk| fk.column == relation.name);

        if column_existed && constraint_exists {
            return Ok(None);
        }

        if !constraint_exists {
            let res = self
                .conn()
                .add_foreign_key(
                    table,
                    &ForeignKeySpec {
                        constraint_name: constraint.clone(),
                        column: relation.name.clone(),
                        references_table: relation.references_table.clone(),
                        references_column: relation.references_column.clone(),
                        on_update: relation.on_update.clone(),
                        on_delete: relation.on_delete.clone(),
                    },
                )
                .await;

            if let Err(e) = res {
                if !column_existed {
                    // Compensating cleanup, each step best-effort
                    if let Err(drop_err) = self.conn().drop_foreign_key(table, &constraint).await {
                        log::trace!("Constraint cleanup skipped: {}", drop_err);
                    }
                    if let Err(drop_err) = self.conn().drop_column(table, &relation.name).await {
                        log::warn!(
                            "Compensating drop of `{}`.`{}` failed: {}",
                            table,
                            relation.name,
                            drop_err
                        );
                    }
                }
                return Err(e);
            }
        }

        if let Err(e) = self.persist_relation_overrides(relation).await {
            log::warn!(
                "Meta override persist for `{}` failed: {}",
                relation.references_table,
                e
            );
        }

        Ok(Some(format!("relation {}", relation.name)))
    }

    /// Upsert label/search overrides for the referenced table, preserving
    /// whatever an admin already set elsewhere on the record.
    async fn persist_relation_overrides(&self, relation: &RelationAddition) -> Result<()> {
        if relation.label_columns.is_empty() && relation.search_column.is_none() {
            return Ok(());
        }

        let store = self.meta.store();
        let mut meta = store
            .get(&relation.references_table)
            .await?
            .unwrap_or_else(|| TableMetaOverride {
                table_name: relation.references_table.clone(),
                ..Default::default()
            });

        if !relation.label_columns.is_empty() {
            meta.display_template = Some(DisplayTemplate::from_columns(&relation.label_columns));
            meta.label_column = Some(relation.label_columns[0].clone());
        }
        meta.search_column = relation
            .search_column
            .clone()
            .or_else(|| relation.label_columns.first().cloned())
            .or(meta.search_column);

        store.upsert(&meta).await?;
        self.meta
            .invalidate_table_cache(&relation.references_table)
            .await;

        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let columns = self.conn().table_columns(table).await?;

        Ok(columns.iter().any(|c| c.name == column))
    }

    async fn row_count(&self, table: &str) -> u64 {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", table);

        match self.conn().query_one(&sql, vec![]).await {
            Ok(Some(row)) => row.get::<u64>("n").unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                log::warn!("Row count failed for `{}`: {}", table, e);
                0
            }
        }
    }
}

fn constraint_name(table: &str, column: &str) -> String {
    format!("{}_{}_foreign", table, column)
}
