use std::sync::{Arc, Mutex};

use dynschema::{
    async_trait,
    conn::{ColumnDesc, ColumnSpec, Connection, Driver, ForeignKeyDesc, ForeignKeySpec, Row, Value},
    error::Result,
    DisplayTemplate, FieldAddition, FieldType, Impact, RelationAddition, RelationType,
    SchemaChangeItem, SchemaMetadata, SchemaPlanner, TableMetaOverride,
};
use dynschema_test::run_test;

fn field(name: &str) -> FieldAddition {
    FieldAddition {
        name: name.into(),
        field_type: FieldType::String,
        length: None,
        nullable: true,
        default: None,
        unique: false,
        index: false,
        fulltext: false,
    }
}

fn relation(name: &str) -> RelationAddition {
    RelationAddition {
        name: name.into(),
        references_table: "vendors".into(),
        references_column: "id".into(),
        relation_type: RelationType::BigInteger,
        nullable: true,
        on_update: None,
        on_delete: None,
        label_columns: vec![],
        search_column: None,
    }
}

#[tokio::test]
async fn test_risk_classification_is_deterministic() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta);
        let items = vec![SchemaChangeItem::Field(FieldAddition {
            nullable: false,
            ..field("status")
        })];

        // `posts` has rows, the same change is risky every time
        for _ in 0..3 {
            let report = planner.analyze("posts", &items).await;
            assert_eq!(report.impact, Impact::Risky);
            assert!(!report.warnings.is_empty());
            assert!(report.warnings[0].contains("2 rows"));
        }

        // `notes` is empty, the same item is safe
        let report = planner.analyze("notes", &items).await;
        assert_eq!(report.impact, Impact::Safe);
        assert!(report.warnings.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_analyze_renders_preview_and_sql() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta);

        let report = planner
            .analyze(
                "notes",
                &[SchemaChangeItem::Field(FieldAddition {
                    length: Some(100),
                    nullable: false,
                    default: Some("'draft'".into()),
                    ..field("status")
                })],
            )
            .await;

        assert_eq!(
            report.estimated_sql,
            vec!["ALTER TABLE `notes` ADD COLUMN `status` VARCHAR(100) NOT NULL DEFAULT 'draft'"]
        );
        assert_eq!(report.migration_preview.len(), 1);
        assert!(report.migration_preview[0].contains("`status`"));
        assert_eq!(report.impact, Impact::Safe);
    })
    .await;
}

#[tokio::test]
async fn test_foreign_id_always_warns() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta);

        // Even on an empty table the lock advisory fires
        let report = planner
            .analyze(
                "notes",
                &[SchemaChangeItem::Field(FieldAddition {
                    field_type: FieldType::ForeignId,
                    ..field("owner_id")
                })],
            )
            .await;
        assert_eq!(report.impact, Impact::Risky);
        assert!(report.warnings.iter().any(|w| w.contains("lock")));
    })
    .await;
}

#[tokio::test]
async fn test_relation_analysis_emits_both_statements() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta);

        let report = planner
            .analyze(
                "posts",
                &[SchemaChangeItem::Relation(RelationAddition {
                    on_delete: Some("CASCADE".into()),
                    ..relation("owner_id")
                })],
            )
            .await;

        assert_eq!(report.estimated_sql.len(), 2);
        assert!(report.estimated_sql[0].contains("BIGINT UNSIGNED"));
        assert!(report.estimated_sql[1].contains("ADD CONSTRAINT `posts_owner_id_foreign`"));
        assert!(report.estimated_sql[1].contains("ON DELETE CASCADE"));
        assert_eq!(report.impact, Impact::Risky);
    })
    .await;
}

#[tokio::test]
async fn test_field_apply_is_idempotent() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta.clone());
        let items = vec![SchemaChangeItem::Field(field("nickname"))];

        let first = planner.apply_direct_changes("notes", &items).await;
        assert!(first.success);
        assert_eq!(first.applied, vec!["column nickname"]);

        let second = planner.apply_direct_changes("notes", &items).await;
        assert!(second.success);
        assert!(second.applied.is_empty());
        assert!(second.errors.is_empty());

        let cols = meta.columns("notes").await;
        assert_eq!(cols.iter().filter(|c| c.name == "nickname").count(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_failed_constraint_drops_freshly_created_column() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta.clone());

        // Sqlite cannot add a constraint to an existing table, so the second
        // phase fails and the column created in the first phase must go away
        let report = planner
            .apply_direct_changes(
                "posts",
                &[SchemaChangeItem::Relation(relation("owner_id"))],
            )
            .await;

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("owner_id:"));

        let cols = meta.columns("posts").await;
        assert!(!cols.iter().any(|c| c.name == "owner_id"));
    })
    .await;
}

#[tokio::test]
async fn test_pre_existing_column_survives_constraint_failure() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta.clone());

        planner
            .apply_direct_changes(
                "posts",
                &[SchemaChangeItem::Field(FieldAddition {
                    field_type: FieldType::BigInteger,
                    ..field("owner_id")
                })],
            )
            .await;

        let report = planner
            .apply_direct_changes(
                "posts",
                &[SchemaChangeItem::Relation(relation("owner_id"))],
            )
            .await;

        assert!(!report.success);
        let cols = meta.columns("posts").await;
        assert!(cols.iter().any(|c| c.name == "owner_id"));
    })
    .await;
}

#[tokio::test]
async fn test_partial_success_keeps_non_failing_items() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta.clone());

        let report = planner
            .apply_direct_changes(
                "posts",
                &[
                    SchemaChangeItem::Field(field("summary")),
                    SchemaChangeItem::Relation(relation("owner_id")),
                ],
            )
            .await;

        assert!(!report.success);
        assert_eq!(report.applied, vec!["column summary"]);
        assert_eq!(report.errors.len(), 1);

        let cols = meta.columns("posts").await;
        assert!(cols.iter().any(|c| c.name == "summary"));
        assert!(!cols.iter().any(|c| c.name == "owner_id"));
    })
    .await;
}

#[tokio::test]
async fn test_apply_on_unmanageable_table_reports_error() {
    run_test(|meta| async move {
        let planner = SchemaPlanner::new(meta);

        let report = planner
            .apply_direct_changes("migrations", &[SchemaChangeItem::Field(field("x"))])
            .await;

        assert!(!report.success);
        assert!(report.applied.is_empty());
        assert_eq!(report.errors.len(), 1);
    })
    .await;
}

/// Wraps a real sqlite connection but accepts the FK DDL sqlite itself
/// rejects, recording added constraints so later introspection sees them.
struct FkRecordingDriver {
    inner: Connection,
    fks: Mutex<Vec<ForeignKeyDesc>>,
}

#[async_trait]
impl Driver for FkRecordingDriver {
    async fn execute_many(&self, pairs: Vec<(String, Vec<Vec<Value>>)>) -> Result<Vec<u64>> {
        self.inner.execute_many(pairs).await
    }

    async fn query_many(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>> {
        self.inner.query_many(sql, params).await
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        self.inner.execute_ddl(sql).await
    }

    async fn database_name(&self) -> Result<String> {
        self.inner.database_name().await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.inner.list_tables().await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDesc>> {
        self.inner.table_columns(table).await
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        self.inner.primary_key_columns(table).await
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDesc>> {
        let mut fks = self.inner.foreign_keys(table).await?;
        fks.extend(self.fks.lock().unwrap().iter().cloned());

        Ok(fks)
    }

    async fn indexed_columns(&self, table: &str) -> Result<Vec<String>> {
        self.inner.indexed_columns(table).await
    }

    async fn add_column(&self, table: &str, spec: &ColumnSpec) -> Result<()> {
        self.inner.add_column(table, spec).await
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        self.inner.drop_column(table, column).await
    }

    async fn add_foreign_key(&self, _table: &str, spec: &ForeignKeySpec) -> Result<()> {
        self.fks.lock().unwrap().push(ForeignKeyDesc {
            column: spec.column.clone(),
            referenced_table: spec.references_table.clone(),
            referenced_column: spec.references_column.clone(),
        });

        Ok(())
    }

    async fn drop_foreign_key(&self, _table: &str, _constraint: &str) -> Result<()> {
        self.fks.lock().unwrap().clear();

        Ok(())
    }
}

async fn fk_capable_meta() -> SchemaMetadata {
    let inner = Connection::connect("sqlite://memory").await.unwrap();
    inner
        .execute_ddl(
            r#"
            CREATE TABLE vendors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_code VARCHAR(50) NOT NULL,
                vendor_name VARCHAR(100) NOT NULL
            );
            CREATE TABLE tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject VARCHAR(255) NOT NULL
            );
            "#,
        )
        .await
        .unwrap();

    let driver = Arc::new(FkRecordingDriver {
        inner,
        fks: Mutex::new(vec![]),
    });

    SchemaMetadata::new(Connection::from_driver(driver))
}

#[tokio::test]
async fn test_relation_apply_persists_referenced_table_overrides() {
    let meta = fk_capable_meta().await;
    let planner = SchemaPlanner::new(meta.clone());

    // Admin-set values on the referenced table must survive the upsert
    meta.store()
        .upsert(&TableMetaOverride {
            table_name: "vendors".into(),
            primary_key_column: Some("id".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = planner
        .apply_direct_changes(
            "tickets",
            &[SchemaChangeItem::Relation(RelationAddition {
                label_columns: vec!["vendor_name".into(), "vendor_code".into()],
                ..relation("vendor_id")
            })],
        )
        .await;

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.applied, vec!["relation vendor_id"]);

    let stored = meta.store().get("vendors").await.unwrap().unwrap();
    assert_eq!(stored.label_column.as_deref(), Some("vendor_name"));
    assert_eq!(stored.search_column.as_deref(), Some("vendor_name"));
    assert_eq!(
        stored.display_template,
        Some(DisplayTemplate::from_columns(&[
            "vendor_name".to_string(),
            "vendor_code".to_string(),
        ]))
    );
    assert_eq!(stored.primary_key_column.as_deref(), Some("id"));
}

#[tokio::test]
async fn test_relation_explicit_search_column_wins() {
    let meta = fk_capable_meta().await;
    let planner = SchemaPlanner::new(meta.clone());

    let report = planner
        .apply_direct_changes(
            "tickets",
            &[SchemaChangeItem::Relation(RelationAddition {
                label_columns: vec!["vendor_name".into()],
                search_column: Some("vendor_code".into()),
                ..relation("vendor_id")
            })],
        )
        .await;
    assert!(report.success, "errors: {:?}", report.errors);

    let stored = meta.store().get("vendors").await.unwrap().unwrap();
    assert_eq!(stored.search_column.as_deref(), Some("vendor_code"));
    assert_eq!(stored.label_column.as_deref(), Some("vendor_name"));
}

#[tokio::test]
async fn test_relation_apply_is_idempotent() {
    let meta = fk_capable_meta().await;
    let planner = SchemaPlanner::new(meta.clone());
    let items = vec![SchemaChangeItem::Relation(relation("vendor_id"))];

    let first = planner.apply_direct_changes("tickets", &items).await;
    assert!(first.success, "errors: {:?}", first.errors);
    assert_eq!(first.applied, vec!["relation vendor_id"]);

    let second = planner.apply_direct_changes("tickets", &items).await;
    assert!(second.success);
    assert!(second.applied.is_empty());
    assert!(second.errors.is_empty());
}
