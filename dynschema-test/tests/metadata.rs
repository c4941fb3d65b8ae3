use std::collections::HashMap;

use dynschema::{
    conn::Value, ColumnKind, DisplayTemplate, KeyKind, TableMetaOverride,
};
use dynschema_test::run_test;

#[tokio::test]
async fn test_columns_carry_semantic_kinds() {
    run_test(|meta| async move {
        let cols = meta.columns("articles").await;
        let kind = |name: &str| cols.iter().find(|c| c.name == name).unwrap().kind;

        assert_eq!(kind("id"), ColumnKind::Integer);
        assert_eq!(kind("title"), ColumnKind::String);
        assert_eq!(kind("body"), ColumnKind::Text);
        assert_eq!(kind("deleted_at"), ColumnKind::DateTime);

        let title = cols.iter().find(|c| c.name == "title").unwrap();
        assert_eq!(title.length, Some(255));
        assert!(!title.nullable);

        assert!(meta.columns("migrations").await.is_empty());
        assert!(meta.columns("no_such_table").await.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_primary_key_and_auto_increment() {
    run_test(|meta| async move {
        assert_eq!(meta.primary_key("posts").await, "id");
        assert_eq!(meta.primary_key("devices").await, "serial");

        assert!(meta.is_primary_auto_increment("posts").await);
        assert!(!meta.is_primary_auto_increment("devices").await);
    })
    .await;
}

#[tokio::test]
async fn test_foreign_keys_only_from_declared_constraints() {
    run_test(|meta| async move {
        let fks = meta.foreign_keys("posts").await;
        let fk = fks.get("vendor_id").unwrap();
        assert_eq!(fk.referenced_table, "vendors");
        assert_eq!(fk.referenced_column, "id");

        assert!(meta.foreign_keys("articles").await.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_soft_delete_and_index_detection() {
    run_test(|meta| async move {
        assert!(meta.has_deleted_at("articles").await);
        assert!(!meta.has_deleted_at("posts").await);

        assert!(meta.is_indexed("vendors", "vendor_code").await);
        assert!(meta.is_indexed("vendors", "id").await);
        assert!(!meta.is_indexed("vendors", "vendor_name").await);
    })
    .await;
}

#[tokio::test]
async fn test_label_column_guessing() {
    run_test(|meta| async move {
        // Common name wins
        assert_eq!(meta.guess_label_column("posts").await, "title");
        // No common name, first text-like column
        assert_eq!(meta.guess_label_column("vendors").await, "vendor_code");
        // No text-like column at all, primary key as last resort
        assert_eq!(meta.guess_label_column("plain").await, "id");

        // `*_name` suffix drives composite labels
        assert_eq!(meta.label_columns("vendors").await, vec!["vendor_name"]);
    })
    .await;
}

#[tokio::test]
async fn test_compose_label_fallback_chain() {
    run_test(|meta| async move {
        let mut row = HashMap::new();
        row.insert("foo".to_string(), Value::Str("X".into()));
        row.insert("id".to_string(), Value::I64(1));
        assert_eq!(meta.compose_label("samples", &row).await, "X");

        let mut row = HashMap::new();
        row.insert("id".to_string(), Value::I64(1));
        assert_eq!(meta.compose_label("plain", &row).await, "1");
    })
    .await;
}

#[tokio::test]
async fn test_override_template_wins_label_composition() {
    run_test(|meta| async move {
        let columns = vec!["vendor_code".to_string(), "vendor_name".to_string()];
        let template = DisplayTemplate::from_columns(&columns);
        // Round-trips through the persisted JSON shape
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(
            serde_json::from_str::<DisplayTemplate>(&json).unwrap(),
            template
        );

        meta.store()
            .upsert(&TableMetaOverride {
                table_name: "vendors".into(),
                search_column: Some("vendor_code".into()),
                display_template: Some(template),
                ..Default::default()
            })
            .await
            .unwrap();
        meta.invalidate_table_cache("vendors").await;

        let mut row = HashMap::new();
        row.insert("vendor_code".to_string(), Value::Str("AC".into()));
        row.insert("vendor_name".to_string(), Value::Str("Acme".into()));
        assert_eq!(meta.compose_label("vendors", &row).await, "AC - Acme");

        assert_eq!(meta.best_search_column("vendors").await, "vendor_code");
        assert_eq!(
            meta.label_columns("vendors").await,
            vec!["vendor_code", "vendor_name"]
        );
    })
    .await;
}

#[tokio::test]
async fn test_populate_meta_never_overwrites_admin_choices() {
    run_test(|meta| async move {
        meta.store()
            .upsert(&TableMetaOverride {
                table_name: "vendors".into(),
                label_column: Some("vendor_name".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        meta.populate_meta_for_table("vendors").await.unwrap();

        let stored = meta.store().get("vendors").await.unwrap().unwrap();
        assert_eq!(stored.label_column.as_deref(), Some("vendor_name"));
        assert_eq!(stored.primary_key_column.as_deref(), Some("id"));

        // Second run is a no-op
        meta.populate_meta_for_table("vendors").await.unwrap();
        let again = meta.store().get("vendors").await.unwrap().unwrap();
        assert_eq!(again, stored);
    })
    .await;
}

#[tokio::test]
async fn test_binding_resolution() {
    run_test(|meta| async move {
        let posts = meta.binding("posts").await.unwrap();
        assert_eq!(posts.table, "posts");
        assert_eq!(posts.primary_key, "id");
        assert_eq!(posts.key_kind, KeyKind::Int);
        assert!(posts.auto_increment);
        assert!(posts.has_timestamps);
        assert!(!posts.soft_delete);

        let devices = meta.binding("devices").await.unwrap();
        assert_eq!(devices.primary_key, "serial");
        assert_eq!(devices.key_kind, KeyKind::Str);
        assert!(!devices.auto_increment);
        assert!(!devices.has_timestamps);

        let articles = meta.binding("articles").await.unwrap();
        assert!(articles.soft_delete);

        assert!(meta.binding("migrations").await.is_none());
    })
    .await;
}
