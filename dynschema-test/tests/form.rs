use std::collections::HashMap;

use dynschema::{conn::Value, FormBuilder, WidgetKind};
use dynschema_test::run_test;

#[tokio::test]
async fn test_create_form_omits_auto_key_and_timestamps() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        let fields = form.build_form("posts", false, false).await;
        let names = fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();

        assert_eq!(names, vec!["title", "vendor_id"]);

        let title = &fields[0];
        assert_eq!(title.widget, WidgetKind::TextInput);
        assert!(title.required);
        assert_eq!(title.max_length, Some(255));

        let vendor = &fields[1];
        assert_eq!(vendor.widget, WidgetKind::RemoteSelect);
        assert!(!vendor.required);
        let relation = vendor.relation.as_ref().unwrap();
        assert_eq!(relation.table, "vendors");
        assert_eq!(relation.column, "id");
        assert!(relation.declared);
    })
    .await;
}

#[tokio::test]
async fn test_edit_form_keeps_key_read_only() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        let fields = form.build_form("posts", true, false).await;
        let id = fields.iter().find(|f| f.name == "id").unwrap();
        assert!(id.read_only);

        // View mode renders everything read-only
        let fields = form.build_form("posts", false, true).await;
        assert!(fields.iter().all(|f| f.read_only));

        // Soft-delete column stays hidden even on edit
        let fields = form.build_form("articles", true, false).await;
        assert!(!fields.iter().any(|f| f.name == "deleted_at"));
    })
    .await;
}

#[tokio::test]
async fn test_rules_mirror_types_and_references() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        let rules = form.build_rules("posts", false).await;

        assert_eq!(
            rules["title"],
            vec!["required", "string", "max:255"]
        );
        assert_eq!(
            rules["vendor_id"],
            vec!["nullable", "integer", "exists:vendors,id"]
        );
        // Edit adds no rule for the read-only key
        let rules = form.build_rules("posts", true).await;
        assert!(!rules.contains_key("id"));
    })
    .await;
}

#[tokio::test]
async fn test_validate_reports_field_keyed_errors() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        let mut values = HashMap::new();
        values.insert("vendor_id".to_string(), Value::I64(999));
        let errors = form.validate("posts", false, &values).await.unwrap();

        assert!(errors["title"][0].contains("required"));
        assert!(errors["vendor_id"][0].contains("missing"));

        let mut values = HashMap::new();
        values.insert("title".to_string(), Value::Str("Valid".into()));
        values.insert("vendor_id".to_string(), Value::I64(1));
        let errors = form.validate("posts", false, &values).await.unwrap();
        assert!(errors.is_empty());

        // Nullable FK may stay empty
        let mut values = HashMap::new();
        values.insert("title".to_string(), Value::Str("No vendor".into()));
        let errors = form.validate("posts", false, &values).await.unwrap();
        assert!(errors.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_remote_select_search_and_label_resolution() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        let hits = form.search_related("posts", "vendor_id", "AC").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, Value::I64(1));
        assert_eq!(hits[0].1, "Acme");

        let label = form
            .resolve_label("posts", "vendor_id", Value::I64(2))
            .await
            .unwrap();
        assert_eq!(label.as_deref(), Some("Bolt"));

        let label = form
            .resolve_label("posts", "vendor_id", Value::I64(999))
            .await
            .unwrap();
        assert!(label.is_none());
    })
    .await;
}

#[tokio::test]
async fn test_search_term_is_bound_not_spliced() {
    run_test(|meta| async move {
        let form = FormBuilder::new(meta);

        // Quote and backslash metacharacters in the term match literally and
        // never reach the statement text
        for term in ["\\' OR 1=1 -- ", "' OR '1'='1", "\\"] {
            let hits = form
                .search_related("posts", "vendor_id", term)
                .await
                .unwrap();
            assert!(hits.is_empty(), "term {:?} matched {:?}", term, hits);
        }

        // A plain term still matches after binding
        let hits = form.search_related("posts", "vendor_id", "BO").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, "Bolt");
    })
    .await;
}

#[tokio::test]
async fn test_naming_heuristic_degrades_gracefully() {
    run_test(|meta| async move {
        let catalog = meta.clone();
        let form = FormBuilder::new(meta);

        // `vendor_id` on a table without a declared constraint still renders a
        // remote select, guessed from the column name
        catalog
            .connection()
            .execute_ddl("ALTER TABLE notes ADD COLUMN vendor_id BIGINT")
            .await
            .unwrap();
        catalog.invalidate_table_cache("notes").await;

        let fields = form.build_form("notes", false, false).await;
        let vendor = fields.iter().find(|f| f.name == "vendor_id").unwrap();
        assert_eq!(vendor.widget, WidgetKind::RemoteSelect);
        let relation = vendor.relation.as_ref().unwrap();
        assert_eq!(relation.table, "vendors");
        assert_eq!(relation.column, "id");
        assert!(!relation.declared);

        // No exists rule without a real constraint
        let rules = form.build_rules("notes", false).await;
        assert!(!rules["vendor_id"].iter().any(|r| r.starts_with("exists:")));

        // A `*_id` column whose guessed table is not manageable falls back to
        // a plain numeric input
        catalog
            .connection()
            .execute_ddl("ALTER TABLE notes ADD COLUMN warp_id BIGINT")
            .await
            .unwrap();
        catalog.invalidate_table_cache("notes").await;

        let fields = form.build_form("notes", false, false).await;
        let warp = fields.iter().find(|f| f.name == "warp_id").unwrap();
        assert_eq!(warp.widget, WidgetKind::NumberInput);
        assert!(warp.relation.is_none());
    })
    .await;
}
