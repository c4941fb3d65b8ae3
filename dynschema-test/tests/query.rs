use dynschema::{DynamicQueryBuilder, EMPTY_QUERY};
use dynschema_test::run_test;

#[tokio::test]
async fn test_fk_join_with_deterministic_aliases() {
    run_test(|meta| async move {
        let conn = meta.connection().clone();
        let builder = DynamicQueryBuilder::new(meta);

        let sql = builder
            .build("posts", &["fk:vendor_id:vendors:vendor_name".to_string()])
            .await;
        assert_eq!(
            sql,
            "SELECT posts.*, vendors__vendor_id.vendor_name AS fk_vendor_id__vendors__vendor_name \
             FROM posts LEFT JOIN vendors AS vendors__vendor_id ON posts.vendor_id = vendors__vendor_id.id"
        );

        let rows = conn.query_many(&sql, vec![]).await.unwrap();
        assert_eq!(rows.len(), 2);
        let labels = rows
            .iter()
            .map(|r| {
                r.get::<String>("fk_vendor_id__vendors__vendor_name")
                    .unwrap()
            })
            .collect::<Vec<_>>();
        assert!(labels.contains(&"Acme".to_string()));
        assert!(labels.contains(&"Bolt".to_string()));
    })
    .await;
}

#[tokio::test]
async fn test_duplicate_keys_join_once() {
    run_test(|meta| async move {
        let builder = DynamicQueryBuilder::new(meta);

        let sql = builder
            .build(
                "posts",
                &[
                    "fk:vendor_id:vendors:vendor_name".to_string(),
                    "fk:vendor_id:vendors:vendor_code".to_string(),
                ],
            )
            .await;

        assert_eq!(sql.matches("LEFT JOIN").count(), 1);
        assert!(sql.contains("fk_vendor_id__vendors__vendor_name"));
        assert!(sql.contains("fk_vendor_id__vendors__vendor_code"));
    })
    .await;
}

#[tokio::test]
async fn test_spoofed_join_is_skipped() {
    run_test(|meta| async move {
        let builder = DynamicQueryBuilder::new(meta);

        // Wrong referenced table for the constraint
        let sql = builder
            .build("posts", &["fk:vendor_id:articles:title".to_string()])
            .await;
        assert!(!sql.contains("JOIN"));
        assert!(!sql.contains("fk_"));

        // Not a foreign key column at all
        let sql = builder
            .build("posts", &["fk:title:vendors:vendor_name".to_string()])
            .await;
        assert!(!sql.contains("JOIN"));

        // Referenced column does not exist
        let sql = builder
            .build("posts", &["fk:vendor_id:vendors:secret".to_string()])
            .await;
        assert!(!sql.contains("JOIN"));
    })
    .await;
}

#[tokio::test]
async fn test_soft_delete_filter() {
    run_test(|meta| async move {
        let conn = meta.connection().clone();
        let builder = DynamicQueryBuilder::new(meta);

        let sql = builder.build("articles", &[]).await;
        assert!(sql.contains("(articles.deleted_at IS NULL)"));

        let rows = conn.query_many(&sql, vec![]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String>("title").unwrap(), "Kept");

        // No filter for tables without the column
        let sql = builder.build("posts", &[]).await;
        assert!(!sql.contains("deleted_at"));
    })
    .await;
}

#[tokio::test]
async fn test_non_whitelisted_table_yields_empty_query() {
    run_test(|meta| async move {
        let conn = meta.connection().clone();
        let builder = DynamicQueryBuilder::new(meta);

        for table in ["migrations", "no_such_table", "posts; DROP TABLE x"] {
            let sql = builder.build(table, &[]).await;
            assert_eq!(sql, EMPTY_QUERY);
        }

        let rows = conn.query_many(EMPTY_QUERY, vec![]).await.unwrap();
        assert!(rows.is_empty());
    })
    .await;
}
