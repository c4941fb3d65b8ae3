use std::{collections::HashMap, sync::Arc};

use dynschema::{conn::Value, DynamicRepository, ListOptions};
use dynschema_test::run_test;

fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_insert_find_update_delete_cycle() {
    run_test(|meta| async move {
        let repo = DynamicRepository::new(meta.clone());
        let binding = Arc::new(meta.binding("vendors").await.unwrap());

        let id = repo
            .insert(
                &binding,
                values(&[
                    ("vendor_code", Value::Str("ZX".into())),
                    ("vendor_name", Value::Str("Zenix".into())),
                ]),
            )
            .await
            .unwrap();
        assert!(id > 0);

        let record = repo
            .find(&binding, Value::U64(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get::<String>("vendor_name").unwrap(), "Zenix");
        assert_eq!(record.binding().table, "vendors");

        repo.update(
            &binding,
            Value::U64(id),
            values(&[("vendor_name", Value::Str("Zenix Ltd".into()))]),
        )
        .await
        .unwrap();

        let record = repo
            .find(&binding, Value::U64(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get::<String>("vendor_name").unwrap(), "Zenix Ltd");

        repo.delete(&binding, Value::U64(id)).await.unwrap();
        assert!(repo.find(&binding, Value::U64(id)).await.unwrap().is_none());
    })
    .await;
}

#[tokio::test]
async fn test_insert_stamps_timestamps_and_strips_auto_key() {
    run_test(|meta| async move {
        let repo = DynamicRepository::new(meta.clone());
        let binding = Arc::new(meta.binding("posts").await.unwrap());

        // A caller-supplied id on an auto-increment table is ignored
        repo.insert(
            &binding,
            values(&[
                ("id", Value::I64(9999)),
                ("title", Value::Str("Third post".into())),
                ("ignored_key", Value::Str("dropped".into())),
            ]),
        )
        .await
        .unwrap();

        let record = repo
            .list(&binding, ListOptions::default())
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.get::<String>("title").unwrap() == "Third post")
            .unwrap();

        assert_ne!(record.get::<i64>("id").unwrap(), 9999);
        assert!(record
            .get::<Option<String>>("created_at")
            .unwrap()
            .is_some());
        assert!(record
            .get::<Option<String>>("updated_at")
            .unwrap()
            .is_some());
    })
    .await;
}

#[tokio::test]
async fn test_soft_delete_hides_rows_until_requested() {
    run_test(|meta| async move {
        let repo = DynamicRepository::new(meta.clone());
        let binding = Arc::new(meta.binding("articles").await.unwrap());

        let visible = repo.list(&binding, ListOptions::default()).await.unwrap();
        assert_eq!(visible.len(), 1);

        let all = repo
            .list(
                &binding,
                ListOptions {
                    with_deleted: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        // Delete stamps deleted_at instead of removing the row
        let id = visible[0].get::<i64>("id").unwrap();
        repo.delete(&binding, Value::I64(id)).await.unwrap();

        assert!(repo
            .find(&binding, Value::I64(id))
            .await
            .unwrap()
            .is_none());
        let all = repo
            .list(
                &binding,
                ListOptions {
                    with_deleted: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    })
    .await;
}

#[tokio::test]
async fn test_binding_propagates_to_materialized_records() {
    run_test(|meta| async move {
        let repo = DynamicRepository::new(meta.clone());
        let binding = Arc::new(meta.binding("devices").await.unwrap());

        let records = repo.list(&binding, ListOptions::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        for record in &records {
            assert_eq!(record.binding(), binding.as_ref());
            assert_eq!(record.key(), Some(&Value::Str("SN-1".into())));
        }

        let key = DynamicRepository::key_value(&binding, "SN-1");
        assert_eq!(key, Value::Str("SN-1".into()));

        let posts = meta.binding("posts").await.unwrap();
        assert_eq!(DynamicRepository::key_value(&posts, "7"), Value::I64(7));
    })
    .await;
}
