//! End-to-end recipe tests against the in-memory store.

use std::time::Duration;

use dbtweak_core::proto::{
    AttributeDescriptor, AttributeType, CollectionDescriptor, IndexDescriptor, IndexType,
    SortOrder,
};
use dbtweak_core::{Error, MemoryStore, MigrationConfig, MigrationPlanner};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

const USERS: &str = "users";
const NAMES: [&str; 5] = ["Ada", "Grace", "Linus", "Barbara", "Ken"];

struct TestContext {
    store: MemoryStore,
}

impl TestContext {
    /// `users` with `name` (string, 50), `age` (integer reported with
    /// sentinel bounds), `idx_name` on [name] and `idx_age` on [age].
    fn new() -> Self {
        let store = MemoryStore::new()
            .with_creation_polls(2)
            .with_deletion_polls(2);
        store.add_collection(CollectionDescriptor::new(USERS).with_document_security(true));
        store
            .add_attribute(USERS, AttributeDescriptor::string("name", 50))
            .unwrap();
        store
            .add_attribute(
                USERS,
                AttributeDescriptor::integer("age", Some(i64::MIN), Some(i64::MAX)),
            )
            .unwrap();
        store
            .add_index(
                USERS,
                IndexDescriptor::new("idx_name", IndexType::Key, vec!["name".into()]),
            )
            .unwrap();
        store
            .add_index(
                USERS,
                IndexDescriptor::new("idx_age", IndexType::Key, vec!["age".into()]),
            )
            .unwrap();

        for (age, name) in NAMES.iter().enumerate() {
            store
                .insert_document(USERS, json!({ "name": name, "age": 30 + age }))
                .unwrap();
        }
        Self { store }
    }

    fn config() -> MigrationConfig {
        MigrationConfig::default().with_poll_interval(Duration::from_millis(1))
    }

    fn planner(&self) -> MigrationPlanner<'_, MemoryStore> {
        self.planner_with(Self::config())
    }

    fn planner_with(&self, config: MigrationConfig) -> MigrationPlanner<'_, MemoryStore> {
        MigrationPlanner::new(&self.store, USERS, config).unwrap()
    }

    fn field(&self, field: &str) -> Vec<Value> {
        self.store
            .documents(USERS)
            .iter()
            .map(|d| d.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn user_fields(&self, collection: &str) -> Vec<Map<String, Value>> {
        self.store
            .documents(collection)
            .iter()
            .map(|d| d.user_fields())
            .collect()
    }
}

fn names() -> Vec<Value> {
    NAMES.iter().map(|n| json!(n)).collect()
}

#[tokio::test]
async fn rename_moves_values_and_rebuilds_indexes() {
    let ctx = TestContext::new();
    let report = ctx.planner().rename_attribute("name", "fullname").await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.indexes_rebuilt, 1);
    assert_eq!(report.documents_updated, 10);

    assert_eq!(ctx.store.attribute_keys(USERS), vec!["age", "fullname"]);
    assert_eq!(ctx.store.attribute(USERS, "fullname").unwrap().size(), Some(50));
    assert!(ctx.store.attribute(USERS, "name").is_none());
    assert_eq!(ctx.field("fullname"), names());

    let index = ctx.store.index(USERS, "idx_name").unwrap();
    assert_eq!(index.attributes, vec!["fullname"]);
    assert_eq!(
        ctx.store.index(USERS, "idx_age").unwrap().attributes,
        vec!["age"]
    );
}

#[tokio::test]
async fn resize_keeps_values_but_loses_indexes() {
    let ctx = TestContext::new();
    let report = ctx.planner().resize_attribute("name", 100).await.unwrap();

    assert_eq!(report.indexes_rebuilt, 0);
    assert_eq!(
        ctx.store.attribute(USERS, "name").unwrap().attribute_type,
        AttributeType::String { size: 100 }
    );
    assert_eq!(ctx.field("name"), names());
    assert!(ctx.store.index(USERS, "idx_name").is_none());
    assert!(ctx.store.index(USERS, "idx_age").is_some());
    assert!(ctx.store.attribute(USERS, "tmp___").is_none());
}

#[tokio::test]
async fn rename_round_trip_restores_values_and_indexes() {
    let ctx = TestContext::new();
    ctx.store
        .add_index(
            USERS,
            IndexDescriptor::new(
                "idx_name_age",
                IndexType::Unique,
                vec!["name".into(), "age".into()],
            )
            .with_orders(vec![SortOrder::Desc, SortOrder::Asc]),
        )
        .unwrap();
    let before = ctx.user_fields(USERS);
    let index_before = ctx.store.index(USERS, "idx_name_age").unwrap();

    let planner = ctx.planner();
    planner.rename_attribute("name", "fullname").await.unwrap();
    planner.rename_attribute("fullname", "name").await.unwrap();

    assert_eq!(ctx.user_fields(USERS), before);
    let index_after = ctx.store.index(USERS, "idx_name_age").unwrap();
    assert_eq!(index_after.attributes, index_before.attributes);
    assert_eq!(index_after.orders, index_before.orders);
    assert_eq!(index_after.index_type, IndexType::Unique);
    assert_eq!(
        ctx.store.index(USERS, "idx_name").unwrap().attributes,
        vec!["name"]
    );
}

#[tokio::test]
async fn reorder_of_sorted_attributes_is_idempotent() {
    let ctx = TestContext::new();
    let before = ctx.user_fields(USERS);

    let requested = vec!["name".to_string(), "age".to_string()];
    let report = ctx.planner().reorder_attributes(&requested).await.unwrap();

    assert!(report.notes.is_empty());
    assert_eq!(ctx.store.attribute_keys(USERS), vec!["name", "age"]);
    assert_eq!(ctx.user_fields(USERS), before);
    assert!(ctx.store.index(USERS, "idx_name").is_some());
    assert!(ctx.store.index(USERS, "idx_age").is_some());
}

#[tokio::test]
async fn reorder_moves_requested_attribute_first() {
    let ctx = TestContext::new();
    let requested = vec!["age".to_string(), "nickname".to_string()];
    let report = ctx.planner().reorder_attributes(&requested).await.unwrap();

    assert_eq!(report.notes, vec!["ignoring unknown attribute \"nickname\""]);
    assert_eq!(ctx.store.attribute_keys(USERS), vec!["age", "name"]);
    assert_eq!(ctx.field("name"), names());
    // Sentinel bounds came back as "no bound" and were stored as sentinels again.
    assert_eq!(
        ctx.store.attribute(USERS, "age").unwrap().attribute_type,
        AttributeType::Integer {
            min: Some(i64::MIN),
            max: Some(i64::MAX)
        }
    );
}

#[tokio::test]
async fn delete_missing_attribute_is_not_found() {
    let ctx = TestContext::new();
    let err = ctx.planner().delete_attribute("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_attribute_waits_until_gone() {
    let ctx = TestContext::new();
    ctx.planner().delete_attribute("age").await.unwrap();
    assert_eq!(ctx.store.attribute_keys(USERS), vec!["name"]);
    assert!(ctx.store.index(USERS, "idx_age").is_none());
}

#[tokio::test]
async fn clone_attribute_reports_indexes_without_replaying_them() {
    let ctx = TestContext::new();
    let report = ctx
        .planner()
        .clone_attribute("name", "alias", Some(20))
        .await
        .unwrap();

    assert_eq!(report.documents_updated, 5);
    assert_eq!(report.unreplayed_indexes.len(), 1);
    assert_eq!(report.unreplayed_indexes[0].key, "idx_name");
    assert_eq!(ctx.field("alias"), names());
    assert_eq!(ctx.store.attribute(USERS, "alias").unwrap().size(), Some(20));
    assert_eq!(ctx.store.index_keys(USERS), vec!["idx_name", "idx_age"]);
}

#[tokio::test]
async fn clone_collection_with_data() {
    let ctx = TestContext::new();
    for i in NAMES.len()..250 {
        ctx.store
            .insert_document(USERS, json!({ "name": format!("user{}", i), "age": i }))
            .unwrap();
    }

    let config = TestContext::config().with_chunk_size(100);
    let report = ctx
        .planner_with(config)
        .clone_collection("archive", true)
        .await
        .unwrap();
    assert_eq!(report.documents_created, 250);

    let archive = ctx.store.collection("archive").unwrap();
    assert!(archive.document_security);
    assert_eq!(ctx.store.attribute_keys("archive"), vec!["name", "age"]);
    assert_eq!(ctx.store.index_keys("archive"), vec!["idx_name", "idx_age"]);
    assert_eq!(
        ctx.store.index("archive", "idx_name").unwrap().attributes,
        vec!["name"]
    );

    let originals = ctx.store.documents(USERS);
    let copies = ctx.store.documents("archive");
    assert_eq!(copies.len(), 250);
    assert_eq!(ctx.user_fields("archive"), ctx.user_fields(USERS));
    for (original, copy) in originals.iter().zip(&copies) {
        assert_ne!(original.id(), copy.id());
        assert_eq!(copy.get("$collectionId"), Some(&json!("archive")));
    }
}

#[tokio::test]
async fn clone_collection_without_data_copies_schema_only() {
    let ctx = TestContext::new();
    let report = ctx.planner().clone_collection("archive", false).await.unwrap();
    assert_eq!(report.documents_created, 0);
    assert_eq!(ctx.store.attribute_keys("archive"), vec!["name", "age"]);
    assert!(ctx.store.documents("archive").is_empty());
}

#[tokio::test]
async fn delete_collection() {
    let ctx = TestContext::new();
    ctx.planner().delete_collection().await.unwrap();
    assert!(ctx.store.collection(USERS).is_none());

    let err = ctx.planner().delete_collection().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_creation_aborts_and_leaves_intermediate_state() {
    let ctx = TestContext::new();
    ctx.store.fail_creation_of("fullname");

    let err = ctx
        .planner()
        .rename_attribute("name", "fullname")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CreationFailed { .. }));

    // The original is gone and the data sits in the temporary attribute.
    assert!(ctx.store.attribute(USERS, "name").is_none());
    assert_eq!(ctx.field("tmp___"), names());

    // Further recipes refuse to run until the temporary attribute is dealt with.
    let err = ctx.planner().rename_attribute("age", "years").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn dry_run_does_not_mutate() {
    let ctx = TestContext::new();
    let planner = ctx.planner_with(TestContext::config().with_dry_run(true));

    let report = planner.rename_attribute("name", "fullname").await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.steps_executed, 0);
    assert_eq!(report.total_steps, 7);
    assert_eq!(report.steps.len(), 7);

    planner.clone_collection("archive", true).await.unwrap();
    planner.delete_collection().await.unwrap();

    assert_eq!(ctx.store.attribute_keys(USERS), vec!["name", "age"]);
    assert!(ctx.store.collection("archive").is_none());
    assert!(ctx.store.collection(USERS).is_some());
    // Only the fixture inserts were written.
    assert_eq!(ctx.store.document_writes(), NAMES.len() as u64);
}

#[tokio::test]
async fn wait_deadline_times_out() {
    let store = MemoryStore::new().with_creation_polls(usize::MAX);
    store.add_collection(CollectionDescriptor::new(USERS));
    store
        .add_attribute(USERS, AttributeDescriptor::string("name", 10))
        .unwrap();

    let config = TestContext::config().with_wait_deadline(Duration::from_millis(30));
    let planner = MigrationPlanner::new(&store, USERS, config).unwrap();
    let err = planner
        .clone_attribute("name", "alias", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
}
