//! Startup hydration against in-memory and file-backed storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tabgroup_core::{
    default_group_labels, storage::storage_path_at, Action, ConfigStore, Configuration, Field,
    JsonFileStorage, MemoryStorage, ReconcileOutcome, SlotSource, StartupReconciler, Storage,
    StorageError,
};

/// Storage whose reads always fail.
struct OfflineStorage;

#[async_trait]
impl Storage for OfflineStorage {
    async fn get_many(&self, _keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        Err(StorageError::Unavailable("extension storage offline".into()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("extension storage offline".into()))
    }
}

fn hydrate_from(storage: MemoryStorage) -> (ConfigStore, StartupReconciler) {
    let storage: Arc<dyn Storage> = Arc::new(storage);
    let store = ConfigStore::new(Arc::clone(&storage));
    let reconciler = StartupReconciler::new(store.clone(), storage);
    (store, reconciler)
}

fn expect_hydrated(outcome: ReconcileOutcome) -> tabgroup_core::ReconcileReport {
    match outcome {
        ReconcileOutcome::Hydrated(report) => report,
        other => panic!("expected hydration, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 1. Precedence and upgrade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_only_credential_is_upgraded_to_current_slot() {
    let storage = MemoryStorage::with_entries([("openai_key", json!("sk-old"))]);
    let (store, reconciler) = hydrate_from(storage.clone());

    let report = expect_hydrated(reconciler.run().await);
    assert_eq!(report.config.credential, "sk-old");
    assert_eq!(report.source(Field::Credential), Some(SlotSource::Legacy));
    report.confirm().await.expect("rewrites");

    assert_eq!(store.snapshot().credential, "sk-old");
    let entries = storage.entries().await;
    assert_eq!(entries["OPEN_API_KEY"], json!("sk-old"));
    assert_eq!(entries["openai_key"], json!("sk-old"));
}

#[tokio::test]
async fn current_slot_wins_over_legacy() {
    let storage = MemoryStorage::with_entries([
        ("GROUP_TYPES", json!(["Work", "Personal"])),
        ("types", json!(["Old"])),
        ("AUTO_GROUP", json!(false)),
        ("isOn", json!(true)),
    ]);
    let (store, reconciler) = hydrate_from(storage.clone());

    let report = expect_hydrated(reconciler.run().await);
    assert_eq!(report.source(Field::GroupLabels), Some(SlotSource::Current));
    assert_eq!(report.source(Field::AutoClassify), Some(SlotSource::Current));
    report.confirm().await.expect("rewrites");

    let cfg = store.snapshot();
    assert_eq!(cfg.group_labels, vec!["Work", "Personal"]);
    assert!(!cfg.auto_classify);
    // Legacy slot is brought in line with the winner.
    assert_eq!(storage.entries().await["types"], json!(["Work", "Personal"]));
}

#[tokio::test]
async fn empty_storage_hydrates_defaults_into_both_slots() {
    let storage = MemoryStorage::new();
    let (store, reconciler) = hydrate_from(storage.clone());

    let report = expect_hydrated(reconciler.run().await);
    for field in [Field::Credential, Field::AutoClassify, Field::GroupLabels] {
        assert_eq!(report.source(field), Some(SlotSource::Default));
    }
    report.confirm().await.expect("rewrites");

    assert_eq!(store.snapshot(), Configuration::default());
    let entries = storage.entries().await;
    assert_eq!(entries.len(), 6);
    assert_eq!(entries["GROUP_TYPES"], json!(default_group_labels()));
    assert_eq!(entries["types"], json!(default_group_labels()));
    assert_eq!(entries["OPEN_API_KEY"], json!(""));
}

// ---------------------------------------------------------------------------
// 2. Failure and run-once behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_failure_leaves_defaults_untouched() {
    let storage: Arc<dyn Storage> = Arc::new(OfflineStorage);
    let store = ConfigStore::new(Arc::clone(&storage));
    let mut rx = store.subscribe();
    let reconciler = StartupReconciler::new(store.clone(), storage);

    let outcome = reconciler.run().await;
    assert!(matches!(outcome, ReconcileOutcome::ReadFailed(StorageError::Unavailable(_))));
    assert_eq!(store.snapshot(), Configuration::default());
    assert!(!rx.has_changed().expect("sender alive"), "nothing dispatched");
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let storage = MemoryStorage::with_entries([("openai_key", json!("sk-old"))]);
    let (store, reconciler) = hydrate_from(storage.clone());

    expect_hydrated(reconciler.run().await)
        .confirm()
        .await
        .expect("rewrites");

    // A later edit must not be clobbered by a repeated hydration.
    store
        .dispatch(Action::SetCredential("sk-edited".into()))
        .ticket
        .confirm()
        .await
        .expect("persist");
    assert!(matches!(reconciler.run().await, ReconcileOutcome::AlreadyRan));
    assert_eq!(store.snapshot().credential, "sk-edited");
}

// ---------------------------------------------------------------------------
// 3. File-backed restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_backed_settings_survive_restart() {
    let home = tempfile::TempDir::new().expect("tempdir");

    {
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::at(home.path()));
        let store = ConfigStore::new(storage);
        store
            .dispatch(Action::SetCredential("sk-abc".into()))
            .ticket
            .confirm()
            .await
            .expect("persist");
        store
            .dispatch(Action::SetGroupLabels(vec!["Work".into(), "Personal".into()]))
            .ticket
            .confirm()
            .await
            .expect("persist");
    }

    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::at(home.path()));
    let store = ConfigStore::new(Arc::clone(&storage));
    let report = expect_hydrated(StartupReconciler::new(store.clone(), storage).run().await);
    report.confirm().await.expect("rewrites");

    let cfg = store.snapshot();
    assert_eq!(cfg.credential, "sk-abc");
    assert_eq!(cfg.group_labels, vec!["Work", "Personal"]);
    assert!(cfg.auto_classify);
}

#[tokio::test]
async fn bare_legacy_document_is_migrated_on_first_run() {
    let home = tempfile::TempDir::new().expect("tempdir");
    let path = storage_path_at(home.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{"openai_key": "sk-old", "types": ["News", "Shopping"], "isOn": false}"#,
    )
    .unwrap();

    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::at(home.path()));
    let store = ConfigStore::new(Arc::clone(&storage));
    let report = expect_hydrated(StartupReconciler::new(store, storage).run().await);
    report.confirm().await.expect("rewrites");

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc.get("saved_at").is_some(), "rewritten in structured form");
    let entries = &doc["entries"];
    assert_eq!(entries["OPEN_API_KEY"], json!("sk-old"));
    assert_eq!(entries["GROUP_TYPES"], json!(["News", "Shopping"]));
    assert_eq!(entries["AUTO_GROUP"], json!(false));
    assert_eq!(entries["isOn"], json!(false));
}
