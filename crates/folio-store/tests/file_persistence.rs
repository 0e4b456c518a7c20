//! Durable persistence against a real directory.

use std::sync::Arc;

use folio_store::{
    ContentSession, DurablePersistence, FileSlotStore, FixedClock, FolioConfig, StorageError,
    SystemClock, DEFAULT_SLOT_KEY,
};
use folio_test_utils::{fixed_instant, sample_tree, text_at};
use pretty_assertions::assert_eq;

fn persistence(dir: &std::path::Path) -> DurablePersistence {
    DurablePersistence::new(
        Arc::new(FileSlotStore::new(dir)),
        Arc::new(FixedClock(fixed_instant())),
    )
}

#[tokio::test]
async fn saved_tree_survives_a_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    persistence(dir.path()).save(&sample_tree()).await.unwrap();

    let loaded = persistence(dir.path()).load().await.unwrap().unwrap();

    assert_eq!(loaded.tree, sample_tree());
    assert_eq!(loaded.saved_at, fixed_instant());
}

#[tokio::test]
async fn slot_file_is_plain_json() {
    let dir = tempfile::tempdir().unwrap();
    persistence(dir.path()).save(&sample_tree()).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join(format!("{DEFAULT_SLOT_KEY}.json"))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["timestamp"], "2024-03-05T07:08:09.000Z");
    assert_eq!(value["content"]["hero"]["title"]["first"], "A");
}

#[tokio::test]
async fn hand_edited_garbage_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(format!("{DEFAULT_SLOT_KEY}.json")), "{\"content\": 5").unwrap();

    let err = persistence(dir.path()).load().await.unwrap_err();

    assert!(matches!(err, StorageError::Corrupt { key, .. } if key == DEFAULT_SLOT_KEY));
}

#[tokio::test]
async fn session_from_config_persists_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = FolioConfig::default()
        .with_storage_dir(dir.path().join("state"))
        .with_slot_key("drafts");

    {
        let session = ContentSession::from_config(&config, Arc::new(SystemClock)).unwrap();
        assert!(!session.open().await);
        session.store().update("hero.title.first", "Persisted").unwrap();
        session.save_local().await.unwrap();
    }

    let session = ContentSession::from_config(&config, Arc::new(SystemClock)).unwrap();
    assert!(session.open().await);
    assert_eq!(
        text_at(&session.store().current(), "hero.title.first").as_deref(),
        Some("Persisted")
    );
    assert!(dir.path().join("state/drafts.json").exists());
}
