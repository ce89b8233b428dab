use std::sync::Arc;

use extendo_storage::*;
use serde_json::json;

#[tokio::test]
async fn settings_persist_across_file_store_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("extendo-store.json");

    {
        let store = Arc::new(JsonFileStore::open(&path).await.expect("open"));
        let settings = SettingsStore::new(store);
        settings
            .save_translations_api_instance(" https://translations.example/ ")
            .await
            .expect("save api");
        settings
            .save_blackiya_extension_id("blackiya-peer")
            .await
            .expect("save id");
        settings
            .save_conversation_hashes(&[("conv-1".into(), "123".into())])
            .await
            .expect("save hashes");
    }

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
    assert_eq!(raw[TRANSLATIONS_API_INSTANCE_KEY], json!("https://translations.example"));
    assert_eq!(raw[BLACKIYA_SAVED_CONVERSATION_HASHES_KEY], json!([["conv-1", "123"]]));

    let store = Arc::new(JsonFileStore::open(&path).await.expect("reopen"));
    let settings = SettingsStore::new(store);
    assert_eq!(
        settings.translations_api_instance().await.expect("api"),
        "https://translations.example"
    );
    assert_eq!(
        settings.blackiya_extension_id().await.expect("id"),
        "blackiya-peer"
    );
    assert_eq!(
        settings.saved_conversation_hashes().await.expect("hashes"),
        vec![("conv-1".to_string(), "123".to_string())]
    );
}

#[tokio::test]
async fn concurrent_writes_all_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let store = Arc::new(JsonFileStore::open(&path).await.expect("open"));

    let mut handles = Vec::new();
    for index in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .set(&format!("key-{index}"), json!(index))
                .await
                .expect("set");
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    let reopened = JsonFileStore::open(&path).await.expect("reopen");
    for index in 0..16 {
        assert_eq!(
            reopened.get(&format!("key-{index}")).await.expect("get"),
            Some(json!(index))
        );
    }
}
