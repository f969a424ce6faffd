use chrono::Utc;

use blewatch_core::Advertisement;
use blewatch_registry::{reconcile, DiscoveryStore, JsonStore, MemoryStore};

fn adv(mac: &str, rssi: &str) -> Advertisement {
    let row = vec![
        "scanner".to_string(),
        mac.to_string(),
        rssi.to_string(),
        "{}".to_string(),
    ];
    Advertisement::from_row(&row, Utc::now()).unwrap()
}

/// Drive two poll cycles through the store seam the way the daemon does:
/// load, reconcile, save.
#[tokio::test]
async fn test_cycles_through_memory_store() {
    let store = MemoryStore::new();
    let batch = vec![adv("AA:BB:CC:11:22:33", "-65"), adv("DD:EE:FF:44:55:66", "-80")];

    let registry = store.load().await.unwrap();
    assert!(registry.is_empty());

    let first = reconcile(&batch, registry, Utc::now());
    assert_eq!(first.newly_added.len(), 2);
    store.save(&first.registry).await.unwrap();

    let registry = store.load().await.unwrap();
    assert_eq!(registry.len(), 2);

    let second = reconcile(&batch, registry, Utc::now());
    assert!(second.newly_added.is_empty());
    store.save(&second.registry).await.unwrap();
    assert_eq!(store.load().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_json_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path().join("bluetooth_discoveries.json"));

    let outcome = reconcile(&[adv("AA:BB:CC:11:22:33", "-65")], Vec::new(), Utc::now());
    store.save(&outcome.registry).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded, outcome.registry);
}

#[tokio::test]
async fn test_json_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path().join("does_not_exist.json"));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_store_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path().join("nested/deeper/registry.json"));
    store.save(&[]).await.unwrap();
    assert!(store.path().exists());
}

#[tokio::test]
async fn test_json_store_corrupt_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bluetooth_discoveries.json");
    tokio::fs::write(&path, b"not json").await.unwrap();

    let store = JsonStore::new(&path);
    assert!(store.load().await.is_err());
}

/// The on-disk format is the original add-on's registry file: an array
/// of objects keyed by these exact field names.
#[tokio::test]
async fn test_json_store_wire_format() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path().join("bluetooth_discoveries.json"));

    let outcome = reconcile(&[adv("AA:BB:CC:11:22:33", "-65")], Vec::new(), Utc::now());
    store.save(&outcome.registry).await.unwrap();

    let raw = tokio::fs::read(store.path()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let entry = &value.as_array().unwrap()[0];

    for field in [
        "id",
        "mac_address",
        "rssi",
        "manufacturer",
        "device_type",
        "adv_data",
        "last_seen",
        "discovered_at",
        "name",
    ] {
        assert!(entry.get(field).is_some(), "missing field {}", field);
    }
}
