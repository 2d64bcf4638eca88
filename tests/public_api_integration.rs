// Integration test for the public API
use std::path::Path;

use tempfile::TempDir;
use vaultrefs::{
    AppConfig, CacheSnapshot, DetectionSettings, MediaItem, MediaKind, ReferenceManager, VERSION,
};

fn write_note(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn catalog() -> Vec<MediaItem> {
    vec![
        MediaItem::new("img-sunset", MediaKind::Image).with_filename("sunset.jpg"),
        MediaItem::new("img-sunrise", MediaKind::Image).with_filename("sunrise.jpg"),
        MediaItem::new("vid-beach", MediaKind::Video).with_filename("beach.mov"),
    ]
}

fn manager_over(vault: &TempDir, data: &TempDir, settings: Option<DetectionSettings>) -> ReferenceManager {
    let settings = settings.unwrap_or_else(|| DetectionSettings {
        scan_path: vault.path().to_path_buf(),
        ..Default::default()
    });
    ReferenceManager::new(settings, data.path().join("references-cache.json"))
}

#[test]
fn test_public_api_exports() {
    assert!(!VERSION.is_empty());
    assert!(VERSION.starts_with("0."));

    let config = AppConfig::default();
    assert!(config.detection.enable_detection);
}

#[tokio::test]
async fn test_miss_then_scan_then_hit() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_note(vault.path(), "journal.md", "today's shot: ![[sunset.jpg]]");
    write_note(vault.path(), "clips.md", "and a clip ![[beach.mov]]");

    let manager = manager_over(&vault, &data, None);
    let items = catalog();

    // First query is a miss: defaults now, scan in the background.
    let first = manager.get_status(&items).await;
    assert!(first.values().all(|&referenced| !referenced));

    // The forced path joins any in-flight scan and returns fresh results.
    let forced = manager.force_scan(&items).await;
    assert_eq!(forced["img-sunset"], true);
    assert_eq!(forced["img-sunrise"], false);
    assert_eq!(forced["vid-beach"], true);

    // Unchanged corpus: subsequent queries are cache hits.
    let cached = manager.get_status(&items).await;
    assert_eq!(cached, forced);
}

#[tokio::test]
async fn test_cache_file_shape_on_disk() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_note(vault.path(), "note.md", "![[sunset.jpg]]");

    let manager = manager_over(&vault, &data, None);
    manager.force_scan(&catalog()).await;

    let cache_path = data.path().join("references-cache.json");
    let raw = std::fs::read_to_string(&cache_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert!(json["schemaVersion"].is_string());
    assert!(json["lastScanTimestamp"].is_string());
    assert_eq!(
        json["settingsSnapshot"]["scanPath"],
        vault.path().to_string_lossy().as_ref()
    );
    assert_eq!(json["settingsSnapshot"]["includeSubfolders"], true);
    assert!(json["corpusFingerprint"].is_string());
    assert_eq!(json["references"]["img-sunset"], true);
    assert_eq!(json["references"]["img-sunrise"], false);

    // The blob round-trips through the typed snapshot.
    let snapshot: CacheSnapshot = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot.references.len(), 3);
}

#[tokio::test]
async fn test_external_domain_end_to_end() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_note(
        vault.path(),
        "gallery.md",
        "![my shot](https://cdn.example.com/photos/sunset.jpg)",
    );

    let without = manager_over(&vault, &data, None);
    let status = without.force_scan(&catalog()).await;
    assert_eq!(status["img-sunset"], false);

    let data2 = TempDir::new().unwrap();
    let with_domain = manager_over(
        &vault,
        &data2,
        Some(DetectionSettings {
            scan_path: vault.path().to_path_buf(),
            external_domain: Some("https://cdn.example.com".to_string()),
            ..Default::default()
        }),
    );
    let status = with_domain.force_scan(&catalog()).await;
    assert_eq!(status["img-sunset"], true);
}

#[tokio::test]
async fn test_subfolder_setting_end_to_end() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let nested = vault.path().join("daily");
    std::fs::create_dir(&nested).unwrap();
    write_note(&nested, "deep.md", "![[sunset.jpg]]");

    let flat = manager_over(
        &vault,
        &data,
        Some(DetectionSettings {
            scan_path: vault.path().to_path_buf(),
            include_subfolders: false,
            ..Default::default()
        }),
    );
    assert_eq!(flat.force_scan(&catalog()).await["img-sunset"], false);

    let data2 = TempDir::new().unwrap();
    let recursive = manager_over(&vault, &data2, None);
    assert_eq!(recursive.force_scan(&catalog()).await["img-sunset"], true);
}

#[tokio::test]
async fn test_clear_cache_full_cycle() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_note(vault.path(), "note.md", "![[sunset.jpg]]");

    let manager = manager_over(&vault, &data, None);
    manager.force_scan(&catalog()).await;
    assert_eq!(manager.get_stats().total_entries, 3);

    assert!(manager.clear_cache().await);
    let stats = manager.get_stats();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.referenced_count, 0);
    assert!(stats.last_scan.is_none());
    assert_eq!(stats.approx_size_bytes, 0);
    assert!(!data.path().join("references-cache.json").exists());

    // Guaranteed miss after a clear.
    let status = manager.get_status(&catalog()).await;
    assert!(status.values().all(|&referenced| !referenced));
}

#[tokio::test]
async fn test_settings_update_invalidates_and_rescans() {
    let vault = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_note(
        vault.path(),
        "gallery.md",
        "![shot](https://cdn.example.com/p/sunset.jpg)",
    );

    let manager = manager_over(&vault, &data, None);
    assert_eq!(manager.force_scan(&catalog()).await["img-sunset"], false);

    manager.update_settings(DetectionSettings {
        scan_path: vault.path().to_path_buf(),
        external_domain: Some("https://cdn.example.com".to_string()),
        ..Default::default()
    });

    // The old snapshot no longer matches the live settings.
    let miss = manager.get_status(&catalog()).await;
    assert_eq!(miss["img-sunset"], false);

    // A forced rescan under the new settings finds the external link.
    assert_eq!(manager.force_scan(&catalog()).await["img-sunset"], true);
}

#[tokio::test]
async fn test_unreadable_scan_path_degrades() {
    let data = TempDir::new().unwrap();
    let manager = ReferenceManager::new(
        DetectionSettings {
            scan_path: data.path().join("never-created"),
            ..Default::default()
        },
        data.path().join("references-cache.json"),
    );

    let items = catalog();
    // Neither path panics or errors; both degrade to defaults.
    assert!(manager.get_status(&items).await.values().all(|&r| !r));
    assert!(manager.force_scan(&items).await.values().all(|&r| !r));
    assert_eq!(manager.get_stats().total_entries, 0);
}
