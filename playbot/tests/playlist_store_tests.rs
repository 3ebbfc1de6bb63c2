//! Playlist persistence against a temporary directory

mod helpers;

use helpers::{resolved, unresolved};
use playbot::error::Error;
use playbot::playlist::PlaylistStore;
use playbot::SharedState;
use playbot_common::PlaybotEvent;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn open(dir: &Path) -> PlaylistStore {
    PlaylistStore::load(dir, Arc::new(SharedState::new()))
        .await
        .unwrap()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_load_creates_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("nested").join("playlists");

    let store = open(&dir).await;
    assert!(dir.is_dir());
    assert!(store.list().await.is_empty());
}

#[tokio::test]
async fn test_create_is_memory_only_until_tracks_added() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;

    assert_eq!(store.create("  party ").await.unwrap(), "party");
    assert_eq!(store.list().await, vec!["party"]);
    assert!(!tmp.path().join("party.json").exists());

    assert!(matches!(
        store.create("party").await,
        Err(Error::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_add_tracks_persists_without_locators() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;
    store.create("party").await.unwrap();

    let added = store
        .add_tracks("party", &[resolved("a"), resolved("b")])
        .await
        .unwrap();
    assert_eq!(added, 2);

    let json = read_json(&tmp.path().join("party.json"));
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["webpage_url"], "a");
    assert_eq!(items[0]["title"], "Title of a");
    assert_eq!(items[0]["requester"], "tester");
    assert!(items[0].get("stream_locator").is_none());
    assert!(items[0].get("stream_url").is_none());

    // No temp file left behind
    assert!(!tmp.path().join("party.json.tmp").exists());
}

#[tokio::test]
async fn test_add_tracks_dedups_across_calls() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;
    store.create("party").await.unwrap();

    assert_eq!(
        store
            .add_tracks("party", &[unresolved("a"), unresolved("b")])
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        store
            .add_tracks("party", &[unresolved("b"), unresolved("c"), unresolved("c")])
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store.add_tracks("party", &[unresolved("a")]).await.unwrap(),
        0
    );

    let refs: Vec<String> = store
        .show("party")
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.canonical_reference)
        .collect();
    assert_eq!(refs, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_add_tracks_to_unknown_playlist() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;

    assert!(matches!(
        store.add_tracks("missing", &[unresolved("a")]).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_round_trip_through_reload() {
    let tmp = TempDir::new().unwrap();
    {
        let store = open(tmp.path()).await;
        store.create("b-list").await.unwrap();
        store.create("a-list").await.unwrap();
        store
            .add_tracks("a-list", &[resolved("x"), resolved("y")])
            .await
            .unwrap();
        store.add_tracks("b-list", &[resolved("z")]).await.unwrap();
    }

    let store = open(tmp.path()).await;
    assert_eq!(store.list().await, vec!["a-list", "b-list"]);

    let tracks = store.show("a-list").await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[1].canonical_reference, "y");
    assert!(tracks.iter().all(|t| t.stream_locator.is_none()));
}

#[tokio::test]
async fn test_load_reads_legacy_files_and_skips_bad_ones() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("legacy.json"),
        r#"[
            {"title": "One", "webpage_url": "https://x/1", "stream_url": "", "requester": "bob"},
            {"title": "One again", "webpage_url": "https://x/1", "stream_url": "", "requester": "eve"},
            {"title": "Two", "webpage_url": "https://x/2", "stream_url": "", "requester": "bob"}
        ]"#,
    )
    .unwrap();
    std::fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

    let store = open(tmp.path()).await;
    assert_eq!(store.list().await, vec!["legacy"]);

    let tracks = store.show("legacy").await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].title, "One");
    assert_eq!(tracks[0].requester, "bob");
}

#[tokio::test]
async fn test_remove_track_bounds_checked() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;
    store.create("party").await.unwrap();
    store
        .add_tracks("party", &[unresolved("a"), unresolved("b")])
        .await
        .unwrap();
    let path = tmp.path().join("party.json");
    let before = std::fs::read_to_string(&path).unwrap();

    for position in [0, 3] {
        assert!(matches!(
            store.remove_track("party", position).await,
            Err(Error::Validation(_))
        ));
    }
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert_eq!(store.show("party").await.unwrap().len(), 2);

    let removed = store.remove_track("party", 1).await.unwrap();
    assert_eq!(removed.canonical_reference, "a");
    assert_eq!(read_json(&path).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_removing_last_track_removes_file_but_keeps_name() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;
    store.create("party").await.unwrap();
    store.add_tracks("party", &[unresolved("a")]).await.unwrap();
    let path = tmp.path().join("party.json");
    assert!(path.exists());

    store.remove_track("party", 1).await.unwrap();
    assert!(!path.exists());
    assert_eq!(store.list().await, vec!["party"]);
    assert!(store.show("party").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_file() {
    let tmp = TempDir::new().unwrap();
    let shared = Arc::new(SharedState::new());
    let store = PlaylistStore::load(tmp.path(), Arc::clone(&shared))
        .await
        .unwrap();
    store.create("party").await.unwrap();
    store.add_tracks("party", &[unresolved("a")]).await.unwrap();

    let mut events = shared.subscribe_events();
    store.delete("party").await.unwrap();

    assert!(!tmp.path().join("party.json").exists());
    assert!(store.list().await.is_empty());
    assert!(matches!(store.show("party").await, Err(Error::NotFound(_))));
    assert!(matches!(store.delete("party").await, Err(Error::NotFound(_))));

    match events.try_recv().unwrap() {
        PlaybotEvent::PlaylistChanged { name, length, .. } => {
            assert_eq!(name, "party");
            assert_eq!(length, None);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;

    for name in ["", "../escape", ".hidden", "a/b"] {
        assert!(matches!(store.create(name).await, Err(Error::Validation(_))));
    }
    assert!(store.list().await.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_write_leaves_memory_unchanged() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let store = open(tmp.path()).await;
    store.create("party").await.unwrap();
    store.add_tracks("party", &[unresolved("a")]).await.unwrap();

    std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
    // Root ignores directory permissions; nothing to check then
    let probe = tmp.path().join("probe");
    let writable = std::fs::write(&probe, b"").is_ok();
    let _ = std::fs::remove_file(&probe);

    let result = store.add_tracks("party", &[unresolved("b")]).await;
    std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

    if writable {
        return;
    }
    assert!(matches!(result, Err(Error::Storage(_))));
    assert_eq!(store.show("party").await.unwrap().len(), 1);
}
