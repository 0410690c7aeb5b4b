//! Sync against a mocked Plex server

use kodi2plex::config::{Config, SyncMode};
use kodi2plex::plex::PlexClient;
use kodi2plex::reconcile::Action;
use kodi2plex::run_sync;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn container(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "MediaContainer": body }))
}

fn shows(items: &[(&str, &str)]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|(key, title)| json!({ "ratingKey": key, "title": title, "type": "show" }))
            .collect(),
    )
}

fn write_playlist(dir: &Path, titles: &[&str]) -> std::path::PathBuf {
    let values: String = titles
        .iter()
        .map(|t| format!("<value>{}</value>", t.replace('&', "&amp;")))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<smartplaylist type="tvshows">
    <name>Comfort</name>
    <rule field="title" operator="is">{}</rule>
</smartplaylist>"#,
        values
    );
    let path = dir.join("comfort.xsp");
    fs::write(&path, xml).unwrap();
    path
}

fn config(server: &MockServer, titles: &[&str], modes: Vec<SyncMode>) -> (Config, TempDir) {
    let dir = tempdir().unwrap();
    let playlist_path = write_playlist(dir.path(), titles);
    let config = Config {
        plex_url: server.uri(),
        plex_token: TOKEN.to_string(),
        library_names: vec!["TV Shows".to_string()],
        playlist_path,
        sync_modes: modes,
        collection_name: None,
        log_file: None,
        fuzzy_threshold: 80,
        dry_run: false,
    };
    (config, dir)
}

async fn mount_library(server: &MockServer, library: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/library/sections"))
        .and(header("X-Plex-Token", TOKEN))
        .respond_with(container(json!({
            "Directory": [
                { "key": "1", "title": "TV Shows", "type": "show" },
                { "key": "2", "title": "Movies", "type": "movie" }
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/library/sections/1/all"))
        .and(query_param("type", "2"))
        .respond_with(container(json!({ "Metadata": shows(library) })))
        .mount(server)
        .await;
}

async fn mount_collection(server: &MockServer, members: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/library/sections/1/collections"))
        .respond_with(container(json!({
            "Metadata": [
                { "ratingKey": "900", "title": "Comfort" },
                { "ratingKey": "901", "title": "Comfort Food" }
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/library/collections/900/children"))
        .respond_with(container(json!({ "Metadata": shows(members) })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_adds_matched_and_reports_not_found() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("2", "Workin' Moms")]).await;
    Mock::given(method("GET"))
        .and(path("/library/sections/1/collections"))
        .respond_with(container(json!({ "size": 0 })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/library/sections/1/all"))
        .and(query_param("id", "1"))
        .and(query_param("collection[0].tag.tag", "Comfort"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (config, _dir) = config(&server, &["The Wire", "Kin"], vec![SyncMode::Collection]);
    let report = run_sync(&config).await.unwrap();

    assert_eq!(report.target, "Comfort");
    assert_eq!(report.total_titles, 2);
    assert_eq!(report.library_size, 2);
    assert_eq!(report.matched, 1);
    assert_eq!(report.not_found.len(), 1);
    assert_eq!(report.not_found[0].title, "Kin");
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].added, vec!["The Wire"]);
    assert!(report.targets[0].removed.is_empty());
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_collection_in_sync_removes_only_stale() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("3", "Lost")]).await;
    mount_collection(&server, &[("1", "The Wire"), ("3", "Lost")]).await;
    Mock::given(method("PUT"))
        .and(path("/library/sections/1/all"))
        .and(query_param("id", "3"))
        .and(query_param("collection[].tag.tag-", "Comfort"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (config, _dir) = config(&server, &["The Wire"], vec![SyncMode::Collection]);
    let report = run_sync(&config).await.unwrap();

    let target = &report.targets[0];
    assert!(target.added.is_empty());
    assert_eq!(target.removed, vec!["Lost"]);
    assert_eq!(target.already_synced, vec!["The Wire"]);
}

#[tokio::test]
async fn test_dry_run_sends_no_mutations() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("3", "Lost")]).await;
    mount_collection(&server, &[("3", "Lost")]).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (mut config, _dir) = config(&server, &["The Wire"], vec![SyncMode::Collection]);
    config.dry_run = true;
    let report = run_sync(&config).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.targets[0].added, vec!["The Wire"]);
    assert_eq!(report.targets[0].removed, vec!["Lost"]);
}

#[tokio::test]
async fn test_failed_mutation_aborts_pass() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("2", "Lost"), ("3", "Fargo")]).await;
    mount_collection(&server, &[]).await;
    Mock::given(method("PUT"))
        .and(path("/library/sections/1/all"))
        .and(query_param("id", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/library/sections/1/all"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/library/sections/1/all"))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Titles are matched in sorted order: Fargo, Lost, The Wire
    let (config, _dir) = config(
        &server,
        &["The Wire", "Lost", "Fargo"],
        vec![SyncMode::Collection],
    );
    let report = run_sync(&config).await.unwrap();
    assert!(report.has_failures());

    let target = &report.targets[0];
    assert_eq!(target.added, vec!["Fargo"]);
    let failed = target.failed.as_ref().unwrap();
    assert_eq!(failed.action, Action::Add);
    assert_eq!(failed.item.title, "Lost");
    assert!(failed.error.contains("500"));
    assert_eq!(target.skipped.len(), 1);
    assert_eq!(target.skipped[0].item.title, "The Wire");
}

#[tokio::test]
async fn test_playlist_created_on_first_add() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("2", "Fargo")]).await;
    Mock::given(method("GET"))
        .and(path("/playlists"))
        .and(query_param("playlistType", "video"))
        .respond_with(container(json!({ "size": 0 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identity"))
        .respond_with(container(json!({ "machineIdentifier": "abc123" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/playlists"))
        .and(query_param("title", "Comfort"))
        .and(query_param(
            "uri",
            "server://abc123/com.plexapp.plugins.library/library/metadata/2",
        ))
        .respond_with(container(json!({
            "Metadata": [{ "ratingKey": "500", "title": "Comfort", "type": "playlist" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/playlists/500/items"))
        .and(query_param(
            "uri",
            "server://abc123/com.plexapp.plugins.library/library/metadata/1",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (config, _dir) = config(&server, &["The Wire", "Fargo"], vec![SyncMode::Playlist]);
    let report = run_sync(&config).await.unwrap();

    let target = &report.targets[0];
    assert_eq!(target.mode, SyncMode::Playlist);
    assert_eq!(target.added, vec!["Fargo", "The Wire"]);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_playlist_episodes_fold_to_shows() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire"), ("3", "Lost")]).await;
    Mock::given(method("GET"))
        .and(path("/playlists"))
        .respond_with(container(json!({
            "Metadata": [{ "ratingKey": "500", "title": "Comfort", "type": "playlist" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlists/500/items"))
        .respond_with(container(json!({
            "Metadata": [
                { "ratingKey": "11", "title": "Pilot", "type": "episode", "playlistItemID": 71,
                  "grandparentRatingKey": "1", "grandparentTitle": "The Wire" },
                { "ratingKey": "31", "title": "Pilot (1)", "type": "episode", "playlistItemID": 72,
                  "grandparentRatingKey": "3", "grandparentTitle": "Lost" },
                { "ratingKey": "32", "title": "Pilot (2)", "type": "episode", "playlistItemID": 73,
                  "grandparentRatingKey": "3", "grandparentTitle": "Lost" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/playlists/500/items/72"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/playlists/500/items/73"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (config, _dir) = config(&server, &["The Wire"], vec![SyncMode::Playlist]);
    let report = run_sync(&config).await.unwrap();

    let target = &report.targets[0];
    assert_eq!(target.already_synced, vec!["The Wire"]);
    assert_eq!(target.removed, vec!["Lost"]);
    assert!(target.added.is_empty());
}

#[tokio::test]
async fn test_both_modes_run_independently() {
    let server = MockServer::start().await;
    mount_library(&server, &[("1", "The Wire")]).await;
    mount_collection(&server, &[("1", "The Wire")]).await;
    Mock::given(method("GET"))
        .and(path("/playlists"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (config, _dir) = config(
        &server,
        &["The Wire"],
        vec![SyncMode::Playlist, SyncMode::Collection],
    );
    let report = run_sync(&config).await.unwrap();

    assert_eq!(report.targets.len(), 2);
    assert!(report.targets[0].error.as_deref().unwrap().contains("503"));
    assert!(report.targets[1].is_ok());
    assert_eq!(report.targets[1].already_synced, vec!["The Wire"]);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_unknown_library_is_an_error() {
    let server = MockServer::start().await;
    mount_library(&server, &[]).await;

    let (mut config, _dir) = config(&server, &["The Wire"], vec![SyncMode::Collection]);
    config.library_names = vec!["Anime".to_string()];
    let err = run_sync(&config).await.unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("Library 'Anime' not found"));
    assert!(message.contains("TV Shows, Movies"));
}

#[tokio::test]
async fn test_client_sends_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity"))
        .and(header("X-Plex-Token", TOKEN))
        .and(header("Accept", "application/json"))
        .respond_with(container(json!({ "machineIdentifier": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PlexClient::new(&server.uri(), TOKEN).unwrap();
    assert_eq!(client.machine_identifier().await.unwrap(), "abc123");
}

#[tokio::test]
async fn test_client_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/sections"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = PlexClient::new(&server.uri(), "wrong").unwrap();
    let err = client.sections().await.unwrap_err();
    assert!(err.to_string().contains("401"));
}
