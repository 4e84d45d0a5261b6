use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use openfilz_core::OpenfilzClient;
use openfilz_explorer::explorer::{Explorer, Outcome};
use openfilz_explorer::notify::{NoticeLevel, NoticeLog};
use openfilz_explorer::ops::TransferAction;
use openfilz_explorer::prefs::PreferenceStore;
use openfilz_explorer::view::{DEFAULT_PAGE_SIZE, Destination, FolderRef};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn element(id: &str, kind: &str) -> Value {
    json!({ "id": id, "type": kind, "name": format!("{id}-name") })
}

fn root_elements() -> Vec<Value> {
    vec![element("d1", "FOLDER"), element("f1", "FILE"), element("f2", "FILE")]
}

fn listing_response(items: Vec<Value>, total: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": { "listFolder": items, "count": total }
    }))
}

async fn mount_listing(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .respond_with(listing_response(root_elements(), 3))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn conflict() -> ResponseTemplate {
    ResponseTemplate::new(409).set_body_json(json!({
        "status": 409,
        "message": "An item with this name already exists"
    }))
}

struct Harness {
    explorer: Explorer,
    notices: Arc<NoticeLog>,
    _dir: TempDir,
}

fn harness(server: &MockServer) -> Harness {
    let dir = TempDir::new().unwrap();
    let prefs = PreferenceStore::open(dir.path().join("preferences.json")).unwrap();
    let client = OpenfilzClient::with_base_url(&server.uri(), "test-token").unwrap();
    let notices = Arc::new(NoticeLog::default());
    let explorer = Explorer::new(client, prefs, notices.clone(), DEFAULT_PAGE_SIZE);
    Harness {
        explorer,
        notices,
        _dir: dir,
    }
}

#[tokio::test]
async fn single_move_without_conflict_sends_one_request_and_reloads_once() {
    let server = MockServer::start().await;
    // Initial listing plus one reload.
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/move"))
        .and(body_json(json!({
            "documentIds": ["f1"],
            "targetFolderId": "dest",
            "allowDuplicateFileNames": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    assert_eq!(h.explorer.open_root().await, Outcome::Succeeded);
    let item = h.explorer.listing().find("f1").cloned().unwrap();

    let outcome = h
        .explorer
        .move_item(&item, &Destination::Folder("dest".to_string()))
        .await;

    assert_eq!(outcome, Outcome::Succeeded);
    assert_eq!(h.notices.count(NoticeLevel::Success), 1);
    assert_eq!(h.notices.count(NoticeLevel::Failure), 0);
}

#[tokio::test]
async fn conflict_is_retried_once_with_duplicates_allowed() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/copy"))
        .and(body_json(json!({
            "documentIds": ["d1"],
            "allowDuplicateFileNames": false
        })))
        .respond_with(conflict())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/copy"))
        .and(body_json(json!({
            "documentIds": ["d1"],
            "allowDuplicateFileNames": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let item = h.explorer.listing().find("d1").cloned().unwrap();

    let outcome = h.explorer.copy_item(&item, &Destination::Root).await;

    assert_eq!(outcome, Outcome::Succeeded);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].message, "\"d1-name\" copied successfully");
}

#[tokio::test]
async fn second_conflict_reports_failure_without_reload() {
    let server = MockServer::start().await;
    // Only the initial listing: a failed move never reloads.
    mount_listing(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/move"))
        .and(body_json(json!({
            "documentIds": ["f2"],
            "targetFolderId": "dest",
            "allowDuplicateFileNames": false
        })))
        .respond_with(conflict())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/move"))
        .and(body_json(json!({
            "documentIds": ["f2"],
            "targetFolderId": "dest",
            "allowDuplicateFileNames": true
        })))
        .respond_with(conflict())
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let item = h.explorer.listing().find("f2").cloned().unwrap();

    let outcome = h
        .explorer
        .move_item(&item, &Destination::Folder("dest".to_string()))
        .await;

    assert_eq!(outcome, Outcome::Failed);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Failure);
    assert!(notices[0].message.contains("max retries reached"));
}

#[tokio::test]
async fn non_conflict_errors_are_not_retried() {
    let server = MockServer::start().await;
    mount_listing(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/move"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": 403,
            "message": "Forbidden"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let item = h.explorer.listing().find("f1").cloned().unwrap();

    let outcome = h.explorer.move_item(&item, &Destination::Root).await;

    assert_eq!(outcome, Outcome::Failed);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].message,
        "Failed to move files: access denied, check the API token"
    );
}

#[tokio::test]
async fn mixed_selection_sends_one_request_per_kind_and_reloads_once() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/copy"))
        .and(body_json(json!({
            "documentIds": ["d1"],
            "targetFolderId": "dest",
            "allowDuplicateFileNames": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/copy"))
        .and(body_json(json!({
            "documentIds": ["f1", "f2"],
            "targetFolderId": "dest",
            "allowDuplicateFileNames": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "originalId": "f1", "copyId": "f1-copy" },
            { "originalId": "f2", "copyId": "f2-copy" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    h.explorer.select_all(true);

    let outcome = h
        .explorer
        .transfer_selected(TransferAction::Copy, |selected| {
            assert_eq!(selected.len(), 3);
            Some(Destination::Folder("dest".to_string()))
        })
        .await;

    assert_eq!(outcome, Outcome::Succeeded);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "3 items copied successfully");
    assert!(h.explorer.selected_items().is_empty());
}

#[tokio::test]
async fn partial_bulk_failure_reports_failed_kind_and_still_reloads() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/move"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/move"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let items = h.explorer.items().to_vec();

    let outcome = h
        .explorer
        .transfer_items(TransferAction::Move, &items, &Destination::Root)
        .await;

    assert_eq!(outcome, Outcome::PartiallySucceeded);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Failure);
    assert!(notices[0].message.starts_with("Failed to move folders"));
}

#[tokio::test]
async fn empty_selection_makes_no_calls_and_skips_prompt() {
    let server = MockServer::start().await;
    mount_listing(&server, 1).await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let prompted = AtomicBool::new(false);

    let outcome = h
        .explorer
        .transfer_selected(TransferAction::Move, |_| {
            prompted.store(true, Ordering::SeqCst);
            Some(Destination::Root)
        })
        .await;

    assert_eq!(outcome, Outcome::Skipped);
    assert!(!prompted.load(Ordering::SeqCst));
    assert!(h.notices.notices().is_empty());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn cancelled_prompt_makes_no_calls() {
    let server = MockServer::start().await;
    mount_listing(&server, 1).await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let _ = h.explorer.toggle_selection("f1");

    let outcome = h
        .explorer
        .transfer_selected(TransferAction::Copy, |_| None)
        .await;

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn successful_mutation_clears_selection() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders"))
        .and(body_json(json!({ "name": "Reports" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "d2",
            "name": "Reports"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;

    assert_eq!(h.explorer.toggle_selection("f1"), Some(true));
    let selected: Vec<_> = h
        .explorer
        .selected_items()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(selected, vec!["f1".to_string()]);

    h.explorer.select_all(true);
    assert!(h.explorer.items().iter().all(|item| item.selected));

    assert_eq!(h.explorer.create_folder("Reports").await, Outcome::Succeeded);
    assert!(h.explorer.items().iter().all(|item| !item.selected));
    assert_eq!(h.notices.notices()[0].message, "Folder created successfully");
}

#[tokio::test]
async fn delete_selection_hits_both_endpoints() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/folders"))
        .and(body_json(json!({ "documentIds": ["d1"] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/files"))
        .and(body_json(json!({ "documentIds": ["f2"] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let _ = h.explorer.toggle_selection("d1");
    let _ = h.explorer.toggle_selection("f2");

    assert_eq!(h.explorer.delete_selected().await, Outcome::Succeeded);
    let notices = h.notices.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Items deleted successfully");
}

#[tokio::test]
async fn page_size_change_resets_index_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .and(body_string_contains("\"pageSize\":25"))
        .respond_with(listing_response(root_elements(), 200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .respond_with(listing_response(root_elements(), 200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("query listFolder("))
        .and(body_string_contains("\"pageNumber\":2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "listFolder": [element("f9", "FILE")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let prefs_path = dir.path().join("preferences.json");
    let client = OpenfilzClient::with_base_url(&server.uri(), "test-token").unwrap();
    let notices = Arc::new(NoticeLog::default());
    let mut explorer = Explorer::new(
        client.clone(),
        PreferenceStore::open(&prefs_path).unwrap(),
        notices.clone(),
        DEFAULT_PAGE_SIZE,
    );

    let _ = explorer.open_root().await;
    assert_eq!(explorer.pagination().total_pages(), 3);
    assert_eq!(explorer.next_page().await, Outcome::Succeeded);
    assert_eq!(explorer.pagination().page_index(), 1);
    assert_eq!(explorer.items()[0].id, "f9");

    assert_eq!(explorer.set_page_size(25).await, Outcome::Succeeded);
    assert_eq!(explorer.pagination().page_index(), 0);
    assert_eq!(explorer.pagination().page_size(), 25);

    let reopened = PreferenceStore::open(&prefs_path).unwrap();
    assert_eq!(reopened.page_size(DEFAULT_PAGE_SIZE), 25);
    let restarted = Explorer::new(client, reopened, notices, DEFAULT_PAGE_SIZE);
    assert_eq!(restarted.pagination().page_size(), 25);
}

#[tokio::test]
async fn previous_page_steps_back_and_stops_at_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .respond_with(listing_response(root_elements(), 200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("query listFolder("))
        .and(body_string_contains("\"pageNumber\":2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "listFolder": [element("f9", "FILE")] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("query listFolder("))
        .and(body_string_contains("\"pageNumber\":1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "listFolder": root_elements() }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    assert_eq!(h.explorer.previous_page().await, Outcome::Skipped);

    assert_eq!(h.explorer.next_page().await, Outcome::Succeeded);
    assert_eq!(h.explorer.items()[0].id, "f9");

    assert_eq!(h.explorer.previous_page().await, Outcome::Succeeded);
    assert_eq!(h.explorer.pagination().page_index(), 0);
    assert_eq!(h.explorer.items()[0].id, "d1");
    assert_eq!(h.explorer.pagination().total_items(), 200);
}

#[tokio::test]
async fn unsaved_page_size_leaves_paging_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .respond_with(listing_response(root_elements(), 200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("query listFolder("))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "listFolder": [element("f9", "FILE")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("config");
    let prefs = PreferenceStore::open(config_dir.join("preferences.json")).unwrap();
    std::fs::write(&config_dir, "").unwrap();
    let client = OpenfilzClient::with_base_url(&server.uri(), "test-token").unwrap();
    let notices = Arc::new(NoticeLog::default());
    let mut explorer = Explorer::new(client, prefs, notices.clone(), DEFAULT_PAGE_SIZE);

    let _ = explorer.open_root().await;
    assert_eq!(explorer.next_page().await, Outcome::Succeeded);

    assert_eq!(explorer.set_page_size(25).await, Outcome::Failed);
    assert_eq!(explorer.pagination().page_size(), DEFAULT_PAGE_SIZE);
    assert_eq!(explorer.pagination().page_index(), 1);
    assert_eq!(explorer.items()[0].id, "f9");
    assert_eq!(
        notices.notices().last().unwrap().message,
        "Failed to save page size preference"
    );
}

#[tokio::test]
async fn favorite_flag_comes_from_listing_and_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_string_contains("listFolderAndCount"))
        .respond_with(listing_response(
            vec![
                json!({ "id": "f1", "type": "FILE", "name": "a.txt", "favorite": true }),
                json!({ "id": "f2", "type": "FILE", "name": "b.txt", "favorite": false }),
            ],
            2,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/favorites/f2/is-favorite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;

    assert!(h.explorer.listing().find("f1").unwrap().favorite);
    assert!(!h.explorer.listing().find("f2").unwrap().favorite);
    assert!(!h.explorer.is_favorite("f2").await.unwrap());
}

#[tokio::test]
async fn unknown_folder_id_falls_back_to_root() {
    let server = MockServer::start().await;
    mount_listing(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/missing/info"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let outcome = h.explorer.open_folder_by_id("missing").await;

    assert_eq!(outcome, Outcome::Failed);
    assert!(h.explorer.listing().current().is_none());
    assert_eq!(h.explorer.items().len(), 3);
    assert_eq!(
        h.notices.notices()[0].message,
        "Could not load the specified folder."
    );
}

#[tokio::test]
async fn breadcrumbs_follow_navigation() {
    let server = MockServer::start().await;
    mount_listing(&server, 3).await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;
    let folder = FolderRef::from(h.explorer.listing().find("d1").unwrap());

    assert_eq!(h.explorer.open_folder(folder).await, Outcome::Succeeded);
    assert_eq!(h.explorer.listing().current_id(), Some("d1"));
    assert_eq!(h.explorer.listing().breadcrumbs().len(), 1);

    assert_eq!(h.explorer.go_to_breadcrumb(0).await, Outcome::Succeeded);
    assert_eq!(h.explorer.go_to_breadcrumb(5).await, Outcome::Skipped);
    assert_eq!(h.explorer.listing().current_id(), Some("d1"));
}

#[tokio::test]
async fn failed_listing_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Access denied" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    assert_eq!(h.explorer.open_root().await, Outcome::Failed);
    assert_eq!(h.notices.count(NoticeLevel::Failure), 1);
    assert_eq!(
        h.notices.notices()[0].message,
        "Failed to load folder contents"
    );
}

#[tokio::test]
async fn restore_reloads_and_metadata_search_returns_ids() {
    let server = MockServer::start().await;
    mount_listing(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recycle-bin/restore"))
        .and(body_json(json!({ "documentIds": ["gone"] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/documents/search/ids-by-metadata"))
        .and(body_json(json!({ "metadataCriteria": { "owner": "alice" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["f1", "f2"])))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server);
    let _ = h.explorer.open_root().await;

    assert_eq!(
        h.explorer.restore(&["gone".to_string()]).await,
        Outcome::Succeeded
    );
    assert_eq!(h.explorer.restore(&[]).await, Outcome::Skipped);

    let mut criteria = serde_json::Map::new();
    criteria.insert("owner".to_string(), json!("alice"));
    let request = openfilz_core::SearchByMetadataRequest {
        metadata_criteria: Some(criteria),
        ..Default::default()
    };
    let ids = h.explorer.search_ids_by_metadata(&request).await.unwrap();
    assert_eq!(ids, vec!["f1".to_string(), "f2".to_string()]);
}
