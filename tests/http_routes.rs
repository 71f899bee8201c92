#![cfg(feature = "web")]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use retro_notes::app::{AppState, router};
use retro_notes::note::NoteSummary;
use retro_notes::secure::decrypt_export;
use retro_notes::store::{MAX_CELL_CHARS, NoteStore};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

fn app() -> (Router, TempDir) {
    let dir = tempdir().unwrap();
    let store = NoteStore::open(dir.path().join("notes.xlsx")).unwrap();
    let state = Arc::new(AppState::new(store).unwrap());
    (router(state, dir.path().join("static")), dir)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_form(app: &Router, uri: &str, form: &str) -> Response {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, request).await
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn save_then_view_and_search() {
    let (app, _dir) = app();

    let saved = post_form(&app, "/save", "title=++Shopping+list++&content=milk%0Aeggs").await;
    assert_eq!(saved.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&saved), "/note/1");

    let page = get(&app, "/note/1").await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(page).await).unwrap();
    assert!(html.contains("value=\"Shopping list\""));
    assert!(html.contains("id=\"export-form\""));

    let found = get(&app, "/search?q=MILK").await;
    assert_eq!(found.status(), StatusCode::OK);
    let notes: Vec<NoteSummary> = serde_json::from_slice(&body_bytes(found).await).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, "1");
    assert_eq!(notes[0].title, "Shopping list");

    let missing = get(&app, "/search?q=bread").await;
    assert_eq!(body_bytes(missing).await, b"[]");
}

#[tokio::test]
async fn blank_title_becomes_untitled_and_updates_keep_id() {
    let (app, _dir) = app();

    post_form(&app, "/save", "title=+&content=x").await;
    let updated = post_form(&app, "/save", "note_id=1&title=Renamed&content=y").await;
    assert_eq!(location(&updated), "/note/1");

    let all = get(&app, "/search").await;
    let notes: Vec<serde_json::Value> = serde_json::from_slice(&body_bytes(all).await).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Renamed");
    assert_eq!(notes[0]["content"], "y");

    post_form(&app, "/save", "title=&content=").await;
    let all = get(&app, "/search?q=untitled").await;
    let notes: Vec<NoteSummary> = serde_json::from_slice(&body_bytes(all).await).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, "2");
}

#[tokio::test]
async fn index_escapes_note_titles() {
    let (app, _dir) = app();
    post_form(
        &app,
        "/save",
        "title=%3Cscript%3Ealert(1)%3C%2Fscript%3E&content=",
    )
    .await;

    let html = String::from_utf8(body_bytes(get(&app, "/").await).await).unwrap();
    assert!(html.contains("id=\"search-input\""));
    assert!(html.contains("id=\"notes-list\""));
    assert!(html.contains("&lt;script&gt;alert(1)"));
    assert!(!html.contains("<script>alert(1)"));
}

#[tokio::test]
async fn unknown_notes_redirect_home() {
    let (app, _dir) = app();

    post_form(&app, "/save", "title=one&content=").await;
    for uri in ["/note/7", "/note/not-a-number", "/note/01", "/note/+1"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    for uri in ["/export/7", "/export/01"] {
        let export = post_form(&app, uri, "password=pw").await;
        assert_eq!(export.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&export), "/");
    }
}

#[tokio::test]
async fn non_canonical_ids_do_not_delete_or_update() {
    let (app, _dir) = app();
    post_form(&app, "/save", "title=keep&content=").await;

    post_form(&app, "/delete/01", "").await;
    let saved = post_form(&app, "/save", "note_id=01&title=copy&content=").await;
    assert_eq!(location(&saved), "/note/2");

    let notes: Vec<NoteSummary> =
        serde_json::from_slice(&body_bytes(get(&app, "/search").await).await).unwrap();
    let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["keep", "copy"]);
}

#[tokio::test]
async fn crlf_content_is_stable_across_saves() {
    let (app, _dir) = app();

    post_form(&app, "/save", "title=List&content=milk%0D%0Aeggs").await;
    post_form(&app, "/save", "note_id=1&title=List&content=milk%0D%0Aeggs").await;

    let notes: Vec<serde_json::Value> =
        serde_json::from_slice(&body_bytes(get(&app, "/search").await).await).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["content"], "milk\neggs");

    let html = String::from_utf8(body_bytes(get(&app, "/note/1").await).await).unwrap();
    assert!(!html.contains("_x000D_"));
}

#[tokio::test]
async fn oversized_note_is_reported_to_the_user() {
    let (app, _dir) = app();
    post_form(&app, "/save", "title=kept&content=").await;

    let form = format!("title=big&content={}", "x".repeat(MAX_CELL_CHARS + 1));
    let response = post_form(&app, "/save", &form).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let message = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(message.starts_with("Note is too long to save"));
    assert!(message.contains(&MAX_CELL_CHARS.to_string()));

    let notes: Vec<NoteSummary> =
        serde_json::from_slice(&body_bytes(get(&app, "/search").await).await).unwrap();
    assert_eq!(notes.len(), 1);
}

#[tokio::test]
async fn delete_removes_the_note() {
    let (app, _dir) = app();
    post_form(&app, "/save", "title=a&content=").await;
    post_form(&app, "/save", "title=b&content=").await;

    let deleted = post_form(&app, "/delete/1", "").await;
    assert_eq!(location(&deleted), "/");

    let notes: Vec<NoteSummary> =
        serde_json::from_slice(&body_bytes(get(&app, "/search?q=").await).await).unwrap();
    let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn export_requires_a_password() {
    let (app, _dir) = app();
    post_form(&app, "/save", "title=Secret&content=hidden").await;

    let response = post_form(&app, "/export/1", "password=").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/note/1");
}

#[tokio::test]
async fn export_downloads_an_encrypted_note() {
    let (app, _dir) = app();
    post_form(&app, "/save", "title=My+secret%3A+plans&content=world+domination").await;

    let response = post_form(&app, "/export/1", "password=s3cret").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"note_My_secret_plans.secure\""
    );

    let payload = body_bytes(response).await;
    let plaintext = decrypt_export(&payload, "s3cret").unwrap();
    assert!(plaintext.starts_with("Title: My secret: plans\n"));
    assert!(plaintext.ends_with("\n\nworld domination"));
}
