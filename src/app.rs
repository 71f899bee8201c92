#![cfg(feature = "web")]

use axum::{
    Form, Json, Router,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use handlebars::{Handlebars, RenderError, TemplateError};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{self, JoinError};
use tower_http::services::ServeDir;

use crate::config::ServeConfig;
use crate::note::{Note, NoteDraft, parse_note_id};
use crate::secure::{self, SecureError};
use crate::store::{NoteStore, StoreError};

pub struct AppState {
    store: Mutex<NoteStore>,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(store: NoteStore) -> Result<Self, TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string("index", include_str!("./static/index.html"))?;
        templates.register_template_string("editor", include_str!("./static/editor.html"))?;
        Ok(Self {
            store: Mutex::new(store),
            templates,
        })
    }

    // The store keeps no state in memory, so a poisoned lock is still usable.
    fn store(&self) -> MutexGuard<'_, NoteStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<Html<String>, AppError> {
        Ok(Html(self.templates.render(name, data)?))
    }
}

/// Failures a handler reports to the browser
///
/// An oversized note is the user's to fix and answers `413`; everything else
/// is a `500 Internal Server Error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Secure(#[from] SecureError),

    #[error("template rendering failed: {0}")]
    Template(#[from] RenderError),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store(StoreError::TooLong { .. }) = &self {
            warn!("rejected note: {}", self);
            let message = format!(
                "Note is too long to save: {}. Go back to shorten it.",
                self
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, message).into_response();
        }

        error!("request failed: {}", self);
        let message = match self {
            AppError::Store(_) => "Could not access the notes database",
            AppError::Secure(_) | AppError::Task(_) => "Could not encrypt the note",
            AppError::Template(_) => "Could not render the page",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct ExportRequest {
    #[serde(default)]
    password: String,
}

/// Build the application router around an already opened store.
pub fn router(state: Arc<AppState>, static_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/new", get(new_note))
        .route("/note/:id", get(view_note))
        .route("/save", post(save))
        .route("/delete/:id", post(delete))
        .route("/search", get(search))
        .route("/export/:id", post(export))
        .nest_service("/static", ServeDir::new(static_dir.into()))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = NoteStore::open(&config.database)?;
    info!("using notes workbook {}", store.path().display());

    let state = Arc::new(AppState::new(store)?);
    let app = router(state, &config.static_dir);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    if addr.ip().is_unspecified() {
        match local_ip_address::local_ip() {
            Ok(ip) => info!("On your network: http://{}:{}", ip, addr.port()),
            Err(e) => warn!("could not determine local network address: {}", e),
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

fn note_view(note: &Note) -> serde_json::Value {
    json!({
        "id": note.id,
        "title": note.title,
        "content": note.content,
        "date_created": note.date_created,
        "last_modified": note.last_modified,
    })
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let notes = state.store().load_notes()?;
    let notes: Vec<_> = notes.iter().map(note_view).collect();
    state.render("index", &json!({ "notes": notes }))
}

async fn new_note(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    state.render("editor", &json!({ "note": null }))
}

async fn view_note(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let Some(id) = parse_note_id(&id) else {
        return Ok(Redirect::to("/").into_response());
    };
    let note = state.store().find_note(id)?;
    match note {
        Some(note) => Ok(state
            .render("editor", &json!({ "note": note_view(&note) }))?
            .into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

async fn save(
    State(state): State<Arc<AppState>>,
    Form(draft): Form<NoteDraft>,
) -> Result<Redirect, AppError> {
    let id = state.store().save_note(&draft.normalized())?;
    Ok(Redirect::to(&format!("/note/{}", id)))
}

async fn delete(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    if let Some(id) = parse_note_id(&id) {
        state.store().delete_note(id)?;
    }
    Ok(Redirect::to("/"))
}

async fn search(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.store().search(&params.q)?))
}

async fn export(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Form(request): Form<ExportRequest>,
) -> Result<Response, AppError> {
    if request.password.is_empty() {
        return Ok(Redirect::to(&format!("/note/{}", urlencoding::encode(&id))).into_response());
    }
    let Some(note_id) = parse_note_id(&id) else {
        return Ok(Redirect::to("/").into_response());
    };
    let Some(note) = state.store().find_note(note_id)? else {
        return Ok(Redirect::to("/").into_response());
    };

    let filename = secure::export_filename(&note);
    // 390k PBKDF2 rounds; run on the blocking pool.
    let payload =
        task::spawn_blocking(move || secure::encrypt_note(&note, &request.password)).await??;
    info!("exported note {} as {}", note_id, filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        payload,
    )
        .into_response())
}
