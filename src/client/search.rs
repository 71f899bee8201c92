use std::cell::{Cell, RefCell};

use thiserror::Error;

use crate::note::NoteSummary;

/// Text of the single placeholder shown when a search matches nothing.
pub const NO_RESULTS_TEXT: &str = "No matching notes";

/// Path of the search endpoint served by the backend.
pub const SEARCH_ENDPOINT: &str = "/search";

/// Ways a search request can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request could not be sent or did not complete
    #[error("search request failed: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("search endpoint returned status {0}")]
    Status(u16),

    /// The body was not a JSON array of note summaries
    #[error("invalid search response: {0}")]
    InvalidResponse(String),
}

/// Something that can run a GET request and hand back the response body.
///
/// Implementations report transport problems as [`ClientError::Network`] and
/// non-2xx answers as [`ClientError::Status`].
#[allow(async_fn_in_trait)]
pub trait SearchBackend {
    async fn fetch(&self, url: &str) -> Result<String, ClientError>;
}

/// The container the results are rendered into.
///
/// Implementations must insert every string as text, never as markup.
pub trait ResultsList {
    /// Replace the content with a single placeholder element.
    fn show_placeholder(&mut self, text: &str);

    /// Replace the content with one clickable element per entry.
    fn show_entries(&mut self, entries: &[ResultEntry]);

    /// Flag a failed search without touching the current content.
    fn show_error(&mut self, message: &str);
}

/// One rendered search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    /// Link to the note's detail view
    pub href: String,
    pub title: String,
    /// `Last modified: <timestamp>`
    pub modified_label: String,
}

impl ResultEntry {
    pub fn from_summary(note: &NoteSummary) -> Self {
        Self {
            href: note_href(&note.id),
            title: note.title.clone(),
            modified_label: format!("Last modified: {}", note.last_modified),
        }
    }
}

/// What happened to one search once its response came back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// `n` entries were rendered
    Rendered(usize),
    /// The no-results placeholder was rendered
    Empty,
    /// A newer search was issued meanwhile; the response was dropped
    Stale,
    /// There is no results list on the page
    Detached,
    /// The request failed; the previous list stays visible
    Failed(ClientError),
}

/// A search that has been issued but not yet completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub ticket: u64,
    pub url: String,
}

/// Builds the request URL for a raw field value.
///
/// The value is trimmed and percent-encoded; an empty query is kept.
pub fn search_url(endpoint: &str, raw: &str) -> String {
    format!("{}?q={}", endpoint, urlencoding::encode(raw.trim()))
}

/// Link target of a note's detail view.
pub fn note_href(id: &str) -> String {
    format!("/note/{}", urlencoding::encode(id))
}

/// Parses a search response body.
pub fn parse_summaries(body: &str) -> Result<Vec<NoteSummary>, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Keeps the results list in sync with the search field.
///
/// Every input event calls [`issue`](Self::issue) synchronously, which hands out
/// the next ticket, then awaits [`complete`](Self::complete). Only the response
/// carrying the most recently issued ticket may touch the list.
pub struct SearchController<L, B> {
    list: RefCell<Option<L>>,
    backend: B,
    endpoint: String,
    latest: Cell<u64>,
}

impl<L: ResultsList, B: SearchBackend> SearchController<L, B> {
    pub fn new(list: Option<L>, backend: B) -> Self {
        Self {
            list: RefCell::new(list),
            backend,
            endpoint: SEARCH_ENDPOINT.to_string(),
            latest: Cell::new(0),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Ticket of the most recently issued search (0 before the first one).
    pub fn latest_ticket(&self) -> u64 {
        self.latest.get()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs `f` against the results list, if there is one.
    pub fn with_list<R>(&self, f: impl FnOnce(&L) -> R) -> Option<R> {
        self.list.borrow().as_ref().map(f)
    }

    /// Registers a new search for the given field value.
    pub fn issue(&self, raw: &str) -> PendingSearch {
        let ticket = self.latest.get() + 1;
        self.latest.set(ticket);
        PendingSearch {
            ticket,
            url: search_url(&self.endpoint, raw),
        }
    }

    /// Sends the request and renders the response unless it went stale.
    pub async fn complete(&self, pending: PendingSearch) -> SearchOutcome {
        let result = match self.backend.fetch(&pending.url).await {
            Ok(body) => parse_summaries(&body),
            Err(err) => Err(err),
        };

        if pending.ticket != self.latest.get() {
            return SearchOutcome::Stale;
        }

        match result {
            Ok(notes) => self.render(&notes),
            Err(err) => {
                if let Some(list) = self.list.borrow_mut().as_mut() {
                    list.show_error(&err.to_string());
                }
                SearchOutcome::Failed(err)
            }
        }
    }

    /// Convenience wrapper for a single, non-overlapping search.
    pub async fn search(&self, raw: &str) -> SearchOutcome {
        let pending = self.issue(raw);
        self.complete(pending).await
    }

    /// Replaces the list content with `notes`.
    pub fn render(&self, notes: &[NoteSummary]) -> SearchOutcome {
        let mut list = self.list.borrow_mut();
        let Some(list) = list.as_mut() else {
            return SearchOutcome::Detached;
        };

        if notes.is_empty() {
            list.show_placeholder(NO_RESULTS_TEXT);
            return SearchOutcome::Empty;
        }

        let entries: Vec<ResultEntry> = notes.iter().map(ResultEntry::from_summary).collect();
        list.show_entries(&entries);
        SearchOutcome::Rendered(entries.len())
    }
}
