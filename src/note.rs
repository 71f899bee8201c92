use serde::{Deserialize, Deserializer, Serialize};

/// A note as stored in the workbook
///
/// Timestamps are kept as display text (`YYYY-MM-DD HH:MM:SS`, local time)
/// exactly as they are written to the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Row identifier, unique within the workbook
    pub id: u64,

    /// Note title (never blank once saved through the web form)
    pub title: String,

    /// Free-form note body
    pub content: String,

    /// Creation timestamp
    pub date_created: String,

    /// Timestamp of the last save
    pub last_modified: String,
}

impl Note {
    /// Returns the summary the search endpoint exposes to the browser.
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id.to_string(),
            title: self.title.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

/// Form payload for creating or updating a note
///
/// A missing or unknown `note_id` creates a new note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub note_id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            note_id: None,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn for_note(mut self, id: u64) -> Self {
        self.note_id = Some(id.to_string());
        self
    }

    /// Parsed target id, if the draft names one in canonical form.
    pub fn target_id(&self) -> Option<u64> {
        self.note_id.as_deref().and_then(parse_note_id)
    }

    /// Applies the form rules: trimmed title defaulting to `Untitled`, trimmed
    /// content. Line endings become `\n`, the form a browser would send back.
    pub fn normalized(self) -> Self {
        let title = match self.title.trim() {
            "" => "Untitled".to_string(),
            title => unify_line_endings(title),
        };
        let content = unify_line_endings(self.content.trim());
        Self {
            note_id: self.note_id,
            title,
            content,
        }
    }
}

/// Parse an id in the exact form the server prints it: decimal digits, no sign,
/// no leading zero. `"01"`, `"+1"` and `" 1"` are not ids.
pub fn parse_note_id(text: &str) -> Option<u64> {
    let canonical = text.bytes().all(|b| b.is_ascii_digit()) && !text.starts_with('0');
    if !canonical {
        return None;
    }
    text.parse().ok()
}

fn unify_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// The part of a note the search results list needs
///
/// The identifier is opaque to the client. The search endpoint may send it as a
/// JSON number or a string, both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,

    pub title: String,

    pub last_modified: String,
}

fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
