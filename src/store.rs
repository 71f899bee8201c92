#![cfg(feature = "web")]

use std::fs::create_dir_all;
use std::io::Write;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::Local;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::{Captures, Regex};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use thiserror::Error;

use crate::note::{Note, NoteDraft};

/// Name of the worksheet holding the notes
pub const SHEET_NAME: &str = "Notes";

/// Header row of the notes worksheet
pub const HEADERS: [&str; 5] = ["ID", "Title", "Content", "DateCreated", "LastModified"];

/// Format of every timestamp written to the workbook
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest text Excel accepts in one cell, in characters
pub const MAX_CELL_CHARS: usize = 32_767;

/// Largest id that survives the round trip through a spreadsheet number (2^53)
pub const MAX_NOTE_ID: u64 = 1 << 53;

lazy_static! {
    // OOXML escapes characters XML cannot carry as `_xHHHH_`; a literal `_x`
    // sequence is written with its underscore escaped as `_x005F_`.
    static ref OOXML_ESCAPE: Regex = Regex::new(r"_x([0-9A-Fa-f]{4})_").unwrap();
}

/// Errors raised while reading or writing the workbook
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read workbook {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to write workbook: {0}")]
    Write(#[from] XlsxError),

    #[error("note {field} is {chars} characters long; the limit is {MAX_CELL_CHARS}")]
    TooLong { field: &'static str, chars: usize },

    #[error("no note ids left below {MAX_NOTE_ID}")]
    IdsExhausted,
}

/// Note repository backed by a single `.xlsx` file
///
/// Every operation re-reads the workbook, so edits made to the file while the
/// server runs are picked up. Writes replace the whole file atomically.
#[derive(Debug, Clone)]
pub struct NoteStore {
    path: PathBuf,
}

/// Current local time in the workbook's timestamp format.
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl NoteStore {
    /// Bind a store to `path`, creating the workbook if needed.
    ///
    /// # Examples
    /// ```no_run
    /// use retro_notes::store::NoteStore;
    ///
    /// let store = NoteStore::open("notes_database.xlsx").unwrap();
    /// println!("{} notes", store.load_notes().unwrap().len());
    /// ```
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        store.ensure_database()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the workbook with only the header row if it does not exist.
    pub fn ensure_database(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        info!("creating notes workbook at {}", self.path.display());
        self.write_notes(&[])
    }

    /// Load all notes in sheet order.
    pub fn load_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.ensure_database()?;

        let read_error = |message: String| StoreError::Read {
            path: self.path.clone(),
            message,
        };

        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).map_err(|e| read_error(format!("{e}")))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| read_error(format!("{e}")))?,
            None => return Ok(Vec::new()),
        };

        // The header row has no numeric ID, so it drops out with the blank rows.
        let notes = range.rows().filter_map(note_from_row).collect();
        Ok(notes)
    }

    /// Return a single note by id.
    pub fn find_note(&self, id: u64) -> Result<Option<Note>, StoreError> {
        Ok(self.load_notes()?.into_iter().find(|note| note.id == id))
    }

    /// Save a new note or update an existing one, returning its id.
    ///
    /// The draft is stored as given; form normalization happens in
    /// [`NoteDraft::normalized`].
    pub fn save_note(&self, draft: &NoteDraft) -> Result<u64, StoreError> {
        check_cell_len("title", &draft.title)?;
        check_cell_len("content", &draft.content)?;

        let mut notes = self.load_notes()?;
        let now = timestamp_now();

        if let Some(id) = draft.target_id() {
            if let Some(note) = notes.iter_mut().find(|note| note.id == id) {
                note.title = draft.title.clone();
                note.content = draft.content.clone();
                note.last_modified = now;
                self.write_notes(&notes)?;
                info!("updated note {}", id);
                return Ok(id);
            }
        }

        let id = next_id(&notes)?;
        notes.push(Note {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            date_created: now.clone(),
            last_modified: now,
        });
        self.write_notes(&notes)?;
        info!("created note {}", id);
        Ok(id)
    }

    /// Delete a note by id. Returns whether a row was removed.
    pub fn delete_note(&self, id: u64) -> Result<bool, StoreError> {
        let mut notes = self.load_notes()?;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            debug!("delete of missing note {} ignored", id);
            return Ok(false);
        }
        self.write_notes(&notes)?;
        info!("deleted note {}", id);
        Ok(true)
    }

    /// Case-insensitive substring search over title and content.
    ///
    /// A blank query matches every note.
    pub fn search(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        let notes = self.load_notes()?;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(notes);
        }
        Ok(notes
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query)
                    || note.content.to_lowercase().contains(&query)
            })
            .collect())
    }

    fn write_notes(&self, notes: &[Note]) -> Result<(), StoreError> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        worksheet.set_name(SHEET_NAME)?;

        for (col, header) in HEADERS.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header)?;
        }
        for (index, note) in notes.iter().enumerate() {
            let row = (index + 1) as u32;
            worksheet.write_number(row, 0, note.id as f64)?;
            worksheet.write_string(row, 1, note.title.as_str())?;
            worksheet.write_string(row, 2, note.content.as_str())?;
            worksheet.write_string(row, 3, note.date_created.as_str())?;
            worksheet.write_string(row, 4, note.last_modified.as_str())?;
        }

        workbook.push_worksheet(worksheet);
        let buffer = workbook.save_to_buffer()?;

        // Write next to the target and rename, so readers never see half a file.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&buffer)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Return the next available id: one past the largest, 1 for an empty sheet.
pub fn next_id(notes: &[Note]) -> Result<u64, StoreError> {
    match notes.iter().map(|note| note.id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .filter(|id| *id <= MAX_NOTE_ID)
            .ok_or(StoreError::IdsExhausted),
    }
}

fn check_cell_len(field: &'static str, text: &str) -> Result<(), StoreError> {
    let chars = text.chars().count();
    if chars > MAX_CELL_CHARS {
        return Err(StoreError::TooLong { field, chars });
    }
    Ok(())
}

/// Undo the `_xHHHH_` escaping the workbook writer applies to cell text.
pub fn decode_cell_escapes(text: &str) -> String {
    if !text.contains("_x") {
        return text.to_string();
    }
    OOXML_ESCAPE
        .replace_all(text, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn note_from_row(row: &[Data]) -> Option<Note> {
    let id = row.first().and_then(cell_id)?;
    let text = |col: usize| row.get(col).map(cell_text).unwrap_or_default();
    Some(Note {
        id,
        title: text(1),
        content: text(2),
        date_created: text(3),
        last_modified: text(4),
    })
}

fn cell_id(cell: &Data) -> Option<u64> {
    let id = match cell {
        Data::Int(i) if *i > 0 => *i as u64,
        Data::Float(f) if *f >= 1.0 && *f <= MAX_NOTE_ID as f64 && f.fract() == 0.0 => *f as u64,
        Data::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if id == 0 || id > MAX_NOTE_ID {
        warn!("skipping workbook row with out-of-range id {}", id);
        return None;
    }
    Some(id)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => decode_cell_escapes(s),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
