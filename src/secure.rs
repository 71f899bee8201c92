#![cfg(feature = "web")]

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use fernet::Fernet;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::Sha256;
use thiserror::Error;

use crate::note::Note;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]+").unwrap();
}

/// PBKDF2 iteration count for export keys
pub const KDF_ITERATIONS: u32 = 390_000;

/// Length of the random salt prefixed to every export
pub const SALT_LEN: usize = 16;

/// Extension of exported files
pub const EXPORT_EXTENSION: &str = "secure";

#[derive(Debug, Error)]
pub enum SecureError {
    #[error("could not gather random salt: {0}")]
    Random(getrandom::Error),

    #[error("malformed export payload: {0}")]
    Malformed(&'static str),

    #[error("wrong password or corrupted export")]
    Decrypt,
}

/// Make a note title safe to use in a download file name.
///
/// Every run of characters outside `[A-Za-z0-9_-]` becomes one `_`. A title
/// with nothing left after trimming becomes `untitled`.
///
/// # Examples
/// ```
/// use retro_notes::secure::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Shopping list"), "Shopping_list");
/// assert_eq!(sanitize_filename("   "), "untitled");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let safe = UNSAFE_FILENAME_CHARS.replace_all(title.trim(), "_");
    if safe.is_empty() {
        "untitled".to_string()
    } else {
        safe.into_owned()
    }
}

/// Download name of an exported note, e.g. `note_Shopping_list.secure`.
pub fn export_filename(note: &Note) -> String {
    format!("note_{}.{}", sanitize_filename(&note.title), EXPORT_EXTENSION)
}

/// Text that gets encrypted for an export.
pub fn export_plaintext(note: &Note) -> String {
    format!(
        "Title: {}\nCreated: {}\nLast Modified: {}\n\n{}",
        note.title, note.date_created, note.last_modified, note.content
    )
}

/// Derive a Fernet key from a password and salt with PBKDF2-HMAC-SHA256.
fn derive_key(password: &str, salt: &[u8]) -> Result<Fernet, SecureError> {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    Fernet::new(&URL_SAFE.encode(key)).ok_or(SecureError::Malformed("derived key rejected"))
}

/// Encrypt a note with a password and return the file bytes.
///
/// Layout: base64 salt, a newline, then the Fernet token.
pub fn encrypt_note(note: &Note, password: &str) -> Result<Vec<u8>, SecureError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).map_err(SecureError::Random)?;

    let fernet = derive_key(password, &salt)?;
    let token = fernet.encrypt(export_plaintext(note).as_bytes());

    let mut payload = STANDARD.encode(salt).into_bytes();
    payload.push(b'\n');
    payload.extend_from_slice(token.as_bytes());
    Ok(payload)
}

/// Decrypt an export produced by [`encrypt_note`].
pub fn decrypt_export(payload: &[u8], password: &str) -> Result<String, SecureError> {
    let text = std::str::from_utf8(payload).map_err(|_| SecureError::Malformed("not text"))?;
    let (salt, token) = text
        .split_once('\n')
        .ok_or(SecureError::Malformed("missing salt line"))?;

    let salt = STANDARD
        .decode(salt.trim())
        .map_err(|_| SecureError::Malformed("salt is not base64"))?;
    let fernet = derive_key(password, &salt)?;
    let plaintext = fernet
        .decrypt(token.trim())
        .map_err(|_| SecureError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| SecureError::Malformed("plaintext is not UTF-8"))
}
