/*!
# Retro Notes

A small local web application for personal notes, built in Rust.

## Overview

Notes live in a single spreadsheet file (`.xlsx`), one row per note. The browser
page offers a search box that filters the note list as you type, smooth-scroll
navigation buttons, and a password-protected export that downloads one note as
an encrypted `.secure` file.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: HTML, CSS, WebAssembly
- **Key Components**:
  - Search Controller - Queries `/search` on every keystroke and re-renders the list
  - Export Trigger - Prompts for a password and submits the export form
  - Navigation - Smooth-scroll buttons

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Note Store - Reads and writes notes in the workbook
  - Secure Export - Password-based encryption of a single note
  - Router - Page rendering, JSON search and form handling

### Data Persistence Layer
- One `Notes` worksheet with the columns `ID | Title | Content | DateCreated | LastModified`
- Atomic replacement of the workbook on every write

## Modules

- **note**: Note values shared by client and server
- **client**: Browser behaviours (search, export prompt, navigation)
- **store**: Spreadsheet-backed note persistence
- **secure**: Encrypted export payloads
- **app**: Routing and middleware
- **config**: Command line and environment configuration

## REST API Endpoints

- `/` - Note list with search box
- `/note/{id}` - Note editor
- `/save` - Create or update a note
- `/delete/{id}` - Remove a note
- `/search?q={query}` - JSON search results
- `/export/{id}` - Encrypted download of a note
*/

pub mod client;
pub mod note;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod secure;
#[cfg(feature = "web")]
pub mod store;

pub use note::*;
