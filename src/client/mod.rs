//! Browser behaviours of the notes page.
//!
//! The three features (search-as-you-type, export prompt, smooth-scroll
//! navigation) are written against small traits so they run the same in the
//! browser and in native tests. The `web` submodule binds them to the real DOM
//! when compiled for `wasm32`.

pub mod export;
pub mod nav;
pub mod search;

#[cfg(target_arch = "wasm32")]
mod web;

pub use export::*;
pub use nav::*;
pub use search::*;

/// Element identifiers the page templates and the client agree on.
pub mod ids {
    pub const SEARCH_INPUT: &str = "search-input";
    pub const RESULTS_LIST: &str = "notes-list";
    pub const EXPORT_BUTTON: &str = "export-button";
    pub const EXPORT_FORM: &str = "export-form";
    pub const EXPORT_PASSWORD: &str = "export-password";
    pub const NAV_BUTTON_CLASS: &str = "nav-button";
    pub const NAV_TARGET_ATTR: &str = "data-target";
}
