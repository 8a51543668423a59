/// Bookmarks on public notes, with toggle semantics

pub mod models;
mod service;

pub use models::*;
pub use service::{BookmarkService, BOOKMARK_SORT_FIELDS, DEFAULT_BOOKMARK_SORT};
