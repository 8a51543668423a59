/// Notes: owned records of text, ordered images and tags, optionally public

pub mod models;
pub mod query;
mod store;

pub use models::*;
pub use query::{ListQuery, NoteFilter, PageRequest, Paginated, Pagination, SortOrder, SortSpec};
pub use store::{NoteStore, DEFAULT_NOTE_SORT, NOTE_SORT_FIELDS};
pub(crate) use store::note_from_row;
