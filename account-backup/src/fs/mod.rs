//! File system helpers.

pub mod walker;

pub use walker::{has_subdirectory, list_top_level, EntryInfo, EntryKind};
