// Textual similarity for vntree
// This crate compares serialized trees as character and line sequences

mod matcher;
mod summary;
mod text_diff;

pub use matcher::{Match, SequenceMatcher};
pub use summary::ChangeSummary;
pub use text_diff::TextDiff;
