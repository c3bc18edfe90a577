//! Catalogue record produced for each cover image.

use serde::{Deserialize, Serialize};

/// Extracted fields for one book. Authors and publishers are already rendered
/// as list literals; every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: String,
    pub isbn: String,
    pub publishers: String,
}

impl BookRecord {
    /// Sheet cells in column order, after the sequence number.
    pub fn cells(&self) -> [&str; 4] {
        [&self.title, &self.authors, &self.isbn, &self.publishers]
    }
}
