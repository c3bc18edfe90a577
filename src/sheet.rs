//! Output sheet: one header row, then one row per catalogued image.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{CatalogError, Result};
use crate::record::BookRecord;

pub const HEADERS: [&str; 5] = ["Image", "Title", "Authors", "ISBN Number", "Publishers"];

pub struct SheetWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl SheetWriter<File> {
    /// Create (or truncate) the sheet at `path` and write the header row.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        info!("Writing sheet to {:?}", path);
        Self::from_writer(file)
    }
}

impl<W: Write> SheetWriter<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().from_writer(inner);
        writer.write_record(HEADERS)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append a record; returns its 1-based sequence number.
    pub fn append(&mut self, record: &BookRecord) -> Result<usize> {
        self.rows += 1;
        let seq = self.rows.to_string();
        let [title, authors, isbn, publishers] = record.cells();
        self.writer
            .write_record([seq.as_str(), title, authors, isbn, publishers])?;
        Ok(self.rows)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| CatalogError::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_back(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers = reader.headers().unwrap().iter().map(|h| h.to_string()).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_headers_only() {
        let sheet = SheetWriter::from_writer(Vec::new()).unwrap();
        let bytes = sheet.finish().unwrap();
        let (headers, rows) = read_back(&bytes);
        assert_eq!(headers, vec!["Image", "Title", "Authors", "ISBN Number", "Publishers"]);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_numbered_in_order() {
        let mut sheet = SheetWriter::from_writer(Vec::new()).unwrap();
        let first = BookRecord {
            title: "Great Expectations".to_string(),
            authors: "['Charles Dickens']".to_string(),
            isbn: "978-0-14-143955-3".to_string(),
            publishers: "['Penguin Books']".to_string(),
        };
        assert_eq!(sheet.append(&first).unwrap(), 1);
        assert_eq!(sheet.append(&BookRecord::default()).unwrap(), 2);
        assert_eq!(sheet.rows(), 2);

        let (_, rows) = read_back(&sheet.finish().unwrap());
        assert_eq!(
            rows[0],
            vec!["1", "Great Expectations", "['Charles Dickens']", "978-0-14-143955-3", "['Penguin Books']"]
        );
        assert_eq!(rows[1], vec!["2", "", "", "", ""]);
    }

    #[test]
    fn test_fields_with_commas_and_quotes_survive() {
        let mut sheet = SheetWriter::from_writer(Vec::new()).unwrap();
        let record = BookRecord {
            title: "Eats, Shoots \"and\" Leaves".to_string(),
            authors: "['Lynne Truss']".to_string(),
            isbn: String::new(),
            publishers: "[\"Profile's Books\"]".to_string(),
        };
        sheet.append(&record).unwrap();
        let (_, rows) = read_back(&sheet.finish().unwrap());
        assert_eq!(rows[0][1], "Eats, Shoots \"and\" Leaves");
        assert_eq!(rows[0][4], "[\"Profile's Books\"]");
    }
}
