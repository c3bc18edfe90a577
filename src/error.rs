//! Typed failures raised while cataloguing a single cover image.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to load image {path:?}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("Unsupported image format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("Could not parse OCR output: {0}")]
    OcrOutput(String),

    #[error("Entity recognizer failed: {0}")]
    Recognizer(String),

    #[error("Failed to write sheet: {0}")]
    Sheet(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
