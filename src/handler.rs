//! Per-format cover handlers.
//!
//! A [`CoverHandler`] answers the four catalogue questions for one image.
//! New input formats are added as further implementations selected in
//! [`open_cover`] by file extension.

use std::path::Path;

use tracing::debug;

use crate::config::TitleSettings;
use crate::entities::{EntityRecognizer, Recognizers};
use crate::error::{CatalogError, Result};
use crate::fields;
use crate::ocr::{flatten_text, OcrEngine, Token};
use crate::preprocess;
use crate::record::BookRecord;

#[async_trait::async_trait]
pub trait CoverHandler: Send + Sync {
    fn title(&self, settings: &TitleSettings) -> String;
    async fn authors(&self, recognizer: &dyn EntityRecognizer) -> Result<String>;
    fn isbn(&self) -> String;
    async fn publisher(&self, recognizer: &dyn EntityRecognizer) -> Result<String>;
}

/// Input formats with a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFormat {
    Raster,
}

impl CoverFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" | "webp" | "gif" => Some(Self::Raster),
            _ => None,
        }
    }
}

/// Open `path` with the handler for its format.
pub async fn open_cover(
    path: &Path,
    engine: &dyn OcrEngine,
    contrast: f32,
) -> Result<Box<dyn CoverHandler>> {
    match CoverFormat::from_path(path) {
        Some(CoverFormat::Raster) => Ok(Box::new(RasterCover::load(path, engine, contrast).await?)),
        None => Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Run all four extractors against one cover.
pub async fn catalogue(
    cover: &dyn CoverHandler,
    recognizers: &Recognizers,
    title: &TitleSettings,
) -> Result<BookRecord> {
    Ok(BookRecord {
        title: cover.title(title),
        authors: cover.authors(recognizers.person.as_ref()).await?,
        isbn: cover.isbn(),
        publishers: cover.publisher(recognizers.organization.as_ref()).await?,
    })
}

/// Bitmap cover (png, jpg, ...). OCR runs once per mode on load.
pub struct RasterCover {
    tokens: Vec<Token>,
    text: String,
}

impl RasterCover {
    pub async fn load(path: &Path, engine: &dyn OcrEngine, contrast: f32) -> Result<Self> {
        let image = preprocess::load_image(path)?;
        let enhanced = preprocess::enhance(&image, contrast);

        let tokens = engine.tokens(&enhanced).await?;
        let text = flatten_text(&engine.text(&enhanced).await?);
        debug!(
            "{} read {} tokens, {} chars from {:?}",
            engine.name(),
            tokens.len(),
            text.len(),
            path
        );

        Ok(Self { tokens, text })
    }
}

#[async_trait::async_trait]
impl CoverHandler for RasterCover {
    fn title(&self, settings: &TitleSettings) -> String {
        fields::extract_title(&self.tokens, settings)
    }

    async fn authors(&self, recognizer: &dyn EntityRecognizer) -> Result<String> {
        fields::extract_authors(&self.text, recognizer).await
    }

    fn isbn(&self) -> String {
        fields::extract_isbn(&self.text)
    }

    async fn publisher(&self, recognizer: &dyn EntityRecognizer) -> Result<String> {
        fields::extract_publisher(&self.text, recognizer).await
    }
}
