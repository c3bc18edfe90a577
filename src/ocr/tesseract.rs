//! Tesseract CLI OCR engine.

use std::path::PathBuf;

use image::GrayImage;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::{OcrEngine, Token};
use crate::error::{CatalogError, Result};

/// Tesseract TSV `level` value for word rows.
const WORD_LEVEL: &str = "5";

pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    /// Run tesseract on `image`, writing results to stdout.
    async fn run(&self, image: &GrayImage, configs: &[&str]) -> Result<String> {
        let input = TempImage::write(image)?;

        let output = Command::new(&self.command)
            .arg(&input.path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(configs)
            .output()
            .await
            .map_err(|e| CatalogError::Ocr(format!("Failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CatalogError::Ocr(format!(
                "Tesseract failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract {:?} returned {} bytes", configs, stdout.len());
        Ok(stdout)
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn tokens(&self, image: &GrayImage) -> Result<Vec<Token>> {
        let tsv = self.run(image, &["tsv"]).await?;
        parse_tsv(&tsv)
    }

    async fn text(&self, image: &GrayImage) -> Result<String> {
        self.run(image, &[]).await
    }
}

/// Preprocessed image written to the temp dir; removed on drop.
struct TempImage {
    path: PathBuf,
}

impl TempImage {
    fn write(image: &GrayImage) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("cover_ocr_{}.png", Uuid::new_v4()));
        image
            .save(&path)
            .map_err(|e| CatalogError::Ocr(format!("Failed to write temp image: {}", e)))?;
        Ok(Self { path })
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Parse tesseract TSV output into word tokens, keeping emission order.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Token>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(tsv.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CatalogError::OcrOutput(format!("Missing TSV header: {}", e)))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CatalogError::OcrOutput(format!("TSV has no '{}' column", name)))
    };
    let level_col = column("level")?;
    let height_col = column("height")?;
    let conf_col = column("conf")?;
    let text_col = column("text")?;

    let mut tokens = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CatalogError::OcrOutput(e.to_string()))?;
        if record.get(level_col) != Some(WORD_LEVEL) {
            continue;
        }

        let height = record
            .get(height_col)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| CatalogError::OcrOutput(format!("Bad height in row {:?}", record)))?;
        let confidence = record
            .get(conf_col)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .ok_or_else(|| CatalogError::OcrOutput(format!("Bad conf in row {:?}", record)))?;
        // Rows with an empty word may omit the trailing field entirely.
        let text = record.get(text_col).unwrap_or("");

        tokens.push(Token::new(text, height, confidence));
    }

    Ok(tokens)
}
