//! Batch driver: catalogue one image or every image in a directory.
//!
//! Images are processed one at a time and appended to the sheet in order.
//! In directory mode a failing image is logged and skipped so the rest of
//! the batch still lands in the sheet.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::entities::Recognizers;
use crate::error::Result;
use crate::handler::{self, CoverFormat};
use crate::ocr::OcrEngine;
use crate::record::BookRecord;
use crate::sheet::SheetWriter;

/// What `--path` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `--path` is a single image file.
    Single,
    /// `--path` is a directory of images.
    Directory,
}

impl Mode {
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Self::Single),
            1 => Some(Self::Directory),
            _ => None,
        }
    }
}

/// Collaborators shared by every image in a run.
pub struct Cataloguer<'a> {
    pub engine: &'a dyn OcrEngine,
    pub recognizers: &'a Recognizers,
    pub settings: &'a Settings,
}

/// An image that could not be catalogued.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub records: Vec<BookRecord>,
    pub failed: Vec<Failure>,
}

impl<'a> Cataloguer<'a> {
    /// Catalogue a single image.
    pub async fn catalogue(&self, path: &Path) -> Result<BookRecord> {
        info!("Cataloguing {:?}", path);
        let cover = handler::open_cover(path, self.engine, self.settings.contrast_factor).await?;
        handler::catalogue(cover.as_ref(), self.recognizers, &self.settings.title).await
    }

    /// Process `path` in `mode`, appending a row per catalogued image.
    ///
    /// Single mode propagates any failure; directory mode records it in the
    /// summary and moves on.
    pub async fn run<W: Write>(
        &self,
        mode: Mode,
        path: &Path,
        sheet: &mut SheetWriter<W>,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        match mode {
            Mode::Single => {
                let record = self.catalogue(path).await?;
                sheet.append(&record)?;
                summary.records.push(record);
            }
            Mode::Directory => {
                for image in list_images(path)? {
                    match self.catalogue(&image).await {
                        Ok(record) => {
                            let seq = sheet.append(&record)?;
                            info!("Row {}: {:?} -> {:?}", seq, image, record.title);
                            summary.records.push(record);
                        }
                        Err(e) => {
                            error!("Failed to catalogue {:?}: {}", image, e);
                            summary.failed.push(Failure {
                                path: image,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            "Catalogued {} images ({} failed)",
            summary.records.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Entry point behind the command line: create the sheet at
/// `settings.output` and run the mode selected by `flag`.
///
/// An unknown flag leaves a headers-only sheet and returns `Ok(None)`. The
/// sheet is finalised even when the run fails.
pub async fn run_cli(
    flag: i64,
    path: &Path,
    settings: &Settings,
    engine: &dyn OcrEngine,
    recognizers: &Recognizers,
) -> Result<Option<BatchSummary>> {
    let mut sheet = SheetWriter::create(&settings.output)?;

    let Some(mode) = Mode::from_flag(flag) else {
        eprintln!("Incorrect flag");
        warn!("Unknown flag {}, sheet left with headers only", flag);
        sheet.finish()?;
        return Ok(None);
    };

    let cataloguer = Cataloguer {
        engine,
        recognizers,
        settings,
    };
    let result = cataloguer.run(mode, path, &mut sheet).await;
    let rows = sheet.rows();
    sheet.finish()?;
    let summary = result?;

    info!("Wrote {} rows to {:?}", rows, settings.output);
    Ok(Some(summary))
}

/// Regular files in `dir` with a supported image extension, sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        if CoverFormat::from_path(&path).is_none() {
            warn!("Skipping {:?}: not a supported image", path);
            continue;
        }
        images.push(path);
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}
