//! Cover Catalog - extract title, authors, ISBN and publisher from book cover photos.

mod batch;
mod config;
mod entities;
mod error;
mod fields;
mod handler;
mod ocr;
mod preprocess;
mod record;
mod sheet;

use std::path::PathBuf;

use batch::Mode;
use clap::Parser;
use config::Settings;
use entities::Recognizers;
use ocr::tesseract::TesseractEngine;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cover-catalog", version, about = "Catalogue books from cover photographs")]
struct Args {
    /// 0: --path is a single image, 1: --path is a directory of images
    #[arg(long)]
    flag: i64,

    /// Image file or directory
    #[arg(long)]
    path: PathBuf,

    /// Output sheet (overrides config and COVER_OUTPUT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cover_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(output) = args.output {
        settings.output = output;
    }

    let engine = TesseractEngine::new(&settings.tesseract_cmd, &settings.language);
    let recognizers = Recognizers::from_settings(&settings.recognizer);

    let summary = batch::run_cli(args.flag, &args.path, &settings, &engine, &recognizers)
        .await
        .inspect_err(|e| error!("Cataloguing failed: {}", e))?;
    let Some(summary) = summary else {
        return Ok(());
    };

    if Mode::from_flag(args.flag) == Some(Mode::Single) {
        if let Some(record) = summary.records.first() {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    } else if !summary.failed.is_empty() {
        eprintln!("{}", serde_json::to_string_pretty(&summary.failed)?);
    }

    Ok(())
}
