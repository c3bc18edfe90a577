//! Runtime settings.
//!
//! Settings come from an optional JSON file, then environment variables
//! (a `.env` file is honoured by `main`). Every field has a default so an
//! empty config is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::preprocess::DEFAULT_CONTRAST;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output sheet path.
    pub output: PathBuf,
    pub tesseract_cmd: String,
    /// Tesseract language code(s), e.g. `eng` or `eng+fra`.
    pub language: String,
    pub contrast_factor: f32,
    pub title: TitleSettings,
    pub recognizer: RecognizerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("Output.csv"),
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            contrast_factor: DEFAULT_CONTRAST,
            title: TitleSettings::default(),
            recognizer: RecognizerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleSettings {
    /// Tokens below this confidence never reach a height bucket.
    pub min_confidence: f32,
    /// Heights within this many pixels count as one size class.
    pub height_tolerance: u32,
    pub scan: HeightScan,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            min_confidence: 70.0,
            height_tolerance: 5,
            scan: HeightScan::FirstSeen,
        }
    }
}

/// Order in which title height buckets are surveyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightScan {
    /// Order of each height's first occurrence in the OCR output.
    #[default]
    FirstSeen,
    /// Tallest bucket first, so the largest size class always wins.
    TallestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerBackend {
    #[default]
    Sidecar,
    Patterns,
}

impl RecognizerBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sidecar" => Some(Self::Sidecar),
            "patterns" => Some(Self::Patterns),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    pub backend: RecognizerBackend,
    /// Base URL of the NER sidecar.
    pub url: String,
    pub person_model: String,
    pub organization_model: String,
    /// Used by the `patterns` backend.
    pub patterns: Vec<EntityPattern>,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::Sidecar,
            url: "http://localhost:8080".to_string(),
            person_model: "en_core_web_md".to_string(),
            organization_model: "en_core_web_sm".to_string(),
            patterns: default_entity_patterns(),
        }
    }
}

/// A regex-based entity pattern for the offline recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPattern {
    /// Unique identifier for this pattern (e.g. "byline")
    pub id: String,
    /// Entity category produced on match (e.g. "PERSON", "ORG")
    pub label: String,
    /// Regex pattern string (first capture group is the value, if present)
    pub pattern: String,
}

/// Built-in byline and imprint patterns.
pub fn default_entity_patterns() -> Vec<EntityPattern> {
    vec![
        EntityPattern {
            id: "byline".to_string(),
            label: "PERSON".to_string(),
            pattern: r"\b[Bb]y\s+([A-Z][\w.'-]*(?: [A-Z][\w.'-]*){1,3})".to_string(),
        },
        EntityPattern {
            id: "imprint".to_string(),
            label: "ORG".to_string(),
            pattern: r"\b((?:[A-Z][\w&'.-]* )+(?:Press|Books|Publishing|Publishers|House))\b"
                .to_string(),
        },
    ]
}

impl Settings {
    /// Load settings from an optional JSON file, then apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config: {:?}", path))?;
                let settings: Settings = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse config: {:?}", path))?;
                info!("Loaded config from {:?}", path);
                settings
            }
            None => Settings::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("COVER_OUTPUT") {
            self.output = PathBuf::from(v);
        }
        if let Some(v) = var("TESSERACT_CMD") {
            self.tesseract_cmd = v;
        }
        if let Some(v) = var("OCR_LANGUAGE") {
            self.language = v;
        }
        if let Some(v) = var("NER_URL") {
            self.recognizer.url = v;
        }
        if let Some(v) = var("NER_PERSON_MODEL") {
            self.recognizer.person_model = v;
        }
        if let Some(v) = var("NER_ORG_MODEL") {
            self.recognizer.organization_model = v;
        }
        if let Some(v) = var("NER_BACKEND") {
            self.recognizer.backend = RecognizerBackend::from_str(&v)
                .with_context(|| format!("Unknown NER_BACKEND: {}", v))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.contrast_factor.is_finite() || self.contrast_factor <= 0.0 {
            anyhow::bail!("contrast_factor must be positive, got {}", self.contrast_factor);
        }
        if self.recognizer.backend == RecognizerBackend::Patterns && self.recognizer.patterns.is_empty() {
            warn!("Pattern recognizer selected but no patterns configured");
        }
        Ok(())
    }
}
