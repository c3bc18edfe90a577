//! Named-entity recognition over flattened cover text.
//!
//! Two backends implement [`EntityRecognizer`]: an HTTP NER sidecar (one
//! instance per model) and an offline regex fallback compiled from config.
//! Mentions are returned in emission order; nothing is deduplicated, since a
//! name printed on both spine and cover is a genuine repeat.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EntityPattern, RecognizerBackend, RecognizerSettings};
use crate::error::{CatalogError, Result};

/// Entity category as reported by a recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityLabel {
    Person,
    Organization,
    Other(String),
}

impl EntityLabel {
    /// Map a recognizer label string onto a category.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERSON" | "PER" => Self::Person,
            "ORG" | "ORGANIZATION" | "ORGANISATION" => Self::Organization,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A single (text, category) detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub text: String,
    pub label: EntityLabel,
}

impl EntityMention {
    pub fn new(text: impl Into<String>, label: EntityLabel) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

#[async_trait::async_trait]
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;
    async fn entities(&self, text: &str) -> Result<Vec<EntityMention>>;
}

/// The two recognizer instances the extractors need, built once per run.
pub struct Recognizers {
    pub person: Box<dyn EntityRecognizer>,
    pub organization: Box<dyn EntityRecognizer>,
}

impl Recognizers {
    pub fn from_settings(settings: &RecognizerSettings) -> Self {
        match settings.backend {
            RecognizerBackend::Sidecar => {
                let client = reqwest::Client::new();
                info!(
                    "NER sidecar at {} (person: {}, organization: {})",
                    settings.url, settings.person_model, settings.organization_model
                );
                Self {
                    person: Box::new(SidecarRecognizer::new(
                        client.clone(),
                        &settings.url,
                        &settings.person_model,
                    )),
                    organization: Box::new(SidecarRecognizer::new(
                        client,
                        &settings.url,
                        &settings.organization_model,
                    )),
                }
            }
            RecognizerBackend::Patterns => {
                info!("Using {} offline entity patterns", settings.patterns.len());
                Self {
                    person: Box::new(
                        PatternRecognizer::compile(&settings.patterns).only(&EntityLabel::Person),
                    ),
                    organization: Box::new(
                        PatternRecognizer::compile(&settings.patterns)
                            .only(&EntityLabel::Organization),
                    ),
                }
            }
        }
    }
}

// ── HTTP sidecar ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntsRequest<'a> {
    text: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EntsResponse {
    #[serde(default)]
    ents: Vec<SidecarEntity>,
}

#[derive(Deserialize)]
struct SidecarEntity {
    text: String,
    label: String,
}

/// NER sidecar client bound to one model.
pub struct SidecarRecognizer {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl SidecarRecognizer {
    pub fn new(client: reqwest::Client, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl EntityRecognizer for SidecarRecognizer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn entities(&self, text: &str) -> Result<Vec<EntityMention>> {
        let response = self
            .client
            .post(format!("{}/ents", self.url))
            .json(&EntsRequest {
                text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| CatalogError::Recognizer(format!("{}: {}", self.model, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Recognizer(format!(
                "NER sidecar error ({}) for {}: {}",
                status, self.model, body
            )));
        }

        let parsed: EntsResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Recognizer(format!("Bad sidecar response: {}", e)))?;

        debug!("{} returned {} entities", self.model, parsed.ents.len());
        Ok(parsed
            .ents
            .into_iter()
            .map(|e| EntityMention::new(e.text, EntityLabel::parse(&e.label)))
            .collect())
    }
}

// ── Regex fallback ──────────────────────────────────────────────────────────

/// Offline recognizer backed by pre-compiled regex patterns.
pub struct PatternRecognizer {
    patterns: Vec<CompiledPattern>,
}

struct CompiledPattern {
    id: String,
    label: EntityLabel,
    regex: Regex,
}

impl PatternRecognizer {
    /// Compile patterns from config. Skips invalid regexes with a warning.
    pub fn compile(patterns: &[EntityPattern]) -> Self {
        let mut compiled = Vec::new();
        for p in patterns {
            match Regex::new(&p.pattern) {
                Ok(regex) => compiled.push(CompiledPattern {
                    id: p.id.clone(),
                    label: EntityLabel::parse(&p.label),
                    regex,
                }),
                Err(e) => {
                    warn!(
                        "Skipping invalid entity pattern '{}' ({}): {}",
                        p.id, p.pattern, e
                    );
                }
            }
        }
        debug!("Compiled {} entity patterns", compiled.len());
        Self { patterns: compiled }
    }

    /// Keep only the patterns producing `label`.
    pub fn only(mut self, label: &EntityLabel) -> Self {
        self.patterns.retain(|p| &p.label == label);
        if self.is_empty() {
            warn!("No entity patterns configured for {:?}", label);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run every pattern, returning mentions ordered by position in `text`.
    fn find_all(&self, text: &str) -> Vec<EntityMention> {
        let mut hits: Vec<(usize, EntityMention)> = Vec::new();

        for pattern in &self.patterns {
            for cap in pattern.regex.captures_iter(text) {
                // Use first capture group if available, otherwise full match
                let Some(m) = cap.get(1).or_else(|| cap.get(0)) else {
                    continue;
                };
                let value = m.as_str().trim();
                if value.is_empty() {
                    continue;
                }
                debug!("Pattern '{}' matched '{}'", pattern.id, value);
                hits.push((m.start(), EntityMention::new(value, pattern.label.clone())));
            }
        }

        hits.sort_by_key(|(start, _)| *start);
        hits.into_iter().map(|(_, mention)| mention).collect()
    }
}

#[async_trait::async_trait]
impl EntityRecognizer for PatternRecognizer {
    fn name(&self) -> &str {
        "patterns"
    }

    async fn entities(&self, text: &str) -> Result<Vec<EntityMention>> {
        Ok(self.find_all(text))
    }
}
