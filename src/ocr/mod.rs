//! OCR engine abstraction.
//!
//! Defines the [`OcrEngine`] trait and the token type shared by every backend so
//! the field extractors never depend on a concrete engine.

pub mod tesseract;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One recognized word unit, in the engine's reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Bounding-box height in pixels, used as a proxy for font size.
    pub height: u32,
    /// Engine confidence on a 0-100 scale.
    pub confidence: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, height: u32, confidence: f32) -> Self {
        Self {
            text: text.into(),
            height,
            confidence,
        }
    }
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Token-level recognition: text, height and confidence per word.
    async fn tokens(&self, image: &GrayImage) -> Result<Vec<Token>>;

    /// All recognized words as the engine lays them out, line breaks included.
    async fn text(&self, image: &GrayImage) -> Result<String>;
}

/// Collapse engine line breaks into double spaces before entity recognition.
pub fn flatten_text(raw: &str) -> String {
    raw.replace('\n', "  ")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that returns canned output and counts how often it was asked.
    #[derive(Default)]
    pub(crate) struct FixedEngine {
        pub tokens: Vec<Token>,
        pub text: String,
        pub calls: AtomicUsize,
    }

    impl FixedEngine {
        pub fn new(tokens: Vec<Token>, text: &str) -> Self {
            Self {
                tokens,
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn tokens(&self, _image: &GrayImage) -> Result<Vec<Token>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tokens.clone())
        }

        async fn text(&self, _image: &GrayImage) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    #[test]
    fn test_flatten_text() {
        assert_eq!(flatten_text("THE HOBBIT\nJ.R.R. Tolkien\n"), "THE HOBBIT  J.R.R. Tolkien  ");
        assert_eq!(flatten_text("single line"), "single line");
    }
}
