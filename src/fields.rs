//! Field extraction heuristics: raw OCR output in, one catalogue field out.
//!
//! Each extractor is independent. The title works from token geometry, the
//! ISBN from a plain text search, and authors/publishers delegate to an
//! entity recognizer.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::{HeightScan, TitleSettings};
use crate::entities::{EntityLabel, EntityRecognizer};
use crate::error::Result;
use crate::ocr::Token;

/// Label searched for by [`extract_isbn`].
const ISBN_LABEL: &str = "ISBN";
/// Characters skipped after the label start: "ISBN" plus one separator.
const ISBN_VALUE_OFFSET: usize = 5;
const BARE_ISBN_DIGITS: std::ops::RangeInclusive<usize> = 9..=15;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

// ── Title ───────────────────────────────────────────────────────────────────

/// Text of all tokens sharing one exact height, in first-seen order of heights.
#[derive(Debug, Default)]
struct HeightBuckets {
    order: Vec<u32>,
    text: HashMap<u32, String>,
}

impl HeightBuckets {
    fn build(tokens: &[Token], min_confidence: f32) -> Self {
        let mut buckets = Self::default();
        for token in tokens {
            if is_noise(&token.text) || token.confidence < min_confidence {
                continue;
            }
            match buckets.text.get_mut(&token.height) {
                Some(text) => {
                    text.push(' ');
                    text.push_str(&token.text);
                }
                None => {
                    buckets.order.push(token.height);
                    buckets.text.insert(token.height, token.text.clone());
                }
            }
        }
        buckets
    }

    fn heights(&self, scan: HeightScan) -> Vec<u32> {
        let mut heights = self.order.clone();
        if scan == HeightScan::TallestFirst {
            heights.sort_unstable_by(|a, b| b.cmp(a));
        }
        heights
    }
}

/// Blank tokens and table-rule glyphs carry no title text.
fn is_noise(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == '|')
}

/// Pick the title as the text of the largest size class on the cover.
///
/// Buckets within `height_tolerance` pixels of the running maximum join the
/// current class; a bucket taller by more than the tolerance starts a new
/// class and discards the old one. With [`HeightScan::FirstSeen`] the result
/// depends on the order heights first appear in the OCR output.
pub fn extract_title(tokens: &[Token], settings: &TitleSettings) -> String {
    let buckets = HeightBuckets::build(tokens, settings.min_confidence);
    let tolerance = settings.height_tolerance;

    let mut max_height = 0u32;
    let mut found = false;
    let mut title = String::new();

    for height in buckets.heights(settings.scan) {
        let text = &buckets.text[&height];
        if height > max_height {
            if height - max_height <= tolerance {
                append_words(&mut title, text);
            } else {
                title = text.clone();
            }
            max_height = height;
            found = true;
        } else if max_height - height <= tolerance {
            append_words(&mut title, text);
        }
    }

    if !found {
        return String::new();
    }
    debug!("Title size class {}px: {:?}", max_height, title);
    title
}

fn append_words(acc: &mut String, text: &str) {
    if !acc.is_empty() {
        acc.push(' ');
    }
    acc.push_str(text);
}

// ── Authors / publishers ────────────────────────────────────────────────────

/// Person mentions found by the recognizer, rendered as a list.
pub async fn extract_authors(text: &str, recognizer: &dyn EntityRecognizer) -> Result<String> {
    mentions_of(text, recognizer, EntityLabel::Person).await
}

/// Organization mentions found by the recognizer, rendered as a list.
pub async fn extract_publisher(text: &str, recognizer: &dyn EntityRecognizer) -> Result<String> {
    mentions_of(text, recognizer, EntityLabel::Organization).await
}

async fn mentions_of(
    text: &str,
    recognizer: &dyn EntityRecognizer,
    label: EntityLabel,
) -> Result<String> {
    let names: Vec<String> = recognizer
        .entities(text)
        .await?
        .into_iter()
        .filter(|m| m.label == label)
        .map(|m| m.text)
        .collect();
    debug!("{} found {} {:?} mentions", recognizer.name(), names.len(), label);
    Ok(render_list(&names))
}

/// Render strings as a list literal: `['Ann Patchett', "O'Brien"]`.
///
/// Order and duplicates are kept as given.
pub fn render_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else {
                    out.push_str(&format!("\\u{:04x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

// ── ISBN ────────────────────────────────────────────────────────────────────

/// Find the ISBN printed on the cover, or an empty string.
///
/// A labelled ISBN is read verbatim from a fixed offset after the first
/// "ISBN" up to the next space; padding spaces at the offset are skipped.
/// Without a label, the first run of 9 to 15 digits (hyphens removed) is
/// taken. No checksum is verified.
pub fn extract_isbn(text: &str) -> String {
    if let Some(start) = text.find(ISBN_LABEL) {
        return text[start..]
            .chars()
            .skip(ISBN_VALUE_OFFSET)
            .skip_while(|&c| c == ' ')
            .take_while(|&c| c != ' ')
            .collect();
    }

    let stripped = text.replace('-', "");
    DIGIT_RUN
        .find_iter(&stripped)
        .map(|m| m.as_str())
        .find(|run| BARE_ISBN_DIGITS.contains(&run.len()))
        .unwrap_or_default()
        .to_string()
}
