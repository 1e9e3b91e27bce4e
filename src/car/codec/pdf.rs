//! Embedded PDF documents.
//!
//! Documents are validated only as far as their header marker and exposed
//! as bytes; rendering belongs to the caller.

use std::sync::OnceLock;

use log::{trace, warn};
use regex::bytes::Regex;

use crate::car::source::Payload;
use crate::car::types::error::{CarError, Result};
use crate::car::types::rendition::PdfDocument;

/// How far from the end the `%%EOF` marker is looked for.
const EOF_SEARCH_WINDOW: usize = 1024;

static HEADER_PATTERN: OnceLock<Regex> = OnceLock::new();
static PAGE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn header_regex() -> &'static Regex {
    HEADER_PATTERN.get_or_init(|| {
        Regex::new(r"\A%PDF-(\d+\.\d+)").expect("Invalid PDF header regex pattern")
    })
}

fn page_regex() -> &'static Regex {
    // `\b` keeps `/Type /Pages` tree nodes out of the count.
    PAGE_PATTERN
        .get_or_init(|| Regex::new(r"/Type\s*/Page\b").expect("Invalid PDF page regex pattern"))
}

/// Validates the `%PDF-x.y` marker and wraps the payload.
pub fn parse(payload: Payload) -> Result<PdfDocument> {
    if !payload.starts_with(b"%PDF-") {
        return Err(CarError::CorruptPdfPayload("missing %PDF- header".to_string()));
    }
    let version = header_regex()
        .captures(&payload)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .ok_or_else(|| {
            CarError::CorruptPdfPayload("malformed version in %PDF- header".to_string())
        })?;

    let tail = &payload[payload.len().saturating_sub(EOF_SEARCH_WINDOW)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        warn!("PDF payload ({} bytes) has no %%EOF marker; it may be truncated", payload.len());
    }
    trace!("PDF document version {} ({} bytes)", version, payload.len());

    Ok(PdfDocument { version, payload })
}

impl PdfDocument {
    /// Number of page objects, counted from the document text.
    ///
    /// Pages inside compressed object streams are not visible to this count.
    pub fn page_count(&self) -> usize {
        page_regex().find_iter(&self.payload).count()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }
}
