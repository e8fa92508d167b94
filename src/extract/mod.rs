//! Content page metadata extraction.
//!
//! A fetched page is run through an ordered list of strategies. Each
//! strategy either produces a [`MetadataRecord`] or declines with a reason;
//! the first success wins and nothing is retried. When every strategy
//! declines, extraction fails with [`AppError::NoMetadataFound`] carrying
//! all reasons.

pub mod embedded;
pub mod meta_tags;

use regex::Regex;
use tracing::{debug, info};

use crate::models::metadata::MetadataRecord;
use crate::{AppError, Result};

/// Marker of the script-embedded JSON blob describing the post.
const EMBEDDED_BLOB_PATTERN: &str = r#"(?s)(\{"graphql":\{"shortcode_media":.+?)\);?</script>"#;
/// Document `<title>` element.
const TITLE_PATTERN: &str = r"(?s)<title>(.+?)</title>";
/// Generic `property`/`content` meta tag pair.
const META_TAG_PATTERN: &str = r#"<meta property="(.+?)" content="(.+?)" ?/?>"#;
/// Loose check for a video marker anywhere in the document.
const VIDEO_MARKER_PATTERN: &str = r#"property="og:video|content="video"#;

/// One page handed to the strategy chain.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// Raw document text.
    pub document: &'a str,
    /// URL the document was fetched from.
    pub url: &'a str,
    /// Requested part; out-of-range values fall back to the post itself.
    pub selected_index: i64,
}

/// Result of a single strategy.
#[derive(Debug)]
pub enum Outcome {
    /// Strategy produced a record; the chain stops.
    Found(MetadataRecord),
    /// Strategy declined; the chain continues with the next one.
    Continue(String),
}

type Strategy = fn(&Extractor, &Page<'_>) -> Outcome;

/// Strategies in priority order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("embedded_json", embedded::extract),
    ("meta_tags", meta_tags::extract),
];

/// Compiled patterns shared by all strategies.
#[derive(Debug, Clone)]
pub struct Extractor {
    embedded_blob: Regex,
    title: Regex,
    meta_tag: Regex,
    video_marker: Regex,
}

impl Extractor {
    /// Compile the extraction patterns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            embedded_blob: compile(EMBEDDED_BLOB_PATTERN)?,
            title: compile(TITLE_PATTERN)?,
            meta_tag: compile(META_TAG_PATTERN)?,
            video_marker: compile(VIDEO_MARKER_PATTERN)?,
        })
    }

    /// Extract metadata from a raw page.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoMetadataFound` when no strategy succeeds.
    pub fn extract(&self, document: &[u8], url: &str, selected_index: i64) -> Result<MetadataRecord> {
        let text = String::from_utf8_lossy(document);
        let page = Page {
            document: &text,
            url,
            selected_index,
        };

        let mut reasons = Vec::with_capacity(STRATEGIES.len());
        for (name, strategy) in STRATEGIES {
            match strategy(self, &page) {
                Outcome::Found(record) => {
                    info!(url, strategy = name, parts = record.part_count, "metadata extracted");
                    return Ok(record);
                }
                Outcome::Continue(reason) => {
                    debug!(url, strategy = name, %reason, "extraction strategy declined");
                    reasons.push(format!("{name}: {reason}"));
                }
            }
        }

        Err(AppError::NoMetadataFound(format!(
            "{url} ({})",
            reasons.join("; ")
        )))
    }

    /// Trimmed contents of the document's `<title>` element.
    #[must_use]
    pub fn document_title(&self, document: &str) -> Option<String> {
        self.title
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
    }

    /// First line of the document title, or an empty string.
    #[must_use]
    pub fn title_line(&self, document: &str) -> String {
        self.document_title(document)
            .and_then(|title| title.lines().next().map(|line| line.trim().to_owned()))
            .unwrap_or_default()
    }

    pub(crate) fn embedded_blob<'d>(&self, document: &'d str) -> Option<&'d str> {
        self.embedded_blob
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub(crate) fn meta_tags<'d>(&self, document: &'d str) -> Vec<(&'d str, &'d str)> {
        self.meta_tag
            .captures_iter(document)
            .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
            .collect()
    }

    pub(crate) fn has_video_marker(&self, document: &str) -> bool {
        self.video_marker.is_match(document)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| AppError::Config(format!("invalid extraction pattern {pattern}: {err}")))
}
