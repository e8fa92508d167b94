//! Fallback strategy: generic `og:*` meta tags.
//!
//! Used when the embedded blob is missing or malformed. Owner identity and
//! part selection are unavailable here, so the record always describes a
//! single part.

use super::{Extractor, Outcome, Page};
use crate::models::metadata::MetadataRecord;

pub(super) fn extract(extractor: &Extractor, page: &Page<'_>) -> Outcome {
    let tags = extractor.meta_tags(page.document);
    if tags.is_empty() {
        return Outcome::Continue("no meta tags found".into());
    }

    let mut title = None;
    let mut canonical_url = None;
    let mut image_url = None;

    for (property, content) in tags {
        match property {
            "og:title" => title = Some(content),
            "og:url" => canonical_url = Some(content),
            "og:image" => image_url = Some(content),
            _ => {}
        }
    }

    let Some(image_url) = image_url.filter(|url| !url.is_empty()) else {
        return Outcome::Continue("no og:image in meta tags".into());
    };

    Outcome::Found(MetadataRecord {
        title: title.map_or_else(|| extractor.title_line(page.document), str::to_owned),
        canonical_url: canonical_url.unwrap_or(page.url).to_owned(),
        image_url: image_url.to_owned(),
        // Approximation: any video marker in the document counts.
        is_video: extractor.has_video_marker(page.document),
        part_count: 1,
        owner_username: None,
        owner_avatar_url: None,
    })
}
