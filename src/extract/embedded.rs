//! Structured strategy: the JSON blob the page embeds in a script tag.
//!
//! When present this is the authoritative source. It carries the owner,
//! the display image, the video flag, and the sidecar children of a
//! multi-part post.

use serde::{Deserialize, Deserializer};

use super::{Extractor, Outcome, Page};
use crate::models::metadata::MetadataRecord;

/// Leaf values in the blob are sometimes `null`; read those as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level embedded document.
#[derive(Debug, Default, Deserialize)]
pub struct AdditionalData {
    /// GraphQL response wrapper.
    #[serde(default)]
    pub graphql: Option<GraphQl>,
}

/// GraphQL wrapper around the media node.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQl {
    /// The post itself.
    #[serde(default)]
    pub shortcode_media: Option<ShortcodeMedia>,
}

/// A post.
#[derive(Debug, Default, Deserialize)]
pub struct ShortcodeMedia {
    /// Display image of the post (the first part for multi-part posts).
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_url: String,
    /// Whether the post is a video.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_video: bool,
    /// Parts of a multi-part post; absent for single posts.
    #[serde(default)]
    pub edge_sidecar_to_children: Option<Sidecar>,
    /// Post owner.
    #[serde(default)]
    pub owner: Option<Owner>,
}

/// Child list of a multi-part post.
#[derive(Debug, Default, Deserialize)]
pub struct Sidecar {
    /// Parts in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<Edge>,
}

/// One part wrapper.
#[derive(Debug, Default, Deserialize)]
pub struct Edge {
    /// The part.
    #[serde(default, deserialize_with = "null_as_default")]
    pub node: Node,
}

/// One part of a multi-part post.
#[derive(Debug, Default, Deserialize)]
pub struct Node {
    /// Display image of the part.
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_url: String,
    /// Whether the part is a video.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_video: bool,
}

/// Post owner identity.
#[derive(Debug, Default, Deserialize)]
pub struct Owner {
    /// Username.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Avatar image.
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

/// Locate and decode the embedded blob.
///
/// # Errors
///
/// Returns a human-readable reason when the blob is missing or malformed.
pub fn parse_additional_data(
    extractor: &Extractor,
    document: &str,
) -> std::result::Result<AdditionalData, String> {
    let blob = extractor
        .embedded_blob(document)
        .ok_or_else(|| "embedded json not found".to_owned())?;
    serde_json::from_str(blob).map_err(|err| format!("embedded json invalid: {err}"))
}

pub(super) fn extract(extractor: &Extractor, page: &Page<'_>) -> Outcome {
    let media = match parse_additional_data(extractor, page.document) {
        Ok(AdditionalData {
            graphql:
                Some(GraphQl {
                    shortcode_media: Some(media),
                }),
        }) => media,
        Ok(_) => return Outcome::Continue("embedded json has no shortcode_media".into()),
        Err(reason) => return Outcome::Continue(reason),
    };

    Outcome::Found(media_record(
        &media,
        extractor.title_line(page.document),
        page.url,
        page.selected_index,
    ))
}

/// Build a record from a decoded post, selecting the requested part.
///
/// Out-of-range and negative selectors fall back to the post-level image
/// and video flag.
#[must_use]
pub fn media_record(
    media: &ShortcodeMedia,
    title: String,
    url: &str,
    selected_index: i64,
) -> MetadataRecord {
    let children = media
        .edge_sidecar_to_children
        .as_ref()
        .map(|sidecar| sidecar.edges.as_slice());

    let part_count = children.map_or(1, <[Edge]>::len).max(1);

    let selected = children.and_then(|edges| {
        usize::try_from(selected_index)
            .ok()
            .and_then(|idx| edges.get(idx))
    });

    let (image_url, is_video) = match selected {
        Some(edge) => (edge.node.display_url.clone(), edge.node.is_video),
        None => (media.display_url.clone(), media.is_video),
    };

    MetadataRecord {
        title,
        canonical_url: url.to_owned(),
        image_url,
        is_video,
        part_count,
        owner_username: media
            .owner
            .as_ref()
            .map(|owner| owner.username.clone())
            .filter(|name| !name.is_empty()),
        owner_avatar_url: media
            .owner
            .as_ref()
            .and_then(|owner| owner.profile_pic_url.clone())
            .filter(|pic| !pic.is_empty()),
    }
}
