//! Metadata extracted from a fetched content page.

/// Normalized description of one content post.
///
/// Produced fresh for every fetch; never cached or persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Document title (first line only).
    pub title: String,
    /// Link the reply points back to.
    pub canonical_url: String,
    /// Display image of the selected item.
    pub image_url: String,
    /// Whether the selected item is a video.
    pub is_video: bool,
    /// Number of parts in the post; always at least one.
    pub part_count: usize,
    /// Post owner's username, when the structured blob was available.
    pub owner_username: Option<String>,
    /// Post owner's avatar, when the structured blob was available.
    pub owner_avatar_url: Option<String>,
}

impl MetadataRecord {
    /// Whether the post consists of more than one part.
    #[must_use]
    pub fn is_multi_part(&self) -> bool {
        self.part_count > 1
    }
}
