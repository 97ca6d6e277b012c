//! Story media type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a story frame shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "story_media_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoryMediaType {
    /// Styled text on a background color.
    Text,
    /// An image.
    Image,
    /// A short video clip.
    Video,
}

impl StoryMediaType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for StoryMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
