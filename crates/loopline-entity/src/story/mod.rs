//! Story domain entities.

pub mod media;
pub mod model;

pub use media::StoryMediaType;
pub use model::{CreateStory, Story, StoryView, StoryWithAuthor};
