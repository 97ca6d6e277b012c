//! # loopline-service
//!
//! Business logic services. Each service composes store traits,
//! collaborators, and configuration into the operations the HTTP
//! handlers expose.

pub mod auth;
pub mod connection;
pub mod media;
pub mod message;
pub mod story;

pub use auth::{AuthService, Session};
pub use connection::ConnectionService;
pub use media::{LocalMediaStore, MediaStore};
pub use message::{ImageUpload, MessageService};
pub use story::StoryService;
