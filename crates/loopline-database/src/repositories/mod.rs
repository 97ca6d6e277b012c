//! Concrete Postgres repository implementations.

pub mod connection;
pub mod job;
pub mod message;
pub mod story;
pub mod user;

pub use connection::ConnectionRepository;
pub use job::JobRepository;
pub use message::MessageRepository;
pub use story::StoryRepository;
pub use user::UserRepository;
