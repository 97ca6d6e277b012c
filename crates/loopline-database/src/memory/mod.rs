//! In-memory store implementations using Tokio mutexes.
//!
//! Suitable for single-node development setups and for exercising
//! services and job handlers without a running PostgreSQL.

pub mod connection;
pub mod job;
pub mod message;
pub mod story;
pub mod user;

pub use connection::MemoryConnectionStore;
pub use job::MemoryJobStore;
pub use message::MemoryMessageStore;
pub use story::MemoryStoryStore;
pub use user::MemoryUserStore;
