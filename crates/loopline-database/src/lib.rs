//! # loopline-database
//!
//! PostgreSQL connection management, store traits, and the concrete
//! repository implementations for all Loopline entities. The store
//! traits are the seams that let job handlers and services run against
//! in-memory fakes in tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod traits;

pub use connection::DatabasePool;
pub use traits::{ConnectionStore, JobStore, MessageStore, StoryStore, UserStore};
