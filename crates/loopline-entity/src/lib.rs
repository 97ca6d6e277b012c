//! # loopline-entity
//!
//! Domain entity models for Loopline. Every struct in this crate
//! represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod connection;
pub mod job;
pub mod message;
pub mod story;
pub mod user;
