//! HTTP handlers, grouped by domain.

pub mod auth;
pub mod connection;
pub mod health;
pub mod message;
pub mod story;
pub mod user;
