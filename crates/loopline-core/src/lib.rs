//! # loopline-core
//!
//! Core crate for Loopline. Contains configuration schemas, the job
//! kind and payload types shared between the services and the worker,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Loopline crates.

pub mod config;
pub mod error;
pub mod jobs;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
