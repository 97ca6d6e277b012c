//! # loopline-api
//!
//! The HTTP surface: REST handlers, the per-user live message stream,
//! and the router that ties them together.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;
