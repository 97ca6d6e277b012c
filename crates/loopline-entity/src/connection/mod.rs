//! Connection request domain entities.

pub mod model;
pub mod status;

pub use model::{Connection, ConnectionWithUsers};
pub use status::ConnectionStatus;
