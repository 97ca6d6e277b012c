//! Direct message domain entities.

pub mod kind;
pub mod model;

pub use kind::MessageType;
pub use model::{CreateMessage, Message, MessageWithSender, UnseenCount};
