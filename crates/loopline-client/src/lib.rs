//! # loopline-client
//!
//! The client side of live message delivery: an event-stream parser,
//! a conversation view that routes inbound messages, and the
//! subscription loop that keeps one channel open per signed-in user.

pub mod events;
pub mod subscription;
pub mod view;

pub use subscription::Subscription;
pub use view::{ConversationView, MessageRouter, Toast};
