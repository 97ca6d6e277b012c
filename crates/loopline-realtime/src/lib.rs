//! # loopline-realtime
//!
//! Per-user live delivery channels. A connected client holds exactly
//! one channel; the dispatcher pushes serialized messages into it and
//! never blocks or errors toward the send path.

pub mod channel;
pub mod dispatcher;
pub mod registry;

pub use channel::{ChannelSink, SinkEvent};
pub use dispatcher::LiveDispatcher;
pub use registry::ChannelRegistry;
