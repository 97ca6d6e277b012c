//! The live subscription loop.
//!
//! One loop per signed-in user: GET the per-user stream endpoint, feed
//! the byte stream through the event parser, and hand every message to
//! the router. On transport error or EOF the loop reconnects after a
//! short delay until cancelled. There is no replay; missed messages
//! come back through the normal history fetch.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::events::EventParser;
use crate::view::MessageRouter;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// A handle to one user's live channel.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
}

impl Subscription {
    /// Open the channel for `user_id` and start routing messages. The
    /// loop runs on a spawned task until [`close`](Self::close).
    pub fn open(base_url: impl Into<String>, user_id: Uuid, router: Arc<dyn MessageRouter>) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let base_url = base_url.into();

        tokio::spawn(async move {
            run_loop(base_url, user_id, router, task_cancel).await;
        });

        Self { cancel }
    }

    /// Stop the loop. Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    base_url: String,
    user_id: Uuid,
    router: Arc<dyn MessageRouter>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();
    let url = format!("{}/api/message/{}", base_url.trim_end_matches('/'), user_id);

    while !cancel.is_cancelled() {
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(user_id = %user_id, "Live channel connected");
                read_stream(response, &router, &cancel).await;
            }
            Ok(response) => {
                tracing::warn!(
                    user_id = %user_id,
                    status = %response.status(),
                    "Live channel refused"
                );
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Live channel connect failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }

    tracing::debug!(user_id = %user_id, "Subscription loop stopped");
}

async fn read_stream(
    response: reqwest::Response,
    router: &Arc<dyn MessageRouter>,
    cancel: &CancellationToken,
) {
    let mut stream = response.bytes_stream();
    let mut parser = EventParser::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for message in parser.push(&bytes) {
                        router.route(message);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Live channel read failed");
                    return;
                }
                None => {
                    tracing::debug!("Live channel closed by server");
                    return;
                }
            }
        }
    }
}
