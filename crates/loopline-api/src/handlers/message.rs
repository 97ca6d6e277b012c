//! Message handlers: multipart send, conversation queries, and the
//! per-user live stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_entity::message::MessageWithSender;
use loopline_realtime::{ChannelRegistry, ChannelSink, SinkEvent};
use loopline_service::ImageUpload;

use crate::dto::response::{ApiResponse, SendMessageResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/message/send
///
/// Multipart form with `to_user_id`, optional `text`, and an optional
/// `image` file part.
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<SendMessageResponse>> {
    let mut to_user_id: Option<Uuid> = None;
    let mut text: Option<String> = None;
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "to_user_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid to_user_id: {e}")))?;
                to_user_id = Some(
                    value
                        .parse()
                        .map_err(|_| AppError::validation("to_user_id must be a UUID"))?,
                );
            }
            "text" => {
                text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("Invalid text: {e}")))?,
                );
            }
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid image upload: {e}")))?;
                image = Some(ImageUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let to_user_id =
        to_user_id.ok_or_else(|| AppError::validation("to_user_id is required"))?;

    let message = state
        .messages
        .send(auth.user_id, to_user_id, text, image)
        .await?;

    Ok(Json(SendMessageResponse {
        success: true,
        message,
    }))
}

/// GET /api/message/{user_id}
///
/// Server-sent event stream of incoming messages for the given user.
/// Opening a second stream for the same user closes the first.
pub async fn stream(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::not_found("User not found").into());
    }

    let (tx, rx) = mpsc::channel(state.config.realtime.channel_buffer_size);
    let sink = ChannelSink::new(tx);
    let guard = ChannelGuard {
        registry: Arc::clone(&state.registry),
        user_id,
        sink_id: sink.id(),
    };
    state.registry.register(user_id, sink);

    tracing::debug!(user_id = %user_id, "Live stream opened");

    // The guard lives inside the closure, so dropping the stream when
    // the client disconnects unregisters the sink.
    let events = ReceiverStream::new(rx).map_while(move |event| {
        let _open = &guard;
        match event {
            SinkEvent::Data(payload) => {
                Some(Ok(Event::default().event("message").data(payload)))
            }
            SinkEvent::Close => None,
        }
    });

    let keep_alive = KeepAlive::new()
        .interval(Duration::from_secs(state.config.realtime.keep_alive_seconds))
        .text("keep-alive");

    Ok(Sse::new(events).keep_alive(keep_alive))
}

struct ChannelGuard {
    registry: Arc<ChannelRegistry>,
    user_id: Uuid,
    sink_id: Uuid,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.user_id, self.sink_id);
        tracing::debug!(user_id = %self.user_id, "Live stream closed");
    }
}

/// GET /api/message/chat/{user_id}
///
/// Conversation with the given partner, oldest first. Opening it marks
/// the partner's messages as seen.
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<MessageWithSender>>>> {
    let messages = state.messages.chat_with(auth.user_id, user_id).await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// GET /api/message/recent
///
/// The most recent message per conversation partner, newest first.
pub async fn recent(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<MessageWithSender>>>> {
    let messages = state.messages.recent(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(messages)))
}
