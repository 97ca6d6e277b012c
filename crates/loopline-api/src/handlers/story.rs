//! Story handlers.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_entity::story::{Story, StoryMediaType, StoryWithAuthor};
use loopline_entity::user::UserSummary;
use loopline_service::ImageUpload;

use crate::dto::request::StoryActionBody;
use crate::dto::response::{ApiResponse, LikeResponse, MessageBody};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/story/create
///
/// Multipart form with optional `content`, optional `media` file part,
/// a `media_type` of `text`, `image`, or `video`, and an optional
/// `background_color` for text stories.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<Story>>> {
    let mut content: Option<String> = None;
    let mut media: Option<ImageUpload> = None;
    let mut media_type = StoryMediaType::Text;
    let mut background_color: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "content" => {
                content = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("Invalid content: {e}")))?,
                );
            }
            "media" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid media upload: {e}")))?;
                media = Some(ImageUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "media_type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid media_type: {e}")))?;
                media_type = parse_media_type(&value)?;
            }
            "background_color" => {
                background_color = Some(field.text().await.map_err(|e| {
                    AppError::validation(format!("Invalid background_color: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let story = state
        .stories
        .create(auth.user_id, content, media, media_type, background_color)
        .await?;

    Ok(Json(ApiResponse::ok(story)))
}

fn parse_media_type(value: &str) -> Result<StoryMediaType, AppError> {
    match value {
        "text" => Ok(StoryMediaType::Text),
        "image" => Ok(StoryMediaType::Image),
        "video" => Ok(StoryMediaType::Video),
        other => Err(AppError::validation(format!(
            "Unknown media_type '{other}'"
        ))),
    }
}

/// GET /api/story/feed
pub async fn feed(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<StoryWithAuthor>>>> {
    let stories = state.stories.feed(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(stories)))
}

/// POST /api/story/view
pub async fn view(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StoryActionBody>,
) -> ApiResult<Json<ApiResponse<MessageBody>>> {
    state.stories.view(auth.user_id, body.story_id).await?;
    Ok(Json(ApiResponse::ok(MessageBody {
        message: "Story viewed".to_string(),
    })))
}

/// POST /api/story/like
pub async fn like(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StoryActionBody>,
) -> ApiResult<Json<ApiResponse<LikeResponse>>> {
    let liked = state.stories.like(auth.user_id, body.story_id).await?;
    Ok(Json(ApiResponse::ok(LikeResponse { liked })))
}

/// GET /api/story/viewers/{story_id}
///
/// Visible to the story owner only.
pub async fn viewers(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<UserSummary>>>> {
    let viewers = state.stories.viewers(auth.user_id, story_id).await?;
    Ok(Json(ApiResponse::ok(viewers)))
}
