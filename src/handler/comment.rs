use crate::{
    AppState, access,
    db::{CommentExt, PhotoExt},
    dtos::Response,
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::delete,
};

use tracing::instrument;

/// Router for operations addressed by comment id.
/// Creation and listing live under the photo routes.
pub fn comment_handler() -> Router<AppState> {
    Router::new().route("/{comment_id}", delete(delete_comment))
}

/// Delete a comment. Allowed for the comment's author, the owner of the
/// photo it sits on, and moderators/admins.
#[instrument(skip(app_state, auth))]
pub async fn delete_comment(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let user = &auth.user;

    let comment = app_state
        .db_client
        .get_comment(comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::CommentNotFound.to_string()))?;

    let photo = app_state
        .db_client
        .get_photo(comment.photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            // Photo deletion cascades over comments, so this is a data bug.
            tracing::error!(comment_id, photo_id = comment.photo_id, "comment without photo");
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !access::can_delete_comment(Some(user), &comment, &photo) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let deleted = app_state
        .db_client
        .delete_comment(comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !deleted {
        return Err(HttpError::not_found(
            ErrorMessage::CommentNotFound.to_string(),
        ));
    }

    tracing::info!(comment_id, actor = %user.username, "comment deleted");

    Ok(Json(Response {
        status: "success",
        message: "Comment deleted".to_string(),
    }))
}
