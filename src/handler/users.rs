use crate::{
    AppState,
    db::{AlbumExt, PhotoExt},
    dtos::{FilterUserDto, UserMeData, UserMeResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
};
use axum::{Extension, Json, Router, extract::State, response::IntoResponse, routing::get};

use tracing::instrument;

/// Router for the authenticated user's own account
pub fn users_handler() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// The authenticated user's profile with photo and album counts
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_me(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let photo_count = app_state
        .db_client
        .get_photo_count_by_owner(auth.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let album_count = app_state
        .db_client
        .get_album_count_by_owner(auth.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting albums: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(UserMeResponseDto {
        status: "success".to_string(),
        data: UserMeData {
            user: FilterUserDto::filter_user(&auth.user),
            photo_count,
            album_count,
        },
    }))
}
