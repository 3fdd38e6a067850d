use crate::{
    AppState, access,
    db::{AlbumExt, PhotoExt, ShareExt},
    dtos::{
        AlbumCreateDto, AlbumDto, AlbumListResponseDto, AlbumResponseDto, AlbumUpdateDto,
        PhotoDto, PhotoListResponseDto, Response,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
    models::{Album, User},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use validator::Validate;

use tracing::instrument;

/// Router for albums. Albums are a private organizational tool: only the
/// owner (or an admin) can see or change them, so everything here sits
/// behind the auth middleware.
pub fn album_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(list_albums).post(create_album))
        .route(
            "/{album_id}",
            get(get_album).put(update_album).delete(delete_album),
        )
        .route("/{album_id}/photos", get(list_album_photos))
        .route(
            "/{album_id}/photos/{photo_id}",
            post(add_photo).delete(remove_photo),
        )
}

/// Album access gate. Denials answer 404 so foreign album ids are
/// indistinguishable from nonexistent ones.
async fn require_album(
    app_state: &AppState,
    album_id: i64,
    user: &User,
) -> Result<Album, HttpError> {
    let album = app_state
        .db_client
        .get_album(album_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting album: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::AlbumNotFound.to_string()))?;

    if !access::can_access_album(Some(user), &album) {
        return Err(HttpError::not_found(ErrorMessage::AlbumNotFound.to_string()));
    }

    Ok(album)
}

/// The authenticated user's albums
#[instrument(skip(app_state, auth))]
pub async fn list_albums(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let albums = app_state
        .db_client
        .get_albums_by_owner(auth.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing albums: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(AlbumListResponseDto {
        status: "success".to_string(),
        albums: AlbumDto::from_albums(&albums),
    }))
}

/// Create an album; names are unique per owner
#[instrument(skip(app_state, auth, body), fields(name = %body.name))]
pub async fn create_album(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<AlbumCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid album input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_album(auth.user.id, &body.name, body.description.as_deref())
        .await;

    match result {
        Ok(album) => {
            tracing::info!(album_id = album.id, owner = %auth.user.username, "album created");
            Ok((
                StatusCode::CREATED,
                Json(AlbumResponseDto {
                    status: "success".to_string(),
                    album: AlbumDto::from_album(&album),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::unique_constraint_violation(
                "You already have an album with this name",
            ))
        }
        Err(e) => {
            tracing::error!("DB error, saving album: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

#[instrument(skip(app_state, auth))]
pub async fn get_album(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(album_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let album = require_album(&app_state, album_id, &auth.user).await?;

    Ok(Json(AlbumResponseDto {
        status: "success".to_string(),
        album: AlbumDto::from_album(&album),
    }))
}

#[instrument(skip(app_state, auth, body))]
pub async fn update_album(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(album_id): Path<i64>,
    Json(body): Json<AlbumUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid album input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    require_album(&app_state, album_id, &auth.user).await?;

    let result = app_state
        .db_client
        .update_album(album_id, body.name.as_deref(), body.description.as_deref())
        .await;

    match result {
        Ok(album) => Ok(Json(AlbumResponseDto {
            status: "success".to_string(),
            album: AlbumDto::from_album(&album),
        })),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::unique_constraint_violation(
                "You already have an album with this name",
            ))
        }
        Err(e) => {
            tracing::error!("DB error, updating album: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Delete an album. The photos in it are untouched.
#[instrument(skip(app_state, auth))]
pub async fn delete_album(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(album_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    require_album(&app_state, album_id, &auth.user).await?;

    app_state
        .db_client
        .delete_album(album_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting album: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(album_id, actor = %auth.user.username, "album deleted");

    Ok(Json(Response {
        status: "success",
        message: "Album deleted".to_string(),
    }))
}

/// Photos in an album
#[instrument(skip(app_state, auth))]
pub async fn list_album_photos(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(album_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    require_album(&app_state, album_id, &auth.user).await?;

    let photos = app_state
        .db_client
        .get_album_photos(album_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing album photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = photos.len() as i64;

    // Attached photos may belong to other users, so the flags need the
    // viewer's grant on each one.
    let mut dtos = Vec::with_capacity(photos.len());
    for photo in &photos {
        let share = app_state
            .db_client
            .get_share(photo.id, auth.user.id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting share: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
            .map(|s| s.permission);

        dtos.push(PhotoDto::from_photo(
            photo,
            access::can_edit_photo(Some(&auth.user), photo, share),
            access::can_comment_on_photo(Some(&auth.user), photo, share),
        ));
    }

    Ok(Json(PhotoListResponseDto {
        status: "success".to_string(),
        photos: dtos,
        results,
    }))
}

/// Attach a photo the user can view to one of their albums.
/// Attaching the same photo twice is a no-op.
#[instrument(skip(app_state, auth))]
pub async fn add_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path((album_id, photo_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, HttpError> {
    require_album(&app_state, album_id, &auth.user).await?;

    let photo = app_state
        .db_client
        .get_photo(photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::PhotoNotFound.to_string()))?;

    let share = app_state
        .db_client
        .get_share(photo_id, auth.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting share: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .map(|s| s.permission);

    if !access::can_view_photo(Some(&auth.user), &photo, share) {
        return Err(HttpError::not_found(ErrorMessage::PhotoNotFound.to_string()));
    }

    app_state
        .db_client
        .add_photo_to_album(album_id, photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, adding photo to album: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            status: "success",
            message: "Photo added to album".to_string(),
        }),
    ))
}

/// Detach a photo from an album
#[instrument(skip(app_state, auth))]
pub async fn remove_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path((album_id, photo_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, HttpError> {
    require_album(&app_state, album_id, &auth.user).await?;

    let removed = app_state
        .db_client
        .remove_photo_from_album(album_id, photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, removing photo from album: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !removed {
        return Err(HttpError::not_found(ErrorMessage::PhotoNotFound.to_string()));
    }

    Ok(Json(Response {
        status: "success",
        message: "Photo removed from album".to_string(),
    }))
}
