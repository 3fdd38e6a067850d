use crate::{
    AppState, access,
    db::{CommentExt, PhotoExt, ShareExt, UserExt},
    dtos::{
        CommentCreateDto, CommentDto, CommentListResponseDto, CommentResponseDto,
        PhotoData, PhotoDto, PhotoListResponseDto, PhotoResponseDto, PhotoUpdateDto,
        PhotoUploadDto, RequestQueryDto, Response, ShareCreateDto, ShareDto,
        ShareListResponseDto, ShareResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::MaybeAuth,
    models::{PermissionLevel, Photo, User, Visibility},
    storage::{MAX_UPLOAD_BYTES, UploadError},
};
use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;
use validator::Validate;

use tracing::instrument;

/// Router for photos, their blobs, shares, and photo comments.
///
/// The whole router runs under optional authentication: public photos must
/// stay reachable without a login, so each handler receives the principal
/// (if any) and passes it to the access checks explicitly. Mutating handlers
/// demand a principal up front.
pub fn photo_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_photo))
        .route("/public", get(list_public_photos))
        .route("/me", get(list_my_photos))
        .route("/shared-with-me", get(list_shared_with_me))
        .route(
            "/{photo_id}",
            get(get_photo).put(update_photo).delete(delete_photo),
        )
        .route("/{photo_id}/file", get(download_photo))
        .route("/{photo_id}/thumbnail", get(download_thumbnail))
        .route(
            "/{photo_id}/shares",
            get(list_shares).post(create_share),
        )
        .route("/{photo_id}/shares/{user_id}", delete(delete_share))
        .route(
            "/{photo_id}/comments",
            get(list_comments).post(create_comment),
        )
        // Slightly above the pipeline's own limit so the authoritative
        // size check (with its proper error message) is the one that fires.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize + 2 * 1024 * 1024))
        .layer(middleware::from_fn_with_state(
            app_state,
            crate::middleware::maybe_auth,
        ))
}

/// Principal requirement for mutating routes. A disabled account has already
/// been degraded to anonymous by the middleware, so it lands here too.
fn require_user(auth: &MaybeAuth) -> Result<&User, HttpError> {
    auth.user
        .as_ref()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))
}

async fn fetch_photo(app_state: &AppState, photo_id: i64) -> Result<Photo, HttpError> {
    app_state
        .db_client
        .get_photo(photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::PhotoNotFound.to_string()))
}

/// The grant the principal holds on this photo, if any.
async fn share_level(
    app_state: &AppState,
    photo_id: i64,
    principal: Option<&User>,
) -> Result<Option<PermissionLevel>, HttpError> {
    let Some(user) = principal else {
        return Ok(None);
    };

    let share = app_state
        .db_client
        .get_share(photo_id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting share: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(share.map(|s| s.permission))
}

fn dto_with_flags(
    principal: Option<&User>,
    photo: &Photo,
    share: Option<PermissionLevel>,
) -> PhotoDto {
    PhotoDto::from_photo(
        photo,
        access::can_edit_photo(principal, photo, share),
        access::can_comment_on_photo(principal, photo, share),
    )
}

/// Gate for read access. Denials answer 404, not 403, so the existence of a
/// private photo is not revealed to callers who cannot see it.
async fn require_view(
    app_state: &AppState,
    photo_id: i64,
    principal: Option<&User>,
) -> Result<(Photo, Option<PermissionLevel>), HttpError> {
    let photo = fetch_photo(app_state, photo_id).await?;
    let share = share_level(app_state, photo_id, principal).await?;

    if !access::can_view_photo(principal, &photo, share) {
        return Err(HttpError::not_found(ErrorMessage::PhotoNotFound.to_string()));
    }

    Ok((photo, share))
}

/// Gate for edit/delete/share management. An invisible photo answers 404;
/// a visible one the principal cannot modify answers 403.
async fn require_edit(
    app_state: &AppState,
    photo_id: i64,
    principal: &User,
) -> Result<(Photo, Option<PermissionLevel>), HttpError> {
    let (photo, share) = require_view(app_state, photo_id, Some(principal)).await?;

    if !access::can_edit_photo(Some(principal), &photo, share) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    Ok((photo, share))
}

// ============================================================================
// Upload
// ============================================================================

/// Upload a photo: multipart form with a `file` part plus `title`,
/// `description`, and `visibility` text parts. New photos default to private.
#[instrument(skip(app_state, auth, multipart))]
pub async fn upload_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?.clone();

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut claimed_filename: Option<String> = None;
    let mut claimed_content_type: Option<String> = None;
    let mut body = PhotoUploadDto::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart error: {}", e);
        HttpError::bad_request("Malformed multipart request")
    })? {
        match field.name().unwrap_or_default() {
            "file" => {
                claimed_filename = field.file_name().map(|s| s.to_string());
                claimed_content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Multipart read error: {}", e);
                    file_read_error(e.status())
                })?;
                file_bytes = Some(bytes.to_vec());
            }
            "title" => body.title = read_text_field(field).await?,
            "description" => body.description = Some(read_text_field(field).await?),
            "visibility" => {
                body.visibility = Some(parse_visibility(&read_text_field(field).await?)?)
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    body.validate().map_err(|e| {
        tracing::error!("Invalid upload input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let file_bytes = file_bytes.ok_or_else(|| {
        HttpError::bad_request(UploadError::EmptyFile.to_string())
    })?;

    let stored = app_state
        .storage
        .store_photo(
            &file_bytes,
            claimed_filename.as_deref(),
            claimed_content_type.as_deref(),
        )
        .await
        .map_err(|e| {
            if e.is_validation() {
                tracing::warn!("Upload rejected: {}", e);
                HttpError::bad_request(e.to_string())
            } else {
                tracing::error!("Storage error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let visibility = body.visibility.unwrap_or(Visibility::Private);

    let result = app_state
        .db_client
        .save_photo(
            user.id,
            &body.title,
            body.description.as_deref(),
            &stored.original_filename,
            &stored.storage_key,
            stored.content_type,
            visibility,
            stored.size_bytes as i64,
        )
        .await;

    let photo = match result {
        Ok(photo) => photo,
        Err(e) => {
            tracing::error!("DB error, saving photo: {}", e);
            // The blob must not outlive the failed metadata row.
            app_state.storage.delete_photo(&stored.storage_key).await;
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    tracing::info!(photo_id = photo.id, owner = %user.username, "photo uploaded");

    Ok((
        StatusCode::CREATED,
        Json(PhotoResponseDto {
            status: "success".to_string(),
            data: PhotoData {
                photo: dto_with_flags(Some(&user), &photo, None),
            },
        }),
    ))
}

/// Map a failed read of the file part. Only a body-limit overflow gets the
/// size wording; disconnects and malformed bodies stay a generic 400.
fn file_read_error(status: StatusCode) -> HttpError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        HttpError::new(
            UploadError::FileTooLarge.to_string(),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    } else {
        HttpError::bad_request("Malformed multipart request")
    }
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, HttpError> {
    field.text().await.map_err(|e| {
        tracing::error!("Multipart read error: {}", e);
        HttpError::bad_request("Malformed multipart request")
    })
}

fn parse_visibility(value: &str) -> Result<Visibility, HttpError> {
    match value {
        "private" => Ok(Visibility::Private),
        "public" => Ok(Visibility::Public),
        _ => Err(HttpError::bad_request(
            "Visibility must be 'private' or 'public'",
        )),
    }
}

// ============================================================================
// Listings
// ============================================================================

/// The public gallery, visible to everyone including anonymous visitors
#[instrument(skip(app_state, auth))]
pub async fn list_public_photos(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let photos = app_state
        .db_client
        .get_public_photos(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing public photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = app_state.db_client.get_public_photo_count().await.map_err(|e| {
        tracing::error!("DB error, counting public photos: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    // Flags must reflect grants too: an ADMIN-level grantee sees the same
    // canEdit here as on the single-photo endpoint.
    let principal = auth.user.as_ref();
    let mut dtos = Vec::with_capacity(photos.len());
    for photo in &photos {
        let share = share_level(&app_state, photo.id, principal).await?;
        dtos.push(dto_with_flags(principal, photo, share));
    }

    Ok(Json(PhotoListResponseDto {
        status: "success".to_string(),
        photos: dtos,
        results,
    }))
}

/// The authenticated user's own photos
#[instrument(skip(app_state, auth))]
pub async fn list_my_photos(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    query.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let photos = app_state
        .db_client
        .get_photos_by_owner(user.id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = app_state
        .db_client
        .get_photo_count_by_owner(user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let photos = photos
        .iter()
        .map(|p| dto_with_flags(Some(user), p, None))
        .collect();

    Ok(Json(PhotoListResponseDto {
        status: "success".to_string(),
        photos,
        results,
    }))
}

/// Photos other users have shared with the authenticated user
#[instrument(skip(app_state, auth))]
pub async fn list_shared_with_me(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    query.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let photos = app_state
        .db_client
        .get_photos_shared_with(user.id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing shared photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = app_state
        .db_client
        .get_shared_with_count(user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting shared photos: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut dtos = Vec::with_capacity(photos.len());
    for photo in &photos {
        let share = share_level(&app_state, photo.id, Some(user)).await?;
        dtos.push(dto_with_flags(Some(user), photo, share));
    }

    Ok(Json(PhotoListResponseDto {
        status: "success".to_string(),
        photos: dtos,
        results,
    }))
}

// ============================================================================
// Single photo
// ============================================================================

/// Photo metadata; every access decision is re-evaluated on each request
#[instrument(skip(app_state, auth))]
pub async fn get_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = auth.user.as_ref();
    let (photo, share) = require_view(&app_state, photo_id, principal).await?;

    Ok(Json(PhotoResponseDto {
        status: "success".to_string(),
        data: PhotoData {
            photo: dto_with_flags(principal, &photo, share),
        },
    }))
}

/// The original bytes, served with the sniffed content type
#[instrument(skip(app_state, auth))]
pub async fn download_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = auth.user.as_ref();
    let (photo, _) = require_view(&app_state, photo_id, principal).await?;

    let bytes = app_state
        .storage
        .load_original(&photo.storage_key)
        .await
        .map_err(|e| {
            tracing::error!("Storage error, loading photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::error!(photo_id, key = %photo.storage_key, "photo blob missing");
            HttpError::not_found(ErrorMessage::PhotoNotFound.to_string())
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, photo.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", photo.original_filename),
            ),
        ],
        bytes,
    ))
}

/// The thumbnail bytes; falls back to the original when none was generated
#[instrument(skip(app_state, auth))]
pub async fn download_thumbnail(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = auth.user.as_ref();
    let (photo, _) = require_view(&app_state, photo_id, principal).await?;

    let bytes = app_state
        .storage
        .load_thumbnail(&photo.storage_key)
        .await
        .map_err(|e| {
            tracing::error!("Storage error, loading thumbnail: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::error!(photo_id, key = %photo.storage_key, "thumbnail blob missing");
            HttpError::not_found(ErrorMessage::PhotoNotFound.to_string())
        })?;

    Ok(([(header::CONTENT_TYPE, photo.content_type.clone())], bytes))
}

/// Update title, description, or visibility
#[instrument(skip(app_state, auth, body))]
pub async fn update_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
    Json(body): Json<PhotoUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    body.validate().map_err(|e| {
        tracing::error!("Invalid photo update input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (_, share) = require_edit(&app_state, photo_id, user).await?;

    let photo = app_state
        .db_client
        .update_photo(
            photo_id,
            body.title.as_deref(),
            body.description.as_deref(),
            body.visibility,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(photo_id, editor = %user.username, "photo updated");

    Ok(Json(PhotoResponseDto {
        status: "success".to_string(),
        data: PhotoData {
            photo: dto_with_flags(Some(user), &photo, share),
        },
    }))
}

/// Delete a photo, its grants, comments, album memberships, and blobs
#[instrument(skip(app_state, auth))]
pub async fn delete_photo(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    require_edit(&app_state, photo_id, user).await?;

    let storage_key = app_state
        .db_client
        .delete_photo_cascade(photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting photo: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // Blob removal happens after the commit; a leftover file is logged and
    // cleaned up out of band rather than failing the request.
    if let Some(key) = storage_key {
        if !app_state.storage.delete_photo(&key).await {
            tracing::warn!(photo_id, key, "photo blob was already missing on delete");
        }
    }

    tracing::info!(photo_id, editor = %user.username, "photo deleted");

    Ok(Json(Response {
        status: "success",
        message: "Photo deleted".to_string(),
    }))
}

// ============================================================================
// Shares
// ============================================================================

/// Current grants on a photo; visible to whoever can manage the photo
#[instrument(skip(app_state, auth))]
pub async fn list_shares(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    require_edit(&app_state, photo_id, user).await?;

    let shares = app_state
        .db_client
        .get_shares_for_photo(photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing shares: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut dtos = Vec::with_capacity(shares.len());
    for share in &shares {
        let grantee = app_state
            .db_client
            .get_user(Some(share.user_id), None, None)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting grantee: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
        let username = grantee.map(|u| u.username).unwrap_or_default();
        dtos.push(ShareDto::from_share(share, &username));
    }

    Ok(Json(ShareListResponseDto {
        status: "success".to_string(),
        shares: dtos,
    }))
}

/// Grant (or re-grant at a new level) access to a photo.
/// Sharing again with the same user replaces the previous level.
#[instrument(skip(app_state, auth, body), fields(grantee = %body.username))]
pub async fn create_share(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
    Json(body): Json<ShareCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    body.validate().map_err(|e| {
        tracing::error!("Invalid share input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (photo, _) = require_edit(&app_state, photo_id, user).await?;

    let grantee = app_state
        .db_client
        .get_user(None, Some(&body.username), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting grantee: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request("No such user to share with"))?;

    if grantee.id == photo.owner_id {
        return Err(HttpError::bad_request(
            "The owner already has full access to their photo",
        ));
    }

    let share = app_state
        .db_client
        .upsert_share(photo_id, grantee.id, body.permission)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving share: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(
        photo_id,
        grantee = %grantee.username,
        permission = ?body.permission,
        "share granted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ShareResponseDto {
            status: "success".to_string(),
            share: ShareDto::from_share(&share, &grantee.username),
        }),
    ))
}

/// Revoke a grant; the grantee loses access on their very next request
#[instrument(skip(app_state, auth))]
pub async fn delete_share(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path((photo_id, user_id)): Path<(i64, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    require_edit(&app_state, photo_id, user).await?;

    let deleted = app_state
        .db_client
        .delete_share(photo_id, user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting share: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !deleted {
        return Err(HttpError::not_found(ErrorMessage::ShareNotFound.to_string()));
    }

    tracing::info!(photo_id, grantee_id = %user_id, "share revoked");

    Ok(Json(Response {
        status: "success",
        message: "Share revoked".to_string(),
    }))
}

// ============================================================================
// Comments on a photo
// ============================================================================

/// Comments on a photo, oldest first; readable by whoever can view the photo
#[instrument(skip(app_state, auth))]
pub async fn list_comments(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = auth.user.as_ref();
    require_view(&app_state, photo_id, principal).await?;

    query.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let comments = app_state
        .db_client
        .get_comments_for_photo(photo_id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = app_state
        .db_client
        .get_comment_count_for_photo(photo_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(CommentListResponseDto {
        status: "success".to_string(),
        comments: CommentDto::from_comments(&comments),
        results,
    }))
}

/// Comment on a photo; requires comment-level access
#[instrument(skip(app_state, auth, body))]
pub async fn create_comment(
    State(app_state): State<AppState>,
    Extension(auth): Extension<MaybeAuth>,
    Path(photo_id): Path<i64>,
    Json(body): Json<CommentCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&auth)?;
    body.validate().map_err(|e| {
        tracing::error!("Invalid comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (photo, share) = require_view(&app_state, photo_id, Some(user)).await?;

    if !access::can_comment_on_photo(Some(user), &photo, share) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let comment = app_state
        .db_client
        .save_comment(photo_id, user.id, &body.content)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(photo_id, author = %user.username, "comment created");

    Ok((
        StatusCode::CREATED,
        Json(CommentResponseDto {
            status: "success".to_string(),
            comment: CommentDto::from_comment(&comment),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::DBClient;
    use crate::storage::FileStorage;
    use axum::body::to_bytes;
    use axum::response::Response as AxumResponse;
    use sqlx::PgPool;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn oversized_file_part_keeps_the_size_wording() {
        let err = file_read_error(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.message, UploadError::FileTooLarge.to_string());
    }

    #[test]
    fn other_file_read_failures_stay_a_generic_bad_request() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = file_read_error(status);
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, "Malformed multipart request");
        }
    }

    async fn test_state(pool: PgPool) -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let photo_dir = dir.path().join("photos");
        let thumb_dir = dir.path().join("thumbnails");
        let storage = FileStorage::new(
            photo_dir.to_str().unwrap(),
            thumb_dir.to_str().unwrap(),
        )
        .await
        .unwrap();

        let config = Config {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            port: 0,
            frontend_url: "http://localhost:3000".to_string(),
            upload_dir: photo_dir.to_string_lossy().into_owned(),
            thumbnail_dir: thumb_dir.to_string_lossy().into_owned(),
            admin_username: "admin".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "password123".to_string(),
        };

        let state = AppState {
            env: Arc::new(config),
            db_client: DBClient::new(pool),
            storage,
        };

        (state, dir)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: AxumResponse) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[sqlx::test]
    async fn public_listing_flags_match_the_single_photo_view(pool: PgPool) {
        let (state, _dir) = test_state(pool).await;

        let owner = state
            .db_client
            .save_user("owner", "owner@example.com", "hash")
            .await
            .unwrap();
        let grantee = state
            .db_client
            .save_user("grantee", "grantee@example.com", "hash")
            .await
            .unwrap();

        let photo = state
            .db_client
            .save_photo(
                owner.id,
                "Sunset",
                None,
                "sunset.jpg",
                "key-1.jpg",
                "image/jpeg",
                Visibility::Public,
                4,
            )
            .await
            .unwrap();

        state
            .db_client
            .upsert_share(photo.id, grantee.id, PermissionLevel::Admin)
            .await
            .unwrap();

        let auth = MaybeAuth {
            user: Some(grantee),
        };

        let listing = list_public_photos(
            State(state.clone()),
            Extension(auth.clone()),
            Query(RequestQueryDto {
                page: None,
                limit: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        let listing: PhotoListResponseDto = body_json(listing).await;

        assert_eq!(listing.results, 1);
        assert!(listing.photos[0].can_edit);
        assert!(listing.photos[0].can_comment);

        let single = get_photo(State(state), Extension(auth), Path(photo.id))
            .await
            .unwrap()
            .into_response();
        let single: PhotoResponseDto = body_json(single).await;

        assert_eq!(single.data.photo.can_edit, listing.photos[0].can_edit);
        assert_eq!(single.data.photo.can_comment, listing.photos[0].can_comment);
    }

    #[sqlx::test]
    async fn public_listing_flags_stay_off_for_anonymous_visitors(pool: PgPool) {
        let (state, _dir) = test_state(pool).await;

        let owner = state
            .db_client
            .save_user("owner", "owner@example.com", "hash")
            .await
            .unwrap();
        state
            .db_client
            .save_photo(
                owner.id,
                "Sunset",
                None,
                "sunset.jpg",
                "key-1.jpg",
                "image/jpeg",
                Visibility::Public,
                4,
            )
            .await
            .unwrap();

        let listing = list_public_photos(
            State(state),
            Extension(MaybeAuth { user: None }),
            Query(RequestQueryDto {
                page: None,
                limit: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        let listing: PhotoListResponseDto = body_json(listing).await;

        assert_eq!(listing.results, 1);
        assert!(!listing.photos[0].can_edit);
        assert!(!listing.photos[0].can_comment);
    }
}
