use crate::{
    AppState, access,
    db::UserExt,
    dtos::{
        FilterUserDto, RequestQueryDto, Response, RoleUpdateDto, UserData,
        UserListResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use uuid::Uuid;
use validator::Validate;

use tracing::instrument;

/// Router for account administration; admin role only.
pub fn admin_handler() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users))
        .route("/users/{user_id}/enable", put(enable_user))
        .route("/users/{user_id}/disable", put(disable_user))
        .route("/users/{user_id}/role", put(update_role))
        .route("/users/{user_id}", delete(delete_user))
        .route_layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
}

/// List all accounts, paginated
#[instrument(skip(app_state, auth), fields(admin = %auth.user.username))]
pub async fn get_users(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let results = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, counting users: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results,
    }))
}

/// Re-enable a banned account
#[instrument(skip(app_state, auth), fields(admin = %auth.user.username))]
pub async fn enable_user(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    set_enabled(&app_state, &auth, user_id, true).await
}

/// Ban an account. The ban takes effect on the target's next request, not
/// just their next login. Admins cannot ban themselves.
#[instrument(skip(app_state, auth), fields(admin = %auth.user.username))]
pub async fn disable_user(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    set_enabled(&app_state, &auth, user_id, false).await
}

async fn set_enabled(
    app_state: &AppState,
    auth: &JWTAuthMiddleware,
    user_id: Uuid,
    enabled: bool,
) -> Result<impl IntoResponse + use<>, HttpError> {
    if !access::can_ban_user(&auth.user, user_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    require_target(app_state, user_id).await?;

    let user = app_state
        .db_client
        .set_user_enabled(user_id, enabled)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(
        target = %user.username,
        enabled,
        admin = %auth.user.username,
        "account status changed"
    );

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

/// Change an account's global role. Admins cannot change their own role,
/// so the system cannot lose its last administrator by accident.
#[instrument(skip(app_state, auth, body), fields(admin = %auth.user.username))]
pub async fn update_role(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::bad_request(e.to_string()))?;

    let role = match body.role.as_str() {
        "user" => UserRole::User,
        "moderator" => UserRole::Moderator,
        "admin" => UserRole::Admin,
        other => {
            return Err(HttpError::bad_request(format!("Unknown role: {}", other)));
        }
    };

    if !access::can_ban_user(&auth.user, user_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    require_target(&app_state, user_id).await?;

    let user = app_state
        .db_client
        .update_user_role(user_id, role)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating role: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(target = %user.username, role = role.to_str(), admin = %auth.user.username, "role changed");

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

/// Delete an account and everything it owns: photos (with blobs), albums,
/// comments, and grants in both directions. Admins cannot delete themselves.
#[instrument(skip(app_state, auth), fields(admin = %auth.user.username))]
pub async fn delete_user(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    if !access::can_ban_user(&auth.user, user_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    require_target(&app_state, user_id).await?;

    let storage_keys = app_state
        .db_client
        .delete_user_cascade(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // Blob cleanup after the commit; a missed file is logged, not fatal.
    for key in &storage_keys {
        if !app_state.storage.delete_photo(key).await {
            tracing::warn!(key, "photo blob was already missing on user delete");
        }
    }

    tracing::info!(
        target_id = %user_id,
        photos = storage_keys.len(),
        admin = %auth.user.username,
        "user deleted"
    );

    Ok(Json(Response {
        status: "success",
        message: "User deleted".to_string(),
    }))
}

async fn require_target(app_state: &AppState, user_id: Uuid) -> Result<(), HttpError> {
    app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::UserNoLongerExist.to_string()))?;

    Ok(())
}
