use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Extension inserted after successful authentication; handlers extract this
/// to get the authenticated user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

/// Extension inserted by `maybe_auth`: the principal if a valid token was
/// presented, or None for an anonymous request. Routes that serve public
/// content use this instead of `auth` so they stay reachable without login.
#[derive(Debug, Clone)]
pub struct MaybeAuth {
    pub user: Option<User>,
}

/// Pull the token from the `access_token` cookie (browser clients) or the
/// `Authorization: Bearer` header (API clients), in that order.
fn extract_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
    cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })
}

async fn resolve_user(app_state: &AppState, token: String) -> Result<User, HttpError> {
    let user_id_str = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user_id = uuid::Uuid::parse_str(&user_id_str)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    user.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
}

/// Authentication middleware that validates JWT tokens.
///
/// Extracts and decodes the token, loads the user, and attaches it to the
/// request extensions. A banned account is rejected here with 403 even when
/// its token is otherwise valid, so a ban takes effect immediately and not
/// only at the next login.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, &req)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let user = resolve_user(&app_state, token).await?;

    if !user.enabled {
        return Err(HttpError::forbidden(ErrorMessage::AccountDisabled.to_string()));
    }

    req.extensions_mut().insert(JWTAuthMiddleware { user });

    Ok(next.run(req).await)
}

/// Optional-authentication middleware for routes with public content.
///
/// A missing or invalid token is not an error: the request proceeds as
/// anonymous. A valid token for a disabled account also degrades to
/// anonymous, which keeps a banned user's reach identical to a logged-out
/// visitor's.
pub async fn maybe_auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let user = match extract_token(&cookie_jar, &req) {
        Some(token) => resolve_user(&app_state, token)
            .await
            .ok()
            .filter(|user| user.enabled),
        None => None,
    };

    req.extensions_mut().insert(MaybeAuth { user });

    Ok(next.run(req).await)
}

/// Role-based access control middleware; must run after `auth`.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}
