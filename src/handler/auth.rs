use crate::{
    AppState,
    db::UserExt,
    dtos::{LoginUserDto, RegisterUserDto, Response, UserLoginResponseDto},
    error::{ErrorMessage, HttpError},
    utils::{password, token},
};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use time::Duration;
use validator::Validate;

use tracing::instrument;

/// Router for authentication endpoints
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Register a new user account with the default role
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.username, &body.email, &hash_password)
        .await;

    match result {
        Ok(user) => {
            tracing::info!(username = %user.username, "Register Successful");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message: "Registration successful! You can now log in.".to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) => {
            if db_err.is_unique_violation() {
                tracing::error!("DB error, saving user, unique_violation: {}", db_err);
                Err(HttpError::unique_constraint_violation(
                    "Username or email is already taken",
                ))
            } else {
                tracing::error!("DB error, saving user: {}", db_err);
                Err(HttpError::server_error(
                    ErrorMessage::ServerError.to_string(),
                ))
            }
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Login with email or username.
///
/// The same generic failure is returned for an unknown identifier and a
/// wrong password so the response does not reveal which accounts exist.
/// A disabled account is refused even with correct credentials.
#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request("Login failed")
    })?;

    // The identifier is an email when it contains '@', a username otherwise
    let result = if body.identifier.contains('@') {
        app_state
            .db_client
            .get_user(None, None, Some(&body.identifier))
            .await
    } else {
        app_state
            .db_client
            .get_user(None, Some(&body.identifier), None)
            .await
    };

    let user = result
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::warn!("Login failed: user not found");
            HttpError::unauthorized("Login failed")
        })?;

    let password_matched = password::compare(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized("Login failed")
    })?;

    if !password_matched {
        tracing::warn!("Login failed: wrong password");
        return Err(HttpError::unauthorized("Login failed"));
    }

    if !user.enabled {
        tracing::warn!(username = %user.username, "Login refused: account disabled");
        return Err(HttpError::forbidden(
            ErrorMessage::AccountDisabled.to_string(),
        ));
    }

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(Duration::seconds(app_state.env.jwt_maxage))
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    tracing::info!(username = %user.username, "Login Successful");

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token: access_token,
    });

    Ok((headers, response))
}

/// Clear the access token cookie
#[instrument]
pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let access_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .http_only(true)
        .max_age(Duration::seconds(0))
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    tracing::info!("logout successful");

    Ok((
        headers,
        Json(Response {
            status: "success",
            message: "Logged out".to_string(),
        }),
    ))
}
