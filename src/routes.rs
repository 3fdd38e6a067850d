use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        admin::admin_handler, album::album_handler, auth::auth_handler,
        comment::comment_handler, photo::photo_handler, users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        // Photo routes carry their own optional-auth middleware because the
        // public gallery must work without a login.
        .nest("/photos", photo_handler(app_state.clone()))
        .nest(
            "/comments",
            comment_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest(
            "/albums",
            album_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest(
            "/admin",
            admin_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
