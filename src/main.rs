mod access;
mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod storage;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::{DBClient, UserExt};
use dotenv::dotenv;
use models::UserRole;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storage::FileStorage;
use tower_http::cors::CorsLayer;
use utils::password;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: db::DBClient,
    pub storage: storage::FileStorage,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _guard = tracing_config::init_tracing();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().unwrap())
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    let storage = match FileStorage::new(&config.upload_dir, &config.thumbnail_dir).await {
        Ok(storage) => storage,
        Err(err) => {
            tracing::error!("Failed to initialize file storage: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = seed_admin(&db_client, &config).await {
        tracing::error!("Failed to seed admin account: {:?}", err);
        std::process::exit(1);
    }

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        storage,
    };

    let app = routes::create_router(app_state).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}

/// Ensure the configured admin account exists with the admin role.
/// Runs on every start; an existing account is left alone apart from a
/// role promotion if it somehow lost it.
async fn seed_admin(db_client: &DBClient, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let existing = db_client
        .get_user(None, Some(&config.admin_username), None)
        .await?;

    match existing {
        Some(user) if user.role != UserRole::Admin => {
            db_client.update_user_role(user.id, UserRole::Admin).await?;
            tracing::info!(username = %user.username, "promoted seeded account to admin");
        }
        Some(_) => {}
        None => {
            let hash = password::hash(&config.admin_password).map_err(|e| e.to_string())?;
            let user = db_client
                .save_user(&config.admin_username, &config.admin_email, &hash)
                .await?;
            db_client.update_user_role(user.id, UserRole::Admin).await?;
            tracing::info!(username = %user.username, "seeded admin account");
        }
    }

    Ok(())
}
