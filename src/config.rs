#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub frontend_url: String,
    pub upload_dir: String,
    pub thumbnail_dir: String,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");
        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads/photos".to_string());
        let thumbnail_dir =
            std::env::var("THUMBNAIL_DIR").unwrap_or_else(|_| "./uploads/thumbnails".to_string());
        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_email = std::env::var("ADMIN_EMAIL").expect("ADMIN_EMAIL must be set");
        let admin_password = std::env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set");
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().expect("JWT_MAXAGE must be a number"),
            port,
            frontend_url,
            upload_dir,
            thumbnail_dir,
            admin_username,
            admin_email,
            admin_password,
        }
    }
}
