use sqlx::{Pool, Postgres};

mod album;
mod comment;
mod photo;
mod share;
mod user;

pub use album::AlbumExt;
pub use comment::CommentExt;
pub use photo::PhotoExt;
pub use share::ShareExt;
pub use user::UserExt;

/// Database client wrapping the connection pool.
/// Domain operations live in per-entity extension traits implemented on this.
#[derive(Debug, Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
