use super::DBClient;
use crate::models::{Album, Photo};
use uuid::Uuid;

const ALBUM_COLUMNS: &str = "id, owner_id, name, description, created_at";

/// Album operations trait
pub trait AlbumExt {
    async fn get_album(&self, album_id: i64) -> Result<Option<Album>, sqlx::Error>;

    /// Albums owned by one user, newest first
    async fn get_albums_by_owner(&self, owner_id: Uuid) -> Result<Vec<Album>, sqlx::Error>;

    async fn get_album_count_by_owner(&self, owner_id: Uuid) -> Result<i64, sqlx::Error>;

    async fn save_album(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Album, sqlx::Error>;

    async fn update_album(
        &self,
        album_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Album, sqlx::Error>;

    /// Delete an album and its memberships. The photos themselves are
    /// untouched. Returns whether the album existed.
    async fn delete_album(&self, album_id: i64) -> Result<bool, sqlx::Error>;

    /// Photos attached to an album, newest first
    async fn get_album_photos(&self, album_id: i64) -> Result<Vec<Photo>, sqlx::Error>;

    /// Attach a photo. Attaching twice is a no-op; returns whether the
    /// membership is new.
    async fn add_photo_to_album(&self, album_id: i64, photo_id: i64)
        -> Result<bool, sqlx::Error>;

    /// Detach a photo. Returns whether it was attached.
    async fn remove_photo_from_album(
        &self,
        album_id: i64,
        photo_id: i64,
    ) -> Result<bool, sqlx::Error>;
}

impl AlbumExt for DBClient {
    async fn get_album(&self, album_id: i64) -> Result<Option<Album>, sqlx::Error> {
        sqlx::query_as::<_, Album>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE id = $1"
        ))
        .bind(album_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_albums_by_owner(&self, owner_id: Uuid) -> Result<Vec<Album>, sqlx::Error> {
        sqlx::query_as::<_, Album>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_album_count_by_owner(&self, owner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM albums WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_album(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Album, sqlx::Error> {
        sqlx::query_as::<_, Album>(&format!(
            "INSERT INTO albums (owner_id, name, description) VALUES ($1, $2, $3) \
             RETURNING {ALBUM_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_album(
        &self,
        album_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Album, sqlx::Error> {
        sqlx::query_as::<_, Album>(&format!(
            "UPDATE albums SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description) \
             WHERE id = $1 \
             RETURNING {ALBUM_COLUMNS}"
        ))
        .bind(album_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_album(&self, album_id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM album_photos WHERE album_id = $1")
            .bind(album_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(album_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_album_photos(&self, album_id: i64) -> Result<Vec<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>(
            "SELECT p.id, p.owner_id, p.title, p.description, p.original_filename, \
             p.storage_key, p.content_type, p.visibility, p.size_bytes, p.created_at, p.updated_at \
             FROM photos p JOIN album_photos ap ON ap.photo_id = p.id \
             WHERE ap.album_id = $1 \
             ORDER BY p.created_at DESC",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_photo_to_album(
        &self,
        album_id: i64,
        photo_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO album_photos (album_id, photo_id) VALUES ($1, $2) \
             ON CONFLICT (album_id, photo_id) DO NOTHING",
        )
        .bind(album_id)
        .bind(photo_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_photo_from_album(
        &self,
        album_id: i64,
        photo_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM album_photos WHERE album_id = $1 AND photo_id = $2")
                .bind(album_id)
                .bind(photo_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
