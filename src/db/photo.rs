use super::DBClient;
use crate::models::{Photo, Visibility};
use uuid::Uuid;

const PHOTO_COLUMNS: &str = "id, owner_id, title, description, original_filename, storage_key, \
     content_type, visibility, size_bytes, created_at, updated_at";

/// Photo metadata operations trait
pub trait PhotoExt {
    async fn get_photo(&self, photo_id: i64) -> Result<Option<Photo>, sqlx::Error>;

    /// Photos owned by one user, newest first
    async fn get_photos_by_owner(
        &self,
        owner_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Photo>, sqlx::Error>;

    async fn get_photo_count_by_owner(&self, owner_id: Uuid) -> Result<i64, sqlx::Error>;

    /// The public gallery, newest first
    async fn get_public_photos(&self, page: u32, limit: usize) -> Result<Vec<Photo>, sqlx::Error>;

    async fn get_public_photo_count(&self) -> Result<i64, sqlx::Error>;

    /// Photos someone else shared with this user, newest grant first
    async fn get_photos_shared_with(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Photo>, sqlx::Error>;

    async fn get_shared_with_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Insert the metadata row for an already-stored blob
    #[allow(clippy::too_many_arguments)]
    async fn save_photo(
        &self,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        original_filename: &str,
        storage_key: &str,
        content_type: &str,
        visibility: Visibility,
        size_bytes: i64,
    ) -> Result<Photo, sqlx::Error>;

    /// Update title/description/visibility; untouched fields pass None
    async fn update_photo(
        &self,
        photo_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        visibility: Option<Visibility>,
    ) -> Result<Photo, sqlx::Error>;

    /// Delete a photo and its dependents (shares, comments, album
    /// memberships) in one transaction. Returns the storage key so the
    /// caller can remove the blob after commit, or None if the photo was
    /// already gone.
    async fn delete_photo_cascade(&self, photo_id: i64) -> Result<Option<String>, sqlx::Error>;
}

impl PhotoExt for DBClient {
    async fn get_photo(&self, photo_id: i64) -> Result<Option<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1"
        ))
        .bind(photo_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_photos_by_owner(
        &self,
        owner_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Photo>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE owner_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_photo_count_by_owner(&self, owner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM photos WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_public_photos(&self, page: u32, limit: usize) -> Result<Vec<Photo>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE visibility = 'public' \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_public_photo_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM photos WHERE visibility = 'public'")
            .fetch_one(&self.pool)
            .await
    }

    async fn get_photos_shared_with(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Photo>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, Photo>(&format!(
            "SELECT p.id, p.owner_id, p.title, p.description, p.original_filename, \
             p.storage_key, p.content_type, p.visibility, p.size_bytes, p.created_at, p.updated_at \
             FROM photos p JOIN shares s ON s.photo_id = p.id \
             WHERE s.user_id = $1 \
             ORDER BY s.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_shared_with_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shares WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_photo(
        &self,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        original_filename: &str,
        storage_key: &str,
        content_type: &str,
        visibility: Visibility,
        size_bytes: i64,
    ) -> Result<Photo, sqlx::Error> {
        sqlx::query_as::<_, Photo>(&format!(
            "INSERT INTO photos \
             (owner_id, title, description, original_filename, storage_key, content_type, visibility, size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(original_filename)
        .bind(storage_key)
        .bind(content_type)
        .bind(visibility)
        .bind(size_bytes)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_photo(
        &self,
        photo_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        visibility: Option<Visibility>,
    ) -> Result<Photo, sqlx::Error> {
        sqlx::query_as::<_, Photo>(&format!(
            "UPDATE photos SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             visibility = COALESCE($4, visibility), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(photo_id)
        .bind(title)
        .bind(description)
        .bind(visibility)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_photo_cascade(&self, photo_id: i64) -> Result<Option<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shares WHERE photo_id = $1")
            .bind(photo_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM comments WHERE photo_id = $1")
            .bind(photo_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM album_photos WHERE photo_id = $1")
            .bind(photo_id)
            .execute(&mut *tx)
            .await?;

        let storage_key = sqlx::query_scalar::<_, String>(
            "DELETE FROM photos WHERE id = $1 RETURNING storage_key",
        )
        .bind(photo_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AlbumExt, CommentExt, ShareExt, UserExt};
    use crate::models::PermissionLevel;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn photo_cascade_removes_dependents_and_returns_the_key(pool: PgPool) {
        let db = DBClient::new(pool.clone());

        let owner = db.save_user("owner", "owner@example.com", "hash").await.unwrap();
        let friend = db.save_user("friend", "friend@example.com", "hash").await.unwrap();

        let doomed = db
            .save_photo(
                owner.id,
                "Doomed",
                None,
                "doomed.jpg",
                "doomed-key.jpg",
                "image/jpeg",
                Visibility::Private,
                1,
            )
            .await
            .unwrap();
        let survivor = db
            .save_photo(
                owner.id,
                "Survivor",
                None,
                "survivor.jpg",
                "survivor-key.jpg",
                "image/jpeg",
                Visibility::Private,
                1,
            )
            .await
            .unwrap();

        db.upsert_share(doomed.id, friend.id, PermissionLevel::Read)
            .await
            .unwrap();
        db.upsert_share(survivor.id, friend.id, PermissionLevel::Read)
            .await
            .unwrap();
        db.save_comment(doomed.id, friend.id, "on the doomed one")
            .await
            .unwrap();
        db.save_comment(survivor.id, friend.id, "on the survivor")
            .await
            .unwrap();

        let album = db.save_album(owner.id, "Trip", None).await.unwrap();
        assert!(db.add_photo_to_album(album.id, doomed.id).await.unwrap());

        let key = db.delete_photo_cascade(doomed.id).await.unwrap();
        assert_eq!(key.as_deref(), Some("doomed-key.jpg"));

        // The photo and everything hanging off it are gone.
        assert!(db.get_photo(doomed.id).await.unwrap().is_none());
        assert!(db.get_share(doomed.id, friend.id).await.unwrap().is_none());
        assert_eq!(db.get_comment_count_for_photo(doomed.id).await.unwrap(), 0);

        let memberships: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM album_photos WHERE photo_id = $1")
                .bind(doomed.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(memberships, 0);

        // The owner, the album, and the sibling photo with its share and
        // comment are untouched.
        assert!(db.get_user(Some(owner.id), None, None).await.unwrap().is_some());
        assert!(db.get_album(album.id).await.unwrap().is_some());
        assert!(db.get_photo(survivor.id).await.unwrap().is_some());
        assert!(db.get_share(survivor.id, friend.id).await.unwrap().is_some());
        assert_eq!(db.get_comment_count_for_photo(survivor.id).await.unwrap(), 1);

        // A second delete finds nothing and reports no key.
        assert!(db.delete_photo_cascade(doomed.id).await.unwrap().is_none());
    }
}
