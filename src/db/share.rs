use super::DBClient;
use crate::models::{PermissionLevel, Share};
use uuid::Uuid;

const SHARE_COLUMNS: &str = "id, photo_id, user_id, permission, created_at";

/// Share (ACL grant) operations trait
pub trait ShareExt {
    /// All grants on one photo, oldest first
    async fn get_shares_for_photo(&self, photo_id: i64) -> Result<Vec<Share>, sqlx::Error>;

    /// The grant a specific user holds on a photo, if any
    async fn get_share(
        &self,
        photo_id: i64,
        user_id: Uuid,
    ) -> Result<Option<Share>, sqlx::Error>;

    /// Grant or replace a permission level. A second grant for the same
    /// (photo, user) pair overwrites the previous level rather than stacking.
    async fn upsert_share(
        &self,
        photo_id: i64,
        user_id: Uuid,
        permission: PermissionLevel,
    ) -> Result<Share, sqlx::Error>;

    /// Revoke a grant. Returns whether one existed.
    async fn delete_share(&self, photo_id: i64, user_id: Uuid) -> Result<bool, sqlx::Error>;
}

impl ShareExt for DBClient {
    async fn get_shares_for_photo(&self, photo_id: i64) -> Result<Vec<Share>, sqlx::Error> {
        sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE photo_id = $1 ORDER BY created_at ASC"
        ))
        .bind(photo_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_share(
        &self,
        photo_id: i64,
        user_id: Uuid,
    ) -> Result<Option<Share>, sqlx::Error> {
        sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE photo_id = $1 AND user_id = $2"
        ))
        .bind(photo_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_share(
        &self,
        photo_id: i64,
        user_id: Uuid,
        permission: PermissionLevel,
    ) -> Result<Share, sqlx::Error> {
        sqlx::query_as::<_, Share>(&format!(
            "INSERT INTO shares (photo_id, user_id, permission) VALUES ($1, $2, $3) \
             ON CONFLICT (photo_id, user_id) DO UPDATE SET permission = EXCLUDED.permission \
             RETURNING {SHARE_COLUMNS}"
        ))
        .bind(photo_id)
        .bind(user_id)
        .bind(permission)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_share(&self, photo_id: i64, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shares WHERE photo_id = $1 AND user_id = $2")
            .bind(photo_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
