use super::DBClient;
use crate::models::Comment;
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "id, photo_id, author_id, content, created_at";

/// Comment operations trait
pub trait CommentExt {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error>;

    /// Comments on one photo, oldest first
    async fn get_comments_for_photo(
        &self,
        photo_id: i64,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Comment>, sqlx::Error>;

    async fn get_comment_count_for_photo(&self, photo_id: i64) -> Result<i64, sqlx::Error>;

    async fn save_comment(
        &self,
        photo_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error>;

    /// Returns whether a row was deleted.
    async fn delete_comment(&self, comment_id: i64) -> Result<bool, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_comments_for_photo(
        &self,
        photo_id: i64,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE photo_id = $1 \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3"
        ))
        .bind(photo_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_comment_count_for_photo(&self, photo_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE photo_id = $1")
            .bind(photo_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_comment(
        &self,
        photo_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (photo_id, author_id, content) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(photo_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
