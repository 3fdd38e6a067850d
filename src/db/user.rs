use super::DBClient;
use crate::models::{User, UserRole};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, enabled, created_at, updated_at";

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, username, or email.
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Get paginated list of all users (admin view)
    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    /// Get total count of all users
    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    /// Create new user with the default role, enabled
    async fn save_user<T: Into<String> + Send>(
        &self,
        username: T,
        email: T,
        password_hash: T,
    ) -> Result<User, sqlx::Error>;

    /// Enable or disable (ban) an account
    async fn set_user_enabled(&self, user_id: Uuid, enabled: bool) -> Result<User, sqlx::Error>;

    /// Update user's global role
    async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> Result<User, sqlx::Error>;

    /// Delete a user and everything that depends on them, in one transaction.
    ///
    /// Removes, in dependency order: shares granted to the user, shares on
    /// their photos, their comments, comments on their photos, album
    /// memberships, their albums, their photos, and finally the user row.
    /// Returns the storage keys of the deleted photos so the caller can
    /// remove the blobs after the transaction commits.
    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        if let Some(user_id) = user_id {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
        } else if let Some(username) = username {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
        } else if let Some(email) = email {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
        } else {
            Ok(None)
        }
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn save_user<T: Into<String> + Send>(
        &self,
        username: T,
        email: T,
        password_hash: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username.into())
        .bind(email.into())
        .bind(password_hash.into())
        .fetch_one(&self.pool)
        .await
    }

    async fn set_user_enabled(&self, user_id: Uuid, enabled: bool) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET enabled = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Grants made to this user on other people's photos.
        sqlx::query("DELETE FROM shares WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Grants on this user's photos.
        sqlx::query(
            "DELETE FROM shares WHERE photo_id IN (SELECT id FROM photos WHERE owner_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        // Comments the user wrote anywhere.
        sqlx::query("DELETE FROM comments WHERE author_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Comments by anyone on the user's photos.
        sqlx::query(
            "DELETE FROM comments WHERE photo_id IN (SELECT id FROM photos WHERE owner_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        // Album memberships involving the user's photos or albums.
        sqlx::query(
            "DELETE FROM album_photos \
             WHERE photo_id IN (SELECT id FROM photos WHERE owner_id = $1) \
             OR album_id IN (SELECT id FROM albums WHERE owner_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM albums WHERE owner_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let storage_keys = sqlx::query_scalar::<_, String>(
            "DELETE FROM photos WHERE owner_id = $1 RETURNING storage_key",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(storage_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AlbumExt, CommentExt, PhotoExt, ShareExt};
    use crate::models::{PermissionLevel, Photo, Visibility};
    use sqlx::PgPool;

    async fn seed_photo(db: &DBClient, owner_id: Uuid, key: &str) -> Photo {
        db.save_photo(
            owner_id,
            "A photo",
            None,
            "photo.jpg",
            key,
            "image/jpeg",
            Visibility::Private,
            1,
        )
        .await
        .unwrap()
    }

    async fn comment_count(pool: &PgPool, photo_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE photo_id = $1")
            .bind(photo_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn user_cascade_removes_the_account_and_everything_it_touches(pool: PgPool) {
        let db = DBClient::new(pool.clone());

        let alice = db.save_user("alice", "alice@example.com", "hash").await.unwrap();
        let bob = db.save_user("bob", "bob@example.com", "hash").await.unwrap();
        let carol = db.save_user("carol", "carol@example.com", "hash").await.unwrap();

        let alices_photo = seed_photo(&db, alice.id, "alice-1.jpg").await;
        let bobs_photo = seed_photo(&db, bob.id, "bob-1.jpg").await;

        // Grants in both directions plus one that involves neither side.
        db.upsert_share(alices_photo.id, bob.id, PermissionLevel::Read)
            .await
            .unwrap();
        db.upsert_share(bobs_photo.id, alice.id, PermissionLevel::Comment)
            .await
            .unwrap();
        db.upsert_share(bobs_photo.id, carol.id, PermissionLevel::Read)
            .await
            .unwrap();

        db.save_comment(bobs_photo.id, alice.id, "by alice, elsewhere")
            .await
            .unwrap();
        db.save_comment(alices_photo.id, bob.id, "by bob, on hers")
            .await
            .unwrap();
        db.save_comment(bobs_photo.id, bob.id, "by bob, on his own")
            .await
            .unwrap();

        let album = db.save_album(alice.id, "Trip", None).await.unwrap();
        assert!(db.add_photo_to_album(album.id, alices_photo.id).await.unwrap());

        let keys = db.delete_user_cascade(alice.id).await.unwrap();
        assert_eq!(keys, vec![alices_photo.storage_key.clone()]);

        // Everything alice owned or was granted is gone.
        assert!(db.get_user(Some(alice.id), None, None).await.unwrap().is_none());
        assert!(db.get_photo(alices_photo.id).await.unwrap().is_none());
        assert!(db.get_album(album.id).await.unwrap().is_none());
        assert!(db.get_share(bobs_photo.id, alice.id).await.unwrap().is_none());
        assert_eq!(comment_count(&pool, alices_photo.id).await, 0);

        let memberships: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM album_photos WHERE photo_id = $1")
                .bind(alices_photo.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(memberships, 0);

        // Bystanders keep their rows: bob's account and photo, his comment on
        // his own photo, and carol's grant on it.
        assert!(db.get_user(Some(bob.id), None, None).await.unwrap().is_some());
        assert!(db.get_photo(bobs_photo.id).await.unwrap().is_some());
        assert_eq!(comment_count(&pool, bobs_photo.id).await, 1);
        assert!(db.get_share(bobs_photo.id, carol.id).await.unwrap().is_some());
    }
}
