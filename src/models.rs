use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global user role, stored as the PostgreSQL ENUM "user_role".
///
/// Moderators can view and moderate any photo/comment but cannot manage
/// accounts; admins can do everything.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

/// Photo visibility, stored as the PostgreSQL ENUM "photo_visibility".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "photo_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

/// Share permission level, stored as the PostgreSQL ENUM "share_permission".
///
/// The variants are declared in ascending order so the derived `Ord` gives
/// the total order Read < Comment < Admin. `at_least` is the only place the
/// "higher level implies lower levels" rule lives; callers must never compare
/// against individual variants to answer capability questions.
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "share_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Comment,
    Admin,
}

impl PermissionLevel {
    /// True if this level grants every capability of `required`.
    pub fn at_least(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

/// User account row.
///
/// `password_hash` is an argon2 PHC string, never exposed in responses.
/// `enabled = false` means the account is banned: login is refused and the
/// access resolver treats the principal as anonymous.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Photo metadata row. The bytes live on disk under `storage_key`.
///
/// `storage_key` is generated by the upload pipeline (UUID + extension),
/// unique and immutable; `original_filename` is the untrusted client name,
/// kept for display only. `content_type` is the sniffed type, not whatever
/// the client declared.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Photo {
    pub id: i64,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub original_filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub visibility: Visibility,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Album row. Photos are attached through the album_photos association
/// table; deleting an album never deletes photos.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Album {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// ACL grant: one row per (photo, grantee) holding the current level.
/// The photo owner never appears as a grantee; owner rights are implicit.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Share {
    pub id: i64,
    pub photo_id: i64,
    pub user_id: Uuid,
    pub permission: PermissionLevel,
    pub created_at: DateTime<Utc>,
}

/// Comment on a photo.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub photo_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
