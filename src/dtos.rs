use crate::models::{Album, Comment, PermissionLevel, Photo, Share, User, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// DTOs define the structure of data exchanged with clients. They are separate
// from database models to control exactly what data is exposed.

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Registration request from client
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "confirmPassword")]
    pub password_confirm: String,
}

/// Login request - accepts email or username
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

// ============================================================================
// Pagination & Query DTOs
// ============================================================================

/// Generic pagination query parameters
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

impl RequestQueryDto {
    pub fn page_and_limit(&self) -> (u32, usize) {
        (self.page.unwrap_or(1), self.limit.unwrap_or(10))
    }
}

// ============================================================================
// User Response DTOs (filtered data for client)
// ============================================================================

/// Filtered user data sent to clients (excludes the password hash)
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub enabled: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            enabled: user.enabled,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

/// Own profile with content counts
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeData {
    pub user: FilterUserDto,
    #[serde(rename = "photoCount")]
    pub photo_count: i64,
    #[serde(rename = "albumCount")]
    pub album_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeResponseDto {
    pub status: String,
    pub data: UserMeData,
}

/// User list with count (admin view)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
}

// ============================================================================
// Admin request DTOs
// ============================================================================

/// Role change request; the string is parsed against the known roles so an
/// unknown role is a 400, not a silent default.
#[derive(Validate, Debug, Serialize, Deserialize)]
pub struct RoleUpdateDto {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

// ============================================================================
// Photo DTOs
// ============================================================================

/// Photo metadata sent to clients.
///
/// `can_edit` and `can_comment` are computed for the requesting principal so
/// the frontend can show or hide controls without a second round trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoDto {
    pub id: i64,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "originalFilename")]
    pub original_filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub visibility: Visibility,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: i64,
    #[serde(rename = "canEdit")]
    pub can_edit: bool,
    #[serde(rename = "canComment")]
    pub can_comment: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl PhotoDto {
    pub fn from_photo(photo: &Photo, can_edit: bool, can_comment: bool) -> Self {
        PhotoDto {
            id: photo.id,
            owner_id: photo.owner_id.to_string(),
            title: photo.title.to_owned(),
            description: photo.description.to_owned(),
            original_filename: photo.original_filename.to_owned(),
            content_type: photo.content_type.to_owned(),
            visibility: photo.visibility,
            size_bytes: photo.size_bytes,
            can_edit,
            can_comment,
            created_at: photo.created_at,
            updated_at: photo.updated_at,
        }
    }
}

/// Metadata fields accompanying a multipart upload
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PhotoUploadDto {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub visibility: Option<Visibility>,
}

/// Partial metadata update; absent fields are left unchanged
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PhotoUpdateDto {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoData {
    pub photo: PhotoDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoResponseDto {
    pub status: String,
    pub data: PhotoData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoListResponseDto {
    pub status: String,
    pub photos: Vec<PhotoDto>,
    pub results: i64,
}

// ============================================================================
// Share DTOs
// ============================================================================

/// Grant request: share a photo with a user at a permission level.
/// Granting again to the same user replaces the level.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ShareCreateDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub permission: PermissionLevel,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareDto {
    pub id: i64,
    #[serde(rename = "photoId")]
    pub photo_id: i64,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub permission: PermissionLevel,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ShareDto {
    pub fn from_share(share: &Share, username: &str) -> Self {
        ShareDto {
            id: share.id,
            photo_id: share.photo_id,
            user_id: share.user_id.to_string(),
            username: username.to_string(),
            permission: share.permission,
            created_at: share.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponseDto {
    pub status: String,
    pub share: ShareDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareListResponseDto {
    pub status: String,
    pub shares: Vec<ShareDto>,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CommentCreateDto {
    #[validate(length(min = 1, max = 2000, message = "Comment must be 1 to 2000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i64,
    #[serde(rename = "photoId")]
    pub photo_id: i64,
    #[serde(rename = "authorId")]
    pub author_id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl CommentDto {
    pub fn from_comment(comment: &Comment) -> Self {
        CommentDto {
            id: comment.id,
            photo_id: comment.photo_id,
            author_id: comment.author_id.to_string(),
            content: comment.content.to_owned(),
            created_at: comment.created_at,
        }
    }

    pub fn from_comments(comments: &[Comment]) -> Vec<CommentDto> {
        comments.iter().map(CommentDto::from_comment).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponseDto {
    pub status: String,
    pub comment: CommentDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponseDto {
    pub status: String,
    pub comments: Vec<CommentDto>,
    pub results: i64,
}

// ============================================================================
// Album DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct AlbumCreateDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct AlbumUpdateDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlbumDto {
    pub id: i64,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl AlbumDto {
    pub fn from_album(album: &Album) -> Self {
        AlbumDto {
            id: album.id,
            owner_id: album.owner_id.to_string(),
            name: album.name.to_owned(),
            description: album.description.to_owned(),
            created_at: album.created_at,
        }
    }

    pub fn from_albums(albums: &[Album]) -> Vec<AlbumDto> {
        albums.iter().map(AlbumDto::from_album).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlbumResponseDto {
    pub status: String,
    pub album: AlbumDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlbumListResponseDto {
    pub status: String,
    pub albums: Vec<AlbumDto>,
}

// ============================================================================
// Generic responses
// ============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
