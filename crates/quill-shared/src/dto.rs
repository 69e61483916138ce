//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ── Auth ──

/// Request to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Request to login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Issued after register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

// ── Users ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinkDto {
    pub platform: String,
    pub url: String,
}

/// A user's public profile. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub social_links: Vec<SocialLinkDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile update; also accepted as multipart with an `avatar` file and
/// `social_links[i][platform]` style fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub social_links: Option<Vec<SocialLinkInput>>,
}

/// Unvalidated social link as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinkInput {
    pub platform: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Totals shown on a user's dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatsResponse {
    pub posts: u64,
    pub likes: i64,
    pub comments: u64,
}

// ── Taxonomy ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

// ── Posts ──

/// Query string accepted by `GET /api/posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostListQuery {
    pub category_id: Option<String>,
    pub tag_id: Option<String>,
    pub search: Option<String>,
    pub public: Option<String>,
    pub user_posts: Option<String>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage {
    Number(u64),
    Signed(i64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Anything that is not a positive whole number reads as "no page".
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let page = match Option::<RawPage>::deserialize(deserializer)? {
        Some(RawPage::Number(n)) => Some(n),
        Some(RawPage::Text(text)) => text.trim().parse().ok(),
        Some(RawPage::Signed(_) | RawPage::Other(_)) | None => None,
    };
    Ok(page.filter(|&n| n > 0))
}

/// Create/update payload; also accepted as multipart with a
/// `featured_image` file and `tags[]` fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A post with its author, category and tags loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: String,
    pub featured_image: Option<String>,
    pub featured_image_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserResponse,
    pub category: Option<CategoryResponse>,
    pub tags: Vec<TagResponse>,
}

/// Row of the "my posts" dashboard listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPostResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: String,
    /// Absolute public URL rather than the storage path.
    pub featured_image: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comments_count: u64,
    pub likes_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserResponse,
    pub category: Option<CategoryResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: i64,
}

// ── Comments ──

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserResponse,
    /// Present on root comments in a thread listing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replies: Option<Vec<CommentResponse>>,
}
