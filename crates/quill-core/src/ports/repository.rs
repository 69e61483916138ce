use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthorStats, Category, Comment, CommentWithAuthor, Post, PostDetails, PostFilter,
    PostSummary, Tag, User,
};
use crate::error::RepoError;
use crate::pagination::{Page, PageRequest};

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Every user, for seeding.
    async fn all(&self) -> Result<Vec<User>, RepoError>;
}

#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    /// All categories ordered by name.
    async fn all(&self) -> Result<Vec<Category>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;
}

#[async_trait]
pub trait TagRepository: BaseRepository<Tag, Uuid> {
    /// All tags ordered by name.
    async fn all(&self) -> Result<Vec<Tag>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError>;

    /// Tags among `ids` that exist; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Filtered listing, newest first, with relations loaded.
    async fn paginate(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError>;

    /// One post with user, category and tags loaded.
    async fn find_details(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError>;

    /// Whether a post other than `except` already uses `slug`.
    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError>;

    /// Save the post and, when `tag_ids` is given, replace its tag links with
    /// exactly those tags. Either both happen or neither does.
    async fn save_with_tags(&self, post: Post, tag_ids: Option<&[Uuid]>)
    -> Result<Post, RepoError>;

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError>;

    /// Add `delta` to the like counter, never going below zero; returns the new value.
    async fn adjust_like_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError>;

    /// An author's posts, newest first, with comment counts.
    async fn paginate_by_author(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, RepoError>;

    async fn author_stats(&self, user_id: Uuid) -> Result<AuthorStats, RepoError>;

    /// Every post, for seeding.
    async fn all(&self) -> Result<Vec<Post>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Every comment on a post with its author; threading happens in the domain.
    async fn for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;

    async fn find_with_author(&self, id: Uuid) -> Result<Option<CommentWithAuthor>, RepoError>;
}
