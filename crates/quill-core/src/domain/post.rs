use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Tag, User};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub const ALL: [&'static str; 2] = ["draft", "published"];

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

/// Post entity - represents a blog post or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PostStatus,
    /// Storage path on the public disk.
    pub featured_image: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post from validated input and a slug already checked for collisions.
    pub fn new(user_id: Uuid, changes: PostChanges, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            category_id: changes.category_id,
            title: changes.title,
            slug,
            content: changes.content,
            status: changes.status,
            featured_image: None,
            view_count: 0,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Drafts are only visible to their author.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.status == PostStatus::Published || viewer.is_some_and(|id| self.is_owned_by(id))
    }

    /// Apply an edit. The slug is always re-derived by the caller from the new title.
    pub fn apply(&mut self, changes: PostChanges, slug: String) {
        self.title = changes.title;
        self.content = changes.content;
        self.category_id = changes.category_id;
        self.status = changes.status;
        self.slug = slug;
        self.updated_at = Utc::now();
    }
}

/// Validated create/update input. Tags are optional: `None` leaves the
/// existing links alone, `Some(vec![])` detaches every tag.
#[derive(Debug, Clone, PartialEq)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub status: PostStatus,
    pub tags: Option<Vec<Uuid>>,
}

/// A post with `user`, `category` and `tags` loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetails {
    pub post: Post,
    pub author: User,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

/// A post in the author's dashboard listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub post: Post,
    pub author: User,
    pub category: Option<Category>,
    pub comments_count: u64,
}

/// Which posts a listing may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVisibility {
    /// Anonymous readers and explicit `public` listings.
    PublishedOnly,
    /// Signed-in readers: everything published plus their own drafts.
    PublishedOrOwnedBy(Uuid),
    /// `user_posts` listings: only the caller's posts, any status.
    OwnedBy(Uuid),
}

impl PostVisibility {
    /// Resolve the listing mode from the caller and the `public`/`user_posts` flags.
    pub fn for_listing(viewer: Option<Uuid>, public: bool, user_posts: bool) -> Self {
        match viewer {
            None => PostVisibility::PublishedOnly,
            Some(_) if public => PostVisibility::PublishedOnly,
            Some(id) if user_posts => PostVisibility::OwnedBy(id),
            Some(id) => PostVisibility::PublishedOrOwnedBy(id),
        }
    }

    pub fn allows(&self, post: &Post) -> bool {
        match *self {
            PostVisibility::PublishedOnly => post.status == PostStatus::Published,
            PostVisibility::PublishedOrOwnedBy(id) => post.is_visible_to(Some(id)),
            PostVisibility::OwnedBy(id) => post.is_owned_by(id),
        }
    }
}

/// Filters for the post listing; all present filters must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    /// Substring matched against title or content.
    pub search: Option<String>,
    pub visibility: PostVisibility,
}

impl PostFilter {
    pub fn new(visibility: PostVisibility) -> Self {
        Self {
            category_id: None,
            tag_id: None,
            search: None,
            visibility,
        }
    }

    /// Evaluate the filter in memory; `tag_ids` are the post's attached tags.
    pub fn matches(&self, post: &Post, tag_ids: &[Uuid]) -> bool {
        if !self.visibility.allows(post) {
            return false;
        }
        if self.category_id.is_some_and(|c| c != post.category_id) {
            return false;
        }
        if self.tag_id.is_some_and(|t| !tag_ids.contains(&t)) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                post.title.to_lowercase().contains(&term)
                    || post.content.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}
