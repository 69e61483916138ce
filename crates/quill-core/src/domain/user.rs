use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a profile's link list, e.g. `{platform: "github", url: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// User entity - an author, commenter and profile owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    /// Storage path of the avatar image, relative to the public disk.
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub social_links: Vec<SocialLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamps and an empty profile.
    pub fn new(name: String, username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            username,
            email,
            password_hash,
            bio: None,
            avatar: None,
            website: None,
            social_links: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable profile fields. The avatar is handled separately
    /// because replacing it also removes the old file.
    pub fn apply_profile(&mut self, profile: ProfileChanges) {
        self.name = profile.name;
        self.username = profile.username;
        self.email = profile.email;
        self.bio = profile.bio;
        self.website = profile.website;
        self.social_links = profile.social_links;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Validated profile edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub social_links: Vec<SocialLink>,
}

/// Dashboard totals for an author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorStats {
    pub posts: u64,
    pub likes: i64,
    /// Comments left on the author's posts, by anyone.
    pub comments: u64,
}

/// Hide most of an email address before it reaches the logs.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            if local.chars().count() > 1 {
                format!("{first}***@{domain}")
            } else {
                format!("***@{domain}")
            }
        }
        None => "***".to_string(),
    }
}
