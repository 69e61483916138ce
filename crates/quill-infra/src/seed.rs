//! Sample data: categories, tags and threaded comments.

use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use quill_core::domain::{Category, Comment, Tag, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    CategoryRepository, CommentRepository, PostRepository, TagRepository, UserRepository,
};

pub const CATEGORIES: [&str; 8] = [
    "Technology",
    "Travel",
    "Food",
    "Lifestyle",
    "Business",
    "Health",
    "Education",
    "Entertainment",
];

pub const TAGS: [&str; 15] = [
    "Web Development",
    "Mobile Apps",
    "AI",
    "Machine Learning",
    "Data Science",
    "Cloud Computing",
    "Cybersecurity",
    "Programming",
    "DevOps",
    "UI/UX",
    "Frontend",
    "Backend",
    "Database",
    "API",
    "Testing",
];

const COMMENTS: [&str; 10] = [
    "Great article! Really helpful insights.",
    "Thank you for sharing this valuable information.",
    "I've been looking for something like this. Perfect timing!",
    "Excellent explanation. This cleared up my confusion.",
    "Amazing content! Keep up the great work.",
    "This is exactly what I needed to know.",
    "Well written and easy to understand.",
    "Thanks for the detailed breakdown.",
    "Really appreciate you taking the time to write this.",
    "This helped me solve my problem. Thank you!",
];

const REPLIES: [&str; 10] = [
    "I totally agree with your point!",
    "Thanks for the additional context.",
    "That's a great perspective.",
    "Exactly what I was thinking!",
    "You're absolutely right.",
    "Thanks for clarifying that.",
    "Good point, I hadn't considered that.",
    "I appreciate your insight.",
    "That makes perfect sense.",
    "Thanks for the follow-up!",
];

/// Insert the fixed category list, skipping slugs that already exist.
/// Returns how many rows were created.
pub async fn seed_categories(repo: &dyn CategoryRepository) -> Result<usize, RepoError> {
    let mut created = 0;
    for name in CATEGORIES {
        let category = Category::new(name, Some(format!("Articles about {}", name.to_lowercase())));
        if repo.find_by_slug(&category.slug).await?.is_some() {
            continue;
        }
        repo.save(category).await?;
        created += 1;
    }

    tracing::info!(created, "Seeded categories");
    Ok(created)
}

/// Insert the fixed tag list, skipping slugs that already exist.
pub async fn seed_tags(repo: &dyn TagRepository) -> Result<usize, RepoError> {
    let mut created = 0;
    for name in TAGS {
        let tag = Tag::new(name);
        if repo.find_by_slug(&tag.slug).await?.is_some() {
            continue;
        }
        repo.save(tag).await?;
        created += 1;
    }

    tracing::info!(created, "Seeded tags");
    Ok(created)
}

/// Give every post 2-4 approved root comments from random users, each with a
/// coin-flip chance of 1-2 replies. Does nothing without users or posts.
pub async fn seed_comments<R: Rng + Send>(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    comments: &dyn CommentRepository,
    rng: &mut R,
) -> Result<usize, RepoError> {
    let authors = users.all().await?;
    let posts = posts.all().await?;
    if authors.is_empty() || posts.is_empty() {
        tracing::info!("No users or posts, skipping comments");
        return Ok(0);
    }

    let mut created = 0;
    for post in &posts {
        for _ in 0..rng.gen_range(2..=4) {
            let root = canned(rng, &authors, post.id, None, &COMMENTS, 30);
            let root = comments.save(root).await?;
            created += 1;

            if rng.gen_bool(0.5) {
                for _ in 0..rng.gen_range(1..=2) {
                    let reply = canned(rng, &authors, post.id, Some(root.id), &REPLIES, 25);
                    comments.save(reply).await?;
                    created += 1;
                }
            }
        }
    }

    tracing::info!(created, posts = posts.len(), "Seeded comments");
    Ok(created)
}

fn canned<R: Rng>(
    rng: &mut R,
    authors: &[User],
    post_id: Uuid,
    parent_id: Option<Uuid>,
    texts: &[&str],
    max_days_ago: i64,
) -> Comment {
    let author = authors.choose(rng).map_or(authors[0].id, |u| u.id);
    let content = texts.choose(rng).copied().unwrap_or(texts[0]);

    let mut comment = Comment::new(post_id, author, parent_id, content.to_string());
    comment.created_at = Utc::now() - Duration::days(rng.gen_range(0..=max_days_ago));
    comment.updated_at = comment.created_at;
    comment
}
