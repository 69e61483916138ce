use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::User;

/// Comment entity. A comment with a `parent_id` is a reply; replies are never
/// parents themselves, so a thread is at most two levels deep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// New comments are approved straight away; there is no moderation queue.
    pub fn new(post_id: Uuid, user_id: Uuid, parent_id: Option<Uuid>, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            parent_id,
            content,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn edit(&mut self, content: String) {
        self.content = content;
        self.updated_at = Utc::now();
    }

    /// Parent to store for a reply to `target`: replies to a reply attach to
    /// that reply's root so threads stay two levels deep.
    pub fn thread_root_of(target: &Comment) -> Uuid {
        target.parent_id.unwrap_or(target.id)
    }
}

/// A comment with its `user` loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: User,
}

/// A root comment and its replies.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub root: CommentWithAuthor,
    pub replies: Vec<CommentWithAuthor>,
}

/// Group a post's comments into threads.
///
/// Unapproved comments are dropped. Roots come newest first, replies oldest
/// first. Replies whose root is missing or unapproved are dropped with it.
pub fn build_threads(comments: Vec<CommentWithAuthor>) -> Vec<CommentThread> {
    let (roots, replies): (Vec<_>, Vec<_>) = comments
        .into_iter()
        .filter(|c| c.comment.is_approved)
        .partition(|c| !c.comment.is_reply());

    let mut threads: Vec<CommentThread> = roots
        .into_iter()
        .map(|root| CommentThread {
            root,
            replies: Vec::new(),
        })
        .collect();
    threads.sort_by(|a, b| b.root.comment.created_at.cmp(&a.root.comment.created_at));

    for reply in replies {
        if let Some(thread) = threads
            .iter_mut()
            .find(|t| Some(t.root.comment.id) == reply.comment.parent_id)
        {
            thread.replies.push(reply);
        }
    }
    for thread in &mut threads {
        thread
            .replies
            .sort_by(|a, b| a.comment.created_at.cmp(&b.comment.created_at));
    }

    threads
}
