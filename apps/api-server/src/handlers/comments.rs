//! Threaded comments on posts.

use actix_web::{HttpResponse, web};

use quill_core::domain::{Comment, build_threads};
use quill_core::validation::Validator;
use quill_shared::MessageResponse;
use quill_shared::dto::{CommentRequest, CommentResponse};

use super::{parse_id, presenter};
use crate::middleware::{AppError, AppResult, Identity, OptionalIdentity};
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 1000;

fn content(v: &mut Validator, raw: Option<&str>) -> Option<String> {
    let content = v.required("content", raw);
    if let Some(content) = &content {
        v.max_chars("content", content, MAX_COMMENT_CHARS);
    }
    content
}

async fn visible_post_id(
    state: &AppState,
    raw_id: &str,
    viewer: Option<uuid::Uuid>,
) -> AppResult<uuid::Uuid> {
    let id = parse_id(raw_id, "Post")?;
    match state.posts.find_by_id(id).await? {
        Some(post) if post.is_visible_to(viewer) => Ok(post.id),
        _ => Err(AppError::NotFound(format!("Post with id {id} not found"))),
    }
}

async fn owned_comment(state: &AppState, raw_id: &str, identity: &Identity) -> AppResult<Comment> {
    let id = parse_id(raw_id, "Comment")?;
    let comment = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment with id {id} not found")))?;
    if !comment.is_owned_by(identity.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(comment)
}

async fn render(state: &AppState, comment: &Comment) -> AppResult<CommentResponse> {
    let entry = state
        .comments
        .find_with_author(comment.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment with id {} not found", comment.id)))?;
    Ok(presenter::comment(entry, state.storage.as_ref()))
}

/// GET /api/posts/{id}/comments
///
/// Root comments newest first, each with its replies oldest first.
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = visible_post_id(&state, &path, identity.user_id()).await?;
    let comments = state.comments.for_post(post_id).await?;

    let storage = state.storage.as_ref();
    let threads: Vec<CommentResponse> = build_threads(comments)
        .into_iter()
        .map(|thread| presenter::thread(thread, storage))
        .collect();
    Ok(HttpResponse::Ok().json(threads))
}

/// POST /api/posts/{id}/comments
///
/// A reply to a reply is attached to the thread's root comment, so threads
/// stay one level deep.
pub async fn store(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let post_id = visible_post_id(&state, &path, Some(identity.user_id)).await?;
    let req = body.into_inner();
    let mut v = Validator::new();

    let content = content(&mut v, req.content.as_deref());

    let mut parent_id = None;
    if let Some(raw) = v.optional(req.parent_id.as_deref()) {
        let target = match uuid::Uuid::parse_str(&raw) {
            Ok(id) => state.comments.find_by_id(id).await?,
            Err(_) => None,
        };
        match target {
            Some(target) if target.post_id == post_id => {
                parent_id = Some(Comment::thread_root_of(&target));
            }
            _ => v.fail("parent_id", "The selected parent id is invalid."),
        }
    }
    v.finish()?;

    let Some(content) = content else {
        return Err(AppError::Internal("validated fields missing".to_string()));
    };
    let comment = state
        .comments
        .save(Comment::new(post_id, identity.user_id, parent_id, content))
        .await?;
    tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment created");

    Ok(HttpResponse::Created().json(render(&state, &comment).await?))
}

/// PUT /api/comments/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let mut comment = owned_comment(&state, &path, &identity).await?;

    let mut v = Validator::new();
    let content = content(&mut v, body.content.as_deref());
    v.finish()?;
    let Some(content) = content else {
        return Err(AppError::Internal("validated fields missing".to_string()));
    };

    comment.edit(content);
    let comment = state.comments.save(comment).await?;

    Ok(HttpResponse::Ok().json(render(&state, &comment).await?))
}

/// DELETE /api/comments/{id}
///
/// Replies go with their parent.
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let comment = owned_comment(&state, &path, &identity).await?;
    state.comments.delete(comment.id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Comment deleted successfully")))
}
