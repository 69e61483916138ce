//! Post CRUD, listing and likes.

use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::{
    MAX_IMAGE_KB, Post, PostChanges, PostFilter, PostStatus, PostVisibility, UploadedFile,
};
use quill_core::pagination::{DEFAULT_PER_PAGE, PageRequest};
use quill_core::slug;
use quill_core::validation::Validator;
use quill_shared::dto::{LikesResponse, PostListQuery, PostRequest};
use quill_shared::{MessageResponse, Paginated};

use super::forms::read_form;
use super::{flag, parse_id, presenter};
use crate::middleware::{AppError, AppResult, Identity, OptionalIdentity};
use crate::state::AppState;

const IMAGE_DIR: &str = "posts";

/// An image that passed validation, with the extension it will be stored under.
struct ImageUpload {
    file: UploadedFile,
    extension: &'static str,
}

/// `Err(())` means the filter can never match, e.g. a malformed id.
fn id_filter(raw: Option<&str>) -> Result<Option<Uuid>, ()> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s).map(Some).map_err(|_| ()),
    }
}

/// GET /api/posts
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<PostListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = PageRequest::new(query.page, DEFAULT_PER_PAGE);
    let visibility = PostVisibility::for_listing(
        identity.user_id(),
        flag(query.public.as_deref()),
        flag(query.user_posts.as_deref()),
    );

    let (Ok(category_id), Ok(tag_id)) = (
        id_filter(query.category_id.as_deref()),
        id_filter(query.tag_id.as_deref()),
    ) else {
        let empty: Paginated<()> = Paginated::new(Vec::new(), page.page, page.per_page, 0);
        return Ok(HttpResponse::Ok().json(empty));
    };

    let mut filter = PostFilter::new(visibility);
    filter.category_id = category_id;
    filter.tag_id = tag_id;
    filter.search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let results = state.posts.paginate(&filter, page).await?;
    let storage = state.storage.as_ref();
    Ok(HttpResponse::Ok().json(presenter::paginated(results, |d| presenter::post(d, storage))))
}

/// Validate a create/update payload, including the foreign keys and the image.
async fn validate(
    state: &AppState,
    req: PostRequest,
    image: Option<UploadedFile>,
) -> AppResult<(PostChanges, Option<ImageUpload>)> {
    let mut v = Validator::new();

    let title = v.required("title", req.title.as_deref());
    if let Some(title) = &title {
        v.max_chars("title", title, 255);
    }
    let content = v.required("content", req.content.as_deref());

    let category_id = match v.required("category_id", req.category_id.as_deref()) {
        Some(raw) => v.uuid("category_id", &raw),
        None => None,
    };
    if let Some(id) = category_id {
        if state.categories.find_by_id(id).await?.is_none() {
            v.fail("category_id", "The selected category id is invalid.");
        }
    }

    let status = v
        .required("status", req.status.as_deref())
        .and_then(|raw| v.one_of("status", &raw, &PostStatus::ALL))
        .and_then(|s| s.parse::<PostStatus>().ok());

    let tags = match req.tags {
        None => None,
        Some(raw) => {
            let mut ids = Vec::with_capacity(raw.len());
            for (i, value) in raw.iter().enumerate() {
                let field = format!("tags.{i}");
                if let Some(id) = v.uuid(&field, value.trim()) {
                    ids.push((field, id));
                }
            }
            let lookup: Vec<Uuid> = ids.iter().map(|(_, id)| *id).collect();
            let known = state.tags.find_many(&lookup).await?;
            for (field, id) in &ids {
                if !known.iter().any(|t| t.id == *id) {
                    v.fail(field, format!("The selected {field} is invalid."));
                }
            }
            let mut unique: Vec<Uuid> = Vec::new();
            for (_, id) in ids {
                if !unique.contains(&id) {
                    unique.push(id);
                }
            }
            Some(unique)
        }
    };

    let image = match image {
        None => None,
        Some(file) => match file.image_extension("featured_image", MAX_IMAGE_KB) {
            Ok(extension) => Some(ImageUpload { file, extension }),
            Err(message) => {
                v.fail("featured_image", message);
                None
            }
        },
    };

    v.finish()?;

    match (title, content, category_id, status) {
        (Some(title), Some(content), Some(category_id), Some(status)) => Ok((
            PostChanges {
                title,
                content,
                category_id,
                status,
                tags,
            },
            image,
        )),
        _ => Err(AppError::Internal("validated fields missing".to_string())),
    }
}

/// First free slug for `title`, ignoring the post being edited.
async fn unique_slug(state: &AppState, title: &str, except: Option<Uuid>) -> AppResult<String> {
    let base = slug::slugify(title);
    for candidate in slug::candidates(&base) {
        if !state.posts.slug_exists(&candidate, except).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal("slug candidates exhausted".to_string()))
}

async fn store_image(state: &AppState, image: Option<ImageUpload>) -> AppResult<Option<String>> {
    match image {
        Some(image) => Ok(Some(
            state
                .storage
                .put(IMAGE_DIR, &image.file, image.extension)
                .await?,
        )),
        None => Ok(None),
    }
}

/// Removes a file that is no longer referenced; failures are only logged.
pub(super) async fn discard_file(state: &AppState, path: Option<&str>) {
    if let Some(path) = path {
        if let Err(e) = state.storage.delete(path).await {
            tracing::warn!(path, error = %e, "Failed to delete stored file");
        }
    }
}

/// Load a post the caller may see; drafts of other authors are reported missing.
async fn visible_post(state: &AppState, raw_id: &str, viewer: Option<Uuid>) -> AppResult<Post> {
    let id = parse_id(raw_id, "Post")?;
    match state.posts.find_by_id(id).await? {
        Some(post) if post.is_visible_to(viewer) => Ok(post),
        _ => Err(AppError::NotFound(format!("Post with id {id} not found"))),
    }
}

/// Load a post and require the caller to own it.
async fn owned_post(state: &AppState, raw_id: &str, identity: &Identity) -> AppResult<Post> {
    let post = visible_post(state, raw_id, Some(identity.user_id)).await?;
    if !post.is_owned_by(identity.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(post)
}

async fn render(state: &AppState, id: Uuid) -> AppResult<quill_shared::dto::PostResponse> {
    let details = state
        .posts
        .find_details(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post with id {id} not found")))?;
    Ok(presenter::post(details, state.storage.as_ref()))
}

/// POST /api/posts
pub async fn store(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let mut form = read_form::<PostRequest>(&req, payload).await?;
    let image = form.take_file("featured_image");
    let (changes, image) = validate(&state, form.data, image).await?;

    let slug = unique_slug(&state, &changes.title, None).await?;
    let tags = changes.tags.clone();
    let mut post = Post::new(identity.user_id, changes, slug);
    post.featured_image = store_image(&state, image).await?;

    let image_path = post.featured_image.clone();
    let saved = match state.posts.save_with_tags(post, tags.as_deref()).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_file(&state, image_path.as_deref()).await;
            return Err(e.into());
        }
    };
    tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post created");

    Ok(HttpResponse::Created().json(render(&state, saved.id).await?))
}

/// GET /api/posts/{id}
pub async fn show(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, &path, identity.user_id()).await?;
    state.posts.increment_view_count(post.id).await?;

    Ok(HttpResponse::Ok().json(render(&state, post.id).await?))
}

/// PUT /api/posts/{id}
pub async fn update(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let mut post = owned_post(&state, &path, &identity).await?;

    let mut form = read_form::<PostRequest>(&req, payload).await?;
    let image = form.take_file("featured_image");
    let (changes, image) = validate(&state, form.data, image).await?;

    let slug = unique_slug(&state, &changes.title, Some(post.id)).await?;
    let tags = changes.tags.clone();
    post.apply(changes, slug);

    let stored = store_image(&state, image).await?;
    let replaced = match &stored {
        Some(path) => post.featured_image.replace(path.clone()),
        None => None,
    };
    let saved = match state.posts.save_with_tags(post, tags.as_deref()).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_file(&state, stored.as_deref()).await;
            return Err(e.into());
        }
    };
    discard_file(&state, replaced.as_deref()).await;

    Ok(HttpResponse::Ok().json(render(&state, saved.id).await?))
}

/// DELETE /api/posts/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = owned_post(&state, &path, &identity).await?;

    state.posts.delete(post.id).await?;
    discard_file(&state, post.featured_image.as_deref()).await;
    tracing::info!(post_id = %post.id, "Post deleted");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted successfully")))
}

async fn adjust_likes(
    state: &AppState,
    identity: &Identity,
    raw_id: &str,
    delta: i64,
) -> AppResult<HttpResponse> {
    let post = visible_post(state, raw_id, Some(identity.user_id)).await?;
    let likes = state.posts.adjust_like_count(post.id, delta).await?;
    Ok(HttpResponse::Ok().json(LikesResponse { likes }))
}

/// POST /api/posts/{id}/like
pub async fn like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    adjust_likes(&state, &identity, &path, 1).await
}

/// POST /api/posts/{id}/unlike
pub async fn unlike(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    adjust_likes(&state, &identity, &path, -1).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored_and_garbage_matches_nothing() {
        assert_eq!(id_filter(None), Ok(None));
        assert_eq!(id_filter(Some("  ")), Ok(None));
        assert!(id_filter(Some("not-a-uuid")).is_err());

        let id = Uuid::new_v4();
        assert_eq!(id_filter(Some(&id.to_string())), Ok(Some(id)));
    }
}
