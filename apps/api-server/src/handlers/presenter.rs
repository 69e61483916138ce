//! Domain values rendered as wire DTOs.
//!
//! Storage paths are turned into public URLs here, which is why every
//! function takes the [`FileStorage`].

use quill_core::domain::{
    Category, CommentThread, CommentWithAuthor, PostDetails, PostSummary, Tag, User,
};
use quill_core::pagination::Page;
use quill_core::ports::FileStorage;
use quill_shared::Paginated;
use quill_shared::dto::{
    CategoryResponse, CommentResponse, PostResponse, SocialLinkDto, TagResponse, UserPostResponse,
    UserResponse,
};

pub fn user(user: User, storage: &dyn FileStorage) -> UserResponse {
    UserResponse {
        id: user.id,
        avatar_url: user.avatar.as_deref().map(|path| storage.url(path)),
        name: user.name,
        username: user.username,
        email: user.email,
        bio: user.bio,
        avatar: user.avatar,
        website: user.website,
        social_links: user
            .social_links
            .into_iter()
            .map(|link| SocialLinkDto {
                platform: link.platform,
                url: link.url,
            })
            .collect(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

pub fn category(category: Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name,
        slug: category.slug,
        description: category.description,
    }
}

pub fn tag(tag: Tag) -> TagResponse {
    TagResponse {
        id: tag.id,
        name: tag.name,
        slug: tag.slug,
    }
}

pub fn post(details: PostDetails, storage: &dyn FileStorage) -> PostResponse {
    let PostDetails {
        post,
        author,
        category: post_category,
        tags,
    } = details;

    PostResponse {
        id: post.id,
        user_id: post.user_id,
        category_id: post.category_id,
        featured_image_url: post.featured_image.as_deref().map(|path| storage.url(path)),
        title: post.title,
        slug: post.slug,
        content: post.content,
        status: post.status.to_string(),
        featured_image: post.featured_image,
        view_count: post.view_count,
        like_count: post.like_count,
        created_at: post.created_at,
        updated_at: post.updated_at,
        user: user(author, storage),
        category: post_category.map(category),
        tags: tags.into_iter().map(tag).collect(),
    }
}

/// Dashboard row. `featured_image` carries the absolute URL and there is no
/// per-user like tracking, so `is_liked` is always false.
pub fn user_post(summary: PostSummary, storage: &dyn FileStorage) -> UserPostResponse {
    let PostSummary {
        post,
        author,
        category: post_category,
        comments_count,
    } = summary;

    UserPostResponse {
        id: post.id,
        user_id: post.user_id,
        category_id: post.category_id,
        title: post.title,
        slug: post.slug,
        content: post.content,
        status: post.status.to_string(),
        featured_image: post.featured_image.as_deref().map(|path| storage.url(path)),
        view_count: post.view_count,
        like_count: post.like_count,
        comments_count,
        likes_count: post.like_count,
        is_liked: false,
        created_at: post.created_at,
        updated_at: post.updated_at,
        user: user(author, storage),
        category: post_category.map(category),
    }
}

pub fn comment(entry: CommentWithAuthor, storage: &dyn FileStorage) -> CommentResponse {
    let CommentWithAuthor { comment, author } = entry;
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        parent_id: comment.parent_id,
        content: comment.content,
        is_approved: comment.is_approved,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        user: user(author, storage),
        replies: None,
    }
}

pub fn thread(thread: CommentThread, storage: &dyn FileStorage) -> CommentResponse {
    let replies = thread
        .replies
        .into_iter()
        .map(|reply| comment(reply, storage))
        .collect();
    CommentResponse {
        replies: Some(replies),
        ..comment(thread.root, storage)
    }
}

pub fn paginated<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> Paginated<U> {
    let request = page.request;
    let total = page.total;
    let page = page.map(f);
    Paginated::new(page.items, request.page, request.per_page, total)
}
