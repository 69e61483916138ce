//! Domain entities - the core business objects.

mod category;
mod comment;
mod post;
mod tag;
mod upload;
mod user;

pub use category::Category;
pub use comment::{Comment, CommentThread, CommentWithAuthor, build_threads};
pub use post::{
    Post, PostChanges, PostDetails, PostFilter, PostStatus, PostSummary, PostVisibility,
};
pub use tag::Tag;
pub use upload::{MAX_IMAGE_KB, UploadedFile};
pub use user::{AuthorStats, ProfileChanges, SocialLink, User, mask_email};
