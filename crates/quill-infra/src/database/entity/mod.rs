//! SeaORM entities and their conversions to and from the domain.

pub mod category;
pub mod comment;
pub mod post;
pub mod post_tag;
pub mod tag;
pub mod user;

use uuid::Uuid;

/// Domain types whose primary key is a UUID, so the generic save can
/// decide between insert and update.
pub trait Keyed {
    fn key(&self) -> Uuid;
}
