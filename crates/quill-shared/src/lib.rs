//! # Quill Shared
//!
//! Request and response types spoken on the wire.
//! Both the API server and `quill-client` compile against this crate, so it
//! carries no server-side dependencies.

pub mod dto;
pub mod pagination;
pub mod response;

pub use pagination::Paginated;
pub use response::{ErrorResponse, MessageResponse};
