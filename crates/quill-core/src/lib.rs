//! # Quill Core
//!
//! The domain layer of the Quill blogging platform: entities, validation,
//! slugs and pagination, plus the ports that infrastructure implements.
//! Nothing here talks to a database, a disk or the network.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod slug;
pub mod validation;

pub use error::{DomainError, RepoError};
pub use validation::{ValidationErrors, Validator};
