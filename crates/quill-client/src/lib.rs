//! # Quill Client
//!
//! Session state for applications talking to the Quill API: who is signed
//! in, the bearer token, and an HTTP client that sends it on every request.

mod error;
mod storage;
mod store;

pub use error::ClientError;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::AuthStore;
