//! Public-disk storage for uploaded images.

mod local;
mod memory;

pub use local::LocalDiskStorage;
pub use memory::InMemoryStorage;

use quill_core::ports::StorageError;

/// Reject absolute paths and anything that could climb out of the disk root.
fn check_relative(path: &str) -> Result<(), StorageError> {
    let suspicious = path.is_empty()
        || path.starts_with('/')
        || path.starts_with('\\')
        || path.contains('\0')
        || path.split(['/', '\\']).any(|part| part == ".." || part.is_empty());
    if suspicious {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// `{base}/storage/{path}` with exactly one slash at each join.
fn public_url(base: &str, path: &str) -> String {
    format!("{}/storage/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_rejected() {
        assert!(check_relative("posts/a.png").is_ok());
        assert!(check_relative("../etc/passwd").is_err());
        assert!(check_relative("posts/../../x").is_err());
        assert!(check_relative("/abs/path").is_err());
        assert!(check_relative("posts//a.png").is_err());
        assert!(check_relative("").is_err());
    }

    #[test]
    fn url_joins_cleanly() {
        assert_eq!(
            public_url("http://localhost:8080/", "posts/a.png"),
            "http://localhost:8080/storage/posts/a.png"
        );
    }
}
