//! Files received from clients, before they reach storage.

/// Largest image accepted for avatars and featured images, in kilobytes.
pub const MAX_IMAGE_KB: usize = 2048;

/// A file field from a multipart request, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size_kb(&self) -> usize {
        self.bytes.len().div_ceil(1024)
    }

    /// Check the file is an image no larger than `max_kb` and return the
    /// extension it should be stored under. The extension comes from the
    /// declared MIME type, never from the client's file name.
    pub fn image_extension(&self, field: &str, max_kb: usize) -> Result<&'static str, String> {
        let label = field.replace('_', " ");
        let ext = image_extension_for(&self.content_type)
            .ok_or_else(|| format!("The {label} field must be an image."))?;
        if self.bytes.is_empty() {
            return Err(format!("The {label} field failed to upload."));
        }
        if self.size_kb() > max_kb {
            return Err(format!(
                "The {label} field must not be greater than {max_kb} kilobytes."
            ));
        }
        Ok(ext)
    }
}

fn image_extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some("photo.exe".into()),
            content_type: content_type.into(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn extension_comes_from_mime() {
        assert_eq!(file("image/png", 10).image_extension("avatar", 2048), Ok("png"));
        assert_eq!(file("image/jpeg", 10).image_extension("avatar", 2048), Ok("jpg"));
    }

    #[test]
    fn non_images_are_rejected() {
        assert_eq!(
            file("application/pdf", 10).image_extension("featured_image", 2048),
            Err("The featured image field must be an image.".to_string())
        );
    }

    #[test]
    fn size_limit_in_kilobytes() {
        assert!(file("image/png", 2048 * 1024).image_extension("avatar", 2048).is_ok());
        assert_eq!(
            file("image/png", 2048 * 1024 + 1).image_extension("avatar", 2048),
            Err("The avatar field must not be greater than 2048 kilobytes.".to_string())
        );
    }
}
