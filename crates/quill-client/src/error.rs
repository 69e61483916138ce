use quill_shared::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API responded with status {status}")]
    Api {
        status: u16,
        problem: Option<ErrorResponse>,
    },

    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Token cannot be sent as a header")]
    InvalidToken,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// First validation message for `field` on a 422 response.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            ClientError::Api {
                problem: Some(problem),
                ..
            } => problem.first_error(field),
            _ => None,
        }
    }
}
