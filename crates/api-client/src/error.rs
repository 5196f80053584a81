use iou_api::ApiError;
use iou_api::signup::SignupFormError;

/// Everything that can go wrong talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response; `errors` comes from the `{"errors": [...]}` body.
    #[error("HTTP {status}: {}", errors.join("; "))]
    Api { status: u16, errors: Vec<String> },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("auth token not set")]
    MissingAuth,
    #[error(transparent)]
    Form(#[from] SignupFormError),
}

impl ClientError {
    /// Status code of an API error response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Build a [`ClientError::Api`] from a response body. Bodies that are
    /// not `{"errors": [...]}` are kept verbatim as the single message.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let errors = match serde_json::from_str::<ApiError>(body) {
            Ok(api) => api.errors,
            Err(_) if body.is_empty() => Vec::new(),
            Err(_) => vec![body.to_string()],
        };
        Self::Api { status, errors }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
