//! Error types for the Gemini integration and the Veo error classifier.
//!
//! Upstream error payloads are inconsistently shaped, so video failures are
//! classified by matching known phrases in the raw message. That heuristic
//! lives in [`classify`] and nowhere else.

/// Transport-level errors from the Gemini REST API.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        /// HTTP status code of the failed response
        status: u16,
        /// Upstream message, prefixed with the code and status name when known
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Prompt composition failure. There is only one kind.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Could not optimize prompt. Please try again.")]
    Failed {
        #[source]
        source: GeminiError,
    },
}

impl From<GeminiError> for ComposeError {
    fn from(source: GeminiError) -> Self {
        ComposeError::Failed { source }
    }
}

/// Coarse category of a classified video error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Quota,
    Validation,
    Unknown,
}

/// A classified video generation failure.
///
/// `Display` shows the user-facing message only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Quota(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unknown(String),
}

const AUTH_NOT_FOUND_MESSAGE: &str =
    "The selected API Key is invalid or not found. Please re-select a paid GCP project key.";
const AUTH_DENIED_MESSAGE: &str =
    "Permission denied. Your API key may lack access to Veo. Ensure billing is enabled.";
const QUOTA_MESSAGE: &str = "API usage limit exceeded. Please check your project quotas.";
const VALIDATION_MESSAGE: &str =
    "The model rejected the request. Please try modifying your prompt.";
const RECONNECT_HINT: &str = " Please reconnect your API key.";

/// Phrases that mean the key itself is wrong or unknown.
const AUTH_NOT_FOUND_PATTERNS: &[&str] = &["entity was not found", "API key not valid"];
const AUTH_DENIED_PATTERNS: &[&str] = &["403", "PERMISSION_DENIED"];
const QUOTA_PATTERNS: &[&str] = &["429", "RESOURCE_EXHAUSTED"];
const VALIDATION_PATTERNS: &[&str] = &["400", "INVALID_ARGUMENT"];

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

/// Classify a raw upstream error message.
///
/// Checks run in order: auth, quota, validation. Anything unmatched is
/// returned unmodified as `Unknown`.
pub fn classify(raw: &str) -> VideoError {
    if contains_any(raw, AUTH_NOT_FOUND_PATTERNS) {
        return VideoError::Auth(AUTH_NOT_FOUND_MESSAGE.to_string());
    }
    if contains_any(raw, AUTH_DENIED_PATTERNS) {
        return VideoError::Auth(AUTH_DENIED_MESSAGE.to_string());
    }
    if contains_any(raw, QUOTA_PATTERNS) {
        return VideoError::Quota(QUOTA_MESSAGE.to_string());
    }
    if contains_any(raw, VALIDATION_PATTERNS) {
        return VideoError::Validation(VALIDATION_MESSAGE.to_string());
    }
    VideoError::Unknown(raw.to_string())
}

impl VideoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VideoError::Auth(_) => ErrorKind::Auth,
            VideoError::Quota(_) => ErrorKind::Quota,
            VideoError::Validation(_) => ErrorKind::Validation,
            VideoError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            VideoError::Auth(m)
            | VideoError::Quota(m)
            | VideoError::Validation(m)
            | VideoError::Unknown(m) => m,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, VideoError::Auth(_))
    }

    /// Message to show the user.
    ///
    /// Auth failures get a reconnect instruction unless the message already
    /// tells the user what to do.
    pub fn user_message(&self) -> String {
        match self {
            VideoError::Auth(m) if !m.contains("Please") => format!("{}{}", m, RECONNECT_HINT),
            other => other.message().to_string(),
        }
    }
}

impl From<GeminiError> for VideoError {
    fn from(err: GeminiError) -> Self {
        match err {
            // The URL may carry port numbers that look like status codes.
            GeminiError::HttpError(e) => {
                classify(&format!("HTTP request failed: {}", e.without_url()))
            }
            other => classify(&other.to_string()),
        }
    }
}
