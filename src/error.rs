//! Error types for the deduplication engine

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum DedupError {
    /// Record is missing fields required for pairwise scoring
    #[error("Malformed record {id:?}: {reason}")]
    MalformedInput { id: String, reason: String },

    /// External collaborator (geocoder, model) exceeded its time bound
    #[error("Collaborator timed out: {0}")]
    CollaboratorTimeout(String),

    /// External collaborator panicked or could not be scheduled
    #[error("Collaborator failed: {0}")]
    CollaboratorFailure(String),

    /// Learned model failed or returned an unusable probability
    #[error("Classifier failure: {0}")]
    ClassifierFailure(String),

    /// Projections or hash tables could not be built
    #[error("Index build failure: {0}")]
    IndexBuildFailure(String),

    /// Operation called in the wrong run state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl DedupError {
    /// Whether this error aborts a whole batch rather than a single pair or record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DedupError::IndexBuildFailure(_) | DedupError::Config(_) | DedupError::InvalidState(_)
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DedupError>;
