//! Error types for annotation compatibility checking

use thiserror::Error;

/// Result type for annotation compatibility operations
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Annotation compatibility errors
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Annotation processing for data schema: {schema} failed, detailed error: {details}")]
    ResolutionFailed { schema: String, details: String },

    #[error("Annotation handler for namespace \"{namespace}\" failed at {path}: {source}")]
    Handler {
        namespace: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}
