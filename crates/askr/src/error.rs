//! Error types for scene documents on disk and in strings.

use thiserror::Error;

/// Errors from reading or writing a scene document.
///
/// Only the string and file wrappers return these; the in-memory scene
/// operations ignore malformed input instead of failing.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The file could not be read or written.
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid JSON.
    #[error("Malformed scene JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but the top level is not an object.
    #[error("Scene document must be a JSON object")]
    NotAnObject,
}
