//! Result and error types for Afirmar.

use thiserror::Error;

/// Result type for Afirmar operations
pub type AfirmarResult<T> = Result<T, AfirmarError>;

/// Errors that can occur in Afirmar
#[derive(Debug, Error)]
pub enum AfirmarError {
    /// Document could not be located by a source
    #[error("Document not found: {id}")]
    DocumentNotFound {
        /// Identity of the missing document
        id: String,
    },

    /// A node id was not present in the tree
    #[error("Unknown node: {id}")]
    UnknownNode {
        /// Identity of the missing node
        id: String,
    },

    /// Watcher setup or registration failed
    #[error("Watch error: {message}")]
    WatchError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
