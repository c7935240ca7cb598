//! CLI error types

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the core engine
    #[error("{0}")]
    Core(#[from] afirmar::AfirmarError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
