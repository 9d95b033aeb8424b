//! Error types for notesnap

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for notesnap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while splitting, rendering or capturing notes
#[derive(Error, Debug)]
pub enum Error {
    /// The source document could not be read
    #[error("Failed to read input {}: {source}", path.display())]
    InputError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file or directory could not be written
    #[error("Failed to write output {}: {source}", path.display())]
    OutputError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to start the rendering surface
    #[error("Rendering surface initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a page into the rendering surface
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// Failed to evaluate or measure the rendered page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to take a screenshot
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Invalid configuration or theme
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The run was cancelled between blocks
    #[error("Run cancelled")]
    Cancelled,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a retry of the same surface operation may succeed.
    ///
    /// Only failures reported by the rendering surface are transient. Input,
    /// output and configuration problems will not go away on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::LoadError(_) | Error::RenderError(_) | Error::CaptureError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_errors_are_transient() {
        assert!(Error::LoadError("boom".into()).is_transient());
        assert!(Error::CaptureError("boom".into()).is_transient());
        assert!(Error::RenderError("boom".into()).is_transient());
    }

    #[test]
    fn io_and_config_errors_are_not_transient() {
        let err = Error::OutputError {
            path: PathBuf::from("out/note_01.png"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("note_01.png"));
        assert!(!Error::ConfigError("bad".into()).is_transient());
        assert!(!Error::Cancelled.is_transient());
    }
}
