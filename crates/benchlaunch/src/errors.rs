use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or running a launch
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("{0}")]
    MissingRequiredInput(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse command line: {0}")]
    CommandParse(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LaunchError {
    /// True for the input checks that must stop the run before anything is built.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            LaunchError::MissingRequiredInput(_) | LaunchError::InvalidValue(_)
        )
    }
}

/// Result type for launch operations
pub type LaunchResult<T> = Result<T, LaunchError>;

pub mod util {
    use super::*;
    use std::path::Path;

    /// Check that a path names an existing regular file
    pub fn ensure_file_exists<P: AsRef<Path>>(path: P) -> LaunchResult<()> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(LaunchError::FileNotFound(path_ref.to_path_buf()));
        }
        Ok(())
    }
}
