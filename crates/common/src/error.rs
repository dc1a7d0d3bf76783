//! Error types shared across Lumina crates.
//!
//! The notification queue and the camera auto-fit never fail; these
//! variants cover the file and description edges around them.

use std::path::PathBuf;

/// Top-level error type for Lumina operations.
#[derive(Debug, thiserror::Error)]
pub enum LuminaError {
    #[error("Scene error: {message}")]
    Scene { message: String },

    #[error("Camera state error: {message}")]
    CameraState { message: String },

    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseAt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LuminaError.
pub type LuminaResult<T> = Result<T, LuminaError>;

impl LuminaError {
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene {
            message: msg.into(),
        }
    }

    pub fn camera_state(msg: impl Into<String>) -> Self {
        Self::CameraState {
            message: msg.into(),
        }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Read a file to a string, mapping a missing file to `FileNotFound`.
    pub fn read_file(path: &std::path::Path) -> LuminaResult<String> {
        std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Self::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Self::IoAt {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}
