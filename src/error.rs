//! Error types for render jobs.

use std::path::PathBuf;

/// Everything that can go wrong before or while starting a render.
///
/// Failures of the encoder process itself are not errors: they arrive as a
/// `Finished` event carrying the non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid render request: {message}")]
    InvalidRequest { message: String },

    #[error("{tool} was not found on the PATH")]
    ToolMissing { tool: String },

    #[error("Output file {} already exists", .path.display())]
    OutputExists { path: PathBuf },

    #[error("A process is already running")]
    Busy,

    #[error("Could not determine duration of {}: {message}", .path.display())]
    Probe { path: PathBuf, message: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
