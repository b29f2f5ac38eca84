//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the encoder.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Neither the env override nor a PATH lookup turned up the binary.
    #[error("{tool} is not available; install it or set {env_var}")]
    ToolMissing {
        tool: &'static str,
        env_var: &'static str,
    },

    #[error("Encoder failed ({status}): {log_tail}")]
    EncodeFailed { status: String, log_tail: String },

    #[error("Probe of {path} failed: {detail}")]
    ProbeFailed { path: PathBuf, detail: String },

    #[error("Missing input file: {0}")]
    MissingInput(PathBuf),

    #[error("Encoder ran past the {0}s limit and was killed")]
    Timeout(u64),

    #[error("Unusable media: {0}")]
    UnusableMedia(String),

    #[error("Probe emitted malformed JSON: {0}")]
    MalformedProbe(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl MediaError {
    /// Encoder exit turned into an error, with the tail of stderr attached.
    pub fn encode_failed(code: Option<i32>, stderr: &str) -> Self {
        let status = match code {
            Some(code) => format!("status {code}"),
            None => "killed by signal".to_string(),
        };
        Self::EncodeFailed {
            status,
            log_tail: stderr_tail(stderr),
        }
    }

    pub fn tool_missing(tool: &'static str, env_var: &'static str) -> Self {
        Self::ToolMissing { tool, env_var }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Last lines of encoder output. The full stderr goes to the log; the error
/// carries just enough to be readable in a job record.
fn stderr_tail(stderr: &str) -> String {
    const KEEP_LINES: usize = 6;
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(KEEP_LINES);
    lines[start..].join("\n")
}
