// Vidshift Error Types

use std::fmt;
use thiserror::Error;

/// Triage class for a failed engine run, derived from its stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeFailure {
    /// "Error reinitializing filters" (mid-stream format change)
    FilterReinit,
    /// "Invalid argument" (bad option or filter value)
    InvalidArgument,
    /// The engine binary could not be started
    Spawn,
    /// Nonzero exit with no recognized signature
    NonZeroExit,
    Other,
}

impl fmt::Display for TranscodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranscodeFailure::FilterReinit => "filter-reinit",
            TranscodeFailure::InvalidArgument => "invalid-argument",
            TranscodeFailure::Spawn => "spawn",
            TranscodeFailure::NonZeroExit => "nonzero-exit",
            TranscodeFailure::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum VidshiftError {
    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Filter build error: {0}")]
    FilterBuild(String),

    #[error("Transcode error ({kind}): {message}")]
    Transcode { kind: TranscodeFailure, message: String },

    #[error("Timeout in {phase}: no progress for {window_secs}s")]
    Timeout { phase: String, window_secs: u64 },

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl VidshiftError {
    pub fn transcode(kind: TranscodeFailure, message: impl Into<String>) -> Self {
        VidshiftError::Transcode { kind, message: message.into() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VidshiftError::Timeout { .. })
    }
}

impl From<anyhow::Error> for VidshiftError {
    fn from(err: anyhow::Error) -> Self {
        VidshiftError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidshiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_display_includes_kind() {
        let err = VidshiftError::transcode(TranscodeFailure::InvalidArgument, "bad -r");
        assert_eq!(err.to_string(), "Transcode error (invalid-argument): bad -r");
    }

    #[test]
    fn test_timeout_flag() {
        let err = VidshiftError::Timeout { phase: "transcode".into(), window_secs: 300 };
        assert!(err.is_timeout());
        assert!(!VidshiftError::Probe("x".into()).is_timeout());
    }
}
