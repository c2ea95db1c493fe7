use std::fmt;

use thiserror::Error;

/// Unified error type for gdp operations
///
/// Every variant is terminal for the invocation: the CLI prints it once to
/// standard error and exits with a nonzero status.
#[derive(Error, Debug)]
pub enum GdpError {
    #[error("{0}")]
    Usage(String),

    #[error("Getting release tag error: {0}.")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Getting merge commit error: {0}.")]
    NoteRetrieval(#[source] GatewayError),

    #[error("{phase} execution error: {source}.")]
    Execution {
        phase: Phase,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    UserDeclined(#[from] DeclineReason),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Repository error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in gdp
pub type Result<T> = std::result::Result<T, GdpError>;

impl GdpError {
    /// Create a usage error with context
    pub fn usage(msg: impl Into<String>) -> Self {
        GdpError::Usage(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GdpError::Config(msg.into())
    }

    /// Whether the usage line should be printed after this error
    pub fn is_usage(&self) -> bool {
        matches!(self, GdpError::Usage(_))
    }
}

/// Malformed tag encountered while computing the next version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid patch version '{segment}' in tag '{tag}'")]
    InvalidPatch { tag: String, segment: String },

    #[error("invalid minor version '{segment}' in tag '{tag}'")]
    InvalidMinor { tag: String, segment: String },
}

/// A precondition checked before any note is built or anything is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Branch is not the release branch.")]
    NotOnReleaseBranch,

    #[error("Tag {0} already exists in local.")]
    TagExistsLocally(String),

    #[error("Tag {0} does not exist in remote.")]
    TagMissingInRemote(String),
}

/// Why the hot-fix confirmation did not go through.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    #[error("Good choice.")]
    Declined,

    #[error("Please enter y or n.")]
    Unrecognized,

    #[error("No answer given.")]
    NoAnswer,
}

/// Failure reported by the repository gateway.
///
/// Messages coming from external tools are kept verbatim.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Git(#[from] git2::Error),

    #[error("{output}")]
    Command { program: String, output: String },

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// The mutating phase that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Deploy,
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Deploy => write!(f, "Deploy"),
            Phase::Publish => write!(f, "Publish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_display() {
        let err = GdpError::usage("Invalid sub command.");
        assert_eq!(err.to_string(), "Invalid sub command.");
        assert!(err.is_usage());
    }

    #[test]
    fn test_parse_error_is_wrapped() {
        let err: GdpError = ParseError::InvalidPatch {
            tag: "4.2.semantic".to_string(),
            segment: "semantic".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Getting release tag error: invalid patch version 'semantic' in tag '4.2.semantic'."
        );
        assert!(!err.is_usage());
    }

    #[test]
    fn test_execution_error_names_phase() {
        let err = GdpError::Execution {
            phase: Phase::Publish,
            source: GatewayError::Command {
                program: "hub".to_string(),
                output: "Error creating release: Unauthorized".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Publish execution error: Error creating release: Unauthorized."
        );
    }

    #[test]
    fn test_note_retrieval_keeps_tool_message() {
        let err = GdpError::NoteRetrieval(GatewayError::Unavailable(
            "fatal: bad revision".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Getting merge commit error: fatal: bad revision."
        );
    }

    #[test]
    fn test_validation_messages() {
        let errors = vec![
            (
                GdpError::from(ValidationError::NotOnReleaseBranch),
                "Branch is not the release branch.",
            ),
            (
                GdpError::from(ValidationError::TagExistsLocally("v1.0.1".to_string())),
                "Tag v1.0.1 already exists in local.",
            ),
            (
                GdpError::from(ValidationError::TagMissingInRemote("v1.0.1".to_string())),
                "Tag v1.0.1 does not exist in remote.",
            ),
        ];

        for (err, expected) in errors {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: GdpError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
