//! Domain errors for the Arbiter evaluation engine.
//!
//! Only infrastructure failures are errors here: an unreachable judge, a command
//! that cannot be spawned, an unreadable file. Malformed judge output and
//! unparseable tool output are not errors; evaluators turn them into
//! fail-closed results instead.

use std::path::PathBuf;
use thiserror::Error;

/// A single failed judge call, classified for retry purposes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JudgeApiError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401)
    #[error("Invalid API key - authentication failed")]
    InvalidApiKey,

    /// Permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown endpoint or model (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server-side failure (HTTP 5xx, including 529 overloaded)
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    /// The client-side timeout elapsed
    #[error("Request timeout")]
    Timeout,

    /// Connection refused, reset or otherwise dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// A 2xx response whose body did not match the Messages schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other status
    #[error("Unknown error ({0}): {1}")]
    UnknownError(u16, String),
}

impl JudgeApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::InvalidRequest(body),
            401 => Self::InvalidApiKey,
            403 => Self::Forbidden(body),
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError(status, body),
            _ => Self::UnknownError(status, body),
        }
    }

    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_, _) | Self::Timeout | Self::Connection(_)
        )
    }

    /// Returns true if retrying cannot help
    pub const fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Failure of a judge query as seen by an evaluator
#[derive(Error, Debug)]
pub enum JudgeError {
    /// Transient failures persisted past the retry budget
    #[error("Judge request failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: JudgeApiError,
    },

    /// The endpoint rejected the request with a permanent error
    #[error("Judge request rejected: {source}")]
    Rejected {
        #[source]
        source: JudgeApiError,
    },

    /// No API key available for the configured environment variable
    #[error("Judge API key not found: environment variable {0} is not set")]
    MissingApiKey(String),

    /// The HTTP client could not be constructed
    #[error("Failed to initialize judge client: {0}")]
    ClientInit(String),
}

impl JudgeError {
    /// The last underlying call failure, when there was one
    pub const fn last_cause(&self) -> Option<&JudgeApiError> {
        match self {
            Self::RetriesExhausted { source, .. } | Self::Rejected { source } => Some(source),
            Self::MissingApiKey(_) | Self::ClientInit(_) => None,
        }
    }

    /// Actionable suggestion for the user
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::RetriesExhausted { .. } => {
                "The judge endpoint kept failing. Check network connectivity and the \
                 provider's status page, or raise judge.max_retries."
            }
            Self::Rejected {
                source: JudgeApiError::InvalidApiKey | JudgeApiError::Forbidden(_),
            } => "Check that the judge API key is valid and has access to the configured model.",
            Self::Rejected {
                source: JudgeApiError::NotFound,
            } => "Check judge.endpoint and judge.model in the configuration.",
            Self::Rejected { .. } => {
                "The judge rejected the request. Check judge.model and judge.max_tokens."
            }
            Self::MissingApiKey(_) => {
                "Export the API key (default ANTHROPIC_API_KEY) or set judge.api_key_env."
            }
            Self::ClientInit(_) => "Check the TLS setup and the judge.endpoint value.",
        }
    }
}

/// Infrastructure failure raised by an evaluator
#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error("Failed to spawn command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EvalError {
    /// Actionable suggestion for the user
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::Judge(err) => err.hint(),
            Self::CommandSpawn { .. } => {
                "Make sure a POSIX shell is available and the workspace directory exists."
            }
            Self::Io { .. } => "Check that the workspace path exists and is readable.",
            Self::InvalidConfig(_) => "Fix the metric configuration and re-run.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(JudgeApiError::RateLimitExceeded.is_transient());
        assert!(JudgeApiError::ServerError(500, "boom".to_string()).is_transient());
        assert!(JudgeApiError::ServerError(529, "overloaded".to_string()).is_transient());
        assert!(JudgeApiError::Timeout.is_transient());
        assert!(JudgeApiError::Connection("reset by peer".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(JudgeApiError::InvalidRequest("bad".to_string()).is_permanent());
        assert!(JudgeApiError::InvalidApiKey.is_permanent());
        assert!(JudgeApiError::Forbidden("no".to_string()).is_permanent());
        assert!(JudgeApiError::NotFound.is_permanent());
        assert!(JudgeApiError::MalformedResponse("eof".to_string()).is_permanent());
        assert!(JudgeApiError::UnknownError(418, String::new()).is_permanent());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(
            JudgeApiError::from_status(429, String::new()),
            JudgeApiError::RateLimitExceeded
        );
        assert_eq!(JudgeApiError::from_status(401, String::new()), JudgeApiError::InvalidApiKey);
        assert!(matches!(
            JudgeApiError::from_status(503, "down".to_string()),
            JudgeApiError::ServerError(503, _)
        ));
        assert!(matches!(
            JudgeApiError::from_status(302, String::new()),
            JudgeApiError::UnknownError(302, _)
        ));
    }

    #[test]
    fn test_hints_are_actionable() {
        let exhausted = JudgeError::RetriesExhausted {
            attempts: 3,
            source: JudgeApiError::Timeout,
        };
        assert!(exhausted.hint().contains("network"));
        assert_eq!(exhausted.last_cause(), Some(&JudgeApiError::Timeout));

        let bad_key = EvalError::from(JudgeError::Rejected {
            source: JudgeApiError::InvalidApiKey,
        });
        assert!(bad_key.hint().contains("API key"));
    }
}
