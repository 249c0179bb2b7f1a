// Uniform error type returned by every session operation.

use crate::channel::TransportErrorKind;
use crate::types::ErrorInfo;

/// Code used for every failure that did not come from the server.
pub const LOCAL_ERROR_CODE: i32 = -1;

/// Result type for session operations.
pub type WfsResult<T = ()> = Result<T, SessionError>;

/// Failure of a session operation.
///
/// Only [`SessionError::Application`] carries a server-defined code; all
/// other variants report [`LOCAL_ERROR_CODE`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Not connected to server")]
    NotConnected,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Transport exception: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
        /// The channel must be reopened before it can be used again.
        invalidating: bool,
    },

    #[error("Protocol exception: {0}")]
    Protocol(String),

    #[error("Generic exception: {0}")]
    Generic(String),

    /// Negative acknowledgement reported by the server, kept verbatim.
    #[error("{message}")]
    Application { code: i32, message: String },

    #[error("Download failed: no data received")]
    MissingPayload,

    #[error("Invalid connection parameters: {0}")]
    InvalidParams(String),

    #[error("Authentication failed, retry limit reached")]
    RetriesExhausted,
}

impl SessionError {
    pub fn code(&self) -> i32 {
        match self {
            SessionError::Application { code, .. } => *code,
            _ => LOCAL_ERROR_CODE,
        }
    }

    /// Whether the session had to drop its connection because of this error.
    pub fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            SessionError::Transport {
                invalidating: true,
                ..
            }
        )
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.to_string())
    }
}

impl From<&SessionError> for ErrorInfo {
    fn from(err: &SessionError) -> Self {
        err.info()
    }
}
