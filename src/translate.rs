// Conversion of channel failures and server acknowledgements into
// `SessionError`.

use crate::channel::{Ack, ChannelError};
use crate::error::SessionError;
use tracing::warn;

/// Collapses every failure shape into a [`SessionError`].
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Translates a failure raised by the channel during `operation`.
    ///
    /// Transport failures keep their subtype and are flagged when they
    /// invalidate the connection; the caller is responsible for demoting
    /// the session state.
    pub fn translate(operation: &str, err: ChannelError) -> SessionError {
        match err {
            ChannelError::Transport { kind, message } => {
                warn!(operation, error_type = %kind, "Transport exception: {}", message);
                SessionError::Transport {
                    kind,
                    message,
                    invalidating: kind.invalidates_connection(),
                }
            }
            ChannelError::Protocol(message) => {
                warn!(operation, "Protocol exception: {}", message);
                SessionError::Protocol(message)
            }
            ChannelError::Generic(message) => {
                warn!(operation, "Generic exception: {}", message);
                SessionError::Generic(message)
            }
        }
    }

    /// Unwraps an application-level acknowledgement.
    pub fn check_ack(operation: &str, ack: Ack) -> Result<(), SessionError> {
        if ack.ok {
            return Ok(());
        }
        warn!(operation, code = ack.code, "Server refused: {}", ack.info);
        Err(Self::application(ack.code, ack.info))
    }

    pub fn application(code: i32, message: String) -> SessionError {
        SessionError::Application { code, message }
    }
}
