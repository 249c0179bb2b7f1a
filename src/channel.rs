// RPC channel abstraction.
//
// The session never touches a socket. It talks to the file service through
// an `RpcChannel`, which exposes the fixed service contract (`Append`,
// `Get`, `Delete`, `Rename`, `List`, `Auth`, `Ping`) and reports failures
// as a classified `ChannelError`.

use crate::types::{ConnectionParams, Credentials, DirectoryEntry, FileBlob};
use std::fmt;
use std::io;

/// Result type for channel calls.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Transport failure subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Unknown,
    NotOpen,
    TimedOut,
    EndOfFile,
    Interrupted,
    BadArgs,
    CorruptedData,
    InternalError,
}

impl TransportErrorKind {
    /// Whether this failure means the channel is gone and must be reopened.
    pub fn invalidates_connection(self) -> bool {
        matches!(self, TransportErrorKind::NotOpen | TransportErrorKind::EndOfFile)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::Unknown => "UNKNOWN",
            TransportErrorKind::NotOpen => "NOT_OPEN",
            TransportErrorKind::TimedOut => "TIMED_OUT",
            TransportErrorKind::EndOfFile => "END_OF_FILE",
            TransportErrorKind::Interrupted => "INTERRUPTED",
            TransportErrorKind::BadArgs => "BAD_ARGS",
            TransportErrorKind::CorruptedData => "CORRUPTED_DATA",
            TransportErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a channel call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Connection-level failure.
    #[error("{message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Malformed message or contract violation.
    #[error("{0}")]
    Protocol(String),

    /// Any other local failure.
    #[error("{0}")]
    Generic(String),
}

impl ChannelError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        ChannelError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn not_open() -> Self {
        Self::transport(TransportErrorKind::NotOpen, "Called operation on a closed channel")
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ChannelError::Protocol(message.into())
    }

    pub fn generic(message: impl Into<String>) -> Self {
        ChannelError::Generic(message.into())
    }
}

impl From<io::Error> for ChannelError {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::NotConnected | ErrorKind::ConnectionRefused | ErrorKind::AddrNotAvailable => {
                TransportErrorKind::NotOpen
            }
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportErrorKind::TimedOut,
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => TransportErrorKind::EndOfFile,
            ErrorKind::Interrupted => TransportErrorKind::Interrupted,
            ErrorKind::InvalidInput => TransportErrorKind::BadArgs,
            ErrorKind::InvalidData => TransportErrorKind::CorruptedData,
            _ => TransportErrorKind::Unknown,
        };
        ChannelError::transport(kind, err.to_string())
    }
}

/// Application-level acknowledgement returned inside a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ack {
    pub ok: bool,
    pub code: i32,
    pub info: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn failed(code: i32, info: impl Into<String>) -> Self {
        Self {
            ok: false,
            code,
            info: info.into(),
        }
    }
}

/// Reply of the `Get` call. `data` is `None` when the server sent nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataReply {
    pub data: Option<Vec<u8>>,
}

/// Reply of the `List` call.
///
/// `error` is set when the server refused the listing; `entries` is then
/// meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListReply {
    pub path: String,
    pub entries: Vec<DirectoryEntry>,
    pub error: Option<(i32, String)>,
}

/// The file-service contract as seen by the session.
///
/// `open` and `close` may be called repeatedly on the same value; the
/// session relies on that to reopen a channel in place.
pub trait RpcChannel: Send {
    fn open(&mut self) -> ChannelResult<()>;

    fn close(&mut self) -> ChannelResult<()>;

    fn append(&mut self, file: &FileBlob) -> ChannelResult<Ack>;

    fn get(&mut self, path: &str) -> ChannelResult<DataReply>;

    fn delete(&mut self, path: &str) -> ChannelResult<Ack>;

    fn rename(&mut self, old_path: &str, new_path: &str) -> ChannelResult<Ack>;

    fn list(&mut self, path: &str) -> ChannelResult<ListReply>;

    fn auth(&mut self, credentials: &Credentials) -> ChannelResult<Ack>;

    fn ping(&mut self) -> ChannelResult<i8>;
}

/// Builds unopened channels from connection parameters.
pub trait Connector: Send + Sync {
    type Channel: RpcChannel;

    fn build(&self, params: &ConnectionParams) -> ChannelResult<Self::Channel>;
}
