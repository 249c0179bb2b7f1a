// Data model shared by the session, the channel implementations and the
// CLI. Everything here is plain data: no I/O, no locking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default service port of the file service.
pub const DEFAULT_PORT: u16 = 9090;

/// Parameters used to open a channel.
///
/// The session keeps its own copy once `connect` starts, so later edits by
/// the caller never affect an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub receive_timeout: Duration,
    pub send_timeout: Duration,
    /// Number of authentication attempts. Zero means no attempt is made.
    pub max_retries: u32,
    /// Wait between two authentication attempts.
    pub retry_backoff: Duration,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_secs(3),
        }
    }
}

impl ConnectionParams {
    /// Creates parameters for `host:port` with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Returns `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks the values a channel cannot work without.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host is empty".into());
        }
        if self.port == 0 {
            return Err("port must be non-zero".into());
        }
        let timeouts = [
            ("connect", self.connect_timeout),
            ("receive", self.receive_timeout),
            ("send", self.send_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(format!("{} timeout must be positive", name));
            }
        }
        Ok(())
    }
}

/// Login credentials, kept for re-authentication after a reconnect.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection and authentication state of a session.
///
/// Ordered so that `state >= SessionState::Connected` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Authenticated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// Flattened form of the most recent failure.
///
/// The default value (code 0, empty message) means "no error".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.code != 0 || !self.message.is_empty()
    }
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileBlob {
    pub name: String,
    pub data: Vec<u8>,
    /// 0 means uncompressed; any other value is passed to the server as is.
    pub compress: i8,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            compress: 0,
        }
    }

    pub fn with_compress(mut self, compress: i8) -> Self {
        self.compress = compress;
        self
    }
}

/// One entry of a directory listing, mapped verbatim from the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub size: i64,
    /// Seconds since the Unix epoch, not validated.
    pub mtime: i64,
    pub is_dir: bool,
}

/// Directory listing in server order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub entries: Vec<DirectoryEntry>,
}
