// Library root
// -----------
// Client-side session manager for the WFS file service. The binary
// (`main.rs`) is a thin CLI on top of these modules.
//
// Module responsibilities:
// - `types`: connection parameters, credentials, file and listing data.
// - `channel`: the `RpcChannel`/`Connector` seam the session talks through,
//   and the classified `ChannelError`.
// - `error`: `SessionError`, the single failure type of every operation.
// - `translate`: turns channel failures and server acknowledgements into
//   `SessionError`.
// - `session`: connection/authentication state, precondition checks and
//   the authentication retry loop.
// - `http`: a concrete channel speaking JSON to an HTTP gateway.
// - `fsutil`: local file and path helpers.
// - `ui`: console setup and the CLI flows.
pub mod channel;
pub mod error;
pub mod fsutil;
pub mod http;
pub mod session;
pub mod translate;
pub mod types;
pub mod ui;

pub use channel::{ChannelError, ChannelResult, Connector, RpcChannel, TransportErrorKind};
pub use error::{SessionError, WfsResult};
pub use session::{create_client, FileClient, Session, PING_FAILED};
pub use types::{
    ConnectionParams, Credentials, DirectoryEntry, DirectoryListing, ErrorInfo, FileBlob,
    SessionState,
};
