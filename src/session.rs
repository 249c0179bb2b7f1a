// Session lifecycle: connection state, authentication gating, the
// authentication retry loop and error bookkeeping.
//
// Every public call takes the session lock for its whole duration,
// including the network round trip, so calls on one session never
// interleave. Separate sessions share nothing.

use crate::channel::{ChannelError, Connector, RpcChannel};
use crate::error::{SessionError, WfsResult};
use crate::translate::ErrorTranslator;
use crate::types::{
    ConnectionParams, Credentials, DirectoryListing, ErrorInfo, FileBlob, SessionState,
};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use tracing::{debug, info, warn};

/// Value returned by [`FileClient::ping`] when the ping failed.
pub const PING_FAILED: i8 = -1;

/// Public operation set of a file-service client.
pub trait FileClient: Send + Sync {
    /// Opens a new channel, tearing down the current one first.
    fn connect(&self, params: ConnectionParams) -> WfsResult;

    /// Opens a new channel with the parameters of the last `connect`.
    ///
    /// Does not authenticate.
    fn reconnect(&self) -> WfsResult;

    /// Closes the channel. Never fails and may be called at any time.
    fn disconnect(&self);

    fn authenticate(&self, credentials: Credentials) -> WfsResult;

    fn upload_file(&self, blob: &FileBlob) -> WfsResult;

    fn download_file(&self, remote_path: &str) -> WfsResult<Vec<u8>>;

    fn delete_file(&self, remote_path: &str) -> WfsResult;

    fn rename_file(&self, old_path: &str, new_path: &str) -> WfsResult;

    fn list_directory(&self, remote_path: &str) -> WfsResult<DirectoryListing>;

    /// Returns the value echoed by the server, or [`PING_FAILED`].
    fn ping(&self) -> i8;

    fn is_connected(&self) -> bool;

    fn is_authenticated(&self) -> bool;

    /// The most recent failure, or the empty value if the last operation
    /// succeeded.
    fn last_error(&self) -> ErrorInfo;
}

struct Inner<C: Connector> {
    state: SessionState,
    params: Option<ConnectionParams>,
    credentials: Option<Credentials>,
    channel: Option<C::Channel>,
    last_error: Option<SessionError>,
}

impl<C: Connector> Inner<C> {
    fn fail<T>(&mut self, err: SessionError) -> WfsResult<T> {
        if err.invalidates_connection() && self.state != SessionState::Disconnected {
            warn!("Connection lost, session is now disconnected");
            self.state = SessionState::Disconnected;
        }
        self.last_error = Some(err.clone());
        Err(err)
    }

    fn succeed<T>(&mut self, value: T) -> WfsResult<T> {
        self.last_error = None;
        Ok(value)
    }

    fn ensure_connected(&mut self) -> WfsResult {
        if self.state < SessionState::Connected {
            warn!("Operation failed: not connected to server");
            return self.fail(SessionError::NotConnected);
        }
        Ok(())
    }

    fn ensure_authenticated(&mut self) -> WfsResult {
        self.ensure_connected()?;
        if self.state < SessionState::Authenticated {
            warn!("Operation failed: not authenticated");
            return self.fail(SessionError::NotAuthenticated);
        }
        Ok(())
    }

    /// Runs one channel call. The channel is present whenever the state
    /// passed a precondition check.
    fn call<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut C::Channel) -> Result<T, ChannelError>,
    ) -> WfsResult<T> {
        let result = match self.channel.as_mut() {
            Some(channel) => f(channel),
            None => Err(ChannelError::not_open()),
        };
        match result {
            Ok(value) => Ok(value),
            Err(err) => self.fail(ErrorTranslator::translate(operation, err)),
        }
    }

    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if self.state >= SessionState::Connected {
                match channel.close() {
                    Ok(()) => info!("Disconnected from server"),
                    Err(e) => debug!("Ignoring error while closing channel: {}", e),
                }
            }
        }
        self.state = SessionState::Disconnected;
    }

    fn open_channel(&mut self, connector: &C) -> WfsResult {
        let params = match self.params.clone() {
            Some(params) => params,
            None => {
                return self.fail(SessionError::InvalidParams(
                    "no connection parameters recorded".into(),
                ))
            }
        };
        if let Err(reason) = params.validate() {
            return self.fail(SessionError::InvalidParams(reason));
        }

        info!("Connecting to server: {}", params.address());
        let opened = connector.build(&params).and_then(|mut channel| {
            channel.open()?;
            Ok(channel)
        });

        match opened {
            Ok(channel) => {
                self.channel = Some(channel);
                self.state = SessionState::Connected;
                info!("Connected to server successfully");
                self.succeed(())
            }
            Err(err) => {
                self.state = SessionState::Disconnected;
                let err = ErrorTranslator::translate("connect", err);
                self.fail(err)
            }
        }
    }

    fn authenticate_with_retry(&mut self) -> WfsResult {
        let (max_retries, backoff) = match &self.params {
            Some(params) => (params.max_retries, params.retry_backoff),
            None => return self.fail(SessionError::NotConnected),
        };
        let credentials = match self.credentials.clone() {
            Some(credentials) => credentials,
            None => return self.fail(SessionError::NotAuthenticated),
        };

        info!(username = %credentials.username, "Authenticating");

        for attempt in 1..=max_retries {
            let outcome = match self.channel.as_mut() {
                Some(channel) => channel.auth(&credentials),
                None => Err(ChannelError::not_open()),
            };

            match outcome {
                Ok(ack) => {
                    if ack.ok {
                        self.state = SessionState::Authenticated;
                        info!("Authentication successful");
                        return self.succeed(());
                    }
                    self.demote_from_authenticated();
                    warn!(code = ack.code, "Authentication failed: {}", ack.info);
                    return self.fail(ErrorTranslator::application(ack.code, ack.info));
                }
                Err(ChannelError::Transport { kind, message }) => {
                    warn!(
                        error_type = %kind,
                        "Authentication attempt {}/{} failed: {}",
                        attempt, max_retries, message
                    );

                    if attempt == max_retries {
                        warn!("Authentication failed, maximum retries reached");
                        self.demote_from_authenticated();
                        let err = ErrorTranslator::translate(
                            "authenticate",
                            ChannelError::Transport { kind, message },
                        );
                        return self.fail(err);
                    }

                    debug!("Waiting {:?} before retry", backoff);
                    thread::sleep(backoff);
                    self.reopen_in_place();
                }
                Err(other) => {
                    self.demote_from_authenticated();
                    let err = ErrorTranslator::translate("authenticate", other);
                    return self.fail(err);
                }
            }
        }

        self.demote_from_authenticated();
        self.fail(SessionError::RetriesExhausted)
    }

    /// Closes and reopens the current channel without rebuilding it. A
    /// failing `close` counts as a failed reopen.
    ///
    /// A failed reopen marks the session disconnected but leaves the
    /// channel in place; the next attempt runs against it anyway.
    fn reopen_in_place(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            self.state = SessionState::Disconnected;
            return;
        };

        debug!("Attempting to reconnect");
        match channel.close().and_then(|()| channel.open()) {
            Ok(()) => info!("Reconnection successful"),
            Err(e) => {
                warn!("Reconnection failed: {}", e);
                self.state = SessionState::Disconnected;
            }
        }
    }

    fn demote_from_authenticated(&mut self) {
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Connected;
        }
    }
}

/// A client session bound to at most one channel at a time.
pub struct Session<C: Connector> {
    connector: C,
    inner: Mutex<Inner<C>>,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session with no recorded error.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                params: None,
                credentials: None,
                channel: None,
                last_error: None,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn lock(&self) -> MutexGuard<'_, Inner<C>> {
        // A panic inside a channel call must not make the session unusable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C: Connector> FileClient for Session<C> {
    fn connect(&self, params: ConnectionParams) -> WfsResult {
        let mut inner = self.lock();
        if inner.state >= SessionState::Connected {
            inner.teardown();
        }
        inner.params = Some(params);
        inner.open_channel(&self.connector)
    }

    fn reconnect(&self) -> WfsResult {
        let mut inner = self.lock();
        if inner.state >= SessionState::Connected {
            inner.teardown();
        }
        inner.open_channel(&self.connector)
    }

    fn disconnect(&self) {
        self.lock().teardown();
    }

    fn authenticate(&self, credentials: Credentials) -> WfsResult {
        let mut inner = self.lock();
        inner.ensure_connected()?;
        inner.credentials = Some(credentials);
        inner.authenticate_with_retry()
    }

    fn upload_file(&self, blob: &FileBlob) -> WfsResult {
        let mut inner = self.lock();
        inner.ensure_authenticated()?;

        let ack = inner.call("upload", |channel| channel.append(blob))?;
        match ErrorTranslator::check_ack("upload", ack) {
            Ok(()) => {
                info!("File upload successful: {}", blob.name);
                inner.succeed(())
            }
            Err(err) => inner.fail(err),
        }
    }

    fn download_file(&self, remote_path: &str) -> WfsResult<Vec<u8>> {
        let mut inner = self.lock();
        inner.ensure_authenticated()?;

        let reply = inner.call("download", |channel| channel.get(remote_path))?;
        match reply.data {
            Some(data) => {
                info!("File download successful: {} ({} bytes)", remote_path, data.len());
                inner.succeed(data)
            }
            None => {
                warn!("File download failed: no data received for {}", remote_path);
                inner.fail(SessionError::MissingPayload)
            }
        }
    }

    fn delete_file(&self, remote_path: &str) -> WfsResult {
        let mut inner = self.lock();
        inner.ensure_authenticated()?;

        let ack = inner.call("delete", |channel| channel.delete(remote_path))?;
        match ErrorTranslator::check_ack("delete", ack) {
            Ok(()) => {
                info!("File deletion successful: {}", remote_path);
                inner.succeed(())
            }
            Err(err) => inner.fail(err),
        }
    }

    fn rename_file(&self, old_path: &str, new_path: &str) -> WfsResult {
        let mut inner = self.lock();
        inner.ensure_authenticated()?;

        let ack = inner.call("rename", |channel| channel.rename(old_path, new_path))?;
        match ErrorTranslator::check_ack("rename", ack) {
            Ok(()) => {
                info!("File rename successful: {} -> {}", old_path, new_path);
                inner.succeed(())
            }
            Err(err) => inner.fail(err),
        }
    }

    fn list_directory(&self, remote_path: &str) -> WfsResult<DirectoryListing> {
        let mut inner = self.lock();
        inner.ensure_authenticated()?;

        let reply = inner.call("list", |channel| channel.list(remote_path))?;
        if let Some((code, message)) = reply.error {
            warn!(code, "Directory listing failed: {}", message);
            return inner.fail(ErrorTranslator::application(code, message));
        }

        info!(
            "Directory listing successful: {} (total {} items)",
            remote_path,
            reply.entries.len()
        );
        inner.succeed(DirectoryListing {
            path: reply.path,
            entries: reply.entries,
        })
    }

    fn ping(&self) -> i8 {
        let mut inner = self.lock();
        if inner.ensure_connected().is_err() {
            return PING_FAILED;
        }

        match inner.call("ping", |channel| channel.ping()) {
            Ok(value) => {
                debug!("Ping successful, return value: {}", value);
                let _ = inner.succeed(());
                value
            }
            Err(_) => PING_FAILED,
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().state >= SessionState::Connected
    }

    fn is_authenticated(&self) -> bool {
        self.lock().state == SessionState::Authenticated
    }

    fn last_error(&self) -> ErrorInfo {
        self.lock()
            .last_error
            .as_ref()
            .map(ErrorInfo::from)
            .unwrap_or_default()
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        self.lock().teardown();
    }
}

/// Creates a session, connects it and authenticates in one step.
pub fn create_client<C: Connector>(
    connector: C,
    params: ConnectionParams,
    credentials: Credentials,
) -> WfsResult<Session<C>> {
    let session = Session::new(connector);
    session.connect(params)?;
    session.authenticate(credentials)?;
    Ok(session)
}
