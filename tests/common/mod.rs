// Scripted in-memory channel for session tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use wfs_client::channel::{Ack, DataReply, ListReply};
use wfs_client::{
    ChannelError, ChannelResult, ConnectionParams, Connector, Credentials, DirectoryEntry,
    FileBlob, RpcChannel, TransportErrorKind,
};

/// Behaviour of the fake server, shared by the connector and every channel
/// it builds.
#[derive(Default)]
pub struct Script {
    /// Replies to successive `auth` calls.
    pub auth: VecDeque<ChannelResult<Ack>>,
    /// Reply once `auth` is exhausted; defaults to a positive ack.
    pub auth_fallback: Option<ChannelResult<Ack>>,
    /// Results of successive `open` calls; `Ok` once exhausted.
    pub open: VecDeque<ChannelResult<()>>,
    /// Results of successive `close` calls; `Ok` once exhausted.
    pub close: VecDeque<ChannelResult<()>>,
    pub build_error: Option<ChannelError>,
    /// One-shot failure for the next data-plane call.
    pub next_error: Option<ChannelError>,
    pub files: HashMap<String, Vec<u8>>,
    pub listing: Vec<DirectoryEntry>,
    pub list_error: Option<(i32, String)>,
    pub ping_value: i8,
    pub calls: Vec<&'static str>,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.script().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.script().calls.iter().filter(|c| **c == name).count()
    }

    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }
}

impl Connector for MockConnector {
    type Channel = MockChannel;

    fn build(&self, _params: &ConnectionParams) -> ChannelResult<MockChannel> {
        let mut script = self.script();
        script.calls.push("build");
        if let Some(err) = script.build_error.take() {
            return Err(err);
        }
        Ok(MockChannel {
            script: Arc::clone(&self.script),
            open: false,
        })
    }
}

pub struct MockChannel {
    script: Arc<Mutex<Script>>,
    open: bool,
}

impl MockChannel {
    /// Records the call and fails like a closed socket when not open.
    fn enter(&self, name: &'static str) -> ChannelResult<MutexGuard<'_, Script>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(name);
        if !self.open {
            return Err(ChannelError::not_open());
        }
        if name != "auth" && name != "ping" {
            if let Some(err) = script.next_error.take() {
                return Err(err);
            }
        }
        Ok(script)
    }
}

impl RpcChannel for MockChannel {
    fn open(&mut self) -> ChannelResult<()> {
        let result = {
            let mut script = self.script.lock().unwrap();
            script.calls.push("open");
            script.open.pop_front().unwrap_or(Ok(()))
        };
        self.open = result.is_ok();
        result
    }

    /// The channel is unusable afterwards even when `close` fails.
    fn close(&mut self) -> ChannelResult<()> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("close");
        self.open = false;
        script.close.pop_front().unwrap_or(Ok(()))
    }

    fn append(&mut self, file: &FileBlob) -> ChannelResult<Ack> {
        let mut script = self.enter("append")?;
        script.files.insert(file.name.clone(), file.data.clone());
        Ok(Ack::ok())
    }

    fn get(&mut self, path: &str) -> ChannelResult<DataReply> {
        let script = self.enter("get")?;
        Ok(DataReply {
            data: script.files.get(path).cloned(),
        })
    }

    fn delete(&mut self, path: &str) -> ChannelResult<Ack> {
        let mut script = self.enter("delete")?;
        match script.files.remove(path) {
            Some(_) => Ok(Ack::ok()),
            None => Ok(Ack::failed(2, "file not found")),
        }
    }

    fn rename(&mut self, old_path: &str, new_path: &str) -> ChannelResult<Ack> {
        let mut script = self.enter("rename")?;
        match script.files.remove(old_path) {
            Some(data) => {
                script.files.insert(new_path.to_string(), data);
                Ok(Ack::ok())
            }
            None => Ok(Ack::failed(2, "file not found")),
        }
    }

    fn list(&mut self, path: &str) -> ChannelResult<ListReply> {
        let script = self.enter("list")?;
        Ok(ListReply {
            path: path.to_string(),
            entries: script.listing.clone(),
            error: script.list_error.clone(),
        })
    }

    fn auth(&mut self, _credentials: &Credentials) -> ChannelResult<Ack> {
        let mut script = self.enter("auth")?;
        match script.auth.pop_front() {
            Some(reply) => reply,
            None => script.auth_fallback.clone().unwrap_or_else(|| Ok(Ack::ok())),
        }
    }

    fn ping(&mut self) -> ChannelResult<i8> {
        let script = self.enter("ping")?;
        Ok(script.ping_value)
    }
}

pub fn params() -> ConnectionParams {
    ConnectionParams::new("127.0.0.1", 9090).with_retry_backoff(Duration::ZERO)
}

pub fn credentials() -> Credentials {
    Credentials::new("alice", "secret")
}

pub fn eof() -> ChannelError {
    ChannelError::transport(TransportErrorKind::EndOfFile, "connection closed by peer")
}

pub fn timed_out() -> ChannelError {
    ChannelError::transport(TransportErrorKind::TimedOut, "read timed out")
}
