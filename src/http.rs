// HTTP gateway channel: a small blocking client that speaks the file-service
// contract as JSON over HTTP. Each call is a POST to `<base>/rpc/<Method>`;
// byte payloads travel as base64 strings.

use crate::channel::{
    Ack, ChannelError, ChannelResult, Connector, DataReply, ListReply, RpcChannel,
    TransportErrorKind,
};
use crate::types::{ConnectionParams, Credentials, DirectoryEntry, FileBlob};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Builds [`HttpChannel`]s for `http://host:port`, or another scheme
/// set with [`HttpConnector::with_scheme`].
#[derive(Debug, Clone)]
pub struct HttpConnector {
    scheme: String,
    use_proxy: bool,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            use_proxy: true,
        }
    }
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another URL scheme, e.g. `https`.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Ignores the system proxy settings (`HTTP_PROXY` and friends).
    pub fn without_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }
}

impl Connector for HttpConnector {
    type Channel = HttpChannel;

    fn build(&self, params: &ConnectionParams) -> ChannelResult<HttpChannel> {
        // reqwest has a single I/O timeout; use the larger of the two.
        let mut builder = Client::builder()
            .connect_timeout(params.connect_timeout)
            .timeout(params.receive_timeout.max(params.send_timeout));
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(classify)?;

        Ok(HttpChannel {
            client,
            base_url: format!("{}://{}", self.scheme, params.address()),
            open: false,
        })
    }
}

/// Channel talking to a JSON gateway in front of the file service.
pub struct HttpChannel {
    client: Client,
    base_url: String,
    open: bool,
}

impl HttpChannel {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True between a successful `open` and the next `close` or
    /// connection-breaking failure.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn call<Req, Resp>(&mut self, method: &str, body: &Req) -> ChannelResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        if !self.open {
            return Err(ChannelError::not_open());
        }

        let url = format!("{}/rpc/{}", self.base_url, method);
        debug!("POST {}", url);

        let result = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(classify)
            .and_then(|res| {
                if !res.status().is_success() {
                    let status = res.status();
                    let txt = res.text().unwrap_or_default();
                    return Err(ChannelError::protocol(format!(
                        "{} returned {}: {}",
                        method, status, txt
                    )));
                }
                res.json::<Resp>().map_err(classify)
            });

        if let Err(ChannelError::Transport { kind, .. }) = &result {
            if kind.invalidates_connection() {
                self.open = false;
            }
        }
        result
    }
}

impl RpcChannel for HttpChannel {
    fn open(&mut self) -> ChannelResult<()> {
        // Any HTTP answer proves the gateway is reachable.
        self.client.head(&self.base_url).send().map_err(classify)?;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> ChannelResult<()> {
        self.open = false;
        Ok(())
    }

    fn append(&mut self, file: &FileBlob) -> ChannelResult<Ack> {
        let req = FileRequest {
            name: &file.name,
            data: BASE64.encode(&file.data),
            compress: (file.compress != 0).then_some(file.compress),
        };
        let ack: AckReply = self.call("Append", &req)?;
        Ok(ack.into())
    }

    fn get(&mut self, path: &str) -> ChannelResult<DataReply> {
        let reply: DataWire = self.call("Get", &PathRequest { path })?;
        let data = match reply.data {
            Some(encoded) => Some(BASE64.decode(encoded).map_err(|e| {
                ChannelError::transport(
                    TransportErrorKind::CorruptedData,
                    format!("invalid base64 payload: {}", e),
                )
            })?),
            None => None,
        };
        Ok(DataReply { data })
    }

    fn delete(&mut self, path: &str) -> ChannelResult<Ack> {
        let ack: AckReply = self.call("Delete", &PathRequest { path })?;
        Ok(ack.into())
    }

    fn rename(&mut self, old_path: &str, new_path: &str) -> ChannelResult<Ack> {
        let ack: AckReply = self.call("Rename", &RenameRequest { old_path, new_path })?;
        Ok(ack.into())
    }

    fn list(&mut self, path: &str) -> ChannelResult<ListReply> {
        let reply: DirListWire = self.call("List", &PathRequest { path })?;
        Ok(ListReply {
            path: reply.path,
            entries: reply
                .items
                .into_iter()
                .map(|item| DirectoryEntry {
                    name: item.name,
                    size: item.size,
                    mtime: item.mtime,
                    is_dir: item.is_dir,
                })
                .collect(),
            error: reply.error.map(|e| (e.code, e.info)),
        })
    }

    fn auth(&mut self, credentials: &Credentials) -> ChannelResult<Ack> {
        let req = AuthRequest {
            name: &credentials.username,
            pwd: &credentials.password,
        };
        let ack: AckReply = self.call("Auth", &req)?;
        Ok(ack.into())
    }

    fn ping(&mut self) -> ChannelResult<i8> {
        let reply: PingReply = self.call("Ping", &serde_json::json!({}))?;
        Ok(reply.value)
    }
}

/// Maps a reqwest failure onto the channel error classes.
fn classify(err: reqwest::Error) -> ChannelError {
    let kind = if err.is_timeout() {
        TransportErrorKind::TimedOut
    } else if err.is_connect() {
        TransportErrorKind::NotOpen
    } else if err.is_builder() {
        TransportErrorKind::BadArgs
    } else if err.is_decode() || err.is_redirect() {
        return ChannelError::protocol(err.to_string());
    } else if err.is_body() || err.is_request() {
        TransportErrorKind::EndOfFile
    } else {
        TransportErrorKind::Unknown
    };
    ChannelError::transport(kind, err.to_string())
}

#[derive(Serialize)]
struct FileRequest<'a> {
    name: &'a str,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    compress: Option<i8>,
}

#[derive(Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest<'a> {
    old_path: &'a str,
    new_path: &'a str,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    name: &'a str,
    pwd: &'a str,
}

#[derive(Deserialize, Default)]
struct ErrorWire {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize)]
struct AckReply {
    ok: bool,
    #[serde(default)]
    error: Option<ErrorWire>,
}

impl From<AckReply> for Ack {
    fn from(reply: AckReply) -> Self {
        let error = reply.error.unwrap_or_default();
        Ack {
            ok: reply.ok,
            code: error.code,
            info: error.info,
        }
    }
}

#[derive(Deserialize)]
struct DataWire {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirItemWire {
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    mtime: i64,
    #[serde(default)]
    is_dir: bool,
}

#[derive(Deserialize)]
struct DirListWire {
    #[serde(default)]
    path: String,
    #[serde(default)]
    items: Vec<DirItemWire>,
    #[serde(default)]
    error: Option<ErrorWire>,
}

#[derive(Deserialize)]
struct PingReply {
    value: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_conversion() {
        let reply: AckReply =
            serde_json::from_str(r#"{"ok":false,"error":{"code":7,"info":"quota"}}"#).unwrap();
        let ack: Ack = reply.into();
        assert_eq!(ack, Ack::failed(7, "quota"));

        let reply: AckReply = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(Ack::from(reply), Ack::ok());
    }

    #[test]
    fn test_file_request_omits_zero_compress() {
        let req = FileRequest {
            name: "a.txt",
            data: BASE64.encode(b"hello"),
            compress: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"name": "a.txt", "data": "aGVsbG8="}));
    }

    #[test]
    fn test_dir_list_wire_defaults() {
        let wire: DirListWire = serde_json::from_str(
            r#"{"path":"/","items":[{"name":"docs","isDir":true},{"name":"a","size":3,"mtime":-5}]}"#,
        )
        .unwrap();
        assert_eq!(wire.items.len(), 2);
        assert!(wire.items[0].is_dir);
        assert_eq!(wire.items[1].mtime, -5);
        assert!(wire.error.is_none());
    }

    #[test]
    fn test_call_on_closed_channel() {
        let params = ConnectionParams::new("127.0.0.1", 9);
        let mut channel = HttpConnector::new().build(&params).unwrap();
        assert_eq!(channel.base_url(), "http://127.0.0.1:9");
        assert!(!channel.is_open());

        let err = channel.ping().unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Transport {
                kind: TransportErrorKind::NotOpen,
                ..
            }
        ));
    }

    #[test]
    fn test_with_scheme() {
        let params = ConnectionParams::new("files.example", 8443);
        let channel = HttpConnector::new()
            .with_scheme("https")
            .build(&params)
            .unwrap();
        assert_eq!(channel.base_url(), "https://files.example:8443");
    }
}
