// `HttpChannel` against a `wiremock` gateway. The mock server runs on its
// own thread; the tokio runtime here only drives its setup and inspection.

use serde_json::{json, Value};
use std::net::TcpListener;
use std::time::Duration;
use tokio::runtime::Runtime;
use wfs_client::http::HttpConnector;
use wfs_client::{
    ChannelError, ConnectionParams, Connector, Credentials, FileBlob, FileClient, RpcChannel,
    Session, SessionState, TransportErrorKind,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Starts a gateway answering `HEAD /` plus one JSON reply per route.
fn start_gateway(rt: &Runtime, routes: Vec<(&str, Value)>) -> MockServer {
    rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        for (route, body) in routes {
            Mock::given(method("POST"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }
        server
    })
}

/// (method, path, JSON body) of every request the gateway saw, in order.
fn requests(rt: &Runtime, server: &MockServer) -> Vec<(String, String, Value)> {
    rt.block_on(server.received_requests())
        .unwrap_or_default()
        .into_iter()
        .map(|req| {
            let body = serde_json::from_slice(&req.body).unwrap_or(Value::Null);
            (req.method.to_string(), req.url.path().to_string(), body)
        })
        .collect()
}

fn connector() -> HttpConnector {
    HttpConnector::new().without_proxy()
}

fn params(port: u16) -> ConnectionParams {
    ConnectionParams::new("127.0.0.1", port)
        .with_connect_timeout(Duration::from_secs(2))
        .with_receive_timeout(Duration::from_secs(5))
        .with_send_timeout(Duration::from_secs(5))
        .with_retry_backoff(Duration::ZERO)
}

#[test]
fn test_open_against_closed_port_is_not_open() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut channel = connector().build(&params(port)).unwrap();
    let err = channel.open().unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Transport {
            kind: TransportErrorKind::NotOpen,
            ..
        }
    ));
    assert!(!channel.is_open());
}

#[test]
fn test_ping_round_trip() {
    let rt = runtime();
    let server = start_gateway(&rt, vec![("/rpc/Ping", json!({"value": 1}))]);

    let mut channel = connector().build(&params(server.address().port())).unwrap();
    channel.open().unwrap();
    assert_eq!(channel.ping().unwrap(), 1);

    let seen = requests(&rt, &server);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "HEAD");
    assert_eq!(seen[1].0, "POST");
    assert_eq!(seen[1].1, "/rpc/Ping");
}

#[test]
fn test_session_over_http() {
    let rt = runtime();
    let server = start_gateway(
        &rt,
        vec![
            ("/rpc/Auth", json!({"ok": true})),
            (
                "/rpc/List",
                json!({
                    "path": "/",
                    "items": [
                        {"name": "b", "size": 2, "mtime": 20, "isDir": false},
                        {"name": "a", "size": 0, "mtime": 10, "isDir": true}
                    ]
                }),
            ),
            ("/rpc/Get", json!({"data": "aGVsbG8="})),
        ],
    );

    let session = Session::new(connector());
    session.connect(params(server.address().port())).unwrap();
    session
        .authenticate(Credentials::new("alice", "secret"))
        .unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);

    let listing = session.list_directory("/").unwrap();
    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert!(listing.entries[1].is_dir);

    assert_eq!(session.download_file("a.txt").unwrap(), b"hello");

    let seen = requests(&rt, &server);
    assert_eq!(seen[1].2, json!({"name": "alice", "pwd": "secret"}));
    assert_eq!(seen[3].2, json!({"path": "a.txt"}));
}

#[test]
fn test_application_error_over_http() {
    let rt = runtime();
    let server = start_gateway(
        &rt,
        vec![(
            "/rpc/Append",
            json!({"ok": false, "error": {"code": 17, "info": "disk full"}}),
        )],
    );

    let mut channel = connector().build(&params(server.address().port())).unwrap();
    channel.open().unwrap();
    let ack = channel
        .append(&FileBlob::new("big.bin", vec![1, 2, 3]).with_compress(1))
        .unwrap();
    assert!(!ack.ok);
    assert_eq!(ack.code, 17);
    assert_eq!(ack.info, "disk full");

    let seen = requests(&rt, &server);
    assert_eq!(
        seen[1].2,
        json!({"name": "big.bin", "data": "AQID", "compress": 1})
    );
}

#[test]
fn test_unknown_route_is_protocol_error() {
    let rt = runtime();
    let server = start_gateway(&rt, vec![]);

    let mut channel = connector().build(&params(server.address().port())).unwrap();
    channel.open().unwrap();
    let err = channel.delete("a.txt").unwrap_err();
    assert!(matches!(err, ChannelError::Protocol(_)));
    assert!(channel.is_open());
}
