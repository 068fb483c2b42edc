//! Integration tests driving [`AdminClient`] against an in-process daemon.
//!
//! A scripted admin listener runs on a local TCP socket, decoding requests
//! and answering with canned envelopes, so the full connect/bootstrap/query
//! path is exercised without a live mesh daemon.

use mesh_peers_client::{AdminClient, ClientError, Endpoint, NodeKey};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SELF_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const NEIGHBOR_KEY: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const STRANGER_KEY: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

fn success(response: Value) -> Value {
    json!({"status": "success", "response": response})
}

fn error_status() -> Value {
    json!({"status": "error", "response": {}})
}

/// Read one JSON request off the stream, buffering partial values.
async fn read_request(stream: &mut TcpStream, pending: &mut Vec<u8>) -> Option<Value> {
    loop {
        if !pending.is_empty() {
            let (decoded, consumed) = {
                let mut values =
                    serde_json::Deserializer::from_slice(pending).into_iter::<Value>();
                let decoded = values.next();
                (decoded, values.byte_offset())
            };
            match decoded {
                Some(Ok(value)) => {
                    pending.drain(..consumed);
                    return Some(value);
                }
                Some(Err(e)) if e.is_eof() => {}
                Some(Err(_)) | None => return None,
            }
        }
        let mut chunk = [0u8; 1024];
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => pending.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Bind a scripted daemon on a local port; `respond` maps each request to a
/// reply envelope, or `None` to drop the connection.
async fn spawn_daemon<F>(respond: F) -> String
where
    F: Fn(&Value) -> Option<Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut pending = Vec::new();
        while let Some(request) = read_request(&mut stream, &mut pending).await {
            // The client promises to always keep the connection open.
            if request["keepalive"] != Value::Bool(true) {
                break;
            }
            match respond(&request) {
                Some(envelope) => {
                    let bytes = serde_json::to_vec(&envelope).unwrap();
                    if stream.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    });

    addr
}

/// A daemon serving one cohort-member neighbor and failing anything else.
fn standard_responder() -> impl Fn(&Value) -> Option<Value> + Send + 'static {
    |request: &Value| {
        let kind = request["request"].as_str()?;
        match kind {
            "getSelf" => Some(success(json!({
                "self": {"200:1111::1": {"key": SELF_KEY, "build_version": "0.5"}}
            }))),
            "getPeers" => Some(success(json!({
                "peers": {"192.0.2.1:9001": {"key": NEIGHBOR_KEY, "up": true}}
            }))),
            "getNodeInfo" => match request["key"].as_str() {
                Some(key) if key == SELF_KEY => Some(success(json!({
                    "nodeinfo": {"cohort": {"groups": ["alpha", "gamma"], "address": "203.0.113.1"}}
                }))),
                Some(key) if key == NEIGHBOR_KEY => Some(success(json!({
                    "nodeinfo": {"cohort": {"groups": ["alpha"], "address": "203.0.113.7"}}
                }))),
                _ => Some(error_status()),
            },
            "debug_remoteGetPeers" => match request["key"].as_str() {
                Some(key) if key == NEIGHBOR_KEY => Some(success(json!({
                    NEIGHBOR_KEY: {"keys": [SELF_KEY, STRANGER_KEY]}
                }))),
                _ => Some(error_status()),
            },
            _ => Some(error_status()),
        }
    }
}

#[tokio::test]
async fn test_connect_bootstraps_identity() {
    let addr = spawn_daemon(standard_responder()).await;
    let client = AdminClient::connect(Endpoint::Tcp(addr)).await.unwrap();

    assert_eq!(client.local_key().as_str(), SELF_KEY);
    assert_eq!(client.neighbors().len(), 1);
    assert_eq!(client.neighbors()[0].as_str(), NEIGHBOR_KEY);
    assert_eq!(client.local_groups(), ["alpha", "gamma"]);
}

#[tokio::test]
async fn test_node_info_tolerates_unknown_nodes() {
    let addr = spawn_daemon(standard_responder()).await;
    let mut client = AdminClient::connect(Endpoint::Tcp(addr)).await.unwrap();

    let neighbor = NodeKey::new(NEIGHBOR_KEY).unwrap();
    let info = client.node_info(&neighbor).await.unwrap().unwrap();
    assert!(info.is_cohort_member());
    assert_eq!(info.groups(), ["alpha"]);
    assert_eq!(info.address(), Some("203.0.113.7"));

    // The daemon reports an error status for strangers: absorbed as absence.
    let stranger = NodeKey::new(STRANGER_KEY).unwrap();
    assert!(client.node_info(&stranger).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_peers_round_trip() {
    let addr = spawn_daemon(standard_responder()).await;
    let mut client = AdminClient::connect(Endpoint::Tcp(addr)).await.unwrap();

    let neighbor = NodeKey::new(NEIGHBOR_KEY).unwrap();
    let peers = client.remote_peers(&neighbor).await.unwrap().unwrap();
    let rendered: Vec<&str> = peers.iter().map(|key| key.as_str()).collect();
    assert_eq!(rendered, [SELF_KEY, STRANGER_KEY]);

    let stranger = NodeKey::new(STRANGER_KEY).unwrap();
    assert!(client.remote_peers(&stranger).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_peers_without_key_list() {
    let addr = spawn_daemon(|request: &Value| {
        let kind = request["request"].as_str()?;
        match kind {
            "getSelf" => Some(success(json!({"self": {"a": {"key": SELF_KEY}}}))),
            "getPeers" => Some(success(json!({"peers": {}}))),
            "getNodeInfo" => Some(error_status()),
            // Success envelope whose payload is missing the keys list.
            "debug_remoteGetPeers" => Some(success(json!({"peers": {"up": true}}))),
            _ => Some(error_status()),
        }
    })
    .await;
    let mut client = AdminClient::connect(Endpoint::Tcp(addr)).await.unwrap();

    let neighbor = NodeKey::new(NEIGHBOR_KEY).unwrap();
    assert!(client.remote_peers(&neighbor).await.unwrap().is_none());
}

#[tokio::test]
async fn test_dropped_connection_poisons_client() {
    let addr = spawn_daemon(|request: &Value| {
        let kind = request["request"].as_str()?;
        match kind {
            "getSelf" => Some(success(json!({"self": {"a": {"key": SELF_KEY}}}))),
            "getPeers" => Some(success(json!({"peers": {}}))),
            "getNodeInfo" if request["key"] == SELF_KEY => Some(error_status()),
            // Hang up on anything else.
            _ => None,
        }
    })
    .await;
    let mut client = AdminClient::connect(Endpoint::Tcp(addr)).await.unwrap();

    let stranger = NodeKey::new(STRANGER_KEY).unwrap();
    let err = client.node_info(&stranger).await.unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));

    // No reconnect: the client stays dead.
    let err = client.node_info(&stranger).await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn test_connect_fails_without_daemon() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = AdminClient::connect(Endpoint::Tcp(addr)).await;
    assert!(matches!(result, Err(ClientError::Io(_))));
}
