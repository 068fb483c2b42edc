//! Request and reply message shapes for the daemon admin protocol.

use crate::node::NodeKey;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Reply status reported for a handled request.
const STATUS_SUCCESS: &str = "success";

/// A single admin protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Properties of the daemon's own node.
    GetSelf,
    /// The daemon's currently connected neighbors.
    GetPeers,
    /// The info record advertised by a node.
    GetNodeInfo(NodeKey),
    /// The neighbor keys of a remote node.
    GetRemotePeers(NodeKey),
}

impl Request {
    /// Wire name of the request kind.
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetSelf => "getSelf",
            Request::GetPeers => "getPeers",
            Request::GetNodeInfo(_) => "getNodeInfo",
            Request::GetRemotePeers(_) => "debug_remoteGetPeers",
        }
    }

    /// The key a keyed request targets.
    pub fn key(&self) -> Option<&NodeKey> {
        match self {
            Request::GetSelf | Request::GetPeers => None,
            Request::GetNodeInfo(key) | Request::GetRemotePeers(key) => Some(key),
        }
    }

    /// Serialize the request to its wire message.
    ///
    /// The keepalive flag is always set so the daemon holds the connection
    /// open across queries.
    pub fn to_message(&self) -> Value {
        let mut message = json!({
            "request": self.name(),
            "keepalive": true,
        });
        if let Some(key) = self.key() {
            message["key"] = Value::String(key.as_str().to_string());
        }
        message
    }
}

/// Envelope wrapping every daemon reply.
///
/// The actual result is nested one level down under a single dynamic key,
/// named after the request kind.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    /// Whether the daemon handled the request.
    pub status: String,
    /// The nested result, keyed by a single dynamic name.
    #[serde(default)]
    pub response: Map<String, Value>,
}

impl Reply {
    /// Whether the daemon reported success.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Unwrap the single level of nesting around the result payload.
    pub fn into_payload(self) -> Option<Value> {
        self.response.into_iter().next().map(|(_, payload)| payload)
    }
}
