//! Admin protocol client for a locally running mesh daemon.
//!
//! The daemon exposes a synchronous query interface over a stream socket:
//! one JSON request, one JSON reply, no request identifiers. [`AdminClient`]
//! holds a single long-lived connection, performs the bootstrap introspection
//! queries on connect, and exposes typed calls for the queries a crawl needs.
//!
//! # Examples
//!
//! Connecting to a daemon's TCP admin endpoint.
//!
//! ```no_run
//! use mesh_peers_client::{AdminClient, Endpoint};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AdminClient::connect(Endpoint::local_tcp()).await?;
//! println!("local node {}", client.local_key());
//!
//! for neighbor in client.neighbors() {
//!     println!("neighbor {neighbor}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod io;
mod query;
mod tcp;
#[cfg(unix)]
mod unix;

pub use error::ClientError;
pub use io::AsyncClient;
pub use query::{Reply, Request};
pub use tcp::TcpClient;
#[cfg(unix)]
pub use unix::UnixClient;

use crate::node::{NodeInfo, NodeKey};
use log::{debug, info};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Conventional TCP admin endpoint of a locally running daemon.
pub const DEFAULT_TCP_ENDPOINT: &str = "localhost:9001";
/// Conventional admin socket path of a locally running daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/mesh/mesh.sock";
/// Default bound on a single query/reply exchange.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);
/// How long to wait for the stream to come up.
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a daemon's admin interface listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// host:port of a TCP admin listener.
    Tcp(String),
    /// Path of a unix stream socket.
    Unix(PathBuf),
}

impl Endpoint {
    /// The daemon's conventional local TCP endpoint.
    pub fn local_tcp() -> Self {
        Endpoint::Tcp(DEFAULT_TCP_ENDPOINT.to_string())
    }

    /// The daemon's conventional admin socket.
    pub fn local_socket() -> Self {
        Endpoint::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

/// Transport-specific connections behind [`AdminClient`].
#[derive(Debug)]
enum Transport {
    Tcp(TcpClient),
    #[cfg(unix)]
    Unix(UnixClient),
}

impl Transport {
    async fn call(&mut self, request: &Request) -> Result<Reply, ClientError> {
        match self {
            Transport::Tcp(client) => client.call(request).await,
            #[cfg(unix)]
            Transport::Unix(client) => client.call(request).await,
        }
    }
}

/// A client for the daemon's admin query interface.
///
/// One connection is reused for the lifetime of the client. There is no
/// reconnect: a transport fault desynchronizes the ordered request/reply
/// pairing, so the client poisons itself and every later call returns
/// [`ClientError::NotConnected`]. Callers establish a new client instead.
///
/// Connecting performs the bootstrap introspection: the local node's key
/// (`getSelf`), its neighbor keys (`getPeers`), and its own cohort
/// memberships (`getNodeInfo` for the local key).
#[derive(Debug)]
pub struct AdminClient {
    /// `None` once a transport fault has poisoned the connection.
    transport: Option<Transport>,
    query_timeout: Duration,
    /// Local identity captured during bootstrap.
    key: NodeKey,
    /// Neighbor keys captured during bootstrap.
    neighbors: Vec<NodeKey>,
    /// The local node's own cohort memberships.
    groups: Vec<String>,
}

impl AdminClient {
    /// Connect to a daemon and run the bootstrap queries.
    ///
    /// # Returns
    ///
    /// * `Ok(AdminClient)` - A connected, bootstrapped client.
    /// * `Err(ClientError)` - If the endpoint is unreachable or bootstrap failed.
    pub async fn connect(endpoint: Endpoint) -> Result<Self, ClientError> {
        Self::connect_with_timeout(endpoint, DEFAULT_QUERY_TIMEOUT).await
    }

    /// Connect with a custom bound on each query/reply exchange.
    ///
    /// A query that outlives the bound is a fatal [`ClientError::Io`]: the
    /// late reply could never be told apart from the next query's reply.
    pub async fn connect_with_timeout(
        endpoint: Endpoint,
        query_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut transport = match endpoint {
            Endpoint::Tcp(addr) => Transport::Tcp(tcp::connect(&addr).await?),
            #[cfg(unix)]
            Endpoint::Unix(path) => Transport::Unix(unix::connect(&path).await?),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                )))
            }
        };

        // Bootstrap: local key, then first hops, then own cohort memberships.
        let payload = query_raw(&mut transport, query_timeout, &Request::GetSelf).await?;
        let key = self_key(payload)?;

        let payload = query_raw(&mut transport, query_timeout, &Request::GetPeers).await?;
        let neighbors = peer_keys(&payload);

        let groups = match query_raw(
            &mut transport,
            query_timeout,
            &Request::GetNodeInfo(key.clone()),
        )
        .await
        {
            Ok(payload) => NodeInfo::from_payload(key.clone(), payload)
                .groups()
                .to_vec(),
            // A node without a published info record is in no cohorts.
            Err(ClientError::Protocol { status }) => {
                debug!("No usable local info record (status {status:?})");
                Vec::new()
            }
            Err(ClientError::MalformedReply(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        info!(
            "Connected to daemon as {key}: {} neighbors, {} cohorts",
            neighbors.len(),
            groups.len()
        );

        Ok(AdminClient {
            transport: Some(transport),
            query_timeout,
            key,
            neighbors,
            groups,
        })
    }

    /// The local node's key.
    pub fn local_key(&self) -> &NodeKey {
        &self.key
    }

    /// The cohorts the local node is a member of.
    pub fn local_groups(&self) -> &[String] {
        &self.groups
    }

    /// The neighbor keys captured at connect time.
    pub fn neighbors(&self) -> &[NodeKey] {
        &self.neighbors
    }

    /// Issue a query and unwrap the reply payload.
    ///
    /// A non-success status is an error here; use [`AdminClient::query_tolerant`]
    /// when a failed query should read as an unreachable node instead.
    pub async fn query(&mut self, request: &Request) -> Result<Value, ClientError> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        let result = query_raw(transport, self.query_timeout, request).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                self.transport = None;
            }
        }
        result
    }

    /// Issue a query, reading failure as absence.
    ///
    /// A non-success status or an unusable payload becomes `Ok(None)`, so
    /// callers can treat "query failed" as "node unreachable". Transport
    /// faults still fail and poison the client.
    pub async fn query_tolerant(
        &mut self,
        request: &Request,
    ) -> Result<Option<Value>, ClientError> {
        match self.query(request).await {
            Ok(payload) => Ok(Some(payload)),
            Err(ClientError::Protocol { status }) => {
                debug!("{} query failed with status {status:?}", request.name());
                Ok(None)
            }
            Err(ClientError::MalformedReply(what)) => {
                debug!("{} reply unusable: {what}", request.name());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the daemon's current neighbor keys.
    pub async fn peers(&mut self) -> Result<Vec<NodeKey>, ClientError> {
        let payload = self.query(&Request::GetPeers).await?;
        Ok(peer_keys(&payload))
    }

    /// Fetch the info record advertised by a node, tolerantly.
    ///
    /// `None` means the node was unreachable or had no usable record.
    pub async fn node_info(&mut self, key: &NodeKey) -> Result<Option<NodeInfo>, ClientError> {
        let payload = self
            .query_tolerant(&Request::GetNodeInfo(key.clone()))
            .await?;
        Ok(payload.map(|payload| NodeInfo::from_payload(key.clone(), payload)))
    }

    /// Fetch the neighbor keys of a remote node, tolerantly.
    ///
    /// `None` means the node was unreachable or the reply carried no key list.
    pub async fn remote_peers(
        &mut self,
        key: &NodeKey,
    ) -> Result<Option<Vec<NodeKey>>, ClientError> {
        let payload = self
            .query_tolerant(&Request::GetRemotePeers(key.clone()))
            .await?;
        match payload {
            Some(payload) => match remote_keys(&payload) {
                Some(keys) => Ok(Some(keys)),
                None => {
                    debug!("Remote peer reply for {key} carried no key list");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

/// One bounded exchange: non-success status is an error, payload unwrapped.
async fn query_raw(
    transport: &mut Transport,
    query_timeout: Duration,
    request: &Request,
) -> Result<Value, ClientError> {
    let reply = match tokio::time::timeout(query_timeout, transport.call(request)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "query timed out waiting for reply",
            )))
        }
    };

    if !reply.is_success() {
        return Err(ClientError::Protocol {
            status: reply.status,
        });
    }
    reply
        .into_payload()
        .ok_or(ClientError::MalformedReply("reply envelope held no payload"))
}

/// Pull the local key out of a `getSelf` payload: a map keyed by the node's
/// address whose single entry carries a `key` field.
fn self_key(payload: Value) -> Result<NodeKey, ClientError> {
    let entry = payload
        .as_object()
        .and_then(|props| props.values().next())
        .ok_or(ClientError::MalformedReply("self payload held no entries"))?;
    let key = entry
        .get("key")
        .and_then(Value::as_str)
        .ok_or(ClientError::MalformedReply("self entry missing key"))?;
    NodeKey::new(key).map_err(|_| ClientError::MalformedReply("self entry key malformed"))
}

/// Extract neighbor keys from a `getPeers` payload, a map of peer address to
/// peer details. Entries without a valid key are dropped.
fn peer_keys(payload: &Value) -> Vec<NodeKey> {
    let Some(peers) = payload.as_object() else {
        return Vec::new();
    };
    peers
        .values()
        .filter_map(|entry| entry.get("key").and_then(Value::as_str))
        .filter_map(|key| match NodeKey::new(key) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!("Dropping malformed peer key: {e}");
                None
            }
        })
        .collect()
}

/// Extract the `keys` list from a remote peer payload.
fn remote_keys(payload: &Value) -> Option<Vec<NodeKey>> {
    let keys = payload.get("keys")?.as_array()?;
    Some(
        keys.iter()
            .filter_map(Value::as_str)
            .filter_map(|key| match NodeKey::new(key) {
                Ok(key) => Some(key),
                Err(e) => {
                    debug!("Dropping malformed remote peer key: {e}");
                    None
                }
            })
            .collect(),
    )
}
