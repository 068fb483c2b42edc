mod client;
mod node;

#[cfg(unix)]
pub use client::UnixClient;
pub use client::{
    AdminClient, AsyncClient, ClientError, Endpoint, Reply, Request, TcpClient,
    DEFAULT_QUERY_TIMEOUT, DEFAULT_SOCKET_PATH, DEFAULT_TCP_ENDPOINT,
};
pub use node::{NodeInfo, NodeKey, NodeKeyError, NodeRecord, COHORT_FIELD, NODE_KEY_LEN};
