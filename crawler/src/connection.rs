//! Daemon client abstraction for testing and mocking.
//!
//! This module provides the [`AdminQuery`] trait that abstracts the admin
//! queries the crawler issues, enabling dependency injection for testing
//! without modifying the core crawl logic.

use mesh_peers_client::{AdminClient, ClientError, NodeInfo, NodeKey};

/// The admin queries a crawl needs from a daemon client.
///
/// The keyed queries are tolerant: `Ok(None)` means the node was unreachable
/// or its reply was unusable, and the crawl moves on. An `Err` is a
/// connection-level fault and aborts the whole run.
pub trait AdminQuery: Send {
    /// The daemon's current neighbor keys, used to seed an empty frontier.
    fn neighbors(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Vec<NodeKey>, ClientError>> + Send;

    /// The info record advertised by a node.
    fn node_info(
        &mut self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Option<NodeInfo>, ClientError>> + Send;

    /// The neighbor keys of a remote node.
    fn remote_peers(
        &mut self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Option<Vec<NodeKey>>, ClientError>> + Send;
}

/// Implementation of AdminQuery for the client type from mesh-peers-client.
impl AdminQuery for AdminClient {
    async fn neighbors(&mut self) -> Result<Vec<NodeKey>, ClientError> {
        // The bootstrap neighbor list, not a fresh getPeers: seeds should
        // reflect the daemon state the run started from.
        Ok(AdminClient::neighbors(self).to_vec())
    }

    async fn node_info(&mut self, key: &NodeKey) -> Result<Option<NodeInfo>, ClientError> {
        AdminClient::node_info(self, key).await
    }

    async fn remote_peers(&mut self, key: &NodeKey) -> Result<Option<Vec<NodeKey>>, ClientError> {
        AdminClient::remote_peers(self, key).await
    }
}
