mod builder;
mod cohort;
mod connection;
mod crawler;
mod export;
mod filter;

pub use builder::{CrawlerBuilder, CrawlerBuilderError};
pub use cohort::{cohorts, CohortMap, CohortPeer};
pub use connection::AdminQuery;
pub use crawler::{CancelToken, CrawlError, CrawlReport, Crawler, Discovered, Termination};
pub use export::{peer_line, peer_lines, seed_keys};
pub use filter::MembershipFilter;

// Re-exports.
pub use mesh_peers_client::{
    AdminClient, ClientError, Endpoint, NodeInfo, NodeKey, NodeKeyError, NodeRecord,
};
