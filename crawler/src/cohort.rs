//! Grouping discovered nodes into the cohorts shared with the local node.

use crate::crawler::Discovered;
use log::debug;
use mesh_peers_client::NodeKey;
use std::collections::BTreeMap;

/// Cohort name to members.
pub type CohortMap = BTreeMap<String, Vec<CohortPeer>>;

/// The reduced address-and-key view of a member used for peer entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortPeer {
    /// The address the node advertised for peering.
    pub address: String,
    /// The node's key.
    pub key: NodeKey,
}

/// Group discovered nodes under each cohort shared with `local_groups`.
///
/// A node belonging to several shared cohorts appears under each of them.
/// Members without an advertised address cannot become peer entries and are
/// skipped. Pure function of its inputs: the same discovered map and local
/// groups always produce the same cohort map, with members listed in
/// discovered-map order.
pub fn cohorts(discovered: &Discovered, local_groups: &[String]) -> CohortMap {
    let mut map = CohortMap::new();

    for (key, info) in discovered {
        let Some(address) = info.address() else {
            debug!("Member {key} advertised no address, skipping");
            continue;
        };

        for group in info.groups() {
            if local_groups.contains(group) {
                map.entry(group.clone()).or_default().push(CohortPeer {
                    address: address.to_string(),
                    key: key.clone(),
                });
            }
        }
    }

    map
}
