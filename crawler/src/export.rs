//! Rendering cohorts as peer-entry lines.
//!
//! Each member becomes one line of `<address> <token>`, where the token is a
//! host-shaped dotted rendering of the cohort name and the member's key. The
//! key is embedded as two consecutive labels since a full key exceeds the
//! label length limit. Durable storage of the lines is a caller concern.

use crate::cohort::CohortMap;
use mesh_peers_client::NodeKey;

/// Pseudo top-level domain closing every peer token.
const PEER_TLD: &str = "yg";

/// Render one peer entry line.
pub fn peer_line(address: &str, cohort: &str, key: &NodeKey) -> String {
    let (front, back) = key.fragments();
    format!("{address} {cohort}.{front}.{back}.{PEER_TLD}")
}

/// Render every (cohort, member) pair as peer entry lines.
///
/// Cohorts appear in map order, members in their cohort's list order.
pub fn peer_lines(cohorts: &CohortMap) -> Vec<String> {
    cohorts
        .iter()
        .flat_map(|(cohort, members)| {
            members
                .iter()
                .map(move |peer| peer_line(&peer.address, cohort, &peer.key))
        })
        .collect()
}

/// Recover node keys from previously exported peer lines.
///
/// Lets a later crawl seed its frontier from an earlier run's output instead
/// of the daemon's live neighbor list. Lines that do not parse are skipped.
pub fn seed_keys<'a, I>(lines: I) -> Vec<NodeKey>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter_map(parse_key).collect()
}

/// Pull the key halves back out of a line's host-shaped token.
fn parse_key(line: &str) -> Option<NodeKey> {
    let token = line.split_whitespace().last()?;
    let mut labels = token.split('.');
    let _cohort = labels.next()?;
    let front = labels.next()?;
    let back = labels.next()?;
    NodeKey::new(format!("{front}{back}")).ok()
}
