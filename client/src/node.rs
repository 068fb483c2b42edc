//! Node identity and advertised info records.

use serde_json::{Map, Value};
use std::fmt;

/// Length of a node key rendered as lowercase hex.
pub const NODE_KEY_LEN: usize = 64;
/// Field under which a node advertises cohort membership in its info record.
pub const COHORT_FIELD: &str = "cohort";

/// Errors that can occur while validating a node key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKeyError {
    /// The rendering is not exactly [`NODE_KEY_LEN`] characters.
    InvalidLength(usize),
    /// The rendering contains a non lowercase-hex character.
    InvalidCharacter(char),
}

impl fmt::Display for NodeKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKeyError::InvalidLength(len) => {
                write!(f, "Node key must be {NODE_KEY_LEN} characters, got {len}")
            }
            NodeKeyError::InvalidCharacter(c) => {
                write!(f, "Node key must be lowercase hex, got {c:?}")
            }
        }
    }
}

impl std::error::Error for NodeKeyError {}

/// A node's stable identifier within the mesh.
///
/// The key is a node's public key rendered as 64 lowercase hex characters
/// and serves as the universal vertex identity in the peer graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(String);

impl NodeKey {
    /// Validate a key rendering.
    ///
    /// # Returns
    ///
    /// * `Ok(NodeKey)` - The validated key.
    /// * `Err(NodeKeyError)` - If the rendering has the wrong length or alphabet.
    pub fn new<S: Into<String>>(key: S) -> Result<Self, NodeKeyError> {
        let key = key.into();
        if key.len() != NODE_KEY_LEN {
            return Err(NodeKeyError::InvalidLength(key.len()));
        }
        if let Some(c) = key
            .chars()
            .find(|c| !c.is_ascii_hexdigit() || c.is_ascii_uppercase())
        {
            return Err(NodeKeyError::InvalidCharacter(c));
        }
        Ok(NodeKey(key))
    }

    /// The hex rendering of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the key into two equal halves.
    ///
    /// Host name labels cap out at 63 characters, so a full key never fits in
    /// one. The halves are used as consecutive labels when a key is embedded
    /// in a host-shaped token.
    pub fn fragments(&self) -> (&str, &str) {
        self.0.split_at(NODE_KEY_LEN / 2)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The info record advertised by a node, paired with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// The node the record belongs to.
    pub key: NodeKey,
    /// The shape of the advertised record.
    pub record: NodeRecord,
}

/// The shape of a node's advertised info.
///
/// Cohort membership is a pattern match on this type rather than a key
/// lookup in a dynamic map.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRecord {
    /// Arbitrary node info with no usable cohort membership.
    Basic(Map<String, Value>),
    /// The node advertises membership in one or more cohorts.
    CohortMember {
        /// Cohort names the node has opted into, in advertised order.
        groups: Vec<String>,
        /// The address peers should dial, when advertised.
        address: Option<String>,
    },
}

impl NodeInfo {
    /// Interpret a raw info payload for `key`.
    ///
    /// Membership requires a [`COHORT_FIELD`] sub-record carrying a `groups`
    /// list of strings; any other shape is carried as [`NodeRecord::Basic`].
    pub fn from_payload(key: NodeKey, payload: Value) -> Self {
        let map = match payload {
            Value::Object(map) => map,
            other => {
                // Non-object info is unusual but not an error.
                let mut map = Map::new();
                map.insert("info".to_string(), other);
                return NodeInfo {
                    key,
                    record: NodeRecord::Basic(map),
                };
            }
        };

        let record = match cohort_record(&map) {
            Some((groups, address)) => NodeRecord::CohortMember { groups, address },
            None => NodeRecord::Basic(map),
        };

        NodeInfo { key, record }
    }

    /// Whether the node advertises cohort membership.
    pub fn is_cohort_member(&self) -> bool {
        matches!(self.record, NodeRecord::CohortMember { .. })
    }

    /// The cohorts the node advertises, empty for basic records.
    pub fn groups(&self) -> &[String] {
        match &self.record {
            NodeRecord::Basic(_) => &[],
            NodeRecord::CohortMember { groups, .. } => groups,
        }
    }

    /// The address the node advertises for cohort peering, if any.
    pub fn address(&self) -> Option<&str> {
        match &self.record {
            NodeRecord::Basic(_) => None,
            NodeRecord::CohortMember { address, .. } => address.as_deref(),
        }
    }
}

/// Pull a usable cohort sub-record out of an info map.
fn cohort_record(map: &Map<String, Value>) -> Option<(Vec<String>, Option<String>)> {
    let cohort = map.get(COHORT_FIELD)?.as_object()?;
    let groups = cohort
        .get("groups")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect::<Vec<_>>();
    let address = cohort
        .get("address")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some((groups, address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> NodeKey {
        NodeKey::new("00000000000000000000000000000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn test_node_key_validation() {
        let hex = "f".repeat(NODE_KEY_LEN);
        assert!(NodeKey::new(hex).is_ok());

        assert_eq!(
            NodeKey::new("abc123"),
            Err(NodeKeyError::InvalidLength(6))
        );
        let upper = "A".repeat(NODE_KEY_LEN);
        assert_eq!(
            NodeKey::new(upper),
            Err(NodeKeyError::InvalidCharacter('A'))
        );
        let stray = format!("{}z", "0".repeat(NODE_KEY_LEN - 1));
        assert_eq!(
            NodeKey::new(stray),
            Err(NodeKeyError::InvalidCharacter('z'))
        );
    }

    #[test]
    fn test_node_key_fragments() {
        let key = key();
        let (front, back) = key.fragments();
        assert_eq!(front.len(), NODE_KEY_LEN / 2);
        assert_eq!(back.len(), NODE_KEY_LEN / 2);
        assert_eq!(format!("{front}{back}"), key.as_str());
    }

    #[test]
    fn test_cohort_member_record() {
        let info = NodeInfo::from_payload(
            key(),
            json!({
                "name": "somenode",
                "cohort": {
                    "groups": ["alpha", "beta"],
                    "address": "203.0.113.7"
                }
            }),
        );

        assert!(info.is_cohort_member());
        assert_eq!(info.groups(), ["alpha", "beta"]);
        assert_eq!(info.address(), Some("203.0.113.7"));
    }

    #[test]
    fn test_basic_record_without_cohort() {
        let info = NodeInfo::from_payload(key(), json!({"name": "somenode"}));

        assert!(!info.is_cohort_member());
        assert!(info.groups().is_empty());
        assert_eq!(info.address(), None);
    }

    #[test]
    fn test_malformed_cohort_falls_back_to_basic() {
        // groups must be a list of strings.
        let info = NodeInfo::from_payload(key(), json!({"cohort": {"groups": "alpha"}}));
        assert!(!info.is_cohort_member());

        // A cohort record without groups is unusable.
        let info = NodeInfo::from_payload(key(), json!({"cohort": {"address": "203.0.113.7"}}));
        assert!(!info.is_cohort_member());

        // Non-object info payloads are retained, not dropped.
        let info = NodeInfo::from_payload(key(), json!("plain string"));
        assert!(!info.is_cohort_member());
    }

    #[test]
    fn test_member_without_address() {
        let info = NodeInfo::from_payload(key(), json!({"cohort": {"groups": ["alpha"]}}));
        assert!(info.is_cohort_member());
        assert_eq!(info.address(), None);
    }
}
