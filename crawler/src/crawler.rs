//! Bounded traversal of the mesh peer graph.

use crate::connection::AdminQuery;
use crate::filter::MembershipFilter;
use log::{debug, info};
use mesh_peers_client::{ClientError, NodeInfo, NodeKey};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Nodes confirmed to advertise cohort membership, with deterministic
/// iteration order for the downstream cohort grouping.
pub type Discovered = BTreeMap<NodeKey, NodeInfo>;

/// Why a crawl run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The confirmed-member budget was met.
    BudgetMet,
    /// The frontier drained before the budget was met; the reachable graph
    /// was exhausted.
    FrontierExhausted,
    /// The cancel token fired between queries.
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::BudgetMet => write!(f, "member budget met"),
            Termination::FrontierExhausted => write!(f, "frontier exhausted"),
            Termination::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Errors that abort a crawl run.
///
/// Individual unreachable nodes never raise this; they are absorbed into
/// filter state and the crawl moves on.
#[derive(Debug)]
pub enum CrawlError {
    /// The daemon connection failed.
    Client(ClientError),
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlError::Client(err) => write!(f, "Crawl aborted: {err}"),
        }
    }
}

impl std::error::Error for CrawlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlError::Client(err) => Some(err),
        }
    }
}

impl From<ClientError> for CrawlError {
    fn from(err: ClientError) -> Self {
        CrawlError::Client(err)
    }
}

/// Outcome of a completed crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Confirmed cohort members and their info records.
    pub discovered: Discovered,
    /// Why the run stopped.
    pub termination: Termination,
    /// Info queries actually issued.
    pub attempted: usize,
}

/// Flag for aborting a crawl between queries.
///
/// Cheap to clone and hand to another task. Cancellation is checked once per
/// frontier pop, so filter marks and the discovered map are never torn.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unfired token.
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    /// Ask the crawl to stop at the next loop iteration.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A crawler for cohort members in the mesh peer graph.
///
/// The crawler owns a FIFO frontier of node keys and three approximate-set
/// filters with independent meanings:
///
/// * `resolved` - keys whose info is settled: unreachable, or reachable but
///   not a cohort member.
/// * `queried` - keys whose info query was already attempted.
/// * `peered` - keys whose peer list was already fetched.
///
/// Keys are marked in a filter *before* the corresponding query is issued,
/// so a query that fails, times out, or gets cancelled is never retried
/// within the run (or across runs, for a persistence-backed filter).
///
/// Built through [`CrawlerBuilder`](crate::CrawlerBuilder).
#[derive(Debug)]
pub struct Crawler {
    /// Pending node keys, discovery order. Duplicates are allowed here and
    /// filtered at consumption time.
    frontier: VecDeque<NodeKey>,
    /// Stop after this many confirmed members.
    member_budget: usize,
    resolved: MembershipFilter,
    queried: MembershipFilter,
    peered: MembershipFilter,
    /// Members discovered so far; survives a failed run for inspection.
    discovered: Discovered,
    cancel: CancelToken,
}

impl Crawler {
    pub(crate) fn new(
        seeds: Vec<NodeKey>,
        member_budget: usize,
        resolved: MembershipFilter,
        queried: MembershipFilter,
        peered: MembershipFilter,
    ) -> Self {
        Crawler {
            frontier: seeds.into(),
            member_budget,
            resolved,
            queried,
            peered,
            discovered: Discovered::new(),
            cancel: CancelToken::new(),
        }
    }

    /// A token that aborts the run at the next loop iteration.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The members found so far.
    ///
    /// Mostly useful after a failed run: the discovered map and the filters
    /// keep whatever state the run reached, there is no rollback.
    pub fn discovered(&self) -> &Discovered {
        &self.discovered
    }

    /// The filter of keys with settled info, for callers persisting it
    /// across runs.
    pub fn resolved_filter(&self) -> &MembershipFilter {
        &self.resolved
    }

    /// Crawl the peer graph until the member budget is met, the frontier
    /// drains, or the run is cancelled.
    ///
    /// An empty frontier is seeded from the daemon's neighbor list. Each
    /// popped key gets at most one info query and one peer-list query per
    /// run; unreachable nodes are absorbed as settled and never retried.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The discovered members and why the run stopped.
    /// * `Err(CrawlError)` - The daemon connection failed; partial results
    ///   stay readable through [`Crawler::discovered`].
    pub async fn run<C: AdminQuery>(&mut self, client: &mut C) -> Result<CrawlReport, CrawlError> {
        if self.frontier.is_empty() {
            let seeds = client.neighbors().await?;
            info!("Seeding frontier with {} daemon neighbors", seeds.len());
            self.frontier.extend(seeds);
        } else {
            info!("Seeding frontier with {} supplied keys", self.frontier.len());
        }

        self.discovered.clear();
        let mut found = 0;
        let mut attempted = 0;

        let termination = loop {
            if found >= self.member_budget {
                break Termination::BudgetMet;
            }
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            let Some(key) = self.frontier.pop_front() else {
                break Termination::FrontierExhausted;
            };

            if !self.resolved.contains(&key) && !self.queried.contains(&key) {
                // Mark before querying so a failed attempt is never retried.
                self.queried.insert(&key);
                attempted += 1;
                match client.node_info(&key).await? {
                    None => {
                        debug!("Unreachable node {key}");
                        self.resolved.insert(&key);
                    }
                    Some(info) if info.is_cohort_member() => {
                        found += 1;
                        debug!("Confirmed member {key} ({found}/{})", self.member_budget);
                        self.discovered.insert(key.clone(), info);
                    }
                    Some(_) => {
                        debug!("Node {key} is not a cohort member");
                        self.resolved.insert(&key);
                    }
                }
            }

            if !self.peered.contains(&key) {
                self.peered.insert(&key);
                match client.remote_peers(&key).await? {
                    Some(peers) => {
                        debug!("Node {key} advertised {} peers", peers.len());
                        self.frontier.extend(peers);
                    }
                    None => debug!("No peer list from {key}"),
                }
            }
        };

        info!(
            "Crawl finished ({termination}): {found} members over {attempted} info queries"
        );
        Ok(CrawlReport {
            discovered: self.discovered.clone(),
            termination,
            attempted,
        })
    }
}
