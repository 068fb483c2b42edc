//! Builder pattern for configuring and creating crawler instances.

use crate::crawler::Crawler;
use crate::filter::MembershipFilter;
use mesh_peers_client::NodeKey;
use std::fmt;

/// Default cap on confirmed cohort members found per run.
const DEFAULT_MEMBER_BUDGET: usize = 16;
/// Default capacity of each deduplication filter.
const DEFAULT_FILTER_CAPACITY: usize = 1 << 16;
/// Default false-positive rate of each deduplication filter.
const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Errors that can occur during crawler configuration.
#[derive(Debug, Clone)]
pub enum CrawlerBuilderError {
    /// Filter capacity must be non-zero and the false-positive rate must be
    /// strictly between zero and one.
    InvalidFilterParameters {
        /// The configured capacity.
        capacity: usize,
        /// The configured false-positive rate.
        false_positive_rate: f64,
    },
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::InvalidFilterParameters {
                capacity,
                false_positive_rate,
            } => {
                write!(
                    f,
                    "Invalid filter parameters: capacity {capacity}, false-positive rate {false_positive_rate}"
                )
            }
        }
    }
}

impl std::error::Error for CrawlerBuilderError {}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), mesh_peers_crawler::CrawlerBuilderError> {
/// use mesh_peers_crawler::CrawlerBuilder;
///
/// // A crawler seeded from the daemon's own neighbors.
/// let basic_crawler = CrawlerBuilder::new().build()?;
///
/// // A crawler with a larger member budget and tighter filters.
/// let custom_crawler = CrawlerBuilder::new()
///     .with_member_budget(64)
///     .with_filter_capacity(1 << 20)
///     .with_false_positive_rate(0.0001)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlerBuilder {
    /// Initial frontier content, in order.
    seeds: Vec<NodeKey>,
    /// Maximum confirmed members to find before stopping.
    member_budget: usize,
    /// Capacity of each deduplication filter.
    filter_capacity: usize,
    /// False-positive rate of each deduplication filter.
    false_positive_rate: f64,
    /// Injected filter of settled keys, for persistence across runs.
    resolved_filter: Option<MembershipFilter>,
}

impl CrawlerBuilder {
    /// Create a new crawler builder with default settings.
    pub fn new() -> Self {
        CrawlerBuilder {
            seeds: Vec::new(),
            member_budget: DEFAULT_MEMBER_BUDGET,
            filter_capacity: DEFAULT_FILTER_CAPACITY,
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            resolved_filter: None,
        }
    }

    /// Seed the frontier with an explicit key list instead of the daemon's
    /// live neighbor list.
    ///
    /// Useful for resuming from a previous run's exported peer entries, see
    /// [`seed_keys`](crate::seed_keys).
    pub fn with_seeds(mut self, seeds: Vec<NodeKey>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Set the maximum number of confirmed cohort members to find.
    ///
    /// The crawl stops once this many members are discovered, or earlier if
    /// the reachable graph is exhausted. Defaults to 16.
    pub fn with_member_budget(mut self, budget: usize) -> Self {
        self.member_budget = budget;
        self
    }

    /// Set the expected key capacity of the deduplication filters.
    ///
    /// Sizing below the number of keys the crawl actually touches raises the
    /// effective false-positive rate, which silently skips nodes. Defaults
    /// to 65536.
    pub fn with_filter_capacity(mut self, capacity: usize) -> Self {
        self.filter_capacity = capacity;
        self
    }

    /// Set the target false-positive rate of the deduplication filters.
    ///
    /// A false positive reads as "already handled" and skips a node, so the
    /// rate bounds how much of the graph a run may silently miss. Defaults
    /// to 0.001.
    pub fn with_false_positive_rate(mut self, rate: f64) -> Self {
        self.false_positive_rate = rate;
        self
    }

    /// Inject the filter of settled keys, typically one loaded from a
    /// snapshot so known non-members survive across runs.
    ///
    /// See [`MembershipFilter::load_or_new`].
    pub fn with_resolved_filter(mut self, filter: MembershipFilter) -> Self {
        self.resolved_filter = Some(filter);
        self
    }

    /// Build the crawler with the configured options.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - A configured crawler.
    /// * `Err(CrawlerBuilderError)` - If the filter parameters are unusable.
    pub fn build(self) -> Result<Crawler, CrawlerBuilderError> {
        if self.filter_capacity == 0
            || self.false_positive_rate <= 0.0
            || self.false_positive_rate >= 1.0
        {
            return Err(CrawlerBuilderError::InvalidFilterParameters {
                capacity: self.filter_capacity,
                false_positive_rate: self.false_positive_rate,
            });
        }

        let resolved = self
            .resolved_filter
            .unwrap_or_else(|| MembershipFilter::new(self.filter_capacity, self.false_positive_rate));
        let queried = MembershipFilter::new(self.filter_capacity, self.false_positive_rate);
        let peered = MembershipFilter::new(self.filter_capacity, self.false_positive_rate);

        Ok(Crawler::new(
            self.seeds,
            self.member_budget,
            resolved,
            queried,
            peered,
        ))
    }
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        assert!(CrawlerBuilder::new().build().is_ok());
    }

    #[test]
    fn test_rejects_bad_filter_parameters() {
        assert!(matches!(
            CrawlerBuilder::new().with_false_positive_rate(0.0).build(),
            Err(CrawlerBuilderError::InvalidFilterParameters { .. })
        ));
        assert!(matches!(
            CrawlerBuilder::new().with_false_positive_rate(1.0).build(),
            Err(CrawlerBuilderError::InvalidFilterParameters { .. })
        ));
        assert!(matches!(
            CrawlerBuilder::new().with_filter_capacity(0).build(),
            Err(CrawlerBuilderError::InvalidFilterParameters { .. })
        ));
    }
}
