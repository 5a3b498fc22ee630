//! Crawler coordinator - main harvest orchestration logic
//!
//! This module wires the three tiers together:
//! - One FIFO queue and dispatcher task per tier
//! - Visits fetch a page, extract it, and enqueue whatever it links to
//! - A run-wide outstanding-visit count that reaches zero only when the
//!   list visit and everything it transitively spawned have settled
//!
//! The country collection is owned by the run; detail visits append to it
//! and region visits attach region batches, both through its mutex.

use crate::config::{Config, TiersConfig};
use crate::crawler::extract::{extract_detail, extract_detail_links, extract_regions};
use crate::crawler::fetcher::{Fetcher, HttpFetcher, Page};
use crate::crawler::scheduler::{QueuedUrl, Tier, TierScheduler};
use crate::crawler::Document;
use crate::output::HarvestStats;
use crate::state::{
    Country, CountryCollection, CountryMatcher, ExactNameMatcher, MergeOutcome, VisitState,
};
use crate::url::{is_allowed_host, resolve_link};
use crate::HarvestError;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// Main harvest coordinator structure
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    tiers: TiersConfig,
    allowed_host: String,
    matcher: Arc<dyn CountryMatcher>,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::from_config(
            &config.user_agent,
            &config.http,
            &config.site.allowed_host,
        )?;
        Ok(Self::with_fetcher(
            Arc::new(fetcher),
            config.tiers.clone(),
            config.site.allowed_host.clone(),
        ))
    }

    /// Creates a coordinator over any [`Fetcher`]
    pub fn with_fetcher(
        fetcher: Arc<dyn Fetcher>,
        tiers: TiersConfig,
        allowed_host: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            tiers,
            allowed_host: allowed_host.into(),
            matcher: Arc::new(ExactNameMatcher),
        }
    }

    /// Replaces the strategy that pairs region batches with countries
    pub fn with_matcher(mut self, matcher: Arc<dyn CountryMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Harvests everything reachable from `root` and returns the countries
    ///
    /// Returns only after every visit triggered from `root` has settled.
    /// Countries are ordered as their links appear on the list page.
    pub async fn run(&self, root: &Url) -> Vec<Country> {
        self.run_with_stats(root).await.0
    }

    /// Like [`Coordinator::run`], also returning visit statistics
    pub async fn run_with_stats(&self, root: &Url) -> (Vec<Country>, HarvestStats) {
        let start_time = std::time::Instant::now();
        tracing::info!(root = %root, "Starting harvest");

        let (outstanding_tx, mut outstanding_rx) = watch::channel(0usize);
        let (list_tx, list_rx) = mpsc::unbounded_channel();
        let (detail_tx, detail_rx) = mpsc::unbounded_channel();
        let (region_tx, region_rx) = mpsc::unbounded_channel();

        let harvest = Arc::new(Harvest {
            fetcher: Arc::clone(&self.fetcher),
            matcher: Arc::clone(&self.matcher),
            allowed_host: self.allowed_host.clone(),
            countries: CountryCollection::new(),
            stats: Mutex::new(HarvestStats::default()),
            outstanding: outstanding_tx,
            list_queue: list_tx,
            detail_queue: detail_tx,
            region_queue: region_tx,
        });

        let dispatchers: Vec<JoinHandle<()>> = vec![
            spawn_dispatcher(
                TierScheduler::new(Tier::List, self.tiers.list.clone()),
                list_rx,
                Arc::clone(&harvest),
            ),
            spawn_dispatcher(
                TierScheduler::new(Tier::Detail, self.tiers.detail.clone()),
                detail_rx,
                Arc::clone(&harvest),
            ),
            spawn_dispatcher(
                TierScheduler::new(Tier::Region, self.tiers.region.clone()),
                region_rx,
                Arc::clone(&harvest),
            ),
        ];

        harvest.enqueue(QueuedUrl::new(root.clone(), Tier::List, 0));

        // The harvest holds the sender, so the channel cannot close first.
        let _ = outstanding_rx.wait_for(|count| *count == 0).await;

        // Anything still running is only sleeping out a politeness pause.
        for dispatcher in dispatchers {
            dispatcher.abort();
            let _ = dispatcher.await;
        }

        let countries = harvest.countries.snapshot();
        let stats = harvest.stats_snapshot();

        tracing::info!(
            countries = countries.len(),
            failures = stats.total_failures(),
            merge_misses = stats.merge_misses,
            elapsed = ?start_time.elapsed(),
            "Harvest completed"
        );

        (countries, stats)
    }
}

/// Run-scoped state shared by all dispatchers and visits
struct Harvest {
    fetcher: Arc<dyn Fetcher>,
    matcher: Arc<dyn CountryMatcher>,
    allowed_host: String,
    countries: CountryCollection,
    stats: Mutex<HarvestStats>,
    /// Visits queued or in flight, across all tiers
    outstanding: watch::Sender<usize>,
    list_queue: mpsc::UnboundedSender<QueuedUrl>,
    detail_queue: mpsc::UnboundedSender<QueuedUrl>,
    region_queue: mpsc::UnboundedSender<QueuedUrl>,
}

impl Harvest {
    /// Counts a new visit and places it on its tier's queue
    ///
    /// The count goes up before the parent visit settles, so it cannot touch
    /// zero while children are still pending.
    fn enqueue(&self, queued: QueuedUrl) {
        let tier = queued.tier;
        let queue = match tier {
            Tier::List => &self.list_queue,
            Tier::Detail => &self.detail_queue,
            Tier::Region => &self.region_queue,
        };

        self.outstanding.send_modify(|count| *count += 1);
        tracing::trace!(tier = %tier, url = %queued.url, state = %VisitState::Queued, "visit state");

        if let Err(e) = queue.send(queued) {
            tracing::warn!(tier = %tier, url = %e.0.url, "tier queue closed, dropping visit");
            self.settle();
            return;
        }

        self.record(|stats| stats.record_visit(tier, VisitState::Queued));
    }

    /// Marks one visit as settled
    fn settle(&self) {
        self.outstanding
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    fn record(&self, update: impl FnOnce(&mut HarvestStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        update(&mut stats);
    }

    fn stats_snapshot(&self) -> HarvestStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Fetches and extracts one page, enqueueing what it links to
    async fn visit(&self, queued: &QueuedUrl) -> VisitState {
        let tier = queued.tier;
        tracing::info!(tier = %tier, url = %queued.url, "Visiting");
        tracing::trace!(tier = %tier, url = %queued.url, state = %VisitState::InFlight, "visit state");

        let state = match self.fetcher.fetch(&queued.url).await {
            Ok(page) if !is_allowed_host(&page.url, &self.allowed_host) => {
                tracing::error!(
                    tier = %tier,
                    url = %queued.url,
                    final_url = %page.url,
                    "Response came from outside the allowed host, ignoring it"
                );
                VisitState::Failed
            }
            Ok(page) => {
                if tier == Tier::List {
                    tracing::info!(tier = %tier, status = page.status_code, "Response received");
                }

                match tier {
                    Tier::List => self.handle_list_page(&page),
                    Tier::Detail => self.handle_detail_page(&page, queued.discovery_index),
                    Tier::Region => self.handle_region_page(&page),
                }
                VisitState::Completed
            }
            Err(e) => {
                tracing::error!(
                    tier = %tier,
                    url = %queued.url,
                    status = ?e.status_code(),
                    response = e.response_snapshot(),
                    timed_out = e.is_timeout(),
                    error = %e,
                    "Request failed"
                );
                VisitState::Failed
            }
        };

        tracing::trace!(tier = %tier, url = %queued.url, state = %state, "visit state");
        self.record(|stats| stats.record_visit(tier, state));
        state
    }

    /// Resolves a discovered link, counting the ones that cannot be followed
    fn resolve(&self, href: &str, page: &Page) -> Option<Url> {
        match resolve_link(href, &page.url, &self.allowed_host) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(href, page = %page.url, error = %e, "Skipping link");
                self.record(|stats| stats.skipped_links += 1);
                None
            }
        }
    }

    fn handle_list_page(&self, page: &Page) {
        let hrefs = {
            let doc = Document::parse(&page.body);
            extract_detail_links(&doc)
        };

        let mut discovered = 0;
        for href in hrefs {
            if let Some(url) = self.resolve(&href, page) {
                self.enqueue(QueuedUrl::new(url, Tier::Detail, discovered));
                discovered += 1;
            }
        }

        tracing::info!(url = %page.url, detail_pages = discovered, "Country list parsed");
    }

    fn handle_detail_page(&self, page: &Page, discovery_index: usize) {
        let detail = {
            let doc = Document::parse(&page.body);
            extract_detail(&doc)
        };

        match detail.country {
            Some(country) => {
                tracing::debug!(code = %country.code, name = %country.name, "Country extracted");
                self.countries.append(discovery_index, country);
            }
            None => {
                tracing::warn!(url = %page.url, "Detail page has no country facts");
                self.record(|stats| stats.detail_pages_without_country += 1);
            }
        }

        if let Some(href) = detail.region_link {
            if let Some(url) = self.resolve(&href, page) {
                self.enqueue(QueuedUrl::new(url, Tier::Region, discovery_index));
            }
        }
    }

    fn handle_region_page(&self, page: &Page) {
        let batch = {
            let doc = Document::parse(&page.body);
            extract_regions(&doc)
        };

        let region_count = batch.regions.len();
        match self
            .countries
            .attach_regions(&batch.country_name, batch.regions, self.matcher.as_ref())
        {
            MergeOutcome::Attached(_) => {
                tracing::debug!(country = %batch.country_name, regions = region_count, "Regions attached");
                self.record(|stats| stats.region_batches_attached += 1);
            }
            MergeOutcome::Empty => {
                tracing::debug!(country = %batch.country_name, url = %page.url, "Region page lists no regions");
            }
            MergeOutcome::AlreadyAttached(index) => {
                tracing::warn!(
                    country = %batch.country_name,
                    position = index,
                    regions = region_count,
                    url = %page.url,
                    "Country already has regions, dropping second batch"
                );
                self.record(|stats| stats.record_merge_miss(&batch.country_name));
            }
            MergeOutcome::Miss => {
                tracing::warn!(
                    country = %batch.country_name,
                    regions = region_count,
                    url = %page.url,
                    "No country matches region batch, dropping it"
                );
                self.record(|stats| stats.record_merge_miss(&batch.country_name));
            }
        }
    }
}

/// Settles a visit when dropped
///
/// A visit that unwinds before finishing is recorded as failed, so the
/// outstanding count still reaches zero.
struct SettleGuard<'a> {
    harvest: &'a Harvest,
    tier: Tier,
    finished: bool,
}

impl<'a> SettleGuard<'a> {
    fn new(harvest: &'a Harvest, tier: Tier) -> Self {
        Self {
            harvest,
            tier,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let tier = self.tier;
            tracing::error!(tier = %tier, "Visit ended without settling, counting it as failed");
            self.harvest
                .record(|stats| stats.record_visit(tier, VisitState::Failed));
        }
        self.harvest.settle();
    }
}

/// Drains one tier's queue, running each visit in a slot of that tier
fn spawn_dispatcher(
    scheduler: TierScheduler,
    mut queue: mpsc::UnboundedReceiver<QueuedUrl>,
    harvest: Arc<Harvest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut visits = JoinSet::new();

        while let Some(queued) = queue.recv().await {
            let Some(scheduled) = scheduler.schedule(queued).await else {
                tracing::error!(tier = %scheduler.tier(), "Tier semaphore closed");
                break;
            };

            tracing::trace!(
                tier = %scheduler.tier(),
                url = %scheduled.url.url,
                cool_down = ?scheduled.cool_down(),
                "visit dispatched"
            );

            let harvest = Arc::clone(&harvest);
            visits.spawn(async move {
                let guard = SettleGuard::new(&harvest, scheduled.url.tier);
                harvest.visit(&scheduled.url).await;
                guard.finish();
                scheduled.release().await;
            });

            while let Some(joined) = visits.try_join_next() {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(tier = %scheduler.tier(), error = %e, "Visit task panicked");
                    }
                }
            }
        }
        // Dropping `visits` aborts whatever is still cooling down.
    })
}
