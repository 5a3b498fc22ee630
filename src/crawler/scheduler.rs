//! Per-tier scheduling and rate limiting
//!
//! This module handles:
//! - The three crawler tiers and their queued work items
//! - Per-tier concurrency limiting via semaphores
//! - Politeness pauses (fixed delay plus random jitter) between visits

use crate::config::TierConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// The crawler roles, each with its own pool and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Country listing page
    List,
    /// Per-country detail pages
    Detail,
    /// Per-country region listing pages
    Region,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Detail => "detail",
            Self::Region => "region",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::List, Self::Detail, Self::Region]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL waiting in a tier's queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL to fetch
    pub url: Url,

    /// Tier that will visit the URL
    pub tier: Tier,

    /// Position of the owning country link on the list page
    pub discovery_index: usize,
}

impl QueuedUrl {
    pub fn new(url: Url, tier: Tier, discovery_index: usize) -> Self {
        Self {
            url,
            tier,
            discovery_index,
        }
    }
}

/// A queued URL holding one of its tier's slots
pub struct ScheduledVisit {
    /// The visit this slot is bound to
    pub url: QueuedUrl,

    /// Pause before the slot is handed back
    cool_down: Duration,

    _permit: OwnedSemaphorePermit,
}

impl ScheduledVisit {
    /// Sleeps out the politeness pause, then frees the slot
    pub async fn release(self) {
        if !self.cool_down.is_zero() {
            tokio::time::sleep(self.cool_down).await;
        }
    }

    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }
}

/// Hands out a tier's visit slots
///
/// A slot stays taken while the visit runs and for `delay + jitter`
/// afterwards, which spaces requests the way a rate limit would.
#[derive(Debug, Clone)]
pub struct TierScheduler {
    tier: Tier,
    semaphore: Arc<Semaphore>,
    config: TierConfig,
}

impl TierScheduler {
    pub fn new(tier: Tier, config: TierConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
        Self {
            tier,
            semaphore,
            config,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Waits for a free slot and binds it to `url`
    ///
    /// Slots are granted in request order, so a single caller draining a
    /// FIFO queue dispatches in discovery order.
    pub async fn schedule(&self, url: QueuedUrl) -> Option<ScheduledVisit> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok()?;

        tracing::trace!(
            tier = %self.tier,
            url = %url.url,
            free_slots = self.available_slots(),
            "slot acquired"
        );

        Some(ScheduledVisit {
            url,
            cool_down: politeness_delay(&self.config),
            _permit: permit,
        })
    }

    /// Number of free slots right now
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Picks the pause after one visit: the fixed delay plus `0..=jitter`
pub fn politeness_delay(config: &TierConfig) -> Duration {
    let jitter = if config.jitter_ms == 0 {
        0
    } else {
        fastrand::u64(0..=config.jitter_ms)
    };
    config.delay() + Duration::from_millis(jitter)
}
