//! Crawler module for page fetching and extraction
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML document queries and per-tier page extraction
//! - Per-tier scheduling and politeness pauses
//! - Overall harvest coordination

mod coordinator;
mod document;
mod extract;
mod fetcher;
mod scheduler;

pub use coordinator::Coordinator;
pub use document::{Document, Element};
pub use extract::{
    extract_detail, extract_detail_links, extract_regions, normalize_name, strip_whitespace,
    DetailPage, RegionBatch,
};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher, Page};
pub use scheduler::{politeness_delay, QueuedUrl, ScheduledVisit, Tier, TierScheduler};

use crate::config::{validate, Config};
use crate::state::Country;
use crate::HarvestError;
use url::Url;

/// Runs a complete harvest from the configured root URL
///
/// This is the main entry point for library users. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Visit the country list page
/// 3. Visit every country detail page it links to
/// 4. Visit every region list page those link to
/// 5. Return the countries once all visits have settled
///
/// # Example
///
/// ```no_run
/// use geo_harvest::config::Config;
/// use geo_harvest::crawler::harvest;
///
/// # async fn example() -> Result<(), geo_harvest::HarvestError> {
/// let countries = harvest(&Config::default()).await?;
/// println!("{} countries", countries.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config) -> Result<Vec<Country>, HarvestError> {
    validate(config)?;
    let root = Url::parse(&config.site.root_url)?;
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.run(&root).await)
}
