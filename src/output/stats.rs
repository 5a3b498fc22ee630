//! Statistics gathered during a harvest
//!
//! The coordinator records visit outcomes and merge results here; the CLI
//! prints them once the run settles.

use crate::crawler::Tier;
use crate::state::{Country, VisitState};
use std::collections::BTreeMap;

/// Visit counts for one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    /// URLs placed on the tier's queue
    pub queued: u64,

    /// Visits that fetched and extracted their page
    pub completed: u64,

    /// Visits whose fetch failed
    pub failed: u64,
}

impl TierStats {
    /// Visits that have reached a settled state
    pub fn settled(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Harvest statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Visit counts per tier
    pub tiers: BTreeMap<Tier, TierStats>,

    /// Discovered links skipped because they were empty or off-origin
    pub skipped_links: u64,

    /// Detail pages that had no country facts container
    pub detail_pages_without_country: u64,

    /// Region batches attached to a country
    pub region_batches_attached: u64,

    /// Region batches dropped: no matching country, or it already had one
    pub merge_misses: u64,

    /// Breadcrumb names of the missed batches
    pub missed_country_names: Vec<String>,
}

impl HarvestStats {
    /// Records a visit entering `state`
    pub fn record_visit(&mut self, tier: Tier, state: VisitState) {
        let entry = self.tiers.entry(tier).or_default();
        match state {
            VisitState::Queued => entry.queued += 1,
            VisitState::Completed => entry.completed += 1,
            VisitState::Failed => entry.failed += 1,
            VisitState::InFlight => {}
        }
    }

    pub fn record_merge_miss(&mut self, country_name: &str) {
        self.merge_misses += 1;
        self.missed_country_names.push(country_name.to_string());
    }

    pub fn tier(&self, tier: Tier) -> TierStats {
        self.tiers.get(&tier).copied().unwrap_or_default()
    }

    /// Total failed visits across all tiers
    pub fn total_failures(&self) -> u64 {
        self.tiers.values().map(|t| t.failed).sum()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStats, countries: &[Country]) {
    println!("=== Harvest Statistics ===\n");

    let with_regions = countries.iter().filter(|c| !c.regions.is_empty()).count();
    let region_total: usize = countries.iter().map(|c| c.regions.len()).sum();

    println!("Overview:");
    println!("  Countries: {}", countries.len());
    println!("  Countries with regions: {}", with_regions);
    println!("  Regions: {}", region_total);
    println!();

    println!("Visits by Tier:");
    for tier in Tier::all() {
        let t = stats.tier(tier);
        println!(
            "  {:<7} queued {:>4}, settled {:>4} (completed {:>4}, failed {:>4})",
            tier,
            t.queued,
            t.settled(),
            t.completed,
            t.failed
        );
    }
    println!();

    if stats.skipped_links > 0 {
        println!("Skipped links: {}", stats.skipped_links);
    }

    if stats.detail_pages_without_country > 0 {
        println!(
            "Detail pages without country facts: {}",
            stats.detail_pages_without_country
        );
    }

    if stats.merge_misses > 0 {
        println!("Dropped region batches ({}):", stats.merge_misses);
        for name in &stats.missed_country_names {
            println!("  - {}", name);
        }
    }
}
