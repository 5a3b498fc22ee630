//! Shared country collection
//!
//! The crawl's only shared mutable resource. Detail visits append countries,
//! region visits attach region batches; both go through one mutex so an
//! append can never interleave with a scan-and-update.

use super::country::{Country, Region};
use std::sync::{Mutex, MutexGuard};

/// Decides whether a region batch belongs to a country
///
/// The site gives region pages no stable country key, only the breadcrumb
/// display name, so matching is a strategy rather than a fixed rule.
pub trait CountryMatcher: Send + Sync {
    fn matches(&self, country: &Country, breadcrumb_name: &str) -> bool;
}

/// Exact display-name equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameMatcher;

impl CountryMatcher for ExactNameMatcher {
    fn matches(&self, country: &Country, breadcrumb_name: &str) -> bool {
        country.name == breadcrumb_name
    }
}

/// Result of attaching a region batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Regions were written to the country at this position
    Attached(usize),

    /// The batch was empty; nothing to attach
    Empty,

    /// The first matching country already holds a batch; nothing changed
    AlreadyAttached(usize),

    /// No country matched the breadcrumb name
    Miss,
}

#[derive(Debug)]
struct Entry {
    discovery_index: usize,
    country: Country,
}

/// Country records kept in list discovery order
#[derive(Debug, Default)]
pub struct CountryCollection {
    entries: Mutex<Vec<Entry>>,
}

impl CountryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        // Writers never leave an entry half-written; poisoned data is consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a country discovered at `discovery_index` on the list page
    ///
    /// Detail visits finish in any order; entries are kept sorted by the
    /// index so the collection reads in discovery order.
    pub fn append(&self, discovery_index: usize, country: Country) {
        let mut entries = self.lock();
        let position = entries.partition_point(|e| e.discovery_index <= discovery_index);
        entries.insert(
            position,
            Entry {
                discovery_index,
                country,
            },
        );
    }

    /// Attaches a region batch to the first country the matcher accepts
    ///
    /// A country takes at most one batch. A later batch for the same
    /// country, as happens when two countries share a name, is refused.
    pub fn attach_regions(
        &self,
        breadcrumb_name: &str,
        regions: Vec<Region>,
        matcher: &dyn CountryMatcher,
    ) -> MergeOutcome {
        if regions.is_empty() {
            return MergeOutcome::Empty;
        }

        let mut entries = self.lock();
        match entries
            .iter()
            .position(|e| matcher.matches(&e.country, breadcrumb_name))
        {
            Some(index) if !entries[index].country.regions.is_empty() => {
                MergeOutcome::AlreadyAttached(index)
            }
            Some(index) => {
                entries[index].country.regions = regions;
                MergeOutcome::Attached(index)
            }
            None => MergeOutcome::Miss,
        }
    }

    /// Returns a copy of the current countries in discovery order
    pub fn snapshot(&self) -> Vec<Country> {
        self.lock().iter().map(|e| e.country.clone()).collect()
    }
}
