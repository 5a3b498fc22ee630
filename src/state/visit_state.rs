/// Visit state definitions for tracking crawl progress
///
/// Every URL dispatched to a tier moves through
/// `Queued -> InFlight -> {Completed | Failed}`.
use std::fmt;

/// Represents the current state of a single visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    // ===== Active States =====
    /// Waiting in its tier's queue for a free slot
    Queued,

    /// Fetch issued, response not yet handled
    InFlight,

    // ===== Settled States =====
    /// Page fetched and extracted; discovered children have been enqueued
    Completed,

    /// Fetch failed; this branch contributes nothing further
    Failed,
}

impl VisitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
