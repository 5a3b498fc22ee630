//! State module for the harvested data and crawl progress
//!
//! # Components
//!
//! - `Country` / `Region`: The records assembled by the crawl
//! - `CountryCollection`: The shared, mutex-guarded result collection
//! - `CountryMatcher`: Strategy deciding which country a region batch belongs to
//! - `VisitState`: Lifecycle of a single visit (queued, in flight, settled)

mod collection;
mod country;
mod visit_state;

// Re-export main types
pub use collection::{CountryCollection, CountryMatcher, ExactNameMatcher, MergeOutcome};
pub use country::{Country, Region};
pub use visit_state::VisitState;
