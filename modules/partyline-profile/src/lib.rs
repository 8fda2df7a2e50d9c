pub mod aggregate;
pub mod baseline;
pub mod compass;
pub mod cooldown;
pub mod merge;
pub mod normalize;
pub mod oracle;
pub mod service;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregate::{build_aggregate, ActivityWindow, SummaryPrompt};
pub use baseline::{build_baseline, BaselineAnalysis, PillarReading};
pub use compass::project;
pub use cooldown::Cooldown;
pub use merge::merge;
pub use normalize::normalize_title;
pub use oracle::{parse_baseline, parse_delta, ParsedBaseline, ParsedDelta, Repair};
pub use service::{AggregateService, BaselineOutcome, MergeReport, ProfileService, RefreshOutcome};
pub use store::MemoryStore;
pub use traits::{ProfileStore, RefreshGate, SummaryOracle};
